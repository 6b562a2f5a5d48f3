use std::num::NonZeroUsize;

use tracing::{Instrument, Span};

use crate::{
    dash::resolve::{self, AddressingMode},
    duration::parse_iso_duration,
    error::ProxyResult,
    fetch::{DownloadReport, SegmentFetcher, WritePolicy},
    mpd::{Manifest, MpdLocator, RepresentationAddress},
    storage::Storage,
    transport::Transport,
};

/// Mirrors one representation across manifest refreshes.
///
/// The initialization segment is requested at most once per downloader, even when that
/// request fails. Media segments are resolved again on every refresh: timeline segments
/// that already exist are skipped, numbered segments are always requested and overwritten.
pub struct RepresentationDownloader<T, S> {
    addr: RepresentationAddress,
    fetcher: SegmentFetcher<T, S>,
    concurrency: NonZeroUsize,
    span: Span,

    base_url: String,
    initialization_downloaded: bool,
}

impl<T, S> RepresentationDownloader<T, S>
where
    T: Transport,
    S: Storage,
{
    pub fn new(
        addr: RepresentationAddress,
        fetcher: SegmentFetcher<T, S>,
        concurrency: NonZeroUsize,
        span: Span,
    ) -> Self {
        Self {
            addr,
            fetcher,
            concurrency,
            span,
            base_url: String::new(),
            initialization_downloaded: false,
        }
    }

    pub fn address(&self) -> RepresentationAddress {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn initialization_downloaded(&self) -> bool {
        self.initialization_downloaded
    }

    /// Downloads what `mpd` currently addresses for this representation.
    ///
    /// Fails only when the representation cannot be found in `mpd`; download failures
    /// are logged and counted in the returned report.
    pub async fn handle_manifest(
        &mut self,
        mpd: &Manifest,
        base_url: String,
    ) -> ProxyResult<DownloadReport> {
        let span = self.span.clone();
        self.process(mpd, base_url).instrument(span).await
    }

    async fn process(&mut self, mpd: &Manifest, base_url: String) -> ProxyResult<DownloadReport> {
        self.base_url = base_url;
        let locator = MpdLocator::new(mpd);
        let mut report = DownloadReport::default();

        let duration = mpd.media_presentation_duration.as_deref().unwrap_or_default();
        let duration_secs = parse_iso_duration(duration);
        tracing::debug!("mediaPresentationDuration {duration} ({duration_secs} s)");

        let representation = locator.representation(self.addr)?;
        tracing::debug!(
            id = representation.id.as_deref().unwrap_or("UKN"),
            bandwidth = representation.bandwidth.as_deref(),
            base_url = %self.base_url,
            "Handling MPD"
        );

        if !self.initialization_downloaded {
            if let Some(initialization) = resolve::initialization_path(&locator, self.addr)? {
                self.initialization_downloaded = true;
                let outcome = self
                    .fetcher
                    .fetch(&self.base_url, &initialization, WritePolicy::SkipExisting)
                    .await;
                report.record(outcome);
            }
        }

        let Some(resolved) = resolve::resolve_segments(&locator, self.addr, duration_secs)? else {
            tracing::warn!("No SegmentTemplate with a media attribute found, skipping.");
            return Ok(report);
        };

        let policy = match resolved.mode {
            AddressingMode::Timeline => WritePolicy::SkipExisting,
            AddressingMode::Number => WritePolicy::Overwrite,
        };
        tracing::info!(
            "{} segments resolved by {:?} addressing.",
            resolved.segments.len(),
            resolved.mode
        );

        report += self
            .fetcher
            .fetch_all(
                &self.base_url,
                resolved.segments.into_iter().map(|segment| segment.path),
                policy,
                self.concurrency,
            )
            .await;

        tracing::info!(
            downloaded = report.downloaded,
            skipped = report.skipped,
            failed = report.failed,
            "Representation refreshed."
        );
        Ok(report)
    }
}
