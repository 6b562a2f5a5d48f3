use std::{
    collections::{hash_map::Entry, HashMap},
    num::NonZeroUsize,
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use bytes::Bytes;
use url::Url;

use crate::{
    downloader::RepresentationDownloader,
    error::{ProxyError, ProxyResult},
    fetch::{DownloadReport, SegmentFetcher},
    mpd::{base_url, AdaptationSet, Manifest, RepresentationAddress},
    storage::Storage,
    transport::{Transport, TransportResponse},
};

/// Delay between manifest refreshes of a live presentation, and between
/// attempts to fetch the manifest.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// Name of the manifest snapshot in the output directory.
pub const OUTPUT_MANIFEST: &str = "manifest.mpd";

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub manifest_url: Url,
    pub output_dir: PathBuf,
    /// Only mirror adaptation sets with exactly this `mimeType`. Empty accepts all.
    pub mime_type: String,
    pub verbose: bool,
    /// Accepted for compatibility; nothing reads it.
    pub download: bool,
    /// Also keep every refreshed manifest as `manifest.<refresh>.mpd`.
    pub save_individual_manifests: bool,
    /// Segment requests in flight per representation.
    pub concurrency: NonZeroUsize,
}

impl ProxyConfig {
    pub fn new(manifest_url: Url, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            manifest_url,
            output_dir: output_dir.into(),
            mime_type: String::new(),
            verbose: false,
            download: false,
            save_individual_manifests: false,
            concurrency: NonZeroUsize::MIN,
        }
    }

    fn accepts(&self, adaptation_set: &AdaptationSet) -> bool {
        self.mime_type.is_empty()
            || adaptation_set.mime_type.as_deref().unwrap_or_default() == self.mime_type
    }
}

/// What follows a processed manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// `minimumUpdatePeriod` is present: refresh after [`REFRESH_INTERVAL`].
    Live,
    /// Static presentation: nothing more to do.
    Vod,
}

/// Keeps a local mirror of a DASH presentation up to date.
///
/// ```text
///            ┌──────────┐   ok    ┌────────────┐  live   ┌──────────┐
///   ────────►│ Fetching ├────────►│ Processing ├────────►│ Sleeping │
///            └──┬────▲──┘         └─────┬──────┘         └────┬─────┘
///        failed │    │ 10s              │ vod                 │ 10s
///               └────┘                  ▼                     │
///                                   Terminated     Fetching ◄─┘
/// ```
pub struct DashProxy<T, S> {
    config: ProxyConfig,
    fetcher: SegmentFetcher<T, S>,
    downloaders: HashMap<RepresentationAddress, RepresentationDownloader<T, S>>,
    refresh_count: u32,
}

impl<T, S> DashProxy<T, S>
where
    T: Transport,
    S: Storage,
{
    pub fn new(config: ProxyConfig, transport: T, storage: S) -> Self {
        Self {
            config,
            fetcher: SegmentFetcher::new(Arc::new(transport), Arc::new(storage)),
            downloaders: HashMap::new(),
            refresh_count: 0,
        }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Number of manifests processed so far.
    pub fn refresh_count(&self) -> u32 {
        self.refresh_count
    }

    pub fn storage(&self) -> &S {
        self.fetcher.storage()
    }

    pub fn downloaders(&self) -> &HashMap<RepresentationAddress, RepresentationDownloader<T, S>> {
        &self.downloaders
    }

    /// Mirrors the presentation until a static manifest has been processed.
    ///
    /// Returns an error only for manifests that cannot be processed at all.
    pub async fn run(&mut self) -> ProxyResult<()> {
        tracing::info!(
            "Running dash proxy for stream {}. Output goes in {}",
            self.config.manifest_url,
            self.fetcher
                .storage()
                .location_hint()
                .unwrap_or_else(|| self.config.output_dir.display().to_string())
        );

        loop {
            let body = self.fetch_manifest().await;
            match self.handle_manifest(&body).await? {
                RefreshOutcome::Live => {
                    tracing::debug!("Live MPD, refreshing in {}s.", REFRESH_INTERVAL.as_secs());
                    tokio::time::sleep(REFRESH_INTERVAL).await;
                }
                RefreshOutcome::Vod => {
                    tracing::info!("VOD MPD. Nothing more to do. Stopping...");
                    return Ok(());
                }
            }
        }
    }

    /// Requests the manifest until the server answers with a 2xx status.
    async fn fetch_manifest(&self) -> Bytes {
        loop {
            let result = self
                .fetcher
                .transport()
                .get(self.config.manifest_url.as_str())
                .await
                .and_then(TransportResponse::into_success);

            match result {
                Ok(body) => return body,
                Err(e) => {
                    tracing::warn!(
                        "Cannot GET the MPD: {e}. Retrying after {}s",
                        REFRESH_INTERVAL.as_secs()
                    );
                    tokio::time::sleep(REFRESH_INTERVAL).await;
                }
            }
        }
    }

    /// Processes one fetched manifest: mirrors every selected representation of the
    /// first period, then saves the manifest itself.
    ///
    /// The saved snapshot is `body` byte for byte.
    pub async fn handle_manifest(
        &mut self,
        body: impl AsRef<[u8]>,
    ) -> ProxyResult<RefreshOutcome> {
        let body = body.as_ref();
        self.refresh_count += 1;

        let mpd = Manifest::parse(&String::from_utf8_lossy(body))?;
        let base_url = base_url(&mpd, self.config.manifest_url.as_str());

        tracing::debug!("Found {} periods choosing the 1st one", mpd.periods.len());
        let period = mpd.periods.first().ok_or(ProxyError::NoPeriod)?;

        let mut report = DownloadReport::default();
        for (as_idx, adaptation_set) in period.adaptation_sets.iter().enumerate() {
            if !self.config.accepts(adaptation_set) {
                tracing::debug!(
                    "Skipping adaptation set {as_idx} with mimeType {:?}",
                    adaptation_set.mime_type
                );
                continue;
            }

            for (rep_idx, representation) in adaptation_set.representations.iter().enumerate() {
                tracing::debug!(
                    "Found representation with id {}",
                    representation.id.as_deref().unwrap_or("UKN")
                );
                let addr = RepresentationAddress::new(0, as_idx, rep_idx);
                report += self
                    .ensure_downloader(addr)
                    .handle_manifest(&mpd, base_url.clone())
                    .await?;
            }
        }

        if report.failed > 0 {
            tracing::warn!(
                "Refresh #{} finished with {} failed download(s).",
                self.refresh_count,
                report.failed
            );
        }

        self.write_output_manifest(body).await;

        Ok(if mpd.is_live() {
            RefreshOutcome::Live
        } else {
            RefreshOutcome::Vod
        })
    }

    /// The downloader of `addr`, created on first use and kept for the proxy's lifetime.
    pub fn ensure_downloader(
        &mut self,
        addr: RepresentationAddress,
    ) -> &mut RepresentationDownloader<T, S> {
        match self.downloaders.entry(addr) {
            Entry::Occupied(entry) => {
                tracing::debug!("A downloader for {addr} already started");
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                tracing::info!("Starting a downloader for {addr}");
                let span = tracing::info_span!(
                    "representation",
                    period = addr.period,
                    adaptation_set = addr.adaptation_set,
                    representation = addr.representation
                );
                entry.insert(RepresentationDownloader::new(
                    addr,
                    self.fetcher.clone(),
                    self.config.concurrency,
                    span,
                ))
            }
        }
    }

    async fn write_output_manifest(&self, body: &[u8]) {
        tracing::info!("Writing the updated MPD file");
        let data = Bytes::copy_from_slice(body);
        let storage = self.fetcher.storage();

        if let Err(e) = storage.write(OUTPUT_MANIFEST, data.clone()).await {
            tracing::error!("Cannot write {OUTPUT_MANIFEST}: {e}");
        }

        if self.config.save_individual_manifests {
            let dest = format!("manifest.{}.mpd", self.refresh_count);
            if let Err(e) = storage.write(&dest, data).await {
                tracing::error!("Cannot write {dest}: {e}");
            }
        }
    }
}
