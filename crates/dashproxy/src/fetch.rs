use std::{num::NonZeroUsize, ops::AddAssign, sync::Arc};

use futures::StreamExt;

use crate::{
    mpd::is_absolute_url,
    storage::Storage,
    transport::{Transport, TransportResponse},
};

/// What to do when the destination of a download already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Keep the existing file and do not request it again.
    SkipExisting,
    /// Always request the file and replace the existing one.
    Overwrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded,
    Skipped,
    Failed,
}

/// Per-refresh tally of fetch outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl DownloadReport {
    pub fn record(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Downloaded => self.downloaded += 1,
            FetchOutcome::Skipped => self.skipped += 1,
            FetchOutcome::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.downloaded + self.skipped + self.failed
    }
}

impl AddAssign for DownloadReport {
    fn add_assign(&mut self, rhs: Self) {
        self.downloaded += rhs.downloaded;
        self.skipped += rhs.skipped;
        self.failed += rhs.failed;
    }
}

/// URL a rendered segment path is requested from.
pub fn segment_url(base_url: &str, path: &str) -> String {
    if is_absolute_url(path) {
        path.to_string()
    } else {
        format!("{base_url}{path}")
    }
}

/// Storage path of a rendered segment path.
///
/// The query string is dropped, and so are empty, `.` and `..` components, which keeps
/// every destination inside the output root.
pub fn local_path(path: &str) -> String {
    let path = match path.rfind('?') {
        Some(idx) => &path[..idx],
        None => path,
    };
    let path = path
        .strip_prefix("http://")
        .or_else(|| path.strip_prefix("https://"))
        .and_then(|rest| rest.split_once('/').map(|(_host, path)| path))
        .unwrap_or(path);

    path.split('/')
        .filter(|component| !matches!(*component, "" | "." | ".."))
        .collect::<Vec<_>>()
        .join("/")
}

/// Fetches one file and writes it to storage.
pub struct SegmentFetcher<T, S> {
    transport: Arc<T>,
    storage: Arc<S>,
}

impl<T, S> Clone for SegmentFetcher<T, S> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            storage: self.storage.clone(),
        }
    }
}

impl<T, S> SegmentFetcher<T, S>
where
    T: Transport,
    S: Storage,
{
    pub fn new(transport: Arc<T>, storage: Arc<S>) -> Self {
        Self { transport, storage }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Downloads the rendered `path` relative to `base_url`.
    ///
    /// Failures are logged and reported as [`FetchOutcome::Failed`]; nothing is retried.
    pub async fn fetch(&self, base_url: &str, path: &str, policy: WritePolicy) -> FetchOutcome {
        let destination = local_path(path);
        if policy == WritePolicy::SkipExisting && self.storage.exists(&destination).await {
            tracing::warn!("File {destination} already exists, skipping.");
            return FetchOutcome::Skipped;
        }

        let url = segment_url(base_url, path);
        tracing::info!("Requesting {destination} from {url}");
        let data = match self
            .transport
            .get(&url)
            .await
            .and_then(TransportResponse::into_success)
        {
            Ok(data) => data,
            Err(e) => {
                tracing::error!("Cannot download {url}: {e}");
                return FetchOutcome::Failed;
            }
        };

        if let Err(e) = self.storage.write(&destination, data).await {
            tracing::error!("Cannot write {destination}: {e}");
            return FetchOutcome::Failed;
        }

        tracing::debug!("Saved {destination}");
        FetchOutcome::Downloaded
    }

    /// Fetches every path with at most `concurrency` requests in flight.
    pub async fn fetch_all<I>(
        &self,
        base_url: &str,
        paths: I,
        policy: WritePolicy,
        concurrency: NonZeroUsize,
    ) -> DownloadReport
    where
        I: IntoIterator<Item = String>,
    {
        futures::stream::iter(paths)
            .map(|path| async move { self.fetch(base_url, &path, policy).await })
            .buffer_unordered(concurrency.get())
            .fold(DownloadReport::default(), |mut report, outcome| async move {
                report.record(outcome);
                report
            })
            .await
    }
}
