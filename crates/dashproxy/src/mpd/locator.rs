use std::fmt;

use super::{AdaptationSet, Manifest, Representation, SegmentTemplate, SegmentTimeline};
use crate::error::{ProxyError, ProxyResult};

/// Stable address of a representation inside a manifest.
///
/// Two equal addresses denote the same logical stream across refreshes of the same manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepresentationAddress {
    pub period: usize,
    pub adaptation_set: usize,
    pub representation: usize,
}

impl RepresentationAddress {
    pub fn new(period: usize, adaptation_set: usize, representation: usize) -> Self {
        Self {
            period,
            adaptation_set,
            representation,
        }
    }
}

impl fmt::Display for RepresentationAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Representation (period={} adaptation-set={} representation={})",
            self.period, self.adaptation_set, self.representation
        )
    }
}

/// Read-only navigation over a [`Manifest`] by [`RepresentationAddress`].
#[derive(Clone, Copy)]
pub struct MpdLocator<'a> {
    mpd: &'a Manifest,
}

impl<'a> MpdLocator<'a> {
    pub fn new(mpd: &'a Manifest) -> Self {
        Self { mpd }
    }

    pub fn manifest(&self) -> &'a Manifest {
        self.mpd
    }

    pub fn adaptation_set(&self, addr: RepresentationAddress) -> ProxyResult<&'a AdaptationSet> {
        self.mpd
            .periods
            .get(addr.period)
            .and_then(|period| period.adaptation_sets.get(addr.adaptation_set))
            .ok_or(ProxyError::AddressOutOfRange(addr))
    }

    pub fn representation(&self, addr: RepresentationAddress) -> ProxyResult<&'a Representation> {
        self.adaptation_set(addr)?
            .representations
            .get(addr.representation)
            .ok_or(ProxyError::AddressOutOfRange(addr))
    }

    /// The representation's own template, or the adaptation set's one when it has none.
    ///
    /// The two are never merged here: see [`MpdLocator::segment_template_from_adaptation_set`].
    pub fn segment_template(
        &self,
        addr: RepresentationAddress,
    ) -> ProxyResult<Option<&'a SegmentTemplate>> {
        let representation = self.representation(addr)?;
        if let Some(template) = representation.segment_template.as_ref() {
            return Ok(Some(template));
        }
        self.segment_template_from_adaptation_set(addr)
    }

    pub fn segment_template_from_adaptation_set(
        &self,
        addr: RepresentationAddress,
    ) -> ProxyResult<Option<&'a SegmentTemplate>> {
        Ok(self.adaptation_set(addr)?.segment_template.as_ref())
    }

    pub fn segment_timeline(
        &self,
        addr: RepresentationAddress,
    ) -> ProxyResult<Option<&'a SegmentTimeline>> {
        Ok(self
            .segment_template(addr)?
            .and_then(|template| template.segment_timeline.as_ref()))
    }
}

pub(crate) fn is_absolute_url(s: &str) -> bool {
    s.starts_with("http://")
        || s.starts_with("https://")
        || s.starts_with("file://")
        || s.starts_with("ftp://")
}

/// Everything up to and including the last `/` of `url`.
fn url_directory(url: &str) -> &str {
    match url.rfind('/') {
        Some(idx) => &url[..=idx],
        None => url,
    }
}

/// Resolves the base URL that relative segment paths are appended to.
///
/// Precedence, lowest first: the directory of the manifest URL, the directory of the
/// first `Location`, then the first `BaseURL`. An absolute `BaseURL` replaces the base
/// with its own directory, a relative one is appended to the current base.
pub fn base_url(mpd: &Manifest, manifest_url: &str) -> String {
    let mut base_url = url_directory(manifest_url).to_string();

    if let Some(location) = mpd.locations.first() {
        base_url = url_directory(location.trim()).to_string();
    }

    if let Some(mpd_base_url) = mpd.base_urls.first() {
        let mpd_base_url = mpd_base_url.trim();
        if is_absolute_url(mpd_base_url) {
            base_url = url_directory(mpd_base_url).to_string();
        } else {
            base_url.push_str(mpd_base_url);
        }
    }

    base_url
}
