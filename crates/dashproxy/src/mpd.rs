//! The subset of the MPEG-DASH MPD vocabulary the proxy consumes.
//!
//! A [`Manifest`] is parsed once per refresh and never modified afterwards;
//! everything derived from it (segment lists, rendered paths) lives in separate values.
//!
//! Attributes the proxy only copies or re-reads leniently (`mediaPresentationDuration`,
//! `minimumUpdatePeriod`, `bandwidth`) stay raw strings, so an odd value in one of them
//! cannot reject the whole manifest.

mod locator;

pub use locator::{base_url, MpdLocator, RepresentationAddress};
pub(crate) use locator::is_absolute_url;

use serde::Deserialize;

use crate::error::ProxyResult;

/// Root `MPD` element.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(rename = "@mediaPresentationDuration")]
    pub media_presentation_duration: Option<String>,

    /// Only the presence of this attribute matters: it marks the presentation as live.
    #[serde(rename = "@minimumUpdatePeriod")]
    pub minimum_update_period: Option<String>,

    #[serde(rename = "Location", default)]
    pub locations: Vec<String>,

    #[serde(rename = "BaseURL", default)]
    pub base_urls: Vec<String>,

    #[serde(rename = "Period", default)]
    pub periods: Vec<Period>,
}

impl Manifest {
    pub fn parse(xml: &str) -> ProxyResult<Self> {
        Ok(quick_xml::de::from_str(xml)?)
    }

    pub fn is_live(&self) -> bool {
        self.minimum_update_period.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Period {
    #[serde(rename = "AdaptationSet", default)]
    pub adaptation_sets: Vec<AdaptationSet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdaptationSet {
    #[serde(rename = "@mimeType")]
    pub mime_type: Option<String>,

    #[serde(rename = "SegmentTemplate")]
    pub segment_template: Option<SegmentTemplate>,

    #[serde(rename = "Representation", default)]
    pub representations: Vec<Representation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Representation {
    #[serde(rename = "@id")]
    pub id: Option<String>,

    /// Kept as written; it is only ever substituted into `$Bandwidth$`.
    #[serde(rename = "@bandwidth")]
    pub bandwidth: Option<String>,

    #[serde(rename = "SegmentTemplate")]
    pub segment_template: Option<SegmentTemplate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SegmentTemplate {
    #[serde(rename = "@initialization")]
    pub initialization: Option<String>,

    #[serde(rename = "@media")]
    pub media: Option<String>,

    #[serde(rename = "@timescale")]
    pub timescale: Option<u64>,

    #[serde(rename = "@duration")]
    pub duration: Option<u64>,

    #[serde(rename = "@startNumber")]
    pub start_number: Option<u64>,

    #[serde(rename = "SegmentTimeline")]
    pub segment_timeline: Option<SegmentTimeline>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SegmentTimeline {
    #[serde(rename = "S", default)]
    pub segments: Vec<S>,
}

/// One `S` entry of a `SegmentTimeline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct S {
    /// Start time, in timescale units
    #[serde(rename = "@t")]
    pub t: Option<u64>,

    /// Duration, in timescale units
    #[serde(rename = "@d", default)]
    pub d: u64,

    /// Number of additional segments with the same duration
    #[serde(rename = "@r")]
    pub r: Option<i64>,
}
