//! Turns a representation's `SegmentTemplate` into concrete segment paths.
//!
//! There are two mutually exclusive addressing schemes: an explicit `SegmentTimeline`
//! (paths carry `$Time$`) and arithmetic numbering derived from the template's
//! `duration`/`timescale` and the presentation duration (paths carry `$Number$`).

use super::template::Template;
use crate::{
    error::ProxyResult,
    mpd::{MpdLocator, RepresentationAddress, SegmentTemplate, S},
};

/// A media segment path computed for one refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSegment {
    /// `$Time$` in timeline mode, `$Number$` in number mode
    pub index: u64,
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Timeline,
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSegments {
    pub mode: AddressingMode,
    pub segments: Vec<ResolvedSegment>,
}

/// A timeline entry after repeat expansion, with its start time made explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineSegment {
    pub t: u64,
    pub d: u64,
}

/// Expands repeat counts and assigns every segment its start time.
///
/// An explicit `t` moves the running cursor; otherwise a segment starts where the
/// previous one ended. The first segment without `t` starts at 0.
pub fn expand_timeline(entries: &[S]) -> Vec<TimelineSegment> {
    let mut expanded = Vec::with_capacity(entries.len());
    let mut next_time = 0;

    for entry in entries {
        if let Some(t) = entry.t {
            next_time = t;
        }

        let repeat = entry.r.unwrap_or(0).max(0);
        for _ in 0..=repeat {
            expanded.push(TimelineSegment {
                t: next_time,
                d: entry.d,
            });
            next_time += entry.d;
        }
    }

    expanded
}

/// Effective numbering parameters of a number-addressed representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberParameters {
    pub timescale: u64,
    pub duration: u64,
    pub start_number: u64,
}

impl NumberParameters {
    /// Starts from the adaptation set's values (each defaulting to 1) and lets every
    /// value the resolved template sets explicitly override its counterpart.
    pub fn resolve(
        from_adaptation_set: Option<&SegmentTemplate>,
        resolved: Option<&SegmentTemplate>,
    ) -> Self {
        let mut params = Self {
            timescale: 1,
            duration: 1,
            start_number: 1,
        };

        for template in [from_adaptation_set, resolved].into_iter().flatten() {
            if let Some(timescale) = template.timescale {
                params.timescale = timescale;
            }
            if let Some(duration) = template.duration {
                params.duration = duration;
            }
            if let Some(start_number) = template.start_number {
                params.start_number = start_number;
            }
        }

        params
    }

    pub fn segment_duration_secs(&self) -> f64 {
        self.duration as f64 / self.timescale as f64
    }

    /// Whole segments that fit into `presentation_duration_secs`.
    pub fn total_segments(&self, presentation_duration_secs: f64) -> u64 {
        let segment_duration = self.segment_duration_secs();
        if !segment_duration.is_finite() || segment_duration <= 0.0 {
            tracing::error!(
                timescale = self.timescale,
                duration = self.duration,
                "Invalid segment duration, no segment can be addressed"
            );
            return 0;
        }

        (presentation_duration_secs / segment_duration).floor() as u64
    }
}

/// Renders the initialization path of `addr`, if its template declares one.
pub fn initialization_path(
    locator: &MpdLocator<'_>,
    addr: RepresentationAddress,
) -> ProxyResult<Option<String>> {
    let representation = locator.representation(addr)?;
    let Some(initialization) = locator
        .segment_template(addr)?
        .and_then(|template| template.initialization.as_deref())
        .filter(|initialization| !initialization.is_empty())
    else {
        return Ok(None);
    };

    Ok(Some(
        Template::for_representation(representation).resolve(initialization),
    ))
}

/// Computes the ordered media segment paths of `addr`.
///
/// Returns `None` when the representation has no `SegmentTemplate` with a `media` attribute.
pub fn resolve_segments(
    locator: &MpdLocator<'_>,
    addr: RepresentationAddress,
    presentation_duration_secs: f64,
) -> ProxyResult<Option<ResolvedSegments>> {
    let representation = locator.representation(addr)?;
    let segment_template = locator.segment_template(addr)?;
    let Some(media) = segment_template
        .and_then(|template| template.media.as_deref())
        .filter(|media| !media.is_empty())
    else {
        return Ok(None);
    };

    let mut template = Template::for_representation(representation);

    let resolved = if let Some(timeline) = locator.segment_timeline(addr)? {
        let segments = expand_timeline(&timeline.segments)
            .into_iter()
            .map(|segment| {
                template.insert(Template::TIME, segment.t.to_string());
                ResolvedSegment {
                    index: segment.t,
                    path: template.resolve(media),
                }
            })
            .collect();

        ResolvedSegments {
            mode: AddressingMode::Timeline,
            segments,
        }
    } else {
        let params = NumberParameters::resolve(
            locator.segment_template_from_adaptation_set(addr)?,
            segment_template,
        );
        let total = params.total_segments(presentation_duration_secs);
        tracing::debug!(
            start_number = params.start_number,
            total,
            "Resolved numbering parameters"
        );

        // Numbers run up to the segment count itself, whatever the start number is
        let segments = (params.start_number..=total)
            .map(|number| {
                template.insert(Template::NUMBER, number.to_string());
                ResolvedSegment {
                    index: number,
                    path: template.resolve(media),
                }
            })
            .collect();

        ResolvedSegments {
            mode: AddressingMode::Number,
            segments,
        }
    };

    Ok(Some(resolved))
}
