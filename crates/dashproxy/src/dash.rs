//! Segment addressing for `SegmentTemplate` based representations.
//!
//! [`template`] renders `$Identifier$` URL templates and [`resolve`] turns a
//! representation's template into the ordered list of segment paths to mirror.

pub mod resolve;
pub mod template;
