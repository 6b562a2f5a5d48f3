use regex::{Captures, Regex, Replacer};
use std::{collections::HashMap, sync::LazyLock};

use crate::mpd::Representation;

// Format tags are the printf-style %[0][width]d: a `0` flag pads with zeros, otherwise
// the value is right-aligned with spaces. A bare %d prints the value as is.
//
// Example template: "$RepresentationID$/$Number%06d$.m4s"
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(RepresentationID|Number|Time|Bandwidth)(?:%(0?)(\d*)d)?\$")
        .expect("template regex is valid")
});

/// Values substituted into a `SegmentTemplate` URL.
///
/// Identifiers without a value are left untouched in the output.
#[derive(Debug, Clone, Default)]
pub struct Template<'a> {
    args: HashMap<&'a str, String>,
}

impl Template<'_> {
    pub const REPRESENTATION_ID: &'static str = "RepresentationID";
    pub const NUMBER: &'static str = "Number";
    pub const TIME: &'static str = "Time";
    pub const BANDWIDTH: &'static str = "Bandwidth";

    pub fn new() -> Self {
        Self {
            args: HashMap::with_capacity(4),
        }
    }

    /// A template carrying `$RepresentationID$` and `$Bandwidth$` of `representation`.
    pub fn for_representation(representation: &Representation) -> Self {
        let mut template = Self::new();
        template.insert(
            Self::REPRESENTATION_ID,
            representation.id.clone().unwrap_or_default(),
        );
        template.insert(
            Self::BANDWIDTH,
            representation
                .bandwidth
                .clone()
                .unwrap_or_default(),
        );
        template
    }

    pub fn insert(&mut self, key: &'static str, value: String) {
        self.args.insert(key, value);
    }

    pub fn resolve(&self, template: &str) -> String {
        TEMPLATE_REGEX
            .replace_all(template, TemplateReplacer(&self.args))
            .to_string()
    }
}

struct TemplateReplacer<'a>(&'a HashMap<&'a str, String>);

impl Replacer for TemplateReplacer<'_> {
    fn replace_append(&mut self, caps: &Captures<'_>, dst: &mut String) {
        let Some(value) = self.0.get(&caps[1]) else {
            dst.push_str(&caps[0]);
            return;
        };

        let zero_pad = caps.get(2).is_some_and(|m| !m.as_str().is_empty());
        match caps.get(3).and_then(|m| m.as_str().parse::<usize>().ok()) {
            Some(width) if zero_pad => dst.push_str(&format!("{value:0>width$}")),
            Some(width) => dst.push_str(&format!("{value:>width$}")),
            None => dst.push_str(value),
        }
    }
}
