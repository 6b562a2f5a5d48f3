//! A lenient reader for the ISO-8601 durations found in MPD attributes such as
//! `mediaPresentationDuration`.

/// Splits `s` on the first `delimiter`, returning the part before it and the rest.
///
/// A missing delimiter yields an empty head and leaves `s` untouched.
fn split_field(s: &str, delimiter: char) -> (&str, &str) {
    s.split_once(delimiter).unwrap_or(("", s))
}

fn parse_field<T>(field: &str) -> T
where
    T: std::str::FromStr + Default,
{
    field.trim().parse().unwrap_or_default()
}

/// Converts a duration such as `PT1M30.5S` or `P1DT2H` into seconds.
///
/// Fields are read in the order days, hours, minutes, seconds and a trailing
/// millisecond fraction. Any field that is absent or unreadable counts as zero,
/// so this never fails: an empty string is `0.0`.
pub fn parse_iso_duration(s: &str) -> f64 {
    let s = s.rsplit('P').next().unwrap_or_default();

    let (days, s) = split_field(s, 'D');
    let (_, s) = split_field(s, 'T');
    let (hours, s) = split_field(s, 'H');
    let (minutes, s) = split_field(s, 'M');
    let (seconds, s) = split_field(s, 'S');
    let (milliseconds, _) = split_field(s, '.');

    let days: u64 = parse_field(days);
    let hours: u64 = parse_field(hours);
    let minutes: u64 = parse_field(minutes);
    let seconds: f64 = parse_field(seconds);
    let milliseconds: u64 = parse_field(milliseconds);

    days as f64 * 86400.0
        + hours as f64 * 3600.0
        + minutes as f64 * 60.0
        + seconds
        + milliseconds as f64 / 1000.0
}
