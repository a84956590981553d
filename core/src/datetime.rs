use chrono::{DateTime, Duration, NaiveDateTime};

pub const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M";
pub const LOCAL_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";
pub const DEFAULT_BLOCK_MINUTES: i64 = 60;

const ACCEPTED_FORMATS: &[&str] = &[
    CANONICAL_FORMAT,
    LOCAL_INPUT_FORMAT,
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parses any of the wall-clock forms the server or a browser input may hand
/// us. Zoned RFC 3339 strings keep their wall-clock reading; the browser layer
/// handles anything else through `Date`.
pub fn parse_flexible(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for format in ACCEPTED_FORMATS {
        if let Ok(value) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(value);
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|value| value.naive_local())
}

pub fn format_canonical(value: &NaiveDateTime) -> String {
    value.format(CANONICAL_FORMAT).to_string()
}

pub fn format_local_input(value: &NaiveDateTime) -> String {
    value.format(LOCAL_INPUT_FORMAT).to_string()
}

pub fn canonical_from_local(raw: &str) -> Option<String> {
    parse_flexible(raw).map(|value| format_canonical(&value))
}

pub fn local_from_canonical(raw: &str) -> Option<String> {
    parse_flexible(raw).map(|value| format_local_input(&value))
}

pub fn default_end(start: &NaiveDateTime) -> NaiveDateTime {
    *start + Duration::minutes(DEFAULT_BLOCK_MINUTES)
}

/// The paired end field is rewritten when it is empty, unreadable, or no
/// longer after the start.
pub fn end_needs_advance(start: &NaiveDateTime, end_raw: &str) -> bool {
    match parse_flexible(end_raw) {
        Some(end) => end <= *start,
        None => true,
    }
}

/// Half-open interval overlap: touching ranges do not overlap.
pub fn intervals_overlap(
    a_start: &NaiveDateTime,
    a_end: &NaiveDateTime,
    b_start: &NaiveDateTime,
    b_end: &NaiveDateTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

pub fn format_time_range(start: Option<&NaiveDateTime>, end: Option<&NaiveDateTime>) -> String {
    match (start, end) {
        (Some(start), Some(end)) if start.date() == end.date() => format!(
            "{} {}–{}",
            start.format("%a %b %-d"),
            start.format("%-I:%M %p"),
            end.format("%-I:%M %p")
        ),
        (Some(start), Some(end)) => format!(
            "{} – {}",
            start.format("%a %b %-d %-I:%M %p"),
            end.format("%a %b %-d %-I:%M %p")
        ),
        (Some(start), None) => start.format("%a %b %-d %-I:%M %p").to_string(),
        _ => String::new(),
    }
}
