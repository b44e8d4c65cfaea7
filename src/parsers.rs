//! Time and id parsing utilities.
//!
//! These helpers coerce the loosely typed values found in battle report
//! payloads into proper Rust types.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

/// Errors from parsing a related-time string
#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Related time must be 12 digits (YYYYMMDDHHMM), got {0:?}")]
    BadShape(String),
    #[error("Invalid related time: {0}")]
    Invalid(#[from] chrono::ParseError),
}

/// Parse a WarBeacon related time like `202512030400` into a UTC datetime
pub fn parse_related_time(related_time: &str) -> Result<DateTime<Utc>, TimeParseError> {
    if related_time.len() != 12 || !related_time.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimeParseError::BadShape(related_time.to_string()));
    }
    let dt = NaiveDateTime::parse_from_str(related_time, "%Y%m%d%H%M")?;
    Ok(dt.and_utc())
}

/// Convert a related time like `202512030400` into ISO-8601 (`2025-12-03T04:00:00Z`)
pub fn related_time_to_iso(related_time: &str) -> Result<String, TimeParseError> {
    let dt = parse_related_time(related_time)?;
    Ok(dt.format("%Y-%m-%dT%H:%M:00Z").to_string())
}

/// Render a datetime as the `MM/DD/YYYY` date shown on reports
pub fn display_date(dt: &DateTime<Utc>) -> String {
    dt.format("%m/%d/%Y").to_string()
}

/// Parse a killmail time into a UTC datetime.
///
/// Accepts Unix timestamps in seconds (fractions are truncated) and ISO-8601
/// strings with a `Z` suffix, an explicit offset, or no zone at all (taken as
/// UTC). Anything else yields `None`.
pub fn parse_killmail_time(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let secs = n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64))?;
            DateTime::from_timestamp(secs, 0)
        }
        Value::String(s) => parse_iso_time(s),
        _ => None,
    }
}

fn parse_iso_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.and_utc())
}

/// Coerce a character id to an integer.
///
/// Integers pass through, floats are truncated, strings are parsed after
/// trimming. Everything else (null, bools, arrays, objects) is rejected.
pub fn coerce_character_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Coerce an alliance or corporation id to an integer.
///
/// Like [`coerce_character_id`] but floats must be integral, so `98648442.0`
/// resolves while `3.5` does not.
pub fn coerce_entity_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) if n.as_i64().is_none() => n
            .as_f64()
            .filter(|f| f.fract() == 0.0)
            .and_then(|_| coerce_character_id(value)),
        _ => coerce_character_id(value),
    }
}
