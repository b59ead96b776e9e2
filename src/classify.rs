//! Freshness classification.
//!
//! A record is stale when its `updated_at` is older than the configured
//! threshold; a stale record displays as `stale` regardless of its raw
//! status. A missing or unparseable `updated_at` classifies as stale.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use crate::data::Cell;

pub const STALE: &str = "stale";
pub const NORMAL: &str = "normal";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Freshness {
    pub is_stale: bool,
    pub display_status: String,
}

/// Classify from a raw timestamp string.
pub fn classify(
    updated_at: Option<&str>,
    status: Option<&str>,
    now_ms: i64,
    threshold_ms: u64,
) -> Freshness {
    classify_ms(updated_at.and_then(parse_timestamp), status, now_ms, threshold_ms)
}

/// Classify from an already parsed epoch-millisecond timestamp.
pub fn classify_ms(
    updated_ms: Option<i64>,
    status: Option<&str>,
    now_ms: i64,
    threshold_ms: u64,
) -> Freshness {
    let is_stale = match updated_ms {
        Some(ts) => (now_ms as i128 - ts as i128) > threshold_ms as i128,
        None => true,
    };
    let display_status = if is_stale {
        STALE.to_string()
    } else {
        status
            .filter(|s| !s.is_empty())
            .unwrap_or(NORMAL)
            .to_string()
    };
    Freshness {
        is_stale,
        display_status,
    }
}

/// Offset-carrying shapes beyond RFC 3339: minute precision, space
/// separator, and basic (`+hhmm`) offsets.
const ZONED_FORMATS: [&str; 8] = [
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%d %H:%M%z",
];

/// Parse a feed timestamp into epoch milliseconds.
///
/// Accepts RFC 3339, the same shapes with minute precision, a space
/// separator, a `Z` suffix or a `+hhmm` offset, plus offset-less
/// `YYYY-MM-DD[T ]HH:MM[:SS[.fff]]` and a bare `YYYY-MM-DD`. Offset-less
/// forms are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    let zulu = s
        .strip_suffix('Z')
        .or_else(|| s.strip_suffix('z'))
        .map(|rest| format!("{}+00:00", rest));
    let zoned = zulu.as_deref().unwrap_or(s);
    for fmt in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(zoned, fmt) {
            return Some(dt.timestamp_millis());
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// Timestamp of a feed cell: text is parsed, numbers are epoch milliseconds.
pub fn parse_cell_timestamp(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Text(s) => parse_timestamp(s),
        Cell::Number(n) if n.is_finite() => Some(*n as i64),
        _ => None,
    }
}

pub fn to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
}
