//! Normalization of runtime-reported creation timestamps.
//!
//! `docker image inspect --format {{.Created}}` reports RFC 3339 with
//! nanoseconds, e.g. `2024-01-02T03:04:05.123456789Z`. We reduce that to
//! `20240102_030405` so plain string comparison orders by time. Every field is
//! assumed zero-padded to a fixed width; a differently padded runtime would
//! break the ordering and is not handled.

use std::fmt;

use chrono::NaiveDateTime;

const NORMALIZED_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Fixed-width `YYYYMMDD_HHMMSS` timestamp; `Ord` is string order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NormalizedTimestamp(String);

impl NormalizedTimestamp {
    /// Sorts before every real timestamp.
    pub const MIN_STR: &'static str = "00000000_000000";

    pub fn min() -> Self {
        Self(Self::MIN_STR.to_string())
    }

    /// Normalize a raw runtime timestamp.
    pub fn normalize(raw: &str) -> Self {
        Self(normalize_timestamp(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Structured view of the whole-second instant, if the string parses.
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        let s = self.0.get(..15)?;
        NaiveDateTime::parse_from_str(s, NORMALIZED_FORMAT).ok()
    }
}

impl fmt::Display for NormalizedTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Truncate at the first `.`, drop `:` and `-`, turn `T` into `_`.
pub fn normalize_timestamp(raw: &str) -> String {
    let s = raw.trim();
    let s = s.split('.').next().unwrap_or(s);
    s.chars()
        .filter(|c| *c != ':' && *c != '-')
        .map(|c| if c == 'T' { '_' } else { c })
        .collect()
}
