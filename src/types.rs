//! Shared identifiers and calendar time helpers.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Opaque, globally unique event identifier (UUID v4 text).
pub type EventId = String;

/// Input and display format for event and reminder times.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Name of the single zone every date string is interpreted in.
pub const TIME_ZONE_NAME: &str = "Asia/Irkutsk";

/// Irkutsk has been fixed at UTC+08:00 with no DST since 2014.
const ZONE_OFFSET_SECS: i32 = 8 * 3600;

static DATE_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}$").expect("date shape regex"));

/// Date string that does not match [`DATE_FORMAT`] or names a non-existent moment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date {input:?}, expected YYYY-MM-DD HH:MM")]
pub struct InvalidDate {
    /// Rejected input.
    pub input: String,
}

/// The calendar's fixed zone.
pub fn zone() -> FixedOffset {
    FixedOffset::east_opt(ZONE_OFFSET_SECS).expect("fixed zone offset")
}

/// Parses `input` with [`DATE_FORMAT`] in the calendar zone.
pub fn parse_date(input: &str) -> Result<DateTime<FixedOffset>, InvalidDate> {
    let invalid = || InvalidDate {
        input: input.to_string(),
    };

    if !DATE_SHAPE.is_match(input) {
        return Err(invalid());
    }
    let naive = NaiveDateTime::parse_from_str(input, DATE_FORMAT).map_err(|_| invalid())?;
    zone().from_local_datetime(&naive).single().ok_or_else(invalid)
}

/// Formats any instant as calendar-zone local time with [`DATE_FORMAT`].
pub fn format_date<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    at.with_timezone(&zone()).format(DATE_FORMAT).to_string()
}
