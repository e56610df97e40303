//! # Date Handling Utilities
//!
//! Parsing and encoding helpers for date-typed fields.
//!
//! Source documents frequently carry timestamps that almost, but not quite,
//! match the declared format: a trailing UTC offset, or a sub-second fraction
//! the format does not mention. Both are tolerated here so that field
//! definitions only need to describe the whole-second shape of the value.

use std::fmt::Write;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Format used by date fields that do not declare one.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

static UTC_OFFSET_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*?)[+-]\d{2}:\d{2}$").expect("offset regex should compile"));
static DOT_FRACTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*)\.(\d{1,6})$").expect("fraction regex should compile"));
static COMMA_FRACTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*),(\d{3})$").expect("fraction regex should compile"));

/// Errors raised while converting between text and dates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DateError {
    /// The value did not match the expected format.
    #[error("'{value}' does not match date format '{format}'")]
    Parse { value: String, format: String },
    /// The format string could not render the value.
    #[error("date format '{format}' is not valid for output")]
    Format { format: String },
}

/// Removes a trailing `[+-]HH:MM` UTC offset, if present.
///
/// The offset is discarded rather than applied: the result is the local
/// wall-clock portion of the timestamp.
///
/// # Example
/// ```rust
/// use docbind_util::date_handling::strip_utc_offset;
///
/// assert_eq!(strip_utc_offset("2008-06-21T10:36:12-06:00"), "2008-06-21T10:36:12");
/// assert_eq!(strip_utc_offset("2008-06-21T10:36:12"), "2008-06-21T10:36:12");
/// ```
pub fn strip_utc_offset(value: &str) -> &str {
    UTC_OFFSET_SUFFIX
        .captures(value)
        .and_then(|captures| captures.get(1))
        .map(|whole| whole.as_str())
        .unwrap_or(value)
}

/// Parses a naive date-time using a strftime-style format.
///
/// Resolution order:
/// 1. Strip a trailing UTC offset.
/// 2. Parse the remaining text with `format` (date-only formats yield midnight).
/// 3. When that fails and the format contains `%S`, split off a trailing
///    `.ffffff` or `,fff` fraction, parse the whole-second portion, and add the
///    fraction back at microsecond resolution.
///
/// # Errors
/// Returns [`DateError::Parse`] when none of the above produce a value.
///
/// # Example
/// ```rust
/// use chrono::NaiveDate;
/// use docbind_util::date_handling::{parse_naive_datetime, DEFAULT_DATE_FORMAT};
///
/// let parsed = parse_naive_datetime("2008-06-21T10:36:12.280-06:00", DEFAULT_DATE_FORMAT).unwrap();
/// let expected = NaiveDate::from_ymd_opt(2008, 6, 21).unwrap().and_hms_micro_opt(10, 36, 12, 280_000).unwrap();
/// assert_eq!(parsed, expected);
/// ```
pub fn parse_naive_datetime(value: &str, format: &str) -> Result<NaiveDateTime, DateError> {
    let candidate = strip_utc_offset(value.trim());

    if let Some(parsed) = parse_whole(candidate, format) {
        return Ok(parsed);
    }

    if format.contains("%S")
        && let Some((whole, micros)) = split_fraction(candidate)
        && let Some(parsed) = parse_whole(whole, format)
    {
        return Ok(parsed + TimeDelta::microseconds(micros));
    }

    Err(DateError::Parse {
        value: value.to_string(),
        format: format.to_string(),
    })
}

/// Renders a date-time with a strftime-style format.
pub fn format_naive_datetime(value: &NaiveDateTime, format: &str) -> Result<String, DateError> {
    let mut rendered = String::new();
    write!(rendered, "{}", value.format(format)).map_err(|_| DateError::Format {
        format: format.to_string(),
    })?;
    Ok(rendered)
}

/// Milliseconds since the Unix epoch, treating the naive value as UTC.
pub fn to_epoch_millis(value: &NaiveDateTime) -> i64 {
    value.and_utc().timestamp_millis()
}

/// Converts epoch milliseconds (possibly fractional) into a naive UTC value.
///
/// Returns `None` when the instant is outside chrono's supported range.
pub fn from_epoch_millis(millis: f64) -> Option<NaiveDateTime> {
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_micros((millis * 1000.0).round() as i64).map(|instant| instant.naive_utc())
}

fn parse_whole(value: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, format).ok().or_else(|| {
        NaiveDate::parse_from_str(value, format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    })
}

fn split_fraction(value: &str) -> Option<(&str, i64)> {
    let captures = DOT_FRACTION.captures(value).or_else(|| COMMA_FRACTION.captures(value))?;
    let whole = captures.get(1)?.as_str();
    let digits = captures.get(2)?.as_str();
    // right-pad to six digits: ".28" is 280000 microseconds
    let micros = format!("{digits:0<6}").parse::<i64>().ok()?;
    Some((whole, micros))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, micro: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_micro_opt(h, mi, s, micro)
            .unwrap()
    }

    #[test]
    fn parses_default_iso_format() {
        let parsed = parse_naive_datetime("2008-06-21T10:36:12", DEFAULT_DATE_FORMAT).unwrap();
        assert_eq!(parsed, datetime(2008, 6, 21, 10, 36, 12, 0));
    }

    #[test]
    fn offset_is_discarded_not_applied() {
        let with_offset = parse_naive_datetime("2008-06-21T10:36:12+05:30", DEFAULT_DATE_FORMAT).unwrap();
        let without_offset = parse_naive_datetime("2008-06-21T10:36:12", DEFAULT_DATE_FORMAT).unwrap();
        assert_eq!(with_offset, without_offset);
    }

    #[test]
    fn dotted_fraction_is_added_as_microseconds() {
        let parsed = parse_naive_datetime("2008-06-21T10:36:12.280-06:00", DEFAULT_DATE_FORMAT).unwrap();
        assert_eq!(parsed, datetime(2008, 6, 21, 10, 36, 12, 280_000));

        let parsed = parse_naive_datetime("2008-06-21T10:36:12.000123", DEFAULT_DATE_FORMAT).unwrap();
        assert_eq!(parsed, datetime(2008, 6, 21, 10, 36, 12, 123));
    }

    #[test]
    fn comma_fraction_requires_three_digits() {
        let parsed = parse_naive_datetime("2008-06-21T10:36:12,500", DEFAULT_DATE_FORMAT).unwrap();
        assert_eq!(parsed, datetime(2008, 6, 21, 10, 36, 12, 500_000));
        assert!(parse_naive_datetime("2008-06-21T10:36:12,5", DEFAULT_DATE_FORMAT).is_err());
    }

    #[test]
    fn fraction_is_not_split_when_format_has_no_seconds() {
        assert!(parse_naive_datetime("2008-06-21 10:36.5", "%Y-%m-%d %H:%M").is_err());
    }

    #[test]
    fn date_only_formats_yield_midnight() {
        let parsed = parse_naive_datetime("2023/06/15", "%Y/%m/%d").unwrap();
        assert_eq!(parsed, datetime(2023, 6, 15, 0, 0, 0, 0));
    }

    #[test]
    fn malformed_values_are_errors() {
        let error = parse_naive_datetime("yesterday", DEFAULT_DATE_FORMAT).unwrap_err();
        assert_eq!(
            error,
            DateError::Parse {
                value: "yesterday".into(),
                format: DEFAULT_DATE_FORMAT.into()
            }
        );
    }

    #[test]
    fn epoch_millis_conversions() {
        assert_eq!(from_epoch_millis(135.0), Some(datetime(1970, 1, 1, 0, 0, 0, 135_000)));
        let value = datetime(1980, 1, 1, 0, 0, 0, 135_000);
        assert_eq!(to_epoch_millis(&value), 315_532_800_135);
        assert_eq!(from_epoch_millis(f64::NAN), None);
    }

    #[test]
    fn formats_with_configured_pattern() {
        let value = datetime(2008, 6, 21, 10, 36, 12, 0);
        assert_eq!(format_naive_datetime(&value, DEFAULT_DATE_FORMAT).unwrap(), "2008-06-21T10:36:12");
        assert_eq!(format_naive_datetime(&value, "%d/%m/%Y").unwrap(), "21/06/2008");
    }
}
