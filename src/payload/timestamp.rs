//! Timestamp detection
//!
//! Strings shaped like `2014-05-01T12:00:00Z` inside a payload are turned
//! into instants. The time portion is mandatory, so a bare `2014-05-01`
//! is left alone.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Date, time, optional fraction, optional `Z` or signed offset.
const TIMESTAMP_PATTERN: &str =
    r"^(\d{4})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2})(?:\.(\d*))?(?:Z|(\+|-)([\d:]*))?$";

fn timestamp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TIMESTAMP_PATTERN).expect("timestamp pattern is valid"))
}

/// Whether `s` has the shape of a timestamp (it may still name an impossible instant)
pub fn looks_like_timestamp(s: &str) -> bool {
    timestamp_regex().is_match(s)
}

/// Parse a timestamp string into a UTC instant
///
/// Returns `None` when the string does not match the pattern or names an
/// impossible date, time, or offset. Timestamps without a zone are read as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let caps = timestamp_regex().captures(s)?;

    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
    let date = NaiveDate::from_ymd_opt(year, num(2)?, num(3)?)?;
    let nanos = caps.get(7).map(|m| fraction_to_nanos(m.as_str())).unwrap_or(0);
    let naive = date.and_hms_nano_opt(num(4)?, num(5)?, num(6)?, nanos)?;

    let offset = match (caps.get(8), caps.get(9)) {
        (Some(sign), Some(digits)) => parse_offset(sign.as_str(), digits.as_str())?,
        _ => FixedOffset::east_opt(0)?,
    };

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Convert fractional-second digits into nanoseconds (extra precision is truncated)
fn fraction_to_nanos(digits: &str) -> u32 {
    let mut nanos = 0u32;
    for (i, c) in digits.chars().take(9).enumerate() {
        let d = c.to_digit(10).unwrap_or(0);
        nanos += d * 10u32.pow(8 - i as u32);
    }
    nanos
}

/// Accepts `HH`, `HHMM` and `HH:MM`
fn parse_offset(sign: &str, digits: &str) -> Option<FixedOffset> {
    let compact: String = digits.chars().filter(|c| *c != ':').collect();
    let (hours, minutes) = match compact.len() {
        2 => (compact.parse::<i32>().ok()?, 0),
        4 => (compact[..2].parse::<i32>().ok()?, compact[2..].parse::<i32>().ok()?),
        _ => return None,
    };

    if hours > 23 || minutes > 59 {
        return None;
    }

    let seconds = hours * 3600 + minutes * 60;
    match sign {
        "-" => FixedOffset::west_opt(seconds),
        _ => FixedOffset::east_opt(seconds),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_utc_timestamp() {
        let dt = parse_timestamp("2014-05-01T12:00:00Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2014, 5, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_date_only_is_not_a_timestamp() {
        assert!(!looks_like_timestamp("2014-05-01"));
        assert!(parse_timestamp("2014-05-01").is_none());
    }

    #[test]
    fn test_offsets() {
        let expected = Utc.with_ymd_and_hms(2014, 5, 1, 10, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2014-05-01T12:00:00+01:30"), Some(expected));
        assert_eq!(parse_timestamp("2014-05-01T12:00:00+0130"), Some(expected));

        let west = parse_timestamp("2014-05-01T12:00:00-05").unwrap();
        assert_eq!(west, Utc.with_ymd_and_hms(2014, 5, 1, 17, 0, 0).unwrap());
    }

    #[test]
    fn test_no_zone_is_utc() {
        let dt = parse_timestamp("2014-05-01T12:00:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2014, 5, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_fraction() {
        let dt = parse_timestamp("2014-05-01T12:00:00.250Z").unwrap();
        assert_eq!(dt.nanosecond(), 250_000_000);

        // A trailing dot without digits still matches
        assert!(parse_timestamp("2014-05-01T12:00:00.Z").is_some());
    }

    #[test]
    fn test_impossible_values() {
        assert!(looks_like_timestamp("2014-13-01T12:00:00Z"));
        assert!(parse_timestamp("2014-13-01T12:00:00Z").is_none());
        assert!(parse_timestamp("2014-05-01T25:00:00Z").is_none());
        assert!(parse_timestamp("2014-05-01T12:00:00+123").is_none());
    }

    #[test]
    fn test_surrounding_text_rejected() {
        assert!(!looks_like_timestamp(" 2014-05-01T12:00:00Z"));
        assert!(!looks_like_timestamp("paid 2014-05-01T12:00:00Z"));
    }
}
