// Shared parameter validators
//
// Pure predicates over loosely-typed params. None of these panic: malformed
// input yields false and the calling handler turns that into a structured
// validation error.

use chrono::{DateTime, FixedOffset, Utc};
use serde_json::{Map, Value};

/// Borrow the params as a JSON object, or None for any other shape.
pub fn as_object(params: &Value) -> Option<&Map<String, Value>> {
    params.as_object()
}

/// True iff every value is present, is a string, and is non-empty after
/// trimming whitespace.
pub fn non_empty_strings(values: &[Option<&Value>]) -> bool {
    values.iter().all(|value| {
        matches!(value, Some(Value::String(s)) if !s.trim().is_empty())
    })
}

fn parse_instant(s: &str) -> Option<DateTime<FixedOffset>> {
    // Trailing "Z" is normalized to an explicit offset before parsing.
    let normalized = match s.strip_suffix('Z') {
        Some(stripped) => format!("{stripped}+00:00"),
        None => s.to_string(),
    };
    DateTime::parse_from_rfc3339(&normalized).ok()
}

/// Accepts an RFC 3339 instant, with either a trailing "Z" or an explicit
/// numeric offset such as "+02:00".
pub fn is_valid_timestamp(s: &str) -> bool {
    parse_instant(s).is_some()
}

/// True iff start < end (strict ordering). Both must be valid timestamps.
pub fn is_chronological(start: &str, end: &str) -> bool {
    match (parse_instant(start), parse_instant(end)) {
        (Some(start), Some(end)) => start < end,
        _ => false,
    }
}

/// True iff the parsed start instant is at or after `now`.
///
/// `now` is caller-supplied so the check is testable with a fixed clock.
pub fn is_not_past(start: &str, now: DateTime<Utc>) -> bool {
    match parse_instant(start) {
        Some(start) => start >= now,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_non_empty_strings_accepts_trimmed_strings() {
        let a = json!("hello");
        let b = json!("  world  ");
        assert!(non_empty_strings(&[Some(&a), Some(&b)]));
    }

    #[test]
    fn test_non_empty_strings_rejects_missing_blank_and_non_string() {
        let blank = json!("   ");
        let number = json!(42);
        let ok = json!("fine");
        assert!(!non_empty_strings(&[None]));
        assert!(!non_empty_strings(&[Some(&blank)]));
        assert!(!non_empty_strings(&[Some(&number)]));
        assert!(!non_empty_strings(&[Some(&ok), Some(&blank)]));
    }

    #[test]
    fn test_valid_timestamp_utc_designator() {
        assert!(is_valid_timestamp("2025-06-01T10:00:00Z"));
    }

    #[test]
    fn test_valid_timestamp_numeric_offset() {
        assert!(is_valid_timestamp("2025-06-01T10:00:00+02:00"));
    }

    #[test]
    fn test_invalid_timestamp() {
        assert!(!is_valid_timestamp("not-a-date"));
        assert!(!is_valid_timestamp("2025-06-01"));
        assert!(!is_valid_timestamp(""));
    }

    #[test]
    fn test_chronological_ordering() {
        assert!(is_chronological(
            "2025-06-01T09:00:00Z",
            "2025-06-01T10:00:00Z"
        ));
        // end before start
        assert!(!is_chronological(
            "2025-06-01T10:00:00Z",
            "2025-06-01T09:00:00Z"
        ));
        // equal timestamps fail the strict ordering
        assert!(!is_chronological(
            "2025-06-01T10:00:00Z",
            "2025-06-01T10:00:00Z"
        ));
    }

    #[test]
    fn test_chronological_mixed_offsets() {
        // 10:00+02:00 is 08:00Z, so it precedes 09:00Z
        assert!(is_chronological(
            "2025-06-01T10:00:00+02:00",
            "2025-06-01T09:00:00Z"
        ));
    }

    #[test]
    fn test_chronological_rejects_malformed_input() {
        assert!(!is_chronological("garbage", "2025-06-01T10:00:00Z"));
        assert!(!is_chronological("2025-06-01T10:00:00Z", "garbage"));
    }

    #[test]
    fn test_is_not_past() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        assert!(is_not_past("2025-06-01T13:00:00Z", now));
        assert!(is_not_past("2025-06-01T12:00:00Z", now));
        assert!(!is_not_past("2025-06-01T11:00:00Z", now));
        assert!(!is_not_past("garbage", now));
    }
}
