//! Write-path date canonicalization.
//!
//! The backend expects one temporal wire format regardless of how the UI
//! collected the value, so request bodies are walked recursively and every
//! string that parses as a date or datetime is rewritten to a canonical UTC
//! instant (`YYYY-MM-DDTHH:MM:SS.mmmZ`).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Rewrite every date-like string in `value` to the canonical instant format,
/// recursing through nested objects and arrays.
pub fn canonicalize(value: &mut Value) {
  match value {
    Value::String(s) => {
      if let Some(canonical) = canonical_instant(s) {
        *s = canonical;
      }
    }
    Value::Array(items) => {
      for item in items {
        canonicalize(item);
      }
    }
    Value::Object(map) => {
      for (_, v) in map.iter_mut() {
        canonicalize(v);
      }
    }
    _ => {}
  }
}

/// Parse a date-like string; `None` means the string is not temporal and must
/// be left alone.
fn canonical_instant(s: &str) -> Option<String> {
  // Bare date: midnight UTC.
  if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
    let instant = date.and_hms_opt(0, 0, 0)?.and_utc();
    return Some(instant.format(CANONICAL_FORMAT).to_string());
  }

  // Full datetime with offset (RFC 3339).
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc).format(CANONICAL_FORMAT).to_string());
  }

  // Datetime without offset: assume UTC.
  for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
      return Some(naive.and_utc().format(CANONICAL_FORMAT).to_string());
    }
  }

  None
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_bare_date_becomes_midnight_instant() {
    let mut value = json!({"startsAt": "2024-03-05"});
    canonicalize(&mut value);
    assert_eq!(value["startsAt"], "2024-03-05T00:00:00.000Z");
  }

  #[test]
  fn test_offset_datetime_is_converted_to_utc() {
    let mut value = json!({"endsAt": "2024-03-05T10:30:00+02:00"});
    canonicalize(&mut value);
    assert_eq!(value["endsAt"], "2024-03-05T08:30:00.000Z");
  }

  #[test]
  fn test_naive_datetime_assumed_utc() {
    let mut value = json!("2024-03-05T10:30:00");
    canonicalize(&mut value);
    assert_eq!(value, json!("2024-03-05T10:30:00.000Z"));
  }

  #[test]
  fn test_recurses_into_nested_objects_and_arrays() {
    let mut value = json!({
      "title": "Algebra",
      "sessions": [{"date": "2024-01-15"}, {"date": "2024-01-22"}],
      "meta": {"publishedAt": "2024-01-01T12:00:00Z"}
    });
    canonicalize(&mut value);
    assert_eq!(value["sessions"][0]["date"], "2024-01-15T00:00:00.000Z");
    assert_eq!(value["sessions"][1]["date"], "2024-01-22T00:00:00.000Z");
    assert_eq!(value["meta"]["publishedAt"], "2024-01-01T12:00:00.000Z");
    assert_eq!(value["title"], "Algebra");
  }

  #[test]
  fn test_non_temporal_strings_untouched() {
    let mut value = json!({"name": "2024 cohort", "code": "MATH-101"});
    canonicalize(&mut value);
    assert_eq!(value["name"], "2024 cohort");
    assert_eq!(value["code"], "MATH-101");
  }
}
