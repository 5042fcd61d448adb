//! Lenient deserializers for rows coming back from the REST backend.
//!
//! Column types drift between deployments (integer vs uuid ids, `date` vs
//! `timestamptz`, numeric strings in JSON columns), so rows are normalized
//! here, once, at the boundary.

use chrono::{ DateTime, NaiveDate, NaiveDateTime, Utc };
use serde::de::{ self, Deserializer };
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS[.f]` (taken as UTC) and `YYYY-MM-DD`.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn value_to_i64(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        JsonValue::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

pub fn id<'de, D>(deserializer: D) -> Result<String, D::Error> where D: Deserializer<'de> {
    match JsonValue::deserialize(deserializer)? {
        JsonValue::String(s) => Ok(s),
        JsonValue::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("unsupported id value: {}", other))),
    }
}

/// Nullable id column; numeric ids are kept as their decimal text.
pub fn opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where D: Deserializer<'de>
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::Null => Ok(None),
        JsonValue::String(s) => Ok(Some(s)),
        JsonValue::Number(n) => Ok(Some(n.to_string())),
        other => Err(de::Error::custom(format!("unsupported id value: {}", other))),
    }
}

/// Text column where `null` reads as empty.
pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error> where D: Deserializer<'de> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn int<'de, D>(deserializer: D) -> Result<i64, D::Error> where D: Deserializer<'de> {
    match JsonValue::deserialize(deserializer)? {
        JsonValue::Null => Ok(0),
        other =>
            value_to_i64(&other).ok_or_else(||
                de::Error::custom(format!("expected an integer, got {}", other))
            ),
    }
}

/// Like [`int`] but unreadable values become `None` instead of failing the row.
pub fn opt_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where D: Deserializer<'de>
{
    let value = JsonValue::deserialize(deserializer)?;
    Ok(value_to_i64(&value))
}

pub fn float<'de, D>(deserializer: D) -> Result<f64, D::Error> where D: Deserializer<'de> {
    match JsonValue::deserialize(deserializer)? {
        JsonValue::Null => Ok(0.0),
        JsonValue::Number(n) => n.as_f64().ok_or_else(|| de::Error::custom("invalid number")),
        JsonValue::String(s) =>
            s
                .trim()
                .parse::<f64>()
                .map_err(|_| de::Error::custom(format!("expected a number, got '{}'", s))),
        other => Err(de::Error::custom(format!("expected a number, got {}", other))),
    }
}

pub fn opt_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where D: Deserializer<'de>
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) =>
            parse_datetime(&s)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("unrecognized date '{}'", s))),
    }
}

/// `null`, missing, or non-array JSON all collapse to an empty list.
pub fn list_or_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where D: Deserializer<'de>, T: serde::de::DeserializeOwned
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(serde_json::from_value(item).map_err(de::Error::custom)?);
            }
            Ok(out)
        }
        _ => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{ Datelike, Timelike };

    #[test]
    fn parses_the_date_shapes_postgrest_returns() {
        let full = parse_datetime("2025-03-04T10:20:30+00:00").unwrap();
        assert_eq!((full.hour(), full.minute()), (10, 20));
        let naive = parse_datetime("2025-03-04T10:20:30.123").unwrap();
        assert_eq!(naive.second(), 30);
        let date = parse_datetime("2025-03-04").unwrap();
        assert_eq!((date.year(), date.month(), date.day(), date.hour()), (2025, 3, 4, 0));
        assert!(parse_datetime("04/03/2025").is_none());
    }
}
