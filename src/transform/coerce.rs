//! Cell coercion from JSON values returned by the BI API.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde_json::Value;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Parses a date from the string forms the BI API and spreadsheets produce.
///
/// Accepts plain dates (`2026-10-16`, `16/10/2026`), naive timestamps with
/// or without fractional seconds, and RFC 3339 timestamps with a zone. The
/// calendar date is taken as written, without shifting time zones.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use serde_json::json;
/// use team_reports::transform::parse_date;
///
/// let expected = NaiveDate::from_ymd_opt(2026, 10, 16);
/// assert_eq!(parse_date(&json!("2026-10-16T00:00:00")), expected);
/// assert_eq!(parse_date(&json!("16/10/2026")), expected);
/// assert_eq!(parse_date(&json!("yesterday")), None);
/// ```
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?.trim();
    if text.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Some(timestamp.date_naive());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|timestamp| timestamp.date())
}

/// Parses a decimal from a JSON number or numeric string.
///
/// Strings in Brazilian notation (`1.234,56`) are accepted as well.
pub fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                Some(Decimal::from(int))
            } else {
                number.as_f64().and_then(Decimal::from_f64)
            }
        }
        Value::String(text) => {
            let text = text.trim();
            Decimal::from_str(text).ok().or_else(|| {
                if text.contains(',') {
                    Decimal::from_str(&text.replace('.', "").replace(',', ".")).ok()
                } else {
                    None
                }
            })
        }
        _ => None,
    }
}

/// Parses a whole number from a JSON number or numeric string. Floats with a
/// fractional part are rejected.
pub fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>().ok().or_else(|| {
                text.parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

/// Renders a JSON cell as trimmed text; `null` and empty strings are `None`.
pub fn to_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(text) => text.trim().to_string(),
        other => other.to_string(),
    };
    if text.is_empty() { None } else { Some(text) }
}
