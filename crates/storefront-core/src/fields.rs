//! Lenient field access for backend records.
//!
//! The order backend is a spreadsheet behind Apps Script, so the same field
//! can arrive under several names, in any letter case, as a number or as a
//! string. These helpers coerce such values the same way everywhere: missing
//! or malformed numbers become zero, never an error.

use serde_json::{Map, Value};

/// Returns the first present, non-null value among `keys`.
pub fn pick<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|value| !value.is_null())
}

/// Copies a record with every key lower-cased.
pub fn lower_keys(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| (key.to_lowercase(), value.clone()))
        .collect()
}

/// Borrows the object behind a value, if it is one.
pub fn as_object(value: &Value) -> Option<&Map<String, Value>> {
    value.as_object()
}

/// Renders a scalar as text. Null becomes the empty string.
pub fn as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Coerces a value to a finite float; anything else is `0.0`.
pub fn as_f64(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(0.0)
            }
        }
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };
    if parsed.is_finite() { parsed } else { 0.0 }
}

/// Coerces a value to an integer the way a leading-digits parse would:
/// `"12 pcs"` is 12, `"abc"` is 0, `3.9` is 3.
pub fn as_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => parse_leading_int(s),
        _ => 0,
    }
}

/// Parses an optional sign followed by digits at the start of `s`.
pub fn parse_leading_int(s: &str) -> i64 {
    let trimmed = s.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().map(|n| sign * n).unwrap_or(0)
}

/// Truthiness as the backend means it: `true`, non-zero numbers and
/// non-empty strings.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
        Value::Null => false,
    }
}

/// Reads a yes/no flag: strings are true only for `"Y"` (any case), numbers
/// when non-zero, booleans as they are.
pub fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::String(s) => Some(s.eq_ignore_ascii_case("y")),
        Value::Number(n) => Some(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::Bool(b) => Some(*b),
        _ => None,
    }
}
