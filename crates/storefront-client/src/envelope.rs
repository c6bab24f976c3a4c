//! Backend response envelopes.
//!
//! Backends answer with loosely shaped JSON. Parsing never fails: anything
//! unreadable becomes an `{ok: false, error: ...}` object so callers only
//! deal with one shape.

use serde_json::{Value, json};
use storefront_core::fields;

/// Anti-JSON-hijacking prefix some proxies prepend.
pub const XSSI_GUARD: &str = ")]}'";

/// Longest raw body kept in a `parse_error` envelope.
pub const RAW_SNIPPET_CHARS: usize = 2000;

/// Error code when no base is configured.
pub const NO_BASE_CONFIG: &str = "no_base_config";
/// Error code when every base failed.
pub const NETWORK_TIMEOUT: &str = "network_timeout";
/// Error code for an unparsable body.
pub const PARSE_ERROR: &str = "parse_error";

/// Builds `{ok: false, error: code}`.
pub fn failure(code: &str) -> Value {
    json!({"ok": false, "error": code})
}

fn strip_guard(text: &str) -> &str {
    let Some(rest) = text.strip_prefix(XSSI_GUARD) else {
        return text;
    };
    rest.strip_prefix(',').unwrap_or(rest).trim_start()
}

/// Parses a response body.
///
/// Empty bodies give `{}`. A body that is not JSON is retried without the
/// [`XSSI_GUARD`] prefix, then reported as `parse_error` with the first
/// [`RAW_SNIPPET_CHARS`] characters. A non-2xx status whose body carries
/// neither `ok` nor `error` becomes `http_<status>`.
pub fn parse_body(status: u16, text: &str) -> Value {
    let parsed = if text.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str::<Value>(text)
            .or_else(|_| serde_json::from_str::<Value>(strip_guard(text)))
            .unwrap_or_else(|_| {
                let raw: String = text.chars().take(RAW_SNIPPET_CHARS).collect();
                json!({"ok": false, "error": PARSE_ERROR, "_raw": raw})
            })
    };

    if !(200..300).contains(&status) && !is_ok(&parsed) && error_of(&parsed).is_none() {
        return failure(&format!("http_{status}"));
    }
    parsed
}

/// Whether the envelope reports success (`ok` truthy).
pub fn is_ok(value: &Value) -> bool {
    value.get("ok").is_some_and(fields::is_truthy)
}

/// Whether the envelope explicitly reports failure (`ok: false` or a
/// truthy `error`).
pub fn is_failure(value: &Value) -> bool {
    value.get("ok") == Some(&Value::Bool(false)) || error_of(value).is_some()
}

/// The `error` text, when present and non-empty.
pub fn error_of(value: &Value) -> Option<String> {
    value
        .get("error")
        .filter(|v| fields::is_truthy(v))
        .map(fields::as_text)
}

/// Extracts a row list from an array response or from the first array
/// found under `data`, `items`, `rows` or `list`.
pub fn rows_of(value: &Value) -> Option<Vec<Value>> {
    if let Some(rows) = value.as_array() {
        return Some(rows.clone());
    }
    ["data", "items", "rows", "list"]
        .iter()
        .find_map(|k| value.get(*k).and_then(Value::as_array))
        .cloned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json() {
        assert_eq!(parse_body(200, r#"{"ok":true,"n":1}"#), json!({"ok": true, "n": 1}));
        assert_eq!(parse_body(200, "[1,2]"), json!([1, 2]));
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(parse_body(200, ""), json!({}));
        assert_eq!(parse_body(204, "  "), json!({}));
    }

    #[test]
    fn test_guard_stripped() {
        assert_eq!(parse_body(200, ")]}',\n{\"ok\":true}"), json!({"ok": true}));
        assert_eq!(parse_body(200, ")]}'[1]"), json!([1]));
    }

    #[test]
    fn test_parse_error_keeps_snippet() {
        let long = "x".repeat(5000);
        let v = parse_body(200, &long);
        assert_eq!(error_of(&v).as_deref(), Some(PARSE_ERROR));
        assert_eq!(v["_raw"].as_str().unwrap().len(), RAW_SNIPPET_CHARS);
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(parse_body(502, "<html>bad gateway</html>"), json!({"ok": false, "error": "parse_error", "_raw": "<html>bad gateway</html>"}));
        assert_eq!(parse_body(503, ""), failure("http_503"));
        assert_eq!(parse_body(404, r#"{"msg":"nope"}"#), failure("http_404"));
        assert_eq!(
            parse_body(400, r#"{"ok":false,"error":"bad_code"}"#),
            json!({"ok": false, "error": "bad_code"})
        );
    }

    #[test]
    fn test_rows_of() {
        assert_eq!(rows_of(&json!([{"a": 1}])).unwrap().len(), 1);
        assert_eq!(rows_of(&json!({"ok": true, "data": [1, 2]})).unwrap().len(), 2);
        assert_eq!(rows_of(&json!({"items": [1]})).unwrap().len(), 1);
        assert!(rows_of(&json!({"ok": true})).is_none());
    }

    #[test]
    fn test_failure_detection() {
        assert!(is_failure(&failure(NETWORK_TIMEOUT)));
        assert!(is_failure(&json!({"error": "x"})));
        assert!(!is_failure(&json!({"price": 1000})));
        assert!(is_ok(&json!({"ok": 1})));
    }
}
