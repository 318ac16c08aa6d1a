//! Lenient field readers for Gazelle JSON.
//!
//! The two trackers disagree on key casing (`groupId` vs `groupid`) and on
//! whether numbers arrive as numbers or strings, so readers take a list of
//! candidate keys and coerce values.

use serde_json::{Map, Value};

/// Coerces ints, floats and digit strings (commas allowed) to `i64`.
///
/// ```
/// use serde_json::json;
/// use crossupload_core::catalog::as_int;
///
/// assert_eq!(as_int(&json!(12)), Some(12));
/// assert_eq!(as_int(&json!(12.7)), Some(12));
/// assert_eq!(as_int(&json!("1,234")), Some(1234));
/// assert_eq!(as_int(&json!("12a")), None);
/// assert_eq!(as_int(&json!(null)), None);
/// ```
#[must_use]
pub fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            #[allow(clippy::cast_possible_truncation)]
            n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)
        }),
        Value::String(s) => {
            let cleaned = s.replace(',', "");
            let cleaned = cleaned.trim();
            if !cleaned.is_empty() && cleaned.chars().all(|c| c.is_ascii_digit()) {
                cleaned.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    }
}

/// First key whose value coerces to an integer.
#[must_use]
pub fn int_field(map: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|key| map.get(*key).and_then(as_int))
}

/// First key holding a non-empty string (numbers are stringified).
#[must_use]
pub fn str_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match map.get(*key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_int_field_tries_keys_in_order() {
        let value = json!({"b": "5", "a": null});
        let map = value.as_object().unwrap();
        assert_eq!(int_field(map, &["a", "b"]), Some(5));
        assert_eq!(int_field(map, &["c"]), None);
    }

    #[test]
    fn test_str_field_skips_empty_strings() {
        let value = json!({"a": "", "b": "x", "n": 3});
        let map = value.as_object().unwrap();
        assert_eq!(str_field(map, &["a", "b"]), Some("x".to_string()));
        assert_eq!(str_field(map, &["n"]), Some("3".to_string()));
        assert_eq!(str_field(map, &["a"]), None);
    }

    #[test]
    fn test_as_int_rejects_bools_and_negative_strings() {
        assert_eq!(as_int(&json!(true)), None);
        assert_eq!(as_int(&json!("-4")), None);
        assert_eq!(as_int(&json!(-4)), Some(-4));
    }
}
