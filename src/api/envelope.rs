//! Guards for Gazelle `{status, response}` envelopes and payload shapes.
//!
//! Throttled Gazelle servers sometimes answer 200 with garbage: a bare
//! `{"status": "failure"}` or a string where an object belongs. These helpers
//! turn such shapes into a [`ShapeError`] instead of silently reading defaults.

use serde_json::{Map, Value};
use thiserror::Error;

/// Hint appended to shape errors that usually mean server-side throttling.
pub const THROTTLE_SHAPE_HINT: &str = "possible rate-limit/throttle response";

/// A payload did not have the expected JSON shape.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{context} {reason} ({THROTTLE_SHAPE_HINT})")]
pub struct ShapeError {
    /// Dotted path of the offending value, e.g. `browse.response.results[2]`.
    pub context: String,
    /// What was wrong.
    pub reason: String,
    /// True when the envelope reported `status: failure` without a response.
    pub failure_envelope: bool,
}

impl ShapeError {
    fn unexpected_type(context: &str, value: &Value) -> Self {
        Self {
            context: context.to_string(),
            reason: format!("has unexpected type '{}'", json_type_name(value)),
            failure_envelope: false,
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Requires `value` to be a JSON object.
///
/// # Errors
///
/// Returns [`ShapeError`] for any other JSON type.
pub fn expect_object<'a>(value: &'a Value, context: &str) -> Result<&'a Map<String, Value>, ShapeError> {
    value
        .as_object()
        .ok_or_else(|| ShapeError::unexpected_type(context, value))
}

/// Reads an optional object field; missing or null yields `None`.
///
/// # Errors
///
/// Returns [`ShapeError`] when the field exists but is not an object.
pub fn optional_object<'a>(
    container: &'a Map<String, Value>,
    key: &str,
    context: &str,
) -> Result<Option<&'a Map<String, Value>>, ShapeError> {
    match container.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => expect_object(value, &format!("{context}.{key}")).map(Some),
    }
}

/// Reads an optional array of objects; missing or null yields an empty list.
///
/// # Errors
///
/// Returns [`ShapeError`] when the field is not an array or holds non-objects.
pub fn optional_list_of_objects<'a>(
    container: &'a Map<String, Value>,
    key: &str,
    context: &str,
) -> Result<Vec<&'a Map<String, Value>>, ShapeError> {
    let values = match container.get(key) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(values)) => values,
        Some(other) => return Err(ShapeError::unexpected_type(&format!("{context}.{key}"), other)),
    };
    values
        .iter()
        .enumerate()
        .map(|(idx, value)| expect_object(value, &format!("{context}.{key}[{idx}]")))
        .collect()
}

/// Unwraps a Gazelle envelope and returns its `response` object.
///
/// A missing `response` on a successful envelope yields an empty map.
///
/// # Errors
///
/// Returns [`ShapeError`] when the root is not an object, when the envelope is
/// `status: failure` without a response, or when `response` is not an object.
pub fn response_payload<'a>(payload: &'a Value, context: &str) -> Result<&'a Map<String, Value>, ShapeError> {
    static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();

    let root = expect_object(payload, &format!("{context} payload"))?;
    let status = root
        .get("status")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_default();

    if status == "failure" && !root.contains_key("response") {
        let detail = root
            .get("error")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(|s| format!(": {s}"))
            .unwrap_or_default();
        return Err(ShapeError {
            context: context.to_string(),
            reason: format!("returned status=failure without response{detail}"),
            failure_envelope: true,
        });
    }

    Ok(optional_object(root, "response", context)?.unwrap_or_else(|| EMPTY.get_or_init(Map::new)))
}
