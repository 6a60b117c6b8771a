//! HTTP request handlers.

pub mod authors;
pub mod books;
pub mod covers;

use serde_json::{Map, Value};

use crate::errors::ApiError;

/// Parse a request body as a JSON object.
///
/// An empty body and malformed JSON get the distinct messages clients
/// of this API match on.
pub fn parse_body(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest {
            message: "Missing request body".to_string(),
        });
    }
    let value: Value = serde_json::from_slice(body).map_err(|_| ApiError::BadRequest {
        message: "Invalid JSON in request body".to_string(),
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::BadRequest {
            message: "Request body must be a JSON object".to_string(),
        }),
    }
}

/// Extract the required `name` field from an author payload.
///
/// Absent or empty-ish values get the "missing" message (with a
/// `for update` suffix on renames); present non-strings get the type
/// message. The empty-ish check runs first, so `0` or `false` report
/// missing rather than mistyped.
pub fn require_name(data: &Map<String, Value>, for_update: bool) -> Result<String, ApiError> {
    let missing = || ApiError::BadRequest {
        message: if for_update {
            "Missing 'name' in request body for update".to_string()
        } else {
            "Missing 'name' in request body".to_string()
        },
    };

    let value = data.get("name").ok_or_else(missing)?;
    if is_emptyish(value) {
        return Err(missing());
    }
    match value {
        Value::String(s) => Ok(s.clone()),
        _ => Err(ApiError::BadRequest {
            message: "'name' must be a string".to_string(),
        }),
    }
}

/// JSON analog of falsiness: null, false, zero, and empty containers.
fn is_emptyish(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

// ── Tests ───────────────────────────────────────────────────────────
