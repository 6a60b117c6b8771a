//! API error types.
//!
//! Every variant maps to an HTTP status code and renders as a JSON body
//! `{"error": <message>, "details"?: <context>}`. The enum implements
//! [`axum::response::IntoResponse`] so handlers can simply return
//! `Err(ApiError::NotFound { .. })`.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Generate a 16-character hex request ID.
pub fn generate_request_id() -> String {
    let bytes: [u8; 8] = rand::random();
    hex::encode(bytes).to_uppercase()
}

/// API errors expressed as a Rust enum.
#[derive(Debug, Error)]
pub enum ApiError {
    /// One or more payload fields failed validation.
    #[error("Validation failed")]
    Validation { details: BTreeMap<String, String> },

    /// The request shape itself was unusable (missing body, bad JSON,
    /// missing or mistyped top-level field).
    #[error("{message}")]
    BadRequest { message: String },

    /// A path identifier did not parse.
    #[error("Invalid {param} format")]
    InvalidId { param: &'static str },

    /// The cover image payload on an explicit update was not valid base64.
    #[error("Invalid base64 for coverImageBase64")]
    InvalidImageData,

    /// No record matched the identifier.
    #[error("{resource} with id {id} not found")]
    NotFound { resource: &'static str, id: String },

    /// The request conflicts with an existing record (duplicate name).
    #[error("{message}")]
    Conflict { message: String },

    /// A signed cover URL failed verification.
    #[error("{message}")]
    Forbidden { message: String },

    /// The catalog store is unreachable or was never configured.
    #[error("Database connection failed or not configured.")]
    StorageUnavailable { reason: String },

    /// Cover-image object storage is not configured.
    #[error("Cover image storage is not configured")]
    CoversNotConfigured,

    /// Catch-all for unexpected internal errors.
    #[error("An unexpected server error occurred.")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Return the appropriate HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::InvalidId { .. } => StatusCode::BAD_REQUEST,
            ApiError::InvalidImageData => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::StorageUnavailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::CoversNotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Optional machine-readable context rendered under `details`.
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::Validation { details } => serde_json::to_value(details).ok(),
            ApiError::StorageUnavailable { reason } => {
                Some(serde_json::Value::String(reason.clone()))
            }
            ApiError::Internal(err) => Some(serde_json::Value::String(format!("{err:#}"))),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let request_id = generate_request_id();
        let status = self.status_code();
        let date = httpdate::fmt_http_date(std::time::SystemTime::now());

        if status.is_server_error() {
            tracing::error!("Request failed with {}: {:#}", status, self);
        }

        let mut body = serde_json::json!({ "error": self.to_string() });
        if let Some(details) = self.details() {
            body["details"] = details;
        }

        (
            status,
            [
                ("x-request-id", request_id),
                ("date", date),
                ("server", "Bookdex".to_string()),
            ],
            axum::Json(body),
        )
            .into_response()
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Validation {
                details: BTreeMap::new()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InvalidId { param: "bookId" }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound {
                resource: "Book",
                id: "x".into()
            }
            .status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict {
                message: "dup".into()
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::StorageUnavailable {
                reason: "down".into()
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::CoversNotConfigured.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found_message() {
        let err = ApiError::NotFound {
            resource: "Book",
            id: "65a1b2c3d4e5f60718293a4b".into(),
        };
        assert_eq!(
            err.to_string(),
            "Book with id 65a1b2c3d4e5f60718293a4b not found"
        );
    }

    #[test]
    fn test_invalid_id_message() {
        assert_eq!(
            ApiError::InvalidId { param: "bookId" }.to_string(),
            "Invalid bookId format"
        );
        assert_eq!(
            ApiError::InvalidId { param: "authorId" }.to_string(),
            "Invalid authorId format"
        );
    }

    #[test]
    fn test_validation_carries_details() {
        let mut details = BTreeMap::new();
        details.insert("pageCount".to_string(), "must be a positive integer".to_string());
        let err = ApiError::Validation { details };
        assert_eq!(err.to_string(), "Validation failed");
        let rendered = err.details().unwrap();
        assert_eq!(rendered["pageCount"], "must be a positive integer");
    }

    #[test]
    fn test_request_id_format() {
        let id = generate_request_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
