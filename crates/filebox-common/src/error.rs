//! Centralized error types for Filebox.
//!
//! Uses `thiserror` for ergonomic error definitions and provides HTTP-friendly
//! error variants that can be directly converted to API responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::collections::BTreeMap;

/// Validation failures keyed by failure name, e.g.
/// `{"InvalidFileType": ["Input file type is not supported"]}`.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Core application error type returned by API handlers.
#[derive(Debug, thiserror::Error)]
pub enum FileboxError {
    /// A request that was rejected with a fixed, client-facing message.
    #[error("{message}")]
    BadRequest { message: String },

    /// One or more upload checks failed.
    #[error("One or more validation errors occurred")]
    InvalidFields { errors: FieldErrors },
}

/// JSON error response body sent to clients.
#[derive(Serialize)]
struct ErrorResponse {
    code: u16,
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<FieldErrors>,
}

impl FileboxError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Map error to HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } | Self::InvalidFields { .. } => StatusCode::BAD_REQUEST,
        }
    }

    /// Error code string for programmatic handling by clients.
    pub fn error_code(&self) -> &str {
        match self {
            Self::BadRequest { .. } => "BAD_REQUEST",
            Self::InvalidFields { .. } => "VALIDATION_ERROR",
        }
    }
}

impl IntoResponse for FileboxError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = ErrorResponse {
            code: status.as_u16(),
            error: self.error_code().to_string(),
            message: self.to_string(),
            errors: match self {
                FileboxError::InvalidFields { errors } => Some(errors),
                _ => None,
            },
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Convenience type alias for Results using FileboxError.
pub type FileboxResult<T> = Result<T, FileboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_message_is_verbatim() {
        let err = FileboxError::bad_request("failed to upload file : a.pdf ");
        assert_eq!(err.to_string(), "failed to upload file : a.pdf ");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_field_errors_serialize_under_errors_key() {
        let mut errors = FieldErrors::new();
        errors.insert("NoFile".into(), vec!["file not uploaded".into()]);
        let body = ErrorResponse {
            code: 400,
            error: "VALIDATION_ERROR".into(),
            message: "x".into(),
            errors: Some(errors),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["errors"]["NoFile"][0], "file not uploaded");
    }
}
