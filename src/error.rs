// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use thiserror::Error;

use crate::database::StoreError;
use crate::metadata::MetadataError;

pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized access";
pub const UNEXPECTED_MESSAGE: &str = "An unexpected error occurred";

/// Failure of one of the external collaborators.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The hosted data store rejected or failed a call. The detail is shown to the client.
    #[error("{context}: {detail}")]
    Persistence { context: String, detail: String },

    /// The third-party catalog failed. Only the context is shown to the client.
    #[error("{context}: {detail}")]
    Metadata { context: String, detail: String },
}

/// Every failure a domain operation can report. The route wrapper is the only
/// place these turn into HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    // 401
    #[error("Unauthorized access")]
    Unauthorized,

    // 400
    #[error("{message}")]
    Validation { field: Option<String>, message: String },

    // 404, never distinguishes "absent" from "not yours"
    #[error("{0}")]
    NotFound(String),

    // 400 (persistence) or 500 (metadata)
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    // 500
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(UpstreamError::Persistence { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(UpstreamError::Metadata { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-safe error message
    pub fn message(&self) -> String {
        match self {
            ApiError::Unauthorized => UNAUTHORIZED_MESSAGE.to_string(),
            ApiError::Validation { message, .. } => message.clone(),
            ApiError::NotFound(message) => message.clone(),
            ApiError::Upstream(UpstreamError::Persistence { context, detail }) => {
                format!("{}: {}", context, detail)
            }
            ApiError::Upstream(UpstreamError::Metadata { context, .. }) => context.clone(),
            ApiError::Unexpected(_) => UNEXPECTED_MESSAGE.to_string(),
        }
    }

    /// Input field a validation failure is about, if any. Logged, never sent.
    pub fn field(&self) -> Option<&str> {
        match self {
            ApiError::Validation { field, .. } => field.as_deref(),
            _ => None,
        }
    }

    /// Stable code used in logs
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Upstream(UpstreamError::Persistence { .. }) => "PERSISTENCE_ERROR",
            ApiError::Upstream(UpstreamError::Metadata { .. }) => "METADATA_ERROR",
            ApiError::Unexpected(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Failure envelope: `success` is false, `data` is absent.
    pub fn to_json(&self) -> Value {
        json!({
            "success": false,
            "error": self.message(),
        })
    }
}

impl ApiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Validation failure that is not tied to a single field (e.g. malformed body).
    pub fn invalid_request(message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: None,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn unexpected(detail: impl Into<String>) -> Self {
        ApiError::Unexpected(detail.into())
    }

    /// Wrap a persistence failure with the operation it interrupted,
    /// e.g. `ApiError::persistence("Failed to save rating", err)`.
    pub fn persistence(context: impl Into<String>, err: StoreError) -> Self {
        ApiError::Upstream(UpstreamError::Persistence {
            context: context.into(),
            detail: err.detail(),
        })
    }

    pub fn metadata(context: impl Into<String>, err: MetadataError) -> Self {
        ApiError::Upstream(UpstreamError::Metadata {
            context: context.into(),
            detail: err.to_string(),
        })
    }
}

/// Extension for attaching operation context to store results.
pub trait StoreResultExt<T> {
    fn context(self, context: &str) -> Result<T, ApiError>;
}

impl<T> StoreResultExt<T> for Result<T, StoreError> {
    fn context(self, context: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::persistence(context, e))
    }
}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_has_fixed_message() {
        let err = ApiError::Unauthorized;
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_json(), json!({"success": false, "error": "Unauthorized access"}));
    }

    #[test]
    fn validation_maps_to_400_with_field_message() {
        let err = ApiError::validation("score", "Score must be a number between 0 and 10");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Score must be a number between 0 and 10");
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert_eq!(err.field(), Some("score"));
        assert!(err.to_json().get("field").is_none());
    }

    #[test]
    fn request_level_failures_have_no_field() {
        assert_eq!(ApiError::invalid_request("Request body is required").field(), None);
        assert_eq!(ApiError::not_found("Release not found").field(), None);
    }

    #[test]
    fn persistence_failure_exposes_detail() {
        let err = ApiError::persistence(
            "Failed to save rating",
            StoreError::Rejected {
                status: 409,
                message: "duplicate key".into(),
            },
        );
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Failed to save rating: duplicate key");
    }

    #[test]
    fn metadata_failure_hides_detail() {
        let err = ApiError::metadata(
            "Failed to search for albums",
            MetadataError::Status {
                status: 503,
                reason: "Service Unavailable".into(),
            },
        );
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Failed to search for albums");
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn unexpected_is_generic() {
        let err = ApiError::unexpected("index out of bounds");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), UNEXPECTED_MESSAGE);
        assert!(err.to_json().get("data").is_none());
    }
}
