// Domain operations. Each takes a credential-scoped `Db`, validates its
// input, talks to the store and returns typed output or a typed failure.
// None of them touch HTTP.
pub mod artists;
pub mod collections;
pub mod profiles;
pub mod ratings;
pub mod releases;
pub mod reviews;
pub mod search;

use chrono::{DateTime, Utc};

use crate::error::ApiError;

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Trimmed value of a required text field, or a validation failure naming it.
pub(crate) fn required_text(value: Option<String>, field: &str, message: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation(field, message))
}

/// Trimmed optional text; blank becomes `None`.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
