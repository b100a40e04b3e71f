use std::collections::HashMap;

use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Decode a JSON request body. Malformed or unexpected input is a validation
/// failure, never a transport-level rejection.
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::invalid_request("Request body is required"));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::invalid_request(format!("Invalid request body: {}", e)))
}

/// Non-blank query parameter, e.g. `required_param(&params, "id", "Release ID")`.
pub fn required_param<'a>(params: &'a HashMap<String, String>, name: &str, label: &str) -> Result<&'a str, ApiError> {
    params
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation(name, format!("{} is required", label)))
}
