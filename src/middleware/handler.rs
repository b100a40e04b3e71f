use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use serde::Serialize;

use super::response::ApiResult;
use crate::error::ApiError;

/// Identifies a route for failure logging, e.g. `Endpoint::new("ratings", "upsert")`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub resource: &'static str,
    pub operation: &'static str,
}

impl Endpoint {
    pub const fn new(resource: &'static str, operation: &'static str) -> Self {
        Self { resource, operation }
    }
}

/// Run a domain operation and turn its outcome into an HTTP response.
///
/// The operation builds its own success envelope, which is returned as is.
/// Failures, including panics, are logged with the endpoint and converted
/// here and nowhere else:
///
/// - `Unauthorized` becomes 401 "Unauthorized access"
/// - other typed failures use their own status and message
/// - panics become 500 "An unexpected error occurred"
pub async fn handle<T, F>(endpoint: Endpoint, operation: F) -> Response
where
    T: Serialize,
    F: Future<Output = ApiResult<T>>,
{
    match AssertUnwindSafe(operation).catch_unwind().await {
        Ok(Ok(response)) => response.into_response(),
        Ok(Err(err)) => failure(endpoint, err),
        Err(panic) => failure(endpoint, ApiError::unexpected(panic_detail(panic.as_ref()))),
    }
}

fn failure(endpoint: Endpoint, err: ApiError) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        tracing::error!(
            resource = endpoint.resource,
            operation = endpoint.operation,
            code = err.error_code(),
            status = status.as_u16(),
            detail = %err,
            "request failed"
        );
    } else {
        tracing::warn!(
            resource = endpoint.resource,
            operation = endpoint.operation,
            code = err.error_code(),
            status = status.as_u16(),
            field = ?err.field(),
            detail = %err,
            "request rejected"
        );
    }
    err.into_response()
}

fn panic_detail(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
