use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::{resolve_principal, Session};
use crate::state::AppState;

/// Resolves the caller from the transport session on every request and
/// attaches a `Session`. Never rejects; handlers decide whether a principal
/// is required.
pub async fn session_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let session = match resolve_principal(state.sessions.as_ref(), request.headers()).await {
        Some(principal) => {
            tracing::debug!(principal = %principal.id, "session resolved");
            Session::authenticated(principal)
        }
        None => Session::anonymous(),
    };

    request.extensions_mut().insert(session);
    next.run(request).await
}
