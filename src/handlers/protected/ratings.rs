use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Extension, Query, State},
    response::Response,
};

use crate::auth::Session;
use crate::handlers::utils::{parse_body, required_param};
use crate::middleware::{handle, ApiResponse, Endpoint};
use crate::services::ratings::{self, RatingInput};
use crate::state::AppState;

/// GET /api/ratings - The caller's ratings
pub async fn get(State(state): State<AppState>, Extension(session): Extension<Session>) -> Response {
    handle(Endpoint::new("ratings", "list"), async move {
        let principal = session.require()?;
        let list = ratings::list(&state.db(&session), principal).await?;
        Ok(ApiResponse::success(list))
    })
    .await
}

/// POST /api/ratings - Rate a release, replacing any earlier score
pub async fn post(State(state): State<AppState>, Extension(session): Extension<Session>, body: Bytes) -> Response {
    handle(Endpoint::new("ratings", "upsert"), async move {
        let principal = session.require()?;
        let input: RatingInput = parse_body(&body)?;
        let outcome = ratings::upsert(&state.db(&session), principal, input).await?;
        let message = if outcome.is_new { "Rating added" } else { "Rating updated" };
        Ok(ApiResponse::with_message(outcome, message))
    })
    .await
}

/// DELETE /api/ratings?releaseId=
pub async fn delete(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    handle(Endpoint::new("ratings", "delete"), async move {
        let principal = session.require()?;
        let release_id = required_param(&params, "releaseId", "Release ID")?;
        ratings::delete(&state.db(&session), principal, release_id).await?;
        Ok(ApiResponse::with_message((), "Rating removed successfully"))
    })
    .await
}
