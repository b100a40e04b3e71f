use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Extension, Query, State},
    response::Response,
};

use crate::auth::Session;
use crate::handlers::utils::{parse_body, required_param};
use crate::middleware::{handle, ApiResponse, Endpoint};
use crate::services::reviews::{self, ReviewInput};
use crate::state::AppState;

/// GET /api/reviews - The caller's reviews
pub async fn get(State(state): State<AppState>, Extension(session): Extension<Session>) -> Response {
    handle(Endpoint::new("reviews", "list"), async move {
        let principal = session.require()?;
        let list = reviews::list(&state.db(&session), principal).await?;
        Ok(ApiResponse::success(list))
    })
    .await
}

/// POST /api/reviews - Write or rewrite the caller's review of a release
pub async fn post(State(state): State<AppState>, Extension(session): Extension<Session>, body: Bytes) -> Response {
    handle(Endpoint::new("reviews", "upsert"), async move {
        let principal = session.require()?;
        let input: ReviewInput = parse_body(&body)?;
        let outcome = reviews::upsert(&state.db(&session), principal, input).await?;
        let message = if outcome.is_new { "Review added" } else { "Review updated" };
        Ok(ApiResponse::with_message(outcome, message))
    })
    .await
}

/// DELETE /api/reviews?id=
pub async fn delete(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    handle(Endpoint::new("reviews", "delete"), async move {
        let principal = session.require()?;
        let id = required_param(&params, "id", "Review ID")?;
        reviews::delete(&state.db(&session), principal, id).await?;
        Ok(ApiResponse::with_message((), "Review removed successfully"))
    })
    .await
}
