use std::collections::HashMap;

use axum::{
    extract::{Extension, Query, State},
    response::Response,
};

use crate::auth::Session;
use crate::middleware::{handle, ApiResponse, Endpoint};
use crate::services::reviews;
use crate::services::search::{numeric_param, DEFAULT_LIMIT, MAX_LIMIT};
use crate::state::AppState;

/// GET /api/reviews/recent?limit= - Published reviews feed
pub async fn recent(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    handle(Endpoint::new("reviews", "recent"), async move {
        let limit = numeric_param(&params, "limit", "Limit")?
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT);
        let feed = reviews::recent(&state.db(&session), limit).await?;
        Ok(ApiResponse::success(feed))
    })
    .await
}
