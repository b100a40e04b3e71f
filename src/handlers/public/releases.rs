use std::collections::HashMap;

use axum::{
    extract::{Extension, Query, State},
    response::Response,
};

use crate::auth::Session;
use crate::handlers::utils::required_param;
use crate::middleware::{handle, ApiResponse, Endpoint};
use crate::services::releases;
use crate::services::search::SearchParams;
use crate::state::AppState;

/// GET /api/releases?id= - Release with artists, genres, tracks and rating summary
pub async fn get(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    handle(Endpoint::new("releases", "detail"), async move {
        let id = required_param(&params, "id", "Release ID")?;
        let detail = releases::detail(&state.db(&session), id).await?;
        Ok(ApiResponse::success(detail))
    })
    .await
}

/// GET /api/releases/search?query=&limit=&offset= - Local catalog title search
pub async fn search(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    handle(Endpoint::new("releases", "search"), async move {
        let params = SearchParams::from_query(&params)?;
        let found = releases::search(&state.db(&session), &params).await?;
        Ok(ApiResponse::success(found))
    })
    .await
}
