use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    response::Response,
};
use serde_json::json;

use crate::handlers::utils::required_param;
use crate::middleware::{handle, ApiResponse, Endpoint};
use crate::services::search::{self, numeric_param, SearchParams};
use crate::state::AppState;

/// GET /api/music/search?query=&limit=&offset=
pub async fn search(State(state): State<AppState>, Query(params): Query<HashMap<String, String>>) -> Response {
    handle(Endpoint::new("music", "search"), async move {
        let params = SearchParams::from_query(&params)?;
        let results = search::release_groups(state.metadata.as_ref(), &params).await?;
        Ok(ApiResponse::success(results))
    })
    .await
}

/// GET /api/music/release-group?id=
pub async fn release_group(State(state): State<AppState>, Query(params): Query<HashMap<String, String>>) -> Response {
    handle(Endpoint::new("music", "release_group"), async move {
        let id = required_param(&params, "id", "Release group ID")?;
        let group = search::release_group(state.metadata.as_ref(), id).await?;
        Ok(ApiResponse::success(group))
    })
    .await
}

/// GET /api/music/release-group/releases?id=&limit=
pub async fn release_group_releases(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    handle(Endpoint::new("music", "release_group_releases"), async move {
        let id = required_param(&params, "id", "Release group ID")?;
        let limit = numeric_param(&params, "limit", "Limit")?;
        let releases = search::releases_for_group(state.metadata.as_ref(), id, limit).await?;
        Ok(ApiResponse::success(releases))
    })
    .await
}

/// GET /api/music/release?id=
pub async fn release(State(state): State<AppState>, Query(params): Query<HashMap<String, String>>) -> Response {
    handle(Endpoint::new("music", "release"), async move {
        let id = required_param(&params, "id", "Release ID")?;
        let release = search::release(state.metadata.as_ref(), id).await?;
        Ok(ApiResponse::success(release))
    })
    .await
}

/// GET /api/music/cover-art?id=&size=
pub async fn cover_art(Query(params): Query<HashMap<String, String>>) -> Response {
    handle(Endpoint::new("music", "cover_art"), async move {
        let id = required_param(&params, "id", "Release ID")?;
        let url = search::cover_art(id, params.get("size").map(String::as_str))?;
        Ok(ApiResponse::success(json!({ "url": url })))
    })
    .await
}
