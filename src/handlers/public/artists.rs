use std::collections::HashMap;

use axum::{
    extract::{Extension, Query, State},
    response::Response,
};

use crate::auth::Session;
use crate::handlers::utils::required_param;
use crate::middleware::{handle, ApiResponse, Endpoint};
use crate::services::artists;
use crate::services::search::SearchParams;
use crate::state::AppState;

/// GET /api/artists?id=
pub async fn get(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    handle(Endpoint::new("artists", "detail"), async move {
        let id = required_param(&params, "id", "Artist ID")?;
        let detail = artists::detail(&state.db(&session), id).await?;
        Ok(ApiResponse::success(detail))
    })
    .await
}

/// GET /api/artists/search?query=&limit=&offset=
pub async fn search(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    handle(Endpoint::new("artists", "search"), async move {
        let params = SearchParams::from_query(&params)?;
        let found = artists::search(&state.db(&session), &params).await?;
        Ok(ApiResponse::success(found))
    })
    .await
}
