use std::collections::HashMap;

use axum::{
    extract::{Extension, Query, State},
    response::Response,
};

use crate::auth::Session;
use crate::handlers::utils::required_param;
use crate::middleware::{handle, ApiResponse, Endpoint};
use crate::services::collections;
use crate::state::AppState;

/// GET /api/collections/detail?id= - Public collection, or one the caller owns
pub async fn detail(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    handle(Endpoint::new("collections", "detail"), async move {
        let id = required_param(&params, "id", "Collection ID")?;
        let detail = collections::detail(&state.db(&session), session.principal(), id).await?;
        Ok(ApiResponse::success(detail))
    })
    .await
}
