use std::collections::HashMap;

use axum::{
    extract::{Extension, Query, State},
    response::Response,
};

use crate::auth::Session;
use crate::handlers::utils::required_param;
use crate::middleware::{handle, ApiResponse, Endpoint};
use crate::services::profiles;
use crate::state::AppState;

/// GET /api/profiles?username=
pub async fn get(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    handle(Endpoint::new("profiles", "by_username"), async move {
        let username = required_param(&params, "username", "Username")?;
        let profile = profiles::by_username(&state.db(&session), session.principal(), username).await?;
        Ok(ApiResponse::success(profile))
    })
    .await
}
