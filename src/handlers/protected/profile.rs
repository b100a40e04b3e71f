use axum::{
    body::Bytes,
    extract::{Extension, State},
    response::Response,
};

use crate::auth::Session;
use crate::handlers::utils::parse_body;
use crate::middleware::{handle, ApiResponse, Endpoint};
use crate::services::profiles::{self, ProfileUpdate};
use crate::state::AppState;

/// GET /api/profile/me
pub async fn get(State(state): State<AppState>, Extension(session): Extension<Session>) -> Response {
    handle(Endpoint::new("profile", "me"), async move {
        let principal = session.require()?;
        let profile = profiles::me(&state.db(&session), principal).await?;
        Ok(ApiResponse::success(profile))
    })
    .await
}

/// PATCH /api/profile/me - Only display_name, bio, website_url and avatar_url
pub async fn patch(State(state): State<AppState>, Extension(session): Extension<Session>, body: Bytes) -> Response {
    handle(Endpoint::new("profile", "update"), async move {
        let principal = session.require()?;
        let changes: ProfileUpdate = parse_body(&body)?;
        let profile = profiles::update(&state.db(&session), principal, changes).await?;
        Ok(ApiResponse::with_message(profile, "Profile updated successfully"))
    })
    .await
}
