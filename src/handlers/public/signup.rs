use axum::{body::Bytes, extract::State, response::Response};

use crate::handlers::utils::parse_body;
use crate::middleware::{handle, ApiResponse, Endpoint};
use crate::services::profiles::{self, SignupProfileInput};
use crate::state::AppState;

/// POST /api/auth/profile - Create the profile row right after signup
///
/// Runs under the elevated credential because the new user has no session
/// yet. The user id must belong to an existing auth user and must not have a
/// profile already.
pub async fn create_profile(State(state): State<AppState>, body: Bytes) -> Response {
    handle(Endpoint::new("auth", "create_profile"), async move {
        let input: SignupProfileInput = parse_body(&body)?;
        let profile = profiles::create_for_signup(&state.elevated_db(), state.sessions.as_ref(), input).await?;
        Ok(ApiResponse::with_message(profile, "Profile created successfully"))
    })
    .await
}
