use axum::{extract::State, response::Response};
use serde_json::json;

use crate::middleware::{handle, ApiResponse, Endpoint};
use crate::state::AppState;

/// GET / - Service description
pub async fn root(State(state): State<AppState>) -> Response {
    handle(Endpoint::new("service", "root"), async move {
        Ok(ApiResponse::success(json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "environment": state.config.environment,
            "endpoints": {
                "public": [
                    "GET /api/music/search",
                    "GET /api/music/release-group",
                    "GET /api/music/release-group/releases",
                    "GET /api/music/release",
                    "GET /api/music/cover-art",
                    "GET /api/releases",
                    "GET /api/releases/search",
                    "GET /api/artists",
                    "GET /api/artists/search",
                    "GET /api/reviews/recent",
                    "GET /api/profiles",
                    "GET /api/collections/detail",
                    "POST /api/auth/profile"
                ],
                "protected": [
                    "GET|POST|DELETE /api/ratings",
                    "GET|POST|DELETE /api/reviews",
                    "GET|POST|DELETE /api/collections",
                    "POST|DELETE /api/collections/releases",
                    "GET|PATCH /api/profile/me"
                ]
            }
        })))
    })
    .await
}

/// GET /health - Liveness only; upstream collaborators are not checked
pub async fn health() -> Response {
    handle(Endpoint::new("service", "health"), async {
        Ok(ApiResponse::success(json!({
            "status": "ok",
            "timestamp": chrono::Utc::now(),
        })))
    })
    .await
}
