pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod metadata;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::handlers::{protected, public, service};
use crate::state::AppState;

/// The full HTTP surface. Every route sees a `Session` extension resolved by
/// `session_middleware`; protected handlers reject anonymous sessions themselves.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security);

    Router::new()
        .route("/", get(service::root))
        .route("/health", get(service::health))
        .merge(public_routes())
        .merge(protected_routes())
        .layer(from_fn_with_state(state.clone(), middleware::session_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/music/search", get(public::music::search))
        .route("/api/music/release-group", get(public::music::release_group))
        .route(
            "/api/music/release-group/releases",
            get(public::music::release_group_releases),
        )
        .route("/api/music/release", get(public::music::release))
        .route("/api/music/cover-art", get(public::music::cover_art))
        .route("/api/releases", get(public::releases::get))
        .route("/api/releases/search", get(public::releases::search))
        .route("/api/artists", get(public::artists::get))
        .route("/api/artists/search", get(public::artists::search))
        .route("/api/reviews/recent", get(public::reviews::recent))
        .route("/api/profiles", get(public::profiles::get))
        .route("/api/collections/detail", get(public::collections::detail))
        .route("/api/auth/profile", post(public::signup::create_profile))
}

fn protected_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/ratings",
            get(protected::ratings::get)
                .post(protected::ratings::post)
                .delete(protected::ratings::delete),
        )
        .route(
            "/api/reviews",
            get(protected::reviews::get)
                .post(protected::reviews::post)
                .delete(protected::reviews::delete),
        )
        .route(
            "/api/collections",
            get(protected::collections::get)
                .post(protected::collections::post)
                .delete(protected::collections::delete),
        )
        .route(
            "/api/collections/releases",
            post(protected::collections::add_release).delete(protected::collections::remove_release),
        )
        .route(
            "/api/profile/me",
            get(protected::profile::get).patch(protected::profile::patch),
        )
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.permissive_cors {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
