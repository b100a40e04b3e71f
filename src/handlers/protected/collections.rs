use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Extension, Query, State},
    response::Response,
};

use crate::auth::Session;
use crate::handlers::utils::{parse_body, required_param};
use crate::middleware::{handle, ApiResponse, Endpoint};
use crate::services::collections::{self, CollectionEntryInput, CollectionInput};
use crate::state::AppState;

/// GET /api/collections - The caller's collections with release counts
pub async fn get(State(state): State<AppState>, Extension(session): Extension<Session>) -> Response {
    handle(Endpoint::new("collections", "list"), async move {
        let principal = session.require()?;
        let list = collections::list(&state.db(&session), principal).await?;
        Ok(ApiResponse::success(list))
    })
    .await
}

/// POST /api/collections
pub async fn post(State(state): State<AppState>, Extension(session): Extension<Session>, body: Bytes) -> Response {
    handle(Endpoint::new("collections", "create"), async move {
        let principal = session.require()?;
        let input: CollectionInput = parse_body(&body)?;
        let collection = collections::create(&state.db(&session), principal, input).await?;
        Ok(ApiResponse::with_message(collection, "Collection created successfully"))
    })
    .await
}

/// DELETE /api/collections?id=
pub async fn delete(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    handle(Endpoint::new("collections", "delete"), async move {
        let principal = session.require()?;
        let id = required_param(&params, "id", "Collection ID")?;
        collections::delete(&state.db(&session), principal, id).await?;
        Ok(ApiResponse::with_message((), "Collection removed successfully"))
    })
    .await
}

/// POST /api/collections/releases - Add a release to one of the caller's collections
pub async fn add_release(State(state): State<AppState>, Extension(session): Extension<Session>, body: Bytes) -> Response {
    handle(Endpoint::new("collections", "add_release"), async move {
        let principal = session.require()?;
        let input: CollectionEntryInput = parse_body(&body)?;
        let outcome = collections::add_release(&state.db(&session), principal, input).await?;
        let message = if outcome.is_new {
            "Release added to collection"
        } else {
            "Release already in collection"
        };
        Ok(ApiResponse::with_message(outcome, message))
    })
    .await
}

/// DELETE /api/collections/releases?collectionId=&releaseId=
pub async fn remove_release(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    handle(Endpoint::new("collections", "remove_release"), async move {
        let principal = session.require()?;
        let collection_id = required_param(&params, "collectionId", "Collection ID")?;
        let release_id = required_param(&params, "releaseId", "Release ID")?;
        collections::remove_release(&state.db(&session), principal, collection_id, release_id).await?;
        Ok(ApiResponse::with_message((), "Release removed from collection"))
    })
    .await
}
