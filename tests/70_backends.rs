// Wire-level checks for the hosted data store and auth clients, run against a
// local server that records every request it receives.
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;

use beesides_api::auth::{AuthError, SessionResolver, SupabaseAuth};
use beesides_api::config::SupabaseConfig;
use beesides_api::database::{Access, PostgrestStore, Query, Store, StoreError};

const ANON_KEY: &str = "anon-key";
const SERVICE_KEY: &str = "service-key";
const KNOWN_USER: &str = "6f1c2a9e-3b7d-4e58-9a21-0c4d5e6f7a8b";
const UNKNOWN_USER: &str = "0b9e8d7c-6a5f-4e3d-8c2b-1a0f9e8d7c6b";

#[derive(Debug, Clone)]
struct Seen {
    method: Method,
    path: String,
    query: String,
    apikey: Option<String>,
    bearer: Option<String>,
    prefer: Option<String>,
}

type Log = Arc<Mutex<Vec<Seen>>>;

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

async fn record(State(log): State<Log>, method: Method, uri: Uri, headers: HeaderMap) -> Response {
    let bearer = header_value(&headers, "authorization").and_then(|v| v.strip_prefix("Bearer ").map(str::to_string));
    let seen = Seen {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().unwrap_or_default().to_string(),
        apikey: header_value(&headers, "apikey"),
        bearer: bearer.clone(),
        prefer: header_value(&headers, "prefer"),
    };
    log.lock().unwrap().push(seen);

    let path = uri.path();
    if path == "/auth/v1/user" {
        return match bearer.as_deref() {
            Some("good-token") => Json(json!({"id": KNOWN_USER, "email": "kim@example.com"})).into_response(),
            Some("forbidden-token") => StatusCode::FORBIDDEN.into_response(),
            Some("broken-token") => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"msg": "boom"}))).into_response(),
            _ => StatusCode::UNAUTHORIZED.into_response(),
        };
    }
    if let Some(id) = path.strip_prefix("/auth/v1/admin/users/") {
        return if id == KNOWN_USER {
            Json(json!({"id": id})).into_response()
        } else {
            (StatusCode::NOT_FOUND, Json(json!({"msg": "User not found"}))).into_response()
        };
    }
    if path == "/rest/v1/broken" {
        return (
            StatusCode::CONFLICT,
            Json(json!({"code": "23505", "message": "duplicate key value", "details": null, "hint": null})),
        )
            .into_response();
    }

    match method {
        Method::HEAD => ([(header::CONTENT_RANGE, "0-9/42")], StatusCode::OK).into_response(),
        Method::POST => (StatusCode::CREATED, Json(json!([{"id": "row-1", "name": "Keepers"}]))).into_response(),
        _ => Json(json!([{"id": "row-1", "name": "Keepers"}])).into_response(),
    }
}

struct Backend {
    config: SupabaseConfig,
    log: Log,
}

impl Backend {
    async fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind fake backend")?;

        let log: Log = Arc::default();
        let router = Router::new().fallback(record).with_state(log.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self {
            config: SupabaseConfig {
                url: format!("http://127.0.0.1:{}", port),
                anon_key: ANON_KEY.to_string(),
                service_role_key: SERVICE_KEY.to_string(),
            },
            log,
        })
    }

    fn store(&self) -> PostgrestStore {
        PostgrestStore::new(reqwest::Client::new(), &self.config)
    }

    fn auth(&self) -> SupabaseAuth {
        SupabaseAuth::new(reqwest::Client::new(), &self.config)
    }

    fn seen(&self) -> Vec<Seen> {
        self.log.lock().unwrap().clone()
    }
}

#[tokio::test]
async fn each_credential_sends_its_own_keys() -> Result<()> {
    let backend = Backend::spawn().await?;
    let store = backend.store();
    let query = Query::table("collections").eq("user_id", "u1");

    store.select(&Access::Anonymous, &query).await?;
    store
        .select(&Access::User { token: "user-jwt".into() }, &query)
        .await?;
    store.select(&Access::Service, &query).await?;

    let seen = backend.seen();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0].path, "/rest/v1/collections");
    assert!(seen[0].query.contains("user_id=eq.u1"));

    assert_eq!(seen[0].apikey.as_deref(), Some(ANON_KEY));
    assert_eq!(seen[0].bearer.as_deref(), Some(ANON_KEY));

    assert_eq!(seen[1].apikey.as_deref(), Some(ANON_KEY));
    assert_eq!(seen[1].bearer.as_deref(), Some("user-jwt"));

    assert_eq!(seen[2].apikey.as_deref(), Some(SERVICE_KEY));
    assert_eq!(seen[2].bearer.as_deref(), Some(SERVICE_KEY));

    for request in &seen[..2] {
        assert_ne!(request.apikey.as_deref(), Some(SERVICE_KEY));
        assert_ne!(request.bearer.as_deref(), Some(SERVICE_KEY));
    }
    Ok(())
}

#[tokio::test]
async fn writes_return_representation_and_counts_read_content_range() -> Result<()> {
    let backend = Backend::spawn().await?;
    let store = backend.store();
    let user = Access::User { token: "user-jwt".into() };
    let owned = Query::table("collections").eq("id", "row-1");

    let inserted = store
        .insert(&user, "collections", json!({"name": "Keepers"}))
        .await?;
    assert_eq!(inserted["id"], "row-1");
    let updated = store.update(&user, &owned, json!({"name": "Keepers II"})).await?;
    assert_eq!(updated.len(), 1);
    let removed = store.delete(&user, &owned).await?;
    assert_eq!(removed.len(), 1);
    let total = store.count(&user, &Query::table("collections")).await?;
    assert_eq!(total, 42);

    let seen = backend.seen();
    let methods: Vec<Method> = seen.iter().map(|s| s.method.clone()).collect();
    assert_eq!(methods, vec![Method::POST, Method::PATCH, Method::DELETE, Method::HEAD]);
    for write in &seen[..3] {
        assert_eq!(write.prefer.as_deref(), Some("return=representation"));
    }
    assert!(seen[1].query.contains("id=eq.row-1"));
    assert!(seen[2].query.contains("id=eq.row-1"));
    assert_eq!(seen[3].prefer.as_deref(), Some("count=exact"));
    Ok(())
}

#[tokio::test]
async fn rejection_carries_backend_message() -> Result<()> {
    let backend = Backend::spawn().await?;
    let err = backend
        .store()
        .select(&Access::Anonymous, &Query::table("broken"))
        .await
        .unwrap_err();
    match err {
        StoreError::Rejected { status, message } => {
            assert_eq!(status, 409);
            assert_eq!(message, "duplicate key value");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn token_resolution_uses_anon_key_and_caller_token() -> Result<()> {
    let backend = Backend::spawn().await?;
    let auth = backend.auth();

    let principal = auth.resolve("good-token").await?.context("expected a principal")?;
    assert_eq!(principal.id, KNOWN_USER);
    assert_eq!(principal.email.as_deref(), Some("kim@example.com"));

    let seen = backend.seen();
    assert_eq!(seen[0].path, "/auth/v1/user");
    assert_eq!(seen[0].apikey.as_deref(), Some(ANON_KEY));
    assert_eq!(seen[0].bearer.as_deref(), Some("good-token"));
    Ok(())
}

#[tokio::test]
async fn rejected_tokens_resolve_to_nobody() -> Result<()> {
    let backend = Backend::spawn().await?;
    let auth = backend.auth();

    assert!(auth.resolve("expired-token").await?.is_none());
    assert!(auth.resolve("forbidden-token").await?.is_none());

    match auth.resolve("broken-token").await {
        Err(AuthError::Rejected { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn user_existence_uses_the_service_key() -> Result<()> {
    let backend = Backend::spawn().await?;
    let auth = backend.auth();

    assert!(auth.principal_exists(KNOWN_USER).await?);
    assert!(!auth.principal_exists(UNKNOWN_USER).await?);
    assert!(!auth.principal_exists("../user").await?);

    let seen = backend.seen();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].path, format!("/auth/v1/admin/users/{}", KNOWN_USER));
    assert_eq!(seen[0].apikey.as_deref(), Some(SERVICE_KEY));
    assert_eq!(seen[0].bearer.as_deref(), Some(SERVICE_KEY));
    Ok(())
}
