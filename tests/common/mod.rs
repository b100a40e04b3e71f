#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use beesides_api::auth::StaticSessions;
use beesides_api::config::AppConfig;
use beesides_api::database::{tables, MemoryStore};
use beesides_api::metadata::{MetadataError, MetadataProvider};
use beesides_api::state::AppState;

pub const ALICE: &str = "alice-token";
pub const BOB: &str = "bob-token";
pub const ALICE_ID: &str = "user-alice";
pub const BOB_ID: &str = "user-bob";
/// Registered with the auth service but without a profile row yet.
pub const CAROL_ID: &str = "user-carol";

pub const RELEASE_GROUP_ID: &str = "b1392450-e666-3926-a536-22c65f834433";
pub const RELEASE_ID: &str = "5e4b8d4c-1d1f-4a0c-9e57-2b6c3c1f2a10";
/// The fake provider answers 404 for this release.
pub const MISSING_RELEASE_ID: &str = "00000000-0000-4000-8000-000000000000";

/// Canned catalog. The query "explode" fails like an upstream outage.
pub struct FakeMetadata;

#[async_trait]
impl MetadataProvider for FakeMetadata {
    async fn search_release_groups(&self, query: &str, limit: u32, offset: u32) -> Result<Value, MetadataError> {
        if query == "explode" {
            return Err(MetadataError::Status {
                status: 503,
                reason: "Service Unavailable".into(),
            });
        }
        Ok(json!({
            "count": 1,
            "offset": offset,
            "limit": limit,
            "release-groups": [{"id": RELEASE_GROUP_ID, "title": query}],
        }))
    }

    async fn release_group(&self, mbid: &str) -> Result<Value, MetadataError> {
        Ok(json!({"id": mbid, "title": "Blue Lines", "artist-credit": [{"name": "Massive Attack"}]}))
    }

    async fn releases_for_group(&self, mbid: &str, limit: u32) -> Result<Value, MetadataError> {
        Ok(json!({"release-group": mbid, "limit": limit, "releases": []}))
    }

    async fn release(&self, mbid: &str) -> Result<Value, MetadataError> {
        if mbid == MISSING_RELEASE_ID {
            return Err(MetadataError::Status {
                status: 404,
                reason: "Not Found".into(),
            });
        }
        Ok(json!({"id": mbid, "title": "Blue Lines", "media": [{"track-count": 9}]}))
    }
}

pub struct TestServer {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    client: reqwest::Client,
}

impl TestServer {
    /// Serve the real router on a free port, backed by a seeded in-memory store.
    pub async fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let store = Arc::new(MemoryStore::new());
        seed(&store).await;

        let sessions = StaticSessions::new()
            .with_user(ALICE, ALICE_ID, Some("alice@example.com"))
            .with_user(BOB, BOB_ID, Some("bob@example.com"))
            .with_registered(CAROL_ID);

        let state = AppState::new(test_config()?, store.clone(), Arc::new(sessions), Arc::new(FakeMetadata));
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, beesides_api::app(state)).await;
        });

        let server = Self {
            base_url,
            store,
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub async fn request(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut req = self.client.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await?;
        let status = res.status();
        let body = res.json::<Value>().await?;
        Ok((status, body))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.request(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::POST, path, token, Some(body)).await
    }

    pub async fn patch(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::PATCH, path, token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.request(Method::DELETE, path, token, None).await
    }
}

fn test_config() -> Result<AppConfig> {
    let config = AppConfig::from_lookup(|key| match key {
        "SUPABASE_URL" => Some("http://127.0.0.1:1".to_string()),
        "SUPABASE_ANON_KEY" => Some("anon-key".to_string()),
        "SUPABASE_SERVICE_ROLE_KEY" => Some("service-key".to_string()),
        "MUSICBRAINZ_CONTACT" => Some("tests@example.com".to_string()),
        "MUSICBRAINZ_MIN_INTERVAL_MS" => Some("0".to_string()),
        _ => None,
    })?;
    Ok(config)
}

const CREATED: &str = "2024-01-01T00:00:00Z";

async fn seed(store: &MemoryStore) {
    store
        .seed(
            tables::PROFILES,
            vec![
                json!({"id": ALICE_ID, "username": "alice", "display_name": "Alice", "created_at": CREATED, "updated_at": CREATED}),
                json!({"id": BOB_ID, "username": "bob", "display_name": "Bob", "created_at": CREATED, "updated_at": CREATED}),
            ],
        )
        .await;
    store
        .seed(
            tables::FOLLOWS,
            vec![json!({"id": "f1", "follower_id": BOB_ID, "following_id": ALICE_ID})],
        )
        .await;
    store
        .seed(
            tables::ARTISTS,
            vec![json!({"id": "artist-1", "name": "Massive Attack", "country_code": "GB"})],
        )
        .await;
    store
        .seed(
            tables::RELEASES,
            vec![
                json!({"id": "release-1", "title": "Blue Lines", "release_type": "album", "release_date": "1991-04-08"}),
                json!({"id": "release-2", "title": "Mezzanine", "release_type": "album", "release_date": "1998-04-20"}),
                json!({"id": "release-3", "title": "Unfinished Sympathy", "release_type": "single"}),
            ],
        )
        .await;
    store
        .seed(
            tables::ARTIST_RELEASES,
            vec![
                json!({"artist_id": "artist-1", "release_id": "release-1", "role": "primary"}),
                json!({"artist_id": "artist-1", "release_id": "release-2", "role": "primary"}),
            ],
        )
        .await;
    store
        .seed(
            tables::GENRES,
            vec![
                json!({"id": "genre-1", "name": "Trip Hop"}),
                json!({"id": "genre-2", "name": "Electronic"}),
            ],
        )
        .await;
    store
        .seed(
            tables::RELEASE_GENRES,
            vec![
                json!({"release_id": "release-1", "genre_id": "genre-1"}),
                json!({"release_id": "release-1", "genre_id": "genre-2"}),
            ],
        )
        .await;
    store
        .seed(
            tables::TRACKS,
            vec![
                json!({"id": "track-2", "release_id": "release-1", "title": "One Love", "track_number": 2}),
                json!({"id": "track-1", "release_id": "release-1", "title": "Safe from Harm", "track_number": 1}),
            ],
        )
        .await;
}
