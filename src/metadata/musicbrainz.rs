use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{MetadataError, MetadataProvider};
use crate::config::MetadataConfig;

/// MusicBrainz web service client.
///
/// Every call carries the `User-Agent` signature MusicBrainz requires, and
/// calls are spaced at least `min_interval` apart across the whole process.
pub struct MusicBrainzClient {
    client: Client,
    base_url: String,
    user_agent: String,
    throttle: Throttle,
}

impl MusicBrainzClient {
    pub fn new(client: Client, config: &MetadataConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            user_agent: config.user_agent(),
            throttle: Throttle::new(Duration::from_millis(config.min_interval_ms)),
        }
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Value, MetadataError> {
        self.throttle.wait().await;

        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, "musicbrainz request");

        let response = self
            .client
            .get(&url)
            .header(header::USER_AGENT, &self.user_agent)
            .header(header::ACCEPT, "application/json")
            .query(&[("fmt", "json")])
            .query(params)
            .send()
            .await
            .map_err(|e| MetadataError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "musicbrainz rejected request");
            return Err(MetadataError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| MetadataError::Decode(e.to_string()))
    }
}

#[async_trait]
impl MetadataProvider for MusicBrainzClient {
    async fn search_release_groups(&self, query: &str, limit: u32, offset: u32) -> Result<Value, MetadataError> {
        self.get(
            "release-group",
            &[
                ("query", query.to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ],
        )
        .await
    }

    async fn release_group(&self, mbid: &str) -> Result<Value, MetadataError> {
        self.get(&format!("release-group/{}", mbid), &[("inc", "artists".to_string())])
            .await
    }

    async fn releases_for_group(&self, mbid: &str, limit: u32) -> Result<Value, MetadataError> {
        self.get(
            "release",
            &[
                ("release-group", mbid.to_string()),
                ("limit", limit.to_string()),
                ("inc", "artists+recordings+media".to_string()),
            ],
        )
        .await
    }

    async fn release(&self, mbid: &str) -> Result<Value, MetadataError> {
        self.get(
            &format!("release/{}", mbid),
            &[("inc", "artists+recordings+media".to_string())],
        )
        .await
    }
}

/// Enforces a minimum spacing between consecutive calls.
pub struct Throttle {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Wait until this caller's slot. Slots are handed out in lock order.
    pub async fn wait(&self) {
        if self.interval.is_zero() {
            return;
        }
        let mut next = self.next_slot.lock().await;
        let now = Instant::now();
        if let Some(slot) = *next {
            if slot > now {
                tokio::time::sleep_until(slot).await;
            }
        }
        *next = Some(Instant::now() + self.interval);
    }
}
