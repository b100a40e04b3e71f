use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{AuthError, Principal, SessionResolver};
use crate::config::SupabaseConfig;

/// Identity lookups against the hosted auth service (`<url>/auth/v1`).
pub struct SupabaseAuth {
    client: Client,
    base_url: String,
    anon_key: String,
    service_key: String,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl SupabaseAuth {
    pub fn new(client: Client, config: &SupabaseConfig) -> Self {
        Self {
            client,
            base_url: config.url.clone(),
            anon_key: config.anon_key.clone(),
            service_key: config.service_role_key.clone(),
        }
    }
}

#[async_trait]
impl SessionResolver for SupabaseAuth {
    async fn resolve(&self, token: &str) -> Result<Option<Principal>, AuthError> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Ok(None),
            status if !status.is_success() => return Err(rejected(response).await),
            _ => {}
        }

        let user = response
            .json::<AuthUser>()
            .await
            .map_err(|e| AuthError::Decode(e.to_string()))?;

        Ok(Some(Principal::new(user.id, user.email, token)))
    }

    async fn principal_exists(&self, id: &str) -> Result<bool, AuthError> {
        // auth user ids are UUIDs; anything else must not reach the admin path
        if Uuid::parse_str(id).is_err() {
            return Ok(false);
        }

        let response = self
            .client
            .get(format!("{}/auth/v1/admin/users/{}", self.base_url, id))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => Err(rejected(response).await),
        }
    }
}

async fn rejected(response: reqwest::Response) -> AuthError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("msg")
                .or_else(|| v.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or(body);
    AuthError::Rejected { status, message }
}
