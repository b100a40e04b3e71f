use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client, Method, RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;

use super::query::Query;
use super::store::{Access, Store, StoreError};
use crate::config::SupabaseConfig;

/// Store backed by the hosted PostgREST endpoint (`<url>/rest/v1/<table>`).
pub struct PostgrestStore {
    client: Client,
    base_url: String,
    anon_key: String,
    service_key: String,
}

impl PostgrestStore {
    pub fn new(client: Client, config: &SupabaseConfig) -> Self {
        Self {
            client,
            base_url: config.url.clone(),
            anon_key: config.anon_key.clone(),
            service_key: config.service_role_key.clone(),
        }
    }

    fn request(&self, method: Method, access: &Access, table: &str) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        let (apikey, bearer) = match access {
            Access::Anonymous => (&self.anon_key, self.anon_key.as_str()),
            Access::User { token } => (&self.anon_key, token.as_str()),
            Access::Service => (&self.service_key, self.service_key.as_str()),
        };
        self.client
            .request(method, url)
            .header("apikey", apikey.as_str())
            .bearer_auth(bearer)
            .header("Accept", "application/json")
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, StoreError> {
        let response = builder
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Rejected {
            status,
            message: rejection_message(&body),
        })
    }

    async fn rows(response: Response) -> Result<Vec<Value>, StoreError> {
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Store for PostgrestStore {
    async fn select(&self, access: &Access, query: &Query) -> Result<Vec<Value>, StoreError> {
        debug!(table = query.table_name(), "select");
        let builder = self
            .request(Method::GET, access, query.table_name())
            .query(&query.read_params());
        Self::rows(self.send(builder).await?).await
    }

    async fn count(&self, access: &Access, query: &Query) -> Result<u64, StoreError> {
        debug!(table = query.table_name(), "count");
        let mut params = query.filter_params();
        params.insert(0, ("select".to_string(), "*".to_string()));
        let builder = self
            .request(Method::HEAD, access, query.table_name())
            .header("Prefer", "count=exact")
            .query(&params);
        let response = self.send(builder).await?;
        parse_content_range(response.headers())
    }

    async fn insert(&self, access: &Access, table: &str, row: Value) -> Result<Value, StoreError> {
        debug!(table, "insert");
        let builder = self
            .request(Method::POST, access, table)
            .header("Prefer", "return=representation")
            .json(&row);
        let mut rows = Self::rows(self.send(builder).await?).await?;
        if rows.is_empty() {
            return Err(StoreError::Decode(format!("insert into {} returned no row", table)));
        }
        Ok(rows.swap_remove(0))
    }

    async fn update(&self, access: &Access, query: &Query, patch: Value) -> Result<Vec<Value>, StoreError> {
        debug!(table = query.table_name(), "update");
        let builder = self
            .request(Method::PATCH, access, query.table_name())
            .header("Prefer", "return=representation")
            .query(&query.filter_params())
            .json(&patch);
        Self::rows(self.send(builder).await?).await
    }

    async fn delete(&self, access: &Access, query: &Query) -> Result<Vec<Value>, StoreError> {
        debug!(table = query.table_name(), "delete");
        let builder = self
            .request(Method::DELETE, access, query.table_name())
            .header("Prefer", "return=representation")
            .query(&query.filter_params());
        Self::rows(self.send(builder).await?).await
    }
}

/// PostgREST errors are `{ "message": ..., "code": ..., "details": ..., "hint": ... }`.
fn rejection_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                "request rejected".to_string()
            } else {
                body.trim().to_string()
            }
        })
}

/// `Content-Range: 0-24/3573` or `*/0`
fn parse_content_range(headers: &HeaderMap) -> Result<u64, StoreError> {
    let value = headers
        .get("content-range")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| StoreError::Decode("missing Content-Range header".to_string()))?;

    value
        .rsplit('/')
        .next()
        .and_then(|total| total.parse::<u64>().ok())
        .ok_or_else(|| StoreError::Decode(format!("unparseable Content-Range '{}'", value)))
}
