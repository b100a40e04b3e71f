use std::collections::HashMap;

use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;
use crate::metadata::{cover_art_url, CoverArtSize, MetadataProvider};

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub query: String,
    pub limit: u32,
    pub offset: u32,
}

impl SearchParams {
    /// Read `query`, `limit` and `offset` from the query string. The limit is
    /// clamped to 1..=100.
    pub fn from_query(params: &HashMap<String, String>) -> Result<Self, ApiError> {
        let query = params
            .get("query")
            .map(|q| q.trim())
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ApiError::validation("query", "Search query is required"))?
            .to_string();

        let limit = numeric_param(params, "limit", "Limit")?
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT);
        let offset = numeric_param(params, "offset", "Offset")?.unwrap_or(0);

        Ok(Self { query, limit, offset })
    }
}

/// Optional non-negative integer parameter.
pub fn numeric_param(params: &HashMap<String, String>, name: &str, label: &str) -> Result<Option<u32>, ApiError> {
    match params.get(name).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<u32>()
            .map(Some)
            .map_err(|_| ApiError::validation(name, format!("{} must be a non-negative integer", label))),
    }
}

/// MusicBrainz ids are UUIDs; anything else never reaches the provider.
pub fn validate_mbid(raw: &str) -> Result<String, ApiError> {
    Uuid::parse_str(raw.trim())
        .map(|id| id.hyphenated().to_string())
        .map_err(|_| ApiError::validation("id", "Invalid MusicBrainz ID"))
}

pub async fn release_groups(provider: &dyn MetadataProvider, params: &SearchParams) -> Result<Value, ApiError> {
    provider
        .search_release_groups(&params.query, params.limit, params.offset)
        .await
        .map_err(|e| ApiError::metadata("Failed to search for albums", e))
}

pub async fn release_group(provider: &dyn MetadataProvider, mbid: &str) -> Result<Value, ApiError> {
    let mbid = validate_mbid(mbid)?;
    provider
        .release_group(&mbid)
        .await
        .map_err(|e| ApiError::metadata("Failed to fetch release group", e))
}

pub async fn releases_for_group(provider: &dyn MetadataProvider, mbid: &str, limit: Option<u32>) -> Result<Value, ApiError> {
    let mbid = validate_mbid(mbid)?;
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    provider
        .releases_for_group(&mbid, limit)
        .await
        .map_err(|e| ApiError::metadata("Failed to fetch releases", e))
}

pub async fn release(provider: &dyn MetadataProvider, mbid: &str) -> Result<Value, ApiError> {
    let mbid = validate_mbid(mbid)?;
    provider
        .release(&mbid)
        .await
        .map_err(|e| ApiError::metadata("Failed to fetch release", e))
}

/// Front cover URL for a release id. `size` is one of small, large or 500
/// and defaults to large.
pub fn cover_art(mbid: &str, size: Option<&str>) -> Result<String, ApiError> {
    let mbid = validate_mbid(mbid)?;
    let size = match size.map(str::trim).filter(|s| !s.is_empty()) {
        None => CoverArtSize::default(),
        Some(raw) => raw
            .parse::<CoverArtSize>()
            .map_err(|_| ApiError::validation("size", "Size must be one of small, large or 500"))?,
    };
    Ok(cover_art_url(&mbid, size))
}
