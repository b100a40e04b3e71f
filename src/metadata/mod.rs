pub mod cover_art;
pub mod musicbrainz;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use cover_art::{cover_art_url, CoverArtSize};
pub use musicbrainz::MusicBrainzClient;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("MusicBrainz API error: {status} {reason}")]
    Status { status: u16, reason: String },

    #[error("MusicBrainz request failed: {0}")]
    Transport(String),

    #[error("MusicBrainz returned invalid JSON: {0}")]
    Decode(String),
}

/// Read-only catalog search. Responses are passed through untouched.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Search release groups (albums, EPs, singles) by free text.
    async fn search_release_groups(&self, query: &str, limit: u32, offset: u32) -> Result<Value, MetadataError>;

    /// A release group with its artist credits.
    async fn release_group(&self, mbid: &str) -> Result<Value, MetadataError>;

    /// Releases (editions) of a release group with media and recordings.
    async fn releases_for_group(&self, mbid: &str, limit: u32) -> Result<Value, MetadataError>;

    /// One release (edition) with artists, media and recordings.
    async fn release(&self, mbid: &str) -> Result<Value, MetadataError>;
}
