use std::collections::HashMap;

use serde::Serialize;

use crate::database::{tables, Db, Query, SortDirection};
use crate::error::{ApiError, StoreResultExt};
use crate::models::{Artist, ArtistRelease, Release};
use crate::services::search::SearchParams;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreditedRelease {
    #[serde(flatten)]
    pub release: Release,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtistDetail {
    #[serde(flatten)]
    pub artist: Artist,
    pub releases: Vec<CreditedRelease>,
}

/// An artist with every release they are credited on, newest release first.
pub async fn detail(db: &Db, artist_id: &str) -> Result<ArtistDetail, ApiError> {
    let artist: Artist = db
        .select_one(&Query::table(tables::ARTISTS).eq("id", artist_id))
        .await
        .context("Failed to fetch artist")?
        .ok_or_else(|| ApiError::not_found("Artist not found"))?;

    let links: Vec<ArtistRelease> = db
        .select(&Query::table(tables::ARTIST_RELEASES).eq("artist_id", artist_id))
        .await
        .context("Failed to fetch artist releases")?;
    if links.is_empty() {
        return Ok(ArtistDetail {
            artist,
            releases: Vec::new(),
        });
    }

    let ids: Vec<&str> = links.iter().map(|l| l.release_id.as_str()).collect();
    let found: Vec<Release> = db
        .select(&Query::table(tables::RELEASES).in_list("id", ids))
        .await
        .context("Failed to fetch artist releases")?;
    let mut by_id: HashMap<String, Release> = found.into_iter().map(|r| (r.id.clone(), r)).collect();

    let mut releases: Vec<CreditedRelease> = links
        .into_iter()
        .filter_map(|link| {
            by_id.remove(&link.release_id).map(|release| CreditedRelease {
                release,
                role: link.role,
            })
        })
        .collect();
    // undated releases last
    releases.sort_by(|a, b| match (&a.release.release_date, &b.release.release_date) {
        (Some(x), Some(y)) => y.cmp(x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.release.title.cmp(&b.release.title),
    });

    Ok(ArtistDetail { artist, releases })
}

/// Local catalog artists whose name contains the query, ignoring case.
pub async fn search(db: &Db, params: &SearchParams) -> Result<Vec<Artist>, ApiError> {
    db.select(
        &Query::table(tables::ARTISTS)
            .ilike("name", &params.query)
            .order("name", SortDirection::Asc)
            .limit(params.limit as usize)
            .offset(params.offset as usize),
    )
    .await
    .context("Failed to search artists")
}
