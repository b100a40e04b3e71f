use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use crate::database::{tables, Db, Query, SortDirection, StoreError};
use crate::error::{ApiError, StoreResultExt};
use crate::models::{Artist, ArtistRelease, Genre, Release, ReleaseGenre, ScoreRow, Track};
use crate::services::ratings::average;
use crate::services::search::SearchParams;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreditedArtist {
    #[serde(flatten)]
    pub artist: Artist,
    pub role: Option<String>,
}

/// A release with everything a release page shows.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseDetail {
    #[serde(flatten)]
    pub release: Release,
    pub artists: Vec<CreditedArtist>,
    pub genres: Vec<Genre>,
    pub tracks: Vec<Track>,
    /// Mean score, `None` when nobody has rated the release.
    pub average_rating: Option<f64>,
    pub rating_count: u64,
}

/// NotFound unless the release exists.
pub async fn ensure_exists(db: &Db, release_id: &str) -> Result<(), ApiError> {
    let found = db
        .exists(&Query::table(tables::RELEASES).eq("id", release_id))
        .await
        .context("Failed to fetch release")?;
    if found {
        Ok(())
    } else {
        Err(ApiError::not_found("Release not found"))
    }
}

/// Local catalog releases whose title contains the query, ignoring case.
pub async fn search(db: &Db, params: &SearchParams) -> Result<Vec<Release>, ApiError> {
    db.select(
        &Query::table(tables::RELEASES)
            .ilike("title", &params.query)
            .order("title", SortDirection::Asc)
            .limit(params.limit as usize)
            .offset(params.offset as usize),
    )
    .await
    .context("Failed to search releases")
}

/// Fetch a release and its sub-collections concurrently. A missing release is
/// NotFound; a failing sub-collection is logged and comes back empty.
pub async fn detail(db: &Db, release_id: &str) -> Result<ReleaseDetail, ApiError> {
    let release_query = Query::table(tables::RELEASES).eq("id", release_id);
    let tracks_query = Query::table(tables::TRACKS)
        .eq("release_id", release_id)
        .order("disc_number", SortDirection::Asc)
        .order("track_number", SortDirection::Asc);
    let ratings_query = Query::table(tables::RATINGS)
        .select(&["score"])
        .eq("release_id", release_id);

    let (release, artists, genres, tracks, scores) = futures::join!(
        db.select_one::<Release>(&release_query),
        artists_for(db, release_id),
        genres_for(db, release_id),
        db.select::<Track>(&tracks_query),
        db.select::<ScoreRow>(&ratings_query),
    );

    let release = release
        .context("Failed to fetch release")?
        .ok_or_else(|| ApiError::not_found("Release not found"))?;

    let scores: Vec<f64> = degrade("ratings", release_id, scores)
        .into_iter()
        .map(|r| r.score)
        .collect();

    Ok(ReleaseDetail {
        release,
        artists: degrade("artists", release_id, artists),
        genres: degrade("genres", release_id, genres),
        tracks: degrade("tracks", release_id, tracks),
        average_rating: average(&scores),
        rating_count: scores.len() as u64,
    })
}

async fn artists_for(db: &Db, release_id: &str) -> Result<Vec<CreditedArtist>, StoreError> {
    let links: Vec<ArtistRelease> = db
        .select(&Query::table(tables::ARTIST_RELEASES).eq("release_id", release_id))
        .await?;
    if links.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<&str> = links.iter().map(|l| l.artist_id.as_str()).collect();
    let artists: Vec<Artist> = db
        .select(&Query::table(tables::ARTISTS).in_list("id", ids))
        .await?;
    let mut by_id: HashMap<String, Artist> = artists.into_iter().map(|a| (a.id.clone(), a)).collect();

    Ok(links
        .into_iter()
        .filter_map(|link| {
            by_id.remove(&link.artist_id).map(|artist| CreditedArtist {
                artist,
                role: link.role,
            })
        })
        .collect())
}

async fn genres_for(db: &Db, release_id: &str) -> Result<Vec<Genre>, StoreError> {
    let links: Vec<ReleaseGenre> = db
        .select(&Query::table(tables::RELEASE_GENRES).eq("release_id", release_id))
        .await?;
    if links.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<&str> = links.iter().map(|l| l.genre_id.as_str()).collect();
    db.select(
        &Query::table(tables::GENRES)
            .in_list("id", ids)
            .order("name", SortDirection::Asc),
    )
    .await
}

fn degrade<T>(part: &str, release_id: &str, result: Result<Vec<T>, StoreError>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        warn!(release_id, part, error = %e, "release sub-collection unavailable");
        Vec::new()
    })
}
