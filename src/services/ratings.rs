use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::Principal;
use crate::database::{tables, Db, Query, SortDirection};
use crate::error::{ApiError, StoreResultExt};
use crate::models::{IdRow, Rating, ScoreRow};
use crate::services::{now, releases, required_text};

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;

const SCORE_MESSAGE: &str = "Score must be a number between 0 and 10";

/// Body of `POST /api/ratings`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RatingInput {
    pub release_id: Option<String>,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidRating {
    pub release_id: String,
    pub score: f64,
}

impl RatingInput {
    pub fn validate(self) -> Result<ValidRating, ApiError> {
        let release_id = required_text(self.release_id, "releaseId", "Release ID is required")?;
        let score = self
            .score
            .filter(|s| s.is_finite() && (MIN_SCORE..=MAX_SCORE).contains(s))
            .ok_or_else(|| ApiError::validation("score", SCORE_MESSAGE))?;
        Ok(ValidRating { release_id, score })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseStats {
    /// Rounded to one decimal place
    pub average_rating: Option<f64>,
    pub ratings_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RatingOutcome {
    #[serde(flatten)]
    pub rating: Rating,
    #[serde(rename = "isNew")]
    pub is_new: bool,
    #[serde(rename = "releaseStats")]
    pub release_stats: ReleaseStats,
}

/// Mean of the scores, `None` for an empty slice.
pub fn average(scores: &[f64]) -> Option<f64> {
    if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

fn round_one(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Create or replace the caller's rating for a release.
pub async fn upsert(db: &Db, principal: &Principal, input: RatingInput) -> Result<RatingOutcome, ApiError> {
    let ValidRating { release_id, score } = input.validate()?;
    releases::ensure_exists(db, &release_id).await?;

    let existing: Option<IdRow> = db
        .select_one(
            &Query::table(tables::RATINGS)
                .select(&["id"])
                .eq("user_id", principal.id.as_str())
                .eq("release_id", release_id.as_str()),
        )
        .await
        .context("Failed to save rating")?;

    let timestamp = now();
    let rating: Rating = match &existing {
        Some(row) => db
            .update(
                &Query::table(tables::RATINGS)
                    .eq("id", row.id.as_str())
                    .eq("user_id", principal.id.as_str()),
                &json!({ "score": score, "updated_at": timestamp }),
            )
            .await
            .context("Failed to save rating")?
            .ok_or_else(|| ApiError::not_found("Rating not found"))?,
        None => db
            .insert(
                tables::RATINGS,
                &json!({
                    "user_id": principal.id,
                    "release_id": release_id,
                    "score": score,
                    "created_at": timestamp,
                    "updated_at": timestamp,
                }),
            )
            .await
            .context("Failed to save rating")?,
    };

    let release_stats = release_stats(db, &release_id).await?;

    Ok(RatingOutcome {
        rating,
        is_new: existing.is_none(),
        release_stats,
    })
}

pub async fn release_stats(db: &Db, release_id: &str) -> Result<ReleaseStats, ApiError> {
    let rows: Vec<ScoreRow> = db
        .select(
            &Query::table(tables::RATINGS)
                .select(&["score"])
                .eq("release_id", release_id),
        )
        .await
        .context("Failed to fetch rating stats")?;
    let scores: Vec<f64> = rows.into_iter().map(|r| r.score).collect();

    Ok(ReleaseStats {
        average_rating: average(&scores).map(round_one),
        ratings_count: scores.len() as u64,
    })
}

/// The caller's ratings, most recently changed first.
pub async fn list(db: &Db, principal: &Principal) -> Result<Vec<Rating>, ApiError> {
    db.select(
        &Query::table(tables::RATINGS)
            .eq("user_id", principal.id.as_str())
            .order("updated_at", SortDirection::Desc),
    )
    .await
    .context("Failed to fetch ratings")
}

/// Remove the caller's rating for a release and detach it from their reviews.
pub async fn delete(db: &Db, principal: &Principal, release_id: &str) -> Result<(), ApiError> {
    let existing: IdRow = db
        .select_one(
            &Query::table(tables::RATINGS)
                .select(&["id"])
                .eq("user_id", principal.id.as_str())
                .eq("release_id", release_id),
        )
        .await
        .context("Failed to delete rating")?
        .ok_or_else(|| ApiError::not_found("Rating not found"))?;

    db.update::<serde_json::Value>(
        &Query::table(tables::REVIEWS)
            .eq("rating_id", existing.id.as_str())
            .eq("user_id", principal.id.as_str()),
        &json!({ "rating_id": null }),
    )
    .await
    .context("Failed to delete rating")?;

    db.delete(
        &Query::table(tables::RATINGS)
            .eq("id", existing.id.as_str())
            .eq("user_id", principal.id.as_str()),
    )
    .await
    .context("Failed to delete rating")?;

    Ok(())
}
