use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::Principal;
use crate::database::{tables, Db, Query, SortDirection};
use crate::error::{ApiError, StoreResultExt};
use crate::models::{IdRow, Review};
use crate::services::{now, optional_text, releases, required_text};

pub const MIN_CONTENT_LENGTH: usize = 10;

/// Body of `POST /api/reviews`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReviewInput {
    pub release_id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub rating_id: Option<String>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidReview {
    pub release_id: String,
    pub title: Option<String>,
    pub content: String,
    pub rating_id: Option<String>,
    pub is_published: bool,
}

impl ReviewInput {
    pub fn validate(self) -> Result<ValidReview, ApiError> {
        let release_id = required_text(self.release_id, "releaseId", "Release ID is required")?;

        let content = self.content.unwrap_or_default().trim().to_string();
        if content.chars().count() < MIN_CONTENT_LENGTH {
            return Err(ApiError::validation(
                "content",
                format!("Review content must be at least {} characters", MIN_CONTENT_LENGTH),
            ));
        }

        Ok(ValidReview {
            release_id,
            title: optional_text(self.title),
            content,
            rating_id: optional_text(self.rating_id),
            is_published: self.is_published.unwrap_or(true),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    #[serde(flatten)]
    pub review: Review,
    #[serde(rename = "isNew")]
    pub is_new: bool,
}

/// Create or replace the caller's review of a release. The input is fully
/// validated before the store is touched.
pub async fn upsert(db: &Db, principal: &Principal, input: ReviewInput) -> Result<ReviewOutcome, ApiError> {
    let review = input.validate()?;
    releases::ensure_exists(db, &review.release_id).await?;

    if let Some(rating_id) = &review.rating_id {
        let owned = db
            .exists(
                &Query::table(tables::RATINGS)
                    .eq("id", rating_id.as_str())
                    .eq("user_id", principal.id.as_str())
                    .eq("release_id", review.release_id.as_str()),
            )
            .await
            .context("Failed to save review")?;
        if !owned {
            return Err(ApiError::not_found("Rating not found"));
        }
    }

    let existing: Option<IdRow> = db
        .select_one(
            &Query::table(tables::REVIEWS)
                .select(&["id"])
                .eq("user_id", principal.id.as_str())
                .eq("release_id", review.release_id.as_str()),
        )
        .await
        .context("Failed to save review")?;

    let timestamp = now();
    let saved: Review = match &existing {
        Some(row) => db
            .update(
                &Query::table(tables::REVIEWS)
                    .eq("id", row.id.as_str())
                    .eq("user_id", principal.id.as_str()),
                &json!({
                    "title": review.title,
                    "content": review.content,
                    "rating_id": review.rating_id,
                    "is_published": review.is_published,
                    "updated_at": timestamp,
                }),
            )
            .await
            .context("Failed to save review")?
            .ok_or_else(|| ApiError::not_found("Review not found"))?,
        None => db
            .insert(
                tables::REVIEWS,
                &json!({
                    "user_id": principal.id,
                    "release_id": review.release_id,
                    "title": review.title,
                    "content": review.content,
                    "rating_id": review.rating_id,
                    "is_published": review.is_published,
                    "created_at": timestamp,
                    "updated_at": timestamp,
                }),
            )
            .await
            .context("Failed to save review")?,
    };

    Ok(ReviewOutcome {
        review: saved,
        is_new: existing.is_none(),
    })
}

/// The caller's reviews, most recently changed first.
pub async fn list(db: &Db, principal: &Principal) -> Result<Vec<Review>, ApiError> {
    db.select(
        &Query::table(tables::REVIEWS)
            .eq("user_id", principal.id.as_str())
            .order("updated_at", SortDirection::Desc),
    )
    .await
    .context("Failed to fetch reviews")
}

/// Published reviews from everyone, newest first.
pub async fn recent(db: &Db, limit: u32) -> Result<Vec<Review>, ApiError> {
    db.select(
        &Query::table(tables::REVIEWS)
            .eq("is_published", true)
            .order("created_at", SortDirection::Desc)
            .limit(limit as usize),
    )
    .await
    .context("Failed to fetch recent reviews")
}

pub async fn delete(db: &Db, principal: &Principal, review_id: &str) -> Result<(), ApiError> {
    let owned = Query::table(tables::REVIEWS)
        .eq("id", review_id)
        .eq("user_id", principal.id.as_str());

    let found = db.exists(&owned).await.context("Failed to delete review")?;
    if !found {
        return Err(ApiError::not_found("Review not found"));
    }

    db.delete(&owned).await.context("Failed to delete review")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(content: &str) -> ReviewInput {
        ReviewInput {
            release_id: Some("r1".into()),
            title: Some("  ".into()),
            content: Some(content.into()),
            rating_id: None,
            is_published: None,
        }
    }

    #[test]
    fn content_minimum_counts_trimmed_characters() {
        assert!(input("   short    ").validate().is_err());
        assert!(input("exactly 10").validate().is_ok());
        // multi-byte characters count once each
        assert!(input("ééééééééé").validate().is_err());
        assert!(input("éééééééééé").validate().is_ok());
    }

    #[test]
    fn content_failure_names_the_field() {
        match input("meh").validate() {
            Err(ApiError::Validation { field, message }) => {
                assert_eq!(field.as_deref(), Some("content"));
                assert_eq!(message, "Review content must be at least 10 characters");
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn defaults_and_blank_title() {
        let review = input("a thoughtful take on the record").validate().unwrap();
        assert!(review.is_published);
        assert_eq!(review.title, None);
    }
}
