use std::collections::HashMap;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::auth::Principal;
use crate::database::{tables, Db, Query, SortDirection};
use crate::error::{ApiError, StoreResultExt};
use crate::models::{Collection, CollectionRelease, Release};
use crate::services::{now, optional_text, releases, required_text};

/// Body of `POST /api/collections`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CollectionInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

/// Body of `POST /api/collections/releases`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CollectionEntryInput {
    pub collection_id: Option<String>,
    pub release_id: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionSummary {
    #[serde(flatten)]
    pub collection: Collection,
    pub release_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionEntry {
    #[serde(flatten)]
    pub release: Release,
    pub added_at: chrono::DateTime<chrono::Utc>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionDetail {
    #[serde(flatten)]
    pub collection: Collection,
    pub release_count: u64,
    pub releases: Vec<CollectionEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryOutcome {
    #[serde(flatten)]
    pub entry: CollectionRelease,
    #[serde(rename = "isNew")]
    pub is_new: bool,
}

fn not_found() -> ApiError {
    ApiError::not_found("Collection not found")
}

/// The caller's collections with their release counts, most recently changed first.
pub async fn list(db: &Db, principal: &Principal) -> Result<Vec<CollectionSummary>, ApiError> {
    let collections: Vec<Collection> = db
        .select(
            &Query::table(tables::COLLECTIONS)
                .eq("user_id", principal.id.as_str())
                .order("updated_at", SortDirection::Desc),
        )
        .await
        .context("Failed to fetch collections")?;

    let counts = try_join_all(collections.iter().map(|c| {
        let query = Query::table(tables::COLLECTION_RELEASES).eq("collection_id", c.id.as_str());
        async move { db.count(&query).await }
    }))
    .await
    .context("Failed to fetch collections")?;

    Ok(collections
        .into_iter()
        .zip(counts)
        .map(|(collection, release_count)| CollectionSummary {
            collection,
            release_count,
        })
        .collect())
}

/// Create a collection owned by the caller. The name is validated before any insert.
pub async fn create(db: &Db, principal: &Principal, input: CollectionInput) -> Result<Collection, ApiError> {
    let name = required_text(input.name, "name", "Collection name is required")?;
    let timestamp = now();

    db.insert(
        tables::COLLECTIONS,
        &json!({
            "user_id": principal.id,
            "name": name,
            "description": optional_text(input.description),
            "is_public": input.is_public.unwrap_or(true),
            "created_at": timestamp,
            "updated_at": timestamp,
        }),
    )
    .await
    .context("Failed to create collection")
}

/// A collection with its releases. Private collections are only visible to
/// their owner; everyone else gets NotFound.
pub async fn detail(db: &Db, viewer: Option<&Principal>, collection_id: &str) -> Result<CollectionDetail, ApiError> {
    let collection: Collection = db
        .select_one(&Query::table(tables::COLLECTIONS).eq("id", collection_id))
        .await
        .context("Failed to fetch collection")?
        .ok_or_else(not_found)?;

    let is_owner = viewer.map(|p| p.id == collection.user_id).unwrap_or(false);
    if !collection.is_public && !is_owner {
        return Err(not_found());
    }

    let entries: Vec<CollectionRelease> = db
        .select(
            &Query::table(tables::COLLECTION_RELEASES)
                .eq("collection_id", collection_id)
                .order("added_at", SortDirection::Desc),
        )
        .await
        .context("Failed to fetch collection")?;

    let mut by_id: HashMap<String, Release> = if entries.is_empty() {
        HashMap::new()
    } else {
        let ids: Vec<&str> = entries.iter().map(|e| e.release_id.as_str()).collect();
        let found: Vec<Release> = db
            .select(&Query::table(tables::RELEASES).in_list("id", ids))
            .await
            .context("Failed to fetch collection")?;
        found.into_iter().map(|r| (r.id.clone(), r)).collect()
    };

    // entries whose release row is gone still count, as they do in `list`
    let release_count = entries.len() as u64;
    let releases: Vec<CollectionEntry> = entries
        .into_iter()
        .filter_map(|entry| {
            by_id.remove(&entry.release_id).map(|release| CollectionEntry {
                release,
                added_at: entry.added_at,
                note: entry.note,
            })
        })
        .collect();

    Ok(CollectionDetail {
        collection,
        release_count,
        releases,
    })
}

async fn ensure_owned(db: &Db, principal: &Principal, collection_id: &str, context: &str) -> Result<(), ApiError> {
    let owned = db
        .exists(
            &Query::table(tables::COLLECTIONS)
                .eq("id", collection_id)
                .eq("user_id", principal.id.as_str()),
        )
        .await
        .context(context)?;
    if owned {
        Ok(())
    } else {
        Err(not_found())
    }
}

/// Bump `updated_at` after an entry change. The entry change has already been
/// stored, so a failure here is logged and not reported to the caller.
async fn touch(db: &Db, principal: &Principal, collection_id: &str) {
    let result = db
        .update::<Collection>(
            &Query::table(tables::COLLECTIONS)
                .eq("id", collection_id)
                .eq("user_id", principal.id.as_str()),
            &json!({ "updated_at": now() }),
        )
        .await;
    if let Err(e) = result {
        warn!(collection_id, error = %e, "failed to bump collection updated_at");
    }
}

/// Delete an owned collection and its entries. Someone else's collection is
/// reported exactly like a missing one.
///
/// Entries go first. A failure between the two deletes leaves an empty
/// collection that a retry removes.
pub async fn delete(db: &Db, principal: &Principal, collection_id: &str) -> Result<(), ApiError> {
    const CONTEXT: &str = "Failed to delete collection";
    ensure_owned(db, principal, collection_id, CONTEXT).await?;

    db.delete(&Query::table(tables::COLLECTION_RELEASES).eq("collection_id", collection_id))
        .await
        .context(CONTEXT)?;
    db.delete(
        &Query::table(tables::COLLECTIONS)
            .eq("id", collection_id)
            .eq("user_id", principal.id.as_str()),
    )
    .await
    .context(CONTEXT)?;
    Ok(())
}

/// Add a release to an owned collection. Adding it twice returns the existing entry.
pub async fn add_release(db: &Db, principal: &Principal, input: CollectionEntryInput) -> Result<EntryOutcome, ApiError> {
    const CONTEXT: &str = "Failed to add release to collection";
    let collection_id = required_text(input.collection_id, "collectionId", "Collection ID is required")?;
    let release_id = required_text(input.release_id, "releaseId", "Release ID is required")?;

    ensure_owned(db, principal, &collection_id, CONTEXT).await?;
    releases::ensure_exists(db, &release_id).await?;

    let existing: Option<CollectionRelease> = db
        .select_one(
            &Query::table(tables::COLLECTION_RELEASES)
                .eq("collection_id", collection_id.as_str())
                .eq("release_id", release_id.as_str()),
        )
        .await
        .context(CONTEXT)?;
    if let Some(entry) = existing {
        return Ok(EntryOutcome { entry, is_new: false });
    }

    let entry: CollectionRelease = db
        .insert(
            tables::COLLECTION_RELEASES,
            &json!({
                "collection_id": collection_id,
                "release_id": release_id,
                "added_at": now(),
                "note": optional_text(input.note),
            }),
        )
        .await
        .context(CONTEXT)?;
    touch(db, principal, &collection_id).await;

    Ok(EntryOutcome { entry, is_new: true })
}

pub async fn remove_release(db: &Db, principal: &Principal, collection_id: &str, release_id: &str) -> Result<(), ApiError> {
    const CONTEXT: &str = "Failed to remove release from collection";
    ensure_owned(db, principal, collection_id, CONTEXT).await?;

    let removed = db
        .delete(
            &Query::table(tables::COLLECTION_RELEASES)
                .eq("collection_id", collection_id)
                .eq("release_id", release_id),
        )
        .await
        .context(CONTEXT)?;
    if removed == 0 {
        return Err(ApiError::not_found("Release not found in collection"));
    }

    touch(db, principal, collection_id).await;
    Ok(())
}
