use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::query::Query;

/// Errors reported by a persistence backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Backend unreachable: {0}")]
    Transport(String),

    #[error("Unexpected row shape: {0}")]
    Decode(String),
}

impl StoreError {
    /// Message suitable for surfacing to the caller.
    pub fn detail(&self) -> String {
        match self {
            StoreError::Rejected { message, .. } => message.clone(),
            StoreError::Transport(msg) => msg.clone(),
            StoreError::Decode(msg) => msg.clone(),
        }
    }
}

/// Credential a backend call runs under. Row-level security is enforced by
/// the backend based on this.
#[derive(Clone, PartialEq, Eq)]
pub enum Access {
    Anonymous,
    User { token: String },
    /// Elevated server-only credential. Bypasses row-level security.
    Service,
}

impl fmt::Debug for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Anonymous => write!(f, "Anonymous"),
            Access::User { .. } => write!(f, "User(<redacted>)"),
            Access::Service => write!(f, "Service"),
        }
    }
}

/// Table-level CRUD against the hosted data store.
#[async_trait]
pub trait Store: Send + Sync {
    async fn select(&self, access: &Access, query: &Query) -> Result<Vec<Value>, StoreError>;

    async fn count(&self, access: &Access, query: &Query) -> Result<u64, StoreError>;

    /// Insert one row and return it as stored.
    async fn insert(&self, access: &Access, table: &str, row: Value) -> Result<Value, StoreError>;

    /// Patch every row matching the query's filters and return the updated rows.
    async fn update(&self, access: &Access, query: &Query, patch: Value) -> Result<Vec<Value>, StoreError>;

    /// Delete every row matching the query's filters and return the removed rows.
    async fn delete(&self, access: &Access, query: &Query) -> Result<Vec<Value>, StoreError>;
}

/// A store bound to one credential, with typed row decoding.
#[derive(Clone)]
pub struct Db {
    store: Arc<dyn Store>,
    access: Access,
}

impl Db {
    pub fn new(store: Arc<dyn Store>, access: Access) -> Self {
        Self { store, access }
    }

    pub async fn select<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>, StoreError> {
        let rows = self.store.select(&self.access, query).await?;
        rows.into_iter().map(decode).collect()
    }

    pub async fn select_one<T: DeserializeOwned>(&self, query: &Query) -> Result<Option<T>, StoreError> {
        let query = query.clone().limit(1);
        let mut rows = self.store.select(&self.access, &query).await?;
        match rows.pop() {
            Some(row) => decode(row).map(Some),
            None => Ok(None),
        }
    }

    /// Whether any row matches. Join tables without an `id` column work too.
    pub async fn exists(&self, query: &Query) -> Result<bool, StoreError> {
        let query = query.clone().limit(1);
        Ok(!self.store.select(&self.access, &query).await?.is_empty())
    }

    pub async fn count(&self, query: &Query) -> Result<u64, StoreError> {
        self.store.count(&self.access, query).await
    }

    pub async fn insert<T: DeserializeOwned>(&self, table: &str, row: &impl Serialize) -> Result<T, StoreError> {
        let row = serde_json::to_value(row).map_err(|e| StoreError::Decode(e.to_string()))?;
        decode(self.store.insert(&self.access, table, row).await?)
    }

    /// Update the rows matching `query` and return the first one, if any matched.
    pub async fn update<T: DeserializeOwned>(&self, query: &Query, patch: &impl Serialize) -> Result<Option<T>, StoreError> {
        let patch = serde_json::to_value(patch).map_err(|e| StoreError::Decode(e.to_string()))?;
        let mut rows = self.store.update(&self.access, query, patch).await?;
        if rows.is_empty() {
            return Ok(None);
        }
        decode(rows.swap_remove(0)).map(Some)
    }

    /// Delete the rows matching `query`; returns how many were removed.
    pub async fn delete(&self, query: &Query) -> Result<usize, StoreError> {
        Ok(self.store.delete(&self.access, query).await?.len())
    }
}

fn decode<T: DeserializeOwned>(row: Value) -> Result<T, StoreError> {
    serde_json::from_value(row).map_err(|e| StoreError::Decode(e.to_string()))
}
