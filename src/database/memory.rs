use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::query::{Filter, Query, SortDirection};
use super::store::{Access, Store, StoreError};

type Row = Map<String, Value>;

/// In-process table store with the same filter semantics as the REST backend.
/// Row-level security is not modeled. Used by the test suite.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    failing: RwLock<HashSet<String>>,
    failing_writes: RwLock<HashSet<String>>,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert rows verbatim, bypassing the call counter.
    pub async fn seed(&self, table: &str, rows: Vec<Value>) {
        let mut tables = self.tables.write().await;
        let entries = tables.entry(table.to_string()).or_default();
        for row in rows {
            if let Value::Object(map) = row {
                entries.push(map);
            }
        }
    }

    /// Snapshot of a table's rows.
    pub async fn rows(&self, table: &str) -> Vec<Value> {
        let tables = self.tables.read().await;
        tables
            .get(table)
            .map(|rows| rows.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    /// Make every call touching `table` fail with a backend rejection.
    pub async fn fail_table(&self, table: &str) {
        self.failing.write().await.insert(table.to_string());
    }

    /// Make inserts, updates and deletes on `table` fail while reads still work.
    pub async fn fail_writes(&self, table: &str) {
        self.failing_writes.write().await.insert(table.to_string());
    }

    /// Number of store calls made through the `Store` trait.
    pub fn calls(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    async fn enter(&self, table: &str) -> Result<(), StoreError> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        if self.failing.read().await.contains(table) {
            return Err(unavailable(table));
        }
        Ok(())
    }

    async fn enter_write(&self, table: &str) -> Result<(), StoreError> {
        self.enter(table).await?;
        if self.failing_writes.read().await.contains(table) {
            return Err(unavailable(table));
        }
        Ok(())
    }
}

fn unavailable(table: &str) -> StoreError {
    StoreError::Rejected {
        status: 503,
        message: format!("table '{}' is unavailable", table),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn select(&self, _access: &Access, query: &Query) -> Result<Vec<Value>, StoreError> {
        self.enter(query.table_name()).await?;
        let tables = self.tables.read().await;
        let mut rows: Vec<&Row> = tables
            .get(query.table_name())
            .map(|rows| rows.iter().filter(|r| matches(r, query.filters())).collect())
            .unwrap_or_default();

        rows.sort_by(|a, b| {
            for order in query.ordering() {
                let ord = compare(a.get(&order.column), b.get(&order.column));
                let ord = match order.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });

        let offset = query.offset_value().unwrap_or(0);
        let limit = query.limit_value().unwrap_or(usize::MAX);

        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| project(row, query.columns()))
            .collect())
    }

    async fn count(&self, _access: &Access, query: &Query) -> Result<u64, StoreError> {
        self.enter(query.table_name()).await?;
        let tables = self.tables.read().await;
        Ok(tables
            .get(query.table_name())
            .map(|rows| rows.iter().filter(|r| matches(r, query.filters())).count() as u64)
            .unwrap_or(0))
    }

    async fn insert(&self, _access: &Access, table: &str, row: Value) -> Result<Value, StoreError> {
        self.enter_write(table).await?;
        let Value::Object(mut map) = row else {
            return Err(StoreError::Rejected {
                status: 400,
                message: "row must be a JSON object".to_string(),
            });
        };
        if !map.contains_key("id") {
            map.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }

        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default().push(map.clone());
        Ok(Value::Object(map))
    }

    async fn update(&self, _access: &Access, query: &Query, patch: Value) -> Result<Vec<Value>, StoreError> {
        self.enter_write(query.table_name()).await?;
        let Value::Object(patch) = patch else {
            return Err(StoreError::Rejected {
                status: 400,
                message: "patch must be a JSON object".to_string(),
            });
        };

        let mut tables = self.tables.write().await;
        let mut updated = Vec::new();
        if let Some(rows) = tables.get_mut(query.table_name()) {
            for row in rows.iter_mut().filter(|r| matches(r, query.filters())) {
                for (k, v) in &patch {
                    row.insert(k.clone(), v.clone());
                }
                updated.push(Value::Object(row.clone()));
            }
        }
        Ok(updated)
    }

    async fn delete(&self, _access: &Access, query: &Query) -> Result<Vec<Value>, StoreError> {
        self.enter_write(query.table_name()).await?;
        let mut tables = self.tables.write().await;
        let mut removed = Vec::new();
        if let Some(rows) = tables.get_mut(query.table_name()) {
            let mut kept = Vec::with_capacity(rows.len());
            for row in rows.drain(..) {
                if matches(&row, query.filters()) {
                    removed.push(Value::Object(row));
                } else {
                    kept.push(row);
                }
            }
            *rows = kept;
        }
        Ok(removed)
    }
}

fn matches(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|f| match f {
        Filter::Eq { column, value } => {
            let cell = row.get(column).unwrap_or(&Value::Null);
            value_eq(cell, value)
        }
        Filter::In { column, values } => {
            let cell = row.get(column).unwrap_or(&Value::Null);
            values.iter().any(|v| value_eq(cell, v))
        }
        Filter::ILike { column, needle } => match row.get(column) {
            Some(Value::String(text)) => text.to_lowercase().contains(&needle.to_lowercase()),
            _ => false,
        },
    })
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

// Nulls sort first, as in an ascending Postgres scan with NULLS FIRST.
fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a.unwrap_or(&Value::Null), b.unwrap_or(&Value::Null)) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (x, y) => x.to_string().cmp(&y.to_string()),
    }
}

fn project(row: &Row, columns: Option<&[String]>) -> Value {
    match columns {
        Some(cols) if !cols.iter().any(|c| c == "*") => {
            let mut out = Map::new();
            for col in cols {
                if let Some(v) = row.get(col) {
                    out.insert(col.clone(), v.clone());
                }
            }
            Value::Object(out)
        }
        _ => Value::Object(row.clone()),
    }
}
