//! Storage contract and the in-memory reference store.
//!
//! The framework delegates all query execution to a [`Store`]; each CRUD
//! operation is one store call, with no retries and no framework-imposed
//! transactional boundaries. A store-level read miss surfaces upstream as
//! `NotFound`; write failures propagate as-is.

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tracing::debug;

/// Minimal CRUD capability surface a resource requires of its backing store.
///
/// Every method defaults to "not implemented"; a resource that never
/// receives a verb does not need the corresponding operation.
pub trait Store: Send + Sync {
    /// Read the stored collection, narrowed by traversal scope params
    /// (`parent-resource-name: parent-id` pairs).
    fn read(&self, scope: &[(String, String)]) -> Result<Vec<Value>> {
        let _ = scope;
        Err(Error::not_implemented("read"))
    }

    /// Insert a new item and return it as stored.
    fn create(&self, data: Value) -> Result<Value> {
        let _ = data;
        Err(Error::not_implemented("create"))
    }

    /// Apply `data` onto `item` and return the persisted result.
    fn update(&self, item: Value, data: Value) -> Result<Value> {
        let _ = (item, data);
        Err(Error::not_implemented("update"))
    }

    /// Delete the item. Dependent-object cascade is the store's concern.
    fn destroy(&self, item: Value) -> Result<()> {
        let _ = item;
        Err(Error::not_implemented("destroy"))
    }
}

/// In-memory JSON-object store used by tests and demos.
///
/// Rows are flat JSON objects keyed by an identifier field; scope params
/// match against identically-named columns, which is how reverse foreign-key
/// narrowing reaches it.
pub struct MemoryStore {
    id_field: String,
    rows: RwLock<Vec<Value>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    /// An empty store with the conventional `id` identifier field.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rows(Vec::new())
    }

    /// A store seeded with rows.
    #[must_use]
    pub fn with_rows(rows: Vec<Value>) -> Self {
        let next = rows
            .iter()
            .filter_map(|r| r.get("id").and_then(Value::as_u64))
            .max()
            .map_or(1, |m| m + 1);
        MemoryStore {
            id_field: "id".to_string(),
            rows: RwLock::new(rows),
            next_id: AtomicU64::new(next),
        }
    }

    /// Use a different identifier field name.
    #[must_use]
    pub fn id_field(mut self, name: impl Into<String>) -> Self {
        self.id_field = name.into();
        self
    }

    fn same_id(lhs: &Value, rhs: &Value) -> bool {
        stringify(lhs) == stringify(rhs)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Store for MemoryStore {
    fn read(&self, scope: &[(String, String)]) -> Result<Vec<Value>> {
        let rows = self
            .rows
            .read()
            .map_err(|_| Error::Internal(anyhow::anyhow!("store lock poisoned")))?;
        let matched: Vec<Value> = rows
            .iter()
            .filter(|row| {
                scope.iter().all(|(key, value)| {
                    row.get(key).is_some_and(|v| stringify(v) == *value)
                })
            })
            .cloned()
            .collect();
        debug!(scope = ?scope, matched = matched.len(), "Store read");
        Ok(matched)
    }

    fn create(&self, data: Value) -> Result<Value> {
        let mut row = match data {
            Value::Object(map) => map,
            other => {
                return Err(Error::Internal(anyhow::anyhow!(
                    "create expects an object, got {other}"
                )))
            }
        };
        if !row.contains_key(&self.id_field) {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            row.insert(self.id_field.clone(), Value::from(id));
        }
        let stored = Value::Object(row);
        self.rows
            .write()
            .map_err(|_| Error::Internal(anyhow::anyhow!("store lock poisoned")))?
            .push(stored.clone());
        Ok(stored)
    }

    fn update(&self, item: Value, data: Value) -> Result<Value> {
        let id = item
            .get(&self.id_field)
            .cloned()
            .ok_or_else(|| Error::Internal(anyhow::anyhow!("item has no identifier")))?;
        let patch: Map<String, Value> = match data {
            Value::Object(map) => map,
            other => {
                return Err(Error::Internal(anyhow::anyhow!(
                    "update expects an object, got {other}"
                )))
            }
        };
        let mut rows = self
            .rows
            .write()
            .map_err(|_| Error::Internal(anyhow::anyhow!("store lock poisoned")))?;
        for row in rows.iter_mut() {
            let matches = row
                .get(&self.id_field)
                .is_some_and(|v| Self::same_id(v, &id));
            if matches {
                if let Value::Object(map) = row {
                    for (key, value) in &patch {
                        map.insert(key.clone(), value.clone());
                    }
                }
                return Ok(row.clone());
            }
        }
        Err(Error::NotFound)
    }

    fn destroy(&self, item: Value) -> Result<()> {
        let id = item
            .get(&self.id_field)
            .cloned()
            .ok_or_else(|| Error::Internal(anyhow::anyhow!("item has no identifier")))?;
        let mut rows = self
            .rows
            .write()
            .map_err(|_| Error::Internal(anyhow::anyhow!("store lock poisoned")))?;
        let before = rows.len();
        rows.retain(|row| {
            !row.get(&self.id_field)
                .is_some_and(|v| Self::same_id(v, &id))
        });
        if rows.len() == before {
            return Err(Error::NotFound);
        }
        Ok(())
    }
}
