//! In-process remote store.
//!
//! Keeps the whole hierarchy as a single JSON tree behind a lock. Useful for
//! tests, demos, and embedding the collection layer without a hosted store.
//! Every mutation holds the write lock for its full duration, so
//! transactions are trivially atomic and never need to retry.

use super::traits::{RemoteStore, is_server_timestamp};
use crate::{Error, Result, current_timestamp_millis};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, RwLock};

/// Source of server-assigned timestamps (epoch milliseconds).
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// In-memory [`RemoteStore`] backed by a JSON tree.
///
/// Clone-friendly via `Arc`; clones share the same tree.
#[derive(Clone)]
pub struct MemoryStore {
    root: Arc<RwLock<Value>>,
    clock: Clock,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

impl MemoryStore {
    /// Creates an empty store using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Arc::new(RwLock::new(Value::Object(Map::new()))),
            clock: Arc::new(current_timestamp_millis),
        }
    }

    /// Creates a store pre-populated with `data` at the root.
    #[must_use]
    pub fn with_data(data: Value) -> Self {
        let store = Self::new();
        if let Ok(mut root) = store.root.write() {
            *root = data;
            prune(&mut root);
        }
        store
    }

    /// Replaces the clock used to resolve server timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Returns a copy of the entire tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn snapshot(&self) -> Result<Value> {
        Ok(self.read_root("snapshot")?.clone())
    }

    fn read_root(&self, operation: &str) -> Result<std::sync::RwLockReadGuard<'_, Value>> {
        self.root.read().map_err(|_| Error::StoreUnavailable {
            operation: operation.to_string(),
            cause: "lock poisoned".to_string(),
        })
    }

    fn write_root(&self, operation: &str) -> Result<std::sync::RwLockWriteGuard<'_, Value>> {
        self.root.write().map_err(|_| Error::WriteFailed {
            operation: operation.to_string(),
            cause: "lock poisoned".to_string(),
        })
    }

    fn get_sync(&self, path: &str) -> Result<Option<Value>> {
        let root = self.read_root("memory_get")?;
        Ok(lookup(&root, &segments(path)).cloned())
    }

    fn set_sync(&self, path: &str, mut value: Value) -> Result<()> {
        resolve_server_values(&mut value, (self.clock)());
        let mut root = self.write_root("memory_set")?;
        write_at(&mut root, &segments(path), value);
        prune(&mut root);
        Ok(())
    }

    fn update_sync(&self, path: &str, patch: Map<String, Value>) -> Result<()> {
        let now = (self.clock)();
        let base = segments(path);
        let mut root = self.write_root("memory_update")?;
        for (key, mut value) in patch {
            resolve_server_values(&mut value, now);
            let mut target = base.clone();
            target.extend(segments(&key));
            write_at(&mut root, &target, value);
        }
        prune(&mut root);
        Ok(())
    }

    fn transaction_sync<F>(&self, path: &str, update: F) -> Result<Value>
    where
        F: Fn(Option<&Value>) -> Value,
    {
        let segs = segments(path);
        let mut root = self.write_root("memory_transaction")?;
        let mut next = update(lookup(&root, &segs));
        resolve_server_values(&mut next, (self.clock)());
        write_at(&mut root, &segs, next.clone());
        prune(&mut root);
        Ok(next)
    }
}

impl RemoteStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        tracing::debug!(path, "memory store get");
        metrics::counter!("folio_store_operations_total", "backend" => "memory", "op" => "get")
            .increment(1);
        self.get_sync(path)
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        tracing::debug!(path, "memory store set");
        metrics::counter!("folio_store_operations_total", "backend" => "memory", "op" => "set")
            .increment(1);
        self.set_sync(path, value)
    }

    async fn update(&self, path: &str, patch: Map<String, Value>) -> Result<()> {
        tracing::debug!(path, fields = patch.len(), "memory store update");
        metrics::counter!("folio_store_operations_total", "backend" => "memory", "op" => "update")
            .increment(1);
        self.update_sync(path, patch)
    }

    async fn remove(&self, path: &str) -> Result<()> {
        tracing::debug!(path, "memory store remove");
        metrics::counter!("folio_store_operations_total", "backend" => "memory", "op" => "remove")
            .increment(1);
        self.set_sync(path, Value::Null)
    }

    fn generate_key(&self) -> String {
        uuid::Uuid::now_v7().simple().to_string()
    }

    async fn transaction<F>(&self, path: &str, update: F) -> Result<Value>
    where
        F: Fn(Option<&Value>) -> Value + Send + Sync,
    {
        tracing::debug!(path, "memory store transaction");
        metrics::counter!(
            "folio_store_operations_total",
            "backend" => "memory",
            "op" => "transaction"
        )
        .increment(1);
        self.transaction_sync(path, update)
    }
}

fn segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn lookup<'a>(root: &'a Value, segs: &[String]) -> Option<&'a Value> {
    let mut node = root;
    for seg in segs {
        node = node.as_object()?.get(seg)?;
    }
    match node {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        other => Some(other),
    }
}

fn write_at(root: &mut Value, segs: &[String], value: Value) {
    if value.is_null() {
        remove_at(root, segs);
        return;
    }
    let Some((last, parents)) = segs.split_last() else {
        *root = value;
        return;
    };

    let mut node = root;
    for seg in parents {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            return;
        };
        node = map
            .entry(seg.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        map.insert(last.clone(), value);
    }
}

/// Removes the node at `segs`; a missing or non-object parent is left as is.
fn remove_at(root: &mut Value, segs: &[String]) {
    let Some((last, parents)) = segs.split_last() else {
        *root = Value::Object(Map::new());
        return;
    };

    let mut node = root;
    for seg in parents {
        let Some(child) = node.as_object_mut().and_then(|map| map.get_mut(seg)) else {
            return;
        };
        node = child;
    }
    if let Value::Object(map) = node {
        map.remove(last);
    }
}

/// Drops nulls and empty objects so absent paths stay absent.
fn prune(value: &mut Value) {
    if let Value::Object(map) = value {
        for child in map.values_mut() {
            prune(child);
        }
        map.retain(|_, child| match child {
            Value::Null => false,
            Value::Object(inner) => !inner.is_empty(),
            _ => true,
        });
    }
}

fn resolve_server_values(value: &mut Value, now: i64) {
    if is_server_timestamp(value) {
        *value = Value::from(now);
        return;
    }
    match value {
        Value::Object(map) => {
            for child in map.values_mut() {
                resolve_server_values(child, now);
            }
        },
        Value::Array(items) => {
            for child in items {
                resolve_server_values(child, now);
            }
        },
        _ => {},
    }
}
