//! Remote hierarchical store trait.

use crate::{Error, Result};
use serde_json::{Map, Value, json};
use std::future::Future;

/// Trait for the hosted hierarchical key-value store.
///
/// Paths are `/`-separated keys below the store root. A path that holds
/// nothing (or JSON `null`) is reported as absent. All calls suspend the
/// caller until the round trip completes; there is no cancellation layer
/// beyond the transport's own timeout.
pub trait RemoteStore: Send + Sync {
    /// Reads the whole subtree at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the read fails.
    fn get(&self, path: &str) -> impl Future<Output = Result<Option<Value>>> + Send;

    /// Replaces the value at `path`. Writing `null` removes it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WriteFailed`] if the store does not confirm the write.
    fn set(&self, path: &str, value: Value) -> impl Future<Output = Result<()>> + Send;

    /// Patches the children of `path` named in `patch`, leaving others intact.
    ///
    /// Note that most stores create `path` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WriteFailed`] if the store does not confirm the write.
    fn update(&self, path: &str, patch: Map<String, Value>)
    -> impl Future<Output = Result<()>> + Send;

    /// Deletes `path`. Deleting a missing path succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WriteFailed`] if the store does not confirm the delete.
    fn remove(&self, path: &str) -> impl Future<Output = Result<()>> + Send;

    /// Mints a new unique child key. No round trip is made.
    fn generate_key(&self) -> String;

    /// Appends `value` under a freshly generated key and returns the key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WriteFailed`] if the store does not confirm the write.
    fn push(&self, path: &str, value: Value) -> impl Future<Output = Result<String>> + Send {
        async move {
            let key = self.generate_key();
            self.set(&child_path(path, &key), value).await?;
            Ok(key)
        }
    }

    /// Atomically replaces the value at `path` with `update(current)`.
    ///
    /// If another writer changes the value between the read and the write,
    /// the store re-runs `update` against the fresh value. Returns the value
    /// that was committed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] or [`Error::WriteFailed`] if the
    /// transaction cannot be committed.
    fn transaction<F>(&self, path: &str, update: F) -> impl Future<Output = Result<Value>> + Send
    where
        F: Fn(Option<&Value>) -> Value + Send + Sync;
}

/// Placeholder the store replaces with its own clock when it commits.
#[must_use]
pub fn server_timestamp() -> Value {
    json!({".sv": "timestamp"})
}

/// Returns true if `value` is an unresolved server timestamp placeholder.
#[must_use]
pub fn is_server_timestamp(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|map| {
            map.len() == 1 && map.get(".sv").and_then(Value::as_str) == Some("timestamp")
        })
}

/// Joins a parent path and a child key.
#[must_use]
pub fn child_path(parent: &str, key: &str) -> String {
    let parent = parent.trim_end_matches('/');
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}/{key}")
    }
}

/// Characters the store refuses inside a single key.
const FORBIDDEN_KEY_CHARS: [char; 6] = ['/', '.', '#', '$', '[', ']'];

/// Checks that `key` can address exactly one child.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for empty keys or keys containing path
/// separators or characters the store rejects.
pub fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::InvalidInput("record id must not be empty".to_string()));
    }
    if let Some(c) = key.chars().find(|c| FORBIDDEN_KEY_CHARS.contains(c) || c.is_control()) {
        return Err(Error::InvalidInput(format!(
            "record id '{key}' contains forbidden character {c:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_path() {
        assert_eq!(child_path("portfolio_items", "k1"), "portfolio_items/k1");
        assert_eq!(child_path("analytics/visit_logs/", "k2"), "analytics/visit_logs/k2");
        assert_eq!(child_path("", "root"), "root");
    }

    #[test]
    fn test_server_timestamp_placeholder() {
        assert!(is_server_timestamp(&server_timestamp()));
        assert!(!is_server_timestamp(&json!(1_700_000_000_000_i64)));
        assert!(!is_server_timestamp(&json!({".sv": "timestamp", "x": 1})));
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("0190a1b2c3d4").is_ok());
        assert!(validate_key("-NqXyZ_abc").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("   ").is_err());
        assert!(validate_key("../profile").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key("a.b").is_err());
        assert!(validate_key("a[0]").is_err());
    }
}
