//! Generic collection repository.
//!
//! Maps one remote subtree (`{path}/{id} -> fields`) onto an ordered,
//! typed collection. The store keeps no index and enforces no schema, so
//! every `list` materializes a fresh snapshot:
//!
//! 1. attach each child key as the record id
//! 2. normalize `createdAt` (epoch millis or ISO string) to ISO-8601
//! 3. deserialize and validate the domain fields, skipping bad entries
//! 4. sort newest first

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::models::{CollectionEntry, Record, RecordId, format_timestamp, normalize_created_at};
use crate::storage::{RemoteStore, child_path, server_timestamp, validate_key};
use crate::{Error, Result};

const ID_FIELD: &str = "id";
const CREATED_AT_FIELD: &str = "createdAt";

/// Repository over a single collection subtree.
pub struct CollectionRepository<S, T>
where
    S: RemoteStore,
    T: CollectionEntry,
{
    store: Arc<S>,
    path: String,
    strict_updates: bool,
    _entry: PhantomData<fn() -> T>,
}

impl<S, T> CollectionRepository<S, T>
where
    S: RemoteStore,
    T: CollectionEntry,
{
    /// Creates a repository rooted at `path`.
    ///
    /// Updates check that the target exists before patching; see
    /// [`Self::with_lenient_updates`].
    pub fn new(store: Arc<S>, path: impl Into<String>) -> Self {
        Self {
            store,
            path: path.into().trim_matches('/').to_string(),
            strict_updates: true,
            _entry: PhantomData,
        }
    }

    /// Skips the existence check before updates.
    ///
    /// Most hierarchical stores silently create the target of a patch, so a
    /// lenient update of a deleted id resurrects a partial record.
    #[must_use]
    pub const fn with_lenient_updates(mut self) -> Self {
        self.strict_updates = false;
        self
    }

    /// Returns the subtree path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Lists every valid record, newest first.
    ///
    /// When the subtree is absent and the entry type has built-in seed
    /// records, they are written once and the subtree is read again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the subtree cannot be read.
    /// An unreadable store is never reported as an empty collection.
    pub async fn list(&self) -> Result<Vec<Record<T>>> {
        if let Some(snapshot) = self.store.get(&self.path).await? {
            return Ok(self.materialize(snapshot));
        }

        let seed = T::seed();
        if seed.is_empty() {
            return Ok(Vec::new());
        }

        self.write_seed(seed).await;
        let snapshot = self.store.get(&self.path).await?;
        Ok(snapshot.map(|s| self.materialize(s)).unwrap_or_default())
    }

    /// Reads a single record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the read fails, or
    /// [`Error::InvalidRecord`] if the stored value is malformed.
    pub async fn get(&self, id: &RecordId) -> Result<Option<Record<T>>> {
        validate_key(id.as_str())?;
        let Some(value) = self.store.get(&child_path(&self.path, id.as_str())).await? else {
            return Ok(None);
        };

        materialize_entry::<T>(id.as_str(), value)
            .map(|(record, _)| Some(record))
            .map_err(|reason| Error::InvalidRecord {
                collection: T::KIND.to_string(),
                id: id.to_string(),
                reason,
            })
    }

    /// Returns true if the subtree holds anything at all.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the subtree cannot be read.
    pub async fn exists_any(&self) -> Result<bool> {
        Ok(self.store.get(&self.path).await?.is_some())
    }

    /// Creates a record with a store-generated id and server creation time.
    ///
    /// The returned `created_at` is the client clock; the authoritative value
    /// is whatever the store reports on the next read. Any `id` or
    /// `createdAt` inside `fields` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `fields` fails validation, or
    /// [`Error::WriteFailed`] if the store does not confirm the write. A
    /// failed write leaves the minted key unused.
    pub async fn create(&self, fields: T) -> Result<Record<T>> {
        fields
            .validate()
            .map_err(|reason| Error::InvalidInput(format!("{}: {reason}", T::KIND)))?;

        let mut payload = to_object(&fields)?;
        payload.remove(ID_FIELD);
        payload.insert(CREATED_AT_FIELD.to_string(), server_timestamp());

        let key = self.store.generate_key();
        self.store
            .set(&child_path(&self.path, &key), Value::Object(payload))
            .await
            .map_err(|e| as_write_failure("create_record", e))?;

        tracing::debug!(collection = T::KIND, id = %key, "Created record");

        Ok(Record {
            id: RecordId::new(key),
            created_at: format_timestamp(Utc::now()),
            fields,
        })
    }

    /// Patches the named fields of an existing record.
    ///
    /// `id` and `createdAt` never reach the store even if the patch carries
    /// them. An empty patch is a no-op once the record is known to exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordNotFound`] if the record does not exist (strict
    /// mode), [`Error::StoreUnavailable`] if the existence check fails, or
    /// [`Error::WriteFailed`] if the patch is not confirmed.
    pub async fn update(&self, id: &RecordId, patch: &T::Patch) -> Result<()> {
        validate_key(id.as_str())?;

        let mut fields = to_object(patch)?;
        fields.remove(ID_FIELD);
        fields.remove(CREATED_AT_FIELD);

        let record_path = child_path(&self.path, id.as_str());
        if self.strict_updates && self.store.get(&record_path).await?.is_none() {
            return Err(Error::RecordNotFound {
                collection: T::KIND.to_string(),
                id: id.to_string(),
            });
        }

        if fields.is_empty() {
            return Ok(());
        }

        self.store
            .update(&record_path, fields)
            .await
            .map_err(|e| as_write_failure("update_record", e))?;

        tracing::debug!(collection = T::KIND, id = %id, "Updated record");
        Ok(())
    }

    /// Removes a record permanently. Removing a missing id succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WriteFailed`] if the store does not confirm the delete.
    pub async fn delete(&self, id: &RecordId) -> Result<()> {
        validate_key(id.as_str())?;
        self.store
            .remove(&child_path(&self.path, id.as_str()))
            .await
            .map_err(|e| as_write_failure("delete_record", e))?;

        tracing::debug!(collection = T::KIND, id = %id, "Deleted record");
        Ok(())
    }

    async fn write_seed(&self, seed: Vec<T>) {
        tracing::info!(
            collection = T::KIND,
            path = %self.path,
            count = seed.len(),
            "Collection is empty, writing built-in records"
        );

        for entry in seed {
            if let Err(e) = self.create(entry).await {
                tracing::warn!(collection = T::KIND, error = %e, "Failed to write seed record");
            }
        }
    }

    fn materialize(&self, snapshot: Value) -> Vec<Record<T>> {
        let Value::Object(children) = snapshot else {
            tracing::warn!(
                collection = T::KIND,
                path = %self.path,
                "Collection subtree is not a mapping, ignoring it"
            );
            metrics::counter!("folio_records_skipped_total", "collection" => T::KIND).increment(1);
            return Vec::new();
        };

        let mut records: Vec<(Record<T>, DateTime<Utc>)> = Vec::with_capacity(children.len());
        for (key, value) in children {
            match materialize_entry::<T>(&key, value) {
                Ok(entry) => records.push(entry),
                Err(reason) => {
                    tracing::warn!(
                        collection = T::KIND,
                        id = %key,
                        reason = %reason,
                        "Skipping invalid record"
                    );
                    metrics::counter!("folio_records_skipped_total", "collection" => T::KIND)
                        .increment(1);
                },
            }
        }

        // Stable, so equal timestamps keep key order within one result.
        records.sort_by(|a, b| b.1.cmp(&a.1));
        records.into_iter().map(|(record, _)| record).collect()
    }
}

/// Builds a typed record from one stored child.
fn materialize_entry<T: CollectionEntry>(
    key: &str,
    value: Value,
) -> std::result::Result<(Record<T>, DateTime<Utc>), String> {
    let Value::Object(mut fields) = value else {
        return Err("entry is not a mapping".to_string());
    };

    fields.remove(ID_FIELD);
    let (created_at, time) = fields
        .remove(CREATED_AT_FIELD)
        .as_ref()
        .and_then(normalize_created_at)
        .ok_or_else(|| "missing or unreadable createdAt".to_string())?;

    let parsed: T = serde_json::from_value(Value::Object(fields)).map_err(|e| e.to_string())?;
    parsed.validate()?;

    Ok((
        Record {
            id: RecordId::new(key),
            created_at,
            fields: parsed,
        },
        time,
    ))
}

fn to_object<V: serde::Serialize>(value: &V) -> Result<Map<String, Value>> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(Error::InvalidInput(format!(
            "expected a field mapping, got {other}"
        ))),
        Err(e) => Err(Error::InvalidInput(e.to_string())),
    }
}

/// Reports any failed mutation as [`Error::WriteFailed`].
fn as_write_failure(operation: &str, err: Error) -> Error {
    match err {
        e @ Error::WriteFailed { .. } => e,
        other => Error::WriteFailed {
            operation: operation.to_string(),
            cause: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        PortfolioItem, PortfolioItemPatch, ProjectType, WorkExperience, WorkExperiencePatch,
    };
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn experiences(store: &MemoryStore) -> CollectionRepository<MemoryStore, WorkExperience> {
        CollectionRepository::new(Arc::new(store.clone()), "work_experiences")
    }

    #[tokio::test]
    async fn test_list_absent_without_seed_is_empty() {
        let store = MemoryStore::new();
        let repo = experiences(&store);
        assert!(repo.list().await.unwrap().is_empty());
        assert!(store.snapshot().unwrap().as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let store = MemoryStore::new();
        let repo = experiences(&store);
        let created = repo
            .create(WorkExperience::new("Acme", "Engineer", "2020 - 2022", "Built things"))
            .await
            .unwrap();

        assert!(!created.id.as_str().is_empty());
        assert!(created.created_at.ends_with('Z'));

        let fetched = repo.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.fields, created.fields);
    }

    #[tokio::test]
    async fn test_create_stores_server_timestamp_and_no_id() {
        let store = MemoryStore::new().with_clock(Arc::new(|| 1_714_557_600_000));
        let repo = experiences(&store);
        let created = repo
            .create(WorkExperience::new("Acme", "Engineer", "", ""))
            .await
            .unwrap();

        let raw = store
            .get(&format!("work_experiences/{}", created.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(raw["createdAt"], json!(1_714_557_600_000_i64));
        assert!(raw.get("id").is_none());

        let listed = repo.list().await.unwrap();
        assert_eq!(listed[0].created_at, "2024-05-01T10:00:00.000Z");
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_fields() {
        let store = MemoryStore::new();
        let repo = experiences(&store);
        let err = repo
            .create(WorkExperience::new("  ", "Engineer", "", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_sorts_newest_first_and_normalizes() {
        let store = MemoryStore::with_data(json!({
            "work_experiences": {
                "a": {"company": "Old", "role": "R", "createdAt": "2021-01-01T00:00:00.000Z"},
                "b": {"company": "New", "role": "R", "createdAt": 1_700_000_000_000_i64},
                "c": {"company": "Mid", "role": "R", "createdAt": "2022-06-01"}
            }
        }));
        let repo = experiences(&store);

        let listed = repo.list().await.unwrap();
        let companies: Vec<_> = listed.iter().map(|r| r.fields.company.as_str()).collect();
        assert_eq!(companies, vec!["New", "Mid", "Old"]);
        assert_eq!(listed[0].created_at, "2023-11-14T22:13:20.000Z");
        assert_eq!(listed[1].created_at, "2022-06-01T00:00:00.000Z");
        assert_eq!(listed[0].id.as_str(), "b");
    }

    #[tokio::test]
    async fn test_list_skips_invalid_entries() {
        let store = MemoryStore::with_data(json!({
            "work_experiences": {
                "good": {"company": "A", "role": "R", "createdAt": 1},
                "no_time": {"company": "B", "role": "R"},
                "blank": {"company": "", "role": "R", "createdAt": 2},
                "scalar": 42
            }
        }));
        let repo = experiences(&store);

        let listed = repo.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id.as_str(), "good");
    }

    #[tokio::test]
    async fn test_stored_id_field_is_ignored() {
        let store = MemoryStore::with_data(json!({
            "work_experiences": {
                "real": {"id": "forged", "company": "A", "role": "R", "createdAt": 1}
            }
        }));
        let listed = experiences(&store).list().await.unwrap();
        assert_eq!(listed[0].id.as_str(), "real");
    }

    #[tokio::test]
    async fn test_update_patches_only_given_fields() {
        let store = MemoryStore::new();
        let repo = experiences(&store);
        let created = repo
            .create(WorkExperience::new("Acme", "Engineer", "2020", "desc"))
            .await
            .unwrap();
        let before = repo.get(&created.id).await.unwrap().unwrap();

        let patch = WorkExperiencePatch {
            role: Some("Lead".to_string()),
            ..WorkExperiencePatch::default()
        };
        repo.update(&created.id, &patch).await.unwrap();

        let after = repo.get(&created.id).await.unwrap().unwrap();
        assert_eq!(after.fields.role, "Lead");
        assert_eq!(after.fields.company, "Acme");
        assert_eq!(after.fields.description, "desc");
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.id, before.id);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryStore::new();
        let repo = experiences(&store);
        let patch = WorkExperiencePatch {
            role: Some("Lead".to_string()),
            ..WorkExperiencePatch::default()
        };
        let err = repo.update(&RecordId::new("ghost"), &patch).await.unwrap_err();
        assert!(matches!(err, Error::RecordNotFound { .. }));
        assert!(store.get("work_experiences/ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lenient_update_creates_missing() {
        let store = MemoryStore::new();
        let repo = experiences(&store).with_lenient_updates();
        let patch = WorkExperiencePatch {
            role: Some("Lead".to_string()),
            ..WorkExperiencePatch::default()
        };
        repo.update(&RecordId::new("ghost"), &patch).await.unwrap();
        assert!(store.get("work_experiences/ghost").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_rejects_path_ids() {
        let store = MemoryStore::new();
        let repo = experiences(&store);
        let err = repo
            .update(&RecordId::new("a/b"), &WorkExperiencePatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        let repo = experiences(&store);
        let created = repo
            .create(WorkExperience::new("Acme", "Engineer", "", ""))
            .await
            .unwrap();

        repo.delete(&created.id).await.unwrap();
        repo.delete(&created.id).await.unwrap();
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_portfolio_seeds_once() {
        let store = MemoryStore::new();
        let repo: CollectionRepository<MemoryStore, PortfolioItem> =
            CollectionRepository::new(Arc::new(store.clone()), "portfolio_items");

        let first = repo.list().await.unwrap();
        assert_eq!(first.len(), 2);
        let second = repo.list().await.unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(
            first.iter().map(|r| &r.id).collect::<Vec<_>>(),
            second.iter().map(|r| &r.id).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_portfolio_patch_type_field() {
        let store = MemoryStore::new();
        let repo: CollectionRepository<MemoryStore, PortfolioItem> =
            CollectionRepository::new(Arc::new(store.clone()), "portfolio_items");
        let created = repo
            .create(PortfolioItem::new("X", "d", ProjectType::Web))
            .await
            .unwrap();

        let patch = PortfolioItemPatch {
            project_type: Some(ProjectType::Mobile),
            ..PortfolioItemPatch::default()
        };
        repo.update(&created.id, &patch).await.unwrap();

        let fetched = repo.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.fields.project_type, ProjectType::Mobile);
        assert_eq!(fetched.fields.title, "X");
    }

    #[tokio::test]
    async fn test_get_malformed_is_invalid_record() {
        let store = MemoryStore::with_data(json!({"work_experiences": {"bad": {"company": 1}}}));
        let err = experiences(&store).get(&RecordId::new("bad")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRecord { .. }));
    }

    #[test]
    fn test_as_write_failure_keeps_write_errors() {
        let err = as_write_failure(
            "x",
            Error::WriteFailed {
                operation: "inner".to_string(),
                cause: "boom".to_string(),
            },
        );
        assert!(matches!(err, Error::WriteFailed { ref operation, .. } if operation == "inner"));

        let err = as_write_failure("x", Error::InvalidInput("nope".to_string()));
        assert!(matches!(err, Error::WriteFailed { ref operation, .. } if operation == "x"));
    }
}
