//! Legacy migration service.
//!
//! Moves records that only exist in the legacy local store into a remote
//! collection, at most once. The remote subtree being non-empty is taken to
//! mean the migration already happened.
//!
//! The check and the writes are not atomic: two runners started at the same
//! time against an empty remote subtree can both migrate. That only ever
//! duplicates records, never loses them.

use std::sync::Arc;

use serde_json::Value;

use crate::models::CollectionEntry;
use crate::services::CollectionRepository;
use crate::storage::{LocalStore, RemoteStore};

/// Statistics from a migration run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationStats {
    /// Records written to the remote store.
    pub migrated: usize,
    /// Records that could not be parsed or written.
    pub errors: usize,
    /// Records found in the local store.
    pub total: usize,
}

impl MigrationStats {
    /// Creates a new empty migration stats instance.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            migrated: 0,
            errors: 0,
            total: 0,
        }
    }
}

/// What a migration run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The local store holds nothing to migrate.
    NoLocalData,
    /// The remote collection already has records; nothing was touched.
    RemoteAlreadyPopulated,
    /// Every local record was migrated and the local store was cleared.
    Completed(MigrationStats),
    /// Some records failed. Migrated records stay remote and the local store
    /// is left intact; reconciling the two needs manual intervention.
    Incomplete(MigrationStats),
    /// The run stopped before writing anything.
    Aborted(String),
}

impl MigrationOutcome {
    /// Returns true if the local store was cleared by this run.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// One-shot transfer from a legacy local store into a collection.
pub struct LegacyMigrationRunner<S, L, T>
where
    S: RemoteStore,
    L: LocalStore,
    T: CollectionEntry,
{
    repository: Arc<CollectionRepository<S, T>>,
    local: Arc<L>,
    key: String,
}

impl<S, L, T> LegacyMigrationRunner<S, L, T>
where
    S: RemoteStore,
    L: LocalStore,
    T: CollectionEntry,
{
    /// Creates a runner that migrates the JSON array stored under `key`.
    pub fn new(
        repository: Arc<CollectionRepository<S, T>>,
        local: Arc<L>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            local,
            key: key.into(),
        }
    }

    /// Runs the migration.
    ///
    /// Never fails: every problem is logged and reported in the outcome, so
    /// a broken migration cannot block listing the collection.
    pub async fn migrate(&self) -> MigrationOutcome {
        let legacy = match self.read_legacy() {
            Ok(Some(items)) if !items.is_empty() => items,
            Ok(_) => return MigrationOutcome::NoLocalData,
            Err(reason) => {
                tracing::warn!(key = %self.key, reason = %reason, "Legacy migration aborted");
                return MigrationOutcome::Aborted(reason);
            },
        };

        match self.repository.exists_any().await {
            Ok(true) => {
                tracing::info!(
                    path = %self.repository.path(),
                    "Remote collection already has data, skipping migration"
                );
                return MigrationOutcome::RemoteAlreadyPopulated;
            },
            Ok(false) => {},
            Err(e) => {
                tracing::warn!(error = %e, "Legacy migration aborted");
                return MigrationOutcome::Aborted(e.to_string());
            },
        }

        let mut stats = MigrationStats {
            total: legacy.len(),
            ..MigrationStats::default()
        };

        for (index, item) in legacy.into_iter().enumerate() {
            match self.migrate_single(item).await {
                Ok(()) => stats.migrated += 1,
                Err(reason) => {
                    tracing::warn!("Failed to migrate legacy {} #{index}: {reason}", T::KIND);
                    stats.errors += 1;
                },
            }
        }

        metrics::counter!("folio_migration_records_total", "result" => "migrated")
            .increment(stats.migrated as u64);
        metrics::counter!("folio_migration_records_total", "result" => "error")
            .increment(stats.errors as u64);

        if stats.errors > 0 {
            tracing::warn!(
                migrated = stats.migrated,
                errors = stats.errors,
                "Legacy migration incomplete, local data kept"
            );
            return MigrationOutcome::Incomplete(stats);
        }

        if let Err(e) = self.local.remove_item(&self.key) {
            tracing::warn!(key = %self.key, error = %e, "Migrated but could not clear local store");
            return MigrationOutcome::Incomplete(stats);
        }

        tracing::info!(migrated = stats.migrated, "Legacy migration completed");
        MigrationOutcome::Completed(stats)
    }

    /// Reads and parses the legacy array.
    fn read_legacy(&self) -> std::result::Result<Option<Vec<Value>>, String> {
        let Some(raw) = self.local.get_item(&self.key).map_err(|e| e.to_string())? else {
            return Ok(None);
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(items)) => Ok(Some(items)),
            Ok(Value::Null) => Ok(None),
            Ok(_) => Err(format!("legacy '{}' is not a JSON array", self.key)),
            Err(e) => Err(format!("legacy '{}' is not valid JSON: {e}", self.key)),
        }
    }

    /// Writes one legacy record, dropping its local id and creation time.
    async fn migrate_single(&self, item: Value) -> std::result::Result<(), String> {
        let Value::Object(mut fields) = item else {
            return Err("entry is not a mapping".to_string());
        };
        fields.remove("id");
        fields.remove("createdAt");

        let entry: T = serde_json::from_value(Value::Object(fields)).map_err(|e| e.to_string())?;
        self.repository
            .create(entry)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}
