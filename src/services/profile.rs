//! Profile repository.

use std::sync::Arc;

use crate::models::Profile;
use crate::storage::RemoteStore;
use crate::{Error, Result};

/// Reads and replaces the singleton profile record.
pub struct ProfileRepository<S: RemoteStore> {
    store: Arc<S>,
    path: String,
}

impl<S: RemoteStore> ProfileRepository<S> {
    /// Creates a profile repository at `path`.
    pub fn new(store: Arc<S>, path: impl Into<String>) -> Self {
        Self {
            store,
            path: path.into().trim_matches('/').to_string(),
        }
    }

    /// Returns the stored profile, or `None` if it was never saved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the read fails, or
    /// [`Error::InvalidRecord`] if the stored value is not a profile.
    pub async fn get(&self) -> Result<Option<Profile>> {
        let Some(value) = self.store.get(&self.path).await? else {
            return Ok(None);
        };

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| Error::InvalidRecord {
                collection: "profile".to_string(),
                id: self.path.clone(),
                reason: e.to_string(),
            })
    }

    /// Replaces the whole profile. Fields left empty are removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WriteFailed`] if the store does not confirm the write.
    pub async fn save(&self, profile: &Profile) -> Result<()> {
        let value = serde_json::to_value(profile)
            .map_err(|e| Error::InvalidInput(format!("profile: {e}")))?;

        self.store.set(&self.path, value).await.map_err(|e| match e {
            e @ Error::WriteFailed { .. } => e,
            other => Error::WriteFailed {
                operation: "save_profile".to_string(),
                cause: other.to_string(),
            },
        })?;

        tracing::debug!(path = %self.path, "Saved profile");
        Ok(())
    }
}
