//! Legacy local stores.
//!
//! Records kept here predate the remote store and are only read once, by
//! the migration runner. Two implementations are provided: a process-local
//! map and a directory of files (`{base_path}/{key}.json`).

use super::traits::LocalStore;
use crate::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// [`LocalStore`] held in process memory.
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryLocalStore {
    /// Creates an empty local store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.items.lock().map_err(|_| Error::OperationFailed {
            operation: "local_store_lock".to_string(),
            cause: "lock poisoned".to_string(),
        })
    }
}

impl LocalStore for MemoryLocalStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// [`LocalStore`] that keeps one file per key in a directory.
#[derive(Debug)]
pub struct FileLocalStore {
    /// Directory holding the key files.
    base_path: PathBuf,
}

impl FileLocalStore {
    /// Creates a file-backed local store rooted at `base_path`.
    ///
    /// The directory is created lazily on first write.
    #[must_use]
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Returns the default directory (`{data_dir}/folio/legacy`).
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "folio").map(|d| d.data_dir().join("legacy"))
    }

    /// Returns the base path.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn item_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(Error::InvalidInput(format!("invalid local store key '{key}'")));
        }
        Ok(self.base_path.join(format!("{key}.json")))
    }
}

impl LocalStore for FileLocalStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.item_path(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::OperationFailed {
                operation: "read_local_item".to_string(),
                cause: format!("{}: {e}", path.display()),
            }),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.item_path(key)?;
        fs::create_dir_all(&self.base_path).map_err(|e| Error::OperationFailed {
            operation: "create_local_dir".to_string(),
            cause: e.to_string(),
        })?;
        fs::write(&path, value).map_err(|e| Error::OperationFailed {
            operation: "write_local_item".to_string(),
            cause: format!("{}: {e}", path.display()),
        })
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let path = self.item_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::OperationFailed {
                operation: "remove_local_item".to_string(),
                cause: format!("{}: {e}", path.display()),
            }),
        }
    }
}
