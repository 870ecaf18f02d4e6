//! # Folio Sync
//!
//! Remote collection synchronization for portfolio site content.
//!
//! Content lives in a hosted hierarchical key-value store as flat,
//! unordered subtrees keyed by generated ids. This crate turns those
//! subtrees into ordered, typed collections and keeps the few operations
//! with real invariants honest:
//!
//! - Generic collection repositories (portfolio items, work experiences)
//!   with store-generated ids and normalized creation timestamps
//! - A singleton profile record at a fixed path
//! - A one-shot migration of legacy local records into the remote store
//! - A visit log plus an atomically incremented visit counter, recorded at
//!   most once per session
//!
//! ## Example
//!
//! ```rust,ignore
//! use folio_sync::services::ContentService;
//! use folio_sync::models::{PortfolioItem, ProjectType};
//!
//! let service = ContentService::new(store, local, locator, &config);
//! let created = service
//!     .create_portfolio_item(PortfolioItem::new("X", "d", ProjectType::Web))
//!     .await?;
//! let items = service.list_portfolio_items().await?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

#[cfg(test)]
mod test_http;

// Re-exports for convenience
pub use config::FolioConfig;
pub use models::{
    PortfolioItem, PortfolioItemPatch, Profile, ProjectType, Record, RecordId, VisitLogEntry,
    WorkExperience, WorkExperiencePatch,
};
pub use services::{
    CollectionRepository, ContentService, LegacyMigrationRunner, ProfileRepository, VisitRecorder,
};
pub use storage::{LocalStore, MemoryStore, RemoteStore, RestStore};

/// Error type for folio operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `StoreUnavailable` | A read against the remote store fails (transport, non-success status) |
/// | `WriteFailed` | A mutation was attempted but not confirmed by the store |
/// | `RecordNotFound` | An update targets an id that does not exist (strict repositories) |
/// | `InvalidRecord` | A stored value does not have the shape its collection requires |
/// | `InvalidInput` | Caller-supplied data is rejected before reaching the store |
/// | `GeolocationFailed` | The visitor lookup failed; swallowed by the visit recorder |
/// | `OperationFailed` | Configuration, local storage, or logging setup fails |
#[derive(Debug, ThisError)]
pub enum Error {
    /// The remote store could not be read.
    ///
    /// Callers must treat this as "no data available now", never as an
    /// empty collection.
    #[error("store unavailable during '{operation}': {cause}")]
    StoreUnavailable {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A mutation was not confirmed by the remote store.
    #[error("write '{operation}' failed: {cause}")]
    WriteFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The target record does not exist.
    #[error("record '{id}' not found in {collection}")]
    RecordNotFound {
        /// Collection path.
        collection: String,
        /// Record id.
        id: String,
    },

    /// A stored value failed validation.
    #[error("invalid record '{id}' in {collection}: {reason}")]
    InvalidRecord {
        /// Collection path.
        collection: String,
        /// Record id (or the fixed path for singletons).
        id: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The geolocation lookup failed.
    #[error("geolocation lookup failed: {0}")]
    GeolocationFailed(String),

    /// A non-store operation failed.
    ///
    /// Raised when:
    /// - Configuration files cannot be read or parsed
    /// - The legacy local store cannot be accessed
    /// - Logging has already been initialized
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Returns true for failures caused by the remote store itself.
    #[must_use]
    pub const fn is_store_failure(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. } | Self::WriteFailed { .. })
    }
}

/// Result type alias for folio operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in milliseconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
///
/// # Examples
///
/// ```rust
/// use folio_sync::current_timestamp_millis;
///
/// let ts = current_timestamp_millis();
/// assert!(ts > 0);
/// ```
#[must_use]
pub fn current_timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis().max(0)
}
