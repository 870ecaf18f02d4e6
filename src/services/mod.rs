//! Business logic services.
//!
//! Services orchestrate the stores and provide the content operations.

mod collection;
mod content;
mod geolocation;
mod migration;
mod profile;
mod visits;

pub use collection::CollectionRepository;
pub use content::ContentService;
pub use geolocation::{GeoLocator, HttpGeoLocator, UNKNOWN};
pub use migration::{LegacyMigrationRunner, MigrationOutcome, MigrationStats};
pub use profile::ProfileRepository;
pub use visits::{SessionGuard, SessionState, VisitOutcome, VisitRecorder};
