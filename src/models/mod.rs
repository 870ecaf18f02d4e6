//! Data models for folio.
//!
//! Typed views of the records kept in the remote store.

mod experience;
mod portfolio;
mod profile;
mod record;
mod visit;

pub use experience::{WorkExperience, WorkExperiencePatch};
pub use portfolio::{PortfolioItem, PortfolioItemPatch, ProjectType, sample_items};
pub use profile::Profile;
pub use record::{
    CollectionEntry, Record, RecordId, format_timestamp, normalize_created_at,
    timestamp_from_millis,
};
pub use visit::{GeoLocation, VisitContext, VisitLocation, VisitLogEntry};
