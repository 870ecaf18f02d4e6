//! Content service.
//!
//! The single entry point the presentation layer talks to. Wires the
//! repositories, the migration runner, and the visit recorder to one
//! remote store using the paths from [`FolioConfig`].

use std::sync::Arc;

use crate::Result;
use crate::config::FolioConfig;
use crate::models::{
    PortfolioItem, PortfolioItemPatch, Profile, Record, RecordId, VisitContext, VisitLogEntry,
    WorkExperience, WorkExperiencePatch,
};
use crate::services::{
    CollectionRepository, GeoLocator, LegacyMigrationRunner, MigrationOutcome, ProfileRepository,
    SessionGuard, VisitOutcome, VisitRecorder,
};
use crate::storage::{LocalStore, RemoteStore};

/// Facade over every content operation.
pub struct ContentService<S, L, G>
where
    S: RemoteStore,
    L: LocalStore,
    G: GeoLocator,
{
    portfolio: Arc<CollectionRepository<S, PortfolioItem>>,
    experiences: CollectionRepository<S, WorkExperience>,
    profile: ProfileRepository<S>,
    migration: LegacyMigrationRunner<S, L, PortfolioItem>,
    visits: VisitRecorder<S, G>,
}

impl<S, L, G> ContentService<S, L, G>
where
    S: RemoteStore,
    L: LocalStore,
    G: GeoLocator,
{
    /// Creates the service.
    ///
    /// # Arguments
    ///
    /// * `store` - The remote store holding every collection
    /// * `local` - The legacy local store read by the migration
    /// * `locator` - Geolocation lookup for visit recording
    /// * `config` - Store paths and the legacy key
    pub fn new(store: Arc<S>, local: Arc<L>, locator: Arc<G>, config: &FolioConfig) -> Self {
        let paths = &config.paths;
        let portfolio = Arc::new(CollectionRepository::new(
            Arc::clone(&store),
            paths.portfolio.clone(),
        ));

        Self {
            experiences: CollectionRepository::new(Arc::clone(&store), paths.experience.clone()),
            profile: ProfileRepository::new(Arc::clone(&store), paths.profile.clone()),
            migration: LegacyMigrationRunner::new(
                Arc::clone(&portfolio),
                local,
                config.legacy.portfolio_key.clone(),
            ),
            visits: VisitRecorder::new(
                store,
                locator,
                paths.visit_counter.clone(),
                paths.visit_logs.clone(),
            ),
            portfolio,
        }
    }

    /// Uses an externally owned session guard for visit recording.
    #[must_use]
    pub fn with_session_guard(mut self, guard: Arc<SessionGuard>) -> Self {
        self.visits = self.visits.with_session_guard(guard);
        self
    }

    /// Lists portfolio items, newest first. Seeds an empty collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn list_portfolio_items(&self) -> Result<Vec<Record<PortfolioItem>>> {
        self.portfolio.list().await
    }

    /// Migrates legacy data (best effort), then lists portfolio items.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read. Migration problems
    /// are only logged.
    pub async fn load_portfolio(&self) -> Result<Vec<Record<PortfolioItem>>> {
        self.migration.migrate().await;
        self.portfolio.list().await
    }

    /// Creates a portfolio item.
    ///
    /// # Errors
    ///
    /// Returns an error if the item is invalid or the write fails.
    pub async fn create_portfolio_item(
        &self,
        item: PortfolioItem,
    ) -> Result<Record<PortfolioItem>> {
        self.portfolio.create(item).await
    }

    /// Patches a portfolio item.
    ///
    /// # Errors
    ///
    /// Returns an error if the item does not exist or the write fails.
    pub async fn update_portfolio_item(
        &self,
        id: &RecordId,
        patch: &PortfolioItemPatch,
    ) -> Result<()> {
        self.portfolio.update(id, patch).await
    }

    /// Deletes a portfolio item.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn delete_portfolio_item(&self, id: &RecordId) -> Result<()> {
        self.portfolio.delete(id).await
    }

    /// Lists work experiences, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn list_work_experiences(&self) -> Result<Vec<Record<WorkExperience>>> {
        self.experiences.list().await
    }

    /// Creates a work experience.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is invalid or the write fails.
    pub async fn create_work_experience(
        &self,
        experience: WorkExperience,
    ) -> Result<Record<WorkExperience>> {
        self.experiences.create(experience).await
    }

    /// Patches a work experience.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry does not exist or the write fails.
    pub async fn update_work_experience(
        &self,
        id: &RecordId,
        patch: &WorkExperiencePatch,
    ) -> Result<()> {
        self.experiences.update(id, patch).await
    }

    /// Deletes a work experience.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn delete_work_experience(&self, id: &RecordId) -> Result<()> {
        self.experiences.delete(id).await
    }

    /// Reads the profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn get_profile(&self) -> Result<Option<Profile>> {
        self.profile.get().await
    }

    /// Replaces the profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn save_profile(&self, profile: &Profile) -> Result<()> {
        self.profile.save(profile).await
    }

    /// Moves legacy local portfolio items into the store, once.
    pub async fn migrate_legacy_data(&self) -> MigrationOutcome {
        self.migration.migrate().await
    }

    /// Records this session's visit.
    pub async fn record_visit(&self, context: &VisitContext) -> VisitOutcome {
        self.visits.record_visit(context).await
    }

    /// Reads the aggregate visit count.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn total_visits(&self) -> Result<u64> {
        self.visits.total_visits().await
    }

    /// Reads the visit log, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn visit_log(&self) -> Result<Vec<Record<VisitLogEntry>>> {
        self.visits.visit_log().await
    }
}
