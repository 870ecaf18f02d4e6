//! Visit counter and log.
//!
//! A visit is recorded at most once per session:
//!
//! ```text
//! claim guard ─► geolocate ─► counter +1 (transaction) ─► push log ─► mark recorded
//!      │              │                 │                      │
//!      └─ taken: skip └────── any failure: release guard, swallow error
//! ```
//!
//! The counter and the log entry are two independent writes. Only the
//! counter needs atomicity, and it gets it from the store's transaction
//! primitive; a plain read-then-write would lose increments under
//! concurrent visitors.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::models::{
    Record, RecordId, VisitContext, VisitLogEntry, format_timestamp, timestamp_from_millis,
};
use crate::services::GeoLocator;
use crate::storage::{RemoteStore, server_timestamp};
use crate::{Error, Result};

const ABSENT: u8 = 0;
const IN_FLIGHT: u8 = 1;
const RECORDED: u8 = 2;

/// Lifecycle of the per-session visit flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No visit recorded yet (session start).
    Absent,
    /// A recording attempt is running.
    InFlight,
    /// A visit was recorded; stays set until the session ends.
    Recorded,
}

/// Per-session "visit recorded" flag.
///
/// Starts [`SessionState::Absent`], is set exactly once by a successful
/// recording, and is never cleared. Provides no deduplication across
/// sessions or devices.
#[derive(Debug, Default)]
pub struct SessionGuard {
    state: AtomicU8,
}

impl SessionGuard {
    /// Creates a guard for a new session.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(ABSENT),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        match self.state.load(Ordering::Acquire) {
            IN_FLIGHT => SessionState::InFlight,
            RECORDED => SessionState::Recorded,
            _ => SessionState::Absent,
        }
    }

    /// Returns true once a visit was recorded in this session.
    #[must_use]
    pub fn is_recorded(&self) -> bool {
        self.state() == SessionState::Recorded
    }

    /// Takes the guard for one attempt. Dropping the claim without
    /// committing returns the guard to absent.
    fn claim(&self) -> Option<Claim<'_>> {
        self.state
            .compare_exchange(ABSENT, IN_FLIGHT, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Claim {
                guard: self,
                committed: false,
            })
    }
}

struct Claim<'a> {
    guard: &'a SessionGuard,
    committed: bool,
}

impl Claim<'_> {
    fn commit(mut self) {
        self.guard.state.store(RECORDED, Ordering::Release);
        self.committed = true;
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if !self.committed {
            let _ = self.guard.state.compare_exchange(
                IN_FLIGHT,
                ABSENT,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }
    }
}

/// What a `record_visit` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitOutcome {
    /// The session already recorded its visit. No network activity.
    AlreadyRecorded,
    /// Another call in this session is recording right now.
    InProgress,
    /// The visit was counted and logged.
    Recorded {
        /// Counter value committed by this visit.
        total: u64,
    },
    /// The attempt failed; the session may try again.
    Abandoned(String),
}

/// Records visits and reads visit statistics.
pub struct VisitRecorder<S: RemoteStore, G: GeoLocator> {
    store: Arc<S>,
    locator: Arc<G>,
    counter_path: String,
    log_path: String,
    guard: Arc<SessionGuard>,
}

impl<S: RemoteStore, G: GeoLocator> VisitRecorder<S, G> {
    /// Creates a recorder with a fresh session guard.
    pub fn new(
        store: Arc<S>,
        locator: Arc<G>,
        counter_path: impl Into<String>,
        log_path: impl Into<String>,
    ) -> Self {
        Self {
            store,
            locator,
            counter_path: counter_path.into(),
            log_path: log_path.into(),
            guard: Arc::new(SessionGuard::new()),
        }
    }

    /// Uses an externally owned session guard.
    #[must_use]
    pub fn with_session_guard(mut self, guard: Arc<SessionGuard>) -> Self {
        self.guard = guard;
        self
    }

    /// Returns the session guard.
    #[must_use]
    pub fn session_guard(&self) -> &Arc<SessionGuard> {
        &self.guard
    }

    /// Records one visit for this session.
    ///
    /// Never fails: geolocation and store errors are logged and reported as
    /// [`VisitOutcome::Abandoned`], leaving the guard unset.
    pub async fn record_visit(&self, context: &VisitContext) -> VisitOutcome {
        let Some(claim) = self.guard.claim() else {
            return if self.guard.is_recorded() {
                VisitOutcome::AlreadyRecorded
            } else {
                VisitOutcome::InProgress
            };
        };

        match self.try_record(context).await {
            Ok(total) => {
                claim.commit();
                metrics::counter!("folio_visits_recorded_total").increment(1);
                tracing::info!(total, path = %context.path, "Recorded visit");
                VisitOutcome::Recorded { total }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Visit not recorded");
                VisitOutcome::Abandoned(e.to_string())
            },
        }
    }

    async fn try_record(&self, context: &VisitContext) -> Result<u64> {
        let geo = self.locator.locate().await?;
        let total = self.increment_counter().await?;

        let entry = json!({
            "ip": geo.ip,
            "location": geo.location(),
            "userAgent": context.user_agent,
            "timestamp": server_timestamp(),
            "path": context.path,
        });
        let key = self.store.push(&self.log_path, entry).await?;
        tracing::debug!(key = %key, "Appended visit log entry");

        Ok(total)
    }

    /// Atomically adds one to the visit counter and returns the new value.
    ///
    /// An absent or non-numeric counter counts as zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be committed.
    pub async fn increment_counter(&self) -> Result<u64> {
        let committed = self
            .store
            .transaction(&self.counter_path, |current| {
                Value::from(current.map_or(0, counter_value).saturating_add(1))
            })
            .await?;
        Ok(counter_value(&committed))
    }

    /// Reads the aggregate visit count. An absent counter is zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the read fails.
    pub async fn total_visits(&self) -> Result<u64> {
        Ok(self
            .store
            .get(&self.counter_path)
            .await?
            .as_ref()
            .map_or(0, counter_value))
    }

    /// Reads the visit log, newest first. Malformed entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the read fails.
    pub async fn visit_log(&self) -> Result<Vec<Record<VisitLogEntry>>> {
        let Some(Value::Object(children)) = self.store.get(&self.log_path).await? else {
            return Ok(Vec::new());
        };

        let mut entries: Vec<(Record<VisitLogEntry>, DateTime<Utc>)> = children
            .into_iter()
            .filter_map(|(key, value)| match log_entry(&key, value) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(id = %key, error = %e, "Skipping invalid visit log entry");
                    metrics::counter!("folio_records_skipped_total", "collection" => "visit log")
                        .increment(1);
                    None
                },
            })
            .collect();

        entries.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(entries.into_iter().map(|(record, _)| record).collect())
    }
}

fn log_entry(key: &str, value: Value) -> Result<(Record<VisitLogEntry>, DateTime<Utc>)> {
    let entry: VisitLogEntry =
        serde_json::from_value(value).map_err(|e| Error::InvalidRecord {
            collection: "visit log".to_string(),
            id: key.to_string(),
            reason: e.to_string(),
        })?;
    let time = timestamp_from_millis(entry.timestamp).ok_or_else(|| Error::InvalidRecord {
        collection: "visit log".to_string(),
        id: key.to_string(),
        reason: format!("timestamp {} out of range", entry.timestamp),
    })?;

    Ok((
        Record {
            id: RecordId::new(key),
            created_at: format_timestamp(time),
            fields: entry,
        },
        time,
    ))
}

/// Reads a stored counter. Negative, fractional-negative, and non-numeric
/// values count as zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn counter_value(value: &Value) -> u64 {
    value.as_u64().unwrap_or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f > 0.0)
            .map_or(0, |f| f as u64)
    })
}
