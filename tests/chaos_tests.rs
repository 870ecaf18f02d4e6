//! Chaos testing for concurrent access.
//!
//! Drives the store from many tasks at once on a multi-threaded runtime:
//! - Independent sessions incrementing the shared visit counter
//! - Concurrent calls sharing one session guard
//! - Concurrent record creation

// Chaos tests use expect/unwrap/panic for simplicity - panics are acceptable in tests
// Needless collect is sometimes needed for clearer concurrent test structure
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic, clippy::needless_collect)]

mod support;

use folio_sync::models::{VisitContext, WorkExperience};
use folio_sync::services::{CollectionRepository, SessionGuard, VisitOutcome, VisitRecorder};
use folio_sync::storage::MemoryStore;
use std::collections::HashSet;
use std::sync::Arc;
use support::FixedGeoLocator;

const COUNTER: &str = "analytics/total_visitors";
const LOGS: &str = "analytics/visit_logs";

/// Test: every independent session adds exactly one to the counter.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sessions_lose_no_increments() {
    let store = Arc::new(MemoryStore::new());
    let locator = Arc::new(FixedGeoLocator::default());
    let sessions = 64;

    let handles: Vec<_> = (0..sessions)
        .map(|i| {
            let recorder =
                VisitRecorder::new(Arc::clone(&store), Arc::clone(&locator), COUNTER, LOGS);
            tokio::spawn(async move {
                let context = VisitContext::new("chaos-agent", format!("/page/{i}"));
                recorder.record_visit(&context).await
            })
        })
        .collect();

    let mut totals = Vec::with_capacity(sessions);
    for handle in handles {
        match handle.await.unwrap() {
            VisitOutcome::Recorded { total } => totals.push(total),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    // Each committed transaction observed a distinct counter value.
    totals.sort_unstable();
    let expected: Vec<u64> = (1..=64).collect();
    assert_eq!(totals, expected);

    let reader = VisitRecorder::new(Arc::clone(&store), Arc::clone(&locator), COUNTER, LOGS);
    assert_eq!(reader.total_visits().await.unwrap(), 64);
    assert_eq!(reader.visit_log().await.unwrap().len(), 64);
}

/// Test: one session hammered from many tasks records a single visit.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shared_guard_records_once_under_contention() {
    let store = Arc::new(MemoryStore::new());
    let locator = Arc::new(FixedGeoLocator::default());
    let guard = Arc::new(SessionGuard::new());

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let recorder =
                VisitRecorder::new(Arc::clone(&store), Arc::clone(&locator), COUNTER, LOGS)
                    .with_session_guard(Arc::clone(&guard));
            tokio::spawn(async move {
                recorder
                    .record_visit(&VisitContext::new("chaos-agent", "/"))
                    .await
            })
        })
        .collect();

    let mut recorded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            VisitOutcome::Recorded { .. } => recorded += 1,
            VisitOutcome::InProgress | VisitOutcome::AlreadyRecorded => {},
            VisitOutcome::Abandoned(reason) => panic!("visit abandoned: {reason}"),
        }
    }

    assert_eq!(recorded, 1);
    assert!(guard.is_recorded());
    let reader = VisitRecorder::new(Arc::clone(&store), Arc::clone(&locator), COUNTER, LOGS);
    assert_eq!(reader.total_visits().await.unwrap(), 1);
}

/// Test: concurrent creates never collide on an id.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_get_unique_ids() {
    let store = Arc::new(MemoryStore::new());
    let repo: Arc<CollectionRepository<MemoryStore, WorkExperience>> =
        Arc::new(CollectionRepository::new(store, "work_experiences"));

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move {
                repo.create(WorkExperience::new(format!("Company {i}"), "Dev", "", ""))
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        let record = handle.await.unwrap();
        assert!(ids.insert(record.id));
    }

    let listed = repo.list().await.unwrap();
    assert_eq!(listed.len(), 32);
    assert!(listed.iter().all(|r| ids.contains(&r.id)));
}
