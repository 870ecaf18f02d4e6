//! Shared test doubles: a fault-injecting store wrapper and fixed locators.

#![allow(dead_code)]

use folio_sync::models::GeoLocation;
use folio_sync::services::GeoLocator;
use folio_sync::storage::{Clock, MemoryStore, RemoteStore};
use folio_sync::{Error, Result};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

/// Clock that advances one second per server timestamp it resolves.
pub fn ticking_clock(start: i64) -> Clock {
    let now = Arc::new(AtomicI64::new(start));
    Arc::new(move || now.fetch_add(1_000, Ordering::SeqCst))
}

/// [`RemoteStore`] wrapper that can go offline or start rejecting writes.
#[derive(Debug)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    offline: AtomicBool,
    /// Writes allowed before every further write fails.
    write_budget: AtomicI64,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
}

impl FaultyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            offline: AtomicBool::new(false),
            write_budget: AtomicI64::new(i64::MAX),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Lets the next `n` writes through, then fails every write.
    pub fn fail_writes_after(&self, n: i64) {
        self.write_budget.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst) + self.writes.load(Ordering::SeqCst)
    }

    fn check_read(&self) -> Result<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::StoreUnavailable {
                operation: "faulty_get".to_string(),
                cause: "offline".to_string(),
            });
        }
        Ok(())
    }

    fn check_write(&self) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let over_budget = self.write_budget.fetch_sub(1, Ordering::SeqCst) <= 0;
        if self.offline.load(Ordering::SeqCst) || over_budget {
            return Err(Error::WriteFailed {
                operation: "faulty_write".to_string(),
                cause: "rejected".to_string(),
            });
        }
        Ok(())
    }
}

impl RemoteStore for FaultyStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        self.check_read()?;
        self.inner.get(path).await
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        self.check_write()?;
        self.inner.set(path, value).await
    }

    async fn update(&self, path: &str, patch: Map<String, Value>) -> Result<()> {
        self.check_write()?;
        self.inner.update(path, patch).await
    }

    async fn remove(&self, path: &str) -> Result<()> {
        self.check_write()?;
        self.inner.remove(path).await
    }

    fn generate_key(&self) -> String {
        self.inner.generate_key()
    }

    async fn transaction<F>(&self, path: &str, update: F) -> Result<Value>
    where
        F: Fn(Option<&Value>) -> Value + Send + Sync,
    {
        self.check_write()?;
        self.inner.transaction(path, update).await
    }
}

/// Sample lookup result.
pub fn lisbon() -> GeoLocation {
    GeoLocation {
        ip: "203.0.113.7".to_string(),
        city: "Lisbon".to_string(),
        region: "Lisbon".to_string(),
        country: "Portugal".to_string(),
        latitude: 38.72,
        longitude: -9.14,
        timezone: Some("Europe/Lisbon".to_string()),
    }
}

/// [`GeoLocator`] that always answers, counting lookups.
#[derive(Debug, Default)]
pub struct FixedGeoLocator {
    pub lookups: AtomicUsize,
}

impl GeoLocator for FixedGeoLocator {
    async fn locate(&self) -> Result<GeoLocation> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(lisbon())
    }
}

/// [`GeoLocator`] that fails a set number of times before answering.
#[derive(Debug, Default)]
pub struct FlakyGeoLocator {
    failures_left: AtomicUsize,
}

impl FlakyGeoLocator {
    pub fn failing(times: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(times),
        }
    }
}

impl GeoLocator for FlakyGeoLocator {
    async fn locate(&self) -> Result<GeoLocation> {
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            Err(Error::GeolocationFailed("HTTP 503 Service Unavailable".to_string()))
        } else {
            Ok(lisbon())
        }
    }
}
