//! Location store: durable, append-only record of GPS fixes
//!
//! Fixes are indexed by bus and by trip and ordered by timestamp for
//! reads. The store is append-only; nothing updates or deletes a fix,
//! and duplicate submissions create duplicate rows (no dedup key).
//!
//! When opened with a journal path, every append is written durably
//! before it becomes visible in memory — an append that fails at the
//! journal leaves no trace.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::debug;
use types::ids::{BusId, FixId, TripId};
use types::location::LocationFix;

use crate::journal::{FixJournal, JournalError};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),
}

/// An unpersisted fix, as assembled by the ingestion service.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFix {
    pub bus: BusId,
    pub trip: Option<TripId>,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64,
    pub heading: f64,
    pub timestamp: DateTime<Utc>,
}

struct StoreInner {
    fixes: Vec<LocationFix>,
    by_bus: HashMap<BusId, Vec<usize>>,
    by_trip: HashMap<TripId, Vec<usize>>,
    journal: Option<FixJournal>,
}

impl StoreInner {
    fn index(&mut self, fix: LocationFix) {
        let idx = self.fixes.len();
        self.by_bus.entry(fix.bus).or_default().push(idx);
        if let Some(trip) = fix.trip {
            self.by_trip.entry(trip).or_default().push(idx);
        }
        self.fixes.push(fix);
    }
}

/// Append-only fix store with per-bus and per-trip indexes.
pub struct LocationStore {
    inner: RwLock<StoreInner>,
}

impl LocationStore {
    /// Purely in-memory store (tests, ephemeral deployments).
    pub fn in_memory() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                fixes: Vec::new(),
                by_bus: HashMap::new(),
                by_trip: HashMap::new(),
                journal: None,
            }),
        }
    }

    /// Durable store backed by an append-only journal, replayed on open.
    pub fn open(journal_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let (journal, recovered) = FixJournal::open(journal_path)?;
        let store = Self::in_memory();
        {
            let mut inner = store.write();
            for fix in recovered {
                inner.index(fix);
            }
            inner.journal = Some(journal);
        }
        Ok(store)
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one fix. Journal write happens first; a journal failure
    /// leaves the store unchanged.
    pub fn append(&self, new: NewFix) -> Result<LocationFix, StoreError> {
        let fix = LocationFix {
            id: FixId::new(),
            bus: new.bus,
            trip: new.trip,
            latitude: new.latitude,
            longitude: new.longitude,
            speed: new.speed,
            heading: new.heading,
            timestamp: new.timestamp,
        };

        let mut inner = self.write();
        if let Some(journal) = inner.journal.as_mut() {
            journal.append(&fix)?;
        }
        inner.index(fix.clone());
        debug!(fix_id = %fix.id, bus_id = %fix.bus, "fix appended");
        Ok(fix)
    }

    /// The most recent fix for a bus, by timestamp.
    pub fn latest_by_bus(&self, bus: BusId) -> Option<LocationFix> {
        let inner = self.read();
        let indexes = inner.by_bus.get(&bus)?;
        indexes
            .iter()
            .map(|&i| &inner.fixes[i])
            // Later append wins a timestamp tie.
            .max_by_key(|fix| (fix.timestamp, fix.id))
            .cloned()
    }

    /// Fix history for a bus, newest first, optionally bounded by a time
    /// window, truncated to `limit`.
    pub fn history(
        &self,
        bus: BusId,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Vec<LocationFix> {
        let inner = self.read();
        let Some(indexes) = inner.by_bus.get(&bus) else {
            return Vec::new();
        };

        let mut fixes: Vec<LocationFix> = indexes
            .iter()
            .map(|&i| &inner.fixes[i])
            .filter(|fix| start.is_none_or(|s| fix.timestamp >= s))
            .filter(|fix| end.is_none_or(|e| fix.timestamp <= e))
            .cloned()
            .collect();

        fixes.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        fixes.truncate(limit);
        fixes
    }

    /// The most recent fix per bus, restricted to fixes newer than
    /// `freshness` ago, ordered by bus id.
    ///
    /// Explicit query plan for the "active dashboard" aggregation: filter
    /// by bus set and window, then take the max-timestamp fix per bus.
    pub fn latest_per_bus(&self, buses: &[BusId], freshness: Duration) -> Vec<LocationFix> {
        let cutoff = Utc::now() - freshness;
        let inner = self.read();

        let mut latest: Vec<LocationFix> = Vec::new();
        for bus in buses {
            let Some(indexes) = inner.by_bus.get(bus) else {
                continue;
            };
            if let Some(fix) = indexes
                .iter()
                .map(|&i| &inner.fixes[i])
                .filter(|fix| fix.timestamp >= cutoff)
                .max_by_key(|fix| (fix.timestamp, fix.id))
            {
                latest.push(fix.clone());
            }
        }

        latest.sort_by_key(|fix| fix.bus);
        latest
    }

    /// Fix history for a trip, newest first.
    pub fn history_by_trip(&self, trip: TripId, limit: usize) -> Vec<LocationFix> {
        let inner = self.read();
        let Some(indexes) = inner.by_trip.get(&trip) else {
            return Vec::new();
        };
        let mut fixes: Vec<LocationFix> =
            indexes.iter().map(|&i| inner.fixes[i].clone()).collect();
        fixes.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        fixes.truncate(limit);
        fixes
    }

    pub fn len(&self) -> usize {
        self.read().fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().fixes.is_empty()
    }
}
