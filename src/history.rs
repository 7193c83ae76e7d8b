//! Started-event history.
//!
//! The history is an ordered log of [`StartedRecord`]s in the order the
//! producer observed them. Finished events are pruned lazily whenever a
//! snapshot is taken.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::event::{same_instance, EventRef};

/// A history entry: an event and the time its start was observed.
#[derive(Debug, Clone)]
pub struct StartedRecord {
    event: EventRef,
    started_at: DateTime<Utc>,
}

impl StartedRecord {
    /// Creates a record for an event observed at `started_at`.
    #[must_use]
    pub fn new(event: EventRef, started_at: DateTime<Utc>) -> Self {
        Self { event, started_at }
    }

    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn now(event: EventRef) -> Self {
        Self::new(event, Utc::now())
    }

    /// The recorded event.
    #[must_use]
    pub fn event(&self) -> &EventRef {
        &self.event
    }

    /// When the start was observed.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Start time in milliseconds since the Unix epoch.
    #[must_use]
    pub fn start_time_millis(&self) -> i64 {
        self.started_at.timestamp_millis()
    }
}

/// Thread-safe ordered log of started events.
///
/// Every operation takes the same mutex. A poisoned lock is recovered: the
/// log is a plain vector and a panic elsewhere cannot leave it half-updated.
#[derive(Debug, Default)]
pub struct HistoryStore {
    records: Mutex<Vec<StartedRecord>>,
}

impl HistoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StartedRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a record to the tail.
    ///
    /// Returns `false` without changing anything if the tail already refers
    /// to the same event instance.
    pub fn append(&self, record: StartedRecord) -> bool {
        let mut records = self.lock();
        if records
            .last()
            .is_some_and(|tail| same_instance(tail.event(), record.event()))
        {
            return false;
        }
        records.push(record);
        true
    }

    /// Prunes finished events and returns a copy of what remains, in order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<StartedRecord> {
        let mut records = self.lock();
        records.retain(|r| !r.event().is_finished());
        records.clone()
    }

    /// The most recently started event that has not finished.
    #[must_use]
    pub fn most_recent(&self) -> Option<EventRef> {
        let mut records = self.lock();
        records.retain(|r| !r.event().is_finished());
        records.last().map(|r| r.event().clone())
    }

    /// Number of stored records, finished ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Removes every record.
    pub fn clear(&self) {
        self.lock().clear();
    }
}
