//! Blocking wait for the next start of a given kind.
//!
//! A waiter first checks whether the most recent live start already has the
//! requested kind. Otherwise it registers a one-shot listener that deposits
//! the next matching event into a private [`WaitSlot`] and blocks on it,
//! re-checking its deadline at least every `recheck` interval.

use std::sync::{Arc, Condvar, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::event::{EventKind, EventRef};
use crate::history::HistoryStore;

use super::registry::ListenerRegistry;

/// Single-slot rendezvous between a dispatch worker and one waiter.
///
/// The first deposit wins; later deposits are ignored.
#[derive(Debug, Default)]
pub(crate) struct WaitSlot {
    value: Mutex<Option<EventRef>>,
    ready: Condvar,
}

impl WaitSlot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn deposit(&self, event: &EventRef) {
        let mut value = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        if value.is_none() {
            *value = Some(Arc::clone(event));
            self.ready.notify_all();
        }
    }

    /// Blocks until a deposit arrives or `deadline` passes.
    ///
    /// `None` as deadline waits without bound. Never returns `None` before
    /// the deadline.
    pub(crate) fn wait_until(&self, deadline: Option<Instant>, recheck: Duration) -> Option<EventRef> {
        let mut value = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(event) = value.as_ref() {
                return Some(Arc::clone(event));
            }

            let step = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return None;
                    }
                    (deadline - now).min(recheck)
                }
                None => recheck,
            };

            value = self
                .ready
                .wait_timeout(value, step)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
    }
}

/// The live most-recent event, if it has the requested kind.
///
/// Uses the same pruned, locked view as `most_recently_started`, so a
/// finished event at the tail never satisfies a wait.
fn already_started(history: &HistoryStore, kind: &EventKind) -> Option<EventRef> {
    history.most_recent().filter(|event| event.kind() == *kind)
}

/// Waits up to `timeout` for an event of `kind`.
pub(crate) fn wait_for(
    history: &HistoryStore,
    listeners: &ListenerRegistry,
    kind: &EventKind,
    timeout: Duration,
    recheck: Duration,
) -> Option<EventRef> {
    let deadline = Instant::now().checked_add(timeout);

    if let Some(event) = already_started(history, kind) {
        return Some(event);
    }
    if timeout.is_zero() {
        return None;
    }

    let slot = Arc::new(WaitSlot::new());
    let sink: Weak<WaitSlot> = Arc::downgrade(&slot);
    listeners.register(
        kind.clone(),
        Arc::new(move |event: &EventRef| {
            if let Some(slot) = sink.upgrade() {
                slot.deposit(event);
            }
        }),
    );

    // A start recorded between the first check and the registration above
    // was dispatched before the listener existed.
    if let Some(event) = already_started(history, kind) {
        return Some(event);
    }

    let timeout_ms = timeout.as_millis().min(u128::from(u64::MAX)) as u64;
    debug!(kind = %kind, timeout_ms, "waiting for start");
    let found = slot.wait_until(deadline, recheck);
    if found.is_none() {
        debug!(kind = %kind, "wait timed out");
    }
    found
}
