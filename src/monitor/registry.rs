//! Listener registry.
//!
//! Maps an event kind to the callbacks interested in starts of that kind.
//! Registrations accumulate for the lifetime of the monitor and are only
//! removed by a full `clear()`.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::event::{EventKind, EventRef};

/// Callback invoked with a newly started event.
pub type Listener = Arc<dyn Fn(&EventRef) + Send + Sync>;

/// Unique identifier for a listener registration.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerId(Uuid);

impl ListenerId {
    /// Create a new random listener id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A callback registered for one event kind.
#[derive(Clone)]
pub struct ListenerRegistration {
    id: ListenerId,
    kind: EventKind,
    callback: Listener,
}

impl ListenerRegistration {
    /// The registration id.
    #[must_use]
    pub const fn id(&self) -> ListenerId {
        self.id
    }

    /// The kind this listener is registered for.
    #[must_use]
    pub const fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Invokes the callback.
    pub fn notify(&self, event: &EventRef) {
        (self.callback)(event);
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Thread-safe map from event kind to ordered listeners.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    by_kind: Mutex<HashMap<EventKind, Vec<ListenerRegistration>>>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<EventKind, Vec<ListenerRegistration>>> {
        self.by_kind.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a listener for `kind`. Listeners run in registration order.
    pub fn register(&self, kind: EventKind, callback: Listener) -> ListenerId {
        let id = ListenerId::new();
        let registration = ListenerRegistration {
            id,
            kind: kind.clone(),
            callback,
        };
        self.lock().entry(kind).or_default().push(registration);
        id
    }

    /// Returns the listeners for `kind`, creating an empty entry if absent.
    #[must_use]
    pub fn lookup(&self, kind: &EventKind) -> Vec<ListenerRegistration> {
        self.lock().entry(kind.clone()).or_default().clone()
    }

    /// Number of listeners registered for `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: &EventKind) -> usize {
        self.lock().get(kind).map_or(0, Vec::len)
    }

    /// Removes every registration.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Invokes every listener registered for the event's kind.
    ///
    /// The registry lock is held for the whole call, so listeners must not
    /// block indefinitely or touch the registry. A panicking listener is
    /// logged and the remaining listeners still run.
    pub fn dispatch(&self, event: &EventRef) -> usize {
        let kind = event.kind();
        let mut by_kind = self.lock();
        let listeners = by_kind.entry(kind).or_default();

        for listener in listeners.iter() {
            if catch_unwind(AssertUnwindSafe(|| listener.notify(event))).is_err() {
                error!(
                    listener = %listener.id(),
                    kind = %listener.kind(),
                    "start listener panicked"
                );
            }
        }
        listeners.len()
    }
}
