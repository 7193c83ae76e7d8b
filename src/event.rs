//! Event model.
//!
//! An event is a running instance of some externally observed unit of work.
//! Every event has a concrete kind (its type key) and can report whether it
//! has finished. Two events of the same kind are still distinct: identity is
//! the instance, compared through the shared `Arc` handle.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Type key for events.
///
/// Listeners and waiters select events by kind. Kinds compare by value.
///
/// # Examples
///
/// ```
/// use startwatch::EventKind;
///
/// let kind = EventKind::new("LoginScreen");
/// assert_eq!(kind, EventKind::from("LoginScreen"));
/// assert_eq!(kind.as_str(), "LoginScreen");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventKind(Cow<'static, str>);

impl EventKind {
    /// Creates a kind from any string.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Creates a kind from a static string without allocating.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Returns the kind name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for EventKind {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for EventKind {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

/// Capability surface the monitor needs from an observed event.
///
/// Implementations are shared across the producer, dispatch workers and
/// waiters, so they must be `Send + Sync`. `is_finished` may be called while
/// the history lock is held and must not block.
pub trait Event: fmt::Debug + Send + Sync {
    /// The concrete kind of this event.
    fn kind(&self) -> EventKind;

    /// Whether the underlying unit of work has ended.
    fn is_finished(&self) -> bool;
}

/// Shared handle to an observed event.
pub type EventRef = Arc<dyn Event>;

/// Returns true if both handles point at the same event instance.
///
/// Only the data pointer is compared; vtable pointers for the same type may
/// differ across codegen units.
#[must_use]
pub fn same_instance(a: &EventRef, b: &EventRef) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}
