//! Start monitor subsystem.
//!
//! A producer thread polls an [`EventSource`](crate::source::EventSource),
//! records new starts in the history and hands them to a dispatch pool that
//! notifies listeners. Callers can read the history, register listeners, or
//! block until a start of a given kind is observed.

/// Monitor and dispatch pool configuration.
pub mod config;
/// Listener dispatch worker pool.
mod dispatcher;
/// Producer loop.
mod producer;
/// Listener registry.
pub mod registry;
/// Lifecycle state machine.
pub mod state;
/// Public monitor handle.
pub mod system;
/// Blocking wait facade.
mod wait;

pub use config::{DispatchPoolConfig, StartMonitorConfig, DEFAULT_POLL_TIMEOUT, DEFAULT_WAIT_RECHECK_INTERVAL};
pub use registry::{Listener, ListenerId, ListenerRegistration, ListenerRegistry};
pub use state::MonitorState;
pub use system::StartMonitor;
