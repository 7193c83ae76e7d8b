//! # startwatch - start monitoring for externally observed work
//!
//! startwatch watches a blocking source of "started" events on a background
//! thread, keeps an ordered history of the instances that are still running,
//! and notifies listeners asynchronously. Callers can also block until the
//! next start of a given kind, with a timeout.
//!
//! ## Core Concepts
//!
//! - **Event**: a running instance with a kind and a finished signal
//! - **StartedRecord**: an event paired with the time its start was observed
//! - **Listener**: a callback for starts of one kind
//! - **Poll cycle**: one bounded wait on the source plus bookkeeping
//!
//! ## Usage
//!
//! ```rust,ignore
//! use startwatch::{channel_source, StartMonitor, StartMonitorConfig};
//!
//! let (feed, source) = channel_source(16);
//! let monitor = StartMonitor::new(source, StartMonitorConfig::default())?;
//! monitor.start()?;
//!
//! feed.start(screen)?;
//! let login = monitor.wait_for("LoginScreen", Duration::from_secs(5));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod event;
pub mod history;
pub mod monitor;
pub mod source;

// Re-export primary types at crate root for convenience
pub use error::{ExecutionError, ValidationError, WatchError, WatchResult};
pub use event::{same_instance, Event, EventKind, EventRef};
pub use history::{HistoryStore, StartedRecord};
pub use monitor::{
    DispatchPoolConfig, ListenerId, MonitorState, StartMonitor, StartMonitorConfig, DEFAULT_POLL_TIMEOUT,
    DEFAULT_WAIT_RECHECK_INTERVAL,
};
pub use source::{channel_source, ChannelEventSource, EventFeed, EventSource};
