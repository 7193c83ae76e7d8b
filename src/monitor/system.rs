//! Start monitor: the public handle.
//!
//! `StartMonitor` owns the history, the listener registry and the producer
//! thread. It exposes passive reads (`started_events`,
//! `most_recently_started`), push-style listeners (`on_start`) and the
//! blocking `wait_for`.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{ExecutionError, WatchError, WatchResult};
use crate::event::{EventKind, EventRef};
use crate::history::StartedRecord;
use crate::source::EventSource;

use super::config::StartMonitorConfig;
use super::dispatcher::DispatchPool;
use super::producer::{self, MonitorShared};
use super::registry::ListenerId;
use super::state::MonitorState;
use super::wait;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Monitor of started events.
///
/// Dropping the monitor requests a stop and detaches the producer thread,
/// which exits within one poll timeout. Call [`StartMonitor::join`] to wait
/// for it explicitly.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use startwatch::{channel_source, Event, EventKind, StartMonitor, StartMonitorConfig};
///
/// #[derive(Debug)]
/// struct Screen(&'static str);
///
/// impl Event for Screen {
///     fn kind(&self) -> EventKind {
///         EventKind::from_static(self.0)
///     }
///
///     fn is_finished(&self) -> bool {
///         false
///     }
/// }
///
/// let (feed, source) = channel_source(8);
/// let cfg = StartMonitorConfig::default().with_poll_timeout(Duration::from_millis(50));
/// let monitor = StartMonitor::new(source, cfg)?;
/// monitor.start()?;
///
/// feed.start(Arc::new(Screen("Login")))?;
/// let login = monitor.wait_for("Login", Duration::from_secs(5));
/// assert!(login.is_some());
///
/// monitor.stop();
/// monitor.join()?;
/// # Ok::<(), startwatch::WatchError>(())
/// ```
pub struct StartMonitor {
    cfg: StartMonitorConfig,
    shared: Arc<MonitorShared>,
    source: Mutex<Option<Box<dyn EventSource>>>,
    producer: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for StartMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartMonitor")
            .field("cfg", &self.cfg)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl StartMonitor {
    /// Creates a monitor in the `Created` state. The source is not polled
    /// until [`StartMonitor::start`].
    pub fn new<S: EventSource>(source: S, cfg: StartMonitorConfig) -> WatchResult<Self> {
        cfg.validate()?;
        let source: Box<dyn EventSource> = Box::new(source);
        Ok(Self {
            cfg,
            shared: Arc::new(MonitorShared::new()),
            source: Mutex::new(Some(source)),
            producer: Mutex::new(None),
        })
    }

    /// Creates a monitor with the default configuration.
    pub fn with_defaults<S: EventSource>(source: S) -> WatchResult<Self> {
        Self::new(source, StartMonitorConfig::default())
    }

    /// The configuration this monitor was built with.
    #[must_use]
    pub const fn config(&self) -> &StartMonitorConfig {
        &self.cfg
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> MonitorState {
        self.shared.state.get()
    }

    /// Number of starts whose listener dispatch was rejected for capacity.
    #[must_use]
    pub fn dropped_dispatches(&self) -> u64 {
        self.shared.dropped_dispatches.load(Ordering::Relaxed)
    }

    /// Starts the dispatch pool and the producer thread.
    ///
    /// Only valid once, from `Created`.
    pub fn start(&self) -> WatchResult<()> {
        self.shared
            .state
            .transition(MonitorState::Created, MonitorState::Running)
            .map_err(|actual| ExecutionError::InvalidState {
                expected: MonitorState::Created,
                actual,
            })?;

        let Some(source) = lock(&self.source).take() else {
            self.shared.state.set(MonitorState::Stopped);
            return Err(WatchError::internal("event source already consumed"));
        };

        let listeners = Arc::clone(&self.shared.listeners);
        let pool = match DispatchPool::start(&self.cfg.thread_name, self.cfg.dispatch.clone(), listeners) {
            Ok(pool) => pool,
            Err(err) => {
                self.abandon_start(source);
                return Err(err);
            }
        };

        let shared = Arc::clone(&self.shared);
        let poll_timeout = self.cfg.poll_timeout;
        let spawned = thread::Builder::new()
            .name(self.cfg.thread_name.clone())
            .spawn(move || producer::run(source, pool, shared, poll_timeout));

        match spawned {
            Ok(handle) => {
                *lock(&self.producer) = Some(handle);
                info!(thread = %self.cfg.thread_name, "start monitor started");
                Ok(())
            }
            Err(err) => {
                self.shared.state.set(MonitorState::Stopped);
                Err(ExecutionError::Spawn {
                    name: self.cfg.thread_name.clone(),
                    message: err.to_string(),
                }
                .into())
            }
        }
    }

    /// Rolls back a `start()` that failed before the producer was spawned.
    ///
    /// The monitor returns to `Created` with its source, unless a concurrent
    /// `stop()` already moved it on; then the source is dropped and the
    /// monitor ends `Stopped`.
    fn abandon_start(&self, source: Box<dyn EventSource>) {
        if self
            .shared
            .state
            .transition(MonitorState::Running, MonitorState::Created)
            .is_ok()
        {
            *lock(&self.source) = Some(source);
        } else {
            drop(source);
            self.shared.state.set(MonitorState::Stopped);
            info!("start monitor stopped during start");
        }
    }

    /// Requests the producer to stop.
    ///
    /// Returns immediately. The producer observes the request after its
    /// current poll, so it exits within one `poll_timeout`. The producer
    /// thread is also unparked, which wakes sources that wait with
    /// `std::thread::park_timeout`.
    pub fn stop(&self) {
        match self.shared.state.transition(MonitorState::Running, MonitorState::Stopping) {
            Ok(()) => {
                if let Some(handle) = lock(&self.producer).as_ref() {
                    handle.thread().unpark();
                }
                info!("start monitor stop requested");
            }
            Err(MonitorState::Created) => {
                if self
                    .shared
                    .state
                    .transition(MonitorState::Created, MonitorState::Stopped)
                    .is_ok()
                {
                    lock(&self.source).take();
                    info!("start monitor stopped before start");
                } else {
                    // Raced with start(); retry against the new state.
                    self.stop();
                }
            }
            Err(state) => {
                warn!(%state, "stop requested on a monitor that is not running");
            }
        }
    }

    /// Blocks until the producer thread has exited.
    ///
    /// Returns immediately if the monitor was never started.
    pub fn join(&self) -> WatchResult<()> {
        let handle = lock(&self.producer).take();
        match handle {
            Some(handle) => handle
                .join()
                .map_err(|_| WatchError::internal("start monitor producer panicked")),
            None => Ok(()),
        }
    }

    /// Forgets every recorded start and every registered listener.
    pub fn clear(&self) {
        self.shared.history.clear();
        self.shared.listeners.clear();
        debug!("start monitor cleared");
    }

    /// The most recently started event that has not finished.
    #[must_use]
    pub fn most_recently_started(&self) -> Option<EventRef> {
        self.shared.history.most_recent()
    }

    /// Live started events, in start order.
    ///
    /// Finished events are pruned from the history on every call. The result
    /// is an independent copy.
    #[must_use]
    pub fn started_events(&self) -> Vec<StartedRecord> {
        self.shared.history.snapshot()
    }

    /// Registers a callback for every future start of `kind`.
    ///
    /// Callbacks run on a dispatch worker with the registry locked: they must
    /// not block indefinitely or call back into this monitor's listener
    /// operations (`on_start`, `wait_for`, `clear`).
    pub fn on_start<F>(&self, kind: impl Into<EventKind>, callback: F) -> ListenerId
    where
        F: Fn(&EventRef) + Send + Sync + 'static,
    {
        self.shared.listeners.register(kind.into(), Arc::new(callback))
    }

    /// Waits up to `timeout` for an event of `kind` to start.
    ///
    /// Returns at once if the most recent live start already has `kind`.
    /// Returns `None` once `timeout` has elapsed, never earlier. A zero
    /// timeout only checks the most recent start.
    pub fn wait_for(&self, kind: impl Into<EventKind>, timeout: Duration) -> Option<EventRef> {
        wait::wait_for(
            &self.shared.history,
            &self.shared.listeners,
            &kind.into(),
            timeout,
            self.cfg.wait_recheck_interval,
        )
    }
}

impl Drop for StartMonitor {
    fn drop(&mut self) {
        // Do not join here: the producer may sit in a poll for up to
        // `poll_timeout`. It exits on its own once it sees the stop request.
        if matches!(self.state(), MonitorState::Created | MonitorState::Running) {
            self.stop();
        }
        drop(lock(&self.producer).take());
    }
}
