//! Monitor configuration.

use std::time::Duration;

use crate::error::{ValidationError, WatchResult};

/// How long one poll of the event source may block.
///
/// This is also the upper bound on how long `stop()` takes to be observed,
/// because the source cannot be interrupted mid-wait.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound between re-checks of a blocked `wait_for` caller.
pub const DEFAULT_WAIT_RECHECK_INTERVAL: Duration = Duration::from_secs(2);

/// Dispatch pool sizing.
#[allow(missing_docs)]
#[derive(Debug, Clone)]
pub struct DispatchPoolConfig {
    /// Workers kept alive for the whole monitor lifetime.
    pub core_workers: usize,
    /// Upper bound on workers, core ones included.
    pub max_workers: usize,
    /// Max queued dispatch jobs before extra workers are spawned.
    pub queue_capacity: usize,
    /// Idle time after which an extra worker retires.
    pub keep_alive: Duration,
}

impl Default for DispatchPoolConfig {
    fn default() -> Self {
        Self {
            core_workers: 2,
            max_workers: 5,
            queue_capacity: 5,
            keep_alive: Duration::from_secs(5),
        }
    }
}

impl DispatchPoolConfig {
    /// Checks worker bounds and capacities.
    pub fn validate(&self) -> WatchResult<()> {
        if self.core_workers == 0 {
            return Err(ValidationError::ZeroCapacity { field: "core_workers" }.into());
        }
        if self.queue_capacity == 0 {
            return Err(ValidationError::ZeroCapacity {
                field: "queue_capacity",
            }
            .into());
        }
        if self.max_workers < self.core_workers {
            return Err(ValidationError::WorkerBounds {
                core: self.core_workers,
                max: self.max_workers,
            }
            .into());
        }
        if self.keep_alive.is_zero() {
            return Err(ValidationError::ZeroDuration { field: "keep_alive" }.into());
        }
        Ok(())
    }
}

/// Start monitor configuration.
#[allow(missing_docs)]
#[derive(Debug, Clone)]
pub struct StartMonitorConfig {
    /// Bounded wait passed to the event source on every poll cycle.
    pub poll_timeout: Duration,
    /// Max time a `wait_for` caller sleeps before re-checking its deadline.
    pub wait_recheck_interval: Duration,
    /// Name of the producer thread; dispatch workers derive theirs from it.
    pub thread_name: String,
    pub dispatch: DispatchPoolConfig,
}

impl Default for StartMonitorConfig {
    fn default() -> Self {
        Self {
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            wait_recheck_interval: DEFAULT_WAIT_RECHECK_INTERVAL,
            thread_name: "startwatch-monitor".to_string(),
            dispatch: DispatchPoolConfig::default(),
        }
    }
}

impl StartMonitorConfig {
    /// Sets the poll timeout.
    #[must_use]
    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    /// Sets the wait recheck interval.
    #[must_use]
    pub fn with_wait_recheck_interval(mut self, interval: Duration) -> Self {
        self.wait_recheck_interval = interval;
        self
    }

    /// Sets the producer thread name.
    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Replaces the dispatch pool sizing.
    #[must_use]
    pub fn with_dispatch(mut self, dispatch: DispatchPoolConfig) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Checks every field; called by `StartMonitor::new`.
    pub fn validate(&self) -> WatchResult<()> {
        if self.poll_timeout.is_zero() {
            return Err(ValidationError::ZeroDuration { field: "poll_timeout" }.into());
        }
        if self.wait_recheck_interval.is_zero() {
            return Err(ValidationError::ZeroDuration {
                field: "wait_recheck_interval",
            }
            .into());
        }
        if self.thread_name.trim().is_empty() {
            return Err(ValidationError::EmptyThreadName.into());
        }
        self.dispatch.validate()
    }
}
