//! Error types for startwatch.
//!
//! All errors in startwatch are strongly typed using thiserror.
//! Timeouts are not errors here: waiting and polling report "no result"
//! with `None`. Errors cover configuration mistakes, lifecycle misuse and
//! dispatch capacity problems.

use thiserror::Error;

use crate::monitor::MonitorState;

/// Validation errors raised while checking configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Duration '{field}' must be greater than zero")]
    ZeroDuration {
        field: &'static str,
    },

    #[error("Capacity '{field}' must be greater than zero")]
    ZeroCapacity {
        field: &'static str,
    },

    #[error("max_workers ({max}) must be at least core_workers ({core})")]
    WorkerBounds {
        core: usize,
        max: usize,
    },

    #[error("Thread name cannot be empty")]
    EmptyThreadName,
}

/// Execution errors raised while the monitor is running.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Monitor is {actual}, expected {expected}")]
    InvalidState {
        expected: MonitorState,
        actual: MonitorState,
    },

    #[error("Dispatch backlog is full (capacity: {capacity}, workers: {workers})")]
    DispatchQueueFull {
        capacity: usize,
        workers: usize,
    },

    #[error("Channel disconnected: {path}")]
    Disconnected {
        path: String,
    },

    #[error("Failed to spawn thread '{name}': {message}")]
    Spawn {
        name: String,
        message: String,
    },
}

/// Top-level error type for startwatch.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl WatchError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if this error signals lost dispatch capacity.
    ///
    /// A full backlog means a start notification was not delivered, so any
    /// `wait_for` caller relying on it can only time out.
    #[must_use]
    pub const fn is_capacity(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::DispatchQueueFull { .. }))
    }
}

/// Result type alias for startwatch operations.
pub type WatchResult<T> = Result<T, WatchError>;
