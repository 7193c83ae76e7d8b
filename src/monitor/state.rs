//! Monitor lifecycle state.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// Lifecycle of a start monitor.
///
/// `Created -> Running -> Stopping -> Stopped`. A stop requested before
/// `start()` goes straight to `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    /// Constructed, producer thread not started.
    Created,
    /// Producer thread is polling the source.
    Running,
    /// Stop requested; the producer exits at the end of its current poll.
    Stopping,
    /// Producer has left its loop. Terminal.
    Stopped,
}

impl MonitorState {
    const fn to_u8(self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Running => 1,
            Self::Stopping => 2,
            Self::Stopped => 3,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Created,
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Atomic holder for [`MonitorState`].
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) const fn new() -> Self {
        Self(AtomicU8::new(MonitorState::Created.to_u8()))
    }

    pub(crate) fn get(&self) -> MonitorState {
        MonitorState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: MonitorState) {
        self.0.store(state.to_u8(), Ordering::Release);
    }

    /// Moves `from -> to`; on failure returns the state actually observed.
    pub(crate) fn transition(&self, from: MonitorState, to: MonitorState) -> Result<(), MonitorState> {
        self.0
            .compare_exchange(from.to_u8(), to.to_u8(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(MonitorState::from_u8)
    }
}
