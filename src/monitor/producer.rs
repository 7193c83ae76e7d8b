//! Producer loop.
//!
//! One dedicated thread polls the event source with a bounded timeout,
//! records new starts and hands them to the dispatch pool. The source cannot
//! be interrupted mid-wait, so a stop request is observed at the end of the
//! current poll cycle: stop latency is bounded by `poll_timeout`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{error, info, info_span, trace};

use crate::event::EventRef;
use crate::history::{HistoryStore, StartedRecord};
use crate::source::EventSource;

use super::dispatcher::DispatchPool;
use super::registry::ListenerRegistry;
use super::state::{MonitorState, StateCell};

/// State shared between the monitor handle, its producer and its workers.
#[derive(Debug)]
pub(crate) struct MonitorShared {
    pub(crate) history: HistoryStore,
    pub(crate) listeners: Arc<ListenerRegistry>,
    pub(crate) state: StateCell,
    pub(crate) dropped_dispatches: AtomicU64,
}

impl MonitorShared {
    pub(crate) fn new() -> Self {
        Self {
            history: HistoryStore::new(),
            listeners: Arc::new(ListenerRegistry::new()),
            state: StateCell::new(),
            dropped_dispatches: AtomicU64::new(0),
        }
    }

    fn stop_requested(&self) -> bool {
        self.state.get() != MonitorState::Running
    }

    /// Records one poll result. Returns true if it was a new start.
    fn observe(&self, event: EventRef, pool: &mut DispatchPool) -> bool {
        if !self.history.append(StartedRecord::now(Arc::clone(&event))) {
            trace!(kind = %event.kind(), "event still current; poll result ignored");
            return false;
        }

        info!(kind = %event.kind(), "event started");
        if let Err(err) = pool.submit(event) {
            self.dropped_dispatches.fetch_add(1, Ordering::Relaxed);
            error!(error = %err, "start notification was not dispatched");
        }
        true
    }
}

/// Releases the producer's resources when it leaves `run`, including by
/// unwinding out of a panicking source: the pool is drained and joined and
/// the monitor is marked `Stopped`.
struct ProducerExit {
    pool: Option<DispatchPool>,
    shared: Arc<MonitorShared>,
}

impl Drop for ProducerExit {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("event source panicked; start monitor stopping");
        }
        if let Some(pool) = self.pool.take() {
            pool.shutdown();
        }
        self.shared.state.set(MonitorState::Stopped);
        info!("start monitor stopped");
    }
}

/// Body of the producer thread.
pub(crate) fn run(
    mut source: Box<dyn EventSource>,
    pool: DispatchPool,
    shared: Arc<MonitorShared>,
    poll_timeout: Duration,
) {
    let poll_timeout_ms = poll_timeout.as_millis().min(u128::from(u64::MAX)) as u64;
    let span = info_span!("start_monitor", poll_timeout_ms);
    let _entered = span.enter();
    info!("start monitor running");

    let mut exit = ProducerExit {
        pool: Some(pool),
        shared,
    };
    loop {
        if let Some(event) = source.wait_next(poll_timeout) {
            if let Some(pool) = exit.pool.as_mut() {
                exit.shared.observe(event, pool);
            }
        }

        if exit.shared.stop_requested() {
            break;
        }
    }
}
