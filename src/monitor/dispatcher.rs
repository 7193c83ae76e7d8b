//! Listener dispatch pool.
//!
//! Newly recorded starts are handed to a small worker pool so listeners never
//! run on the producer thread. The pool keeps `core_workers` threads for its
//! whole lifetime and grows up to `max_workers` when the backlog is full; the
//! extra workers retire after `keep_alive` without work.
//!
//! A submission that finds the backlog full with every worker slot taken is
//! reported as `DispatchQueueFull`. Dropping a start notification would leave
//! pending waiters hanging until their timeout, so the pool never drops one
//! silently.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::debug;

use crate::error::{ExecutionError, WatchResult};
use crate::event::EventRef;

use super::config::DispatchPoolConfig;
use super::registry::ListenerRegistry;

struct DispatchJob {
    event: EventRef,
}

impl DispatchJob {
    fn run(self, registry: &ListenerRegistry) {
        registry.dispatch(&self.event);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerRole {
    Core,
    Extra,
}

/// Bounded pool that runs one dispatch job per recorded start.
pub(crate) struct DispatchPool {
    cfg: DispatchPoolConfig,
    name: String,
    registry: Arc<ListenerRegistry>,
    tx: Sender<DispatchJob>,
    rx: Receiver<DispatchJob>,
    live_workers: Arc<AtomicUsize>,
    handles: Vec<JoinHandle<()>>,
    spawned: usize,
}

impl DispatchPool {
    /// Starts the core workers.
    pub(crate) fn start(name: &str, cfg: DispatchPoolConfig, registry: Arc<ListenerRegistry>) -> WatchResult<Self> {
        let (tx, rx) = bounded::<DispatchJob>(cfg.queue_capacity.max(1));
        let mut pool = Self {
            cfg,
            name: name.to_string(),
            registry,
            tx,
            rx,
            live_workers: Arc::new(AtomicUsize::new(0)),
            handles: Vec::new(),
            spawned: 0,
        };

        for _ in 0..pool.cfg.core_workers.max(1) {
            pool.spawn_worker(WorkerRole::Core, None)?;
        }
        debug!(pool = %pool.name, workers = pool.cfg.core_workers, "dispatch pool started");
        Ok(pool)
    }

    /// Number of worker threads currently alive.
    pub(crate) fn worker_count(&self) -> usize {
        self.live_workers.load(Ordering::Acquire)
    }

    /// Queues a dispatch job for `event`.
    pub(crate) fn submit(&mut self, event: EventRef) -> WatchResult<()> {
        let job = DispatchJob { event };
        match self.tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(job)) => {
                if self.worker_count() < self.cfg.max_workers {
                    debug!(pool = %self.name, "dispatch backlog full; adding worker");
                    self.spawn_worker(WorkerRole::Extra, Some(job))
                } else {
                    Err(ExecutionError::DispatchQueueFull {
                        capacity: self.cfg.queue_capacity,
                        workers: self.worker_count(),
                    }
                    .into())
                }
            }
            Err(TrySendError::Disconnected(_)) => Err(ExecutionError::Disconnected {
                path: "dispatch".to_string(),
            }
            .into()),
        }
    }

    fn spawn_worker(&mut self, role: WorkerRole, first: Option<DispatchJob>) -> WatchResult<()> {
        self.handles.retain(|h| !h.is_finished());

        let thread_name = format!("{}-dispatch-{}", self.name, self.spawned);
        let rx = self.rx.clone();
        let registry = Arc::clone(&self.registry);
        let live = Arc::clone(&self.live_workers);
        let keep_alive = self.cfg.keep_alive;

        live.fetch_add(1, Ordering::AcqRel);
        let spawned = thread::Builder::new().name(thread_name.clone()).spawn(move || {
            if let Some(job) = first {
                job.run(&registry);
            }
            loop {
                let next = match role {
                    WorkerRole::Core => rx.recv().ok(),
                    WorkerRole::Extra => match rx.recv_timeout(keep_alive) {
                        Ok(job) => Some(job),
                        Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
                    },
                };
                let Some(job) = next else {
                    break;
                };
                job.run(&registry);
            }
            live.fetch_sub(1, Ordering::AcqRel);
        });

        match spawned {
            Ok(handle) => {
                self.spawned += 1;
                self.handles.push(handle);
                Ok(())
            }
            Err(err) => {
                self.live_workers.fetch_sub(1, Ordering::AcqRel);
                Err(ExecutionError::Spawn {
                    name: thread_name,
                    message: err.to_string(),
                }
                .into())
            }
        }
    }

    /// Stops accepting jobs, lets queued and in-flight jobs finish, and joins
    /// every worker.
    pub(crate) fn shutdown(self) {
        let Self { name, tx, rx, handles, .. } = self;
        drop(tx);
        drop(rx);
        for handle in handles {
            let _ = handle.join();
        }
        debug!(pool = %name, "dispatch pool stopped");
    }
}
