//! Event source adapters.
//!
//! The monitor acquires events through [`EventSource`], an opaque blocking
//! call with a timeout that cannot be interrupted mid-wait. The source is
//! moved into the producer thread and only ever called from there.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use tracing::debug;

use crate::error::{ExecutionError, WatchResult};
use crate::event::EventRef;

/// Blocking source of started events.
pub trait EventSource: Send + 'static {
    /// Blocks for up to `timeout` and returns the next started event, if any.
    ///
    /// Implementations may return the same still-current instance on
    /// consecutive calls; the monitor suppresses such repeats.
    fn wait_next(&mut self, timeout: Duration) -> Option<EventRef>;
}

impl<F> EventSource for F
where
    F: FnMut(Duration) -> Option<EventRef> + Send + 'static,
{
    fn wait_next(&mut self, timeout: Duration) -> Option<EventRef> {
        self(timeout)
    }
}

/// Creates a bounded channel-backed source and the feed that drives it.
#[must_use]
pub fn channel_source(capacity: usize) -> (EventFeed, ChannelEventSource) {
    let (tx, rx) = bounded::<EventRef>(capacity.max(1));
    (EventFeed { tx }, ChannelEventSource { rx, closed: false })
}

/// Producer side of a [`ChannelEventSource`].
#[derive(Debug, Clone)]
pub struct EventFeed {
    tx: Sender<EventRef>,
}

impl EventFeed {
    /// Reports a started event. Blocks while the channel is full.
    pub fn start(&self, event: EventRef) -> WatchResult<()> {
        self.tx.send(event).map_err(|_| {
            ExecutionError::Disconnected {
                path: "event_feed".to_string(),
            }
            .into()
        })
    }
}

/// [`EventSource`] that receives events from an [`EventFeed`].
///
/// Once every feed has been dropped the source keeps honouring the timeout by
/// sleeping for it, so the producer loop never spins.
#[derive(Debug)]
pub struct ChannelEventSource {
    rx: Receiver<EventRef>,
    closed: bool,
}

impl EventSource for ChannelEventSource {
    fn wait_next(&mut self, timeout: Duration) -> Option<EventRef> {
        if self.closed {
            std::thread::sleep(timeout);
            return None;
        }

        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("event feed disconnected; source now idles");
                self.closed = true;
                None
            }
        }
    }
}
