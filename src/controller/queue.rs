//! # Work Queue
//!
//! A single-key work queue. The operator reconciles one logical object (the
//! whole target configuration), so the queue only tracks whether a request is
//! pending, whether one is in flight, and the earliest scheduled re-run.
//!
//! Semantics:
//!
//! - Enqueues while a request is pending coalesce into that request.
//! - An enqueue arriving while a cycle is in flight is remembered and yields
//!   exactly one more run once the in-flight cycle completes.
//! - Delayed enqueues keep only the earliest deadline.
//! - Failed cycles are re-enqueued with per-key exponential backoff.

use crate::controller::backoff::ExponentialBackoff;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Handle to the shared queue. Cloning is cheap.
#[derive(Clone)]
pub struct WorkQueue {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<QueueState>,
    notify: Notify,
}

#[derive(Debug)]
struct QueueState {
    pending: bool,
    processing: bool,
    shutting_down: bool,
    scheduled: Option<Instant>,
    backoff: ExponentialBackoff,
}

impl std::fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkQueue")
            .field("state", &*self.state())
            .finish()
    }
}

impl WorkQueue {
    pub fn new(backoff: ExponentialBackoff) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState {
                    pending: false,
                    processing: false,
                    shutting_down: false,
                    scheduled: None,
                    backoff,
                }),
                notify: Notify::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Request a reconcile
    pub fn enqueue(&self) {
        let mut state = self.state();
        if state.shutting_down {
            return;
        }
        if state.pending {
            trace!("Reconcile already pending, coalescing");
            return;
        }
        state.pending = true;
        if !state.processing {
            self.inner.notify.notify_one();
        }
    }

    /// Request a reconcile after `delay`.
    ///
    /// If an earlier deadline is already scheduled this call does nothing;
    /// a later one is superseded.
    pub fn enqueue_after(&self, delay: Duration) {
        if delay.is_zero() {
            self.enqueue();
            return;
        }

        let deadline = Instant::now() + delay;
        {
            let mut state = self.state();
            if state.shutting_down {
                return;
            }
            if state.scheduled.is_some_and(|existing| existing <= deadline) {
                return;
            }
            state.scheduled = Some(deadline);
        }
        debug!(delay_ms = delay.as_millis(), "Scheduled delayed reconcile");

        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let fire = {
                let mut state = queue.state();
                if state.scheduled == Some(deadline) {
                    state.scheduled = None;
                    true
                } else {
                    false
                }
            };
            if fire {
                queue.enqueue();
            }
        });
    }

    /// Wait for the next request.
    ///
    /// Returns `None` once the queue is shut down. The returned guard marks the
    /// request done when dropped.
    pub async fn dequeue(&self) -> Option<InFlight> {
        loop {
            {
                let mut state = self.state();
                if state.shutting_down {
                    return None;
                }
                if state.pending && !state.processing {
                    state.pending = false;
                    state.processing = true;
                    return Some(InFlight {
                        queue: self.clone(),
                    });
                }
            }
            self.inner.notify.notified().await;
        }
    }

    /// Re-enqueue after the next backoff delay. Returns the delay used.
    pub fn retry(&self) -> Duration {
        let delay = self.state().backoff.next_backoff();
        self.enqueue_after(delay);
        delay
    }

    /// Reset backoff after a successful cycle
    pub fn forget(&self) {
        self.state().backoff.reset();
    }

    /// Stop handing out work. Wakes a waiting consumer.
    pub fn shut_down(&self) {
        {
            let mut state = self.state();
            state.shutting_down = true;
            state.scheduled = None;
        }
        self.inner.notify.notify_one();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state().shutting_down
    }

    /// Whether a request is waiting to be processed
    pub fn is_pending(&self) -> bool {
        self.state().pending
    }

    /// Earliest scheduled delayed enqueue, if any
    pub fn scheduled(&self) -> Option<Instant> {
        self.state().scheduled
    }

    fn done(&self) {
        let mut state = self.state();
        state.processing = false;
        if state.pending && !state.shutting_down {
            self.inner.notify.notify_one();
        }
    }
}

/// A request being processed. Dropping it marks the request done.
#[derive(Debug)]
pub struct InFlight {
    queue: WorkQueue,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.queue.done();
    }
}
