use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::{Result, TransportError};

/// Result of waiting on an [`InboundQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// At least one item is ready to be drained.
    Data,
    /// The queue was terminated; the consumer should stop.
    Terminated,
    /// The timeout elapsed with nothing to do.
    TimedOut,
}

/// FIFO hand-off between the host's read callback and the processing thread.
///
/// The lock is held only to splice the deque: `push` is O(1) and `pop_all`
/// detaches every pending item in one swap. Termination is one-shot.
pub struct InboundQueue<T> {
    state: Mutex<QueueState<T>>,
    available: Condvar,
}

struct QueueState<T> {
    items: VecDeque<T>,
    terminated: bool,
}

impl<T> InboundQueue<T> {
    /// Create an empty, open queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                terminated: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Append an item and wake the consumer.
    ///
    /// Fails with [`TransportError::Closed`] once the queue is terminated.
    pub fn push(&self, item: T) -> Result<()> {
        {
            let mut state = self.lock();
            if state.terminated {
                return Err(TransportError::Closed);
            }
            state.items.push_back(item);
        }
        self.available.notify_one();
        Ok(())
    }

    /// Detach every pending item, preserving order.
    pub fn pop_all(&self) -> VecDeque<T> {
        std::mem::take(&mut self.lock().items)
    }

    /// Block until data is available, the queue is terminated, or `timeout`
    /// elapses. Termination takes precedence over pending data.
    pub fn wait_for_data(&self, timeout: Duration) -> WaitOutcome {
        let guard = self.lock();
        let (state, _) = self
            .available
            .wait_timeout_while(guard, timeout, |state| {
                state.items.is_empty() && !state.terminated
            })
            .unwrap_or_else(PoisonError::into_inner);

        if state.terminated {
            WaitOutcome::Terminated
        } else if state.items.is_empty() {
            WaitOutcome::TimedOut
        } else {
            WaitOutcome::Data
        }
    }

    /// Raise the terminate signal and wake every waiter.
    pub fn terminate(&self) {
        self.lock().terminated = true;
        self.available.notify_all();
    }

    /// Returns true once [`terminate`](Self::terminate) has been called.
    pub fn is_terminated(&self) -> bool {
        self.lock().terminated
    }

    /// Number of items waiting to be drained.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Returns true if nothing is waiting to be drained.
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for InboundQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for InboundQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("InboundQueue")
            .field("pending", &state.items.len())
            .field("terminated", &state.terminated)
            .finish()
    }
}
