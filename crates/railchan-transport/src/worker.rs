use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{Result, TransportError};
use crate::queue::{InboundQueue, WaitOutcome};

const WORKER_THREAD_NAME: &str = "railchan-worker";

/// Timing knobs for the processing thread.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Upper bound on one wait, so a missed wake-up still re-checks
    /// the terminate signal.
    pub wait_timeout: Duration,
    /// How many times shutdown polls for the worker to exit.
    pub shutdown_retries: u32,
    /// Delay between shutdown polls.
    pub shutdown_poll_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_millis(500),
            shutdown_retries: 50,
            shutdown_poll_interval: Duration::from_millis(100),
        }
    }
}

/// How a [`QueueWorker::shutdown`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The worker exited and was joined.
    Joined {
        /// Items dropped unprocessed, whether still queued or left over
        /// from a batch cut short by termination.
        discarded: usize,
    },
    /// The worker did not exit in time and was detached.
    TimedOut {
        /// Items dropped unprocessed so far.
        discarded: usize,
    },
}

/// The single consumer of an [`InboundQueue`].
///
/// Spawns one dedicated thread that waits for data, detaches the whole
/// pending batch, and feeds it to the handler in FIFO order.
pub struct QueueWorker<T> {
    queue: Arc<InboundQueue<T>>,
    exited: Arc<AtomicBool>,
    dropped: Arc<AtomicUsize>,
    handle: Option<JoinHandle<()>>,
    config: QueueConfig,
}

impl<T: Send + 'static> QueueWorker<T> {
    /// Start the processing thread.
    pub fn spawn<F>(queue: Arc<InboundQueue<T>>, config: QueueConfig, handler: F) -> Result<Self>
    where
        F: FnMut(T) + Send + 'static,
    {
        let exited = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicUsize::new(0));

        let handle = {
            let queue = Arc::clone(&queue);
            let exited = Arc::clone(&exited);
            let dropped = Arc::clone(&dropped);
            let wait_timeout = config.wait_timeout;
            thread::Builder::new()
                .name(WORKER_THREAD_NAME.to_string())
                .spawn(move || {
                    let _guard = ExitGuard(exited);
                    run_loop(&queue, wait_timeout, &dropped, handler);
                })
                .map_err(TransportError::Spawn)?
        };

        tracing::debug!(thread = WORKER_THREAD_NAME, "queue worker started");

        Ok(Self {
            queue,
            exited,
            dropped,
            handle: Some(handle),
            config,
        })
    }
}

impl<T> QueueWorker<T> {
    /// The queue this worker drains.
    pub fn queue(&self) -> &Arc<InboundQueue<T>> {
        &self.queue
    }

    /// Returns true until the worker thread has left its loop.
    pub fn is_running(&self) -> bool {
        !self.exited.load(Ordering::Acquire)
    }

    /// Terminate the queue and wait, within the configured bound, for the
    /// worker to exit. Anything still queued is dropped.
    pub fn shutdown(mut self) -> ShutdownOutcome {
        self.queue.terminate();

        let mut attempts = 0u32;
        while !self.exited.load(Ordering::Acquire) && attempts < self.config.shutdown_retries {
            thread::sleep(self.config.shutdown_poll_interval);
            attempts += 1;
        }

        let discarded = self.queue.pop_all().len() + self.dropped.load(Ordering::Acquire);
        let handle = self.handle.take();

        if !self.exited.load(Ordering::Acquire) {
            tracing::warn!(
                attempts,
                discarded,
                "queue worker did not exit in time, detaching"
            );
            return ShutdownOutcome::TimedOut { discarded };
        }

        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("queue worker panicked");
            }
        }

        tracing::debug!(discarded, "queue worker stopped");
        ShutdownOutcome::Joined { discarded }
    }
}

impl<T> Drop for QueueWorker<T> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.queue.terminate();
        }
    }
}

fn run_loop<T, F>(
    queue: &InboundQueue<T>,
    wait_timeout: Duration,
    dropped: &AtomicUsize,
    mut handler: F,
) where
    F: FnMut(T),
{
    loop {
        match queue.wait_for_data(wait_timeout) {
            WaitOutcome::Terminated => break,
            WaitOutcome::TimedOut => continue,
            WaitOutcome::Data => {
                let batch = queue.pop_all();
                let batch_len = batch.len();
                for (processed, item) in batch.into_iter().enumerate() {
                    if queue.is_terminated() {
                        let remaining = batch_len - processed;
                        dropped.fetch_add(remaining, Ordering::AcqRel);
                        tracing::debug!(
                            dropped = remaining,
                            "terminated mid-batch, dropping remaining items"
                        );
                        return;
                    }
                    handler(item);
                }
            }
        }
    }
}

struct ExitGuard(Arc<AtomicBool>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}
