use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{Instant, timeout_at};

/// Unbounded FIFO of pending URLs
///
/// Architecture:
/// - `items`: plain `VecDeque` behind its own mutex, independent of the ledger lock
/// - `available`: `Notify` permit handed out on every enqueue
///
/// The queue only ever holds identifiers. State lives in the ledger.
#[derive(Debug, Default)]
pub struct SubmissionQueue {
    items: Mutex<VecDeque<String>>,
    available: Notify,
}

impl SubmissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a URL to the tail. Never blocks, never fails.
    pub fn enqueue(&self, url: impl Into<String>) {
        self.lock().push_back(url.into());
        self.available.notify_one();
    }

    /// Put a URL back at the head, ahead of everything else
    pub fn push_front(&self, url: impl Into<String>) {
        self.lock().push_front(url.into());
        self.available.notify_one();
    }

    /// Remove the head, waiting up to `timeout` for one to arrive
    ///
    /// Returns `None` when the queue stayed empty for the whole window.
    pub async fn dequeue(&self, timeout: Duration) -> Option<String> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(url) = self.try_dequeue() {
                return Some(url);
            }

            // `notify_one` stores a permit when nobody is waiting, so an
            // enqueue racing with the check above still wakes us.
            if timeout_at(deadline, self.available.notified()).await.is_err() {
                return self.try_dequeue();
            }
        }
    }

    /// Remove the head without waiting
    pub fn try_dequeue(&self) -> Option<String> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
