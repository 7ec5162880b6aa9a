use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use super::fetcher::Fetcher;
use super::runner;
use crate::ledger::StatusLedger;
use crate::observability::Metrics;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("worker pool is shut down")]
    Closed,
}

/// Fixed-size pool of execution slots
///
/// Architecture:
/// - `slots`: semaphore with `capacity` permits; one permit per running URL
/// - `tracker`: every execution is a tracked task, so shutdown can wait for them
///
/// Tokio's semaphore hands out permits in request order, so as long as a
/// single dispatcher calls `submit`, executions start in dequeue order.
pub struct WorkerPool {
    ledger: Arc<StatusLedger>,
    fetcher: Arc<dyn Fetcher>,
    metrics: Arc<Metrics>,
    slots: Arc<Semaphore>,
    tracker: TaskTracker,
    capacity: usize,
}

impl WorkerPool {
    pub fn new(
        capacity: usize,
        ledger: Arc<StatusLedger>,
        fetcher: Arc<dyn Fetcher>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let capacity = capacity.max(1);
        info!(capacity, tool = fetcher.tool(), "Creating worker pool");

        Self {
            ledger,
            fetcher,
            metrics,
            slots: Arc::new(Semaphore::new(capacity)),
            tracker: TaskTracker::new(),
            capacity,
        }
    }

    /// Start `url` on a free slot
    ///
    /// Waits only for a slot to become free, never for the unit of work
    /// itself; the execution continues in the background after this
    /// returns.
    pub async fn submit(&self, url: String) -> Result<(), PoolError> {
        if self.tracker.is_closed() {
            return Err(PoolError::Closed);
        }

        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;

        // Taken here rather than inside the task so `Running` follows dispatch order
        let Some(generation) = self.ledger.begin(&url) else {
            debug!(url, "URL no longer queued, skipping duplicate");
            return Ok(());
        };

        let ledger = self.ledger.clone();
        let fetcher = self.fetcher.clone();
        let metrics = self.metrics.clone();

        debug!(url, active = self.active() + 1, "Slot acquired");
        self.tracker.spawn(async move {
            let _permit = permit;
            runner::process_task(&ledger, fetcher, &metrics, &url, generation).await;
        });

        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently held by executions
    pub fn active(&self) -> usize {
        self.capacity - self.slots.available_permits()
    }

    pub fn is_closed(&self) -> bool {
        self.tracker.is_closed()
    }

    /// Refuse new work and wait for in-flight executions to finish
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.slots.close();

        info!(in_flight = self.tracker.len(), "Waiting for in-flight downloads");
        self.tracker.wait().await;
        info!("Worker pool drained");
    }
}
