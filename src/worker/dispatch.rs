use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::pool::{PoolError, WorkerPool};
use crate::queue::SubmissionQueue;

/// Single coordinating loop that drains the submission queue into the pool
///
/// Two states:
/// - Waiting: `dequeue` with a timeout, raced against the shutdown token
/// - Dispatching: hand the URL to the pool and go straight back to waiting
///
/// Handing off only waits for a free slot. A URL whose slot has not been
/// granted yet stays `Queued` in the ledger.
#[derive(Clone)]
pub struct Dispatcher {
    queue: Arc<SubmissionQueue>,
    pool: Arc<WorkerPool>,
    idle_timeout: Duration,
    shutdown: CancellationToken,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<SubmissionQueue>,
        pool: Arc<WorkerPool>,
        idle_timeout: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            queue,
            pool,
            idle_timeout,
            shutdown,
        }
    }

    pub async fn run(self) {
        info!(idle_timeout_ms = self.idle_timeout.as_millis() as u64, "Dispatcher started");

        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                next = self.queue.dequeue(self.idle_timeout) => next,
            };

            let Some(url) = next else {
                continue;
            };

            let handed_off = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    self.queue.push_front(url);
                    break;
                }
                result = self.pool.submit(url.clone()) => result,
            };

            match handed_off {
                Ok(()) => debug!(url, "Dispatched"),
                Err(PoolError::Closed) => {
                    warn!(url, "Worker pool closed, stopping dispatcher");
                    self.queue.push_front(url);
                    break;
                }
            }
        }

        info!(pending = self.queue.len(), "Dispatcher stopped");
    }

    /// Run the loop on the runtime, restarting it if it ever panics
    pub fn spawn(self) -> JoinHandle<()> {
        let shutdown = self.shutdown.clone();
        tokio::spawn(supervise(shutdown, move || self.clone().run()))
    }
}

/// Keep a loop alive: each run goes in its own task and a panic starts a
/// fresh one until `shutdown` is cancelled
async fn supervise<F, Fut>(shutdown: CancellationToken, mut make_loop: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    loop {
        match tokio::spawn(make_loop()).await {
            Ok(()) => break,
            Err(e) if e.is_panic() && !shutdown.is_cancelled() => {
                error!(error = %e, "Dispatcher panicked, restarting");
            }
            Err(e) => {
                error!(error = %e, "Dispatcher task ended abnormally");
                break;
            }
        }
    }
}
