//! Download worker runtime
//!
//! A single dispatcher drains the [`SubmissionQueue`](crate::queue::SubmissionQueue)
//! into a fixed-size [`WorkerPool`]. Each execution runs one [`Fetcher`] call
//! and records its terminal state in the ledger.

pub mod dispatch;
pub mod fetcher;
pub mod pool;
pub mod runner;
pub mod ytdlp;

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::WorkersConfig;
use crate::ledger::{StatusLedger, StatusReport};
use crate::observability::Metrics;
use crate::queue::{SubmissionQueue, TaskBroker};

pub use dispatch::Dispatcher;
pub use fetcher::{FetchError, Fetcher};
pub use pool::{PoolError, WorkerPool};
pub use ytdlp::{YtDlpFetcher, YtDlpOptions};

/// Running pool plus the dispatcher feeding it
pub struct WorkerRuntime {
    pool: Arc<WorkerPool>,
    shutdown: CancellationToken,
    dispatcher: JoinHandle<()>,
}

impl WorkerRuntime {
    /// Create the pool and start dispatching immediately
    pub fn start(
        config: &WorkersConfig,
        ledger: Arc<StatusLedger>,
        queue: Arc<SubmissionQueue>,
        fetcher: Arc<dyn Fetcher>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let pool = Arc::new(WorkerPool::new(
            config.max_workers.get(),
            ledger,
            fetcher,
            metrics,
        ));
        let shutdown = CancellationToken::new();

        let dispatcher =
            Dispatcher::new(queue, pool.clone(), config.dequeue_timeout(), shutdown.clone())
                .spawn();

        Self {
            pool,
            shutdown,
            dispatcher,
        }
    }

    pub fn pool(&self) -> Arc<WorkerPool> {
        self.pool.clone()
    }

    /// Stop dispatching, then wait for every running download to finish
    ///
    /// URLs still in the queue stay `Queued`.
    pub async fn shutdown(self) {
        info!("Stopping worker runtime");
        self.shutdown.cancel();

        if let Err(e) = self.dispatcher.await {
            error!(error = %e, "Dispatcher task failed");
        }

        self.pool.shutdown().await;
    }
}

/// Process a fixed list of URLs and report how each one ended
///
/// Returns once every URL is terminal, or once `interrupt` resolves and the
/// running downloads have drained. In the second case the report still
/// lists the untouched URLs as queued.
pub async fn run_batch<I>(
    config: &WorkersConfig,
    fetcher: Arc<dyn Fetcher>,
    urls: I,
    interrupt: impl Future<Output = ()>,
) -> StatusReport
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let ledger = Arc::new(StatusLedger::new());
    let queue = Arc::new(SubmissionQueue::new());
    let metrics = Arc::new(Metrics::new());

    let runtime = WorkerRuntime::start(config, ledger.clone(), queue.clone(), fetcher, metrics.clone());
    let broker = TaskBroker::new(ledger.clone(), queue);

    for url in urls {
        match broker.submit(url.as_ref()) {
            Ok(_) => metrics.job_accepted(),
            Err(e) => warn!(error = %e, "Skipping blank URL"),
        }
    }

    tokio::select! {
        _ = ledger.wait_settled() => {}
        _ = interrupt => warn!("Interrupted, waiting for running downloads"),
    }

    runtime.shutdown().await;
    ledger.snapshot()
}
