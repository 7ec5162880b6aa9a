use std::sync::Arc;

use crate::config::Config;
use crate::ledger::StatusLedger;
use crate::observability::Metrics;
use crate::queue::TaskBroker;
use crate::storage::OutputDir;
use crate::worker::WorkerPool;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub broker: TaskBroker,
    pub pool: Arc<WorkerPool>,
    pub storage: Arc<OutputDir>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        broker: TaskBroker,
        pool: Arc<WorkerPool>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let storage = OutputDir::new(config.fetcher.output_dir.clone());

        Self {
            config,
            broker,
            pool,
            storage: Arc::new(storage),
            metrics,
        }
    }

    pub fn ledger(&self) -> &StatusLedger {
        self.broker.ledger()
    }
}
