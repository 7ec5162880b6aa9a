use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::ledger::StatusLedger;
use crate::queue::store::SubmissionQueue;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("URL is required.")]
    EmptyUrl,
}

/// TaskBroker is the submission intake shared by the API and the CLI
///
/// Flow:
/// 1. Caller hands over a URL
/// 2. Broker records `Queued` in the ledger (new generation)
/// 3. Broker pushes the URL onto the submission queue
/// 4. The dispatcher picks it up from there
///
/// The ledger write happens first so a status query never misses a URL
/// that is already sitting in the queue.
#[derive(Debug, Clone)]
pub struct TaskBroker {
    ledger: Arc<StatusLedger>,
    queue: Arc<SubmissionQueue>,
}

impl TaskBroker {
    pub fn new(ledger: Arc<StatusLedger>, queue: Arc<SubmissionQueue>) -> Self {
        Self { ledger, queue }
    }

    /// Accept a URL for background processing
    ///
    /// Re-submitting a known URL resets it to `Queued`. Returns the
    /// generation assigned to this submission.
    pub fn submit(&self, url: &str) -> Result<u64, SubmitError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(SubmitError::EmptyUrl);
        }

        let generation = self.ledger.submit(url);
        self.queue.enqueue(url);

        debug!(url, generation, depth = self.queue.len(), "URL queued");
        Ok(generation)
    }

    pub fn ledger(&self) -> &Arc<StatusLedger> {
        &self.ledger
    }

    /// Number of URLs waiting for the dispatcher
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
