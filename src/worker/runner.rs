//! Task runner - executes a single URL and records the outcome

use std::any::Any;
use std::sync::Arc;

use tracing::{info, warn};
use url::Url;

use super::fetcher::Fetcher;
use crate::ledger::{FailureReason, StatusLedger, WorkState};
use crate::observability::Metrics;

pub type Result<T> = std::result::Result<T, FailureReason>;

/// Check that the identifier parses as an absolute URL
///
/// Parsing requires a scheme, and special schemes such as `https` also
/// need a well-formed host.
pub fn validate_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|_| FailureReason::InvalidFormat)
}

/// Process one URL that the pool already moved to `Running`
///
/// Steps:
/// 1. Reject identifiers without a scheme, never invoking the tool
/// 2. Run the fetcher in its own task so a panic is contained
/// 3. Record the terminal state under `generation`
///
/// Nothing escapes this function: every failure ends up in the ledger.
pub async fn process_task(
    ledger: &StatusLedger,
    fetcher: Arc<dyn Fetcher>,
    metrics: &Metrics,
    url: &str,
    generation: u64,
) {
    info!(url, generation, "Processing URL");

    let outcome = match validate_url(url) {
        Ok(_) => run_fetcher(fetcher, url).await,
        Err(reason) => Err(reason),
    };

    let state = match outcome {
        Ok(()) => {
            info!(url, "URL completed");
            WorkState::Succeeded
        }
        Err(reason) => {
            warn!(url, code = reason.code(), error = %reason, "URL failed");
            WorkState::Failed(reason)
        }
    };

    // Superseded executions are not counted
    let succeeded = state == WorkState::Succeeded;
    if ledger.finish(url, generation, state) {
        if succeeded {
            metrics.job_succeeded();
        } else {
            metrics.job_failed();
        }
    }
}

async fn run_fetcher(fetcher: Arc<dyn Fetcher>, url: &str) -> Result<()> {
    let owned = url.to_string();
    let handle = tokio::spawn(async move { fetcher.fetch(&owned).await });

    match handle.await {
        Ok(result) => result.map_err(FailureReason::from),
        Err(join_error) if join_error.is_panic() => Err(FailureReason::fault(format!(
            "fetcher panicked: {}",
            panic_message(join_error.into_panic().as_ref())
        ))),
        Err(join_error) => Err(FailureReason::fault(join_error.to_string())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
