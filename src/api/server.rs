use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{decompression::RequestDecompressionLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

use super::{
    services::{add_url, delete_file, downloaded_files, health, status},
    state::AppState,
};
use crate::config::Config;
use crate::ledger::StatusLedger;
use crate::observability::Metrics;
use crate::queue::{SubmissionQueue, TaskBroker};
use crate::worker::{WorkerRuntime, YtDlpFetcher, YtDlpOptions};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All routes plus the static page as fallback
pub fn build_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.server.static_dir);

    Router::new()
        .route("/api/add_url", post(add_url))
        .route("/api/status", get(status))
        .route("/api/downloaded_files", get(downloaded_files))
        .route("/api/downloaded_files/{name}", delete(delete_file))
        .route("/health", get(health))
        .fallback_service(static_files)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                // Decompress gzip request bodies before handlers see them
                .layer(RequestDecompressionLayer::new()),
        )
}

/// Serve until Ctrl+C or SIGTERM, then drain the workers
///
/// Shutdown order: stop accepting HTTP requests, stop the dispatcher, wait
/// for running downloads. Queued URLs are dropped with the process.
pub async fn run(config: Config) -> Result<(), AnyError> {
    let config = Arc::new(config);
    let metrics = Arc::new(Metrics::new());
    let ledger = Arc::new(StatusLedger::new());
    let queue = Arc::new(SubmissionQueue::new());

    let fetcher = YtDlpFetcher::new(YtDlpOptions::from(&config.fetcher));
    fetcher.probe().await;

    let runtime = WorkerRuntime::start(
        &config.workers,
        ledger.clone(),
        queue.clone(),
        Arc::new(fetcher),
        metrics.clone(),
    );

    let broker = TaskBroker::new(ledger, queue);
    let state = AppState::new(config.clone(), broker, runtime.pool(), metrics);
    let app = build_router(state);

    let address = config.server.bind_addr;
    let listener = match TcpListener::bind(address).await {
        Ok(listener) => listener,
        Err(e) => {
            runtime.shutdown().await;
            return Err(e.into());
        }
    };
    info!(%address, workers = config.workers.max_workers.get(), "grabbox listening");

    let served = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await;

    runtime.shutdown().await;
    served?;

    info!("grabbox stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
