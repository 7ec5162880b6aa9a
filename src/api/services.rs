use std::collections::BTreeMap;

use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::info;

use super::{
    error::ApiError,
    models::{AddUrlRequest, AddUrlResponse, DeleteFileResponse, HealthResponse, WorkerStats},
    state::AppState,
    utils,
};

/// Queue a URL for download (POST /api/add_url)
///
/// ## Flow:
/// 1. Require a JSON body no larger than `server.max_payload_bytes`
/// 2. Reject a missing or blank `url` with 400
/// 3. Record it as `Queued` and push it onto the submission queue
///
/// The URL itself is not validated here: malformed identifiers are accepted
/// and end up in the failed bucket once a worker looks at them.
pub async fn add_url(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, ApiError> {
    utils::require_json(&headers)?;

    let limit = state.config.server.max_payload_bytes.as_usize();
    let bytes = utils::read_body(body, limit).await?;
    let request: AddUrlRequest = serde_json::from_slice(&bytes)?;

    let url = request.url.unwrap_or_default();
    let generation = state.broker.submit(&url)?;
    state.metrics.job_accepted();

    info!(url = url.trim(), generation, "URL accepted");

    Ok(Json(AddUrlResponse {
        success: true,
        message: "URL added to queue.".to_string(),
    }))
}

/// Snapshot of every known URL by state (GET /api/status)
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.ledger().snapshot())
}

/// Files in the output directory, newest name first (GET /api/downloaded_files)
pub async fn downloaded_files(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let files = state.storage.list().await?;
    Ok(Json(files))
}

/// Remove one downloaded file (DELETE /api/downloaded_files/{name})
pub async fn delete_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.storage.remove(&name).await?;

    Ok(Json(DeleteFileResponse {
        success: true,
        deleted: name,
    }))
}

/// Health check endpoint (GET /health)
///
/// Components:
/// - api: this server
/// - workers: `healthy` while the pool accepts work
/// - output_dir: `healthy` unless the path exists and is not a directory
///
/// Returns 503 Service Unavailable if any component is unhealthy.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = BTreeMap::new();

    components.insert("api".to_string(), "healthy".to_string());

    let workers = if state.pool.is_closed() { "stopped" } else { "healthy" };
    components.insert("workers".to_string(), workers.to_string());

    let output_dir = match tokio::fs::metadata(state.storage.root()).await {
        Ok(meta) if !meta.is_dir() => "unhealthy",
        _ => "healthy",
    };
    components.insert("output_dir".to_string(), output_dir.to_string());

    let all_healthy = components.values().all(|status| status == "healthy");
    let (status_code, overall_status) = if all_healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    let response = HealthResponse {
        status: overall_status.to_string(),
        components,
        metrics: state.metrics.snapshot(),
        workers: WorkerStats {
            capacity: state.pool.capacity(),
            active: state.pool.active(),
            pending: state.broker.pending(),
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}
