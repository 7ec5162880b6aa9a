//! Request and response bodies for the HTTP API
//!
//! Submitting a URL:
//!
//! ```json
//! { "url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ" }
//! ```
//!
//! `GET /api/status` returns a [`StatusReport`]:
//!
//! ```json
//! {
//!   "downloading": ["https://youtu.be/a"],
//!   "queued": ["https://youtu.be/b"],
//!   "completed": [],
//!   "failed": [
//!     { "url": "not-a-url", "error": "invalid format: ...", "code": "INVALID_FORMAT" }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::observability::MetricsSnapshot;

pub use crate::ledger::{FailedEntry, StatusReport};

#[derive(Debug, Deserialize)]
pub struct AddUrlRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AddUrlResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: String,
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DeleteFileResponse {
    pub success: bool,
    pub deleted: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: BTreeMap<String, String>,
    pub metrics: MetricsSnapshot,
    pub workers: WorkerStats,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct WorkerStats {
    pub capacity: usize,
    pub active: usize,
    pub pending: usize,
}
