use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::ledger::FailureReason;

/// Errors a unit of work can end with
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("'{tool}' command not found")]
    ToolNotFound { tool: String },

    #[error("process exited unsuccessfully ({code:?}): {diagnostics}")]
    NonZeroExit {
        code: Option<i32>,
        diagnostics: String,
    },

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FetchError>;

impl From<FetchError> for FailureReason {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::ToolNotFound { tool } => FailureReason::ToolNotFound { tool },
            FetchError::NonZeroExit { code, diagnostics } => {
                FailureReason::ExitStatus { code, diagnostics }
            }
            FetchError::TimedOut(limit) => FailureReason::TimedOut {
                secs: limit.as_secs(),
            },
            FetchError::Io(e) => FailureReason::fault(e.to_string()),
        }
    }
}

/// The fetch-and-transcode step run for one URL
///
/// Implementations may take minutes and are always invoked outside the
/// ledger lock. They report through their return value only; recording
/// the outcome is the worker pool's job.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download and convert the resource behind `url`
    async fn fetch(&self, url: &str) -> Result<()>;

    /// Name of the external tool, for logs and health output
    fn tool(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_maps_to_failure_reason() {
        let reason: FailureReason = FetchError::ToolNotFound {
            tool: "yt-dlp".to_string(),
        }
        .into();
        assert_eq!(reason.code(), "TOOL_NOT_FOUND");

        let reason: FailureReason = FetchError::NonZeroExit {
            code: Some(2),
            diagnostics: "ERROR: boom".to_string(),
        }
        .into();
        assert_eq!(reason.to_string(), "exited with code 2: ERROR: boom");

        let reason: FailureReason = FetchError::TimedOut(Duration::from_secs(90)).into();
        assert_eq!(reason, FailureReason::TimedOut { secs: 90 });

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let reason: FailureReason = FetchError::Io(io).into();
        assert_eq!(reason.code(), "FAULT");
        assert!(reason.to_string().contains("denied"));
    }
}
