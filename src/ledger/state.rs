use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Lifecycle state of a single submitted URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum WorkState {
    Queued,
    Running,
    Succeeded,
    Failed(FailureReason),
}

impl WorkState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkState::Succeeded | WorkState::Failed(_))
    }
}

/// Why a unit of work ended in `Failed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// The identifier does not parse as a URL with a scheme
    InvalidFormat,
    /// The external tool could not be located
    ToolNotFound { tool: String },
    /// The external tool ran and exited unsuccessfully
    ExitStatus {
        code: Option<i32>,
        diagnostics: String,
    },
    /// The external tool exceeded the configured hard timeout
    TimedOut { secs: u64 },
    /// Anything else: spawn errors, panics, closed pool
    Fault { message: String },
}

impl FailureReason {
    pub fn fault(message: impl Into<String>) -> Self {
        FailureReason::Fault {
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::InvalidFormat => "INVALID_FORMAT",
            FailureReason::ToolNotFound { .. } => "TOOL_NOT_FOUND",
            FailureReason::ExitStatus { .. } => "EXIT_STATUS",
            FailureReason::TimedOut { .. } => "TIMED_OUT",
            FailureReason::Fault { .. } => "FAULT",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::InvalidFormat => {
                write!(f, "invalid format: URL must include a scheme such as https://")
            }
            FailureReason::ToolNotFound { tool } => write!(f, "tool not found: {tool}"),
            FailureReason::ExitStatus { code, diagnostics } => {
                match code {
                    Some(code) => write!(f, "exited with code {code}")?,
                    None => write!(f, "terminated by signal")?,
                }
                if !diagnostics.is_empty() {
                    write!(f, ": {diagnostics}")?;
                }
                Ok(())
            }
            FailureReason::TimedOut { secs } => write!(f, "timed out after {secs}s"),
            FailureReason::Fault { message } => write!(f, "unexpected error: {message}"),
        }
    }
}

/// Registry entry for one identifier
#[derive(Debug, Clone, Serialize)]
pub struct WorkItem {
    pub url: String,
    pub state: WorkState,
    /// Bumped on every submission; terminal writes must carry the current value
    pub generation: u64,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
