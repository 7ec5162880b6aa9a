//! Status ledger: the single source of truth for per-URL lifecycle state
//!
//! The ledger lives in memory for the lifetime of the process. The HTTP
//! layer writes `Queued` entries on submission and reads snapshots for
//! status queries; workers move entries through `Running` into a terminal
//! state.
//!
//! ## Usage
//!
//! ```rust
//! use grabbox::ledger::{StatusLedger, WorkState};
//!
//! let ledger = StatusLedger::new();
//! ledger.submit("https://example.com/watch?v=1");
//!
//! let generation = ledger.begin("https://example.com/watch?v=1").unwrap();
//! ledger.finish("https://example.com/watch?v=1", generation, WorkState::Succeeded);
//!
//! assert_eq!(ledger.snapshot().completed.len(), 1);
//! ```

pub mod state;
pub mod store;

pub use state::{FailureReason, WorkItem, WorkState};
pub use store::{FailedEntry, StatusLedger, StatusReport};
