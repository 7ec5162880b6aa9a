use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::debug;

use super::state::{WorkItem, WorkState};

/// In-memory status ledger shared by the HTTP layer and the worker pool
///
/// Every read and write goes through one mutex. Critical sections are a
/// single map mutation or a full copy of the map; nothing awaits while the
/// lock is held, and the unit of work itself never runs under it.
///
/// Each submission stamps the entry with a fresh generation. Workers carry
/// the generation they started with, so a terminal write from an execution
/// that was superseded by a re-submission is discarded instead of
/// clobbering the new `Queued` state.
#[derive(Debug, Default)]
pub struct StatusLedger {
    inner: Mutex<Entries>,
    settled: Notify,
}

#[derive(Debug, Default)]
struct Entries {
    items: HashMap<String, WorkItem>,
    last_generation: u64,
}

impl Entries {
    fn next_generation(&mut self) -> u64 {
        self.last_generation += 1;
        self.last_generation
    }
}

impl StatusLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        // A panic while holding the guard cannot leave a half-written entry
        // behind (every mutation is a single insert), so poisoning is ignored.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Upsert the state for a URL
    ///
    /// Setting `Queued` counts as a fresh submission and starts a new
    /// generation. Any other state keeps the current generation.
    pub fn set(&self, url: &str, state: WorkState) {
        let terminal = state.is_terminal();
        {
            let mut entries = self.lock();
            let now = Utc::now();
            let fresh = matches!(state, WorkState::Queued);
            let generation = match entries.items.get(url) {
                Some(existing) if !fresh => existing.generation,
                _ => entries.next_generation(),
            };
            let submitted_at = match entries.items.get(url) {
                Some(existing) if !fresh => existing.submitted_at,
                _ => now,
            };

            entries.items.insert(
                url.to_string(),
                WorkItem {
                    url: url.to_string(),
                    state,
                    generation,
                    submitted_at,
                    updated_at: now,
                },
            );
        }

        if terminal {
            self.settled.notify_waiters();
        }
    }

    /// Register a submission, resetting any previous state to `Queued`
    ///
    /// Returns the generation assigned to this submission.
    pub fn submit(&self, url: &str) -> u64 {
        let mut entries = self.lock();
        let generation = entries.next_generation();
        let now = Utc::now();
        entries.items.insert(
            url.to_string(),
            WorkItem {
                url: url.to_string(),
                state: WorkState::Queued,
                generation,
                submitted_at: now,
                updated_at: now,
            },
        );
        generation
    }

    /// Move a `Queued` entry to `Running`
    ///
    /// Returns the generation the caller must present when finishing, or
    /// `None` when the entry is missing or not queued (a duplicate queue
    /// copy of a URL that was already picked up).
    pub fn begin(&self, url: &str) -> Option<u64> {
        let mut entries = self.lock();
        let item = entries.items.get_mut(url)?;
        if item.state != WorkState::Queued {
            return None;
        }
        item.state = WorkState::Running;
        item.updated_at = Utc::now();
        Some(item.generation)
    }

    /// Record the terminal state of an execution started at `generation`
    ///
    /// Returns `false` when the write was discarded because the entry has
    /// been re-submitted since.
    pub fn finish(&self, url: &str, generation: u64, state: WorkState) -> bool {
        debug_assert!(state.is_terminal());
        let applied = {
            let mut entries = self.lock();
            match entries.items.get_mut(url) {
                Some(item) if item.generation == generation && item.state == WorkState::Running => {
                    item.state = state;
                    item.updated_at = Utc::now();
                    true
                }
                _ => false,
            }
        };

        if applied {
            self.settled.notify_waiters();
        } else {
            debug!(url, generation, "Discarding stale terminal state");
        }
        applied
    }

    pub fn get(&self, url: &str) -> Option<WorkItem> {
        self.lock().items.get(url).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries that are queued or running
    pub fn active_count(&self) -> usize {
        self.lock()
            .items
            .values()
            .filter(|item| !item.state.is_terminal())
            .count()
    }

    /// Consistent point-in-time view of every entry, grouped by bucket
    pub fn snapshot(&self) -> StatusReport {
        let mut items: Vec<WorkItem> = {
            let entries = self.lock();
            entries.items.values().cloned().collect()
        };

        // Generations are handed out in submission order
        items.sort_by_key(|item| item.generation);

        let mut report = StatusReport::default();
        for item in items {
            match item.state {
                WorkState::Running => report.downloading.push(item.url),
                WorkState::Queued => report.queued.push(item.url),
                WorkState::Succeeded => report.completed.push(item.url),
                WorkState::Failed(reason) => report.failed.push(FailedEntry {
                    url: item.url,
                    error: reason.to_string(),
                    code: reason.code().to_string(),
                }),
            }
        }
        report
    }

    /// Resolve once nothing is queued or running
    pub async fn wait_settled(&self) {
        loop {
            let notified = self.settled.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.active_count() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Status report served to the HTTP layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub downloading: Vec<String>,
    pub queued: Vec<String>,
    pub completed: Vec<String>,
    pub failed: Vec<FailedEntry>,
}

impl StatusReport {
    pub fn total(&self) -> usize {
        self.downloading.len() + self.queued.len() + self.completed.len() + self.failed.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedEntry {
    pub url: String,
    pub error: String,
    pub code: String,
}
