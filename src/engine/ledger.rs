//! engine::ledger
//!
//! Bookkeeping of running operations.
//!
//! # Architecture
//!
//! The ledger counts running operations per [`OperationKind`]. It is not a
//! lock: any number of operations may run at once, and git's own lock file
//! plus the retry policy keep them safe. The ledger only answers questions:
//!
//! - is a given kind running?
//! - is the repository idle (no mutating operation in flight)?
//! - should a progress indicator be visible?
//!
//! Starts and finishes are published on a broadcast channel, and the idle
//! flag on a watch channel so background refreshes can wait for quiet.
//!
//! # Example
//!
//! ```ignore
//! use gitdeck::engine::ledger::OperationLedger;
//! use gitdeck::engine::operation::{Operation, OperationKind};
//!
//! let ledger = OperationLedger::new();
//! let guard = ledger.start(Operation::of(OperationKind::Commit));
//! assert!(!ledger.is_idle());
//! guard.finish(None);
//! assert!(ledger.is_idle());
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::debug;

use super::operation::{Operation, OperationKind};
use crate::git::{GitError, GitErrorKind};

const EVENT_CAPACITY: usize = 64;

/// Published when an operation starts or finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OperationEvent {
    Started {
        operation: Operation,
    },
    Finished {
        operation: Operation,
        /// False when the operation failed or was dropped before finishing.
        success: bool,
        error_kind: Option<GitErrorKind>,
    },
}

impl OperationEvent {
    pub fn operation(&self) -> &Operation {
        match self {
            Self::Started { operation } | Self::Finished { operation, .. } => operation,
        }
    }
}

#[derive(Debug)]
struct LedgerInner {
    running: Mutex<HashMap<OperationKind, usize>>,
    idle: watch::Sender<bool>,
    events: broadcast::Sender<OperationEvent>,
}

/// Counts of running operations. Cloning shares the same ledger.
#[derive(Debug, Clone)]
pub struct OperationLedger {
    inner: Arc<LedgerInner>,
}

impl Default for OperationLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationLedger {
    pub fn new() -> Self {
        let (idle, _) = watch::channel(true);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(LedgerInner {
                running: Mutex::new(HashMap::new()),
                idle,
                events,
            }),
        }
    }

    /// Record that `operation` started. The returned guard ends it.
    #[must_use = "dropping the guard ends the operation immediately"]
    pub fn start(&self, operation: Operation) -> OperationGuard {
        {
            let mut running = self.lock();
            *running.entry(operation.kind).or_insert(0) += 1;
            self.publish_idle(&running);
        }
        debug!(operation = %operation.kind, "operation started");
        let _ = self.inner.events.send(OperationEvent::Started { operation });
        OperationGuard {
            ledger: self.clone(),
            operation,
            finished: false,
        }
    }

    fn end(&self, operation: Operation, error: Option<&GitError>) {
        {
            let mut running = self.lock();
            if let Some(count) = running.get_mut(&operation.kind) {
                *count -= 1;
                if *count == 0 {
                    running.remove(&operation.kind);
                }
            }
            self.publish_idle(&running);
        }
        debug!(operation = %operation.kind, success = error.is_none(), "operation finished");
        let _ = self.inner.events.send(OperationEvent::Finished {
            operation,
            success: error.is_none(),
            error_kind: error.and_then(|e| e.kind),
        });
    }

    pub fn is_running(&self, kind: OperationKind) -> bool {
        self.lock().contains_key(&kind)
    }

    /// Kinds currently running, in no particular order.
    pub fn running(&self) -> Vec<OperationKind> {
        self.lock().keys().copied().collect()
    }

    /// True when no mutating operation is running.
    pub fn is_idle(&self) -> bool {
        Self::idle_in(&self.lock())
    }

    pub fn should_show_progress(&self) -> bool {
        self.lock()
            .keys()
            .any(|kind| Operation::of(*kind).show_progress)
    }

    /// Resolves once the ledger is idle; immediately when it already is.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.idle.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|idle| *idle).await;
    }

    /// Receiver for start and finish events.
    pub fn subscribe(&self) -> broadcast::Receiver<OperationEvent> {
        self.inner.events.subscribe()
    }

    // ========================================================================
    // Internal
    // ========================================================================

    fn lock(&self) -> MutexGuard<'_, HashMap<OperationKind, usize>> {
        // Counters stay consistent even if a holder panicked.
        self.inner
            .running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn idle_in(running: &HashMap<OperationKind, usize>) -> bool {
        running.keys().all(|kind| Operation::of(*kind).read_only)
    }

    fn publish_idle(&self, running: &HashMap<OperationKind, usize>) {
        let idle = Self::idle_in(running);
        self.inner.idle.send_if_modified(|current| {
            let changed = *current != idle;
            *current = idle;
            changed
        });
    }
}

/// Ends its operation when finished or dropped.
#[derive(Debug)]
pub struct OperationGuard {
    ledger: OperationLedger,
    operation: Operation,
    finished: bool,
}

impl OperationGuard {
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// End the operation, reporting its outcome.
    pub fn finish(mut self, error: Option<&GitError>) {
        self.finished = true;
        self.ledger.end(self.operation, error);
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        if !self.finished {
            let cancelled = GitError::other(format!("{} was cancelled", self.operation.kind));
            self.ledger.end(self.operation, Some(&cancelled));
        }
    }
}
