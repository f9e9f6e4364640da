//! Execution failure log.
//!
//! Every transaction dropped during packing or rejected during block
//! re-execution leaves a `(height, txid) -> (code, reason)` record here for
//! post-mortem inspection.

use crate::keyed_store::{KeyedStore, StoreChanges, StoreUndo};
use serde::{Deserialize, Serialize};
use shared_types::TxId;
use std::ops::Bound;

/// One recorded execution failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecFailure {
    /// Reject code of the failure.
    pub code: u32,
    /// Human-readable reason.
    pub reason: String,
}

/// Change set drained from an exec-log child layer.
pub type ExecLogChanges = StoreChanges<(u32, TxId), ExecFailure>;

/// Undo log of an exec-log cache.
pub type ExecLogUndo = StoreUndo<(u32, TxId), ExecFailure>;

/// Layered execution failure log.
#[derive(Debug)]
pub struct ExecLogCache<'a> {
    failures: KeyedStore<'a, (u32, TxId), ExecFailure>,
}

impl ExecLogCache<'static> {
    /// Create a root cache.
    pub fn root() -> Self {
        Self {
            failures: KeyedStore::root("exec_log"),
        }
    }
}

impl<'a> ExecLogCache<'a> {
    /// Create a child layer over this cache.
    pub fn fork(&self) -> ExecLogCache<'_> {
        ExecLogCache {
            failures: self.failures.fork(),
        }
    }

    /// Record a failed execution.
    pub fn set_execute_fail(&mut self, height: u32, txid: TxId, code: u32, reason: String) {
        tracing::debug!(height, txid = %hex::encode(txid), code, %reason, "transaction execution failed");
        self.failures.set((height, txid), ExecFailure { code, reason });
    }

    /// The failure recorded for a transaction at a height, if any.
    pub fn get_failure(&self, height: u32, txid: &TxId) -> Option<ExecFailure> {
        self.failures.get(&(height, *txid))
    }

    /// All failures recorded at a height.
    pub fn failures_at(&self, height: u32) -> Vec<(TxId, ExecFailure)> {
        let low = (height, [0u8; 32]);
        let high = (height, [0xFF; 32]);
        self.failures
            .collect_range(Bound::Included(&low), Bound::Included(&high))
            .into_iter()
            .map(|((_, txid), failure)| (txid, failure))
            .collect()
    }

    /// Drain this layer into a change set for the parent.
    pub fn into_changes(self) -> ExecLogChanges {
        self.failures.into_changes()
    }

    /// Apply a child's change set.
    pub fn apply_changes(&mut self, changes: ExecLogChanges) {
        self.failures.apply_changes(changes);
    }

    /// Start recording an undo log.
    pub fn enable_undo(&mut self) {
        self.failures.enable_undo();
    }

    /// Take the recorded log.
    pub fn take_undo(&mut self) -> ExecLogUndo {
        self.failures.take_undo()
    }

    /// Stop recording.
    pub fn disable_undo(&mut self) {
        self.failures.disable_undo();
    }

    /// Apply an undo log in reverse.
    pub fn apply_undo(&mut self, undo: ExecLogUndo) {
        self.failures.apply_undo(undo);
    }
}
