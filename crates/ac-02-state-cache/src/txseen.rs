//! Confirmed-transaction id cache.
//!
//! Both the priority queue and the verifier consult this set to reject
//! transactions that are already on chain.

use crate::keyed_store::{KeyedStore, StoreChanges, StoreUndo};
use shared_types::TxId;

/// Change set drained from a tx-seen child layer.
pub type TxSeenChanges = StoreChanges<TxId, ()>;

/// Undo log of a tx-seen cache.
pub type TxSeenUndo = StoreUndo<TxId, ()>;

/// Layered view of confirmed transaction ids.
#[derive(Debug)]
pub struct TxSeenCache<'a> {
    seen: KeyedStore<'a, TxId, ()>,
}

impl TxSeenCache<'static> {
    /// Create a root cache.
    pub fn root() -> Self {
        Self {
            seen: KeyedStore::root("tx_seen"),
        }
    }
}

impl<'a> TxSeenCache<'a> {
    /// Create a child layer over this cache.
    pub fn fork(&self) -> TxSeenCache<'_> {
        TxSeenCache {
            seen: self.seen.fork(),
        }
    }

    /// True when the id is already confirmed.
    pub fn have_tx(&self, txid: &TxId) -> bool {
        self.seen.contains(txid)
    }

    /// Mark an id as confirmed.
    pub fn add_tx(&mut self, txid: TxId) {
        self.seen.set(txid, ());
    }

    /// Drop an id (used when a block is disconnected).
    pub fn remove_tx(&mut self, txid: &TxId) {
        self.seen.erase(txid);
    }

    /// Drain this layer into a change set for the parent.
    pub fn into_changes(self) -> TxSeenChanges {
        self.seen.into_changes()
    }

    /// Apply a child's change set.
    pub fn apply_changes(&mut self, changes: TxSeenChanges) {
        self.seen.apply_changes(changes);
    }

    /// Start recording an undo log.
    pub fn enable_undo(&mut self) {
        self.seen.enable_undo();
    }

    /// Take the recorded log.
    pub fn take_undo(&mut self) -> TxSeenUndo {
        self.seen.take_undo()
    }

    /// Stop recording.
    pub fn disable_undo(&mut self) {
        self.seen.disable_undo();
    }

    /// Apply an undo log in reverse.
    pub fn apply_undo(&mut self, undo: TxSeenUndo) {
        self.seen.apply_undo(undo);
    }
}
