//! Delegate vote cache.
//!
//! Tracks votes received per delegate and answers the top-N query that
//! seeds every epoch's producer schedule.

use crate::keyed_store::{KeyedStore, StoreChanges, StoreUndo};
use shared_types::RegId;
use std::cmp::Reverse;

/// Change set drained from a delegate cache child layer.
pub type DelegateChanges = StoreChanges<RegId, u64>;

/// Undo log of a delegate cache.
pub type DelegateUndo = StoreUndo<RegId, u64>;

/// Layered delegate vote view.
#[derive(Debug)]
pub struct DelegateCache<'a> {
    votes: KeyedStore<'a, RegId, u64>,
}

impl DelegateCache<'static> {
    /// Create a root cache.
    pub fn root() -> Self {
        Self {
            votes: KeyedStore::root("delegate"),
        }
    }
}

impl<'a> DelegateCache<'a> {
    /// Create a child layer over this cache.
    pub fn fork(&self) -> DelegateCache<'_> {
        DelegateCache {
            votes: self.votes.fork(),
        }
    }

    /// Record the votes a delegate has received.
    pub fn set_votes(&mut self, regid: RegId, votes: u64) {
        self.votes.set(regid, votes);
    }

    /// Votes received by a delegate.
    pub fn votes_of(&self, regid: &RegId) -> u64 {
        self.votes.get(regid).unwrap_or(0)
    }

    /// The top `n` delegates ordered by (votes desc, regid asc). Ties on
    /// votes resolve by regid so every node computes the same committee.
    pub fn top_delegates(&self, n: usize) -> Vec<RegId> {
        let mut ranked: Vec<(RegId, u64)> = self.votes.collect_all().into_iter().collect();
        ranked.sort_by_key(|(regid, votes)| (Reverse(*votes), *regid));
        ranked.into_iter().take(n).map(|(regid, _)| regid).collect()
    }

    /// Drain this layer into a change set for the parent.
    pub fn into_changes(self) -> DelegateChanges {
        self.votes.into_changes()
    }

    /// Apply a child's change set.
    pub fn apply_changes(&mut self, changes: DelegateChanges) {
        self.votes.apply_changes(changes);
    }

    /// Start recording an undo log.
    pub fn enable_undo(&mut self) {
        self.votes.enable_undo();
    }

    /// Take the recorded log.
    pub fn take_undo(&mut self) -> DelegateUndo {
        self.votes.take_undo()
    }

    /// Stop recording.
    pub fn disable_undo(&mut self) {
        self.votes.disable_undo();
    }

    /// Apply an undo log in reverse.
    pub fn apply_undo(&mut self, undo: DelegateUndo) {
        self.votes.apply_undo(undo);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_delegates_by_votes() {
        let mut cache = DelegateCache::root();
        cache.set_votes(RegId::new(1, 0), 100);
        cache.set_votes(RegId::new(2, 0), 300);
        cache.set_votes(RegId::new(3, 0), 200);

        let top = cache.top_delegates(2);
        assert_eq!(top, vec![RegId::new(2, 0), RegId::new(3, 0)]);
    }

    #[test]
    fn test_vote_ties_resolve_by_regid() {
        let mut cache = DelegateCache::root();
        cache.set_votes(RegId::new(9, 0), 50);
        cache.set_votes(RegId::new(1, 0), 50);

        let top = cache.top_delegates(2);
        assert_eq!(top, vec![RegId::new(1, 0), RegId::new(9, 0)]);
    }

    #[test]
    fn test_child_vote_overrides_rank() {
        let mut parent = DelegateCache::root();
        parent.set_votes(RegId::new(1, 0), 100);
        parent.set_votes(RegId::new(2, 0), 200);

        let mut child = parent.fork();
        child.set_votes(RegId::new(1, 0), 500);

        assert_eq!(child.top_delegates(1), vec![RegId::new(1, 0)]);
        assert_eq!(parent.top_delegates(1), vec![RegId::new(2, 0)]);
    }
}
