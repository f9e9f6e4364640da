//! Single-value cache tier.
//!
//! Some state is one global value rather than a keyed family, like the
//! CDP aggregates. A `ScalarStore` is a `KeyedStore` with a unit
//! key and a friendlier surface.

use crate::keyed_store::{KeyedStore, StoreChanges, StoreUndo};

/// Change set drained from a scalar child layer.
pub type ScalarChanges<V> = StoreChanges<(), V>;

/// Undo log of a scalar store.
pub type ScalarUndo<V> = StoreUndo<(), V>;

/// One layer of a copy-on-write single-value view chain.
#[derive(Debug)]
pub struct ScalarStore<'a, V: Clone> {
    inner: KeyedStore<'a, (), V>,
}

impl<V: Clone> ScalarStore<'static, V> {
    /// Create a root store.
    pub fn root(label: &'static str) -> Self {
        Self {
            inner: KeyedStore::root(label),
        }
    }
}

impl<'a, V: Clone> ScalarStore<'a, V> {
    /// Create a child layer over this store.
    pub fn fork(&self) -> ScalarStore<'_, V> {
        ScalarStore {
            inner: self.inner.fork(),
        }
    }

    /// Current value, if ever set.
    pub fn get(&self) -> Option<V> {
        self.inner.get(&())
    }

    /// Overwrite the value.
    pub fn set(&mut self, value: V) {
        self.inner.set((), value);
    }

    /// Drain this layer into a change set for the parent.
    pub fn into_changes(self) -> ScalarChanges<V> {
        self.inner.into_changes()
    }

    /// Apply a child's change set.
    pub fn apply_changes(&mut self, changes: ScalarChanges<V>) {
        self.inner.apply_changes(changes);
    }

    /// Start recording an undo log.
    pub fn enable_undo(&mut self) {
        self.inner.enable_undo();
    }

    /// Take the recorded log.
    pub fn take_undo(&mut self) -> ScalarUndo<V> {
        self.inner.take_undo()
    }

    /// Stop recording.
    pub fn disable_undo(&mut self) {
        self.inner.disable_undo();
    }

    /// Apply an undo log in reverse.
    pub fn apply_undo(&mut self, log: ScalarUndo<V>) {
        self.inner.apply_undo(log);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_reads_none() {
        let store: ScalarStore<'static, u64> = ScalarStore::root("scalar");
        assert_eq!(store.get(), None);
    }

    #[test]
    fn test_child_overrides_parent() {
        let mut parent = ScalarStore::root("scalar");
        parent.set(10u64);

        let mut child = parent.fork();
        assert_eq!(child.get(), Some(10));
        child.set(20);
        assert_eq!(child.get(), Some(20));
        assert_eq!(parent.get(), Some(10));
    }

    #[test]
    fn test_flush_and_undo() {
        let mut parent = ScalarStore::root("scalar");
        parent.set(1u64);
        parent.enable_undo();

        let changes = {
            let mut child = parent.fork();
            child.set(2);
            child.into_changes()
        };
        parent.apply_changes(changes);
        assert_eq!(parent.get(), Some(2));

        let log = parent.take_undo();
        parent.apply_undo(log);
        assert_eq!(parent.get(), Some(1));
    }
}
