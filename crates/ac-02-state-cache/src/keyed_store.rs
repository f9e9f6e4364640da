//! Versioned key-value cache tier.
//!
//! A `KeyedStore` is one layer of a copy-on-write view chain: it holds an
//! optional reference to a parent layer and a local map of pending writes,
//! where a `None` entry is a tombstone shadowing the parent. The root layer
//! has no parent and owns the committed state.
//!
//! Committing moves entries up: `into_changes` drains the local layer and
//! the caller applies the change set to the parent once the child borrow
//! ends. Dropping a layer without taking its changes discards them.
//!
//! When an undo log is attached, every write records the previously
//! *visible* value for its key; applying the log in reverse restores the
//! visible state exactly.

use std::collections::BTreeMap;
use std::ops::Bound;

/// Pending writes drained from a child layer. `None` values are tombstones.
#[derive(Debug, Default)]
pub struct StoreChanges<K, V>(pub(crate) BTreeMap<K, Option<V>>);

impl<K, V> StoreChanges<K, V> {
    /// Number of keys touched.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no keys were touched.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Undo log for one store: (key, previously visible value), oldest first.
pub type StoreUndo<K, V> = Vec<(K, Option<V>)>;

/// One layer of a copy-on-write key-value view chain.
#[derive(Debug)]
pub struct KeyedStore<'a, K: Ord + Clone, V: Clone> {
    label: &'static str,
    parent: Option<&'a KeyedStore<'a, K, V>>,
    entries: BTreeMap<K, Option<V>>,
    undo: Option<StoreUndo<K, V>>,
}

impl<K: Ord + Clone, V: Clone> KeyedStore<'static, K, V> {
    /// Create a root store owning committed state.
    pub fn root(label: &'static str) -> Self {
        KeyedStore {
            label,
            parent: None,
            entries: BTreeMap::new(),
            undo: None,
        }
    }
}

impl<'a, K: Ord + Clone, V: Clone> KeyedStore<'a, K, V> {
    /// Create a child layer over this store. O(1).
    pub fn fork(&self) -> KeyedStore<'_, K, V> {
        KeyedStore {
            label: self.label,
            parent: Some(self),
            entries: BTreeMap::new(),
            undo: None,
        }
    }

    /// Store label, used in logs.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Look a key up, falling through tombstone-free misses to the parent.
    pub fn get(&self, key: &K) -> Option<V> {
        match self.entries.get(key) {
            Some(Some(value)) => Some(value.clone()),
            Some(None) => None,
            None => self.parent.and_then(|p| p.get(key)),
        }
    }

    /// True when the key resolves to a live value.
    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Write a value.
    pub fn set(&mut self, key: K, value: V) {
        self.record_undo(&key);
        self.entries.insert(key, Some(value));
    }

    /// Delete a key (records a tombstone shadowing the parent).
    pub fn erase(&mut self, key: &K) {
        self.record_undo(key);
        self.entries.insert(key.clone(), None);
    }

    fn record_undo(&mut self, key: &K) {
        if self.undo.is_some() {
            let prev = self.get(key);
            if let Some(log) = self.undo.as_mut() {
                log.push((key.clone(), prev));
            }
        }
    }

    /// Collect the live values in `range`, merging all layers. Tombstones in
    /// child layers win over parent values.
    pub fn collect_range(&self, low: Bound<&K>, high: Bound<&K>) -> BTreeMap<K, V> {
        let mut out = BTreeMap::new();
        self.collect_range_into(low, high, &mut out);
        out
    }

    fn collect_range_into(&self, low: Bound<&K>, high: Bound<&K>, out: &mut BTreeMap<K, V>) {
        if let Some(parent) = self.parent {
            parent.collect_range_into(low, high, out);
        }
        for (key, entry) in self.entries.range((low, high)) {
            match entry {
                Some(value) => {
                    out.insert(key.clone(), value.clone());
                }
                None => {
                    out.remove(key);
                }
            }
        }
    }

    /// All live entries across every layer.
    pub fn collect_all(&self) -> BTreeMap<K, V> {
        self.collect_range(Bound::Unbounded, Bound::Unbounded)
    }

    /// Number of locally pending writes (including tombstones).
    pub fn dirty_count(&self) -> usize {
        self.entries.len()
    }

    /// Drain this layer into a change set for the parent.
    pub fn into_changes(self) -> StoreChanges<K, V> {
        StoreChanges(self.entries)
    }

    /// Apply a child's change set to this layer. Writes are recorded in the
    /// undo log like any other.
    pub fn apply_changes(&mut self, changes: StoreChanges<K, V>) {
        for (key, entry) in changes.0 {
            self.record_undo(&key);
            self.entries.insert(key, entry);
        }
    }

    /// Start recording an undo log (clears any previous log).
    pub fn enable_undo(&mut self) {
        self.undo = Some(Vec::new());
    }

    /// Take the recorded log, leaving recording armed with a fresh log.
    pub fn take_undo(&mut self) -> StoreUndo<K, V> {
        self.undo.replace(Vec::new()).unwrap_or_default()
    }

    /// Stop recording.
    pub fn disable_undo(&mut self) {
        self.undo = None;
    }

    /// Apply an undo log in reverse, restoring the visible value of every
    /// touched key.
    pub fn apply_undo(&mut self, log: StoreUndo<K, V>) {
        for (key, prev) in log.into_iter().rev() {
            self.entries.insert(key, prev);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> KeyedStore<'static, u32, String> {
        KeyedStore::root("test")
    }

    #[test]
    fn test_set_get_erase() {
        let mut store = root();
        store.set(1, "a".into());
        assert_eq!(store.get(&1), Some("a".into()));

        store.erase(&1);
        assert_eq!(store.get(&1), None);
    }

    #[test]
    fn test_child_reads_through_to_parent() {
        let mut parent = root();
        parent.set(1, "committed".into());

        let child = parent.fork();
        assert_eq!(child.get(&1), Some("committed".into()));
    }

    #[test]
    fn test_child_tombstone_shadows_parent() {
        let mut parent = root();
        parent.set(1, "committed".into());

        let mut child = parent.fork();
        child.erase(&1);
        assert_eq!(child.get(&1), None);
        assert_eq!(parent.get(&1), Some("committed".into()));
    }

    #[test]
    fn test_flush_moves_entries_up() {
        let mut parent = root();
        let changes = {
            let mut child = parent.fork();
            child.set(7, "x".into());
            child.into_changes()
        };
        parent.apply_changes(changes);
        assert_eq!(parent.get(&7), Some("x".into()));
    }

    #[test]
    fn test_drop_discards_child_writes() {
        let mut parent = root();
        parent.set(1, "a".into());
        {
            let mut child = parent.fork();
            child.set(1, "b".into());
            child.set(2, "c".into());
            // dropped without taking changes
        }
        assert_eq!(parent.get(&1), Some("a".into()));
        assert_eq!(parent.get(&2), None);
    }

    #[test]
    fn test_undo_restores_previous_values() {
        let mut store = root();
        store.set(1, "one".into());

        store.enable_undo();
        store.set(1, "changed".into());
        store.set(2, "new".into());
        store.erase(&1);

        let log = store.take_undo();
        store.apply_undo(log);

        assert_eq!(store.get(&1), Some("one".into()));
        assert_eq!(store.get(&2), None);
    }

    #[test]
    fn test_undo_restores_value_seen_through_parent() {
        let mut parent = root();
        parent.set(1, "base".into());

        let mut child = parent.fork();
        child.enable_undo();
        child.set(1, "override".into());

        let log = child.take_undo();
        child.apply_undo(log);
        assert_eq!(child.get(&1), Some("base".into()));
    }

    #[test]
    fn test_collect_range_merges_layers() {
        let mut parent = root();
        parent.set(1, "a".into());
        parent.set(2, "b".into());
        parent.set(3, "c".into());

        let mut child = parent.fork();
        child.set(2, "b2".into());
        child.erase(&3);
        child.set(4, "d".into());

        let all = child.collect_all();
        assert_eq!(all.len(), 3);
        assert_eq!(all.get(&1), Some(&"a".to_string()));
        assert_eq!(all.get(&2), Some(&"b2".to_string()));
        assert_eq!(all.get(&4), Some(&"d".to_string()));

        let upper = child.collect_range(Bound::Included(&2), Bound::Unbounded);
        assert_eq!(upper.len(), 2);
    }

    #[test]
    fn test_flush_records_undo_at_parent() {
        let mut parent = root();
        parent.set(1, "old".into());
        parent.enable_undo();

        let changes = {
            let mut child = parent.fork();
            child.set(1, "new".into());
            child.into_changes()
        };
        parent.apply_changes(changes);
        assert_eq!(parent.get(&1), Some("new".into()));

        let log = parent.take_undo();
        parent.apply_undo(log);
        assert_eq!(parent.get(&1), Some("old".into()));
    }
}
