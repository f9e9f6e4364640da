//! System parameter cache.
//!
//! Governance writes land here; reads fall back to the built-in default for
//! any parameter never overridden.

use crate::keyed_store::{KeyedStore, StoreChanges, StoreUndo};
use ac_01_chain_params::SysParamType;

/// Change set drained from a sys-param child layer.
pub type SysParamChanges = StoreChanges<SysParamType, u64>;

/// Undo log of a sys-param cache.
pub type SysParamUndo = StoreUndo<SysParamType, u64>;

/// Layered view of the governed parameter table.
#[derive(Debug)]
pub struct SysParamCache<'a> {
    params: KeyedStore<'a, SysParamType, u64>,
}

impl SysParamCache<'static> {
    /// Create a root cache.
    pub fn root() -> Self {
        Self {
            params: KeyedStore::root("sys_param"),
        }
    }
}

impl<'a> SysParamCache<'a> {
    /// Create a child layer over this cache.
    pub fn fork(&self) -> SysParamCache<'_> {
        SysParamCache {
            params: self.params.fork(),
        }
    }

    /// Current value of a parameter, defaulting when never overridden.
    pub fn get_param(&self, param: SysParamType) -> u64 {
        self.params.get(&param).unwrap_or(param.default_value())
    }

    /// Override a parameter (governance path).
    pub fn set_param(&mut self, param: SysParamType, value: u64) {
        self.params.set(param, value);
    }

    /// Drain this layer into a change set for the parent.
    pub fn into_changes(self) -> SysParamChanges {
        self.params.into_changes()
    }

    /// Apply a child's change set.
    pub fn apply_changes(&mut self, changes: SysParamChanges) {
        self.params.apply_changes(changes);
    }

    /// Start recording an undo log.
    pub fn enable_undo(&mut self) {
        self.params.enable_undo();
    }

    /// Take the recorded log.
    pub fn take_undo(&mut self) -> SysParamUndo {
        self.params.take_undo()
    }

    /// Stop recording.
    pub fn disable_undo(&mut self) {
        self.params.disable_undo();
    }

    /// Apply an undo log in reverse.
    pub fn apply_undo(&mut self, undo: SysParamUndo) {
        self.params.apply_undo(undo);
    }
}
