//! Account cache: the primary regid-keyed store plus the keyid index.

use crate::keyed_store::{KeyedStore, StoreChanges, StoreUndo};
use shared_types::{Account, KeyId, RegId};

/// Change set drained from an account cache child layer.
#[derive(Debug)]
pub struct AccountChanges {
    by_regid: StoreChanges<RegId, Account>,
    regid_by_keyid: StoreChanges<KeyId, RegId>,
}

/// Undo log of an account cache.
#[derive(Debug, Default)]
pub struct AccountUndo {
    by_regid: StoreUndo<RegId, Account>,
    regid_by_keyid: StoreUndo<KeyId, RegId>,
}

/// Layered account state view.
#[derive(Debug)]
pub struct AccountCache<'a> {
    by_regid: KeyedStore<'a, RegId, Account>,
    regid_by_keyid: KeyedStore<'a, KeyId, RegId>,
}

impl AccountCache<'static> {
    /// Create a root cache.
    pub fn root() -> Self {
        Self {
            by_regid: KeyedStore::root("account"),
            regid_by_keyid: KeyedStore::root("account_index"),
        }
    }
}

impl<'a> AccountCache<'a> {
    /// Create a child layer over this cache.
    pub fn fork(&self) -> AccountCache<'_> {
        AccountCache {
            by_regid: self.by_regid.fork(),
            regid_by_keyid: self.regid_by_keyid.fork(),
        }
    }

    /// Look an account up by regid.
    pub fn get_account(&self, regid: &RegId) -> Option<Account> {
        self.by_regid.get(regid)
    }

    /// Look an account up by key id.
    pub fn get_account_by_keyid(&self, keyid: &KeyId) -> Option<Account> {
        self.regid_by_keyid
            .get(keyid)
            .and_then(|regid| self.by_regid.get(&regid))
    }

    /// Resolve a key id to its regid.
    pub fn get_regid(&self, keyid: &KeyId) -> Option<RegId> {
        self.regid_by_keyid.get(keyid)
    }

    /// True when the regid names a live account.
    pub fn have_account(&self, regid: &RegId) -> bool {
        self.by_regid.contains(regid)
    }

    /// Write an account, keeping the keyid index in step.
    pub fn set_account(&mut self, account: &Account) {
        self.regid_by_keyid.set(account.keyid, account.regid);
        self.by_regid.set(account.regid, account.clone());
    }

    /// All live accounts (test and tooling support).
    pub fn all_accounts(&self) -> Vec<Account> {
        self.by_regid.collect_all().into_values().collect()
    }

    /// Drain this layer into a change set for the parent.
    pub fn into_changes(self) -> AccountChanges {
        AccountChanges {
            by_regid: self.by_regid.into_changes(),
            regid_by_keyid: self.regid_by_keyid.into_changes(),
        }
    }

    /// Apply a child's change set.
    pub fn apply_changes(&mut self, changes: AccountChanges) {
        self.by_regid.apply_changes(changes.by_regid);
        self.regid_by_keyid.apply_changes(changes.regid_by_keyid);
    }

    /// Start recording an undo log.
    pub fn enable_undo(&mut self) {
        self.by_regid.enable_undo();
        self.regid_by_keyid.enable_undo();
    }

    /// Take the recorded log.
    pub fn take_undo(&mut self) -> AccountUndo {
        AccountUndo {
            by_regid: self.by_regid.take_undo(),
            regid_by_keyid: self.regid_by_keyid.take_undo(),
        }
    }

    /// Stop recording.
    pub fn disable_undo(&mut self) {
        self.by_regid.disable_undo();
        self.regid_by_keyid.disable_undo();
    }

    /// Apply an undo log in reverse.
    pub fn apply_undo(&mut self, undo: AccountUndo) {
        self.by_regid.apply_undo(undo.by_regid);
        self.regid_by_keyid.apply_undo(undo.regid_by_keyid);
    }
}
