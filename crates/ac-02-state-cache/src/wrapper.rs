//! The cache wrapper: one scratch view over the whole state.
//!
//! Block assembly, validation and reorganization all manipulate state
//! through a `CacheWrapper`. Forking one is O(1): each typed cache merely
//! points at its parent, and nothing reaches the parent until the child's
//! change set is applied. Undo logs recorded per transaction aggregate into
//! a `BlockUndo`, consumed in reverse to disconnect a block.

use crate::accounts::{AccountCache, AccountChanges, AccountUndo};
use crate::cdp::{CdpCache, CdpChanges, CdpUndo};
use crate::delegates::{DelegateCache, DelegateChanges, DelegateUndo};
use crate::execlog::{ExecLogCache, ExecLogChanges, ExecLogUndo};
use crate::prices::{PriceChanges, PricePointCache, PriceUndo};
use crate::sysparams::{SysParamCache, SysParamChanges, SysParamUndo};
use crate::txseen::{TxSeenCache, TxSeenChanges, TxSeenUndo};

/// Change sets of every typed cache, drained from one child wrapper.
#[derive(Debug)]
pub struct CacheChanges {
    sys_params: SysParamChanges,
    accounts: AccountChanges,
    delegates: DelegateChanges,
    cdps: CdpChanges,
    tx_seen: TxSeenChanges,
    prices: PriceChanges,
    exec_log: ExecLogChanges,
}

/// Undo log of one transaction's writes across every typed cache.
#[derive(Debug, Default)]
pub struct TxUndo {
    sys_params: SysParamUndo,
    accounts: AccountUndo,
    delegates: DelegateUndo,
    cdps: CdpUndo,
    tx_seen: TxSeenUndo,
    prices: PriceUndo,
    exec_log: ExecLogUndo,
}

/// Undo logs for a whole block, one entry per executed transaction in block
/// order.
#[derive(Debug, Default)]
pub struct BlockUndo {
    /// Per-transaction undo logs, block order.
    pub tx_undos: Vec<TxUndo>,
}

/// Aggregate scratch view over all state domains.
#[derive(Debug)]
pub struct CacheWrapper<'a> {
    /// Governed parameter table.
    pub sys_params: SysParamCache<'a>,
    /// Accounts and the keyid index.
    pub accounts: AccountCache<'a>,
    /// Delegate votes.
    pub delegates: DelegateCache<'a>,
    /// CDP engine: positions, aggregates, ratio index.
    pub cdps: CdpCache<'a>,
    /// Confirmed transaction ids.
    pub tx_seen: TxSeenCache<'a>,
    /// Price feeds and medians.
    pub prices: PricePointCache<'a>,
    /// Execution failure log.
    pub exec_log: ExecLogCache<'a>,
}

impl CacheWrapper<'static> {
    /// Create the root wrapper owning committed state.
    pub fn root() -> Self {
        Self {
            sys_params: SysParamCache::root(),
            accounts: AccountCache::root(),
            delegates: DelegateCache::root(),
            cdps: CdpCache::root(),
            tx_seen: TxSeenCache::root(),
            prices: PricePointCache::root(),
            exec_log: ExecLogCache::root(),
        }
    }
}

impl<'a> CacheWrapper<'a> {
    /// Fork a scratch view over this wrapper. O(1).
    pub fn fork(&self) -> CacheWrapper<'_> {
        CacheWrapper {
            sys_params: self.sys_params.fork(),
            accounts: self.accounts.fork(),
            delegates: self.delegates.fork(),
            cdps: self.cdps.fork(),
            tx_seen: self.tx_seen.fork(),
            prices: self.prices.fork(),
            exec_log: self.exec_log.fork(),
        }
    }

    /// Drain this scratch view into a change set for its parent.
    pub fn into_changes(self) -> CacheChanges {
        CacheChanges {
            sys_params: self.sys_params.into_changes(),
            accounts: self.accounts.into_changes(),
            delegates: self.delegates.into_changes(),
            cdps: self.cdps.into_changes(),
            tx_seen: self.tx_seen.into_changes(),
            prices: self.prices.into_changes(),
            exec_log: self.exec_log.into_changes(),
        }
    }

    /// Apply a child's change set, cache by cache in fixed order.
    pub fn apply(&mut self, changes: CacheChanges) {
        self.sys_params.apply_changes(changes.sys_params);
        self.accounts.apply_changes(changes.accounts);
        self.delegates.apply_changes(changes.delegates);
        self.cdps.apply_changes(changes.cdps);
        self.tx_seen.apply_changes(changes.tx_seen);
        self.prices.apply_changes(changes.prices);
        self.exec_log.apply_changes(changes.exec_log);
    }

    /// Start recording undo logs on every cache.
    pub fn enable_undo(&mut self) {
        self.sys_params.enable_undo();
        self.accounts.enable_undo();
        self.delegates.enable_undo();
        self.cdps.enable_undo();
        self.tx_seen.enable_undo();
        self.prices.enable_undo();
        self.exec_log.enable_undo();
    }

    /// Take the logs recorded since the last take as one transaction's undo.
    pub fn take_undo(&mut self) -> TxUndo {
        TxUndo {
            sys_params: self.sys_params.take_undo(),
            accounts: self.accounts.take_undo(),
            delegates: self.delegates.take_undo(),
            cdps: self.cdps.take_undo(),
            tx_seen: self.tx_seen.take_undo(),
            prices: self.prices.take_undo(),
            exec_log: self.exec_log.take_undo(),
        }
    }

    /// Stop recording undo logs.
    pub fn disable_undo(&mut self) {
        self.sys_params.disable_undo();
        self.accounts.disable_undo();
        self.delegates.disable_undo();
        self.cdps.disable_undo();
        self.tx_seen.disable_undo();
        self.prices.disable_undo();
        self.exec_log.disable_undo();
    }

    /// Reverse one transaction's writes.
    pub fn apply_tx_undo(&mut self, undo: TxUndo) {
        self.sys_params.apply_undo(undo.sys_params);
        self.accounts.apply_undo(undo.accounts);
        self.delegates.apply_undo(undo.delegates);
        self.cdps.apply_undo(undo.cdps);
        self.tx_seen.apply_undo(undo.tx_seen);
        self.prices.apply_undo(undo.prices);
        self.exec_log.apply_undo(undo.exec_log);
    }

    /// Reverse a whole block, newest transaction first.
    pub fn apply_block_undo(&mut self, undo: BlockUndo) {
        for tx_undo in undo.tx_undos.into_iter().rev() {
            self.apply_tx_undo(tx_undo);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Account, KeyId, RegId, TokenSymbol};

    fn funded_account(height: u32, byte: u8, amount: u64) -> Account {
        let mut account = Account::new(RegId::new(height, 1), KeyId([byte; 20]), None);
        account.add_balance(TokenSymbol::Wicc, amount).unwrap();
        account
    }

    #[test]
    fn test_fork_then_flush_equals_direct_mutation() {
        let mut committed = CacheWrapper::root();
        let account = funded_account(3, 0x03, 900);

        let changes = {
            let mut scratch = committed.fork();
            scratch.accounts.set_account(&account);
            scratch.tx_seen.add_tx([0x03; 32]);
            scratch.into_changes()
        };
        committed.apply(changes);

        assert_eq!(committed.accounts.get_account(&account.regid), Some(account));
        assert!(committed.tx_seen.have_tx(&[0x03; 32]));
    }

    #[test]
    fn test_dropped_scratch_leaves_parent_unchanged() {
        let mut committed = CacheWrapper::root();
        committed.accounts.set_account(&funded_account(1, 0x01, 100));

        {
            let mut scratch = committed.fork();
            scratch.accounts.set_account(&funded_account(2, 0x02, 200));
            scratch.delegates.set_votes(RegId::new(2, 1), 777);
            // dropped
        }

        assert!(committed.accounts.get_account(&RegId::new(2, 1)).is_none());
        assert_eq!(committed.delegates.votes_of(&RegId::new(2, 1)), 0);
    }

    #[test]
    fn test_block_undo_reverses_txs_in_order() {
        let mut committed = CacheWrapper::root();
        let original = funded_account(1, 0x01, 1000);
        committed.accounts.set_account(&original);

        committed.enable_undo();
        let mut block_undo = BlockUndo::default();

        // tx 1: spend 300
        let mut step1 = original.clone();
        step1.sub_balance(TokenSymbol::Wicc, 300).unwrap();
        committed.accounts.set_account(&step1);
        block_undo.tx_undos.push(committed.take_undo());

        // tx 2: spend 200 more
        let mut step2 = step1.clone();
        step2.sub_balance(TokenSymbol::Wicc, 200).unwrap();
        committed.accounts.set_account(&step2);
        block_undo.tx_undos.push(committed.take_undo());

        committed.disable_undo();
        committed.apply_block_undo(block_undo);

        assert_eq!(
            committed.accounts.get_account(&original.regid),
            Some(original)
        );
    }
}
