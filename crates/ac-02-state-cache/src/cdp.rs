//! CDP accounting and the ratio-sorted liquidation index.
//!
//! A CDP stakes base coins and owes minted stable coins. The cache keeps,
//! besides the primary `cdpid -> UserCdp` store:
//!
//! - an owner index `regid -> set<cdpid>`,
//! - two global aggregates (total staked, total owed) that always equal the
//!   sums over live CDPs,
//! - a ratio index keyed `(format16hex(ratio_base), cdpid)` so that one
//!   ordered range scan yields every liquidation candidate at or below a
//!   ratio threshold.
//!
//! The pre-price collateral ratio base is fixed point at 1e8 scale; all
//! ratio arithmetic is integer, widened through u128.

use crate::keyed_store::{KeyedStore, StoreChanges, StoreUndo};
use crate::scalar_store::{ScalarChanges, ScalarStore, ScalarUndo};
use ac_01_chain_params::consensus::{CDP_RATIO_SCALE, PRICE_BOOST, RATIO_BOOST};
use serde::{Deserialize, Serialize};
use shared_types::{RegId, TokenSymbol, TxId, COIN};
use std::collections::BTreeSet;
use std::ops::Bound;
use thiserror::Error;

/// CDP mutation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CdpError {
    /// A CDP with this id already exists
    #[error("cdp {0} already exists")]
    AlreadyExists(String),

    /// No CDP with this id
    #[error("cdp {0} not found")]
    NotFound(String),
}

/// A user's collateralized debt position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCdp {
    /// Id of the transaction that opened the position.
    pub cdpid: TxId,
    /// Owning account.
    pub owner_regid: RegId,
    /// Height of the last mutation.
    pub block_height: u32,
    /// Staked collateral token.
    pub bcoin_symbol: TokenSymbol,
    /// Owed stable token.
    pub scoin_symbol: TokenSymbol,
    /// Total staked base coins.
    pub total_staked_bcoins: u64,
    /// Total owed stable coins.
    pub total_owed_scoins: u64,
    /// Pre-price ratio `staked / owed`, fixed point at 1e8 scale.
    pub collateral_ratio_base: u64,
}

impl UserCdp {
    /// Open a new position.
    pub fn new(
        owner_regid: RegId,
        cdpid: TxId,
        block_height: u32,
        staked_bcoins: u64,
        owed_scoins: u64,
    ) -> Self {
        let mut cdp = Self {
            cdpid,
            owner_regid,
            block_height,
            bcoin_symbol: TokenSymbol::Wicc,
            scoin_symbol: TokenSymbol::Wusd,
            total_staked_bcoins: staked_bcoins,
            total_owed_scoins: owed_scoins,
            collateral_ratio_base: 0,
        };
        cdp.update_ratio_base();
        cdp
    }

    /// Recompute the pre-price ratio base from the current amounts.
    pub fn update_ratio_base(&mut self) {
        self.collateral_ratio_base = if self.total_staked_bcoins != 0 && self.total_owed_scoins == 0
        {
            u64::MAX
        } else if self.total_staked_bcoins == 0 {
            0
        } else {
            let ratio = self.total_staked_bcoins as u128 * CDP_RATIO_SCALE as u128
                / self.total_owed_scoins as u128;
            ratio.min(u64::MAX as u128) as u64
        };
    }

    /// Collateral ratio at a live price, RATIO_BOOST scale.
    pub fn collateral_ratio(&self, bcoin_price: u64) -> u64 {
        if self.collateral_ratio_base == u64::MAX {
            return u64::MAX;
        }
        let ratio = self.collateral_ratio_base as u128 * bcoin_price as u128 * RATIO_BOOST as u128
            / PRICE_BOOST as u128
            / CDP_RATIO_SCALE as u128;
        ratio.min(u64::MAX as u128) as u64
    }

    /// Stake more collateral and mint more stable coins.
    pub fn add_stake(&mut self, block_height: u32, bcoins_to_stake: u64, minted_scoins: u64) {
        self.block_height = block_height;
        self.total_staked_bcoins = self.total_staked_bcoins.saturating_add(bcoins_to_stake);
        self.total_owed_scoins = self.total_owed_scoins.saturating_add(minted_scoins);
        self.update_ratio_base();
    }

    /// Repay stable coins and release collateral.
    pub fn redeem(&mut self, block_height: u32, bcoins_to_redeem: u64, scoins_to_repay: u64) {
        self.block_height = block_height;
        self.total_staked_bcoins = self.total_staked_bcoins.saturating_sub(bcoins_to_redeem);
        self.total_owed_scoins = self.total_owed_scoins.saturating_sub(scoins_to_repay);
        self.update_ratio_base();
    }

    /// Seize collateral against repaid debt during liquidation.
    pub fn liquidate_partial(
        &mut self,
        block_height: u32,
        bcoins_to_liquidate: u64,
        scoins_to_liquidate: u64,
    ) {
        self.redeem(block_height, bcoins_to_liquidate, scoins_to_liquidate);
    }

    /// True once nothing is staked or owed.
    pub fn is_finished(&self) -> bool {
        self.total_owed_scoins == 0 && self.total_staked_bcoins == 0
    }

    /// Ratio index key component for the current ratio base.
    pub fn ratio_key(&self) -> String {
        format16hex(self.collateral_ratio_base)
    }
}

/// Fixed-width hex so lexicographic key order equals numeric ratio order.
pub fn format16hex(value: u64) -> String {
    format!("{value:016x}")
}

/// Threshold index key for "every CDP liquidatable at `ratio` given
/// `price`": the pre-price ratio base below which the live ratio falls
/// under the target.
pub fn ratio_threshold_key(ratio: u64, bcoin_price: u64) -> String {
    if bcoin_price == 0 {
        return format16hex(u64::MAX);
    }
    let base = ratio as u128 * PRICE_BOOST as u128 * CDP_RATIO_SCALE as u128
        / RATIO_BOOST as u128
        / bcoin_price as u128;
    format16hex(base.min(u64::MAX as u128) as u64)
}

/// Change set drained from a CDP cache child layer.
#[derive(Debug)]
pub struct CdpChanges {
    global_staked: ScalarChanges<u64>,
    global_owed: ScalarChanges<u64>,
    cdps: StoreChanges<TxId, UserCdp>,
    by_owner: StoreChanges<RegId, BTreeSet<TxId>>,
    by_ratio: StoreChanges<(String, TxId), UserCdp>,
}

/// Undo log of a CDP cache.
#[derive(Debug, Default)]
pub struct CdpUndo {
    global_staked: ScalarUndo<u64>,
    global_owed: ScalarUndo<u64>,
    cdps: StoreUndo<TxId, UserCdp>,
    by_owner: StoreUndo<RegId, BTreeSet<TxId>>,
    by_ratio: StoreUndo<(String, TxId), UserCdp>,
}

/// Layered CDP state view.
#[derive(Debug)]
pub struct CdpCache<'a> {
    global_staked: ScalarStore<'a, u64>,
    global_owed: ScalarStore<'a, u64>,
    cdps: KeyedStore<'a, TxId, UserCdp>,
    by_owner: KeyedStore<'a, RegId, BTreeSet<TxId>>,
    by_ratio: KeyedStore<'a, (String, TxId), UserCdp>,
}

impl CdpCache<'static> {
    /// Create a root cache.
    pub fn root() -> Self {
        Self {
            global_staked: ScalarStore::root("cdp_global_staked"),
            global_owed: ScalarStore::root("cdp_global_owed"),
            cdps: KeyedStore::root("cdp"),
            by_owner: KeyedStore::root("cdp_owner"),
            by_ratio: KeyedStore::root("cdp_ratio"),
        }
    }
}

impl<'a> CdpCache<'a> {
    /// Create a child layer over this cache.
    pub fn fork(&self) -> CdpCache<'_> {
        CdpCache {
            global_staked: self.global_staked.fork(),
            global_owed: self.global_owed.fork(),
            cdps: self.cdps.fork(),
            by_owner: self.by_owner.fork(),
            by_ratio: self.by_ratio.fork(),
        }
    }

    /// Insert a freshly opened position.
    pub fn new_cdp(&mut self, cdp: &UserCdp) -> Result<(), CdpError> {
        if self.cdps.contains(&cdp.cdpid) {
            return Err(CdpError::AlreadyExists(hex::encode(cdp.cdpid)));
        }
        self.save_to_db(cdp);
        self.add_to_ratio_db(cdp);
        Ok(())
    }

    /// Replace a mutated position. The old state is needed to drop its
    /// ratio-index entry and reverse its aggregate contribution.
    pub fn update_cdp(&mut self, old: &UserCdp, new: &UserCdp) {
        self.save_to_db(new);
        self.erase_from_ratio_db(old);
        self.add_to_ratio_db(new);
    }

    /// Remove a closed position.
    pub fn erase_cdp(&mut self, old: &UserCdp, current: &UserCdp) {
        self.erase_from_db(current);
        self.erase_from_ratio_db(old);
    }

    /// Look a position up by id.
    pub fn get_cdp(&self, cdpid: &TxId) -> Option<UserCdp> {
        self.cdps.get(cdpid)
    }

    /// All positions owned by an account.
    pub fn cdps_of_owner(&self, regid: &RegId) -> Vec<UserCdp> {
        let Some(cdpids) = self.by_owner.get(regid) else {
            return Vec::new();
        };
        cdpids
            .iter()
            .filter_map(|cdpid| self.cdps.get(cdpid))
            .collect()
    }

    /// Liquidation candidate set: every CDP whose live collateral ratio at
    /// `bcoin_price` is at or below `ratio` (RATIO_BOOST scale), ordered
    /// riskiest first.
    pub fn cdps_at_or_below_ratio(&self, ratio: u64, bcoin_price: u64) -> Vec<UserCdp> {
        let threshold = ratio_threshold_key(ratio, bcoin_price);
        let low = (format16hex(0), [0u8; 32]);
        let high = (threshold, [0xFF; 32]);
        self.by_ratio
            .collect_range(Bound::Included(&low), Bound::Included(&high))
            .into_values()
            .collect()
    }

    /// Total base coins staked across live CDPs.
    pub fn global_staked_bcoins(&self) -> u64 {
        self.global_staked.get().unwrap_or(0)
    }

    /// Total stable coins owed across live CDPs.
    pub fn global_owed_scoins(&self) -> u64 {
        self.global_owed.get().unwrap_or(0)
    }

    /// Global collateral ratio at a price, RATIO_BOOST scale. Infinite
    /// (u64::MAX) when nothing is owed.
    pub fn global_collateral_ratio(&self, bcoin_price: u64) -> u64 {
        let owed = self.global_owed_scoins();
        if owed == 0 {
            return u64::MAX;
        }
        let ratio = self.global_staked_bcoins() as u128 * bcoin_price as u128
            * RATIO_BOOST as u128
            / PRICE_BOOST as u128
            / owed as u128;
        ratio.min(u64::MAX as u128) as u64
    }

    /// True when the global ratio has fallen under the governed floor.
    pub fn global_collateral_ratio_floor_reached(&self, bcoin_price: u64, floor: u64) -> bool {
        self.global_collateral_ratio(bcoin_price) < floor
    }

    /// True when staking `new_bcoins` would pierce the governed ceiling
    /// (given in whole coins).
    pub fn global_collateral_ceiling_reached(&self, new_bcoins: u64, ceiling: u64) -> bool {
        let staked = self.global_staked_bcoins() as u128 + new_bcoins as u128;
        staked > ceiling as u128 * COIN as u128
    }

    fn save_to_db(&mut self, cdp: &UserCdp) {
        let mut cdpids = self.by_owner.get(&cdp.owner_regid).unwrap_or_default();
        cdpids.insert(cdp.cdpid);
        self.cdps.set(cdp.cdpid, cdp.clone());
        self.by_owner.set(cdp.owner_regid, cdpids);
    }

    fn erase_from_db(&mut self, cdp: &UserCdp) {
        let mut cdpids = self.by_owner.get(&cdp.owner_regid).unwrap_or_default();
        cdpids.remove(&cdp.cdpid);
        self.cdps.erase(&cdp.cdpid);
        if cdpids.is_empty() {
            self.by_owner.erase(&cdp.owner_regid);
        } else {
            self.by_owner.set(cdp.owner_regid, cdpids);
        }
    }

    fn add_to_ratio_db(&mut self, cdp: &UserCdp) {
        self.global_staked
            .set(self.global_staked_bcoins().saturating_add(cdp.total_staked_bcoins));
        self.global_owed
            .set(self.global_owed_scoins().saturating_add(cdp.total_owed_scoins));
        self.by_ratio.set((cdp.ratio_key(), cdp.cdpid), cdp.clone());
    }

    fn erase_from_ratio_db(&mut self, cdp: &UserCdp) {
        self.global_staked
            .set(self.global_staked_bcoins().saturating_sub(cdp.total_staked_bcoins));
        self.global_owed
            .set(self.global_owed_scoins().saturating_sub(cdp.total_owed_scoins));
        self.by_ratio.erase(&(cdp.ratio_key(), cdp.cdpid));
    }

    /// Drain this layer into a change set for the parent.
    pub fn into_changes(self) -> CdpChanges {
        CdpChanges {
            global_staked: self.global_staked.into_changes(),
            global_owed: self.global_owed.into_changes(),
            cdps: self.cdps.into_changes(),
            by_owner: self.by_owner.into_changes(),
            by_ratio: self.by_ratio.into_changes(),
        }
    }

    /// Apply a child's change set.
    pub fn apply_changes(&mut self, changes: CdpChanges) {
        self.global_staked.apply_changes(changes.global_staked);
        self.global_owed.apply_changes(changes.global_owed);
        self.cdps.apply_changes(changes.cdps);
        self.by_owner.apply_changes(changes.by_owner);
        self.by_ratio.apply_changes(changes.by_ratio);
    }

    /// Start recording an undo log.
    pub fn enable_undo(&mut self) {
        self.global_staked.enable_undo();
        self.global_owed.enable_undo();
        self.cdps.enable_undo();
        self.by_owner.enable_undo();
        self.by_ratio.enable_undo();
    }

    /// Take the recorded log.
    pub fn take_undo(&mut self) -> CdpUndo {
        CdpUndo {
            global_staked: self.global_staked.take_undo(),
            global_owed: self.global_owed.take_undo(),
            cdps: self.cdps.take_undo(),
            by_owner: self.by_owner.take_undo(),
            by_ratio: self.by_ratio.take_undo(),
        }
    }

    /// Stop recording.
    pub fn disable_undo(&mut self) {
        self.global_staked.disable_undo();
        self.global_owed.disable_undo();
        self.cdps.disable_undo();
        self.by_owner.disable_undo();
        self.by_ratio.disable_undo();
    }

    /// Apply an undo log in reverse.
    pub fn apply_undo(&mut self, undo: CdpUndo) {
        self.global_staked.apply_undo(undo.global_staked);
        self.global_owed.apply_undo(undo.global_owed);
        self.cdps.apply_undo(undo.cdps);
        self.by_owner.apply_undo(undo.by_owner);
        self.by_ratio.apply_undo(undo.by_ratio);
    }
}
