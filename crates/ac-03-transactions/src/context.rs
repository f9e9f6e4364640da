//! Execution context threaded through every transaction.

use crate::error::{TxError, TxResult};
use ac_01_chain_params::{ChainParams, SysParamType};
use ac_02_state_cache::CacheWrapper;
use shared_types::coins::BCOIN_PRICE_PAIR;
use shared_types::{Account, KeyId, RegId};

/// How many blocks either side of `valid_height` a transaction stays
/// packable.
pub const TX_VALID_HEIGHT_RANGE: u32 = 250;

/// Everything a transaction sees while checking and executing.
pub struct ExecuteContext<'c, 'a> {
    /// Height of the block under construction or validation.
    pub height: u32,
    /// Index of this transaction within the block.
    pub index: u32,
    /// Fuel rate chosen for the block.
    pub fuel_rate: u32,
    /// Block timestamp.
    pub block_time: i64,
    /// Network parameters.
    pub params: &'c ChainParams,
    /// Scratch state view; discarded wholesale if the transaction fails.
    pub cache: &'c mut CacheWrapper<'a>,
}

impl<'c, 'a> ExecuteContext<'c, 'a> {
    /// Fetch the sender account or reject.
    pub fn account(&self, regid: &RegId) -> TxResult<Account> {
        self.cache
            .accounts
            .get_account(regid)
            .ok_or(TxError::AccountNotFound(*regid))
    }

    /// Fetch the account a key id resolves to, creating it on first funded
    /// appearance with the regid (current height, current tx index).
    pub fn account_by_keyid_or_create(&mut self, keyid: &KeyId) -> Account {
        if let Some(account) = self.cache.accounts.get_account_by_keyid(keyid) {
            return account;
        }
        let regid = RegId::new(self.height, self.index as u16);
        let account = Account::new(regid, *keyid, None);
        self.cache.accounts.set_account(&account);
        account
    }

    /// Fetch an account by regid, creating an empty one when absent. Used
    /// by system grants whose recipients may not exist yet (fund-coin
    /// genesis, the risk reserve).
    pub fn account_or_create(&mut self, regid: &RegId) -> Account {
        if let Some(account) = self.cache.accounts.get_account(regid) {
            return account;
        }
        let account = Account::new(*regid, KeyId::default(), None);
        self.cache.accounts.set_account(&account);
        account
    }

    /// The consensus base-coin/USD median price: the one persisted in this
    /// block when the price median transaction already ran, else computed
    /// from the feeds over the governed sliding window.
    pub fn bcoin_median_price(&self) -> TxResult<u64> {
        if let Some(price) = self.cache.prices.get_median(self.height, BCOIN_PRICE_PAIR) {
            return Ok(price);
        }
        let window = self
            .cache
            .sys_params
            .get_param(SysParamType::MedianPriceSlideWindowBlockCount);
        self.cache
            .prices
            .block_median_prices(self.height, window)
            .get(&BCOIN_PRICE_PAIR)
            .copied()
            .ok_or(TxError::PriceUnavailable(
                BCOIN_PRICE_PAIR.0,
                BCOIN_PRICE_PAIR.1,
            ))
    }

    /// Stablecoin-era transaction kinds (CDP operations, price feeds) are
    /// rejected outright before the fork height.
    pub fn check_stablecoin_active(&self) -> TxResult<()> {
        let fork_height = self.params.stablecoin_genesis_height;
        if self.height < fork_height {
            return Err(TxError::DisabledPreStablecoin { fork_height });
        }
        Ok(())
    }

    /// Reject transactions outside their valid-height window.
    pub fn check_valid_height(&self, valid_height: u32) -> TxResult<()> {
        let distance = self.height.abs_diff(valid_height);
        if distance > TX_VALID_HEIGHT_RANGE {
            return Err(TxError::InvalidValidHeight {
                valid_height,
                height: self.height,
            });
        }
        Ok(())
    }
}
