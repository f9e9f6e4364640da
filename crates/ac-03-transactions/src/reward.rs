//! Coinbase transactions.
//!
//! Every block's first transaction is a reward. Before the stablecoin fork
//! the reward is a single base-coin amount; after it, a per-symbol fee map
//! plus the delegate's vote-derived inflation. Reward transactions execute
//! only when a block connects, never during packing.

use crate::context::ExecuteContext;
use crate::error::TxResult;
use crate::tx::{payload_bytes, TxKind};
use serde::{Deserialize, Serialize};
use shared_types::{RegId, TokenSymbol};
use std::collections::BTreeMap;

/// Pre-stablecoin coinbase: the packed fees minus burned fuel, in WICC.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRewardTx {
    /// Transaction format version.
    pub version: u16,
    /// Block height carrying the reward.
    pub valid_height: u32,
    /// Producing delegate.
    pub txuid: RegId,
    /// Accumulated `fee - fuel` over the packed transactions.
    pub reward_fees: u64,
}

impl BlockRewardTx {
    pub(crate) fn signature_payload(&self) -> Vec<u8> {
        payload_bytes(&(
            TxKind::BlockReward,
            self.version,
            self.valid_height,
            self.txuid,
            self.reward_fees,
        ))
    }

    pub(crate) fn check(&self, _ctx: &mut ExecuteContext) -> TxResult<()> {
        Ok(())
    }

    pub(crate) fn execute(&self, ctx: &mut ExecuteContext) -> TxResult<()> {
        let mut delegate = ctx.account(&self.txuid)?;
        delegate.add_balance(TokenSymbol::Wicc, self.reward_fees)?;
        ctx.cache.accounts.set_account(&delegate);
        Ok(())
    }
}

/// Stablecoin-era coinbase: per-symbol fee rewards plus inflation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UCoinBlockRewardTx {
    /// Transaction format version.
    pub version: u16,
    /// Block height carrying the reward.
    pub valid_height: u32,
    /// Producing delegate.
    pub txuid: RegId,
    /// Accumulated `fee - fuel` per fee symbol.
    pub reward_fees: BTreeMap<TokenSymbol, u64>,
    /// Vote-derived inflation credited to the delegate.
    pub inflated_bcoins: u64,
}

impl UCoinBlockRewardTx {
    pub(crate) fn signature_payload(&self) -> Vec<u8> {
        payload_bytes(&(
            TxKind::UCoinBlockReward,
            self.version,
            self.valid_height,
            self.txuid,
            &self.reward_fees,
            self.inflated_bcoins,
        ))
    }

    pub(crate) fn check(&self, _ctx: &mut ExecuteContext) -> TxResult<()> {
        Ok(())
    }

    pub(crate) fn execute(&self, ctx: &mut ExecuteContext) -> TxResult<()> {
        // Recipients of stablecoin-genesis grants may not exist yet.
        let mut recipient = ctx.account_or_create(&self.txuid);
        for (symbol, amount) in &self.reward_fees {
            recipient.add_balance(*symbol, *amount)?;
        }
        recipient.add_balance(TokenSymbol::Wicc, self.inflated_bcoins)?;
        ctx.cache.accounts.set_account(&recipient);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ac_01_chain_params::{ChainParams, Network};
    use ac_02_state_cache::CacheWrapper;
    use shared_types::{Account, KeyId};

    fn delegate_account() -> Account {
        Account::new(RegId::new(0, 1), KeyId([1; 20]), None)
    }

    #[test]
    fn test_reward_credits_delegate() {
        let params = ChainParams::for_network(Network::Regtest);
        let mut cache = CacheWrapper::root();
        let delegate = delegate_account();
        cache.accounts.set_account(&delegate);

        let tx = BlockRewardTx {
            version: 1,
            valid_height: 1,
            txuid: delegate.regid,
            reward_fees: 5000,
        };
        let mut ctx = ExecuteContext {
            height: 1,
            index: 0,
            fuel_rate: 100,
            block_time: 0,
            params: &params,
            cache: &mut cache,
        };
        tx.execute(&mut ctx).unwrap();

        let credited = cache.accounts.get_account(&delegate.regid).unwrap();
        assert_eq!(credited.free_balance(TokenSymbol::Wicc), 5000);
    }

    #[test]
    fn test_ucoin_reward_credits_all_symbols() {
        let params = ChainParams::for_network(Network::Regtest);
        let mut cache = CacheWrapper::root();
        let delegate = delegate_account();
        cache.accounts.set_account(&delegate);

        let tx = UCoinBlockRewardTx {
            version: 1,
            valid_height: 5,
            txuid: delegate.regid,
            reward_fees: BTreeMap::from([
                (TokenSymbol::Wicc, 300),
                (TokenSymbol::Wusd, 700),
            ]),
            inflated_bcoins: 42,
        };
        let mut ctx = ExecuteContext {
            height: 5,
            index: 0,
            fuel_rate: 100,
            block_time: 0,
            params: &params,
            cache: &mut cache,
        };
        tx.execute(&mut ctx).unwrap();

        let credited = cache.accounts.get_account(&delegate.regid).unwrap();
        assert_eq!(credited.free_balance(TokenSymbol::Wicc), 342);
        assert_eq!(credited.free_balance(TokenSymbol::Wusd), 700);
    }
}
