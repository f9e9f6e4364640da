//! The transaction catalog and its central dispatch.
//!
//! Transactions are a closed tagged enum; the pipeline only ever talks to
//! the capability surface here (hashing, sizing, fees, priority, check,
//! execute) and routes by tag. Transaction ids hash the serialized content
//! *excluding* the signature, so signing does not change the id.

use crate::cdp_tx::{CdpLiquidateTx, CdpRedeemTx, CdpStakeTx};
use crate::context::ExecuteContext;
use crate::error::{TxError, TxResult};
use crate::price::{PriceFeedTx, PriceMedianTx};
use crate::reward::{BlockRewardTx, UCoinBlockRewardTx};
use crate::transfer::{BaseCoinTransferTx, UCoinTransferTx};
use ac_01_chain_params::consensus::{
    PRICE_FEED_TX_PRIORITY, PRICE_MEDIAN_TX_PRIORITY, PRIORITY_CEILING,
};
use serde::{Deserialize, Serialize};
use shared_crypto::{hash, verify_signature, Signature};
use shared_types::{Account, RegId, TokenSymbol, TxId};

/// Transaction type tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxKind {
    /// Pre-stablecoin coinbase.
    BlockReward,
    /// Stablecoin-era multi-token coinbase.
    UCoinBlockReward,
    /// System-injected per-block price median.
    PriceMedian,
    /// Delegate price feed.
    PriceFeed,
    /// Single-leg base coin transfer.
    BaseCoinTransfer,
    /// Multi-leg, multi-token transfer.
    UCoinTransfer,
    /// Stake collateral / mint stable coins.
    CdpStake,
    /// Repay stable coins / release collateral.
    CdpRedeem,
    /// Third-party liquidation.
    CdpLiquidate,
}

/// A consensus transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Transaction {
    /// Pre-stablecoin coinbase.
    BlockReward(BlockRewardTx),
    /// Stablecoin-era multi-token coinbase.
    UCoinBlockReward(UCoinBlockRewardTx),
    /// System-injected per-block price median.
    PriceMedian(PriceMedianTx),
    /// Delegate price feed.
    PriceFeed(PriceFeedTx),
    /// Single-leg base coin transfer.
    BaseCoinTransfer(BaseCoinTransferTx),
    /// Multi-leg, multi-token transfer.
    UCoinTransfer(UCoinTransferTx),
    /// Stake collateral / mint stable coins.
    CdpStake(CdpStakeTx),
    /// Repay stable coins / release collateral.
    CdpRedeem(CdpRedeemTx),
    /// Third-party liquidation.
    CdpLiquidate(CdpLiquidateTx),
}

impl Transaction {
    /// Type tag.
    pub fn kind(&self) -> TxKind {
        match self {
            Transaction::BlockReward(_) => TxKind::BlockReward,
            Transaction::UCoinBlockReward(_) => TxKind::UCoinBlockReward,
            Transaction::PriceMedian(_) => TxKind::PriceMedian,
            Transaction::PriceFeed(_) => TxKind::PriceFeed,
            Transaction::BaseCoinTransfer(_) => TxKind::BaseCoinTransfer,
            Transaction::UCoinTransfer(_) => TxKind::UCoinTransfer,
            Transaction::CdpStake(_) => TxKind::CdpStake,
            Transaction::CdpRedeem(_) => TxKind::CdpRedeem,
            Transaction::CdpLiquidate(_) => TxKind::CdpLiquidate,
        }
    }

    /// Transaction format version.
    pub fn version(&self) -> u16 {
        match self {
            Transaction::BlockReward(tx) => tx.version,
            Transaction::UCoinBlockReward(tx) => tx.version,
            Transaction::PriceMedian(tx) => tx.version,
            Transaction::PriceFeed(tx) => tx.version,
            Transaction::BaseCoinTransfer(tx) => tx.version,
            Transaction::UCoinTransfer(tx) => tx.version,
            Transaction::CdpStake(tx) => tx.version,
            Transaction::CdpRedeem(tx) => tx.version,
            Transaction::CdpLiquidate(tx) => tx.version,
        }
    }

    /// Height the transaction was built against.
    pub fn valid_height(&self) -> u32 {
        match self {
            Transaction::BlockReward(tx) => tx.valid_height,
            Transaction::UCoinBlockReward(tx) => tx.valid_height,
            Transaction::PriceMedian(tx) => tx.valid_height,
            Transaction::PriceFeed(tx) => tx.valid_height,
            Transaction::BaseCoinTransfer(tx) => tx.valid_height,
            Transaction::UCoinTransfer(tx) => tx.valid_height,
            Transaction::CdpStake(tx) => tx.valid_height,
            Transaction::CdpRedeem(tx) => tx.valid_height,
            Transaction::CdpLiquidate(tx) => tx.valid_height,
        }
    }

    /// Source account (the null regid for system-injected transactions).
    pub fn txuid(&self) -> RegId {
        match self {
            Transaction::BlockReward(tx) => tx.txuid,
            Transaction::UCoinBlockReward(tx) => tx.txuid,
            Transaction::PriceMedian(_) => RegId::empty(),
            Transaction::PriceFeed(tx) => tx.txuid,
            Transaction::BaseCoinTransfer(tx) => tx.txuid,
            Transaction::UCoinTransfer(tx) => tx.txuid,
            Transaction::CdpStake(tx) => tx.txuid,
            Transaction::CdpRedeem(tx) => tx.txuid,
            Transaction::CdpLiquidate(tx) => tx.txuid,
        }
    }

    /// Declared fee as (symbol, amount). Zero for system transactions.
    pub fn fees(&self) -> (TokenSymbol, u64) {
        match self {
            Transaction::BlockReward(_)
            | Transaction::UCoinBlockReward(_)
            | Transaction::PriceMedian(_) => (TokenSymbol::Wicc, 0),
            Transaction::PriceFeed(tx) => (tx.fee_symbol, tx.fee_amount),
            Transaction::BaseCoinTransfer(tx) => (TokenSymbol::Wicc, tx.fee_amount),
            Transaction::UCoinTransfer(tx) => (tx.fee_symbol, tx.fee_amount),
            Transaction::CdpStake(tx) => (tx.fee_symbol, tx.fee_amount),
            Transaction::CdpRedeem(tx) => (tx.fee_symbol, tx.fee_amount),
            Transaction::CdpLiquidate(tx) => (tx.fee_symbol, tx.fee_amount),
        }
    }

    /// Serialized content excluding the signature; the preimage of both the
    /// transaction id and the sender signature.
    pub fn signature_payload(&self) -> Vec<u8> {
        match self {
            Transaction::BlockReward(tx) => tx.signature_payload(),
            Transaction::UCoinBlockReward(tx) => tx.signature_payload(),
            Transaction::PriceMedian(tx) => tx.signature_payload(),
            Transaction::PriceFeed(tx) => tx.signature_payload(),
            Transaction::BaseCoinTransfer(tx) => tx.signature_payload(),
            Transaction::UCoinTransfer(tx) => tx.signature_payload(),
            Transaction::CdpStake(tx) => tx.signature_payload(),
            Transaction::CdpRedeem(tx) => tx.signature_payload(),
            Transaction::CdpLiquidate(tx) => tx.signature_payload(),
        }
    }

    /// Content hash excluding the signature.
    pub fn tx_hash(&self) -> TxId {
        hash(&self.signature_payload())
    }

    /// Sender signature (the empty placeholder on system transactions).
    pub fn signature(&self) -> Signature {
        match self {
            Transaction::BlockReward(_)
            | Transaction::UCoinBlockReward(_)
            | Transaction::PriceMedian(_) => Signature::empty(),
            Transaction::PriceFeed(tx) => tx.signature,
            Transaction::BaseCoinTransfer(tx) => tx.signature,
            Transaction::UCoinTransfer(tx) => tx.signature,
            Transaction::CdpStake(tx) => tx.signature,
            Transaction::CdpRedeem(tx) => tx.signature,
            Transaction::CdpLiquidate(tx) => tx.signature,
        }
    }

    /// Serialized size in bytes.
    pub fn serialized_size(&self) -> u32 {
        bincode::serialized_size(self).map(|n| n as u32).unwrap_or(u32::MAX)
    }

    /// Compute units consumed. The transaction kinds in this catalog run no
    /// contract VM, so they consume none.
    pub fn run_step(&self) -> u64 {
        0
    }

    /// Fuel charged at a fuel rate: one rate unit per started hundred run
    /// steps.
    pub fn fuel(&self, _height: u32, fuel_rate: u32) -> u64 {
        let steps = self.run_step();
        if steps == 0 {
            0
        } else {
            steps.div_ceil(100) * fuel_rate as u64
        }
    }

    /// Mempool priority. System price transactions outrank every user
    /// transaction; user priority grows with fee density up to the ceiling.
    pub fn priority(&self) -> f64 {
        match self.kind() {
            TxKind::PriceMedian => PRICE_MEDIAN_TX_PRIORITY,
            TxKind::PriceFeed => PRICE_FEED_TX_PRIORITY,
            TxKind::BlockReward | TxKind::UCoinBlockReward => 0.0,
            _ => {
                let (_, fee) = self.fees();
                let size = self.serialized_size().max(1);
                (fee as f64 / size as f64).min(PRIORITY_CEILING)
            }
        }
    }

    /// True for coinbase variants.
    pub fn is_reward(&self) -> bool {
        matches!(
            self,
            Transaction::BlockReward(_) | Transaction::UCoinBlockReward(_)
        )
    }

    /// True for the system-injected price median.
    pub fn is_price_median(&self) -> bool {
        matches!(self, Transaction::PriceMedian(_))
    }

    /// Stateless and stateful admission checks.
    pub fn check(&self, ctx: &mut ExecuteContext) -> TxResult<()> {
        ctx.check_valid_height(self.valid_height())?;
        match self {
            Transaction::BlockReward(tx) => tx.check(ctx),
            Transaction::UCoinBlockReward(tx) => tx.check(ctx),
            Transaction::PriceMedian(tx) => tx.check(ctx),
            Transaction::PriceFeed(tx) => tx.check(ctx),
            Transaction::BaseCoinTransfer(tx) => tx.check(ctx),
            Transaction::UCoinTransfer(tx) => tx.check(ctx),
            Transaction::CdpStake(tx) => tx.check(ctx),
            Transaction::CdpRedeem(tx) => tx.check(ctx),
            Transaction::CdpLiquidate(tx) => tx.check(ctx),
        }
    }

    /// Mutate state. Called on a per-transaction scratch cache; the caller
    /// discards the scratch if this fails.
    pub fn execute(&self, ctx: &mut ExecuteContext) -> TxResult<()> {
        match self {
            Transaction::BlockReward(tx) => tx.execute(ctx),
            Transaction::UCoinBlockReward(tx) => tx.execute(ctx),
            Transaction::PriceMedian(tx) => tx.execute(ctx),
            Transaction::PriceFeed(tx) => tx.execute(ctx),
            Transaction::BaseCoinTransfer(tx) => tx.execute(ctx),
            Transaction::UCoinTransfer(tx) => tx.execute(ctx),
            Transaction::CdpStake(tx) => tx.execute(ctx),
            Transaction::CdpRedeem(tx) => tx.execute(ctx),
            Transaction::CdpLiquidate(tx) => tx.execute(ctx),
        }
    }
}

/// Serialize a signing payload. Plain-data serialization cannot fail.
pub(crate) fn payload_bytes<T: Serialize>(body: &T) -> Vec<u8> {
    bincode::serialize(body).expect("payload serialization")
}

/// Verify the sender's signature over a payload against the account's owner
/// key (miner key fallback).
pub(crate) fn check_sender_signature(
    account: &Account,
    payload: &[u8],
    signature: &Signature,
) -> TxResult<()> {
    if signature.is_empty() {
        return Err(TxError::BadSignature);
    }
    let digest = hash(payload);
    let owner_ok = account
        .owner_pubkey
        .as_ref()
        .is_some_and(|key| verify_signature(&digest, signature, key));
    if owner_ok {
        return Ok(());
    }
    let miner_ok = account
        .miner_pubkey
        .as_ref()
        .is_some_and(|key| verify_signature(&digest, signature, key));
    if miner_ok {
        Ok(())
    } else {
        Err(TxError::BadSignature)
    }
}

/// Debit a transaction's declared fee from the sender and persist the
/// account. Fees are destroyed here; the assembler re-mints `fee - fuel`
/// into the block reward.
pub(crate) fn debit_fee(
    ctx: &mut ExecuteContext,
    account: &mut Account,
    fee_symbol: TokenSymbol,
    fee_amount: u64,
) -> TxResult<()> {
    account.sub_balance(fee_symbol, fee_amount)?;
    ctx.cache.accounts.set_account(account);
    Ok(())
}
