//! Price feed and price median transactions.
//!
//! Delegates feed raw price points; once per block the assembler injects a
//! median transaction that snapshots the per-pair medians over the governed
//! sliding window and, on execution, persists them and force-settles the
//! riskiest CDPs.

use crate::context::ExecuteContext;
use crate::error::{TxError, TxResult};
use crate::tx::{check_sender_signature, debit_fee, payload_bytes, TxKind};
use ac_01_chain_params::consensus::FORCE_SETTLE_CDP_MAX_COUNT_PER_BLOCK;
use ac_01_chain_params::SysParamType;
use serde::{Deserialize, Serialize};
use shared_crypto::Signature;
use shared_types::coins::BCOIN_PRICE_PAIR;
use shared_types::{CoinPricePair, RegId, TokenSymbol, COIN};
use std::collections::BTreeMap;

/// One fed price point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    /// The priced pair.
    pub pair: CoinPricePair,
    /// Price at PRICE_BOOST scale.
    pub price: u64,
}

/// Delegate price feed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceFeedTx {
    /// Transaction format version.
    pub version: u16,
    /// Height the transaction was built against.
    pub valid_height: u32,
    /// Feeding delegate.
    pub txuid: RegId,
    /// Fee token.
    pub fee_symbol: TokenSymbol,
    /// Fee amount in smallest units.
    pub fee_amount: u64,
    /// Fed points.
    pub price_points: Vec<PricePoint>,
    /// Feeder signature.
    pub signature: Signature,
}

impl PriceFeedTx {
    pub(crate) fn signature_payload(&self) -> Vec<u8> {
        payload_bytes(&(
            TxKind::PriceFeed,
            self.version,
            self.valid_height,
            self.txuid,
            self.fee_symbol,
            self.fee_amount,
            &self.price_points,
        ))
    }

    pub(crate) fn check(&self, ctx: &mut ExecuteContext) -> TxResult<()> {
        ctx.check_stablecoin_active()?;
        if self.price_points.is_empty() || self.price_points.iter().any(|p| p.price == 0) {
            return Err(TxError::ZeroAmount);
        }
        let feeder = ctx.account(&self.txuid)?;
        check_sender_signature(&feeder, &self.signature_payload(), &self.signature)?;

        let min_stake = ctx
            .cache
            .sys_params
            .get_param(SysParamType::PriceFeedBcoinStakeAmountMin)
            .saturating_mul(COIN);
        let staked = feeder.free_balance(TokenSymbol::Wicc);
        if staked < min_stake {
            return Err(TxError::FeederStakeTooLow {
                have: staked,
                need: min_stake,
            });
        }
        Ok(())
    }

    pub(crate) fn execute(&self, ctx: &mut ExecuteContext) -> TxResult<()> {
        let mut feeder = ctx.account(&self.txuid)?;
        debit_fee(ctx, &mut feeder, self.fee_symbol, self.fee_amount)?;

        for point in &self.price_points {
            ctx.cache.prices.add_feed(ctx.height, point.pair, point.price);
        }
        Ok(())
    }
}

/// System-injected per-block price median.
///
/// Carries the per-pair medians the producer computed; validators recompute
/// and reject blocks whose medians disagree with their own price cache.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceMedianTx {
    /// Transaction format version.
    pub version: u16,
    /// Block height carrying the medians.
    pub valid_height: u32,
    /// Median per pair over the governed sliding window.
    pub median_prices: BTreeMap<CoinPricePair, u64>,
}

impl PriceMedianTx {
    /// Build an empty median transaction for a height; the assembler fills
    /// the medians in during packing.
    pub fn at_height(height: u32) -> Self {
        Self {
            version: 1,
            valid_height: height,
            median_prices: BTreeMap::new(),
        }
    }

    pub(crate) fn signature_payload(&self) -> Vec<u8> {
        payload_bytes(&(
            TxKind::PriceMedian,
            self.version,
            self.valid_height,
            &self.median_prices,
        ))
    }

    pub(crate) fn check(&self, ctx: &mut ExecuteContext) -> TxResult<()> {
        // The carried medians must equal the medians this node derives from
        // its own price cache.
        let window = ctx
            .cache
            .sys_params
            .get_param(SysParamType::MedianPriceSlideWindowBlockCount);
        let expected = ctx.cache.prices.block_median_prices(ctx.height, window);
        if expected != self.median_prices {
            return Err(TxError::MedianMismatch);
        }
        Ok(())
    }

    pub(crate) fn execute(&self, ctx: &mut ExecuteContext) -> TxResult<()> {
        for (pair, price) in &self.median_prices {
            ctx.cache.prices.set_median(ctx.height, *pair, *price);
        }

        if let Some(bcoin_price) = self.median_prices.get(&BCOIN_PRICE_PAIR).copied() {
            self.force_settle(ctx, bcoin_price)?;
        }
        Ok(())
    }

    /// Close the riskiest CDPs: every position whose live ratio sits at or
    /// under the forced-liquidation ratio is settled, collateral moving to
    /// the risk reserve, bounded per block.
    fn force_settle(&self, ctx: &mut ExecuteContext, bcoin_price: u64) -> TxResult<()> {
        let force_ratio = ctx
            .cache
            .sys_params
            .get_param(SysParamType::CdpForceLiquidateRatio);
        let candidates = ctx.cache.cdps.cdps_at_or_below_ratio(force_ratio, bcoin_price);
        if candidates.is_empty() {
            return Ok(());
        }

        let reserve_regid = ctx.params.fcoin_genesis_regid();
        let mut reserve = ctx
            .cache
            .accounts
            .get_account(&reserve_regid)
            .unwrap_or_else(|| {
                shared_types::Account::new(
                    reserve_regid,
                    shared_types::KeyId::default(),
                    None,
                )
            });

        let mut settled = 0usize;
        for cdp in candidates {
            if settled >= FORCE_SETTLE_CDP_MAX_COUNT_PER_BLOCK {
                break;
            }
            reserve.add_balance(TokenSymbol::Wicc, cdp.total_staked_bcoins)?;
            ctx.cache.cdps.erase_cdp(&cdp, &cdp);
            settled += 1;
        }
        ctx.cache.accounts.set_account(&reserve);
        tracing::info!(height = ctx.height, settled, "force-settled undercollateralized cdps");
        Ok(())
    }
}
