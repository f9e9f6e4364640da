//! CDP lifecycle transactions: stake, redeem, liquidate.
//!
//! All three flow through the CDP cache so the aggregates and the ratio
//! index never drift from the positions themselves. Collateral is valued
//! at the consensus base-coin median price, and none of these transaction
//! kinds exists before the stablecoin fork.
//!
//! Owed stable coins accrue interest between mutations; the accrued amount
//! is collected in stable coins and routed to the risk reserve whenever a
//! position is grown or redeemed. Liquidation follows a three-band
//! schedule keyed on the live collateral ratio (see `liquidation_terms`),
//! with penalty fees split between the risk reserve and a burn.

use crate::context::ExecuteContext;
use crate::error::{TxError, TxResult};
use crate::tx::{check_sender_signature, debit_fee, payload_bytes, TxKind};
use ac_01_chain_params::consensus::{PRICE_BOOST, RATIO_BOOST};
use ac_01_chain_params::SysParamType;
use ac_02_state_cache::UserCdp;
use serde::{Deserialize, Serialize};
use shared_crypto::Signature;
use shared_types::{Account, RegId, TokenSymbol, TxId, COIN};

/// Interest owed on a position since its last mutation.
///
/// The annual rate is `0.1 * a / log10(1 + b * N / COIN)` with N the owed
/// stable coins, charged per started day of the loan:
///
/// `interest = N / 365 * loaned_days * annual_rate`
pub(crate) fn compute_cdp_interest(
    height: u32,
    cdp_last_height: u32,
    day_block_count: u64,
    param_a: u64,
    param_b: u64,
    owed_scoins: u64,
) -> u64 {
    if owed_scoins == 0 {
        return 0;
    }
    let block_interval = height.saturating_sub(cdp_last_height) as f64;
    let loaned_days = (block_interval / day_block_count as f64).ceil().max(1.0);
    let annual_rate = 0.1 * param_a as f64
        / (1.0 + param_b as f64 * owed_scoins as f64 / COIN as f64).log10();
    (owed_scoins as f64 / 365.0 * loaned_days * annual_rate) as u64
}

/// Charge the accrued interest on `cdp` to `owner` in stable coins and
/// route it to the risk reserve. Returns the amount charged.
fn charge_interest(
    ctx: &mut ExecuteContext,
    owner: &mut Account,
    cdp: &UserCdp,
) -> TxResult<u64> {
    let param_a = ctx.cache.sys_params.get_param(SysParamType::CdpInterestParamA);
    let param_b = ctx.cache.sys_params.get_param(SysParamType::CdpInterestParamB);
    let interest = compute_cdp_interest(
        ctx.height,
        cdp.block_height,
        ctx.params.day_block_count(ctx.height),
        param_a,
        param_b,
        cdp.total_owed_scoins,
    );
    if interest == 0 {
        return Ok(0);
    }
    owner.sub_balance(TokenSymbol::Wusd, interest)?;
    ctx.cache.accounts.set_account(owner);
    credit_risk_reserve(ctx, interest)?;
    Ok(interest)
}

/// Credit stable coins to the risk reserve (the fund-coin genesis
/// account).
fn credit_risk_reserve(ctx: &mut ExecuteContext, scoins: u64) -> TxResult<()> {
    if scoins == 0 {
        return Ok(());
    }
    let reserve_regid = ctx.params.fcoin_genesis_regid();
    let mut reserve = ctx.account_or_create(&reserve_regid);
    reserve.add_balance(TokenSymbol::Wusd, scoins)?;
    ctx.cache.accounts.set_account(&reserve);
    Ok(())
}

/// Route liquidation penalty fees: above the minimum penalty fee, half
/// funds the risk reserve and the rest buys fund coins for burning; at or
/// under it, everything goes to the reserve.
fn process_penalty_fees(ctx: &mut ExecuteContext, penalty: u64) -> TxResult<()> {
    if penalty == 0 {
        return Ok(());
    }
    let min_fee = ctx
        .cache
        .sys_params
        .get_param(SysParamType::CdpSysOrderPenaltyFeeMin);
    if penalty > min_fee {
        credit_risk_reserve(ctx, penalty / 2)?;
        // The other half is burned: debited from the liquidator and
        // credited to no one.
    } else {
        credit_risk_reserve(ctx, penalty)?;
    }
    Ok(())
}

/// The remaining staked collateral must stay worth at least the dust
/// bound (expressed in stable coins) at the current price.
fn check_staked_value_min(ctx: &ExecuteContext, cdp: &UserCdp, price: u64) -> TxResult<()> {
    let dust = ctx
        .cache
        .sys_params
        .get_param(SysParamType::CdpBcoinsToStakeAmountMinInScoin);
    let min_bcoins = (dust as u128 * PRICE_BOOST as u128 / price.max(1) as u128) as u64;
    if cdp.total_staked_bcoins < min_bcoins {
        return Err(TxError::StakedValueTooSmall {
            staked: cdp.total_staked_bcoins,
            min: min_bcoins,
        });
    }
    Ok(())
}

/// Every CDP mutation is locked while the global collateral ratio sits
/// under the governed floor.
fn check_global_floor(ctx: &ExecuteContext, price: u64) -> TxResult<()> {
    let floor = ctx
        .cache
        .sys_params
        .get_param(SysParamType::GlobalCollateralRatioMin);
    if ctx.cache.cdps.global_collateral_ratio_floor_reached(price, floor) {
        return Err(TxError::GlobalCollateralFloor);
    }
    Ok(())
}

/// Stake base coins into a new or existing CDP and mint stable coins.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CdpStakeTx {
    /// Transaction format version.
    pub version: u16,
    /// Height the transaction was built against.
    pub valid_height: u32,
    /// Position owner.
    pub txuid: RegId,
    /// Fee token.
    pub fee_symbol: TokenSymbol,
    /// Fee amount in smallest units.
    pub fee_amount: u64,
    /// Existing position to grow, or `None` to open one (its id becomes
    /// this transaction's hash).
    pub cdpid: Option<TxId>,
    /// Base coins staked.
    pub bcoins_to_stake: u64,
    /// Stable coins minted against the stake.
    pub scoins_to_mint: u64,
    /// Owner signature.
    pub signature: Signature,
}

impl CdpStakeTx {
    pub(crate) fn signature_payload(&self) -> Vec<u8> {
        payload_bytes(&(
            TxKind::CdpStake,
            self.version,
            self.valid_height,
            self.txuid,
            self.fee_symbol,
            self.fee_amount,
            self.cdpid,
            self.bcoins_to_stake,
            self.scoins_to_mint,
        ))
    }

    pub(crate) fn check(&self, ctx: &mut ExecuteContext) -> TxResult<()> {
        ctx.check_stablecoin_active()?;
        if self.bcoins_to_stake == 0 && self.scoins_to_mint == 0 {
            return Err(TxError::ZeroAmount);
        }
        let owner = ctx.account(&self.txuid)?;
        check_sender_signature(&owner, &self.signature_payload(), &self.signature)
    }

    pub(crate) fn execute(&self, ctx: &mut ExecuteContext) -> TxResult<()> {
        let price = ctx.bcoin_median_price()?;
        check_global_floor(ctx, price)?;

        let ceiling = ctx
            .cache
            .sys_params
            .get_param(SysParamType::GlobalCollateralCeilingAmount);
        if ctx
            .cache
            .cdps
            .global_collateral_ceiling_reached(self.bcoins_to_stake, ceiling)
        {
            return Err(TxError::GlobalCollateralCeiling);
        }

        let mut owner = ctx.account(&self.txuid)?;
        debit_fee(ctx, &mut owner, self.fee_symbol, self.fee_amount)?;

        let start_ratio = ctx
            .cache
            .sys_params
            .get_param(SysParamType::CdpStartCollateralRatio);

        // Ratio of this stake alone; infinite when nothing is minted.
        let partial_ratio = if self.scoins_to_mint == 0 {
            u64::MAX
        } else {
            let ratio = self.bcoins_to_stake as u128 * price as u128 * RATIO_BOOST as u128
                / PRICE_BOOST as u128
                / self.scoins_to_mint as u128;
            ratio.min(u64::MAX as u128) as u64
        };

        match self.cdpid {
            None => {
                if self.bcoins_to_stake == 0 || self.scoins_to_mint == 0 {
                    return Err(TxError::ZeroAmount);
                }
                if !ctx.cache.cdps.cdps_of_owner(&self.txuid).is_empty() {
                    return Err(TxError::OwnerHasOpenCdp(self.txuid));
                }
                if partial_ratio < start_ratio {
                    return Err(TxError::CollateralRatioTooLow {
                        have: partial_ratio,
                        need: start_ratio,
                    });
                }
                let cdpid = crate::tx::Transaction::CdpStake(self.clone()).tx_hash();
                let cdp = UserCdp::new(
                    self.txuid,
                    cdpid,
                    ctx.height,
                    self.bcoins_to_stake,
                    self.scoins_to_mint,
                );
                check_staked_value_min(ctx, &cdp, price)?;
                ctx.cache
                    .cdps
                    .new_cdp(&cdp)
                    .map_err(|_| TxError::CdpAlreadyExists)?;
            }
            Some(cdpid) => {
                let old = ctx.cache.cdps.get_cdp(&cdpid).ok_or(TxError::CdpNotFound)?;
                if old.owner_regid != self.txuid {
                    return Err(TxError::CdpNotOwned {
                        owner: old.owner_regid,
                        operator: self.txuid,
                    });
                }

                let mut new = old.clone();
                new.add_stake(ctx.height, self.bcoins_to_stake, self.scoins_to_mint);

                // Growing a position passes if either the new stake alone
                // or the resulting totals clear the entry ratio.
                let total_ratio = new.collateral_ratio(price);
                if partial_ratio < start_ratio && total_ratio < start_ratio {
                    return Err(TxError::CollateralRatioTooLow {
                        have: total_ratio,
                        need: start_ratio,
                    });
                }

                charge_interest(ctx, &mut owner, &old)?;
                ctx.cache.cdps.update_cdp(&old, &new);
            }
        }

        owner.sub_balance(TokenSymbol::Wicc, self.bcoins_to_stake)?;
        owner.add_balance(TokenSymbol::Wusd, self.scoins_to_mint)?;
        ctx.cache.accounts.set_account(&owner);
        Ok(())
    }
}

/// Repay stable coins and take collateral back out of a CDP.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CdpRedeemTx {
    /// Transaction format version.
    pub version: u16,
    /// Height the transaction was built against.
    pub valid_height: u32,
    /// Position owner.
    pub txuid: RegId,
    /// Fee token.
    pub fee_symbol: TokenSymbol,
    /// Fee amount in smallest units.
    pub fee_amount: u64,
    /// Position being redeemed.
    pub cdpid: TxId,
    /// Stable coins repaid (burned), clamped to the owed amount.
    pub scoins_to_repay: u64,
    /// Base coins released back to the owner, clamped to the staked
    /// amount.
    pub bcoins_to_redeem: u64,
    /// Owner signature.
    pub signature: Signature,
}

impl CdpRedeemTx {
    pub(crate) fn signature_payload(&self) -> Vec<u8> {
        payload_bytes(&(
            TxKind::CdpRedeem,
            self.version,
            self.valid_height,
            self.txuid,
            self.fee_symbol,
            self.fee_amount,
            self.cdpid,
            self.scoins_to_repay,
            self.bcoins_to_redeem,
        ))
    }

    pub(crate) fn check(&self, ctx: &mut ExecuteContext) -> TxResult<()> {
        ctx.check_stablecoin_active()?;
        if self.scoins_to_repay == 0 && self.bcoins_to_redeem == 0 {
            return Err(TxError::ZeroAmount);
        }
        let owner = ctx.account(&self.txuid)?;
        check_sender_signature(&owner, &self.signature_payload(), &self.signature)
    }

    pub(crate) fn execute(&self, ctx: &mut ExecuteContext) -> TxResult<()> {
        let old = ctx.cache.cdps.get_cdp(&self.cdpid).ok_or(TxError::CdpNotFound)?;
        if old.owner_regid != self.txuid {
            return Err(TxError::CdpNotOwned {
                owner: old.owner_regid,
                operator: self.txuid,
            });
        }

        let price = ctx.bcoin_median_price()?;
        check_global_floor(ctx, price)?;

        let mut owner = ctx.account(&self.txuid)?;
        debit_fee(ctx, &mut owner, self.fee_symbol, self.fee_amount)?;
        charge_interest(ctx, &mut owner, &old)?;

        let bcoins_to_redeem = self.bcoins_to_redeem.min(old.total_staked_bcoins);
        let scoins_to_repay = self.scoins_to_repay.min(old.total_owed_scoins);

        owner.sub_balance(TokenSymbol::Wusd, scoins_to_repay)?;
        owner.add_balance(TokenSymbol::Wicc, bcoins_to_redeem)?;
        ctx.cache.accounts.set_account(&owner);

        let mut new = old.clone();
        new.redeem(ctx.height, bcoins_to_redeem, scoins_to_repay);

        if new.is_finished() {
            ctx.cache.cdps.erase_cdp(&old, &new);
        } else {
            if bcoins_to_redeem != 0 {
                let start_ratio = ctx
                    .cache
                    .sys_params
                    .get_param(SysParamType::CdpStartCollateralRatio);
                let ratio = new.collateral_ratio(price);
                if ratio < start_ratio {
                    return Err(TxError::CollateralRatioTooLow {
                        have: ratio,
                        need: start_ratio,
                    });
                }
                check_staked_value_min(ctx, &new, price)?;
            }
            ctx.cache.cdps.update_cdp(&old, &new);
        }
        Ok(())
    }
}

/// Third-party liquidation of an undercollateralized CDP.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CdpLiquidateTx {
    /// Transaction format version.
    pub version: u16,
    /// Height the transaction was built against.
    pub valid_height: u32,
    /// Liquidating account.
    pub txuid: RegId,
    /// Fee token.
    pub fee_symbol: TokenSymbol,
    /// Fee amount in smallest units.
    pub fee_amount: u64,
    /// Position being liquidated.
    pub cdpid: TxId,
    /// Stable coins the liquidator offers; amounts at or above the band's
    /// full buyout close the position, less liquidates proportionally.
    pub scoins_to_liquidate: u64,
    /// Liquidator signature.
    pub signature: Signature,
}

/// What a liquidation settles at, per the collateral-ratio band.
#[derive(Clone, Debug, PartialEq, Eq)]
struct LiquidationTerms {
    /// Collateral bought by the liquidator.
    bcoins_to_liquidator: u64,
    /// Residual collateral returned to the position owner.
    bcoins_to_owner: u64,
    /// Stable coins the full buyout costs the liquidator.
    scoins_to_liquidate: u64,
    /// Penalty fees carved out of the buyout.
    scoins_penalty: u64,
}

/// The three-band liquidation schedule.
///
/// With M the staked collateral value and N the owed stable coins:
///
/// - above the liquidation-start ratio the position is healthy and
///   liquidation is refused;
/// - between the non-return and start ratios the liquidator buys a fixed
///   `non_return * N` of collateral at the discount, and whatever stake
///   remains goes back to the owner;
/// - between the forced and non-return ratios the entire stake is bought
///   at the discount and the owner gets nothing back;
/// - at or under the forced ratio the entire stake settles against the
///   owed amount with no penalty.
fn liquidation_terms(
    cdp: &UserCdp,
    ratio: u64,
    price: u64,
    start_liquidate_ratio: u64,
    non_return_ratio: u64,
    forced_ratio: u64,
    discount: u64,
) -> TxResult<LiquidationTerms> {
    let staked = cdp.total_staked_bcoins;
    let owed = cdp.total_owed_scoins;

    if ratio > start_liquidate_ratio {
        return Err(TxError::NotLiquidatable {
            have: ratio,
            threshold: start_liquidate_ratio,
        });
    }

    if ratio > non_return_ratio {
        let bcoins_to_liquidator = (owed as u128 * non_return_ratio as u128 * PRICE_BOOST as u128
            / RATIO_BOOST as u128
            / price as u128) as u64;
        let scoins_to_liquidate = (owed as u128 * non_return_ratio as u128 / RATIO_BOOST as u128
            * discount as u128
            / RATIO_BOOST as u128) as u64;
        Ok(LiquidationTerms {
            bcoins_to_liquidator,
            bcoins_to_owner: staked.saturating_sub(bcoins_to_liquidator),
            scoins_to_liquidate,
            scoins_penalty: scoins_to_liquidate.saturating_sub(owed),
        })
    } else if ratio > forced_ratio {
        let scoins_to_liquidate = (staked as u128 * price as u128 / PRICE_BOOST as u128
            * discount as u128
            / RATIO_BOOST as u128) as u64;
        Ok(LiquidationTerms {
            bcoins_to_liquidator: staked,
            bcoins_to_owner: 0,
            scoins_to_liquidate,
            scoins_penalty: scoins_to_liquidate.saturating_sub(owed),
        })
    } else {
        // Deep underwater: settle the whole stake against the owed amount.
        Ok(LiquidationTerms {
            bcoins_to_liquidator: staked,
            bcoins_to_owner: 0,
            scoins_to_liquidate: owed,
            scoins_penalty: 0,
        })
    }
}

impl CdpLiquidateTx {
    pub(crate) fn signature_payload(&self) -> Vec<u8> {
        payload_bytes(&(
            TxKind::CdpLiquidate,
            self.version,
            self.valid_height,
            self.txuid,
            self.fee_symbol,
            self.fee_amount,
            self.cdpid,
            self.scoins_to_liquidate,
        ))
    }

    pub(crate) fn check(&self, ctx: &mut ExecuteContext) -> TxResult<()> {
        ctx.check_stablecoin_active()?;
        if self.scoins_to_liquidate == 0 {
            return Err(TxError::ZeroAmount);
        }
        let liquidator = ctx.account(&self.txuid)?;
        check_sender_signature(&liquidator, &self.signature_payload(), &self.signature)
    }

    pub(crate) fn execute(&self, ctx: &mut ExecuteContext) -> TxResult<()> {
        let old = ctx.cache.cdps.get_cdp(&self.cdpid).ok_or(TxError::CdpNotFound)?;
        let price = ctx.bcoin_median_price()?;
        check_global_floor(ctx, price)?;

        let mut liquidator = ctx.account(&self.txuid)?;
        debit_fee(ctx, &mut liquidator, self.fee_symbol, self.fee_amount)?;

        let start_liquidate_ratio = ctx
            .cache
            .sys_params
            .get_param(SysParamType::CdpStartLiquidateRatio);
        let non_return_ratio = ctx
            .cache
            .sys_params
            .get_param(SysParamType::CdpNonReturnLiquidateRatio);
        let forced_ratio = ctx
            .cache
            .sys_params
            .get_param(SysParamType::CdpForceLiquidateRatio);
        let discount = ctx
            .cache
            .sys_params
            .get_param(SysParamType::CdpLiquidateDiscountRatio);

        let ratio = old.collateral_ratio(price);
        let terms = liquidation_terms(
            &old,
            ratio,
            price,
            start_liquidate_ratio,
            non_return_ratio,
            forced_ratio,
            discount,
        )?;

        if self.scoins_to_liquidate >= terms.scoins_to_liquidate {
            // Full buyout: the position closes.
            liquidator.sub_balance(TokenSymbol::Wusd, terms.scoins_to_liquidate)?;
            liquidator.add_balance(TokenSymbol::Wicc, terms.bcoins_to_liquidator)?;
            self.return_to_owner(ctx, &old, &mut liquidator, terms.bcoins_to_owner)?;
            ctx.cache.accounts.set_account(&liquidator);

            process_penalty_fees(ctx, terms.scoins_penalty)?;
            ctx.cache.cdps.erase_cdp(&old, &old);
        } else {
            // Partial liquidation: every leg scales by the offered share.
            let rate = self.scoins_to_liquidate as f64 / terms.scoins_to_liquidate as f64;
            let bcoins_to_liquidator = (terms.bcoins_to_liquidator as f64 * rate) as u64;
            let bcoins_to_owner = (terms.bcoins_to_owner as f64 * rate) as u64;
            let scoins_closeout = (old.total_owed_scoins as f64 * rate) as u64;
            let scoins_penalty = (terms.scoins_penalty as f64 * rate) as u64;

            liquidator.sub_balance(TokenSymbol::Wusd, self.scoins_to_liquidate)?;
            liquidator.add_balance(TokenSymbol::Wicc, bcoins_to_liquidator)?;
            self.return_to_owner(ctx, &old, &mut liquidator, bcoins_to_owner)?;
            ctx.cache.accounts.set_account(&liquidator);

            let mut new = old.clone();
            new.liquidate_partial(
                ctx.height,
                bcoins_to_liquidator + bcoins_to_owner,
                scoins_closeout,
            );
            check_staked_value_min(ctx, &new, price)?;

            process_penalty_fees(ctx, scoins_penalty)?;
            ctx.cache.cdps.update_cdp(&old, &new);
        }
        Ok(())
    }

    /// Return residual collateral to the position owner, folding the
    /// credit into the liquidator's account when they liquidate
    /// themselves.
    fn return_to_owner(
        &self,
        ctx: &mut ExecuteContext,
        cdp: &UserCdp,
        liquidator: &mut Account,
        bcoins: u64,
    ) -> TxResult<()> {
        if cdp.owner_regid == self.txuid {
            liquidator.add_balance(TokenSymbol::Wicc, bcoins)?;
            return Ok(());
        }
        let mut owner = ctx.account(&cdp.owner_regid)?;
        owner.add_balance(TokenSymbol::Wicc, bcoins)?;
        ctx.cache.accounts.set_account(&owner);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::Transaction;
    use ac_01_chain_params::{ChainParams, Network};
    use ac_02_state_cache::CacheWrapper;
    use shared_crypto::KeyPair;
    use shared_types::coins::BCOIN_PRICE_PAIR;
    use shared_types::KeyId;

    const CENT_FEE: u64 = 1_000_000;

    struct Fixture {
        params: ChainParams,
        cache: CacheWrapper<'static>,
        owner: Account,
        keypair: KeyPair,
        liquidator: Account,
        liquidator_keypair: KeyPair,
    }

    fn fixture(bcoin_price: u64) -> Fixture {
        let params = ChainParams::for_network(Network::Regtest);
        let mut cache = CacheWrapper::root();

        let keypair = KeyPair::from_seed([8; 32]).unwrap();
        let pubkey = keypair.public_key();
        let mut owner = Account::new(
            RegId::new(1, 1),
            KeyId::from_pubkey(&pubkey),
            Some(pubkey),
        );
        owner.add_balance(TokenSymbol::Wicc, 10_000 * COIN).unwrap();
        owner.add_balance(TokenSymbol::Wusd, 5_000 * COIN).unwrap();
        cache.accounts.set_account(&owner);

        let liquidator_keypair = KeyPair::from_seed([9; 32]).unwrap();
        let liq_pubkey = liquidator_keypair.public_key();
        let mut liquidator = Account::new(
            RegId::new(1, 2),
            KeyId::from_pubkey(&liq_pubkey),
            Some(liq_pubkey),
        );
        liquidator
            .add_balance(TokenSymbol::Wusd, 500 * COIN)
            .unwrap();
        cache.accounts.set_account(&liquidator);

        cache.prices.set_median(20, BCOIN_PRICE_PAIR, bcoin_price);
        Fixture {
            params,
            cache,
            owner,
            keypair,
            liquidator,
            liquidator_keypair,
        }
    }

    fn sign_stake(fx: &Fixture, mut tx: CdpStakeTx) -> CdpStakeTx {
        let digest = shared_crypto::hash(&tx.signature_payload());
        tx.signature = fx.keypair.sign(&digest);
        tx
    }

    fn stake_tx(fx: &Fixture, bcoins: u64, scoins: u64) -> CdpStakeTx {
        sign_stake(
            fx,
            CdpStakeTx {
                version: 1,
                valid_height: 20,
                txuid: fx.owner.regid,
                fee_symbol: TokenSymbol::Wicc,
                fee_amount: CENT_FEE,
                cdpid: None,
                bcoins_to_stake: bcoins,
                scoins_to_mint: scoins,
                signature: Signature::empty(),
            },
        )
    }

    fn liquidate_tx(fx: &Fixture, cdpid: TxId, scoins: u64) -> CdpLiquidateTx {
        let mut tx = CdpLiquidateTx {
            version: 1,
            valid_height: 20,
            txuid: fx.liquidator.regid,
            fee_symbol: TokenSymbol::Wusd,
            fee_amount: CENT_FEE,
            cdpid,
            scoins_to_liquidate: scoins,
            signature: Signature::empty(),
        };
        let digest = shared_crypto::hash(&tx.signature_payload());
        tx.signature = fx.liquidator_keypair.sign(&digest);
        tx
    }

    fn ctx<'c, 'a>(
        fx_params: &'c ChainParams,
        cache: &'c mut CacheWrapper<'a>,
    ) -> ExecuteContext<'c, 'a> {
        ctx_at(20, fx_params, cache)
    }

    fn ctx_at<'c, 'a>(
        height: u32,
        fx_params: &'c ChainParams,
        cache: &'c mut CacheWrapper<'a>,
    ) -> ExecuteContext<'c, 'a> {
        ExecuteContext {
            height,
            index: 1,
            fuel_rate: 100,
            block_time: 0,
            params: fx_params,
            cache,
        }
    }

    /// Open a 200-staked / 100-owed position and return its id.
    fn open_position(fx: &mut Fixture) -> TxId {
        let stake = stake_tx(fx, 200 * COIN, 100 * COIN);
        let cdpid = Transaction::CdpStake(stake.clone()).tx_hash();
        let mut c = ctx(&fx.params, &mut fx.cache);
        stake.check(&mut c).unwrap();
        stake.execute(&mut c).unwrap();
        cdpid
    }

    fn balance_of(fx: &Fixture, regid: &RegId, symbol: TokenSymbol) -> u64 {
        fx.cache
            .accounts
            .get_account(regid)
            .unwrap()
            .free_balance(symbol)
    }

    #[test]
    fn test_stake_opens_position() {
        let mut fx = fixture(PRICE_BOOST); // price 1.0
        let cdpid = open_position(&mut fx);

        let cdp = fx.cache.cdps.get_cdp(&cdpid).unwrap();
        assert_eq!(cdp.total_staked_bcoins, 200 * COIN);
        assert_eq!(cdp.total_owed_scoins, 100 * COIN);

        assert_eq!(
            balance_of(&fx, &fx.owner.regid, TokenSymbol::Wusd),
            5_000 * COIN + 100 * COIN
        );
    }

    #[test]
    fn test_stake_rejects_thin_collateral() {
        let mut fx = fixture(PRICE_BOOST);
        // 150 staked vs 100 minted: 150% < the 190% entry ratio
        let tx = stake_tx(&fx, 150 * COIN, 100 * COIN);

        let mut c = ctx(&fx.params, &mut fx.cache);
        assert!(matches!(
            tx.execute(&mut c),
            Err(TxError::CollateralRatioTooLow { .. })
        ));
    }

    #[test]
    fn test_stake_rejects_small_staked_value() {
        let mut fx = fixture(PRICE_BOOST);
        // 0.5 WICC stakes well above the ratio bar but under the 0.9 WUSD
        // dust bound.
        let tx = stake_tx(&fx, COIN / 2, COIN / 10);

        let mut c = ctx(&fx.params, &mut fx.cache);
        assert!(matches!(
            tx.execute(&mut c),
            Err(TxError::StakedValueTooSmall { .. })
        ));
    }

    #[test]
    fn test_stake_rejects_second_open_cdp() {
        let mut fx = fixture(PRICE_BOOST);
        open_position(&mut fx);

        let second = stake_tx(&fx, 400 * COIN, 200 * COIN);
        let mut c = ctx(&fx.params, &mut fx.cache);
        assert!(matches!(
            second.execute(&mut c),
            Err(TxError::OwnerHasOpenCdp(_))
        ));
    }

    #[test]
    fn test_cdp_txs_disabled_before_stablecoin_fork() {
        let mut fx = fixture(PRICE_BOOST);
        let tx = stake_tx(&fx, 200 * COIN, 100 * COIN);

        // Regtest forks at height 2; height 1 rejects CDP operations.
        let mut c = ctx_at(1, &fx.params, &mut fx.cache);
        assert!(matches!(
            tx.check(&mut c),
            Err(TxError::DisabledPreStablecoin { fork_height: 2 })
        ));
    }

    #[test]
    fn test_further_stake_charges_interest() {
        let mut fx = fixture(PRICE_BOOST);
        let cdpid = open_position(&mut fx);
        fx.cache.prices.set_median(21, BCOIN_PRICE_PAIR, PRICE_BOOST);

        let expected_interest = compute_cdp_interest(
            21,
            20,
            fx.params.day_block_count(21),
            SysParamType::CdpInterestParamA.default_value(),
            SysParamType::CdpInterestParamB.default_value(),
            100 * COIN,
        );
        assert!(expected_interest > 0);

        let grow = sign_stake(
            &fx,
            CdpStakeTx {
                version: 1,
                valid_height: 21,
                txuid: fx.owner.regid,
                fee_symbol: TokenSymbol::Wicc,
                fee_amount: CENT_FEE,
                cdpid: Some(cdpid),
                bcoins_to_stake: 100 * COIN,
                scoins_to_mint: 0,
                signature: Signature::empty(),
            },
        );
        let wusd_before = balance_of(&fx, &fx.owner.regid, TokenSymbol::Wusd);

        let mut c = ctx_at(21, &fx.params, &mut fx.cache);
        grow.check(&mut c).unwrap();
        grow.execute(&mut c).unwrap();

        let cdp = fx.cache.cdps.get_cdp(&cdpid).unwrap();
        assert_eq!(cdp.total_staked_bcoins, 300 * COIN);

        // Interest left the owner in stable coins and landed in the
        // risk reserve.
        assert_eq!(
            balance_of(&fx, &fx.owner.regid, TokenSymbol::Wusd),
            wusd_before - expected_interest
        );
        assert_eq!(
            balance_of(&fx, &fx.params.fcoin_genesis_regid(), TokenSymbol::Wusd),
            expected_interest
        );
    }

    #[test]
    fn test_redeem_closes_position() {
        let mut fx = fixture(PRICE_BOOST);
        let cdpid = open_position(&mut fx);

        let mut redeem = CdpRedeemTx {
            version: 1,
            valid_height: 20,
            txuid: fx.owner.regid,
            fee_symbol: TokenSymbol::Wicc,
            fee_amount: CENT_FEE,
            cdpid,
            scoins_to_repay: 100 * COIN,
            bcoins_to_redeem: 200 * COIN,
            signature: Signature::empty(),
        };
        let digest = shared_crypto::hash(&redeem.signature_payload());
        redeem.signature = fx.keypair.sign(&digest);

        let mut c = ctx(&fx.params, &mut fx.cache);
        redeem.check(&mut c).unwrap();
        redeem.execute(&mut c).unwrap();

        assert!(fx.cache.cdps.get_cdp(&cdpid).is_none());
        assert_eq!(fx.cache.cdps.global_owed_scoins(), 0);

        // Redemption also settles the accrued interest into the reserve.
        let interest = balance_of(&fx, &fx.params.fcoin_genesis_regid(), TokenSymbol::Wusd);
        assert!(interest > 0);
    }

    #[test]
    fn test_liquidate_rejected_above_start_ratio() {
        let mut fx = fixture(PRICE_BOOST);
        let cdpid = open_position(&mut fx);

        // 200% collateral is healthy; liquidation must be refused.
        let tx = liquidate_tx(&fx, cdpid, 50 * COIN);
        let mut c = ctx(&fx.params, &mut fx.cache);
        assert!(matches!(
            tx.execute(&mut c),
            Err(TxError::NotLiquidatable { .. })
        ));
    }

    #[test]
    fn test_liquidate_buyout_band_returns_residual_to_owner() {
        let mut fx = fixture(PRICE_BOOST);
        let cdpid = open_position(&mut fx);

        // Price 1.0 -> 0.6 puts the live ratio at 120%: inside the
        // 113%..150% band, a fixed 1.13N buyout with an owner residual.
        fx.cache
            .prices
            .set_median(20, BCOIN_PRICE_PAIR, PRICE_BOOST * 6 / 10);

        // Full buyout costs owed * 1.13 * 0.97 = 109.61 WUSD and buys
        // owed * 1.13 / 0.6 bcoins of the 200 staked.
        let scoins_total = 10_961_000_000u64;
        let bcoins_to_liquidator = 18_833_333_333u64;
        let owner_residual = 200 * COIN - bcoins_to_liquidator;
        let penalty = scoins_total - 100 * COIN;

        let owner_wicc_before = balance_of(&fx, &fx.owner.regid, TokenSymbol::Wicc);
        let tx = liquidate_tx(&fx, cdpid, 120 * COIN);

        let mut c = ctx(&fx.params, &mut fx.cache);
        tx.check(&mut c).unwrap();
        tx.execute(&mut c).unwrap();

        assert!(fx.cache.cdps.get_cdp(&cdpid).is_none());
        assert_eq!(fx.cache.cdps.global_owed_scoins(), 0);

        assert_eq!(
            balance_of(&fx, &fx.liquidator.regid, TokenSymbol::Wusd),
            500 * COIN - CENT_FEE - scoins_total
        );
        assert_eq!(
            balance_of(&fx, &fx.liquidator.regid, TokenSymbol::Wicc),
            bcoins_to_liquidator
        );
        assert_eq!(
            balance_of(&fx, &fx.owner.regid, TokenSymbol::Wicc),
            owner_wicc_before + owner_residual
        );

        // Penalty above the minimum fee: half to the reserve, half burned.
        assert_eq!(
            balance_of(&fx, &fx.params.fcoin_genesis_regid(), TokenSymbol::Wusd),
            penalty / 2
        );
    }

    #[test]
    fn test_liquidate_non_return_band_seizes_all_collateral() {
        let mut fx = fixture(PRICE_BOOST);
        let cdpid = open_position(&mut fx);

        // Price 0.55 puts the live ratio at 110%: inside the 104%..113%
        // band, the whole stake is bought and the owner gets nothing.
        fx.cache
            .prices
            .set_median(20, BCOIN_PRICE_PAIR, PRICE_BOOST * 55 / 100);

        // Full buyout costs staked * 0.55 * 0.97 = 106.7 WUSD.
        let scoins_total = 10_670_000_000u64;
        let owner_wicc_before = balance_of(&fx, &fx.owner.regid, TokenSymbol::Wicc);

        let tx = liquidate_tx(&fx, cdpid, 110 * COIN);
        let mut c = ctx(&fx.params, &mut fx.cache);
        tx.execute(&mut c).unwrap();

        assert!(fx.cache.cdps.get_cdp(&cdpid).is_none());
        assert_eq!(
            balance_of(&fx, &fx.liquidator.regid, TokenSymbol::Wicc),
            200 * COIN
        );
        assert_eq!(
            balance_of(&fx, &fx.liquidator.regid, TokenSymbol::Wusd),
            500 * COIN - CENT_FEE - scoins_total
        );
        // No residual for the owner in this band.
        assert_eq!(
            balance_of(&fx, &fx.owner.regid, TokenSymbol::Wicc),
            owner_wicc_before
        );
        // Penalty = 6.7 WUSD, half to the reserve.
        assert_eq!(
            balance_of(&fx, &fx.params.fcoin_genesis_regid(), TokenSymbol::Wusd),
            (scoins_total - 100 * COIN) / 2
        );
    }

    #[test]
    fn test_partial_liquidation_scales_all_legs() {
        let mut fx = fixture(PRICE_BOOST);
        let cdpid = open_position(&mut fx);
        fx.cache
            .prices
            .set_median(20, BCOIN_PRICE_PAIR, PRICE_BOOST * 6 / 10);

        // 30 of the 109.61 WUSD buyout: every leg scales by that share.
        let scoins_total = 10_961_000_000u64;
        let offered = 30 * COIN;
        let rate = offered as f64 / scoins_total as f64;
        let expected_bcoins = (18_833_333_333u64 as f64 * rate) as u64;
        let expected_closeout = ((100 * COIN) as f64 * rate) as u64;

        let tx = liquidate_tx(&fx, cdpid, offered);
        let mut c = ctx(&fx.params, &mut fx.cache);
        tx.execute(&mut c).unwrap();

        let cdp = fx.cache.cdps.get_cdp(&cdpid).unwrap();
        assert_eq!(cdp.total_owed_scoins, 100 * COIN - expected_closeout);
        assert!(cdp.total_staked_bcoins < 200 * COIN);

        assert_eq!(
            balance_of(&fx, &fx.liquidator.regid, TokenSymbol::Wicc),
            expected_bcoins
        );
        assert_eq!(
            balance_of(&fx, &fx.liquidator.regid, TokenSymbol::Wusd),
            500 * COIN - CENT_FEE - offered
        );
        // A proportional share of the penalty reached the reserve.
        assert!(
            balance_of(&fx, &fx.params.fcoin_genesis_regid(), TokenSymbol::Wusd) > 0
        );
    }

    #[test]
    fn test_deep_underwater_band_has_no_penalty() {
        let mut fx = fixture(PRICE_BOOST);
        let cdpid = open_position(&mut fx);

        // Price 0.5 puts the live ratio at 100%, at or under the forced
        // ratio: the stake settles against the owed amount, no penalty.
        fx.cache
            .prices
            .set_median(20, BCOIN_PRICE_PAIR, PRICE_BOOST / 2);

        let tx = liquidate_tx(&fx, cdpid, 100 * COIN);
        let mut c = ctx(&fx.params, &mut fx.cache);
        tx.execute(&mut c).unwrap();

        assert!(fx.cache.cdps.get_cdp(&cdpid).is_none());
        assert_eq!(
            balance_of(&fx, &fx.liquidator.regid, TokenSymbol::Wicc),
            200 * COIN
        );
        assert_eq!(
            balance_of(&fx, &fx.liquidator.regid, TokenSymbol::Wusd),
            500 * COIN - CENT_FEE - 100 * COIN
        );
        assert_eq!(
            balance_of(&fx, &fx.params.fcoin_genesis_regid(), TokenSymbol::Wusd),
            0
        );
    }

    #[test]
    fn test_liquidation_terms_bands() {
        let cdp = UserCdp::new(RegId::new(1, 1), [1; 32], 20, 200 * COIN, 100 * COIN);

        // Healthy: refused.
        assert!(liquidation_terms(&cdp, 16_000, PRICE_BOOST, 15_000, 11_300, 10_400, 9_700)
            .is_err());

        // Buyout band keeps an owner residual; deeper bands do not.
        let buyout =
            liquidation_terms(&cdp, 12_000, PRICE_BOOST * 6 / 10, 15_000, 11_300, 10_400, 9_700)
                .unwrap();
        assert!(buyout.bcoins_to_owner > 0);
        assert!(buyout.scoins_penalty > 0);

        let seized =
            liquidation_terms(&cdp, 11_000, PRICE_BOOST * 55 / 100, 15_000, 11_300, 10_400, 9_700)
                .unwrap();
        assert_eq!(seized.bcoins_to_owner, 0);
        assert_eq!(seized.bcoins_to_liquidator, 200 * COIN);

        let forced =
            liquidation_terms(&cdp, 10_000, PRICE_BOOST / 2, 15_000, 11_300, 10_400, 9_700)
                .unwrap();
        assert_eq!(forced.scoins_to_liquidate, 100 * COIN);
        assert_eq!(forced.scoins_penalty, 0);
    }
}
