//! The governed system-parameter table.
//!
//! A closed set of tunable integers read by consensus code. Each parameter
//! persists under a single-letter key and falls back to its built-in default
//! until governance overrides it.

use serde::{Deserialize, Serialize};
use shared_types::COIN;

/// Tunable system parameters.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SysParamType {
    /// Trailing window, in blocks, for median price computation.
    MedianPriceSlideWindowBlockCount,
    /// Minimum staked bcoins (whole coins) to act as a price feeder.
    PriceFeedBcoinStakeAmountMin,
    /// Max consecutive deviations before a feeder forfeits its deposit.
    PriceFeedContinuousDeviateTimesMax,
    /// Max tolerated feed deviation ratio (RATIO_BOOST scale).
    PriceFeedDeviateRatioMax,
    /// Staked bcoins deducted per deviation penalty.
    PriceFeedDeviatePenalty,
    /// DEX deal fee ratio (RATIO_BOOST scale).
    DexDealFeeRatio,
    /// Stable coin friction fee routed to the risk reserve.
    ScoinReserveFeeRatio,
    /// Global collateral ceiling, in whole bcoins.
    GlobalCollateralCeilingAmount,
    /// Global collateral ratio floor (RATIO_BOOST scale).
    GlobalCollateralRatioMin,
    /// Minimum collateral ratio to open or grow a CDP.
    CdpStartCollateralRatio,
    /// Ratio below which ordinary liquidation opens.
    CdpStartLiquidateRatio,
    /// Ratio below which liquidation returns nothing to the owner.
    CdpNonReturnLiquidateRatio,
    /// Ratio at or below which forced settlement applies.
    CdpForceLiquidateRatio,
    /// Liquidator discount (RATIO_BOOST scale).
    CdpLiquidateDiscountRatio,
    /// Dust bound for minted scoins, in smallest units.
    CdpBcoinsToStakeAmountMinInScoin,
    /// CDP interest curve parameter a.
    CdpInterestParamA,
    /// CDP interest curve parameter b.
    CdpInterestParamB,
    /// Minimum penalty fee for system liquidation orders.
    CdpSysOrderPenaltyFeeMin,
    /// Asset issuance fee, smallest units.
    AssetIssueFee,
    /// Asset update fee, smallest units.
    AssetUpdateFee,
}

impl SysParamType {
    /// Every parameter, in persistence-key order.
    pub const ALL: [SysParamType; 20] = [
        SysParamType::MedianPriceSlideWindowBlockCount,
        SysParamType::PriceFeedBcoinStakeAmountMin,
        SysParamType::PriceFeedContinuousDeviateTimesMax,
        SysParamType::PriceFeedDeviateRatioMax,
        SysParamType::PriceFeedDeviatePenalty,
        SysParamType::DexDealFeeRatio,
        SysParamType::ScoinReserveFeeRatio,
        SysParamType::GlobalCollateralCeilingAmount,
        SysParamType::GlobalCollateralRatioMin,
        SysParamType::CdpStartCollateralRatio,
        SysParamType::CdpStartLiquidateRatio,
        SysParamType::CdpNonReturnLiquidateRatio,
        SysParamType::CdpForceLiquidateRatio,
        SysParamType::CdpLiquidateDiscountRatio,
        SysParamType::CdpBcoinsToStakeAmountMinInScoin,
        SysParamType::CdpInterestParamA,
        SysParamType::CdpInterestParamB,
        SysParamType::CdpSysOrderPenaltyFeeMin,
        SysParamType::AssetIssueFee,
        SysParamType::AssetUpdateFee,
    ];

    /// Single-letter persistence key.
    pub fn persist_key(&self) -> &'static str {
        match self {
            SysParamType::MedianPriceSlideWindowBlockCount => "A",
            SysParamType::PriceFeedBcoinStakeAmountMin => "B",
            SysParamType::PriceFeedContinuousDeviateTimesMax => "C",
            SysParamType::PriceFeedDeviateRatioMax => "D",
            SysParamType::PriceFeedDeviatePenalty => "E",
            SysParamType::DexDealFeeRatio => "F",
            SysParamType::ScoinReserveFeeRatio => "G",
            SysParamType::GlobalCollateralCeilingAmount => "H",
            SysParamType::GlobalCollateralRatioMin => "I",
            SysParamType::CdpStartCollateralRatio => "J",
            SysParamType::CdpStartLiquidateRatio => "K",
            SysParamType::CdpNonReturnLiquidateRatio => "L",
            SysParamType::CdpForceLiquidateRatio => "M",
            SysParamType::CdpLiquidateDiscountRatio => "N",
            SysParamType::CdpBcoinsToStakeAmountMinInScoin => "O",
            SysParamType::CdpInterestParamA => "P",
            SysParamType::CdpInterestParamB => "Q",
            SysParamType::CdpSysOrderPenaltyFeeMin => "R",
            SysParamType::AssetIssueFee => "S",
            SysParamType::AssetUpdateFee => "T",
        }
    }

    /// Built-in default, used until governance overrides the value.
    pub fn default_value(&self) -> u64 {
        match self {
            SysParamType::MedianPriceSlideWindowBlockCount => 11,
            SysParamType::PriceFeedBcoinStakeAmountMin => 210_000,
            SysParamType::PriceFeedContinuousDeviateTimesMax => 10,
            SysParamType::PriceFeedDeviateRatioMax => 3000,
            SysParamType::PriceFeedDeviatePenalty => 1000,
            SysParamType::DexDealFeeRatio => 4,
            SysParamType::ScoinReserveFeeRatio => 0,
            SysParamType::GlobalCollateralCeilingAmount => 52_500_000,
            SysParamType::GlobalCollateralRatioMin => 8000,
            SysParamType::CdpStartCollateralRatio => 19_000,
            SysParamType::CdpStartLiquidateRatio => 15_000,
            SysParamType::CdpNonReturnLiquidateRatio => 11_300,
            SysParamType::CdpForceLiquidateRatio => 10_400,
            SysParamType::CdpLiquidateDiscountRatio => 9700,
            SysParamType::CdpBcoinsToStakeAmountMinInScoin => 90_000_000,
            SysParamType::CdpInterestParamA => 2,
            SysParamType::CdpInterestParamB => 1,
            SysParamType::CdpSysOrderPenaltyFeeMin => 10,
            SysParamType::AssetIssueFee => 550 * COIN,
            SysParamType::AssetUpdateFee => 110 * COIN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_persist_keys_unique() {
        let keys: BTreeSet<_> = SysParamType::ALL.iter().map(|p| p.persist_key()).collect();
        assert_eq!(keys.len(), SysParamType::ALL.len());
    }

    #[test]
    fn test_key_range_a_to_t() {
        assert_eq!(SysParamType::ALL[0].persist_key(), "A");
        assert_eq!(SysParamType::ALL[19].persist_key(), "T");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(
            SysParamType::MedianPriceSlideWindowBlockCount.default_value(),
            11
        );
        assert_eq!(SysParamType::CdpStartCollateralRatio.default_value(), 19_000);
        assert_eq!(SysParamType::CdpForceLiquidateRatio.default_value(), 10_400);
    }
}
