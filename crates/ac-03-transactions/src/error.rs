//! Transaction validation and execution errors.
//!
//! Every rejection carries a stable numeric code; the packing loop and the
//! verifier copy `(code, reason)` pairs into the execution failure log.

use shared_types::{AccountError, RegId, TokenSymbol};
use thiserror::Error;

/// Result alias for transaction checks and execution.
pub type TxResult<T> = Result<T, TxError>;

/// Why a transaction was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TxError {
    /// Sender account does not exist
    #[error("account {0} not found")]
    AccountNotFound(RegId),

    /// Balance operation failed
    #[error(transparent)]
    Balance(#[from] AccountError),

    /// Signature missing or failed to verify
    #[error("bad transaction signature")]
    BadSignature,

    /// Fee declared in a token that cannot pay fees at this height
    #[error("unsupported fee symbol {0}")]
    UnsupportedFeeSymbol(TokenSymbol),

    /// Valid-height window missed
    #[error("valid height {valid_height} out of range at height {height}")]
    InvalidValidHeight {
        /// Declared valid height
        valid_height: u32,
        /// Executing height
        height: u32,
    },

    /// Transfer or mint amount of zero
    #[error("zero amount")]
    ZeroAmount,

    /// Memo over the consensus bound
    #[error("memo too large: {0} bytes")]
    MemoTooLarge(usize),

    /// Stablecoin-era transaction submitted before the fork
    #[error("transaction disabled before the stablecoin fork at height {fork_height}")]
    DisabledPreStablecoin {
        /// Height the transaction kind activates at
        fork_height: u32,
    },

    /// A CDP with this id already exists
    #[error("cdp already exists")]
    CdpAlreadyExists,

    /// Referenced CDP does not exist
    #[error("cdp not found")]
    CdpNotFound,

    /// CDP operated by someone other than its owner
    #[error("cdp owned by {owner}, operated by {operator}")]
    CdpNotOwned {
        /// Recorded owner
        owner: RegId,
        /// Offending operator
        operator: RegId,
    },

    /// Account already has an open position; one CDP per account
    #[error("account {0} already has an open cdp")]
    OwnerHasOpenCdp(RegId),

    /// Position would sit under the entry collateral ratio
    #[error("collateral ratio {have} below required {need}")]
    CollateralRatioTooLow {
        /// Resulting ratio (RATIO_BOOST scale)
        have: u64,
        /// Required ratio
        need: u64,
    },

    /// Position not yet liquidatable
    #[error("collateral ratio {have} above liquidation threshold {threshold}")]
    NotLiquidatable {
        /// Current ratio (RATIO_BOOST scale)
        have: u64,
        /// Liquidation threshold
        threshold: u64,
    },

    /// Global collateral ceiling would be pierced
    #[error("global collateral ceiling reached")]
    GlobalCollateralCeiling,

    /// Global collateral ratio under the governed floor
    #[error("global collateral ratio under floor")]
    GlobalCollateralFloor,

    /// No median price available for a pair
    #[error("no median price for {0}/{1}")]
    PriceUnavailable(TokenSymbol, TokenSymbol),

    /// Feeder below the staking bar for price feeds
    #[error("feeder stake {have} below minimum {need}")]
    FeederStakeTooLow {
        /// Feeder's staked bcoins
        have: u64,
        /// Required minimum
        need: u64,
    },

    /// Remaining staked collateral priced under the dust bound
    #[error("staked bcoins {staked} below minimum {min}")]
    StakedValueTooSmall {
        /// Staked base coins
        staked: u64,
        /// Minimum at the current price
        min: u64,
    },

    /// Carried medians disagree with the local price cache
    #[error("median price set mismatch")]
    MedianMismatch,

    /// Cache fabric invariant violation; aborts the mining task
    #[error("state corruption: {0}")]
    Fatal(String),
}

impl TxError {
    /// Stable numeric reject code for the execution failure log.
    pub fn reject_code(&self) -> u32 {
        match self {
            TxError::AccountNotFound(_) => 10,
            TxError::Balance(_) => 11,
            TxError::BadSignature => 12,
            TxError::UnsupportedFeeSymbol(_) => 13,
            TxError::InvalidValidHeight { .. } => 14,
            TxError::ZeroAmount => 15,
            TxError::MemoTooLarge(_) => 16,
            TxError::DisabledPreStablecoin { .. } => 17,
            TxError::CdpAlreadyExists => 30,
            TxError::CdpNotFound => 31,
            TxError::CdpNotOwned { .. } => 32,
            TxError::CollateralRatioTooLow { .. } => 33,
            TxError::NotLiquidatable { .. } => 34,
            TxError::GlobalCollateralCeiling => 35,
            TxError::GlobalCollateralFloor => 36,
            TxError::OwnerHasOpenCdp(_) => 37,
            TxError::PriceUnavailable(_, _) => 40,
            TxError::FeederStakeTooLow { .. } => 41,
            TxError::StakedValueTooSmall { .. } => 42,
            TxError::MedianMismatch => 43,
            TxError::Fatal(_) => 90,
        }
    }

    /// True for failures that must abort the mining task instead of merely
    /// dropping the transaction.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TxError::Fatal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_distinguish_kinds() {
        assert_ne!(
            TxError::BadSignature.reject_code(),
            TxError::CdpNotFound.reject_code()
        );
    }

    #[test]
    fn test_only_corruption_is_fatal() {
        assert!(TxError::Fatal("aggregate drift".into()).is_fatal());
        assert!(!TxError::BadSignature.is_fatal());
    }
}
