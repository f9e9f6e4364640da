//! Block production errors.

use ac_05_delegate_schedule::ScheduleError;
use ac_07_block_validation::BlockValidationError;
use shared_crypto::CryptoError;
use thiserror::Error;

/// Result alias for block production operations.
pub type Result<T> = std::result::Result<T, BlockProductionError>;

/// Why a block attempt failed.
#[derive(Debug, Error)]
pub enum BlockProductionError {
    /// Chain has no tip to build on
    #[error("no chain tip")]
    NoTip,

    /// Tip moved while the candidate was being built
    #[error("candidate went stale")]
    Stale,

    /// The slot delegate repeated within one interval
    #[error("delegate produced twice in one slot interval")]
    SlotRepeat,

    /// Previous block unreadable from the store
    #[error("previous block not found")]
    MissingPrevBlock,

    /// No key material for the slot delegate
    #[error("signer error: {0}")]
    Signer(#[from] CryptoError),

    /// No schedule could be computed
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// The freshly produced block failed self-validation
    #[error("self-validation failed: {0}")]
    Validation(#[from] BlockValidationError),

    /// Cache fabric invariant violation
    #[error("internal error: {0}")]
    Internal(String),
}

impl BlockProductionError {
    /// True for failures the mining loop absorbs by retrying.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BlockProductionError::NoTip
                | BlockProductionError::Stale
                | BlockProductionError::SlotRepeat
                | BlockProductionError::MissingPrevBlock
                | BlockProductionError::Schedule(_)
        )
    }

    /// True for failures that must stop the mining task.
    pub fn is_critical(&self) -> bool {
        matches!(self, BlockProductionError::Internal(_))
    }
}
