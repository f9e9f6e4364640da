//! Consensus rejection reasons.
//!
//! Every variant is terminal for the candidate block: the caller drops the
//! block and never retries it against the same state.

use ac_03_transactions::TxError;
use ac_05_delegate_schedule::ScheduleError;
use shared_types::RegId;
use thiserror::Error;

/// Why a candidate block was rejected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BlockValidationError {
    /// Header nonce above the network bound
    #[error("nonce {nonce} above bound {max}")]
    NonceOutOfRange {
        /// Header nonce
        nonce: u64,
        /// Network bound
        max: u64,
    },

    /// Merkle root does not cover the transaction vector
    #[error("merkle root mismatch")]
    MerkleMismatch,

    /// Block has no transactions (a reward is always required)
    #[error("block has no reward transaction")]
    MissingReward,

    /// Producer is not the slot's delegate
    #[error("wrong delegate: expected {expected}, block names {got}")]
    WrongDelegate {
        /// Slot delegate per the local schedule
        expected: RegId,
        /// Producer named by the block
        got: RegId,
    },

    /// Delegate account missing from the committed state
    #[error("delegate account {0} not found")]
    DelegateAccountMissing(RegId),

    /// The same delegate produced twice within one interval
    #[error("delegate {0} repeated within one slot interval")]
    SlotRepeat(RegId),

    /// Block signature missing or out of size bounds
    #[error("bad signature size: {0} bytes")]
    BadSignatureSize(usize),

    /// Header signature fails against both delegate keys
    #[error("header signature verification failed")]
    BadSignature,

    /// Reward transaction version mismatch
    #[error("reward tx version {got}, expected {expected}")]
    BadRewardVersion {
        /// Version carried by the block
        got: u16,
        /// Required version
        expected: u16,
    },

    /// A packed transaction is already confirmed
    #[error("duplicate transaction {0}")]
    DuplicateTx(String),

    /// A packed transaction failed re-execution
    #[error("tx {txid} failed: {source}")]
    ExecutionFailed {
        /// Offending transaction id (hex)
        txid: String,
        /// Underlying failure
        source: TxError,
    },

    /// Re-executed fuel total disagrees with the header
    #[error("fuel mismatch: computed {computed}, header {header}")]
    FuelMismatch {
        /// Fuel total from re-execution
        computed: u64,
        /// Fuel claimed by the header
        header: u64,
    },

    /// Cumulative run steps above the block bound
    #[error("run steps {total} above bound {max}")]
    RunStepOverflow {
        /// Cumulative run steps
        total: u64,
        /// Block bound
        max: u64,
    },

    /// Previous block unreadable from the store
    #[error("previous block not found")]
    MissingPrevBlock,

    /// No schedule could be computed
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}
