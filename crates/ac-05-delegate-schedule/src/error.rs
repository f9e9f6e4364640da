//! Scheduling errors.

use thiserror::Error;

/// Why a schedule could not be computed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    /// Fewer delegates have votes than the committee requires
    #[error("only {have} delegates available, committee needs {need}")]
    NotEnoughDelegates {
        /// Delegates with committed votes
        have: usize,
        /// Required committee size
        need: usize,
    },
}
