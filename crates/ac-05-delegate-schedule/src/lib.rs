//! # Delegate Schedule
//!
//! Deterministic slot → delegate assignment. The committee is the top-N
//! delegates by committed votes; every epoch it is permuted by a seeded
//! digest-chain shuffle, and wall-clock slots index into the permutation.
//! Two nodes with the same committed vote state compute identical
//! schedules, which is what lets a validator reject a block produced by
//! the wrong delegate.

pub mod error;
pub mod scheduler;

pub use error::ScheduleError;
pub use scheduler::DelegateScheduler;
