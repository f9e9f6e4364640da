//! # Block Validation
//!
//! The receiving-side mirror of block production. A candidate block is
//! checked against the locally recomputed delegate schedule, its header
//! invariants (nonce bound, merkle root, signature, reward version), the
//! one-block-per-slot rule, and (for blocks being accepted) full
//! transaction re-execution with fuel accounting on a throwaway scratch
//! cache.

pub mod error;
pub mod verifier;

pub use error::BlockValidationError;
pub use verifier::BlockVerifier;
