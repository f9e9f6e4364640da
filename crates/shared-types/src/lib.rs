//! # Shared Types
//!
//! Identifiers, token symbols and the account entity used by every Anchor
//! Chain subsystem. Nothing here performs I/O; these are the plain data
//! types that flow between the mempool, the block assembler, the verifier
//! and the state cache fabric.

pub mod account;
pub mod coins;
pub mod ids;

pub use account::{Account, AccountError};
pub use coins::{CoinPricePair, TokenSymbol, CENT, COIN};
pub use ids::{BlockHash, KeyId, RegId, TxId};
