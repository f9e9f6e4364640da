//! # Chain Parameters
//!
//! Everything that distinguishes one Anchor Chain network from another:
//! delegate committee size, block intervals before and after the stablecoin
//! fork, the stablecoin genesis height, nonce bounds and the genesis hash.
//! Also home to the consensus constants shared by the whole pipeline and the
//! governed system-parameter table read by CDP and price-feed code.

pub mod consensus;
pub mod network;
pub mod params;
pub mod sysparams;

pub use network::Network;
pub use params::{ChainParams, ForkVersion, FundCoinOutput};
pub use sysparams::SysParamType;
