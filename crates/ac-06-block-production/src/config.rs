//! Block production configuration.

use ac_01_chain_params::consensus::{DEFAULT_BLOCK_MAX_SIZE, DEFAULT_FUEL_WINDOW};
use serde::Deserialize;

/// Runtime configuration for block production.
#[derive(Clone, Debug, Deserialize)]
pub struct BlockProductionConfig {
    /// Upper bound on assembled block bytes; clamped to
    /// `[1 KB, MAX_BLOCK_SIZE - 1 KB]` at use.
    #[serde(default = "default_block_max_size")]
    pub block_max_size: u32,

    /// Trailing-window length for fuel-rate adaptation.
    #[serde(default = "default_fuel_window")]
    pub fuel_window: u32,

    /// Outside mainnet, bypass the peer/staleness gate.
    #[serde(default)]
    pub force_mine: bool,
}

fn default_block_max_size() -> u32 {
    DEFAULT_BLOCK_MAX_SIZE
}

fn default_fuel_window() -> u32 {
    DEFAULT_FUEL_WINDOW
}

impl Default for BlockProductionConfig {
    fn default() -> Self {
        Self {
            block_max_size: DEFAULT_BLOCK_MAX_SIZE,
            fuel_window: DEFAULT_FUEL_WINDOW,
            force_mine: false,
        }
    }
}
