//! Adaptive fuel-rate control.
//!
//! The per-block price of compute follows demand: when the trailing
//! window's average run-step load sits under 75% of the block bound the
//! rate decays 10%, above 85% it grows 10%, in between it holds. A young
//! chain prices at the initial rate.

use ac_01_chain_params::consensus::{INIT_FUEL_RATES, MAX_BLOCK_RUN_STEP, MIN_FUEL_RATES};
use ac_03_transactions::{BlockIndex, BlockStore};
use tracing::debug;

/// Computes the fuel rate for the next block from chain history.
#[derive(Clone, Debug)]
pub struct FuelRateController {
    window: u32,
}

impl FuelRateController {
    /// Create a controller over a trailing window of `window` blocks.
    pub fn new(window: u32) -> Self {
        Self {
            window: window.max(1),
        }
    }

    /// Fuel rate for the block built on `tip`.
    pub fn fuel_rate(&self, store: &dyn BlockStore, tip: &BlockIndex) -> u32 {
        if self.window as u64 * 2 >= tip.height.saturating_sub(1) as u64 {
            return INIT_FUEL_RATES;
        }

        let mut total_step = 0u64;
        let mut cursor = tip.clone();
        for _ in 0..self.window {
            total_step += cursor.fuel * 100 / cursor.fuel_rate.max(1) as u64;
            match store.get_index(&cursor.prev_hash) {
                Some(prev) => cursor = prev,
                None => return INIT_FUEL_RATES,
            }
        }

        let average_step = total_step / self.window as u64;
        let new_rate = if average_step < MAX_BLOCK_RUN_STEP * 75 / 100 {
            tip.fuel_rate as u64 * 9 / 10
        } else if average_step > MAX_BLOCK_RUN_STEP * 85 / 100 {
            tip.fuel_rate as u64 * 11 / 10
        } else {
            tip.fuel_rate as u64
        };

        let new_rate = (new_rate as u32).max(MIN_FUEL_RATES);
        debug!(
            prev_rate = tip.fuel_rate,
            new_rate,
            average_step,
            height = tip.height,
            "fuel rate adapted"
        );
        new_rate
    }
}

impl Default for FuelRateController {
    fn default() -> Self {
        Self::new(ac_01_chain_params::consensus::DEFAULT_FUEL_WINDOW)
    }
}
