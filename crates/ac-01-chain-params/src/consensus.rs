//! Consensus constants shared by block production, validation and the CDP
//! engine. Changing any of these is a hard fork.

/// Max cumulative run steps (compute units) per block.
pub const MAX_BLOCK_RUN_STEP: u64 = 12_000_000;

/// Fuel rate at genesis and while the chain is shorter than two windows.
pub const INIT_FUEL_RATES: u32 = 100;

/// Floor for the adaptive fuel rate.
pub const MIN_FUEL_RATES: u32 = 1;

/// Default trailing-window length for fuel-rate adaptation.
pub const DEFAULT_FUEL_WINDOW: u32 = 50;

/// Hard cap on serialized block size (network rule).
pub const MAX_BLOCK_SIZE: u32 = 4_000_000;

/// Default for the configurable assembled-block size bound.
pub const DEFAULT_BLOCK_MAX_SIZE: u32 = 3_750_000;

/// Largest accepted block or transaction signature, in bytes.
pub const MAX_SIGNATURE_SIZE: usize = 100;

/// Capacity of the recently-mined-blocks ring.
pub const MAX_MINED_BLOCK_COUNT: usize = 100;

/// Priority ceiling for ordinary user transactions.
pub const PRIORITY_CEILING: f64 = 1_000.0;

/// Fixed priority of the system-injected price median transaction.
pub const PRICE_MEDIAN_TX_PRIORITY: f64 = 10_000.0;

/// Fixed priority of delegate price feed transactions.
pub const PRICE_FEED_TX_PRIORITY: f64 = 20_000.0;

/// Collateral/liquidation ratios are expressed at this scale (10^4 = 100%).
pub const RATIO_BOOST: u64 = 10_000;

/// Prices are expressed at this scale (10^8 = 1.0).
pub const PRICE_BOOST: u64 = 100_000_000;

/// The pre-price CDP collateral ratio base is fixed point at this scale.
pub const CDP_RATIO_SCALE: u64 = 100_000_000;

/// Upper bound on forced CDP settlements per block.
pub const FORCE_SETTLE_CDP_MAX_COUNT_PER_BLOCK: usize = 1000;

/// Initial per-block subsidy rate for delegates, in percent.
pub const INITIAL_SUBSIDY_RATE: u64 = 5;

/// Eventual subsidy rate after the yearly decay bottoms out, in percent.
pub const FIXED_SUBSIDY_RATE: u64 = 1;

/// Total fund coin released in the stablecoin genesis block (whole coins).
pub const FUND_COIN_GENESIS_RELEASE: u64 = 20_160_000_000;

/// Initial stable coin reserve seeded at stablecoin genesis (whole coins).
pub const FUND_COIN_GENESIS_RESERVE: u64 = 1_000_000;
