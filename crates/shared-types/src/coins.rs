//! Token symbols and coin units.
//!
//! Three native tokens circulate: the base coin WICC (staking, fees), the
//! USD-pegged stable coin WUSD (minted against CDPs) and the fund coin WGRT
//! (fee/reward distribution). USD appears only as the quote side of price
//! pairs fed by delegates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest unit per whole coin (10^8).
pub const COIN: u64 = 100_000_000;

/// 0.01 coin in smallest units.
pub const CENT: u64 = 1_000_000;

/// Closed set of token symbols known to consensus code.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum TokenSymbol {
    /// Base coin (staking, governance, fees).
    Wicc,
    /// USD-pegged stable coin minted against CDPs.
    Wusd,
    /// Fund coin.
    Wgrt,
    /// Fiat USD, quote side of price pairs only.
    Usd,
}

impl TokenSymbol {
    /// Ticker string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenSymbol::Wicc => "WICC",
            TokenSymbol::Wusd => "WUSD",
            TokenSymbol::Wgrt => "WGRT",
            TokenSymbol::Usd => "USD",
        }
    }

    /// True for tokens that can circulate in account balances.
    pub fn is_native(&self) -> bool {
        !matches!(self, TokenSymbol::Usd)
    }
}

impl fmt::Display for TokenSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A priced coin pair, e.g. (WICC, USD).
pub type CoinPricePair = (TokenSymbol, TokenSymbol);

/// The base-coin/USD pair used by CDP collateral valuation.
pub const BCOIN_PRICE_PAIR: CoinPricePair = (TokenSymbol::Wicc, TokenSymbol::Usd);
