//! Per-network chain parameters.

use crate::consensus::{
    FIXED_SUBSIDY_RATE, FUND_COIN_GENESIS_RELEASE, FUND_COIN_GENESIS_RESERVE,
    INITIAL_SUBSIDY_RATE, MAX_BLOCK_SIZE,
};
use crate::network::Network;
use serde::{Deserialize, Serialize};
use shared_crypto::hash;
use shared_types::{BlockHash, RegId, TokenSymbol, COIN};

/// Feature fork versions, monotone in height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ForkVersion {
    /// Pre-stablecoin consensus rules.
    R1,
    /// Stablecoin-era rules: multi-token rewards, price medians, CDPs.
    R2,
}

/// A fund-coin grant included in the stablecoin genesis block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FundCoinOutput {
    /// Receiving account.
    pub regid: RegId,
    /// Granted token.
    pub symbol: TokenSymbol,
    /// Amount in smallest units.
    pub amount: u64,
}

/// Tweakable parameters of one network instance.
#[derive(Clone, Debug)]
pub struct ChainParams {
    /// Which network these parameters describe.
    pub network: Network,
    /// Size of the delegate committee (top N by votes).
    pub total_delegate_num: u32,
    /// Height of the stablecoin genesis block; also the R1/R2 fork height.
    pub stablecoin_genesis_height: u32,
    /// Upper bound for block header nonces.
    pub max_nonce: u64,
    /// Hash of the genesis block.
    pub genesis_block_hash: BlockHash,
    /// Block interval before the stablecoin fork, seconds.
    pub pre_interval: u32,
    /// Block interval from the stablecoin fork on, seconds.
    pub post_interval: u32,
    /// Hard cap on serialized block size.
    pub max_block_size: u32,
}

impl ChainParams {
    /// Parameters for a network.
    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Main => Self {
                network,
                total_delegate_num: 11,
                stablecoin_genesis_height: 4_109_388,
                max_nonce: 1000,
                genesis_block_hash: hash(b"anchor-chain-genesis-main"),
                pre_interval: 10,
                post_interval: 3,
                max_block_size: MAX_BLOCK_SIZE,
            },
            Network::Test => Self {
                network,
                total_delegate_num: 11,
                stablecoin_genesis_height: 2_200_000,
                max_nonce: 1000,
                genesis_block_hash: hash(b"anchor-chain-genesis-test"),
                pre_interval: 10,
                post_interval: 3,
                max_block_size: MAX_BLOCK_SIZE,
            },
            Network::Regtest => Self {
                network,
                total_delegate_num: 1,
                stablecoin_genesis_height: 2,
                max_nonce: 1000,
                genesis_block_hash: hash(b"anchor-chain-genesis-regtest"),
                pre_interval: 10,
                post_interval: 3,
                max_block_size: MAX_BLOCK_SIZE,
            },
        }
    }

    /// Block interval at a height, seconds.
    pub fn block_interval(&self, height: u32) -> u32 {
        if height >= self.stablecoin_genesis_height {
            self.post_interval
        } else {
            self.pre_interval
        }
    }

    /// Feature fork version active at a height.
    pub fn fork_version(&self, height: u32) -> ForkVersion {
        if height >= self.stablecoin_genesis_height {
            ForkVersion::R2
        } else {
            ForkVersion::R1
        }
    }

    /// Blocks per year at a height.
    pub fn year_block_count(&self, height: u32) -> u64 {
        365 * 24 * 3600 / self.block_interval(height) as u64
    }

    /// Blocks per day at a height.
    pub fn day_block_count(&self, height: u32) -> u64 {
        24 * 3600 / self.block_interval(height) as u64
    }

    /// Delegate subsidy rate in percent at a height: starts at
    /// `INITIAL_SUBSIDY_RATE` and decays one point per year of blocks down
    /// to `FIXED_SUBSIDY_RATE`.
    pub fn subsidy_rate(&self, height: u32) -> u64 {
        let years = height as u64 / self.year_block_count(height);
        INITIAL_SUBSIDY_RATE
            .saturating_sub(years)
            .max(FIXED_SUBSIDY_RATE)
    }

    /// The fund-coin genesis account, registered in the stablecoin genesis
    /// block itself.
    pub fn fcoin_genesis_regid(&self) -> RegId {
        RegId::new(self.stablecoin_genesis_height, 1)
    }

    /// The fund-coin grants placed in the stablecoin genesis block.
    pub fn fund_coin_genesis_outputs(&self) -> Vec<FundCoinOutput> {
        let reserve_regid = RegId::new(self.stablecoin_genesis_height, 2);
        vec![
            FundCoinOutput {
                regid: self.fcoin_genesis_regid(),
                symbol: TokenSymbol::Wgrt,
                amount: FUND_COIN_GENESIS_RELEASE.saturating_mul(COIN),
            },
            FundCoinOutput {
                regid: reserve_regid,
                symbol: TokenSymbol::Wusd,
                amount: FUND_COIN_GENESIS_RESERVE.saturating_mul(COIN),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_switches_at_fork() {
        let params = ChainParams::for_network(Network::Main);
        let fork = params.stablecoin_genesis_height;

        assert_eq!(params.block_interval(fork - 1), 10);
        assert_eq!(params.block_interval(fork), 3);
    }

    #[test]
    fn test_fork_version() {
        let params = ChainParams::for_network(Network::Regtest);
        assert_eq!(params.fork_version(1), ForkVersion::R1);
        assert_eq!(
            params.fork_version(params.stablecoin_genesis_height),
            ForkVersion::R2
        );
    }

    #[test]
    fn test_regtest_single_delegate() {
        assert_eq!(ChainParams::for_network(Network::Regtest).total_delegate_num, 1);
    }

    #[test]
    fn test_day_block_count_follows_interval() {
        let params = ChainParams::for_network(Network::Main);
        let fork = params.stablecoin_genesis_height;
        assert_eq!(params.day_block_count(fork - 1), 8_640);
        assert_eq!(params.day_block_count(fork), 28_800);
    }

    #[test]
    fn test_subsidy_rate_decays_to_floor() {
        let params = ChainParams::for_network(Network::Main);
        assert_eq!(params.subsidy_rate(0), INITIAL_SUBSIDY_RATE);

        // Far in the future the rate bottoms out at the fixed rate.
        let far = u32::MAX;
        assert_eq!(params.subsidy_rate(far), FIXED_SUBSIDY_RATE);
    }

    #[test]
    fn test_genesis_hashes_differ_by_network() {
        let main = ChainParams::for_network(Network::Main);
        let test = ChainParams::for_network(Network::Test);
        assert_ne!(main.genesis_block_hash, test.genesis_block_hash);
    }

    #[test]
    fn test_fund_coin_outputs() {
        let params = ChainParams::for_network(Network::Regtest);
        let outputs = params.fund_coin_genesis_outputs();

        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].symbol, TokenSymbol::Wgrt);
        assert_eq!(outputs[0].regid, params.fcoin_genesis_regid());
        assert_eq!(outputs[1].symbol, TokenSymbol::Wusd);
    }
}
