//! The block assembler.
//!
//! Three height-selected paths share one packing loop: before the
//! stablecoin fork blocks carry a single-symbol reward, the stablecoin
//! genesis block carries the fund-coin grants and packs no mempool
//! transactions, and every later block carries a per-symbol reward map
//! plus the injected price median transaction.
//!
//! Packing executes each candidate on its own child scratch over the
//! block's outer scratch: a failing transaction is dropped with its child,
//! never contaminating the block. The outer scratch itself is discarded
//! when the candidate block is returned; connecting the block re-executes
//! it against committed state.

use crate::config::BlockProductionConfig;
use crate::error::{BlockProductionError, Result};
use crate::fuel::FuelRateController;
use ac_01_chain_params::consensus::{
    MAX_BLOCK_RUN_STEP, MAX_BLOCK_SIZE, PRICE_MEDIAN_TX_PRIORITY,
};
use ac_01_chain_params::{ChainParams, ForkVersion, SysParamType};
use ac_02_state_cache::CacheWrapper;
use ac_03_transactions::{
    Block, BlockHeader, BlockIndex, BlockRewardTx, BlockStore, ExecuteContext, PriceMedianTx,
    Transaction, UCoinBlockRewardTx, BLOCK_VERSION, INIT_TX_VERSION,
};
use ac_04_mempool::{collect_priorities, Mempool, TxPriority};
use shared_crypto::{Signature, Signer};
use shared_types::{Account, TokenSymbol, TxId};
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A transaction dropped during packing, for the execution failure log.
#[derive(Clone, Debug)]
pub struct PackFailure {
    /// Dropped transaction.
    pub txid: TxId,
    /// Reject code.
    pub code: u32,
    /// Reject reason.
    pub reason: String,
}

/// A freshly assembled, not yet sealed block.
#[derive(Debug)]
pub struct BlockCandidate {
    /// The block; reward stamping and signing happen at sealing.
    pub block: Block,
    /// Transactions dropped during packing.
    pub failures: Vec<PackFailure>,
    /// Total fees of the packed transactions.
    pub total_fees: u64,
}

struct PackOutcome {
    txs: Vec<Transaction>,
    total_size: u64,
    total_run_step: u64,
    total_fuel: u64,
    total_fees: u64,
    rewards: BTreeMap<TokenSymbol, u64>,
    failures: Vec<PackFailure>,
}

/// Assembles candidate blocks over a committed state view.
pub struct BlockAssembler {
    params: ChainParams,
    config: BlockProductionConfig,
    fuel_controller: FuelRateController,
}

impl BlockAssembler {
    /// Create an assembler for a network.
    pub fn new(params: ChainParams, config: BlockProductionConfig) -> Self {
        let fuel_controller = FuelRateController::new(config.fuel_window);
        Self {
            params,
            config,
            fuel_controller,
        }
    }

    /// Build the candidate block for the next height, selecting the path by
    /// fork schedule.
    pub fn create_new_block(
        &self,
        committed: &CacheWrapper,
        store: &dyn BlockStore,
        mempool: &Mempool,
        now: i64,
    ) -> Result<BlockCandidate> {
        let tip = store.tip().ok_or(BlockProductionError::NoTip)?;
        let height = tip.height + 1;

        if height == self.params.stablecoin_genesis_height {
            return self.create_stablecoin_genesis_block(store, &tip, now);
        }
        match self.params.fork_version(height) {
            ForkVersion::R1 => self.create_block_pre_stablecoin(committed, store, mempool, &tip, now),
            ForkVersion::R2 => self.create_block_post_stablecoin(committed, store, mempool, &tip, now),
        }
    }

    /// Pre-stablecoin path: single-symbol reward, no price median.
    fn create_block_pre_stablecoin(
        &self,
        committed: &CacheWrapper,
        store: &dyn BlockStore,
        mempool: &Mempool,
        tip: &BlockIndex,
        now: i64,
    ) -> Result<BlockCandidate> {
        let height = tip.height + 1;
        let fuel_rate = self.fuel_controller.fuel_rate(store, tip);
        let block_time = now.max(tip.time + 1);

        let reward = Transaction::BlockReward(BlockRewardTx {
            version: INIT_TX_VERSION,
            valid_height: height,
            ..BlockRewardTx::default()
        });
        let mut block = self.base_block(tip, height, block_time, fuel_rate, reward);

        let outcome = self.pack_transactions(
            committed,
            mempool,
            height,
            block_time,
            fuel_rate,
            block.serialized_size(),
            false,
        )?;

        if let Transaction::BlockReward(reward) = &mut block.txs[0] {
            reward.reward_fees = outcome
                .rewards
                .get(&TokenSymbol::Wicc)
                .copied()
                .unwrap_or(0);
        }
        self.finish_candidate(block, outcome, height)
    }

    /// Stablecoin genesis path: the fund-coin grant set, no mempool
    /// packing, zero fuel.
    fn create_stablecoin_genesis_block(
        &self,
        store: &dyn BlockStore,
        tip: &BlockIndex,
        now: i64,
    ) -> Result<BlockCandidate> {
        let height = tip.height + 1;
        let fuel_rate = self.fuel_controller.fuel_rate(store, tip);
        let block_time = now.max(tip.time + 1);

        let reward = Transaction::BlockReward(BlockRewardTx {
            version: INIT_TX_VERSION,
            valid_height: height,
            ..BlockRewardTx::default()
        });
        let mut block = self.base_block(tip, height, block_time, fuel_rate, reward);

        for output in self.params.fund_coin_genesis_outputs() {
            block.txs.push(Transaction::UCoinBlockReward(UCoinBlockRewardTx {
                version: INIT_TX_VERSION,
                valid_height: height,
                txuid: output.regid,
                reward_fees: BTreeMap::from([(output.symbol, output.amount)]),
                inflated_bcoins: 0,
            }));
        }

        info!(height, grants = block.txs.len() - 1, "stablecoin genesis block assembled");
        Ok(BlockCandidate {
            block,
            failures: Vec::new(),
            total_fees: 0,
        })
    }

    /// Post-stablecoin path: per-symbol reward map plus the injected price
    /// median transaction.
    fn create_block_post_stablecoin(
        &self,
        committed: &CacheWrapper,
        store: &dyn BlockStore,
        mempool: &Mempool,
        tip: &BlockIndex,
        now: i64,
    ) -> Result<BlockCandidate> {
        let height = tip.height + 1;
        let fuel_rate = self.fuel_controller.fuel_rate(store, tip);
        let block_time = now.max(tip.time + 1);

        let reward = Transaction::UCoinBlockReward(UCoinBlockRewardTx {
            version: INIT_TX_VERSION,
            valid_height: height,
            ..UCoinBlockRewardTx::default()
        });
        let mut block = self.base_block(tip, height, block_time, fuel_rate, reward);

        let outcome = self.pack_transactions(
            committed,
            mempool,
            height,
            block_time,
            fuel_rate,
            block.serialized_size(),
            true,
        )?;

        if let Transaction::UCoinBlockReward(reward) = &mut block.txs[0] {
            reward.reward_fees = outcome.rewards.clone();
        }
        self.finish_candidate(block, outcome, height)
    }

    fn base_block(
        &self,
        tip: &BlockIndex,
        height: u32,
        block_time: i64,
        fuel_rate: u32,
        reward: Transaction,
    ) -> Block {
        Block {
            header: BlockHeader {
                version: BLOCK_VERSION,
                prev_hash: tip.hash,
                merkle_root: [0u8; 32],
                time: block_time,
                nonce: 0,
                height,
                fuel: 0,
                fuel_rate,
                signature: Signature::empty(),
            },
            txs: vec![reward],
        }
    }

    fn finish_candidate(
        &self,
        mut block: Block,
        outcome: PackOutcome,
        height: u32,
    ) -> Result<BlockCandidate> {
        block.txs.extend(outcome.txs);
        block.header.fuel = outcome.total_fuel;

        info!(
            height,
            txs = block.txs.len(),
            size = outcome.total_size,
            fuel = outcome.total_fuel,
            dropped = outcome.failures.len(),
            "block candidate assembled"
        );
        Ok(BlockCandidate {
            block,
            failures: outcome.failures,
            total_fees: outcome.total_fees,
        })
    }

    /// The shared packing loop.
    fn pack_transactions(
        &self,
        committed: &CacheWrapper,
        mempool: &Mempool,
        height: u32,
        block_time: i64,
        fuel_rate: u32,
        base_size: u64,
        post_stablecoin: bool,
    ) -> Result<PackOutcome> {
        let block_max_size =
            self.config.block_max_size.clamp(1000, MAX_BLOCK_SIZE - 1000) as u64;

        let mut queue = collect_priorities(mempool, &committed.tx_seen, height, fuel_rate);
        if post_stablecoin {
            queue.insert(TxPriority::new(
                PRICE_MEDIAN_TX_PRIORITY,
                0.0,
                Arc::new(Transaction::PriceMedian(PriceMedianTx::at_height(height))),
            ));
        }
        debug!(candidates = queue.len(), height, "packing queue ready");

        let mut scratch = committed.fork();
        let mut outcome = PackOutcome {
            txs: Vec::new(),
            total_size: base_size,
            total_run_step: 0,
            total_fuel: 0,
            total_fees: 0,
            rewards: BTreeMap::new(),
            failures: Vec::new(),
        };

        let interval = self.params.block_interval(height) as u64;
        let slot_budget = Duration::from_secs(interval.saturating_sub(1).max(1));
        let packing_start = Instant::now();
        let mut index = 0u32;

        for candidate in queue.iter().rev() {
            if packing_start.elapsed() >= slot_budget {
                debug!(height, "slot budget elapsed, stopping packing");
                break;
            }

            // The median is materialized against the block's own scratch so
            // it reflects every feed packed ahead of it.
            let tx: Arc<Transaction> = if candidate.tx.is_price_median() {
                let window = scratch
                    .sys_params
                    .get_param(SysParamType::MedianPriceSlideWindowBlockCount);
                let mut median = PriceMedianTx::at_height(height);
                median.median_prices = scratch.prices.block_median_prices(height, window);
                Arc::new(Transaction::PriceMedian(median))
            } else {
                candidate.tx.clone()
            };

            let tx_size = tx.serialized_size() as u64;
            if outcome.total_size + tx_size >= block_max_size {
                debug!(txid = %hex::encode(tx.tx_hash()), "exceeds max block size, skipped");
                continue;
            }
            if outcome.total_run_step + tx.run_step() >= MAX_BLOCK_RUN_STEP {
                debug!(txid = %hex::encode(tx.tx_hash()), "exceeds max run steps, skipped");
                continue;
            }

            let fuel = tx.fuel(height, fuel_rate);
            let (fee_symbol, fee) = tx.fees();
            let symbol_ok = if post_stablecoin {
                matches!(fee_symbol, TokenSymbol::Wicc | TokenSymbol::Wusd)
            } else {
                fee_symbol == TokenSymbol::Wicc || fee == 0
            };
            if !symbol_ok || fee < fuel {
                outcome.failures.push(PackFailure {
                    txid: tx.tx_hash(),
                    code: 13,
                    reason: format!("fee {fee} {fee_symbol} cannot cover fuel {fuel}"),
                });
                continue;
            }

            let txid = tx.tx_hash();
            let executed = {
                let mut child = scratch.fork();
                let mut ctx = ExecuteContext {
                    height,
                    index: index + 1,
                    fuel_rate,
                    block_time,
                    params: &self.params,
                    cache: &mut child,
                };
                let result = tx.check(&mut ctx).and_then(|_| tx.execute(&mut ctx));
                result.map(|_| child.into_changes())
            };
            let changes = match executed {
                Ok(changes) => changes,
                Err(err) if err.is_fatal() => {
                    return Err(BlockProductionError::Internal(err.to_string()));
                }
                Err(err) => {
                    warn!(txid = %hex::encode(txid), %err, "failed to pack transaction");
                    outcome.failures.push(PackFailure {
                        txid,
                        code: err.reject_code(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };
            scratch.apply(changes);

            outcome.total_size += tx_size;
            outcome.total_run_step += tx.run_step();
            outcome.total_fuel += fuel;
            outcome.total_fees += fee;
            *outcome.rewards.entry(fee_symbol).or_insert(0) += fee - fuel;
            outcome.txs.push((*tx).clone());
            index += 1;
        }

        Ok(outcome)
    }

    /// Seal a candidate: stamp the reward transaction with the producing
    /// delegate, fill the header and sign it.
    ///
    /// Refuses to seal when the same delegate already produced the previous
    /// block within one interval.
    pub fn finalize_and_sign(
        &self,
        block: &mut Block,
        delegate: &Account,
        committed: &CacheWrapper,
        store: &dyn BlockStore,
        current_time: i64,
        signer: &dyn Signer,
    ) -> Result<()> {
        let height = block.header.height;
        let first_past_genesis =
            height == 1 && block.header.prev_hash == self.params.genesis_block_hash;

        if !first_past_genesis {
            let prev_index = store
                .get_index(&block.header.prev_hash)
                .ok_or(BlockProductionError::MissingPrevBlock)?;
            let prev_block = store
                .read_block(&prev_index)
                .ok_or(BlockProductionError::MissingPrevBlock)?;
            let prev_producer = prev_block
                .reward_tx()
                .map(|tx| tx.txuid())
                .ok_or(BlockProductionError::MissingPrevBlock)?;
            let prev_account = committed.accounts.get_account(&prev_producer);

            let interval = self.params.block_interval(height) as i64;
            if current_time - prev_block.header.time < interval
                && prev_account.is_some_and(|account| account.regid == delegate.regid)
            {
                return Err(BlockProductionError::SlotRepeat);
            }
        }

        match &mut block.txs[0] {
            Transaction::BlockReward(reward) => {
                reward.txuid = delegate.regid;
                reward.valid_height = height;
            }
            Transaction::UCoinBlockReward(reward) => {
                reward.txuid = delegate.regid;
                reward.valid_height = height;
                reward.inflated_bcoins = delegate.block_inflate_interest(
                    self.params.total_delegate_num,
                    self.params.subsidy_rate(height),
                    self.params.year_block_count(height),
                );
            }
            _ => {
                return Err(BlockProductionError::Internal(
                    "first transaction is not a reward".into(),
                ))
            }
        }

        block.header.nonce = rand::thread_rng().gen_range(0..=self.params.max_nonce);
        block.header.merkle_root = block.build_merkle_root();
        block.header.time = current_time;

        let signing_key_id = delegate
            .miner_pubkey
            .as_ref()
            .map(|key| key.key_id_bytes())
            .unwrap_or(delegate.keyid.0);
        let digest = block.header.signature_hash();
        block.header.signature = signer.sign(&signing_key_id, &digest)?;
        Ok(())
    }

    /// Network parameters this assembler follows.
    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    /// Production configuration.
    pub fn config(&self) -> &BlockProductionConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ac_01_chain_params::consensus::INIT_FUEL_RATES;
    use ac_01_chain_params::Network;
    use ac_03_transactions::{BaseCoinTransferTx, MemoryBlockStore};
    use shared_types::{KeyId, RegId};

    fn assembler() -> BlockAssembler {
        BlockAssembler::new(
            ChainParams::for_network(Network::Regtest),
            BlockProductionConfig::default(),
        )
    }

    fn genesis_fixture() -> (CacheWrapper<'static>, MemoryBlockStore) {
        let params = ChainParams::for_network(Network::Regtest);
        let mut committed = CacheWrapper::root();
        let mut delegate = Account::new(RegId::new(0, 1), KeyId([0x01; 20]), None);
        delegate.received_votes = 1000;
        delegate.add_balance(TokenSymbol::Wicc, 1_000_000).unwrap();
        committed.accounts.set_account(&delegate);
        committed.delegates.set_votes(delegate.regid, 1000);
        (committed, MemoryBlockStore::with_genesis(&params, 1_600_000_000))
    }

    #[test]
    fn test_empty_mempool_yields_reward_only_block() {
        let assembler = assembler();
        let (committed, store) = genesis_fixture();
        let mempool = Mempool::new();

        let candidate = assembler
            .create_new_block(&committed, &store, &mempool, 1_600_000_010)
            .unwrap();

        assert_eq!(candidate.block.header.height, 1);
        assert_eq!(candidate.block.txs.len(), 1);
        assert_eq!(candidate.block.header.fuel, 0);
        assert_eq!(candidate.block.header.fuel_rate, INIT_FUEL_RATES);
        assert!(candidate.failures.is_empty());
    }

    #[test]
    fn test_failing_tx_is_dropped_and_logged() {
        let assembler = assembler();
        let (committed, store) = genesis_fixture();

        // Unsigned transfer: check() rejects it during packing.
        let mut mempool = Mempool::new();
        mempool.insert(Arc::new(Transaction::BaseCoinTransfer(BaseCoinTransferTx {
            version: 1,
            valid_height: 1,
            txuid: RegId::new(0, 1),
            fee_amount: 100,
            to: KeyId([0x02; 20]),
            amount: 500,
            memo: Vec::new(),
            signature: Signature::empty(),
        })));

        let candidate = assembler
            .create_new_block(&committed, &store, &mempool, 1_600_000_010)
            .unwrap();

        assert_eq!(candidate.block.txs.len(), 1);
        assert_eq!(candidate.failures.len(), 1);
        assert!(candidate.failures[0].reason.contains("signature"));
    }

    #[test]
    fn test_stablecoin_genesis_carries_fund_grants() {
        let assembler = assembler();
        let (mut committed, mut store) = genesis_fixture();
        let mempool = Mempool::new();

        // Advance to height 1 so the next block is the regtest stablecoin
        // genesis height.
        let first = assembler
            .create_new_block(&committed, &store, &mempool, 1_600_000_010)
            .unwrap();
        let mut block = first.block;
        block.header.merkle_root = block.build_merkle_root();
        store.insert_block(&block);
        committed.tx_seen.add_tx(block.txs[0].tx_hash());

        let genesis = assembler
            .create_new_block(&committed, &store, &mempool, 1_600_000_013)
            .unwrap();
        let params = assembler.params();
        assert_eq!(genesis.block.header.height, params.stablecoin_genesis_height);
        assert_eq!(genesis.block.header.fuel, 0);
        assert_eq!(
            genesis.block.txs.len(),
            1 + params.fund_coin_genesis_outputs().len()
        );
    }

    #[test]
    fn test_block_max_size_is_clamped() {
        let mut config = BlockProductionConfig::default();
        config.block_max_size = 10; // absurdly small; clamps to 1 KB
        let assembler = BlockAssembler::new(ChainParams::for_network(Network::Regtest), config);
        let (committed, store) = genesis_fixture();
        let mempool = Mempool::new();

        // Packing succeeds: the reward alone fits inside the clamped bound.
        let candidate = assembler
            .create_new_block(&committed, &store, &mempool, 1_600_000_010)
            .unwrap();
        assert_eq!(candidate.block.txs.len(), 1);
    }
}
