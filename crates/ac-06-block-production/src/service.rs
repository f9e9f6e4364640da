//! The mining task.
//!
//! A single long-lived loop: build a candidate under the chain and mempool
//! locks, sleep to the slot floor, then keep attempting to seal until the
//! candidate goes stale (tip moved, mempool changed meaningfully, or 60
//! seconds passed). Outside regtest the loop idles at 1 Hz while peerless
//! or while the tip is older than an hour, unless forced.

use crate::assembler::{BlockAssembler, BlockCandidate};
use crate::error::BlockProductionError;
use crate::node::Node;
use crate::ring::MinedBlockInfo;
use ac_01_chain_params::Network;
use ac_03_transactions::BlockIndex;
use ac_05_delegate_schedule::{DelegateScheduler, ScheduleError};
use ac_07_block_validation::BlockVerifier;
use shared_crypto::Signer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// How long one candidate is retried before rebuilding.
const CANDIDATE_LIFETIME: Duration = Duration::from_secs(60);

/// Poll interval while waiting for a slot to open.
const SLOT_POLL: Duration = Duration::from_millis(100);

/// Tip age beyond which a peered node refuses to mine, seconds.
const STALE_TIP_AGE: i64 = 60 * 60;

/// View of the peer set; gossip lives outside the core.
pub trait PeerView: Send + Sync {
    /// Number of connected peers.
    fn peer_count(&self) -> usize;
}

/// Fixed peer count, for tests and regtest.
pub struct StaticPeerView(pub usize);

impl PeerView for StaticPeerView {
    fn peer_count(&self) -> usize {
        self.0
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// The block-producing task.
pub struct MiningService {
    node: Arc<Node>,
    assembler: BlockAssembler,
    verifier: BlockVerifier,
    scheduler: DelegateScheduler,
    signer: Arc<dyn Signer>,
    peers: Arc<dyn PeerView>,
}

impl MiningService {
    /// Assemble the service.
    pub fn new(
        node: Arc<Node>,
        assembler: BlockAssembler,
        signer: Arc<dyn Signer>,
        peers: Arc<dyn PeerView>,
    ) -> Self {
        let params = assembler.params().clone();
        Self {
            node,
            verifier: BlockVerifier::new(params.clone()),
            scheduler: DelegateScheduler::new(params),
            assembler,
            signer,
            peers,
        }
    }

    /// Run until `shutdown` flips to true. No block is emitted
    /// mid-finalization: the seal-and-connect step completes under the
    /// chain lock before the flag is rechecked.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("mining task started");
        while !*shutdown.borrow() {
            self.wait_for_network(&mut shutdown).await;
            if *shutdown.borrow() {
                break;
            }
            if let Err(err) = self.mine_one_block(&mut shutdown).await {
                if err.is_critical() {
                    warn!(%err, "mining task aborting");
                    break;
                }
                debug!(%err, "block attempt failed, retrying");
                tokio::time::sleep(SLOT_POLL).await;
            }
        }
        self.node.mining.store(false, Ordering::SeqCst);
        info!("mining task stopped");
    }

    /// Outside regtest, idle until peers are present and the tip is fresh.
    async fn wait_for_network(&self, shutdown: &mut watch::Receiver<bool>) {
        let params = self.assembler.params();
        if params.network == Network::Regtest || self.assembler.config().force_mine {
            return;
        }
        loop {
            if *shutdown.borrow() {
                return;
            }
            let tip_age = self
                .node
                .chain
                .lock()
                .tip()
                .map(|tip| unix_now() - tip.time)
                .unwrap_or(i64::MAX);
            if self.peers.peer_count() > 0 && tip_age < STALE_TIP_AGE {
                return;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    /// One build-wait-seal cycle.
    async fn mine_one_block(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), BlockProductionError> {
        // Snapshot and build under the fixed lock order.
        let (tip, update_num, candidate) = {
            let chain = self.node.chain.lock();
            let mempool = self.node.mempool.lock();
            let tip = chain.tip().ok_or(BlockProductionError::NoTip)?;
            let candidate =
                self.assembler
                    .create_new_block(&chain.committed, &chain.store, &mempool, unix_now())?;
            (tip, mempool.update_num(), candidate)
        };
        let height = candidate.block.header.height;

        // Record packing drops while no lock is contended.
        if !candidate.failures.is_empty() {
            let mut chain = self.node.chain.lock();
            for failure in &candidate.failures {
                chain.committed.exec_log.set_execute_fail(
                    height,
                    failure.txid,
                    failure.code,
                    failure.reason.clone(),
                );
            }
        }

        // Sleep to the slot floor, polling for shutdown.
        let slot_open = self.scheduler.next_slot_time(tip.time, height);
        while unix_now() < slot_open {
            if *shutdown.borrow() {
                return Ok(());
            }
            tokio::time::sleep(SLOT_POLL).await;
        }

        // Attempt to seal until the candidate goes stale.
        let started = Instant::now();
        loop {
            if *shutdown.borrow() {
                return Ok(());
            }
            match self.try_seal(&candidate, &tip) {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(err) if err.is_recoverable() => {
                    debug!(%err, "seal attempt deferred");
                }
                Err(err) => return Err(err),
            }

            let mempool_changed = self.node.mempool.lock().update_num() != update_num;
            if mempool_changed || started.elapsed() > CANDIDATE_LIFETIME {
                return Err(BlockProductionError::Stale);
            }
            tokio::time::sleep(SLOT_POLL).await;
        }
    }

    /// Seal and connect the candidate if this node holds the slot
    /// delegate's key. Returns Ok(false) when the slot belongs to someone
    /// else.
    fn try_seal(
        &self,
        candidate: &BlockCandidate,
        tip: &BlockIndex,
    ) -> Result<bool, BlockProductionError> {
        let now = unix_now();
        let mut chain = self.node.chain.lock();

        // Tip moved: the candidate no longer extends the chain.
        if chain.tip().map(|t| t.hash) != Some(tip.hash) {
            return Err(BlockProductionError::Stale);
        }

        let mut delegates = self.scheduler.top_delegates(&chain.committed.delegates)?;
        self.scheduler
            .shuffle_delegates(candidate.block.header.height, &mut delegates);
        let slot_delegate =
            self.scheduler
                .slot_delegate(now, candidate.block.header.height, &delegates);

        let Some(delegate) = chain.committed.accounts.get_account(&slot_delegate) else {
            return Err(BlockProductionError::Schedule(
                ScheduleError::NotEnoughDelegates { have: 0, need: 1 },
            ));
        };

        let miner_key_id = delegate
            .miner_pubkey
            .as_ref()
            .map(|key| key.key_id_bytes());
        let have_key = miner_key_id
            .map(|id| self.signer.get_key(&id, true).is_some())
            .unwrap_or(false)
            || self.signer.get_key(&delegate.keyid.0, false).is_some();
        if !have_key {
            self.node.mining.store(false, Ordering::SeqCst);
            return Ok(false);
        }
        self.node.mining.store(true, Ordering::SeqCst);

        let mut block = candidate.block.clone();
        self.assembler.finalize_and_sign(
            &mut block,
            &delegate,
            &chain.committed,
            &chain.store,
            now,
            self.signer.as_ref(),
        )?;

        let params = self.assembler.params().clone();
        let index = chain.connect_block(&block, &self.verifier, &params)?;

        // Connected: drop the packed transactions from the mempool.
        {
            let mut mempool = self.node.mempool.lock();
            for tx in block.txs.iter().skip(1) {
                mempool.remove(&tx.tx_hash());
            }
        }

        self.node.mined_blocks.push(MinedBlockInfo {
            time: block.header.time,
            nonce: block.header.nonce,
            height: block.header.height,
            total_fuel: block.header.fuel,
            fuel_rate: block.header.fuel_rate,
            total_fees: candidate.total_fees,
            tx_count: block.txs.len() as u64,
            block_size: block.serialized_size(),
            hash: index.hash,
            prev_hash: block.header.prev_hash,
        });
        info!(height = index.height, "mined block connected");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::BlockAssembler;
    use crate::config::BlockProductionConfig;
    use crate::node::ChainState;
    use ac_01_chain_params::ChainParams;
    use ac_02_state_cache::CacheWrapper;
    use ac_03_transactions::MemoryBlockStore;
    use shared_crypto::MemorySigner;

    #[test]
    fn test_static_peer_view() {
        assert_eq!(StaticPeerView(3).peer_count(), 3);
        assert_eq!(StaticPeerView(0).peer_count(), 0);
    }

    #[tokio::test]
    async fn test_run_honors_shutdown() {
        let params = ChainParams::for_network(Network::Regtest);
        let store = MemoryBlockStore::with_genesis(&params, 0);
        let node = Arc::new(Node::new(ChainState::new(store, CacheWrapper::root())));
        let assembler = BlockAssembler::new(params, BlockProductionConfig::default());
        let service = MiningService::new(
            node.clone(),
            assembler,
            Arc::new(MemorySigner::new()),
            Arc::new(StaticPeerView(0)),
        );

        let (tx, rx) = watch::channel(true);
        service.run(rx).await;
        drop(tx);

        assert!(!node.mining.load(Ordering::SeqCst));
    }
}
