//! The node context: shared chain state and its locks.
//!
//! Globals of the kind older codebases scatter (active chain, mempool,
//! cache manager) live together here and are passed by reference. Lock
//! order is fixed: chain state before mempool.

use crate::error::{BlockProductionError, Result};
use crate::ring::MinedBlockRing;
use ac_01_chain_params::ChainParams;
use ac_02_state_cache::{BlockUndo, CacheWrapper};
use ac_03_transactions::{Block, BlockIndex, BlockStore, ExecuteContext, MemoryBlockStore};
use ac_04_mempool::Mempool;
use ac_07_block_validation::{BlockValidationError, BlockVerifier};
use parking_lot::Mutex;
use shared_types::BlockHash;
use std::sync::atomic::AtomicBool;
use tracing::{info, warn};

/// The active chain: block store, committed state and per-block undo data.
pub struct ChainState {
    /// Block bodies and the active index chain.
    pub store: MemoryBlockStore,
    /// Committed state view (the root cache wrapper).
    pub committed: CacheWrapper<'static>,
    undo_stack: Vec<(BlockHash, BlockUndo)>,
}

impl ChainState {
    /// Create chain state at genesis.
    pub fn new(store: MemoryBlockStore, committed: CacheWrapper<'static>) -> Self {
        Self {
            store,
            committed,
            undo_stack: Vec::new(),
        }
    }

    /// Verify a block and connect it to the tip, executing its transactions
    /// against committed state with per-transaction undo logging.
    pub fn connect_block(
        &mut self,
        block: &Block,
        verifier: &BlockVerifier,
        params: &ChainParams,
    ) -> Result<BlockIndex> {
        if let Err(err) = verifier.verify_block(block, &self.committed, &self.store, true) {
            if let BlockValidationError::ExecutionFailed { txid, source } = &err {
                // Keep the failure inspectable after the block is gone.
                if let Some(tx) = block
                    .txs
                    .iter()
                    .find(|tx| hex::encode(tx.tx_hash()) == *txid)
                {
                    self.committed.exec_log.set_execute_fail(
                        block.header.height,
                        tx.tx_hash(),
                        source.reject_code(),
                        source.to_string(),
                    );
                }
            }
            return Err(err.into());
        }

        self.committed.enable_undo();
        let mut block_undo = BlockUndo::default();

        for (index, tx) in block.txs.iter().enumerate() {
            let mut ctx = ExecuteContext {
                height: block.header.height,
                index: index as u32,
                fuel_rate: block.header.fuel_rate,
                block_time: block.header.time,
                params,
                cache: &mut self.committed,
            };
            if let Err(err) = tx.execute(&mut ctx) {
                // Verification already ran this block; failure here means
                // committed state moved underneath us. Roll back and bail.
                warn!(%err, height = block.header.height, "connect failed mid-block, rolling back");
                block_undo.tx_undos.push(self.committed.take_undo());
                self.committed.disable_undo();
                self.committed.apply_block_undo(block_undo);
                return Err(BlockProductionError::Stale);
            }
            self.committed.tx_seen.add_tx(tx.tx_hash());
            block_undo.tx_undos.push(self.committed.take_undo());
        }
        self.committed.disable_undo();

        let index = self.store.insert_block(block);
        self.undo_stack.push((index.hash, block_undo));
        info!(height = index.height, hash = %hex::encode(index.hash), "block connected");
        Ok(index)
    }

    /// Disconnect the tip block, restoring committed state from its undo
    /// data.
    pub fn disconnect_tip(&mut self) -> Option<BlockIndex> {
        let index = self.store.pop_tip()?;
        if let Some(position) = self
            .undo_stack
            .iter()
            .rposition(|(hash, _)| *hash == index.hash)
        {
            let (_, block_undo) = self.undo_stack.remove(position);
            self.committed.apply_block_undo(block_undo);
        }
        info!(height = index.height, "block disconnected");
        Some(index)
    }

    /// Height of the active chain tip.
    pub fn height(&self) -> u32 {
        self.store.height()
    }

    /// The active chain tip.
    pub fn tip(&self) -> Option<BlockIndex> {
        self.store.tip()
    }
}

/// Shared node context handed to every long-lived task.
pub struct Node {
    /// Chain state, guarded first in lock order.
    pub chain: Mutex<ChainState>,
    /// Pending transactions, guarded second in lock order.
    pub mempool: Mutex<Mempool>,
    /// Recently mined blocks.
    pub mined_blocks: MinedBlockRing,
    /// Whether this node is currently producing.
    pub mining: AtomicBool,
}

impl Node {
    /// Create a node context over chain state.
    pub fn new(chain: ChainState) -> Self {
        Self {
            chain: Mutex::new(chain),
            mempool: Mutex::new(Mempool::new()),
            mined_blocks: MinedBlockRing::new(),
            mining: AtomicBool::new(false),
        }
    }
}
