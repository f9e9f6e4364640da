//! Block index and the block store capability.
//!
//! On-disk block files are outside the core; the pipeline reads chain
//! history through this capability. The in-memory implementation backs
//! tests and regtest nodes.

use crate::block::Block;
use ac_01_chain_params::consensus::INIT_FUEL_RATES;
use ac_01_chain_params::ChainParams;
use shared_types::BlockHash;
use std::collections::HashMap;

/// Summary of one stored block, chained by `prev_hash`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockIndex {
    /// Block hash.
    pub hash: BlockHash,
    /// Previous block hash.
    pub prev_hash: BlockHash,
    /// Height.
    pub height: u32,
    /// Timestamp, seconds.
    pub time: i64,
    /// Total fuel of the block.
    pub fuel: u64,
    /// Fuel rate of the block.
    pub fuel_rate: u32,
}

impl BlockIndex {
    /// Build the index entry for a block.
    pub fn from_block(block: &Block) -> Self {
        Self {
            hash: block.block_hash(),
            prev_hash: block.header.prev_hash,
            height: block.header.height,
            time: block.header.time,
            fuel: block.header.fuel,
            fuel_rate: block.header.fuel_rate,
        }
    }
}

/// Read access to stored blocks and the active chain.
pub trait BlockStore: Send + Sync {
    /// The active chain tip.
    fn tip(&self) -> Option<BlockIndex>;

    /// Height of the active chain tip (zero on a fresh chain).
    fn height(&self) -> u32 {
        self.tip().map(|index| index.height).unwrap_or(0)
    }

    /// Index entry for a block hash.
    fn get_index(&self, hash: &BlockHash) -> Option<BlockIndex>;

    /// Full block body for an index entry. The synthetic genesis entry has
    /// no body.
    fn read_block(&self, index: &BlockIndex) -> Option<Block>;
}

/// In-memory block store for tests and regtest.
#[derive(Debug, Default)]
pub struct MemoryBlockStore {
    blocks: HashMap<BlockHash, Block>,
    indexes: HashMap<BlockHash, BlockIndex>,
    active: Vec<BlockHash>,
}

impl MemoryBlockStore {
    /// Create a store holding only the synthetic genesis index.
    pub fn with_genesis(params: &ChainParams, genesis_time: i64) -> Self {
        let genesis = BlockIndex {
            hash: params.genesis_block_hash,
            prev_hash: [0u8; 32],
            height: 0,
            time: genesis_time,
            fuel: 0,
            fuel_rate: INIT_FUEL_RATES,
        };
        let mut store = Self::default();
        store.indexes.insert(genesis.hash, genesis.clone());
        store.active.push(genesis.hash);
        store
    }

    /// Append a block to the active chain.
    pub fn insert_block(&mut self, block: &Block) -> BlockIndex {
        let index = BlockIndex::from_block(block);
        self.blocks.insert(index.hash, block.clone());
        self.indexes.insert(index.hash, index.clone());
        self.active.push(index.hash);
        index
    }

    /// Remove the tip from the active chain (the block body stays
    /// readable). Never removes genesis.
    pub fn pop_tip(&mut self) -> Option<BlockIndex> {
        if self.active.len() <= 1 {
            return None;
        }
        let hash = self.active.pop()?;
        self.indexes.get(&hash).cloned()
    }

    /// Number of blocks on the active chain, genesis included.
    pub fn active_len(&self) -> usize {
        self.active.len()
    }
}

impl BlockStore for MemoryBlockStore {
    fn tip(&self) -> Option<BlockIndex> {
        self.active
            .last()
            .and_then(|hash| self.indexes.get(hash).cloned())
    }

    fn get_index(&self, hash: &BlockHash) -> Option<BlockIndex> {
        self.indexes.get(hash).cloned()
    }

    fn read_block(&self, index: &BlockIndex) -> Option<Block> {
        self.blocks.get(&index.hash).cloned()
    }
}
