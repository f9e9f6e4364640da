//! Ring buffer of recently mined blocks.
//!
//! Feeds the `mined_blocks(n)` query. Readers take a snapshot; insertion
//! order is newest first.

use ac_01_chain_params::consensus::MAX_MINED_BLOCK_COUNT;
use parking_lot::Mutex;
use shared_types::BlockHash;
use std::collections::VecDeque;

/// Summary of one block this node mined.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MinedBlockInfo {
    /// Block timestamp.
    pub time: i64,
    /// Header nonce.
    pub nonce: u64,
    /// Block height.
    pub height: u32,
    /// Total fuel of the packed transactions.
    pub total_fuel: u64,
    /// Fuel rate the block was packed at.
    pub fuel_rate: u32,
    /// Total fees of the packed transactions.
    pub total_fees: u64,
    /// Transaction count including the reward.
    pub tx_count: u64,
    /// Serialized block size, bytes.
    pub block_size: u64,
    /// Block hash.
    pub hash: BlockHash,
    /// Previous block hash.
    pub prev_hash: BlockHash,
}

/// Bounded, thread-safe ring of recently mined block summaries.
#[derive(Debug)]
pub struct MinedBlockRing {
    inner: Mutex<VecDeque<MinedBlockInfo>>,
    capacity: usize,
}

impl MinedBlockRing {
    /// Create a ring with the consensus default capacity.
    pub fn new() -> Self {
        Self::with_capacity(MAX_MINED_BLOCK_COUNT)
    }

    /// Create a ring with an explicit capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    /// Record a freshly mined block.
    pub fn push(&self, info: MinedBlockInfo) {
        let mut ring = self.inner.lock();
        if ring.len() == self.capacity {
            ring.pop_back();
        }
        ring.push_front(info);
    }

    /// Snapshot of up to `count` most recent entries, newest first.
    pub fn recent(&self, count: usize) -> Vec<MinedBlockInfo> {
        let ring = self.inner.lock();
        ring.iter().take(count).cloned().collect()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// True when nothing has been mined yet.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl Default for MinedBlockRing {
    fn default() -> Self {
        Self::new()
    }
}
