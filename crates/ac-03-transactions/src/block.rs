//! Block and header entities.
//!
//! A block is a header plus an ordered transaction vector whose first entry
//! is always a reward transaction. The header's merkle root commits to the
//! transaction ids; the producing delegate signs the header's signature
//! hash, which covers everything except the signature itself.

use crate::tx::Transaction;
use serde::{Deserialize, Serialize};
use shared_crypto::{hash, merkle_root, Hash, Signature};
use shared_types::BlockHash;

/// Current block format version.
pub const BLOCK_VERSION: u32 = 1;

/// Required version of the reward transaction in every block.
pub const INIT_TX_VERSION: u16 = 1;

/// Block header.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block format version.
    pub version: u32,
    /// Hash of the previous block.
    pub prev_hash: BlockHash,
    /// Merkle root over the transaction ids.
    pub merkle_root: Hash,
    /// Block timestamp, seconds.
    pub time: i64,
    /// Producer-chosen nonce in `[0, max_nonce]`.
    pub nonce: u64,
    /// Block height.
    pub height: u32,
    /// Total fuel consumed by the packed transactions.
    pub fuel: u64,
    /// Fuel rate the block was packed at.
    pub fuel_rate: u32,
    /// Producing delegate's signature over the signature hash.
    pub signature: Signature,
}

impl BlockHeader {
    /// The digest the producing delegate signs: every header field except
    /// the signature.
    pub fn signature_hash(&self) -> Hash {
        let payload = bincode::serialize(&(
            self.version,
            self.prev_hash,
            self.merkle_root,
            self.time,
            self.nonce,
            self.height,
            self.fuel,
            self.fuel_rate,
        ))
        .expect("header serialization");
        hash(&payload)
    }

    /// The block hash: a digest over the full header including the
    /// signature.
    pub fn block_hash(&self) -> BlockHash {
        let payload = bincode::serialize(self).expect("header serialization");
        hash(&payload)
    }
}

/// A full block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Header.
    pub header: BlockHeader,
    /// Ordered transactions; index 0 is the reward transaction.
    pub txs: Vec<Transaction>,
}

impl Block {
    /// Merkle root over the current transaction vector.
    pub fn build_merkle_root(&self) -> Hash {
        let leaves: Vec<Hash> = self.txs.iter().map(|tx| tx.tx_hash()).collect();
        merkle_root(&leaves)
    }

    /// The reward transaction, when present.
    pub fn reward_tx(&self) -> Option<&Transaction> {
        self.txs.first()
    }

    /// Serialized size in bytes.
    pub fn serialized_size(&self) -> u64 {
        bincode::serialized_size(self).unwrap_or(u64::MAX)
    }

    /// Hash of this block's header.
    pub fn block_hash(&self) -> BlockHash {
        self.header.block_hash()
    }
}
