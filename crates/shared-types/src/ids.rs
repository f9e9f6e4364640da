//! Canonical identifiers.
//!
//! Accounts are addressed two ways: a `RegId`, the compact
//! (block height, tx index) coordinate assigned when the account first
//! appears on chain, and a `KeyId`, the 20-byte hash of the owner public
//! key. Transactions and blocks are addressed by 32-byte content hashes.

use serde::{Deserialize, Serialize};
use shared_crypto::PublicKey;
use std::fmt;

/// 32-byte transaction id (content hash excluding the signature).
pub type TxId = [u8; 32];

/// 32-byte block hash.
pub type BlockHash = [u8; 32];

/// Compact on-chain account coordinate: (block height, tx index in block).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RegId {
    /// Height of the block the account was registered in.
    pub height: u32,
    /// Index of the registering transaction within that block.
    pub index: u16,
}

impl RegId {
    /// Create a regid from its coordinates.
    pub fn new(height: u32, index: u16) -> Self {
        Self { height, index }
    }

    /// The null regid, used by system-injected transactions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True for the null regid.
    pub fn is_empty(&self) -> bool {
        self.height == 0 && self.index == 0
    }

    /// Canonical string form, `"height-index"`.
    pub fn to_raw_string(&self) -> String {
        format!("{}-{}", self.height, self.index)
    }
}

impl fmt::Display for RegId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_raw_string())
    }
}

/// 20-byte address hash of an owner public key.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct KeyId(pub [u8; 20]);

impl KeyId {
    /// Derive the key id for a public key.
    pub fn from_pubkey(pubkey: &PublicKey) -> Self {
        Self(pubkey.key_id_bytes())
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
