//! The signing capability used by block production.
//!
//! Wallet key storage lives outside the core; the assembler only needs to ask
//! "can you sign for this key id" at sealing time. Delegates may register a
//! dedicated miner key alongside their owner key, and the assembler prefers
//! it when present.

use crate::errors::CryptoError;
use crate::hashing::Hash;
use crate::keys::{KeyPair, PublicKey, Signature};
use std::collections::{HashMap, HashSet};

/// Signing oracle over externally held key material.
pub trait Signer: Send + Sync {
    /// Look up a key this signer can sign with. With `miner_only`, only keys
    /// registered as dedicated miner keys are returned.
    fn get_key(&self, key_id: &[u8; 20], miner_only: bool) -> Option<PublicKey>;

    /// Sign a 32-byte digest with the key identified by `key_id`.
    fn sign(&self, key_id: &[u8; 20], digest: &Hash) -> Result<Signature, CryptoError>;
}

/// Verify a signature against a digest and public key.
pub fn verify_signature(digest: &Hash, signature: &Signature, pubkey: &PublicKey) -> bool {
    pubkey.verify(digest, signature).is_ok()
}

/// In-memory signer for tests and regtest nodes.
#[derive(Default)]
pub struct MemorySigner {
    keys: HashMap<[u8; 20], KeyPair>,
    miner_keys: HashSet<[u8; 20]>,
}

impl MemorySigner {
    /// Create an empty signer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a keypair; returns its key id. `miner` marks it as a
    /// dedicated miner key.
    pub fn add_key(&mut self, keypair: KeyPair, miner: bool) -> [u8; 20] {
        let key_id = keypair.public_key().key_id_bytes();
        if miner {
            self.miner_keys.insert(key_id);
        }
        self.keys.insert(key_id, keypair);
        key_id
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when no keys are registered.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Signer for MemorySigner {
    fn get_key(&self, key_id: &[u8; 20], miner_only: bool) -> Option<PublicKey> {
        if miner_only && !self.miner_keys.contains(key_id) {
            return None;
        }
        self.keys.get(key_id).map(|kp| kp.public_key())
    }

    fn sign(&self, key_id: &[u8; 20], digest: &Hash) -> Result<Signature, CryptoError> {
        self.keys
            .get(key_id)
            .map(|kp| kp.sign(digest))
            .ok_or(CryptoError::UnknownKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::hash;

    #[test]
    fn test_memory_signer_roundtrip() {
        let mut signer = MemorySigner::new();
        let keypair = KeyPair::generate();
        let pubkey = keypair.public_key();
        let key_id = signer.add_key(keypair, false);

        let digest = hash(b"header");
        let signature = signer.sign(&key_id, &digest).unwrap();
        assert!(verify_signature(&digest, &signature, &pubkey));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let signer = MemorySigner::new();
        assert_eq!(
            signer.sign(&[0u8; 20], &hash(b"x")),
            Err(CryptoError::UnknownKey)
        );
    }

    #[test]
    fn test_miner_only_filtering() {
        let mut signer = MemorySigner::new();
        let owner_id = signer.add_key(KeyPair::generate(), false);
        let miner_id = signer.add_key(KeyPair::generate(), true);

        assert!(signer.get_key(&owner_id, false).is_some());
        assert!(signer.get_key(&owner_id, true).is_none());
        assert!(signer.get_key(&miner_id, true).is_some());
    }
}
