//! # Shared Crypto
//!
//! Cryptographic primitives shared by every Anchor Chain subsystem:
//!
//! - BLAKE3 content hashing (transaction ids, block hashes, shuffle seeds)
//! - Binary merkle trees over transaction hashes
//! - secp256k1 ECDSA keys and signatures for block and transaction signing
//! - The `Signer` capability used by the block assembler, plus an in-memory
//!   implementation for tests and regtest nodes

pub mod errors;
pub mod hashing;
pub mod keys;
pub mod merkle;
pub mod signer;

pub use errors::CryptoError;
pub use hashing::{hash, hash_many, Blake3Hasher, Hash};
pub use keys::{KeyPair, PublicKey, Signature};
pub use merkle::merkle_root;
pub use signer::{verify_signature, MemorySigner, Signer};
