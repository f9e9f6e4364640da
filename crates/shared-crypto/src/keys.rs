//! secp256k1 ECDSA keys and signatures.
//!
//! Delegates sign block headers with these keys; user transactions carry the
//! same signature form. Signing is deterministic (RFC 6979), so two honest
//! nodes holding the same key produce identical signatures.

use crate::errors::CryptoError;
use crate::hashing;
use k256::ecdsa::{
    signature::{Signer as _, Verifier as _},
    Signature as EcdsaSignature, SigningKey, VerifyingKey,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::fmt;
use zeroize::Zeroize;

/// Compressed secp256k1 public key (33 bytes).
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey(#[serde_as(as = "Bytes")] [u8; 33]);

impl PublicKey {
    /// Create from compressed bytes (33 bytes, starting with 0x02 or 0x03).
    pub fn from_bytes(bytes: [u8; 33]) -> Result<Self, CryptoError> {
        VerifyingKey::from_sec1_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Raw compressed bytes.
    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    /// Verify a signature over a 32-byte digest.
    pub fn verify(&self, digest: &[u8; 32], signature: &Signature) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;
        let sig = EcdsaSignature::from_slice(signature.as_bytes())
            .map_err(|_| CryptoError::InvalidSignature)?;
        verifying_key
            .verify(digest, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }

    /// Derive the 20-byte key id (address hash) from this key.
    pub fn key_id_bytes(&self) -> [u8; 20] {
        let digest = hashing::hash(&self.0);
        let mut id = [0u8; 20];
        id.copy_from_slice(&digest[..20]);
        id
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.0))
    }
}

/// ECDSA signature (64 bytes, r||s).
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(#[serde_as(as = "Bytes")] [u8; 64]);

impl Signature {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// All-zero placeholder used by unsigned system transactions.
    pub fn empty() -> Self {
        Self([0u8; 64])
    }

    /// True if this is the all-zero placeholder.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(&self.0[..8]))
    }
}

/// secp256k1 keypair.
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a random keypair.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut rand::thread_rng()),
        }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&seed).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Compressed public key.
    pub fn public_key(&self) -> PublicKey {
        let verifying_key = self.signing_key.verifying_key();
        let sec1_bytes = verifying_key.to_sec1_bytes();
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(&sec1_bytes[..33]);
        PublicKey(bytes)
    }

    /// Sign a 32-byte digest (deterministic RFC 6979).
    pub fn sign(&self, digest: &[u8; 32]) -> Signature {
        let sig: EcdsaSignature = self.signing_key.sign(digest);
        let bytes: [u8; 64] = sig.to_bytes().into();
        Signature(bytes)
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        let mut bytes: [u8; 32] = self.signing_key.to_bytes().into();
        bytes.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let keypair = KeyPair::generate();
        let digest = hashing::hash(b"block header");

        let signature = keypair.sign(&digest);
        assert!(keypair.public_key().verify(&digest, &signature).is_ok());
    }

    #[test]
    fn test_wrong_digest_fails() {
        let keypair = KeyPair::generate();
        let signature = keypair.sign(&hashing::hash(b"one"));
        assert!(keypair
            .public_key()
            .verify(&hashing::hash(b"two"), &signature)
            .is_err());
    }

    #[test]
    fn test_deterministic_signatures() {
        let keypair = KeyPair::from_seed([0xAB; 32]).unwrap();
        let digest = hashing::hash(b"slot 42");
        assert_eq!(
            keypair.sign(&digest).as_bytes(),
            keypair.sign(&digest).as_bytes()
        );
    }

    #[test]
    fn test_key_id_is_stable() {
        let keypair = KeyPair::from_seed([0x01; 32]).unwrap();
        let id1 = keypair.public_key().key_id_bytes();
        let id2 = keypair.public_key().key_id_bytes();
        assert_eq!(id1, id2);
        assert_eq!(id1.len(), 20);
    }

    #[test]
    fn test_empty_signature_placeholder() {
        assert!(Signature::empty().is_empty());
        let keypair = KeyPair::generate();
        assert!(!keypair.sign(&[0u8; 32]).is_empty());
    }
}
