//! Error types for cryptographic operations.

use thiserror::Error;

/// Errors surfaced by key handling, signing and verification.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    /// Public key bytes do not encode a valid curve point
    #[error("invalid public key")]
    InvalidPublicKey,

    /// Private key bytes are out of range for the curve
    #[error("invalid private key")]
    InvalidPrivateKey,

    /// Signature bytes are malformed
    #[error("invalid signature encoding")]
    InvalidSignature,

    /// Signature does not verify against the given key and digest
    #[error("signature verification failed")]
    SignatureVerificationFailed,

    /// No key material available for the requested key id
    #[error("unknown key id")]
    UnknownKey,
}
