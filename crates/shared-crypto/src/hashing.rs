//! BLAKE3 content hashing.
//!
//! All consensus-critical identifiers (transaction ids, block hashes, the
//! delegate shuffle digest chain) are 256-bit BLAKE3 digests.

use blake3::Hasher;

/// 256-bit hash output.
pub type Hash = [u8; 32];

/// Stateful BLAKE3 hasher.
///
/// `finalize` does not consume the internal state, so a digest chain can be
/// produced by alternating `update` and `finalize` on the same hasher.
pub struct Blake3Hasher {
    inner: Hasher,
}

impl Blake3Hasher {
    /// Create a new hasher.
    pub fn new() -> Self {
        Self {
            inner: Hasher::new(),
        }
    }

    /// Absorb more input.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    /// Produce the digest over everything absorbed so far.
    pub fn finalize(&self) -> Hash {
        *self.inner.finalize().as_bytes()
    }

    /// Reset the hasher for reuse.
    pub fn reset(&mut self) {
        self.inner.reset();
    }
}

impl Default for Blake3Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash data with BLAKE3 (one-shot).
pub fn hash(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Hash the concatenation of multiple inputs.
pub fn hash_many(inputs: &[&[u8]]) -> Hash {
    let mut hasher = Blake3Hasher::new();
    for input in inputs {
        hasher.update(input);
    }
    hasher.finalize()
}
