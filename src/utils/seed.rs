//! Stable seed derivation for reproducible pseudo-random values.

use sha2::{Digest, Sha256};

/// Derive a generator seed from a symbol.
///
/// Uses the first eight bytes of the SHA-256 digest, so the value is stable
/// across processes, platforms, and releases.
pub fn stable_seed(symbol: &str) -> u64 {
    let digest = Sha256::digest(symbol.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}
