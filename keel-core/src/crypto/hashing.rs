//! Keccak-256 hashing utilities.

use sha3::{Digest, Keccak256};

/// Compute the Keccak-256 hash of the input data.
#[inline]
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hex of the first four bytes of a hash, for log lines.
pub fn short_hex(hash: &[u8; 32]) -> String {
    hex::encode(&hash[..4])
}
