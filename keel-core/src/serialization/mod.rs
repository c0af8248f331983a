//! RLP serialization for wire payloads.
//!
//! Every eth sub-protocol payload is a single RLP item. These helpers wrap
//! `alloy-rlp` so callers get [`SerializationError`](crate::SerializationError)
//! and strict trailing-byte checks.

mod rlp;

pub use rlp::{decode_exact, encode, encoded_len};
