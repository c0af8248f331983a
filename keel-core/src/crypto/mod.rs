//! Hashing primitives.

mod hashing;

pub use hashing::{keccak256, short_hex};
