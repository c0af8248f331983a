//! # Keel Core
//!
//! Core types, hashing and serialization shared by the keel crates.
//!
//! - Keccak-256 hashing of wire payloads
//! - RLP serialization helpers on top of `alloy-rlp`
//! - The `Transaction` record gossiped between peers

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crypto;
pub mod error;
pub mod serialization;
pub mod transaction;

pub use crypto::{keccak256, short_hex};
pub use error::SerializationError;
pub use transaction::{Transaction, TxHash};
