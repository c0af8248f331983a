//! Transaction record gossiped between peers.
//!
//! Transactions are opaque to the transport: the only operations the
//! gossip flow needs are the RLP wire form, its size, and the hash that
//! identifies the transaction in announcements and requests.

use alloy_rlp::{RlpDecodable, RlpEncodable};
use bytes::Bytes;

use crate::crypto::keccak256;
use crate::serialization::{encode, encoded_len};

/// Identifier of a transaction: Keccak-256 of its RLP encoding.
pub type TxHash = [u8; 32];

/// A legacy Ethereum transaction.
///
/// Encoded on the wire as the RLP list
/// `[nonce, gas_price, gas_limit, to, value, input, v, r, s]`.
#[derive(Clone, Debug, Default, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct Transaction {
    /// Sender account nonce.
    pub nonce: u64,
    /// Price per unit of gas, in wei.
    pub gas_price: u128,
    /// Gas limit.
    pub gas_limit: u64,
    /// Recipient address; empty for contract creation.
    pub to: Bytes,
    /// Transferred value, in wei.
    pub value: u128,
    /// Call data or init code.
    pub input: Bytes,
    /// Signature recovery id.
    pub v: u64,
    /// Signature `r` component.
    pub r: Bytes,
    /// Signature `s` component.
    pub s: Bytes,
}

impl Transaction {
    /// Compute the transaction hash.
    pub fn hash(&self) -> TxHash {
        keccak256(&encode(self))
    }

    /// Size of the RLP encoding in bytes.
    pub fn encoded_len(&self) -> usize {
        encoded_len(self)
    }
}
