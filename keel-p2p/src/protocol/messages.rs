//! eth wire messages.
//!
//! Only the messages the transaction flow and the capability chain act on
//! are decoded. Block and state messages travel as opaque payloads to the
//! sync collaborator.

use std::fmt;

use alloy_rlp::{Decodable, Encodable, Header, RlpDecodable, RlpEncodable};
use bytes::{BufMut, Bytes};

use keel_core::serialization::{decode_exact, encode};
use keel_core::{short_hex, Transaction, TxHash};

use crate::error::P2pResult;
use crate::protocol::version::MessageKind;
use crate::rlpx::Packet;

/// Fork identifier announced in status from eth/64 on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct ForkId {
    /// CRC32 checksum of the passed fork blocks.
    pub hash: [u8; 4],
    /// Next scheduled fork block, zero if none.
    pub next: u64,
}

/// Status sent once at the start of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    /// eth version of the sender.
    pub protocol_version: u8,
    /// Network id.
    pub network_id: u64,
    /// Total difficulty of the sender's best chain.
    pub total_difficulty: u128,
    /// Hash of the sender's best block.
    pub best_hash: [u8; 32],
    /// Genesis block hash.
    pub genesis_hash: [u8; 32],
    /// Fork id; absent before eth/64.
    pub fork_id: Option<ForkId>,
}

impl StatusMessage {
    fn payload_length(&self) -> usize {
        self.protocol_version.length()
            + self.network_id.length()
            + self.total_difficulty.length()
            + self.best_hash.length()
            + self.genesis_hash.length()
            + self.fork_id.as_ref().map_or(0, Encodable::length)
    }
}

impl Encodable for StatusMessage {
    fn encode(&self, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.payload_length(),
        }
        .encode(out);
        self.protocol_version.encode(out);
        self.network_id.encode(out);
        self.total_difficulty.encode(out);
        self.best_hash.encode(out);
        self.genesis_hash.encode(out);
        if let Some(fork_id) = &self.fork_id {
            fork_id.encode(out);
        }
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + alloy_rlp::length_of_length(payload_length)
    }
}

impl Decodable for StatusMessage {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let header = Header::decode(buf)?;
        if !header.list {
            return Err(alloy_rlp::Error::UnexpectedString);
        }
        if buf.len() < header.payload_length {
            return Err(alloy_rlp::Error::InputTooShort);
        }

        let mut fields = &buf[..header.payload_length];
        let status = Self {
            protocol_version: u8::decode(&mut fields)?,
            network_id: u64::decode(&mut fields)?,
            total_difficulty: u128::decode(&mut fields)?,
            best_hash: <[u8; 32]>::decode(&mut fields)?,
            genesis_hash: <[u8; 32]>::decode(&mut fields)?,
            fork_id: if fields.is_empty() {
                None
            } else {
                Some(ForkId::decode(&mut fields)?)
            },
        };
        if !fields.is_empty() {
            return Err(alloy_rlp::Error::ListLengthMismatch {
                expected: header.payload_length,
                got: header.payload_length - fields.len(),
            });
        }

        *buf = &buf[header.payload_length..];
        Ok(status)
    }
}

/// A decoded eth message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Session status.
    Status(StatusMessage),
    /// Full transaction bodies.
    Transactions(Vec<Transaction>),
    /// Hash-only announcement of new pending transactions.
    NewPooledTransactionHashes(Vec<TxHash>),
    /// Request for pending transactions by hash.
    GetPooledTransactions(Vec<TxHash>),
    /// Response to [`Message::GetPooledTransactions`].
    PooledTransactions(Vec<Transaction>),
    /// Block or state message forwarded undecoded.
    Sync {
        /// Which sync message this is.
        kind: MessageKind,
        /// Raw RLP payload.
        payload: Bytes,
    },
}

impl Message {
    /// Decode the payload of a message of the given kind.
    pub fn decode(kind: MessageKind, payload: &Bytes) -> P2pResult<Self> {
        let message = match kind {
            MessageKind::Status => Message::Status(decode_exact(payload)?),
            MessageKind::Transactions => Message::Transactions(decode_exact(payload)?),
            MessageKind::NewPooledTransactionHashes => {
                Message::NewPooledTransactionHashes(decode_exact(payload)?)
            }
            MessageKind::GetPooledTransactions => {
                Message::GetPooledTransactions(decode_exact(payload)?)
            }
            MessageKind::PooledTransactions => Message::PooledTransactions(decode_exact(payload)?),
            kind => Message::Sync {
                kind,
                payload: payload.clone(),
            },
        };
        Ok(message)
    }

    /// Kind of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Status(_) => MessageKind::Status,
            Message::Transactions(_) => MessageKind::Transactions,
            Message::NewPooledTransactionHashes(_) => MessageKind::NewPooledTransactionHashes,
            Message::GetPooledTransactions(_) => MessageKind::GetPooledTransactions,
            Message::PooledTransactions(_) => MessageKind::PooledTransactions,
            Message::Sync { kind, .. } => *kind,
        }
    }

    /// Message name as used in logs.
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// RLP payload of this message.
    pub fn encode_payload(&self) -> Bytes {
        match self {
            Message::Status(status) => encode(status).into(),
            Message::Transactions(txs) | Message::PooledTransactions(txs) => encode(txs).into(),
            Message::NewPooledTransactionHashes(hashes) | Message::GetPooledTransactions(hashes) => {
                encode(hashes).into()
            }
            Message::Sync { payload, .. } => payload.clone(),
        }
    }

    /// Wrap this message into a packet for the given capability.
    pub fn to_packet(&self, protocol_type: u64) -> Packet {
        Packet::new(protocol_type, self.kind().code(), self.encode_payload())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Status(s) => write!(
                f,
                "Status(version={}, network={}, best={})",
                s.protocol_version,
                s.network_id,
                short_hex(&s.best_hash)
            ),
            Message::Transactions(txs) => write!(f, "Transactions(count={})", txs.len()),
            Message::NewPooledTransactionHashes(h) => {
                write!(f, "NewPooledTransactionHashes(count={})", h.len())
            }
            Message::GetPooledTransactions(h) => {
                write!(f, "GetPooledTransactions(count={})", h.len())
            }
            Message::PooledTransactions(txs) => write!(f, "PooledTransactions(count={})", txs.len()),
            Message::Sync { kind, payload } => write!(f, "{}(bytes={})", kind, payload.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::P2pError;

    fn status(fork_id: Option<ForkId>) -> StatusMessage {
        StatusMessage {
            protocol_version: 65,
            network_id: 1,
            total_difficulty: 17_000_000_000_000_000,
            best_hash: [0xaa; 32],
            genesis_hash: [0xbb; 32],
            fork_id,
        }
    }

    fn tx(nonce: u64) -> Transaction {
        Transaction {
            nonce,
            gas_limit: 21_000,
            to: Bytes::from(vec![0x22; 20]),
            ..Default::default()
        }
    }

    #[test]
    fn test_status_with_and_without_fork_id() {
        for original in [
            status(None),
            status(Some(ForkId {
                hash: [0xfc, 0x64, 0xec, 0x04],
                next: 1_150_000,
            })),
        ] {
            let message = Message::Status(original.clone());
            let decoded = Message::decode(MessageKind::Status, &message.encode_payload()).unwrap();
            assert_eq!(decoded, Message::Status(original));
        }
    }

    #[test]
    fn test_status_length_matches_encoding() {
        let s = status(Some(ForkId { hash: [1; 4], next: 0 }));
        assert_eq!(encode(&s).len(), s.length());
    }

    #[test]
    fn test_pooled_messages() {
        let hashes = vec![tx(1).hash(), tx(2).hash()];
        let packet = Message::GetPooledTransactions(hashes.clone()).to_packet(0);
        assert_eq!(packet.packet_type, 0x09);

        let decoded = Message::decode(MessageKind::GetPooledTransactions, &packet.data).unwrap();
        assert_eq!(decoded, Message::GetPooledTransactions(hashes));

        let txs = vec![tx(1), tx(2)];
        let packet = Message::PooledTransactions(txs.clone()).to_packet(0);
        let decoded = Message::decode(MessageKind::PooledTransactions, &packet.data).unwrap();
        assert_eq!(decoded, Message::PooledTransactions(txs));
    }

    #[test]
    fn test_sync_payload_is_opaque() {
        let payload = Bytes::from_static(&[0xc2, 0x01, 0x02]);
        let message = Message::decode(MessageKind::BlockHeaders, &payload).unwrap();
        assert_eq!(message.kind(), MessageKind::BlockHeaders);
        assert_eq!(message.encode_payload(), payload);
        assert_eq!(message.to_string(), "BlockHeaders(bytes=3)");
    }

    #[test]
    fn test_undecodable_payload() {
        let result = Message::decode(MessageKind::Transactions, &Bytes::from_static(&[0x05]));
        assert!(matches!(result, Err(P2pError::Serialization(_))));

        let mut trailing = encode(&vec![tx(1)]);
        trailing.push(0x80);
        let result = Message::decode(MessageKind::Transactions, &Bytes::from(trailing));
        assert!(matches!(result, Err(P2pError::Serialization(_))));
    }
}
