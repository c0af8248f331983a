//! Reassembled protocol packets.

use bytes::Bytes;

use crate::error::{P2pError, P2pResult};

/// A complete logical message of one sub-protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Capability id from the frame header.
    pub protocol_type: u64,
    /// Message code within the capability.
    pub packet_type: u8,
    /// Message payload, without the packet-type byte.
    pub data: Bytes,
}

impl Packet {
    /// Create a new packet.
    pub fn new(protocol_type: u64, packet_type: u8, data: impl Into<Bytes>) -> Self {
        Self {
            protocol_type,
            packet_type,
            data: data.into(),
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Decode the single RLP byte carrying the packet type.
pub(crate) fn decode_packet_type(byte: u8) -> P2pResult<u8> {
    match byte {
        0x80 => Ok(0),
        b if b < 0x80 => Ok(b),
        b => Err(P2pError::MalformedFrame(format!(
            "packet type byte {:#04x} is not a single-byte RLP integer",
            b
        ))),
    }
}

/// Encode a packet type as a single RLP byte.
pub(crate) fn encode_packet_type(packet_type: u8) -> P2pResult<u8> {
    match packet_type {
        0 => Ok(0x80),
        t if t < 0x80 => Ok(t),
        t => Err(P2pError::ProtocolViolation(format!(
            "packet type {:#04x} does not fit in one byte",
            t
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_type_byte() {
        assert_eq!(decode_packet_type(0x80).unwrap(), 0);
        assert_eq!(decode_packet_type(0x00).unwrap(), 0);
        assert_eq!(decode_packet_type(0x0a).unwrap(), 0x0a);
        assert!(decode_packet_type(0x81).is_err());

        assert_eq!(encode_packet_type(0).unwrap(), 0x80);
        assert_eq!(encode_packet_type(0x10).unwrap(), 0x10);
        assert!(encode_packet_type(0x80).is_err());
    }
}
