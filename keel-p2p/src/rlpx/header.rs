//! Frame header encoding.

use alloy_rlp::{Decodable, Header};
use bytes::{BufMut, BytesMut};

use crate::config::MAX_FRAME_PREFIX_SIZE;
use crate::error::{P2pError, P2pResult};

/// Fixed header size.
pub const HEADER_SIZE: usize = 32;

/// Trailing integrity tag size.
pub const MAC_SIZE: usize = 16;

/// Size of the big-endian payload length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 3;

/// Bytes reserved for the RLP header record.
pub const HEADER_DATA_SIZE: usize = 13;

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Payload length from the 3-byte prefix.
    pub frame_size: usize,
    /// Capability id.
    pub protocol_type: u64,
    /// Multiplexing key of a chunked packet.
    pub context_id: Option<u64>,
    /// Total packet size including the packet-type byte; first chunk only.
    pub total_packet_size: Option<u64>,
}

impl FrameHeader {
    /// Header of a packet that fits in one frame.
    pub fn single(protocol_type: u64, frame_size: usize) -> Self {
        Self {
            frame_size,
            protocol_type,
            context_id: None,
            total_packet_size: None,
        }
    }

    /// Header of the first chunk of a chunked packet.
    pub fn first_chunk(protocol_type: u64, context_id: u64, total: u64, frame_size: usize) -> Self {
        Self {
            frame_size,
            protocol_type,
            context_id: Some(context_id),
            total_packet_size: Some(total),
        }
    }

    /// Header of a continuation chunk.
    pub fn continuation(protocol_type: u64, context_id: u64, frame_size: usize) -> Self {
        Self {
            frame_size,
            protocol_type,
            context_id: Some(context_id),
            total_packet_size: None,
        }
    }

    /// Decode the header of a whole frame.
    ///
    /// Fields absent from the record are `None`, not zero. Bytes after the
    /// record within the header are ignored.
    pub fn decode(frame: &[u8]) -> P2pResult<Self> {
        if frame.len() < HEADER_SIZE + MAC_SIZE {
            return Err(P2pError::MalformedFrame(format!(
                "frame of {} bytes is shorter than header and mac",
                frame.len()
            )));
        }

        let frame_size = u32::from_be_bytes([0, frame[0], frame[1], frame[2]]) as usize;

        let mut data = &frame[LENGTH_PREFIX_SIZE..LENGTH_PREFIX_SIZE + HEADER_DATA_SIZE];
        let list = Header::decode(&mut data).map_err(malformed)?;
        if !list.list {
            return Err(P2pError::MalformedFrame("header data is not a list".into()));
        }
        if list.payload_length > data.len() {
            return Err(P2pError::MalformedFrame(format!(
                "header data list of {} bytes overruns the header",
                list.payload_length
            )));
        }

        let mut items = &data[..list.payload_length];
        if items.is_empty() {
            return Err(P2pError::MalformedFrame("header data has no protocol type".into()));
        }
        let protocol_type = u64::decode(&mut items).map_err(malformed)?;
        let context_id = decode_optional(&mut items)?;
        let total_packet_size = decode_optional(&mut items)?;

        Ok(Self {
            frame_size,
            protocol_type,
            context_id,
            total_packet_size,
        })
    }

    /// Append the 32 header bytes to `out`.
    pub fn encode(&self, out: &mut BytesMut) -> P2pResult<()> {
        if self.frame_size > MAX_FRAME_PREFIX_SIZE {
            return Err(P2pError::FrameTooLarge {
                size: self.frame_size,
                max: MAX_FRAME_PREFIX_SIZE,
            });
        }

        let mut items = vec![self.protocol_type];
        match (self.context_id, self.total_packet_size) {
            (context_id, Some(total)) => {
                items.push(context_id.unwrap_or(0));
                items.push(total);
            }
            (Some(context_id), None) => items.push(context_id),
            (None, None) => {}
        }

        let data = keel_core::serialization::encode(&items);
        if data.len() > HEADER_DATA_SIZE {
            return Err(P2pError::MalformedFrame(format!(
                "header data of {} bytes exceeds {}",
                data.len(),
                HEADER_DATA_SIZE
            )));
        }

        let size = (self.frame_size as u32).to_be_bytes();
        out.reserve(HEADER_SIZE);
        out.put_slice(&size[1..]);
        out.put_slice(&data);
        out.put_bytes(0, HEADER_SIZE - LENGTH_PREFIX_SIZE - data.len());
        Ok(())
    }
}

fn decode_optional(items: &mut &[u8]) -> P2pResult<Option<u64>> {
    if items.is_empty() {
        return Ok(None);
    }
    u64::decode(items).map(Some).map_err(malformed)
}

fn malformed(err: alloy_rlp::Error) -> P2pError {
    P2pError::MalformedFrame(format!("undecodable header data: {}", err))
}
