//! Inbound frame reassembly.
//!
//! A [`FrameMerger`] belongs to exactly one session. It turns frames into
//! packets, holding partially received chunked packets by context id until
//! their declared size has arrived. Dropping or clearing the merger discards
//! every unfinished packet.

use std::collections::HashMap;

use bytes::{BufMut, BytesMut};

use crate::config::{DEFAULT_MAX_OPEN_CONTEXTS, DEFAULT_MAX_PACKET_SIZE};
use crate::error::{P2pError, P2pResult};
use crate::rlpx::header::{FrameHeader, HEADER_SIZE, MAC_SIZE};
use crate::rlpx::packet::{decode_packet_type, Packet};

/// Upper bound on the buffer reserved up front for a chunked packet.
const INITIAL_BUFFER_CAPACITY: usize = 64 * 1024;

/// State of one chunked packet in flight.
#[derive(Debug)]
struct ReassemblyContext {
    protocol_type: u64,
    packet_type: u8,
    /// Payload fragments concatenated in arrival order.
    payload: BytesMut,
    /// Declared payload size, excluding the packet-type byte.
    total_expected: usize,
    received: usize,
}

impl ReassemblyContext {
    fn is_complete(&self) -> bool {
        self.received >= self.total_expected
    }

    fn into_packet(self) -> Packet {
        Packet::new(self.protocol_type, self.packet_type, self.payload.freeze())
    }
}

/// Per-session frame merger.
#[derive(Debug)]
pub struct FrameMerger {
    contexts: HashMap<u64, ReassemblyContext>,
    max_packet_size: usize,
    max_open_contexts: usize,
}

impl FrameMerger {
    /// Create a merger with explicit limits.
    pub fn new(max_packet_size: usize, max_open_contexts: usize) -> Self {
        Self {
            contexts: HashMap::new(),
            max_packet_size,
            max_open_contexts,
        }
    }

    /// Create a merger with default limits.
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_MAX_PACKET_SIZE, DEFAULT_MAX_OPEN_CONTEXTS)
    }

    /// Feed one whole frame.
    ///
    /// Returns the packet once it is complete, `None` while a chunked packet
    /// is still waiting for more frames.
    pub fn merge(&mut self, frame: &[u8]) -> P2pResult<Option<Packet>> {
        let header = FrameHeader::decode(frame)?;
        let payload = &frame[HEADER_SIZE..frame.len() - MAC_SIZE];

        match (header.context_id, header.total_packet_size) {
            (Some(context_id), Some(total)) => self.open(header.protocol_type, context_id, total, payload),
            (Some(context_id), None) if self.contexts.contains_key(&context_id) => {
                self.append(context_id, payload)
            }
            (Some(context_id), None) if context_id != 0 => Err(P2pError::ProtocolViolation(format!(
                "continuation frame for unknown context {}",
                context_id
            ))),
            _ => single(header.protocol_type, payload).map(Some),
        }
    }

    /// Number of chunked packets in flight.
    pub fn open_contexts(&self) -> usize {
        self.contexts.len()
    }

    /// Whether a context id has a chunked packet in flight.
    pub fn is_open(&self, context_id: u64) -> bool {
        self.contexts.contains_key(&context_id)
    }

    /// Discard every unfinished packet, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.contexts.len();
        self.contexts.clear();
        dropped
    }

    fn open(
        &mut self,
        protocol_type: u64,
        context_id: u64,
        total: u64,
        payload: &[u8],
    ) -> P2pResult<Option<Packet>> {
        if total == 0 {
            return Err(P2pError::ProtocolViolation(format!(
                "context {} declares an empty packet",
                context_id
            )));
        }
        let total_expected = usize::try_from(total - 1).unwrap_or(usize::MAX);
        if total_expected > self.max_packet_size {
            return Err(P2pError::PacketTooLarge {
                size: total_expected,
                max: self.max_packet_size,
            });
        }
        let (&type_byte, data) = payload.split_first().ok_or_else(|| {
            P2pError::MalformedFrame(format!("first chunk of context {} has no packet type", context_id))
        })?;
        let packet_type = decode_packet_type(type_byte)?;

        if self.contexts.remove(&context_id).is_some() {
            tracing::debug!(context_id, "Chunked packet restarted before completion");
        } else if self.contexts.len() >= self.max_open_contexts {
            return Err(P2pError::TooManyContexts {
                max: self.max_open_contexts,
            });
        }

        let mut buffer = BytesMut::with_capacity(total_expected.min(INITIAL_BUFFER_CAPACITY));
        buffer.put_slice(data);
        let context = ReassemblyContext {
            protocol_type,
            packet_type,
            payload: buffer,
            total_expected,
            received: data.len(),
        };

        if context.is_complete() {
            return Ok(Some(context.into_packet()));
        }
        self.contexts.insert(context_id, context);
        Ok(None)
    }

    fn append(&mut self, context_id: u64, payload: &[u8]) -> P2pResult<Option<Packet>> {
        let complete = match self.contexts.get_mut(&context_id) {
            Some(context) => {
                context.payload.put_slice(payload);
                context.received += payload.len();
                context.is_complete()
            }
            None => false,
        };

        if !complete {
            return Ok(None);
        }
        Ok(self.contexts.remove(&context_id).map(ReassemblyContext::into_packet))
    }
}

impl Default for FrameMerger {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn single(protocol_type: u64, payload: &[u8]) -> P2pResult<Packet> {
    let (&type_byte, data) = payload
        .split_first()
        .ok_or_else(|| P2pError::MalformedFrame("frame has no packet type".into()))?;
    Ok(Packet::new(
        protocol_type,
        decode_packet_type(type_byte)?,
        bytes::Bytes::copy_from_slice(data),
    ))
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn frame(header: FrameHeader, payload: &[u8]) -> Vec<u8> {
        let mut out = BytesMut::new();
        header.encode(&mut out).unwrap();
        out.put_slice(payload);
        out.put_bytes(0, MAC_SIZE);
        out.to_vec()
    }

    fn with_type(packet_type: u8, data: &[u8]) -> Vec<u8> {
        let mut payload = vec![packet_type];
        payload.extend_from_slice(data);
        payload
    }

    #[test]
    fn test_single_frame() {
        let mut merger = FrameMerger::with_defaults();
        let payload = with_type(0x09, b"hello");

        let packet = merger
            .merge(&frame(FrameHeader::single(0, payload.len()), &payload))
            .unwrap()
            .unwrap();
        assert_eq!(packet, Packet::new(0, 0x09, Bytes::from_static(b"hello")));
        assert_eq!(merger.open_contexts(), 0);
    }

    #[test]
    fn test_single_frame_with_zero_context() {
        let mut merger = FrameMerger::with_defaults();
        let payload = with_type(0x02, b"x");

        let packet = merger
            .merge(&frame(FrameHeader::continuation(0, 0, payload.len()), &payload))
            .unwrap()
            .unwrap();
        assert_eq!(packet.packet_type, 0x02);
    }

    #[test]
    fn test_chunked_packet() {
        let mut merger = FrameMerger::with_defaults();
        let data: Vec<u8> = (0..10u8).collect();

        let first = with_type(0x0a, &data[..3]);
        let header = FrameHeader::first_chunk(1, 5, (data.len() + 1) as u64, first.len());
        assert_eq!(merger.merge(&frame(header, &first)).unwrap(), None);
        assert!(merger.is_open(5));

        let header = FrameHeader::continuation(1, 5, 4);
        assert_eq!(merger.merge(&frame(header, &data[3..7])).unwrap(), None);

        let header = FrameHeader::continuation(1, 5, 3);
        let packet = merger.merge(&frame(header, &data[7..])).unwrap().unwrap();

        assert_eq!(packet, Packet::new(1, 0x0a, data));
        assert!(!merger.is_open(5));
        assert_eq!(merger.open_contexts(), 0);
    }

    #[test]
    fn test_overshoot_keeps_all_bytes() {
        let mut merger = FrameMerger::with_defaults();

        let first = with_type(0x0c, b"a");
        let header = FrameHeader::first_chunk(0, 3, 5, first.len());
        assert_eq!(merger.merge(&frame(header, &first)).unwrap(), None);

        let header = FrameHeader::continuation(0, 3, 6);
        let packet = merger.merge(&frame(header, b"bcdefg")).unwrap().unwrap();

        assert_eq!(packet, Packet::new(0, 0x0c, Bytes::from_static(b"abcdefg")));
        assert_eq!(merger.open_contexts(), 0);
    }

    #[test]
    fn test_interleaved_contexts() {
        let mut merger = FrameMerger::with_defaults();

        let a = with_type(0x01, b"ab");
        let b = with_type(0x02, b"xy");
        merger.merge(&frame(FrameHeader::first_chunk(0, 1, 5, a.len()), &a)).unwrap();
        merger.merge(&frame(FrameHeader::first_chunk(0, 2, 5, b.len()), &b)).unwrap();
        assert_eq!(merger.open_contexts(), 2);

        let second = merger
            .merge(&frame(FrameHeader::continuation(0, 2, 2), b"zz"))
            .unwrap()
            .unwrap();
        assert_eq!(second, Packet::new(0, 0x02, Bytes::from_static(b"xyzz")));

        let first = merger
            .merge(&frame(FrameHeader::continuation(0, 1, 2), b"cd"))
            .unwrap()
            .unwrap();
        assert_eq!(first, Packet::new(0, 0x01, Bytes::from_static(b"abcd")));
        assert_eq!(merger.open_contexts(), 0);
    }

    #[test]
    fn test_first_chunk_can_complete() {
        let mut merger = FrameMerger::with_defaults();
        let payload = with_type(0x03, b"abc");

        let packet = merger
            .merge(&frame(FrameHeader::first_chunk(0, 9, 4, payload.len()), &payload))
            .unwrap();
        assert_eq!(packet, Some(Packet::new(0, 0x03, Bytes::from_static(b"abc"))));
        assert_eq!(merger.open_contexts(), 0);
    }

    #[test]
    fn test_unknown_continuation_fails() {
        let mut merger = FrameMerger::with_defaults();
        let result = merger.merge(&frame(FrameHeader::continuation(0, 42, 3), b"abc"));
        assert!(matches!(result, Err(P2pError::ProtocolViolation(_))));
    }

    #[test]
    fn test_continuation_after_completion_fails() {
        let mut merger = FrameMerger::with_defaults();
        let payload = with_type(0x03, b"a");
        merger
            .merge(&frame(FrameHeader::first_chunk(0, 4, 3, payload.len()), &payload))
            .unwrap();
        merger.merge(&frame(FrameHeader::continuation(0, 4, 1), b"b")).unwrap().unwrap();

        let result = merger.merge(&frame(FrameHeader::continuation(0, 4, 1), b"c"));
        assert!(matches!(result, Err(P2pError::ProtocolViolation(_))));
    }

    #[test]
    fn test_restarted_context_replaces_old_one() {
        let mut merger = FrameMerger::with_defaults();
        let old = with_type(0x01, b"old");
        merger.merge(&frame(FrameHeader::first_chunk(0, 3, 10, old.len()), &old)).unwrap();

        let new = with_type(0x02, b"n");
        merger.merge(&frame(FrameHeader::first_chunk(0, 3, 3, new.len()), &new)).unwrap();
        assert_eq!(merger.open_contexts(), 1);

        let packet = merger
            .merge(&frame(FrameHeader::continuation(0, 3, 1), b"w"))
            .unwrap()
            .unwrap();
        assert_eq!(packet, Packet::new(0, 0x02, Bytes::from_static(b"nw")));
    }

    #[test]
    fn test_declared_size_limit() {
        let mut merger = FrameMerger::new(8, 4);
        let payload = with_type(0x01, b"a");
        let result = merger.merge(&frame(FrameHeader::first_chunk(0, 1, 100, payload.len()), &payload));
        assert!(matches!(result, Err(P2pError::PacketTooLarge { size: 99, max: 8 })));
        assert_eq!(merger.open_contexts(), 0);
    }

    #[test]
    fn test_open_context_limit() {
        let mut merger = FrameMerger::new(1024, 2);
        let payload = with_type(0x01, b"a");
        for id in 1..=2 {
            merger
                .merge(&frame(FrameHeader::first_chunk(0, id, 10, payload.len()), &payload))
                .unwrap();
        }

        let result = merger.merge(&frame(FrameHeader::first_chunk(0, 3, 10, payload.len()), &payload));
        assert!(matches!(result, Err(P2pError::TooManyContexts { max: 2 })));
    }

    #[test]
    fn test_zero_total_is_violation() {
        let mut merger = FrameMerger::with_defaults();
        let payload = with_type(0x01, b"");
        let result = merger.merge(&frame(FrameHeader::first_chunk(0, 1, 0, payload.len()), &payload));
        assert!(matches!(result, Err(P2pError::ProtocolViolation(_))));
    }

    #[test]
    fn test_empty_single_frame_is_malformed() {
        let mut merger = FrameMerger::with_defaults();
        let result = merger.merge(&frame(FrameHeader::single(0, 0), &[]));
        assert!(matches!(result, Err(P2pError::MalformedFrame(_))));
    }

    #[test]
    fn test_clear_discards_contexts() {
        let mut merger = FrameMerger::with_defaults();
        let payload = with_type(0x01, b"a");
        merger.merge(&frame(FrameHeader::first_chunk(0, 1, 50, payload.len()), &payload)).unwrap();
        merger.merge(&frame(FrameHeader::first_chunk(0, 2, 50, payload.len()), &payload)).unwrap();

        assert_eq!(merger.clear(), 2);
        assert_eq!(merger.open_contexts(), 0);
    }
}
