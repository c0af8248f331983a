//! Outbound packet chunking.

use bytes::{BufMut, Bytes, BytesMut};

use crate::config::DEFAULT_MAX_FRAME_SIZE;
use crate::error::{P2pError, P2pResult};
use crate::rlpx::header::{FrameHeader, HEADER_SIZE, MAC_SIZE};
use crate::rlpx::packet::{encode_packet_type, Packet};

/// Splits packets into frames of at most `max_frame_size` payload bytes.
///
/// The MAC slot is zero filled. Sealing frames is left to the transport.
#[derive(Debug)]
pub struct FrameSplitter {
    max_frame_size: usize,
    next_context_id: u16,
}

impl FrameSplitter {
    /// Create a splitter. `max_frame_size` must leave room for the
    /// packet-type byte and at least one payload byte.
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            max_frame_size: max_frame_size.max(2),
            next_context_id: 1,
        }
    }

    /// Payload bytes per frame.
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Encode a packet into one or more whole frames.
    pub fn split(&mut self, packet: &Packet) -> P2pResult<Vec<Bytes>> {
        let type_byte = encode_packet_type(packet.packet_type)?;
        let total = packet.data.len() + 1;

        if total <= self.max_frame_size {
            let header = FrameHeader::single(packet.protocol_type, total);
            return Ok(vec![seal(header, Some(type_byte), &packet.data)?]);
        }

        let context_id = u64::from(self.allocate_context_id());
        let first_len = self.max_frame_size - 1;
        let (first, mut rest) = packet.data.split_at(first_len);

        let mut frames = Vec::with_capacity(1 + rest.len().div_ceil(self.max_frame_size));
        let header =
            FrameHeader::first_chunk(packet.protocol_type, context_id, total as u64, self.max_frame_size);
        frames.push(seal(header, Some(type_byte), first)?);

        while !rest.is_empty() {
            let (chunk, tail) = rest.split_at(rest.len().min(self.max_frame_size));
            let header = FrameHeader::continuation(packet.protocol_type, context_id, chunk.len());
            frames.push(seal(header, None, chunk)?);
            rest = tail;
        }

        tracing::trace!(
            context_id,
            frames = frames.len(),
            size = total,
            "Split packet into chunks"
        );
        Ok(frames)
    }

    /// Context ids cycle through 1..=u16::MAX; 0 means "no context".
    fn allocate_context_id(&mut self) -> u16 {
        let id = self.next_context_id;
        self.next_context_id = self.next_context_id.checked_add(1).unwrap_or(1);
        id
    }
}

impl Default for FrameSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

fn seal(header: FrameHeader, type_byte: Option<u8>, data: &[u8]) -> P2pResult<Bytes> {
    if header.frame_size != data.len() + usize::from(type_byte.is_some()) {
        return Err(P2pError::MalformedFrame(format!(
            "frame size {} does not match payload",
            header.frame_size
        )));
    }
    let mut out = BytesMut::with_capacity(HEADER_SIZE + header.frame_size + MAC_SIZE);
    header.encode(&mut out)?;
    if let Some(byte) = type_byte {
        out.put_u8(byte);
    }
    out.put_slice(data);
    out.put_bytes(0, MAC_SIZE);
    Ok(out.freeze())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::rlpx::FrameMerger;

    fn merge_all(merger: &mut FrameMerger, frames: &[Bytes]) -> Option<Packet> {
        let (last, init) = frames.split_last().unwrap();
        for frame in init {
            assert_eq!(merger.merge(frame).unwrap(), None);
        }
        merger.merge(last).unwrap()
    }

    #[test]
    fn test_small_packet_is_one_frame() {
        let mut splitter = FrameSplitter::new(1024);
        let packet = Packet::new(0, 0x08, vec![7u8; 100]);

        let frames = splitter.split(&packet).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), HEADER_SIZE + 101 + MAC_SIZE);

        let header = FrameHeader::decode(&frames[0]).unwrap();
        assert_eq!(header.context_id, None);
        assert_eq!(header.total_packet_size, None);
    }

    #[test]
    fn test_packet_type_zero_encodes_as_empty_string() {
        let mut splitter = FrameSplitter::new(1024);
        let frames = splitter.split(&Packet::new(0, 0, vec![1u8])).unwrap();
        assert_eq!(frames[0][HEADER_SIZE], 0x80);
    }

    #[test]
    fn test_large_packet_is_chunked() {
        let mut splitter = FrameSplitter::new(1024);
        let data: Vec<u8> = (0..3000u32).map(|i| i as u8).collect();
        let packet = Packet::new(3, 0x0a, data);

        let frames = splitter.split(&packet).unwrap();
        assert_eq!(frames.len(), 3);

        let first = FrameHeader::decode(&frames[0]).unwrap();
        assert_eq!(first.context_id, Some(1));
        assert_eq!(first.total_packet_size, Some(3001));
        assert_eq!(first.frame_size, 1024);

        let last = FrameHeader::decode(&frames[2]).unwrap();
        assert_eq!(last.context_id, Some(1));
        assert_eq!(last.total_packet_size, None);
        assert_eq!(last.frame_size, 3001 - 2048);

        let mut merger = FrameMerger::with_defaults();
        assert_eq!(merge_all(&mut merger, &frames), Some(packet));
        assert_eq!(merger.open_contexts(), 0);
    }

    #[test]
    fn test_context_ids_advance_and_skip_zero() {
        let mut splitter = FrameSplitter::new(4);
        splitter.next_context_id = u16::MAX;
        let packet = Packet::new(0, 0x01, vec![0u8; 10]);

        let a = FrameHeader::decode(&splitter.split(&packet).unwrap()[0]).unwrap();
        let b = FrameHeader::decode(&splitter.split(&packet).unwrap()[0]).unwrap();
        assert_eq!(a.context_id, Some(u64::from(u16::MAX)));
        assert_eq!(b.context_id, Some(1));
    }

    #[test]
    fn test_oversized_packet_type_rejected() {
        let mut splitter = FrameSplitter::new(1024);
        assert!(splitter.split(&Packet::new(0, 0x80, Vec::<u8>::new())).is_err());
    }

    proptest! {
        #[test]
        fn split_then_merge_restores_packet(
            data in proptest::collection::vec(any::<u8>(), 0..5000),
            packet_type in 0u8..0x80,
            max_frame_size in 2usize..600,
        ) {
            let mut splitter = FrameSplitter::new(max_frame_size);
            let packet = Packet::new(0, packet_type, data);

            let frames = splitter.split(&packet).unwrap();
            for frame in &frames {
                let header = FrameHeader::decode(frame).unwrap();
                prop_assert!(header.frame_size <= max_frame_size);
            }

            let mut merger = FrameMerger::with_defaults();
            prop_assert_eq!(merge_all(&mut merger, &frames), Some(packet));
            prop_assert_eq!(merger.open_contexts(), 0);
        }
    }
}
