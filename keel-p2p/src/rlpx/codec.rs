//! Whole-frame codec over a byte stream.
//!
//! Frames are delimited by the 3-byte length prefix:
//! - 32 bytes: header
//! - N bytes: payload, N taken from the prefix
//! - 16 bytes: mac

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::config::DEFAULT_MAX_FRAME_SIZE;
use crate::error::{P2pError, P2pResult};
use crate::rlpx::header::{FrameHeader, HEADER_SIZE, MAC_SIZE};

/// Codec yielding and accepting whole frames.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    /// Create a codec rejecting frames with larger payloads.
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = P2pError;

    fn decode(&mut self, src: &mut BytesMut) -> P2pResult<Option<Self::Item>> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        let length = u32::from_be_bytes([0, src[0], src[1], src[2]]) as usize;
        if length > self.max_frame_size {
            return Err(P2pError::FrameTooLarge {
                size: length,
                max: self.max_frame_size,
            });
        }

        let frame_len = HEADER_SIZE + length + MAC_SIZE;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        Ok(Some(src.split_to(frame_len).freeze()))
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = P2pError;

    fn encode(&mut self, frame: Bytes, dst: &mut BytesMut) -> P2pResult<()> {
        let header = FrameHeader::decode(&frame)?;
        if header.frame_size > self.max_frame_size {
            return Err(P2pError::FrameTooLarge {
                size: header.frame_size,
                max: self.max_frame_size,
            });
        }
        if frame.len() != HEADER_SIZE + header.frame_size + MAC_SIZE {
            return Err(P2pError::MalformedFrame(format!(
                "frame of {} bytes does not match declared payload of {}",
                frame.len(),
                header.frame_size
            )));
        }

        dst.extend_from_slice(&frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::BufMut;

    use super::*;
    use crate::rlpx::{FrameSplitter, Packet};

    #[test]
    fn test_roundtrip_frames() {
        let mut codec = FrameCodec::new(64);
        let mut splitter = FrameSplitter::new(64);
        let frames = splitter.split(&Packet::new(0, 0x02, vec![9u8; 150])).unwrap();

        let mut buf = BytesMut::new();
        for frame in &frames {
            codec.encode(frame.clone(), &mut buf).unwrap();
        }

        for frame in &frames {
            assert_eq!(codec.decode(&mut buf).unwrap().as_ref(), Some(frame));
        }
        assert!(buf.is_empty());
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_partial_frame() {
        let mut codec = FrameCodec::new(64);
        let mut splitter = FrameSplitter::new(64);
        let frame = splitter.split(&Packet::new(0, 0x02, vec![1u8; 20])).unwrap().remove(0);

        let mut buf = BytesMut::from(&frame[..HEADER_SIZE - 1]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.put_slice(&frame[HEADER_SIZE - 1..frame.len() - 1]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.put_slice(&frame[frame.len() - 1..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(frame));
    }

    #[test]
    fn test_frame_too_large() {
        let mut codec = FrameCodec::new(64);
        let mut buf = BytesMut::new();
        buf.put_slice(&[0, 0, 65]);
        buf.put_bytes(0, HEADER_SIZE - 3);

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(P2pError::FrameTooLarge { size: 65, max: 64 })));
    }

    #[test]
    fn test_encode_rejects_truncated_frame() {
        let mut codec = FrameCodec::new(64);
        let mut splitter = FrameSplitter::new(64);
        let frame = splitter.split(&Packet::new(0, 0x02, vec![1u8; 20])).unwrap().remove(0);

        let mut buf = BytesMut::new();
        let result = codec.encode(frame.slice(..frame.len() - 1), &mut buf);
        assert!(matches!(result, Err(P2pError::MalformedFrame(_))));
    }
}
