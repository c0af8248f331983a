//! RLPx frame layer.
//!
//! Frames arrive already decrypted and authenticated by the lower transport:
//!
//! ```text
//! [ header: 32 bytes ][ payload ][ mac: 16 bytes ]
//!   0..3   payload length (big-endian)
//!   3..16  RLP [protocol_type, context_id?, total_packet_size?], zero padded
//! ```
//!
//! The first frame of a packet starts its payload with one packet-type byte.
//! Packets larger than one frame are chunked: the first chunk declares the
//! total packet size and a context id, continuations repeat the context id.

pub mod codec;
pub mod header;
pub mod merger;
pub mod packet;
pub mod splitter;

pub use codec::FrameCodec;
pub use header::{FrameHeader, HEADER_DATA_SIZE, HEADER_SIZE, LENGTH_PREFIX_SIZE, MAC_SIZE};
pub use merger::FrameMerger;
pub use packet::Packet;
pub use splitter::FrameSplitter;
