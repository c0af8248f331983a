//! RLPx framing and eth sub-protocol handling for the keel node.
//!
//! This crate sits between an authenticated connection and the node's
//! transaction pool:
//!
//! - Frame reassembly and chunking for multiplexed RLPx frames
//! - The eth/62 to eth/65 capability chain and its message codes
//! - Pooled transaction gossip: announcements, requests and delivery
//! - Per-peer sessions reading and writing frames over tokio streams
//!
//! # Architecture
//!
//! Each peer connection runs as two tasks. The reader drives a [`Session`],
//! which merges frames into packets and hands them to the
//! [`EthProtocolHandler`]. Everything the handler sends goes through a
//! [`ChannelSession`] to the writer task started by [`spawn_writer`].
//!
//! ```text
//! Peer Task (read loop)          Writer Task
//! ├── FrameCodec                 ├── FrameSplitter
//! ├── FrameMerger                └── FrameCodec
//! └── EthProtocolHandler ── mpsc ──┘
//!     ├── TxPool (shared)
//!     └── PooledTxsRequestor (shared)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use keel_p2p::{spawn_writer, ChannelSession, EthConfig, EthProtocolHandler, FrameSplitter, PeerId, Session};
//! use keel_txpool::{Mempool, TxRequestor};
//!
//! let config = Arc::new(EthConfig::default());
//! let pool = Arc::new(Mempool::with_defaults());
//! let requestor = Arc::new(TxRequestor::with_defaults(pool.clone()));
//!
//! let (channel, outbound) = ChannelSession::new(PeerId(1));
//! let writer = spawn_writer(write_half, outbound, FrameSplitter::new(config.max_frame_size));
//! let handler = EthProtocolHandler::new(channel, config.clone(), config.version, pool, requestor);
//! Session::new(handler, &config).run(read_half).await?;
//! ```

pub mod config;
pub mod error;

pub mod eth;
pub mod peer;
pub mod protocol;
pub mod rlpx;
pub mod session;

// Re-export main types
pub use config::EthConfig;
pub use error::{P2pError, P2pResult};
pub use eth::{EthProtocolHandler, SyncPeer};
pub use peer::{PeerId, PeerStats};
pub use protocol::{EthVersion, Message, MessageKind, StatusMessage};
pub use rlpx::{FrameCodec, FrameMerger, FrameSplitter, Packet};
pub use session::{spawn_writer, ChannelSession, PeerSession, Session};
