//! Peer identity and per-session counters.

pub mod info;

pub use info::{PeerId, PeerStats};
