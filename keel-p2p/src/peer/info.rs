//! Peer identification and traffic counters.

use std::fmt;
use std::time::Instant;

/// Unique identifier for a peer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub u64);

impl PeerId {
    /// Create a new peer ID from a counter value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Traffic counters of one peer session.
#[derive(Debug, Clone)]
pub struct PeerStats {
    /// When the session started.
    pub connected_at: Instant,
    /// Last time a message was received.
    pub last_recv: Instant,
    /// Payload bytes received.
    pub bytes_recv: u64,
    /// Payload bytes sent.
    pub bytes_sent: u64,
    /// Messages received.
    pub messages_recv: u64,
    /// Messages sent.
    pub messages_sent: u64,
}

impl PeerStats {
    /// Fresh counters starting now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            connected_at: now,
            last_recv: now,
            bytes_recv: 0,
            bytes_sent: 0,
            messages_recv: 0,
            messages_sent: 0,
        }
    }

    /// Record a received message and return its sequence number.
    pub fn record_recv(&mut self, bytes: usize) -> u64 {
        self.messages_recv += 1;
        self.bytes_recv += bytes as u64;
        self.last_recv = Instant::now();
        self.messages_recv
    }

    /// Record a sent message and return its sequence number.
    pub fn record_send(&mut self, bytes: usize) -> u64 {
        self.messages_sent += 1;
        self.bytes_sent += bytes as u64;
        self.messages_sent
    }

    /// Total messages in both directions.
    pub fn total_messages(&self) -> u64 {
        self.messages_recv + self.messages_sent
    }
}

impl Default for PeerStats {
    fn default() -> Self {
        Self::new()
    }
}
