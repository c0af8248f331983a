//! Outbound side of a peer session.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::{P2pError, P2pResult};
use crate::peer::PeerId;
use crate::rlpx::Packet;

/// Connection a protocol handler writes packets to.
pub trait PeerSession: Send + Sync {
    /// Identity of the remote peer.
    fn peer_id(&self) -> PeerId;

    /// Queue a packet for the peer.
    fn send(&self, packet: Packet) -> P2pResult<()>;
}

impl<T: PeerSession + ?Sized> PeerSession for Arc<T> {
    fn peer_id(&self) -> PeerId {
        (**self).peer_id()
    }

    fn send(&self, packet: Packet) -> P2pResult<()> {
        (**self).send(packet)
    }
}

/// [`PeerSession`] queueing packets on an unbounded channel drained by a
/// writer task.
#[derive(Debug, Clone)]
pub struct ChannelSession {
    peer_id: PeerId,
    tx: mpsc::UnboundedSender<Packet>,
}

impl ChannelSession {
    /// Create a session and the receiver its packets arrive on.
    pub fn new(peer_id: PeerId) -> (Self, mpsc::UnboundedReceiver<Packet>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { peer_id, tx }, rx)
    }

    /// Whether the writer side has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl PeerSession for ChannelSession {
    fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    fn send(&self, packet: Packet) -> P2pResult<()> {
        self.tx
            .send(packet)
            .map_err(|e| P2pError::ChannelSend(format!("{}: {}", self.peer_id, e)))
    }
}
