//! eth protocol handler for one peer session.
//!
//! The handler resolves every inbound packet through the dispatch table of
//! the negotiated version, so codes introduced by an older version keep
//! working on newer ones and codes from a newer version are rejected on
//! older ones.

use std::sync::Arc;

use bytes::Bytes;

use keel_core::{Transaction, TxHash};
use keel_txpool::{PooledTxsRequestor, TxPool};

use crate::config::EthConfig;
use crate::error::{P2pError, P2pResult};
use crate::eth::gossip::{announce_batches, fulfill_request, transaction_batches};
use crate::peer::{PeerId, PeerStats};
use crate::protocol::{DispatchTable, EthVersion, Message, MessageKind, StatusMessage, TxBroadcast};
use crate::rlpx::Packet;
use crate::session::PeerSession;

/// Block and state synchronization collaborator.
pub trait SyncPeer: Send + Sync {
    /// Handle a sync message received from `peer`.
    fn on_sync_message(&self, peer: PeerId, kind: MessageKind, payload: Bytes);
}

/// Per-session eth message handler.
pub struct EthProtocolHandler<S: PeerSession> {
    session: S,
    config: Arc<EthConfig>,
    table: DispatchTable,
    pool: Arc<dyn TxPool>,
    requestor: Arc<dyn PooledTxsRequestor>,
    sync: Option<Arc<dyn SyncPeer>>,
    peer_status: Option<StatusMessage>,
    stats: PeerStats,
}

impl<S: PeerSession> EthProtocolHandler<S> {
    /// Create a handler for a session negotiated at `version`.
    pub fn new(
        session: S,
        config: Arc<EthConfig>,
        version: EthVersion,
        pool: Arc<dyn TxPool>,
        requestor: Arc<dyn PooledTxsRequestor>,
    ) -> Self {
        Self {
            session,
            config,
            table: DispatchTable::for_version(version),
            pool,
            requestor,
            sync: None,
            peer_status: None,
            stats: PeerStats::new(),
        }
    }

    /// Attach the collaborator receiving block and state messages.
    pub fn with_sync_peer(mut self, sync: Arc<dyn SyncPeer>) -> Self {
        self.sync = Some(sync);
        self
    }

    /// Handle one reassembled packet.
    ///
    /// Unknown codes and a repeated or mismatched status are protocol
    /// violations.
    pub fn handle_incoming(&mut self, packet: Packet) -> P2pResult<()> {
        let entry = self.table.resolve(packet.packet_type).ok_or_else(|| {
            P2pError::ProtocolViolation(format!(
                "message code {:#04x} is not supported by {}",
                packet.packet_type,
                self.version()
            ))
        })?;

        let message = Message::decode(entry.kind, &packet.data)?;
        let counter = self.stats.record_recv(packet.len());
        tracing::trace!(peer = %self.peer_id(), "IN {:05} {}", counter, message);

        match message {
            Message::Status(status) => self.on_status(status),
            Message::Transactions(txs) => {
                self.on_transactions(txs);
                Ok(())
            }
            Message::NewPooledTransactionHashes(hashes) => self.on_announcement(&hashes),
            Message::GetPooledTransactions(hashes) => self.on_request(&hashes),
            Message::PooledTransactions(txs) => {
                self.on_pooled_transactions(txs);
                Ok(())
            }
            Message::Sync { kind, payload } => {
                self.on_sync(kind, payload);
                Ok(())
            }
        }
    }

    /// Broadcast new transactions to the peer.
    ///
    /// Full bodies go out when asked for or when the version predates hash
    /// announcements; otherwise only hashes are announced.
    pub fn send_new_transactions(
        &mut self,
        txs: &[Transaction],
        send_full_bodies: bool,
    ) -> P2pResult<()> {
        if txs.is_empty() {
            return Ok(());
        }

        if send_full_bodies || self.table.broadcast() == TxBroadcast::FullBodies {
            for batch in transaction_batches(txs, self.config.max_transactions_packet_size) {
                self.send(Message::Transactions(batch))?;
            }
        } else {
            let hashes: Vec<TxHash> = txs.iter().map(Transaction::hash).collect();
            for batch in announce_batches(&hashes, self.config.max_announce_hashes) {
                self.send(Message::NewPooledTransactionHashes(batch))?;
            }
        }
        Ok(())
    }

    /// Send a message to the peer.
    pub fn send(&mut self, message: Message) -> P2pResult<()> {
        let kind = message.kind();
        if !self.table.supports(kind) {
            return Err(P2pError::ProtocolViolation(format!(
                "{} cannot be sent on {}",
                kind,
                self.version()
            )));
        }

        let packet = message.to_packet(self.config.protocol_type);
        let counter = self.stats.record_send(packet.len());
        tracing::trace!(peer = %self.peer_id(), "OUT {:05} {}", counter, message);
        self.session.send(packet)
    }

    /// Messages exchanged in both directions so far.
    pub fn counter(&self) -> u64 {
        self.stats.total_messages()
    }

    /// Traffic counters.
    pub fn stats(&self) -> &PeerStats {
        &self.stats
    }

    /// Status received from the peer, once it has arrived.
    pub fn peer_status(&self) -> Option<&StatusMessage> {
        self.peer_status.as_ref()
    }

    /// Capability id this handler serves.
    pub fn protocol_type(&self) -> u64 {
        self.config.protocol_type
    }

    /// Negotiated version.
    pub fn version(&self) -> EthVersion {
        self.table.version()
    }

    /// Remote peer.
    pub fn peer_id(&self) -> PeerId {
        self.session.peer_id()
    }

    /// Underlying session.
    pub fn session(&self) -> &S {
        &self.session
    }

    fn on_status(&mut self, status: StatusMessage) -> P2pResult<()> {
        if self.peer_status.is_some() {
            return Err(P2pError::ProtocolViolation("duplicate status".into()));
        }
        if status.protocol_version != self.version().as_u8() {
            return Err(P2pError::ProtocolViolation(format!(
                "status announces eth/{} on a {} session",
                status.protocol_version,
                self.version()
            )));
        }

        tracing::debug!(
            peer = %self.peer_id(),
            network_id = status.network_id,
            fork_id = status.fork_id.is_some(),
            "Received status"
        );
        self.peer_status = Some(status);
        Ok(())
    }

    fn on_transactions(&self, txs: Vec<Transaction>) {
        let count = txs.len();
        let added = self.submit_all(txs);
        tracing::debug!(peer = %self.peer_id(), count, added, "Received transactions");
    }

    fn on_announcement(&mut self, hashes: &[TxHash]) -> P2pResult<()> {
        if hashes.is_empty() {
            return Ok(());
        }
        if hashes.len() > self.config.max_announce_hashes {
            return Err(P2pError::ProtocolViolation(format!(
                "announcement of {} hashes exceeds {}",
                hashes.len(),
                self.config.max_announce_hashes
            )));
        }

        let mut requests = Vec::new();
        self.requestor
            .request_unknown(hashes, &mut |batch| requests.push(batch));

        tracing::debug!(
            peer = %self.peer_id(),
            announced = hashes.len(),
            requests = requests.len(),
            "Received transaction announcement"
        );
        let mut batches = requests.into_iter();
        while let Some(batch) = batches.next() {
            let sent = batch.clone();
            if let Err(e) = self.send(Message::GetPooledTransactions(batch)) {
                // Unsent hashes must stay requestable from other peers.
                self.requestor.release(&sent);
                for rest in batches {
                    self.requestor.release(&rest);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn on_request(&mut self, hashes: &[TxHash]) -> P2pResult<()> {
        let txs = fulfill_request(self.pool.as_ref(), hashes, self.config.max_pooled_response);
        tracing::debug!(
            peer = %self.peer_id(),
            requested = hashes.len(),
            found = txs.len(),
            "Serving pooled transactions"
        );
        self.send(Message::PooledTransactions(txs))
    }

    fn on_pooled_transactions(&self, txs: Vec<Transaction>) {
        let hashes: Vec<TxHash> = txs.iter().map(Transaction::hash).collect();
        let count = txs.len();
        let added = self.submit_all(txs);
        // Claims drop only once the pool can answer for the hashes.
        for hash in &hashes {
            self.requestor.on_delivered(hash);
        }
        tracing::debug!(peer = %self.peer_id(), count, added, "Received pooled transactions");
    }

    fn on_sync(&self, kind: MessageKind, payload: Bytes) {
        match &self.sync {
            Some(sync) => sync.on_sync_message(self.peer_id(), kind, payload),
            None => tracing::trace!(peer = %self.peer_id(), code = kind.code(), "Dropped {}", kind),
        }
    }

    /// Submit transactions to the pool, returning how many were new.
    /// Pool rejections are logged and do not end the session.
    fn submit_all(&self, txs: Vec<Transaction>) -> usize {
        let mut added = 0;
        for tx in txs {
            match self.pool.submit(tx) {
                Ok(outcome) if outcome.is_added() => added += 1,
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(peer = %self.peer_id(), error = %e, "Transaction rejected");
                }
            }
        }
        added
    }
}
