//! Capability chain dispatch.
//!
//! Every eth version contributes a [`CodeTable`]: the message codes it
//! introduces and, optionally, how it broadcasts new transactions. The
//! active [`DispatchTable`] is built by folding the tables of all versions
//! up to the negotiated one, oldest first, so a later layer overrides an
//! earlier one while codes it does not mention fall through to its
//! ancestors.

use std::collections::HashMap;

use crate::protocol::version::{EthVersion, MessageKind};

/// How new transactions are pushed to a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxBroadcast {
    /// Send whole transactions in `Transactions` messages.
    FullBodies,
    /// Announce hashes and let the peer request what it lacks.
    HashAnnouncement,
}

/// Message codes and behavior introduced by one version.
#[derive(Debug, Clone, Copy)]
pub struct CodeTable {
    /// Version that introduced these codes.
    pub version: EthVersion,
    /// Messages recognized from this version on.
    pub kinds: &'static [MessageKind],
    /// Broadcast mode override, if this layer changes it.
    pub broadcast: Option<TxBroadcast>,
}

/// Version layers, oldest first.
pub const LAYERS: [CodeTable; 4] = [
    CodeTable {
        version: EthVersion::Eth62,
        kinds: &[
            MessageKind::Status,
            MessageKind::NewBlockHashes,
            MessageKind::Transactions,
            MessageKind::GetBlockHeaders,
            MessageKind::BlockHeaders,
            MessageKind::GetBlockBodies,
            MessageKind::BlockBodies,
            MessageKind::NewBlock,
        ],
        broadcast: Some(TxBroadcast::FullBodies),
    },
    CodeTable {
        version: EthVersion::Eth63,
        kinds: &[
            MessageKind::GetNodeData,
            MessageKind::NodeData,
            MessageKind::GetReceipts,
            MessageKind::Receipts,
        ],
        broadcast: None,
    },
    CodeTable {
        version: EthVersion::Eth64,
        kinds: &[],
        broadcast: None,
    },
    CodeTable {
        version: EthVersion::Eth65,
        kinds: &[
            MessageKind::NewPooledTransactionHashes,
            MessageKind::GetPooledTransactions,
            MessageKind::PooledTransactions,
        ],
        broadcast: Some(TxBroadcast::HashAnnouncement),
    },
];

/// Resolved entry of a dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchEntry {
    /// Message kind handled for the code.
    pub kind: MessageKind,
    /// Layer the entry came from.
    pub introduced: EthVersion,
}

/// Code lookup for one negotiated version.
#[derive(Debug, Clone)]
pub struct DispatchTable {
    version: EthVersion,
    entries: HashMap<u8, DispatchEntry>,
    broadcast: TxBroadcast,
}

impl DispatchTable {
    /// Build the table for a negotiated version.
    pub fn for_version(version: EthVersion) -> Self {
        Self::from_layers(version, &LAYERS)
    }

    fn from_layers(version: EthVersion, layers: &[CodeTable]) -> Self {
        let mut entries = HashMap::new();
        let mut broadcast = TxBroadcast::FullBodies;

        for layer in layers.iter().filter(|layer| layer.version <= version) {
            for &kind in layer.kinds {
                entries.insert(
                    kind.code(),
                    DispatchEntry {
                        kind,
                        introduced: layer.version,
                    },
                );
            }
            if let Some(mode) = layer.broadcast {
                broadcast = mode;
            }
        }

        Self {
            version,
            entries,
            broadcast,
        }
    }

    /// Look up a wire code. `None` means the code is not valid for this
    /// version.
    pub fn resolve(&self, code: u8) -> Option<DispatchEntry> {
        self.entries.get(&code).copied()
    }

    /// Whether a message kind may be sent or received at this version.
    pub fn supports(&self, kind: MessageKind) -> bool {
        self.entries
            .get(&kind.code())
            .is_some_and(|entry| entry.kind == kind)
    }

    /// Transaction broadcast mode for this version.
    pub fn broadcast(&self) -> TxBroadcast {
        self.broadcast
    }

    /// Negotiated version.
    pub fn version(&self) -> EthVersion {
        self.version
    }

    /// Number of recognized codes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no code is recognized.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
