//! eth protocol versions and message codes.

use std::fmt;

use serde::Deserialize;

/// Negotiated eth protocol version.
///
/// Versions are ordered; each one accepts every message of the versions
/// before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EthVersion {
    /// eth/62: status, block propagation, header and body sync.
    Eth62 = 62,
    /// eth/63: adds node data and receipts.
    Eth63 = 63,
    /// eth/64: status carries a fork id.
    Eth64 = 64,
    /// eth/65: pooled transaction announcements.
    Eth65 = 65,
}

impl EthVersion {
    /// All versions, oldest first.
    pub const ALL: [EthVersion; 4] = [
        EthVersion::Eth62,
        EthVersion::Eth63,
        EthVersion::Eth64,
        EthVersion::Eth65,
    ];

    /// Version from its wire number.
    pub fn from_u8(version: u8) -> Option<Self> {
        match version {
            62 => Some(EthVersion::Eth62),
            63 => Some(EthVersion::Eth63),
            64 => Some(EthVersion::Eth64),
            65 => Some(EthVersion::Eth65),
            _ => None,
        }
    }

    /// Wire number of this version.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Capability name, e.g. `eth/65`.
    pub fn name(self) -> &'static str {
        match self {
            EthVersion::Eth62 => "eth/62",
            EthVersion::Eth63 => "eth/63",
            EthVersion::Eth64 => "eth/64",
            EthVersion::Eth65 => "eth/65",
        }
    }

    /// Whether transactions can be announced by hash.
    pub fn supports_hash_announcements(self) -> bool {
        self >= EthVersion::Eth65
    }

    /// Whether status messages carry a fork id.
    pub fn has_fork_id(self) -> bool {
        self >= EthVersion::Eth64
    }
}

impl fmt::Display for EthVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Wire message codes.
pub mod codes {
    pub const STATUS: u8 = 0x00;
    pub const NEW_BLOCK_HASHES: u8 = 0x01;
    pub const TRANSACTIONS: u8 = 0x02;
    pub const GET_BLOCK_HEADERS: u8 = 0x03;
    pub const BLOCK_HEADERS: u8 = 0x04;
    pub const GET_BLOCK_BODIES: u8 = 0x05;
    pub const BLOCK_BODIES: u8 = 0x06;
    pub const NEW_BLOCK: u8 = 0x07;
    pub const NEW_POOLED_TRANSACTION_HASHES: u8 = 0x08;
    pub const GET_POOLED_TRANSACTIONS: u8 = 0x09;
    pub const POOLED_TRANSACTIONS: u8 = 0x0a;
    pub const GET_NODE_DATA: u8 = 0x0d;
    pub const NODE_DATA: u8 = 0x0e;
    pub const GET_RECEIPTS: u8 = 0x0f;
    pub const RECEIPTS: u8 = 0x10;
}

/// Kind of an eth message, independent of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Status,
    NewBlockHashes,
    Transactions,
    GetBlockHeaders,
    BlockHeaders,
    GetBlockBodies,
    BlockBodies,
    NewBlock,
    NewPooledTransactionHashes,
    GetPooledTransactions,
    PooledTransactions,
    GetNodeData,
    NodeData,
    GetReceipts,
    Receipts,
}

impl MessageKind {
    /// Wire code of this message.
    pub fn code(self) -> u8 {
        match self {
            MessageKind::Status => codes::STATUS,
            MessageKind::NewBlockHashes => codes::NEW_BLOCK_HASHES,
            MessageKind::Transactions => codes::TRANSACTIONS,
            MessageKind::GetBlockHeaders => codes::GET_BLOCK_HEADERS,
            MessageKind::BlockHeaders => codes::BLOCK_HEADERS,
            MessageKind::GetBlockBodies => codes::GET_BLOCK_BODIES,
            MessageKind::BlockBodies => codes::BLOCK_BODIES,
            MessageKind::NewBlock => codes::NEW_BLOCK,
            MessageKind::NewPooledTransactionHashes => codes::NEW_POOLED_TRANSACTION_HASHES,
            MessageKind::GetPooledTransactions => codes::GET_POOLED_TRANSACTIONS,
            MessageKind::PooledTransactions => codes::POOLED_TRANSACTIONS,
            MessageKind::GetNodeData => codes::GET_NODE_DATA,
            MessageKind::NodeData => codes::NODE_DATA,
            MessageKind::GetReceipts => codes::GET_RECEIPTS,
            MessageKind::Receipts => codes::RECEIPTS,
        }
    }

    /// Message name as used in logs.
    pub fn name(self) -> &'static str {
        match self {
            MessageKind::Status => "Status",
            MessageKind::NewBlockHashes => "NewBlockHashes",
            MessageKind::Transactions => "Transactions",
            MessageKind::GetBlockHeaders => "GetBlockHeaders",
            MessageKind::BlockHeaders => "BlockHeaders",
            MessageKind::GetBlockBodies => "GetBlockBodies",
            MessageKind::BlockBodies => "BlockBodies",
            MessageKind::NewBlock => "NewBlock",
            MessageKind::NewPooledTransactionHashes => "NewPooledTransactionHashes",
            MessageKind::GetPooledTransactions => "GetPooledTransactions",
            MessageKind::PooledTransactions => "PooledTransactions",
            MessageKind::GetNodeData => "GetNodeData",
            MessageKind::NodeData => "NodeData",
            MessageKind::GetReceipts => "GetReceipts",
            MessageKind::Receipts => "Receipts",
        }
    }

    /// Block and state messages, handed to the sync collaborator as-is.
    pub fn is_sync(self) -> bool {
        !matches!(
            self,
            MessageKind::Status
                | MessageKind::Transactions
                | MessageKind::NewPooledTransactionHashes
                | MessageKind::GetPooledTransactions
                | MessageKind::PooledTransactions
        )
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
