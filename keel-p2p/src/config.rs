//! Wire protocol configuration.

use serde::Deserialize;

use crate::error::{P2pError, P2pResult};
use crate::protocol::EthVersion;

/// Capability id carried in frame headers for the eth sub-protocol.
pub const DEFAULT_PROTOCOL_TYPE: u64 = 0;

/// Maximum hashes in one `NewPooledTransactionHashes` message.
pub const DEFAULT_MAX_ANNOUNCE_HASHES: usize = 4096;

/// Maximum transactions in one `PooledTransactions` response.
pub const DEFAULT_MAX_POOLED_RESPONSE: usize = 256;

/// Soft byte limit for one full-body `Transactions` message (100 KiB).
pub const DEFAULT_MAX_TRANSACTIONS_PACKET_SIZE: usize = 100 * 1024;

/// Payload bytes per outbound frame.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024;

/// Maximum reassembled packet size (16 MiB).
pub const DEFAULT_MAX_PACKET_SIZE: usize = 16 * 1024 * 1024;

/// Maximum chunked packets in flight per session.
pub const DEFAULT_MAX_OPEN_CONTEXTS: usize = 64;

/// Largest payload a single frame can declare in its 3-byte length prefix.
pub const MAX_FRAME_PREFIX_SIZE: usize = 0xFF_FFFF;

/// Configuration for the eth wire protocol.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EthConfig {
    /// Capability id expected in frame headers.
    pub protocol_type: u64,

    /// Negotiated eth version used for new sessions.
    pub version: EthVersion,

    /// Announcement batch cap.
    pub max_announce_hashes: usize,

    /// Fulfillment response cap.
    pub max_pooled_response: usize,

    /// Byte limit for full-body transaction batches.
    pub max_transactions_packet_size: usize,

    /// Payload bytes per outbound frame.
    pub max_frame_size: usize,

    /// Maximum size of a reassembled inbound packet.
    pub max_packet_size: usize,

    /// Maximum chunked packets in flight per session.
    pub max_open_contexts: usize,
}

impl Default for EthConfig {
    fn default() -> Self {
        Self {
            protocol_type: DEFAULT_PROTOCOL_TYPE,
            version: EthVersion::Eth65,
            max_announce_hashes: DEFAULT_MAX_ANNOUNCE_HASHES,
            max_pooled_response: DEFAULT_MAX_POOLED_RESPONSE,
            max_transactions_packet_size: DEFAULT_MAX_TRANSACTIONS_PACKET_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            max_open_contexts: DEFAULT_MAX_OPEN_CONTEXTS,
        }
    }
}

impl EthConfig {
    /// Create a configuration for the given eth version.
    pub fn new(version: EthVersion) -> Self {
        Self {
            version,
            ..Default::default()
        }
    }

    /// Parse a configuration from TOML. Missing keys take default values.
    pub fn from_toml_str(source: &str) -> P2pResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| P2pError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every limit is usable.
    pub fn validate(&self) -> P2pResult<()> {
        if self.max_announce_hashes == 0 {
            return Err(P2pError::Config("max_announce_hashes must be positive".into()));
        }
        if self.max_pooled_response == 0 {
            return Err(P2pError::Config("max_pooled_response must be positive".into()));
        }
        if self.max_frame_size < 2 || self.max_frame_size > MAX_FRAME_PREFIX_SIZE {
            return Err(P2pError::Config(format!(
                "max_frame_size must be between 2 and {}",
                MAX_FRAME_PREFIX_SIZE
            )));
        }
        if self.max_packet_size == 0 {
            return Err(P2pError::Config("max_packet_size must be positive".into()));
        }
        if self.max_open_contexts == 0 {
            return Err(P2pError::Config("max_open_contexts must be positive".into()));
        }
        Ok(())
    }

    /// Set the capability id.
    pub fn with_protocol_type(mut self, protocol_type: u64) -> Self {
        self.protocol_type = protocol_type;
        self
    }

    /// Set the eth version.
    pub fn with_version(mut self, version: EthVersion) -> Self {
        self.version = version;
        self
    }

    /// Set the announcement batch cap.
    pub fn with_max_announce_hashes(mut self, max: usize) -> Self {
        self.max_announce_hashes = max;
        self
    }

    /// Set the fulfillment response cap.
    pub fn with_max_pooled_response(mut self, max: usize) -> Self {
        self.max_pooled_response = max;
        self
    }

    /// Set the byte limit for full-body transaction batches.
    pub fn with_max_transactions_packet_size(mut self, max: usize) -> Self {
        self.max_transactions_packet_size = max;
        self
    }

    /// Set the outbound frame payload size.
    pub fn with_max_frame_size(mut self, max: usize) -> Self {
        self.max_frame_size = max;
        self
    }

    /// Set the maximum reassembled packet size.
    pub fn with_max_packet_size(mut self, max: usize) -> Self {
        self.max_packet_size = max;
        self
    }

    /// Set the maximum chunked packets in flight per session.
    pub fn with_max_open_contexts(mut self, max: usize) -> Self {
        self.max_open_contexts = max;
        self
    }

    /// Largest inbound frame payload accepted by the stream codec.
    pub fn max_inbound_frame_size(&self) -> usize {
        self.max_packet_size.saturating_add(1).min(MAX_FRAME_PREFIX_SIZE)
    }
}
