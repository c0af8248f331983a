//! P2P error types.

use std::io;
use thiserror::Error;

/// P2P-specific errors.
#[derive(Debug, Error)]
pub enum P2pError {
    /// I/O error on the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Frame could not be parsed; framing can no longer be trusted.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Peer broke the wire protocol.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Failed to encode or decode a message payload.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Frame payload exceeds the allowed size.
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// Declared packet size exceeds the allowed size.
    #[error("Packet too large: {size} bytes (max: {max})")]
    PacketTooLarge { size: usize, max: usize },

    /// Too many chunked packets in flight on one session.
    #[error("Too many open reassembly contexts (max: {max})")]
    TooManyContexts { max: usize },

    /// Channel send error.
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<keel_core::SerializationError> for P2pError {
    fn from(err: keel_core::SerializationError) -> Self {
        P2pError::Serialization(err.to_string())
    }
}

/// Result type for P2P operations.
pub type P2pResult<T> = Result<T, P2pError>;
