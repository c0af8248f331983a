//! Error types for the keel-core crate.

use std::fmt;

/// Errors related to RLP encoding and decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SerializationError {
    /// Failed to decode a value from bytes.
    DecodeFailed(String),
    /// Decoding succeeded but bytes were left over.
    TrailingBytes(usize),
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializationError::DecodeFailed(msg) => write!(f, "decode failed: {}", msg),
            SerializationError::TrailingBytes(n) => write!(f, "{} trailing bytes after value", n),
        }
    }
}

impl std::error::Error for SerializationError {}

impl From<alloy_rlp::Error> for SerializationError {
    fn from(e: alloy_rlp::Error) -> Self {
        SerializationError::DecodeFailed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = SerializationError::DecodeFailed("bad".into());
        assert_eq!(e.to_string(), "decode failed: bad");

        let e = SerializationError::TrailingBytes(3);
        assert_eq!(e.to_string(), "3 trailing bytes after value");
    }

    #[test]
    fn test_from_rlp_error() {
        let e: SerializationError = alloy_rlp::Error::InputTooShort.into();
        assert!(matches!(e, SerializationError::DecodeFailed(_)));
    }
}
