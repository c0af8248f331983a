//! Strict RLP helpers.

use alloy_rlp::{Decodable, Encodable};

use crate::error::SerializationError;

/// Encode a value to its RLP bytes.
pub fn encode<T: Encodable + ?Sized>(value: &T) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.length());
    value.encode(&mut out);
    out
}

/// Length in bytes of the RLP encoding of a value.
pub fn encoded_len<T: Encodable + ?Sized>(value: &T) -> usize {
    value.length()
}

/// Decode a value, rejecting any bytes left after it.
pub fn decode_exact<T: Decodable>(bytes: &[u8]) -> Result<T, SerializationError> {
    let mut buf = bytes;
    let value = T::decode(&mut buf)?;
    if !buf.is_empty() {
        return Err(SerializationError::TrailingBytes(buf.len()));
    }
    Ok(value)
}
