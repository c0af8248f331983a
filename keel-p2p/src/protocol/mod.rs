//! eth sub-protocol layer.
//!
//! This module contains:
//! - eth versions 62 to 65 and their message codes
//! - The capability chain that resolves codes for a negotiated version
//! - Message definitions and their RLP payloads

pub mod dispatch;
pub mod messages;
pub mod version;

// Re-export main types
pub use dispatch::{CodeTable, DispatchEntry, DispatchTable, TxBroadcast, LAYERS};
pub use messages::{ForkId, Message, StatusMessage};
pub use version::{codes, EthVersion, MessageKind};
