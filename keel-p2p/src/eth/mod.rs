//! eth protocol handling and transaction gossip.

pub mod gossip;
pub mod handler;

pub use gossip::{announce_batches, fulfill_request, transaction_batches};
pub use handler::{EthProtocolHandler, SyncPeer};
