//! Transaction pool for the keel node.
//!
//! This crate provides the two collaborators the eth wire protocol leans on:
//! - [`TxPool`]: pending transactions, looked up by hash when a peer asks
//!   for them and fed by whatever peers deliver
//! - [`PooledTxsRequestor`]: decides which announced hashes are worth
//!   requesting, so the same transaction is not fetched from every peer
//!
//! Both are shared by all peer sessions and are safe to call concurrently.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use keel_txpool::{Mempool, TxPool, TxRequestor, PooledTxsRequestor};
//!
//! let pool: Arc<dyn TxPool> = Arc::new(Mempool::with_defaults());
//! let requestor = TxRequestor::with_defaults(pool.clone());
//! requestor.request_unknown(&hashes, &mut |batch| send_get_pooled(batch));
//! ```

mod entry;
mod error;
mod pool;
mod requestor;

pub use entry::MempoolEntry;
pub use error::{TxPoolError, TxPoolResult};
pub use pool::{AddTxOutcome, Mempool, TxPool, DEFAULT_MEMPOOL_SIZE};
pub use requestor::{
    PooledTxsRequestor, RequestorConfig, TxRequestor, DEFAULT_MAX_HASHES_PER_REQUEST,
    DEFAULT_MAX_PENDING_REQUESTS, DEFAULT_REQUEST_TIMEOUT,
};
