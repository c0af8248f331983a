//! Pending transaction pool.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use keel_core::{short_hex, Transaction, TxHash};

use crate::entry::MempoolEntry;
use crate::error::{TxPoolError, TxPoolResult};

/// Default maximum pool size (number of transactions).
pub const DEFAULT_MEMPOOL_SIZE: usize = 2048 * 16;

/// Result of submitting a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddTxOutcome {
    /// The transaction was new and is now pending.
    Added(TxHash),
    /// A transaction with this hash was already pending.
    AlreadyKnown(TxHash),
}

impl AddTxOutcome {
    /// Hash of the submitted transaction.
    pub fn hash(&self) -> TxHash {
        match self {
            AddTxOutcome::Added(h) | AddTxOutcome::AlreadyKnown(h) => *h,
        }
    }

    /// Whether the transaction was newly added.
    pub fn is_added(&self) -> bool {
        matches!(self, AddTxOutcome::Added(_))
    }
}

/// Pending transactions, shared by every peer session.
pub trait TxPool: Send + Sync {
    /// Look up a pending transaction by hash.
    fn try_get_pending(&self, hash: &TxHash) -> Option<Transaction>;

    /// Check whether a transaction is pending.
    fn contains(&self, hash: &TxHash) -> bool;

    /// Add a transaction unless one with the same hash is already pending.
    fn submit(&self, tx: Transaction) -> TxPoolResult<AddTxOutcome>;

    /// Remove a pending transaction.
    fn remove(&self, hash: &TxHash) -> Option<Transaction>;

    /// Number of pending transactions.
    fn len(&self) -> usize;

    /// Whether the pool is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Concurrent in-memory transaction pool.
///
/// Entries live in a sharded map, so lookups and inserts from different
/// sessions only contend when they hit the same shard.
pub struct Mempool {
    /// All transactions by hash.
    txs: DashMap<TxHash, MempoolEntry>,

    /// Maximum number of transactions. Checked before insertion, so racing
    /// submitters can overshoot it by at most one entry each.
    max_size: usize,
}

impl Mempool {
    /// Create a new empty pool.
    pub fn new(max_size: usize) -> Self {
        Self {
            txs: DashMap::new(),
            max_size,
        }
    }

    /// Create a pool with default settings.
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_MEMPOOL_SIZE)
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl TxPool for Mempool {
    fn try_get_pending(&self, hash: &TxHash) -> Option<Transaction> {
        self.txs.get(hash).map(|entry| entry.value().tx.clone())
    }

    fn contains(&self, hash: &TxHash) -> bool {
        self.txs.contains_key(hash)
    }

    fn submit(&self, tx: Transaction) -> TxPoolResult<AddTxOutcome> {
        let hash = tx.hash();

        if self.txs.len() >= self.max_size && !self.txs.contains_key(&hash) {
            return Err(TxPoolError::PoolFull {
                capacity: self.max_size,
            });
        }

        match self.txs.entry(hash) {
            Entry::Occupied(_) => Ok(AddTxOutcome::AlreadyKnown(hash)),
            Entry::Vacant(slot) => {
                let entry = MempoolEntry::new(tx);
                tracing::trace!(tx = %short_hex(&hash), size = entry.size, "Added transaction to pool");
                slot.insert(entry);
                Ok(AddTxOutcome::Added(hash))
            }
        }
    }

    fn remove(&self, hash: &TxHash) -> Option<Transaction> {
        self.txs.remove(hash).map(|(_, entry)| entry.tx)
    }

    fn len(&self) -> usize {
        self.txs.len()
    }
}
