//! Mempool entry structure.

use keel_core::Transaction;

/// An entry in the mempool.
#[derive(Clone, Debug)]
pub struct MempoolEntry {
    /// The transaction.
    pub tx: Transaction,

    /// RLP size in bytes.
    pub size: usize,
}

impl MempoolEntry {
    /// Create a new entry for a transaction.
    pub fn new(tx: Transaction) -> Self {
        let size = tx.encoded_len();
        Self { tx, size }
    }
}
