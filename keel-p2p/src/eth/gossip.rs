//! Transaction gossip batching.
//!
//! Pure helpers that bound what a single wire message may carry:
//! - hash announcements by count
//! - pooled responses by count
//! - full-body broadcasts by encoded size

use std::collections::HashSet;

use keel_core::{Transaction, TxHash};
use keel_txpool::TxPool;

/// Split hashes into announcement batches of at most `max` hashes.
///
/// Duplicates are dropped, keeping the first occurrence.
pub fn announce_batches(hashes: &[TxHash], max: usize) -> Vec<Vec<TxHash>> {
    let max = max.max(1);
    let mut seen = HashSet::with_capacity(hashes.len());
    let mut batches = Vec::with_capacity(hashes.len().div_ceil(max));
    let mut batch = Vec::with_capacity(hashes.len().min(max));

    for hash in hashes {
        if !seen.insert(*hash) {
            continue;
        }
        batch.push(*hash);
        if batch.len() == max {
            batches.push(std::mem::replace(&mut batch, Vec::with_capacity(max)));
        }
    }

    if !batch.is_empty() {
        batches.push(batch);
    }
    batches
}

/// Collect requested transactions from the pool.
///
/// Hashes are looked up in request order. Misses are skipped and lookup
/// stops once `cap` transactions have been found.
pub fn fulfill_request(pool: &dyn TxPool, hashes: &[TxHash], cap: usize) -> Vec<Transaction> {
    hashes
        .iter()
        .filter_map(|hash| pool.try_get_pending(hash))
        .take(cap)
        .collect()
}

/// Split transactions into batches whose summed encoded size stays within
/// `max_bytes`. A transaction larger than `max_bytes` goes out alone.
pub fn transaction_batches(txs: &[Transaction], max_bytes: usize) -> Vec<Vec<Transaction>> {
    let mut batches = Vec::new();
    let mut batch = Vec::new();
    let mut batch_bytes = 0usize;

    for tx in txs {
        let size = tx.encoded_len();
        if !batch.is_empty() && batch_bytes + size > max_bytes {
            batches.push(std::mem::take(&mut batch));
            batch_bytes = 0;
        }
        batch.push(tx.clone());
        batch_bytes += size;
    }

    if !batch.is_empty() {
        batches.push(batch);
    }
    batches
}
