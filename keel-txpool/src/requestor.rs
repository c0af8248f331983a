//! Pooled transaction requestor.
//!
//! When a peer announces transaction hashes, only hashes that are neither
//! pending locally nor already requested from some peer get requested.
//! The pending-request set is shared by all sessions.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use keel_core::TxHash;

use crate::pool::TxPool;

/// Default maximum number of hashes per outbound request.
pub const DEFAULT_MAX_HASHES_PER_REQUEST: usize = 256;

/// Default time after which an unanswered request may be reissued.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Default bound on outstanding requested hashes.
pub const DEFAULT_MAX_PENDING_REQUESTS: usize = 32 * 1024;

/// Requests announced transactions that are not known locally.
pub trait PooledTxsRequestor: Send + Sync {
    /// Request the subset of `hashes` that is neither pending nor already
    /// requested. `send` is called once per outbound request batch.
    fn request_unknown(&self, hashes: &[TxHash], send: &mut dyn FnMut(Vec<TxHash>));

    /// Release the request claim for a delivered transaction.
    fn on_delivered(&self, hash: &TxHash);

    /// Release claims for hashes whose request was never sent.
    fn release(&self, hashes: &[TxHash]) {
        for hash in hashes {
            self.on_delivered(hash);
        }
    }
}

/// Requestor configuration.
#[derive(Debug, Clone)]
pub struct RequestorConfig {
    /// Maximum hashes in a single request.
    pub max_hashes_per_request: usize,
    /// Age after which a claim no longer blocks re-requesting.
    pub request_timeout: Duration,
    /// Maximum outstanding claims.
    pub max_pending: usize,
}

impl Default for RequestorConfig {
    fn default() -> Self {
        Self {
            max_hashes_per_request: DEFAULT_MAX_HASHES_PER_REQUEST,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_pending: DEFAULT_MAX_PENDING_REQUESTS,
        }
    }
}

/// Default [`PooledTxsRequestor`] backed by a concurrent claim set.
pub struct TxRequestor {
    /// Pool consulted for hashes that are already known.
    pool: Arc<dyn TxPool>,
    /// Requested hashes and when they were claimed.
    pending: DashMap<TxHash, Instant>,
    /// Configuration.
    config: RequestorConfig,
}

impl TxRequestor {
    /// Create a requestor over the given pool.
    pub fn new(pool: Arc<dyn TxPool>, config: RequestorConfig) -> Self {
        Self {
            pool,
            pending: DashMap::new(),
            config,
        }
    }

    /// Create a requestor with default settings.
    pub fn with_defaults(pool: Arc<dyn TxPool>) -> Self {
        Self::new(pool, RequestorConfig::default())
    }

    /// Number of outstanding claims.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check whether a hash is currently claimed.
    pub fn is_pending(&self, hash: &TxHash) -> bool {
        self.pending.contains_key(hash)
    }

    /// Claim a hash for requesting. Returns false if another claim is live
    /// or the claim set is full.
    fn try_claim(&self, hash: TxHash, now: Instant) -> bool {
        if self.pending.len() >= self.config.max_pending {
            self.prune_expired(now);
            if self.pending.len() >= self.config.max_pending {
                return false;
            }
        }

        match self.pending.entry(hash) {
            Entry::Occupied(mut claim) => {
                if now.saturating_duration_since(*claim.get()) >= self.config.request_timeout {
                    claim.insert(now);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
        }
    }

    fn prune_expired(&self, now: Instant) {
        let timeout = self.config.request_timeout;
        self.pending
            .retain(|_, claimed_at| now.saturating_duration_since(*claimed_at) < timeout);
    }
}

impl PooledTxsRequestor for TxRequestor {
    fn request_unknown(&self, hashes: &[TxHash], send: &mut dyn FnMut(Vec<TxHash>)) {
        let max = self.config.max_hashes_per_request.max(1);
        let now = Instant::now();
        let mut batch = Vec::with_capacity(hashes.len().min(max));
        let mut skipped = 0usize;

        for hash in hashes {
            if self.pool.contains(hash) || !self.try_claim(*hash, now) {
                skipped += 1;
                continue;
            }

            batch.push(*hash);
            if batch.len() == max {
                send(std::mem::replace(&mut batch, Vec::with_capacity(max)));
            }
        }

        if !batch.is_empty() {
            send(batch);
        }

        if skipped > 0 {
            tracing::trace!(
                announced = hashes.len(),
                skipped,
                "Skipped known or already requested transactions"
            );
        }
    }

    fn on_delivered(&self, hash: &TxHash) {
        self.pending.remove(hash);
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use keel_core::Transaction;

    use super::*;
    use crate::pool::Mempool;

    fn hash(n: u16) -> TxHash {
        let mut h = [0u8; 32];
        h[..2].copy_from_slice(&n.to_be_bytes());
        h
    }

    fn collect(requestor: &TxRequestor, hashes: &[TxHash]) -> Vec<Vec<TxHash>> {
        let mut sent = Vec::new();
        requestor.request_unknown(hashes, &mut |batch| sent.push(batch));
        sent
    }

    fn requestor_with(config: RequestorConfig) -> (Arc<Mempool>, TxRequestor) {
        let pool = Arc::new(Mempool::with_defaults());
        let requestor = TxRequestor::new(pool.clone(), config);
        (pool, requestor)
    }

    #[test]
    fn test_requests_unknown_once() {
        let (_, requestor) = requestor_with(RequestorConfig::default());
        let hashes = vec![hash(1), hash(2), hash(3)];

        assert_eq!(collect(&requestor, &hashes), vec![hashes.clone()]);
        // Same announcement from another peer requests nothing.
        assert!(collect(&requestor, &hashes).is_empty());
        assert_eq!(requestor.pending_count(), 3);
    }

    #[test]
    fn test_skips_pooled_transactions() {
        let (pool, requestor) = requestor_with(RequestorConfig::default());
        let tx = Transaction {
            nonce: 4,
            to: Bytes::from(vec![1; 20]),
            ..Default::default()
        };
        let known = pool.submit(tx).unwrap().hash();

        let sent = collect(&requestor, &[known, hash(9)]);
        assert_eq!(sent, vec![vec![hash(9)]]);
        assert!(!requestor.is_pending(&known));
    }

    #[test]
    fn test_duplicates_within_announcement() {
        let (_, requestor) = requestor_with(RequestorConfig::default());
        let sent = collect(&requestor, &[hash(1), hash(1), hash(2)]);
        assert_eq!(sent, vec![vec![hash(1), hash(2)]]);
    }

    #[test]
    fn test_chunks_requests() {
        let (_, requestor) = requestor_with(RequestorConfig {
            max_hashes_per_request: 2,
            ..Default::default()
        });
        let hashes: Vec<_> = (0..5).map(hash).collect();

        let sizes: Vec<_> = collect(&requestor, &hashes).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn test_empty_announcement_sends_nothing() {
        let (_, requestor) = requestor_with(RequestorConfig::default());
        assert!(collect(&requestor, &[]).is_empty());
    }

    #[test]
    fn test_delivery_releases_claim() {
        let (_, requestor) = requestor_with(RequestorConfig::default());
        collect(&requestor, &[hash(7)]);
        assert!(requestor.is_pending(&hash(7)));

        requestor.on_delivered(&hash(7));
        assert!(!requestor.is_pending(&hash(7)));
        assert_eq!(collect(&requestor, &[hash(7)]), vec![vec![hash(7)]]);
    }

    #[test]
    fn test_release_unsent_claims() {
        let (_, requestor) = requestor_with(RequestorConfig::default());
        let hashes = vec![hash(1), hash(2)];
        collect(&requestor, &hashes);

        requestor.release(&hashes);
        assert_eq!(requestor.pending_count(), 0);
        assert_eq!(collect(&requestor, &hashes), vec![hashes.clone()]);
    }

    #[test]
    fn test_expired_claim_can_be_reissued() {
        let (_, requestor) = requestor_with(RequestorConfig {
            request_timeout: Duration::ZERO,
            ..Default::default()
        });
        collect(&requestor, &[hash(1)]);
        assert_eq!(collect(&requestor, &[hash(1)]), vec![vec![hash(1)]]);
    }

    #[test]
    fn test_pending_set_is_bounded() {
        let (_, requestor) = requestor_with(RequestorConfig {
            max_pending: 2,
            ..Default::default()
        });
        let sent = collect(&requestor, &[hash(1), hash(2), hash(3)]);
        assert_eq!(sent, vec![vec![hash(1), hash(2)]]);
        assert_eq!(requestor.pending_count(), 2);
    }
}
