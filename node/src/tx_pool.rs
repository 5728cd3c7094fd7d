//! Pending and archived transactions.
//!
//! A transaction hash lives in at most one of the two maps. Admission only
//! ever targets `pending`, and only for hashes absent from both; archiving
//! moves entries out of `pending` and is the only way they leave it. An
//! archived hash therefore never becomes pending again.

use std::collections::HashMap;

use tally_types::{Block, Hash, SignedTx};

/// Result of [`TransactionPool::submit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Added(Hash),
    /// Already pending or archived; nothing changed.
    Duplicate(Hash),
}

impl SubmitOutcome {
    pub fn hash(&self) -> Hash {
        match self {
            Self::Added(h) | Self::Duplicate(h) => *h,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

#[derive(Debug, Default)]
pub struct TransactionPool {
    pending: HashMap<Hash, SignedTx>,
    archived: HashMap<Hash, SignedTx>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&mut self, tx: SignedTx) -> SubmitOutcome {
        let hash = tx.hash();
        if self.pending.contains_key(&hash) || self.archived.contains_key(&hash) {
            return SubmitOutcome::Duplicate(hash);
        }
        self.pending.insert(hash, tx);
        SubmitOutcome::Added(hash)
    }

    /// Every pending transaction, ordered by hash.
    pub fn snapshot_pending(&self) -> Vec<SignedTx> {
        let mut keyed: Vec<(&Hash, &SignedTx)> = self.pending.iter().collect();
        keyed.sort_by(|a, b| a.0.cmp(b.0));
        keyed.into_iter().map(|(_, tx)| tx.clone()).collect()
    }

    /// Record every transaction of an accepted block as archived.
    ///
    /// Pending entries move over; transactions this node never saw are
    /// archived directly. Returns how many entries left `pending`.
    pub fn archive(&mut self, block: &Block) -> usize {
        let mut moved = 0;
        for tx in &block.txs {
            let hash = tx.hash();
            match self.pending.remove(&hash) {
                Some(pending) => {
                    tracing::debug!(%hash, "archiving mined transaction");
                    self.archived.insert(hash, pending);
                    moved += 1;
                }
                None => {
                    self.archived.entry(hash).or_insert_with(|| tx.clone());
                }
            }
        }
        moved
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn archived_count(&self) -> usize {
        self.archived.len()
    }

    pub fn is_pending(&self, hash: &Hash) -> bool {
        self.pending.contains_key(hash)
    }

    pub fn is_archived(&self, hash: &Hash) -> bool {
        self.archived.contains_key(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_types::{Account, BlockHeader, Tx};

    fn tx(nonce: u64) -> SignedTx {
        SignedTx::new(
            Tx {
                from: Account::new([1; 20]),
                to: Account::new([2; 20]),
                value: 10,
                nonce,
                data: String::new(),
                time: 1,
            },
            "",
        )
    }

    fn block(txs: Vec<SignedTx>) -> Block {
        Block::new(
            BlockHeader {
                parent: Hash::ZERO,
                number: 0,
                nonce: 0,
                time: 0,
                miner: Account::ZERO,
            },
            txs,
        )
    }

    #[test]
    fn resubmission_is_a_duplicate() {
        let mut pool = TransactionPool::new();
        assert!(matches!(pool.submit(tx(1)), SubmitOutcome::Added(_)));
        assert!(pool.submit(tx(1)).is_duplicate());
        assert_eq!(pool.pending_count(), 1);
    }

    #[test]
    fn archive_moves_pending_and_records_unseen() {
        let mut pool = TransactionPool::new();
        let a = tx(1);
        let b = tx(2);
        let unseen = tx(3);
        pool.submit(a.clone());
        pool.submit(b.clone());

        assert_eq!(pool.archive(&block(vec![a.clone(), unseen.clone()])), 1);

        assert!(pool.is_archived(&a.hash()));
        assert!(!pool.is_pending(&a.hash()));
        assert!(pool.is_pending(&b.hash()));
        assert!(pool.is_archived(&unseen.hash()));
        assert_eq!(pool.archived_count(), 2);
    }

    #[test]
    fn archived_never_returns_to_pending() {
        let mut pool = TransactionPool::new();
        let a = tx(1);
        pool.archive(&block(vec![a.clone()]));
        assert!(pool.submit(a.clone()).is_duplicate());
        assert_eq!(pool.pending_count(), 0);
    }

    #[test]
    fn snapshot_is_sorted_by_hash() {
        let mut pool = TransactionPool::new();
        for nonce in 0..16 {
            pool.submit(tx(nonce));
        }
        let hashes: Vec<Hash> = pool.snapshot_pending().iter().map(SignedTx::hash).collect();
        let mut sorted = hashes.clone();
        sorted.sort();
        assert_eq!(hashes, sorted);
    }
}
