//! Runtime state shared by the mining engine, the sync loop, the relay and
//! the transport handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tally_ledger::{Ledger, LedgerError};
use tally_types::{Block, Hash, PeerNode, SignedTx};
use tokio::sync::{mpsc, Mutex, RwLock};

use crate::{NodeMetrics, PeerRegistry, TransactionPool};

/// Capacity of the "new pending transaction" channel.
pub const PENDING_TX_CHANNEL_CAPACITY: usize = 10_000;

/// A transaction just admitted into the pool, awaiting propagation.
#[derive(Clone, Debug)]
pub struct PendingTx {
    pub tx: SignedTx,
    /// The peer that relayed it, `None` when submitted locally.
    pub origin: Option<PeerNode>,
}

pub struct NodeState {
    pub info: PeerNode,
    pub ledger: Arc<dyn Ledger>,
    pub pool: Mutex<TransactionPool>,
    pub peers: RwLock<PeerRegistry>,
    pub metrics: Arc<NodeMetrics>,
    is_mining: AtomicBool,
    synced_blocks: mpsc::Sender<Block>,
    pending_txs: mpsc::Sender<PendingTx>,
}

/// Receiving halves of the node's internal channels.
pub struct NodeChannels {
    pub synced_blocks: mpsc::Receiver<Block>,
    pub pending_txs: mpsc::Receiver<PendingTx>,
}

impl NodeState {
    pub fn new(
        info: PeerNode,
        ledger: Arc<dyn Ledger>,
        peers: PeerRegistry,
        metrics: Arc<NodeMetrics>,
    ) -> (Self, NodeChannels) {
        let (synced_tx, synced_rx) = mpsc::channel(1);
        let (pending_tx, pending_rx) = mpsc::channel(PENDING_TX_CHANNEL_CAPACITY);
        metrics.set_head(ledger.head_number());

        let state = Self {
            info,
            peers: RwLock::new(peers),
            ledger,
            pool: Mutex::new(TransactionPool::new()),
            metrics,
            is_mining: AtomicBool::new(false),
            synced_blocks: synced_tx,
            pending_txs: pending_tx,
        };
        let channels = NodeChannels {
            synced_blocks: synced_rx,
            pending_txs: pending_rx,
        };
        (state, channels)
    }

    pub fn is_mining(&self) -> bool {
        self.is_mining.load(Ordering::Acquire)
    }

    /// Idle → Mining. Returns `false` if an attempt is already running.
    pub(crate) fn begin_mining(&self) -> bool {
        self.is_mining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn end_mining(&self) {
        self.is_mining.store(false, Ordering::Release);
    }

    /// Append `block` to the ledger and archive its transactions, both under
    /// the pool lock. Nothing is archived when the append fails.
    ///
    /// The append writes and syncs the block log, so it runs on the blocking
    /// pool. Pool users wait for it; the runtime's workers do not.
    pub async fn accept_block(&self, block: &Block) -> Result<Hash, LedgerError> {
        let mut pool = self.pool.lock().await;
        let ledger = Arc::clone(&self.ledger);
        let owned = block.clone();
        let hash = tokio::task::spawn_blocking(move || ledger.append(&owned))
            .await
            .map_err(|e| LedgerError::Io(std::io::Error::other(e)))??;
        pool.archive(block);

        self.metrics.pending_transactions.set(pool.pending_count() as i64);
        self.metrics.set_head(Some(block.number()));
        Ok(hash)
    }

    /// Tell the mining engine a block arrived from outside.
    ///
    /// The slot holds one event; if it is already full a preemption is
    /// queued and this one is dropped.
    pub(crate) fn notify_synced(&self, block: Block) {
        if self.synced_blocks.try_send(block).is_err() {
            tracing::trace!("synced-block slot full, preemption already queued");
        }
    }

    pub(crate) fn announce_pending(&self, pending: PendingTx) {
        if let Err(e) = self.pending_txs.try_send(pending) {
            tracing::warn!(error = %e, "pending-tx channel full, transaction will not be relayed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::mpsc as std_mpsc;
    use std::time::Duration;

    use tally_nullables::NullLedger;
    use tally_types::{Account, CandidateBlock, Tx};

    /// A ledger whose appends wait until the test releases them.
    struct GatedLedger {
        inner: NullLedger,
        gate: std::sync::Mutex<std_mpsc::Receiver<()>>,
    }

    impl Ledger for GatedLedger {
        fn head_hash(&self) -> Hash {
            self.inner.head_hash()
        }

        fn head_number(&self) -> Option<u64> {
            self.inner.head_number()
        }

        fn append(&self, block: &Block) -> Result<Hash, LedgerError> {
            self.gate.lock().unwrap().recv().unwrap();
            self.inner.append(block)
        }

        fn blocks_from(&self, from: u64) -> Result<Vec<Block>, LedgerError> {
            self.inner.blocks_from(from)
        }

        fn select_applicable(&self, txs: Vec<SignedTx>) -> Vec<SignedTx> {
            self.inner.select_applicable(txs)
        }

        fn balances(&self) -> BTreeMap<Account, u64> {
            self.inner.balances()
        }

        fn close(&self) -> Result<(), LedgerError> {
            self.inner.close()
        }
    }

    fn me() -> PeerNode {
        PeerNode::new("127.0.0.1", 8080, true, Account::ZERO, true)
    }

    fn state(ledger: Arc<dyn Ledger>) -> Arc<NodeState> {
        let metrics = Arc::new(NodeMetrics::new().unwrap());
        let (state, _channels) = NodeState::new(me(), ledger, PeerRegistry::new(me()), metrics);
        Arc::new(state)
    }

    fn tx() -> SignedTx {
        SignedTx::new(Tx::new(Account::new([1; 20]), Account::new([2; 20]), 1, 1, ""), "")
    }

    // Single-threaded runtime: if the append ran on the worker, nothing below
    // the spawn could run until the gate opened.
    #[tokio::test]
    async fn slow_append_leaves_the_runtime_free() {
        let (release, gate) = std_mpsc::channel();
        let ledger = Arc::new(GatedLedger {
            inner: NullLedger::new(),
            gate: std::sync::Mutex::new(gate),
        });
        let state = state(ledger.clone());
        state.pool.lock().await.submit(tx());

        let block = CandidateBlock::new(Hash::ZERO, 0, Account::ZERO, vec![tx()]).with_nonce(0, 0);
        let accepting = tokio::spawn({
            let state = Arc::clone(&state);
            let block = block.clone();
            async move { state.accept_block(&block).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!accepting.is_finished());
        assert_eq!(state.ledger.head_number(), None);

        release.send(()).unwrap();
        let hash = accepting.await.unwrap().unwrap();
        assert_eq!(hash, block.hash());
        assert_eq!(ledger.head_hash(), block.hash());

        let pool = state.pool.lock().await;
        assert_eq!(pool.pending_count(), 0);
        assert!(pool.is_archived(&tx().hash()));
    }

    #[tokio::test]
    async fn failed_append_archives_nothing() {
        let state = state(Arc::new(NullLedger::new()));
        state.pool.lock().await.submit(tx());

        let wrong_number =
            CandidateBlock::new(Hash::ZERO, 5, Account::ZERO, vec![tx()]).with_nonce(0, 0);
        assert!(matches!(
            state.accept_block(&wrong_number).await,
            Err(LedgerError::NumberMismatch { .. })
        ));

        let pool = state.pool.lock().await;
        assert!(pool.is_pending(&tx().hash()));
        assert_eq!(pool.archived_count(), 0);
    }
}
