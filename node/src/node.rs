//! The tally node: wires the pool, the registry, the mining engine, the sync
//! loop and the transaction relay together.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tally_ledger::Ledger;
use tally_network::PeerClient;
use tally_types::{Account, Block, Hash, PeerNode, SignedTx};
use tally_work::Sealer;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    MiningEngine, NodeChannels, NodeConfig, NodeError, NodeMetrics, NodeState, PeerRegistry,
    PendingTx, SubmitOutcome, SyncLoop, SyncReport, TxRelay,
};

/// Timeout for waiting on background tasks during shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// A tally node.
///
/// Cheap handles to the node are obtained by wrapping it in an `Arc`; every
/// operation takes `&self`.
pub struct Node<P> {
    config: NodeConfig,
    state: Arc<NodeState>,
    client: Arc<P>,
    sealer: Arc<dyn Sealer>,
    /// Taken by the first call to [`run`](Self::run).
    channels: Mutex<Option<NodeChannels>>,
}

impl<P: PeerClient> Node<P> {
    /// Build a node over an already opened ledger.
    ///
    /// The configured bootstrap node is registered as a peer unless it is
    /// this node.
    pub fn new(
        config: NodeConfig,
        ledger: Arc<dyn Ledger>,
        client: Arc<P>,
        sealer: Arc<dyn Sealer>,
    ) -> Result<Self, NodeError> {
        let metrics = Arc::new(NodeMetrics::new()?);

        let mut peers = PeerRegistry::new(config.self_peer());
        if !config.is_bootstrap() {
            peers.add(config.bootstrap_peer());
        }
        metrics.known_peers.set(peers.len() as i64);

        let (state, channels) = NodeState::new(config.self_peer(), ledger, peers, metrics);
        let node = Self {
            state: Arc::new(state),
            client,
            sealer,
            channels: Mutex::new(Some(channels)),
            config,
        };

        Ok(node)
    }

    /// Run the mining engine, the sync loop and the relay until `shutdown`
    /// is cancelled, then close the ledger.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), NodeError> {
        let channels = self
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(NodeError::AlreadyRunning)?;

        tracing::info!(
            address = %self.state.info.tcp_address(),
            account = %self.state.info.account,
            head = %self.state.ledger.head_hash(),
            height = ?self.state.ledger.head_number(),
            "tally node starting"
        );

        let miner = MiningEngine::new(
            Arc::clone(&self.state),
            Arc::clone(&self.sealer),
            self.config.mining_interval(),
        );
        let sync = SyncLoop::new(
            Arc::clone(&self.state),
            Arc::clone(&self.client),
            self.config.sync_interval(),
        );
        let relay = TxRelay::new(Arc::clone(&self.state), Arc::clone(&self.client));

        let handles: Vec<(&str, JoinHandle<()>)> = vec![
            (
                "mining engine",
                tokio::spawn(miner.run(channels.synced_blocks, shutdown.child_token())),
            ),
            ("sync loop", tokio::spawn(sync.run(shutdown.child_token()))),
            (
                "transaction relay",
                tokio::spawn(relay.run(channels.pending_txs, shutdown.child_token())),
            ),
        ];

        shutdown.cancelled().await;
        tracing::info!("tally node stopping");

        for (name, handle) in handles {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(task = name, error = %e, "task panicked"),
                Err(_) => tracing::warn!(task = name, "task did not stop in time"),
            }
        }

        self.state.ledger.close()?;
        tracing::info!("tally node stopped");
        Ok(())
    }

    /// Admit `tx` into the pending pool. Re-submitting a pending or archived
    /// transaction is a no-op reported as [`SubmitOutcome::Duplicate`].
    pub async fn submit_transaction(
        &self,
        tx: SignedTx,
        origin: Option<PeerNode>,
    ) -> SubmitOutcome {
        let outcome = {
            let mut pool = self.state.pool.lock().await;
            let outcome = pool.submit(tx.clone());
            self.state
                .metrics
                .pending_transactions
                .set(pool.pending_count() as i64);
            outcome
        };

        if let SubmitOutcome::Added(hash) = outcome {
            let from = origin
                .as_ref()
                .map_or_else(|| "local".to_string(), PeerNode::tcp_address);
            tracing::info!(%hash, %from, "added pending transaction");
            self.state.metrics.transactions_admitted.inc();
            self.state.announce_pending(PendingTx { tx, origin });
        }
        outcome
    }

    /// Upsert `peer` by address.
    pub async fn register_peer(&self, peer: PeerNode) -> Result<(), NodeError> {
        let mut registry = self.state.peers.write().await;
        let address = peer.tcp_address();
        if !registry.add(peer) {
            return Err(NodeError::SelfPeer(address));
        }
        tracing::info!(peer = %address, "registered peer");
        self.state.metrics.known_peers.set(registry.len() as i64);
        Ok(())
    }

    pub async fn unregister_peer(&self, peer: &PeerNode) {
        let mut registry = self.state.peers.write().await;
        if registry.remove(peer).is_some() {
            tracing::info!(peer = %peer.tcp_address(), "removed peer");
        }
        self.state.metrics.known_peers.set(registry.len() as i64);
    }

    pub async fn is_known_peer(&self, peer: &PeerNode) -> bool {
        self.state.peers.read().await.is_known(peer)
    }

    pub async fn known_peers(&self) -> BTreeMap<String, PeerNode> {
        self.state.peers.read().await.to_map()
    }

    pub async fn pending_count(&self) -> usize {
        self.state.pool.lock().await.pending_count()
    }

    pub async fn pending_transactions(&self) -> Vec<SignedTx> {
        self.state.pool.lock().await.snapshot_pending()
    }

    pub async fn is_archived(&self, hash: &Hash) -> bool {
        self.state.pool.lock().await.is_archived(hash)
    }

    pub fn head_hash(&self) -> Hash {
        self.state.ledger.head_hash()
    }

    pub fn head_number(&self) -> Option<u64> {
        self.state.ledger.head_number()
    }

    /// Blocks from `from` (inclusive) to the head; empty past the head.
    pub fn blocks_from(&self, from: u64) -> Result<Vec<Block>, NodeError> {
        Ok(self.state.ledger.blocks_from(from)?)
    }

    pub fn balances(&self) -> BTreeMap<Account, u64> {
        self.state.ledger.balances()
    }

    pub fn account(&self) -> Account {
        self.state.info.account
    }

    /// This node as peers see it.
    pub fn info(&self) -> &PeerNode {
        &self.state.info
    }

    pub fn is_mining(&self) -> bool {
        self.state.is_mining()
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn metrics(&self) -> &NodeMetrics {
        &self.state.metrics
    }

    /// Run one sync round now, outside the periodic loop.
    pub async fn sync_now(&self) -> SyncReport {
        SyncLoop::new(
            Arc::clone(&self.state),
            Arc::clone(&self.client),
            self.config.sync_interval(),
        )
        .sync_once()
        .await
    }
}
