//! Periodic pull-based synchronization with known peers.

use std::sync::Arc;
use std::time::Duration;

use tally_network::PeerClient;
use tally_types::{Block, PeerNode};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::NodeState;

/// What one sync round achieved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Blocks appended from peers.
    pub blocks: usize,
    /// Peers newly added to the registry.
    pub discovered: usize,
    /// Peers whose status query failed.
    pub unreachable: usize,
}

pub struct SyncLoop<P> {
    state: Arc<NodeState>,
    client: Arc<P>,
    interval: Duration,
}

impl<P: PeerClient> SyncLoop<P> {
    pub fn new(state: Arc<NodeState>, client: Arc<P>, interval: Duration) -> Self {
        Self {
            state,
            client,
            interval,
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                report = self.sync_once() => {
                    if report.blocks > 0 || report.discovered > 0 {
                        tracing::debug!(?report, "sync round finished");
                    }
                }
            }
        }
        tracing::info!("sync loop shutting down");
    }

    /// Poll every known peer once.
    pub async fn sync_once(&self) -> SyncReport {
        let peers = self.state.peers.read().await.snapshot();
        let mut report = SyncReport::default();
        for peer in &peers {
            self.sync_peer(peer, &mut report).await;
        }
        report
    }

    async fn sync_peer(&self, peer: &PeerNode, report: &mut SyncReport) {
        if !peer.connected {
            self.join(peer).await;
        }

        let status = match self.client.status(peer).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(peer = %peer.tcp_address(), error = %e, "peer status failed");
                self.state.peers.write().await.set_connected(peer, false);
                report.unreachable += 1;
                return;
            }
        };

        let local_next = self.state.ledger.next_number();
        if status.next_number() > local_next {
            match self.client.sync_blocks(peer, local_next).await {
                Ok(blocks) => report.blocks += self.accept_blocks(peer, blocks).await,
                Err(e) => {
                    tracing::warn!(peer = %peer.tcp_address(), from = local_next, error = %e, "block fetch failed");
                }
            }
        }

        report.discovered += self.merge_peers(status.known_peers.into_values()).await;
    }

    /// Register this node with `peer`.
    async fn join(&self, peer: &PeerNode) {
        match self.client.handshake(peer, &self.state.info).await {
            Ok(()) => {
                tracing::info!(peer = %peer.tcp_address(), "connected to peer");
                self.state.peers.write().await.set_connected(peer, true);
            }
            Err(e) => {
                tracing::debug!(peer = %peer.tcp_address(), error = %e, "handshake failed");
            }
        }
    }

    /// Append blocks in order, stopping at the first one the ledger rejects.
    async fn accept_blocks(&self, peer: &PeerNode, blocks: Vec<Block>) -> usize {
        let mut accepted = 0;
        for block in blocks {
            match self.state.accept_block(&block).await {
                Ok(hash) => {
                    tracing::info!(
                        peer = %peer.tcp_address(),
                        number = block.number(),
                        %hash,
                        "accepted block from peer"
                    );
                    self.state.metrics.blocks_synced.inc();
                    self.state.notify_synced(block);
                    accepted += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        peer = %peer.tcp_address(),
                        number = block.number(),
                        error = %e,
                        "dropping block from peer"
                    );
                    break;
                }
            }
        }
        accepted
    }

    async fn merge_peers(&self, reported: impl Iterator<Item = PeerNode>) -> usize {
        let mut registry = self.state.peers.write().await;
        let mut discovered = 0;
        for mut peer in reported {
            if registry.is_known(&peer) {
                continue;
            }
            peer.connected = false;
            tracing::info!(peer = %peer.tcp_address(), "discovered peer");
            if registry.add(peer) {
                discovered += 1;
            }
        }
        self.state.metrics.known_peers.set(registry.len() as i64);
        discovered
    }
}
