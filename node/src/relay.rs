//! Forwards newly admitted transactions to connected peers.

use std::sync::Arc;

use tally_network::{Broadcaster, PeerClient};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{NodeState, PendingTx};

pub struct TxRelay<P> {
    state: Arc<NodeState>,
    broadcaster: Broadcaster<P>,
}

impl<P: PeerClient> TxRelay<P> {
    pub fn new(state: Arc<NodeState>, client: Arc<P>) -> Self {
        let broadcaster = Broadcaster::new(client, state.info.clone());
        Self { state, broadcaster }
    }

    pub async fn run(self, mut pending: mpsc::Receiver<PendingTx>, shutdown: CancellationToken) {
        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                next = pending.recv() => next,
            };
            let Some(PendingTx { tx, origin }) = next else {
                break;
            };

            let peers = self.state.peers.read().await.snapshot();
            let result = self
                .broadcaster
                .broadcast_tx(&tx, origin.as_ref(), &peers)
                .await;
            tracing::debug!(
                hash = %tx.hash(),
                sent = result.sent,
                failed = result.failed,
                "relayed transaction"
            );
        }
        tracing::info!("transaction relay shutting down");
    }
}
