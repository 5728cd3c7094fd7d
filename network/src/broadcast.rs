//! Flood propagation of newly admitted transactions.
//!
//! A transaction reaching the pending pool is pushed once to every connected
//! peer except the one it arrived from. Peers deduplicate by hash, so a
//! transaction echoing back through the flood stops at the first hop that
//! already holds it.

use std::sync::Arc;

use tally_types::{PeerNode, SignedTx};

use crate::PeerClient;

/// Outcome of a broadcast attempt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BroadcastResult {
    /// Peers that accepted the push (including those reporting a duplicate).
    pub sent: usize,
    /// Peers the push failed for.
    pub failed: usize,
}

pub struct Broadcaster<P> {
    client: Arc<P>,
    me: PeerNode,
}

impl<P: PeerClient> Broadcaster<P> {
    /// `me` is named as the origin on every push.
    pub fn new(client: Arc<P>, me: PeerNode) -> Self {
        Self { client, me }
    }

    /// Push `tx` to every connected peer in `peers` other than `origin`.
    pub async fn broadcast_tx(
        &self,
        tx: &SignedTx,
        origin: Option<&PeerNode>,
        peers: &[PeerNode],
    ) -> BroadcastResult {
        let mut result = BroadcastResult::default();

        let targets = peers.iter().filter(|p| {
            p.connected && !p.same_address(&self.me) && origin.map_or(true, |o| !p.same_address(o))
        });

        for peer in targets {
            match self.client.push_tx(peer, tx, &self.me).await {
                Ok(_) => result.sent += 1,
                Err(e) => {
                    tracing::debug!(peer = %peer.tcp_address(), error = %e, "tx push failed");
                    result.failed += 1;
                }
            }
        }

        result
    }
}
