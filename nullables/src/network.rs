//! Nullable peer network: scripted peers, recorded calls.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tally_network::{NetworkError, PeerClient, StatusResponse, TxAddResponse};
use tally_types::{Account, Block, Hash, PeerNode, SignedTx};

#[derive(Clone, Default)]
struct ScriptedPeer {
    account: Account,
    chain: Vec<Block>,
    known_peers: Vec<PeerNode>,
    down: bool,
    reject_handshake: bool,
}

#[derive(Default)]
struct State {
    peers: HashMap<String, ScriptedPeer>,
    handshakes: Vec<(String, PeerNode)>,
    pushed: Vec<(String, Hash)>,
    sync_requests: Vec<(String, u64)>,
}

/// A [`PeerClient`] whose peers are in-memory scripts.
///
/// Addresses that were never scripted behave like unreachable hosts.
#[derive(Default)]
pub struct NullPeerClient {
    state: Mutex<State>,
}

impl NullPeerClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `peer` reachable, reporting an empty chain.
    pub fn add_peer(&self, peer: &PeerNode) {
        self.lock()
            .peers
            .entry(peer.tcp_address())
            .or_insert_with(|| ScriptedPeer {
                account: peer.account,
                ..ScriptedPeer::default()
            });
    }

    /// Replace the chain `peer` reports and serves.
    pub fn set_chain(&self, peer: &PeerNode, chain: Vec<Block>) {
        self.add_peer(peer);
        if let Some(p) = self.lock().peers.get_mut(&peer.tcp_address()) {
            p.chain = chain;
        }
    }

    /// Append one block to the chain `peer` serves.
    pub fn push_block(&self, peer: &PeerNode, block: Block) {
        self.add_peer(peer);
        if let Some(p) = self.lock().peers.get_mut(&peer.tcp_address()) {
            p.chain.push(block);
        }
    }

    /// Replace the peer list `peer` reports in its status.
    pub fn set_known_peers(&self, peer: &PeerNode, known: Vec<PeerNode>) {
        self.add_peer(peer);
        if let Some(p) = self.lock().peers.get_mut(&peer.tcp_address()) {
            p.known_peers = known;
        }
    }

    /// Take `peer` offline (`true`) or bring it back (`false`).
    pub fn set_down(&self, peer: &PeerNode, down: bool) {
        self.add_peer(peer);
        if let Some(p) = self.lock().peers.get_mut(&peer.tcp_address()) {
            p.down = down;
        }
    }

    pub fn reject_handshakes(&self, peer: &PeerNode) {
        self.add_peer(peer);
        if let Some(p) = self.lock().peers.get_mut(&peer.tcp_address()) {
            p.reject_handshake = true;
        }
    }

    /// `(peer address, announced self)` for every accepted handshake.
    pub fn handshakes(&self) -> Vec<(String, PeerNode)> {
        self.lock().handshakes.clone()
    }

    /// `(peer address, tx hash)` for every accepted transaction push.
    pub fn pushed(&self) -> Vec<(String, Hash)> {
        self.lock().pushed.clone()
    }

    /// `(peer address, fromBlock)` for every block request.
    pub fn sync_requests(&self) -> Vec<(String, u64)> {
        self.lock().sync_requests.clone()
    }

    fn reachable(&self, peer: &PeerNode) -> Result<ScriptedPeer, NetworkError> {
        match self.lock().peers.get(&peer.tcp_address()) {
            Some(p) if !p.down => Ok(p.clone()),
            _ => Err(NetworkError::Transport {
                peer: peer.tcp_address(),
                reason: "connection refused".into(),
            }),
        }
    }
}

impl PeerClient for NullPeerClient {
    async fn status(&self, peer: &PeerNode) -> Result<StatusResponse, NetworkError> {
        let scripted = self.reachable(peer)?;
        let head = scripted.chain.last();
        Ok(StatusResponse {
            block_hash: head.map(Block::hash).unwrap_or(Hash::ZERO),
            block_number: head.map(Block::number),
            known_peers: scripted
                .known_peers
                .into_iter()
                .map(|p| (p.tcp_address(), p))
                .collect::<BTreeMap<_, _>>(),
            account: scripted.account,
            pending_count: 0,
        })
    }

    async fn sync_blocks(&self, peer: &PeerNode, from: u64) -> Result<Vec<Block>, NetworkError> {
        let scripted = self.reachable(peer)?;
        self.lock().sync_requests.push((peer.tcp_address(), from));
        Ok(scripted
            .chain
            .into_iter()
            .filter(|b| b.number() >= from)
            .collect())
    }

    async fn handshake(&self, peer: &PeerNode, me: &PeerNode) -> Result<(), NetworkError> {
        let scripted = self.reachable(peer)?;
        if scripted.reject_handshake {
            return Err(NetworkError::HandshakeRejected {
                peer: peer.tcp_address(),
                reason: "rejected by script".into(),
            });
        }
        self.lock().handshakes.push((peer.tcp_address(), me.clone()));
        Ok(())
    }

    async fn push_tx(
        &self,
        peer: &PeerNode,
        tx: &SignedTx,
        _origin: &PeerNode,
    ) -> Result<TxAddResponse, NetworkError> {
        self.reachable(peer)?;
        let hash = tx.hash();
        self.lock().pushed.push((peer.tcp_address(), hash));
        Ok(TxAddResponse {
            hash,
            duplicate: false,
        })
    }
}
