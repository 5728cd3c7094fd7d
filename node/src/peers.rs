//! Registry of known remote nodes, keyed by `ip:port`.

use std::collections::BTreeMap;

use tally_types::PeerNode;

/// Known peers, excluding this node.
///
/// The local node is recognized by comparing against its own info, never by
/// membership in the map, so it cannot end up registered as its own peer.
#[derive(Debug)]
pub struct PeerRegistry {
    me: PeerNode,
    peers: BTreeMap<String, PeerNode>,
}

impl PeerRegistry {
    pub fn new(me: PeerNode) -> Self {
        Self {
            me,
            peers: BTreeMap::new(),
        }
    }

    /// Upsert by address; the latest value wins. Returns `false` and leaves
    /// the registry untouched when `peer` is this node.
    pub fn add(&mut self, peer: PeerNode) -> bool {
        if peer.same_address(&self.me) {
            return false;
        }
        self.peers.insert(peer.tcp_address(), peer);
        true
    }

    pub fn remove(&mut self, peer: &PeerNode) -> Option<PeerNode> {
        self.peers.remove(&peer.tcp_address())
    }

    pub fn is_known(&self, peer: &PeerNode) -> bool {
        peer.same_address(&self.me) || self.peers.contains_key(&peer.tcp_address())
    }

    /// Flip the transient `connected` flag of a registered peer.
    pub fn set_connected(&mut self, peer: &PeerNode, connected: bool) {
        if let Some(p) = self.peers.get_mut(&peer.tcp_address()) {
            p.connected = connected;
        }
    }

    pub fn snapshot(&self) -> Vec<PeerNode> {
        self.peers.values().cloned().collect()
    }

    /// Known peers by address, as reported in status responses.
    pub fn to_map(&self) -> BTreeMap<String, PeerNode> {
        self.peers.clone()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
