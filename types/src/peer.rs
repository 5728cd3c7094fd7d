//! Peer identity.

use serde::{Deserialize, Serialize};
use std::hash::{Hash as StdHash, Hasher};

use crate::Account;

/// A remote node, identified solely by its `ip:port` address.
///
/// Two values with the same address are the same peer regardless of the other
/// fields; equality and hashing only look at `ip` and `port`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PeerNode {
    pub ip: String,
    pub port: u16,
    pub is_bootstrap: bool,
    /// Account credited when this peer mines a block.
    pub account: Account,
    /// Whether this node has completed a handshake with the peer. Local only.
    #[serde(skip)]
    pub connected: bool,
}

impl PeerNode {
    pub fn new(
        ip: impl Into<String>,
        port: u16,
        is_bootstrap: bool,
        account: Account,
        connected: bool,
    ) -> Self {
        Self {
            ip: ip.into(),
            port,
            is_bootstrap,
            account,
            connected,
        }
    }

    /// The registry key and HTTP authority: `ip:port`.
    pub fn tcp_address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    pub fn same_address(&self, other: &PeerNode) -> bool {
        self.ip == other.ip && self.port == other.port
    }
}

impl PartialEq for PeerNode {
    fn eq(&self, other: &Self) -> bool {
        self.same_address(other)
    }
}

impl Eq for PeerNode {}

impl StdHash for PeerNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ip.hash(state);
        self.port.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_the_address() {
        let a = PeerNode::new("127.0.0.1", 8080, true, Account::new([1; 20]), false);
        let b = PeerNode::new("127.0.0.1", 8080, false, Account::new([2; 20]), true);
        let c = PeerNode::new("127.0.0.1", 8081, true, Account::new([1; 20]), false);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.tcp_address(), "127.0.0.1:8080");
    }

    #[test]
    fn connected_flag_is_not_serialized() {
        let peer = PeerNode::new("10.0.0.1", 9000, false, Account::ZERO, true);
        let json = serde_json::to_value(&peer).unwrap();
        assert!(json.get("connected").is_none());
        let back: PeerNode = serde_json::from_value(json).unwrap();
        assert!(!back.connected);
    }
}
