//! Request and response bodies for the node's HTTP endpoints.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use tally_types::{Account, Block, Hash, PeerNode, SignedTx};

pub const ENDPOINT_STATUS: &str = "/node/status";
pub const ENDPOINT_SYNC: &str = "/node/sync";
pub const ENDPOINT_ADD_PEER: &str = "/node/peer";
pub const ENDPOINT_TX_ADD: &str = "/tx/add";
pub const ENDPOINT_BALANCES: &str = "/balances/list";
pub const ENDPOINT_METRICS: &str = "/metrics";

/// `GET /node/status`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub block_hash: Hash,
    /// `None` while the node has no blocks.
    pub block_number: Option<u64>,
    pub known_peers: BTreeMap<String, PeerNode>,
    pub account: Account,
    #[serde(default)]
    pub pending_count: usize,
}

impl StatusResponse {
    /// The number of the block this peer would accept next, i.e. one past its head.
    pub fn next_number(&self) -> u64 {
        self.block_number.map_or(0, |n| n + 1)
    }
}

/// Query of `GET /node/sync`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SyncQuery {
    #[serde(rename = "fromBlock")]
    pub from_block: u64,
}

/// `GET /node/sync`: blocks `fromBlock..=head` in order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SyncResponse {
    pub blocks: Vec<Block>,
}

/// Query of `GET /node/peer`: the caller announcing itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddPeerQuery {
    pub ip: String,
    pub port: u16,
    pub miner: Account,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddPeerResponse {
    pub success: bool,
    #[serde(default)]
    pub error: String,
}

/// `POST /tx/add`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxAddRequest {
    pub tx: SignedTx,
    /// The node that relayed the transaction, if it came from a peer.
    #[serde(default)]
    pub origin: Option<PeerNode>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxAddResponse {
    pub hash: Hash,
    /// `true` when the transaction was already pending or archived.
    pub duplicate: bool,
}

/// `GET /balances/list`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BalancesResponse {
    pub block_hash: Hash,
    pub balances: BTreeMap<Account, u64>,
}

/// Body of every non-2xx response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
