//! HTTP peer protocol for the tally node.
//!
//! Nodes reconcile by polling each other: a node asks a peer for its status,
//! pulls any blocks it is missing, registers itself with peers it has not yet
//! greeted, and pushes freshly admitted transactions to the peers it knows.
//! This crate holds the wire messages for that protocol, the [`PeerClient`]
//! seam the node core is written against, and its reqwest implementation.

pub mod broadcast;
pub mod client;
pub mod error;
pub mod messages;

pub use broadcast::{BroadcastResult, Broadcaster};
pub use client::{HttpPeerClient, PeerClient};
pub use error::NetworkError;
pub use messages::{
    AddPeerQuery, AddPeerResponse, BalancesResponse, ErrorResponse, StatusResponse, SyncQuery,
    SyncResponse, TxAddRequest, TxAddResponse,
};
