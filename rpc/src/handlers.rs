//! Request handlers. Each one is a thin adapter over a [`Node`] operation.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use tally_network::{
    AddPeerQuery, AddPeerResponse, BalancesResponse, PeerClient, StatusResponse, SyncQuery,
    SyncResponse, TxAddRequest, TxAddResponse,
};
use tally_node::{Node, NodeError};
use tally_types::PeerNode;

use crate::RpcError;

pub type NodeState<P> = State<Arc<Node<P>>>;

// ── Node ─────────────────────────────────────────────────────────────────

pub async fn status<P: PeerClient>(State(node): NodeState<P>) -> Json<StatusResponse> {
    Json(StatusResponse {
        block_hash: node.head_hash(),
        block_number: node.head_number(),
        known_peers: node.known_peers().await,
        account: node.account(),
        pending_count: node.pending_count().await,
    })
}

pub async fn sync<P: PeerClient>(
    State(node): NodeState<P>,
    query: Result<Query<SyncQuery>, QueryRejection>,
) -> Result<Json<SyncResponse>, RpcError> {
    let Query(query) = query.map_err(|e| RpcError::InvalidRequest(e.body_text()))?;
    let blocks = node.blocks_from(query.from_block)?;
    Ok(Json(SyncResponse { blocks }))
}

/// A remote node announcing itself. It is registered as connected, so the
/// relay reaches it without waiting for our next sync round.
pub async fn add_peer<P: PeerClient>(
    State(node): NodeState<P>,
    query: Result<Query<AddPeerQuery>, QueryRejection>,
) -> Result<Json<AddPeerResponse>, RpcError> {
    let Query(query) = query.map_err(|e| RpcError::InvalidRequest(e.body_text()))?;
    let peer = PeerNode::new(query.ip, query.port, false, query.miner, true);

    let response = match node.register_peer(peer).await {
        Ok(()) => AddPeerResponse {
            success: true,
            error: String::new(),
        },
        Err(e @ NodeError::SelfPeer(_)) => AddPeerResponse {
            success: false,
            error: e.to_string(),
        },
        Err(e) => return Err(e.into()),
    };
    Ok(Json(response))
}

// ── Transactions ─────────────────────────────────────────────────────────

pub async fn tx_add<P: PeerClient>(
    State(node): NodeState<P>,
    body: Result<Json<TxAddRequest>, JsonRejection>,
) -> Result<Json<TxAddResponse>, RpcError> {
    let Json(request) = body.map_err(|e| RpcError::InvalidRequest(e.body_text()))?;
    let outcome = node.submit_transaction(request.tx, request.origin).await;
    Ok(Json(TxAddResponse {
        hash: outcome.hash(),
        duplicate: outcome.is_duplicate(),
    }))
}

// ── Ledger ───────────────────────────────────────────────────────────────

pub async fn balances<P: PeerClient>(State(node): NodeState<P>) -> Json<BalancesResponse> {
    Json(BalancesResponse {
        block_hash: node.head_hash(),
        balances: node.balances(),
    })
}

// ── Telemetry ────────────────────────────────────────────────────────────

pub async fn metrics<P: PeerClient>(
    State(node): NodeState<P>,
) -> Result<impl IntoResponse, RpcError> {
    let text = node.metrics().encode()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        text,
    ))
}
