//! `HttpPeerClient` against a throwaway axum server.

use std::collections::BTreeMap;
use std::time::Duration;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tally_network::messages::{ENDPOINT_ADD_PEER, ENDPOINT_STATUS, ENDPOINT_SYNC, ENDPOINT_TX_ADD};
use tally_network::{
    AddPeerQuery, AddPeerResponse, HttpPeerClient, NetworkError, PeerClient, StatusResponse,
    SyncQuery, SyncResponse, TxAddRequest, TxAddResponse,
};
use tally_types::{Account, Block, BlockHeader, Hash, PeerNode, SignedTx, Tx};

fn miner() -> Account {
    Account::new([0x42; 20])
}

fn block(number: u64) -> Block {
    Block::new(
        BlockHeader {
            parent: Hash::ZERO,
            number,
            nonce: 0,
            time: 1,
            miner: miner(),
        },
        Vec::new(),
    )
}

async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        block_hash: Hash::new([7; 32]),
        block_number: Some(2),
        known_peers: BTreeMap::new(),
        account: miner(),
        pending_count: 1,
    })
}

async fn sync(Query(q): Query<SyncQuery>) -> Json<SyncResponse> {
    Json(SyncResponse {
        blocks: (q.from_block..3).map(block).collect(),
    })
}

async fn add_peer(Query(q): Query<AddPeerQuery>) -> Json<AddPeerResponse> {
    let rejected = q.port == 1;
    Json(AddPeerResponse {
        success: !rejected,
        error: if rejected { "bad port".into() } else { String::new() },
    })
}

async fn tx_add(Json(req): Json<TxAddRequest>) -> Json<TxAddResponse> {
    Json(TxAddResponse {
        hash: req.tx.hash(),
        duplicate: req.origin.is_some(),
    })
}

async fn serve(router: Router) -> PeerNode {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    PeerNode::new("127.0.0.1", port, false, miner(), false)
}

fn client() -> HttpPeerClient {
    HttpPeerClient::new(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn talks_to_every_endpoint() {
    let peer = serve(
        Router::new()
            .route(ENDPOINT_STATUS, get(status))
            .route(ENDPOINT_SYNC, get(sync))
            .route(ENDPOINT_ADD_PEER, get(add_peer))
            .route(ENDPOINT_TX_ADD, post(tx_add)),
    )
    .await;
    let client = client();

    let status = client.status(&peer).await.unwrap();
    assert_eq!(status.block_number, Some(2));
    assert_eq!(status.next_number(), 3);

    let blocks = client.sync_blocks(&peer, 1).await.unwrap();
    assert_eq!(blocks.iter().map(Block::number).collect::<Vec<_>>(), vec![1, 2]);
    assert!(client.sync_blocks(&peer, 9).await.unwrap().is_empty());

    let me = PeerNode::new("127.0.0.1", 4000, false, Account::ZERO, false);
    client.handshake(&peer, &me).await.unwrap();

    let rejected_me = PeerNode::new("127.0.0.1", 1, false, Account::ZERO, false);
    let err = client.handshake(&peer, &rejected_me).await.unwrap_err();
    assert!(matches!(err, NetworkError::HandshakeRejected { .. }));

    let tx = SignedTx::new(Tx::new(miner(), Account::ZERO, 3, 1, ""), "");
    let ack = client.push_tx(&peer, &tx, &me).await.unwrap();
    assert_eq!(ack.hash, tx.hash());
    assert!(ack.duplicate);
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let peer = serve(Router::new().route(
        ENDPOINT_STATUS,
        get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    ))
    .await;

    let err = client().status(&peer).await.unwrap_err();
    assert!(matches!(err, NetworkError::Status { status: 503, .. }));
}

#[tokio::test]
async fn unreachable_peer_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let peer = PeerNode::new("127.0.0.1", port, false, miner(), false);
    let err = client().status(&peer).await.unwrap_err();
    assert!(matches!(err, NetworkError::Transport { .. }));
}
