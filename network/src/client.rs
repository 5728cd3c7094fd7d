//! Outbound calls to peers.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tally_types::{Block, PeerNode, SignedTx};

use crate::messages::{
    AddPeerResponse, StatusResponse, SyncResponse, TxAddRequest, TxAddResponse, ENDPOINT_ADD_PEER,
    ENDPOINT_STATUS, ENDPOINT_SYNC, ENDPOINT_TX_ADD,
};
use crate::NetworkError;

/// The calls a node makes against its peers.
///
/// The node core is generic over this trait so tests can substitute a
/// scripted network for real HTTP.
pub trait PeerClient: Send + Sync + 'static {
    /// Ask `peer` for its head and known peers.
    fn status(
        &self,
        peer: &PeerNode,
    ) -> impl Future<Output = Result<StatusResponse, NetworkError>> + Send;

    /// Fetch the blocks `peer` holds from `from` (inclusive) to its head.
    fn sync_blocks(
        &self,
        peer: &PeerNode,
        from: u64,
    ) -> impl Future<Output = Result<Vec<Block>, NetworkError>> + Send;

    /// Register `me` as a known peer of `peer`.
    fn handshake(
        &self,
        peer: &PeerNode,
        me: &PeerNode,
    ) -> impl Future<Output = Result<(), NetworkError>> + Send;

    /// Offer a pending transaction to `peer`, naming `origin` as the relay.
    fn push_tx(
        &self,
        peer: &PeerNode,
        tx: &SignedTx,
        origin: &PeerNode,
    ) -> impl Future<Output = Result<TxAddResponse, NetworkError>> + Send;
}

/// [`PeerClient`] over plain HTTP with JSON bodies.
#[derive(Clone)]
pub struct HttpPeerClient {
    http: reqwest::Client,
}

impl HttpPeerClient {
    pub fn new(timeout: Duration) -> Result<Self, NetworkError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| NetworkError::Client(e.to_string()))?;
        Ok(Self { http })
    }

    async fn decode<T: DeserializeOwned>(
        peer: &PeerNode,
        response: reqwest::Response,
    ) -> Result<T, NetworkError> {
        if !response.status().is_success() {
            return Err(NetworkError::Status {
                peer: peer.tcp_address(),
                status: response.status().as_u16(),
            });
        }

        response.json().await.map_err(|e| NetworkError::Decode {
            peer: peer.tcp_address(),
            reason: e.to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, peer: &PeerNode, path: &str) -> Result<T, NetworkError> {
        let response = self
            .http
            .get(url(peer, path))
            .send()
            .await
            .map_err(|e| transport(peer, e))?;
        Self::decode(peer, response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        peer: &PeerNode,
        path: &str,
        body: &B,
    ) -> Result<T, NetworkError> {
        let response = self
            .http
            .post(url(peer, path))
            .json(body)
            .send()
            .await
            .map_err(|e| transport(peer, e))?;
        Self::decode(peer, response).await
    }
}

impl PeerClient for HttpPeerClient {
    async fn status(&self, peer: &PeerNode) -> Result<StatusResponse, NetworkError> {
        self.get(peer, ENDPOINT_STATUS).await
    }

    async fn sync_blocks(&self, peer: &PeerNode, from: u64) -> Result<Vec<Block>, NetworkError> {
        let path = format!("{ENDPOINT_SYNC}?fromBlock={from}");
        let response: SyncResponse = self.get(peer, &path).await?;
        Ok(response.blocks)
    }

    async fn handshake(&self, peer: &PeerNode, me: &PeerNode) -> Result<(), NetworkError> {
        let path = format!(
            "{ENDPOINT_ADD_PEER}?ip={}&port={}&miner={}",
            me.ip, me.port, me.account
        );
        let response: AddPeerResponse = self.get(peer, &path).await?;
        if !response.success {
            return Err(NetworkError::HandshakeRejected {
                peer: peer.tcp_address(),
                reason: response.error,
            });
        }
        Ok(())
    }

    async fn push_tx(
        &self,
        peer: &PeerNode,
        tx: &SignedTx,
        origin: &PeerNode,
    ) -> Result<TxAddResponse, NetworkError> {
        let body = TxAddRequest {
            tx: tx.clone(),
            origin: Some(origin.clone()),
        };
        self.post(peer, ENDPOINT_TX_ADD, &body).await
    }
}

fn url(peer: &PeerNode, path: &str) -> String {
    format!("http://{}{path}", peer.tcp_address())
}

fn transport(peer: &PeerNode, e: reqwest::Error) -> NetworkError {
    NetworkError::Transport {
        peer: peer.tcp_address(),
        reason: e.to_string(),
    }
}
