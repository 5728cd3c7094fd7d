//! Axum-based HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tally_network::messages::{
    ENDPOINT_ADD_PEER, ENDPOINT_BALANCES, ENDPOINT_METRICS, ENDPOINT_STATUS, ENDPOINT_SYNC,
    ENDPOINT_TX_ADD,
};
use tally_network::PeerClient;
use tally_node::Node;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::handlers;
use crate::RpcError;

/// Every endpoint the node serves, bound to `node`.
pub fn router<P: PeerClient>(node: Arc<Node<P>>) -> Router {
    Router::new()
        .route(ENDPOINT_STATUS, get(handlers::status::<P>))
        .route(ENDPOINT_SYNC, get(handlers::sync::<P>))
        .route(ENDPOINT_ADD_PEER, get(handlers::add_peer::<P>))
        .route(ENDPOINT_TX_ADD, post(handlers::tx_add::<P>))
        .route(ENDPOINT_BALANCES, get(handlers::balances::<P>))
        .route(ENDPOINT_METRICS, get(handlers::metrics::<P>))
        .with_state(node)
}

/// An HTTP server whose listener is already bound.
pub struct RpcServer {
    listener: TcpListener,
}

impl RpcServer {
    /// Bind the listen address. Failing here is fatal for the node.
    pub async fn bind(addr: SocketAddr) -> Result<Self, RpcError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RpcError::Server(format!("cannot bind {addr}: {e}")))?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, RpcError> {
        self.listener
            .local_addr()
            .map_err(|e| RpcError::Server(e.to_string()))
    }

    /// Serve until `shutdown` is cancelled, then finish in-flight requests.
    pub async fn serve<P: PeerClient>(
        self,
        node: Arc<Node<P>>,
        shutdown: CancellationToken,
    ) -> Result<(), RpcError> {
        let addr = self.local_addr()?;
        tracing::info!(%addr, "http server listening");

        axum::serve(self.listener, router(node))
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
            .map_err(|e| RpcError::Server(e.to_string()))?;

        tracing::info!("http server stopped");
        Ok(())
    }
}
