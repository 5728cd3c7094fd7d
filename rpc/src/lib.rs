//! HTTP surface of the tally node.
//!
//! Provides endpoints for:
//! - Node status, block sync and peer registration (used by other nodes)
//! - Transaction submission
//! - Account balances
//! - Prometheus metrics

pub mod error;
pub mod handlers;
pub mod server;

pub use error::RpcError;
pub use server::{router, RpcServer};
