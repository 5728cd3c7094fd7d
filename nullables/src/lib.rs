//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator of the node core (the peer network, the
//! proof-of-work search, the ledger) sits behind a trait. This crate provides
//! test-friendly implementations that:
//! - Return scripted values
//! - Record what the node asked of them
//! - Never touch the filesystem or the network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod ledger;
pub mod network;
pub mod sealer;

pub use ledger::NullLedger;
pub use network::NullPeerClient;
pub use sealer::NullSealer;
