//! Fundamental types for the tally chain.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! hashes, account addresses, transactions, blocks, peer identities and timestamps.

pub mod account;
pub mod block;
pub mod error;
pub mod hash;
pub mod peer;
pub mod time;
pub mod tx;

pub use account::Account;
pub use block::{Block, BlockHeader, CandidateBlock};
pub use error::TypesError;
pub use hash::{blake2b_256, Hash};
pub use peer::PeerNode;
pub use time::unix_now_secs;
pub use tx::{SignedTx, Tx};
