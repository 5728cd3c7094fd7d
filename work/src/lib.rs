//! Block proof-of-work.
//!
//! Sealing searches for a nonce whose block hash has at least
//! [`Difficulty::bits`] leading zero bits. The search is spread across all CPU
//! cores and abandons itself promptly when its cancellation token fires, which
//! is how a node stops mining once a peer wins the race for a block number.

pub mod difficulty;
pub mod error;
pub mod generator;
pub mod validator;

pub use difficulty::Difficulty;
pub use error::WorkError;
pub use generator::{Sealer, WorkGenerator};
pub use validator::validate_work;
