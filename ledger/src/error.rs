use tally_types::{Account, Hash};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("parent mismatch: expected {expected}, block names {actual}")]
    ParentMismatch { expected: Hash, actual: Hash },

    #[error("block number mismatch: expected {expected}, got {actual}")]
    NumberMismatch { expected: u64, actual: u64 },

    #[error("block {hash} does not meet the network difficulty")]
    InsufficientWork { hash: Hash },

    #[error("invalid transaction {hash}: {reason}")]
    InvalidTx { hash: Hash, reason: String },

    #[error("insufficient balance for {account}: need {needed}, have {available}")]
    InsufficientBalance {
        account: Account,
        needed: u64,
        available: u64,
    },

    #[error("corrupt block log at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    #[error("invalid genesis file: {0}")]
    Genesis(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger is closed")]
    Closed,
}
