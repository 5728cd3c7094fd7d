//! Parse errors for the wire representations of core types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("invalid account address: {0}")]
    InvalidAccount(String),
}
