//! Single-chain ledger.
//!
//! The chain is a sequence of blocks, each naming its parent by hash and
//! carrying the next sequential number. The first valid block appended at a
//! given number wins; there is no fork choice. Account balances and nonces are
//! derived by replaying every block on top of the genesis allocation.

pub mod error;
pub mod file;
pub mod genesis;
pub mod ledger;
pub mod state;

pub use error::LedgerError;
pub use file::FileLedger;
pub use genesis::Genesis;
pub use ledger::Ledger;
pub use state::{AccountState, BLOCK_REWARD, TX_FEE};
