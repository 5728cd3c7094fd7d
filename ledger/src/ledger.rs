//! The ledger handle the node core consumes.

use std::collections::BTreeMap;

use tally_types::{Account, Block, Hash, SignedTx};

use crate::LedgerError;

/// Read access to the head of the chain plus an atomic append.
///
/// Implementations synchronize internally: `append` must be atomic with
/// respect to `next_number`, so two concurrent appends can never both claim
/// the same block number.
pub trait Ledger: Send + Sync {
    /// Hash of the most recently accepted block, or [`Hash::ZERO`] when empty.
    fn head_hash(&self) -> Hash;

    /// Number of the most recently accepted block, `None` when empty.
    fn head_number(&self) -> Option<u64>;

    /// Number the next appended block must carry.
    fn next_number(&self) -> u64 {
        self.head_number().map_or(0, |n| n + 1)
    }

    /// Validate and durably append `block`, returning the new head hash.
    fn append(&self, block: &Block) -> Result<Hash, LedgerError>;

    /// Blocks numbered `from` through the head, in order. Empty when `from`
    /// is past the head.
    fn blocks_from(&self, from: u64) -> Result<Vec<Block>, LedgerError>;

    /// Filter `txs` down to those that would apply on top of the head, in
    /// the order a block built from them would apply them.
    fn select_applicable(&self, txs: Vec<SignedTx>) -> Vec<SignedTx>;

    /// Current balance of every account the chain knows.
    fn balances(&self) -> BTreeMap<Account, u64>;

    /// Flush and release storage. Later appends fail with [`LedgerError::Closed`].
    fn close(&self) -> Result<(), LedgerError>;
}
