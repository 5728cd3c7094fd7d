//! Nullable ledger: an in-memory chain that checks linkage only.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tally_ledger::{Ledger, LedgerError, BLOCK_REWARD};
use tally_types::{Account, Block, Hash, SignedTx};

#[derive(Default)]
struct Inner {
    blocks: Vec<Block>,
    closed: bool,
}

/// A [`Ledger`] kept in memory.
///
/// Appends are checked for parent and number only: work, nonces and balances
/// are not validated, so blocks from [`NullSealer`](crate::NullSealer) are
/// accepted.
#[derive(Default)]
pub struct NullLedger {
    inner: Mutex<Inner>,
}

impl NullLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.lock().blocks.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

impl Ledger for NullLedger {
    fn head_hash(&self) -> Hash {
        self.lock().blocks.last().map(Block::hash).unwrap_or(Hash::ZERO)
    }

    fn head_number(&self) -> Option<u64> {
        self.lock().blocks.last().map(Block::number)
    }

    fn append(&self, block: &Block) -> Result<Hash, LedgerError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(LedgerError::Closed);
        }

        let head = inner.blocks.last().map(Block::hash).unwrap_or(Hash::ZERO);
        if block.parent() != head {
            return Err(LedgerError::ParentMismatch {
                expected: head,
                actual: block.parent(),
            });
        }
        let expected = inner.blocks.len() as u64;
        if block.number() != expected {
            return Err(LedgerError::NumberMismatch {
                expected,
                actual: block.number(),
            });
        }

        inner.blocks.push(block.clone());
        Ok(block.hash())
    }

    fn blocks_from(&self, from: u64) -> Result<Vec<Block>, LedgerError> {
        let inner = self.lock();
        let start = usize::try_from(from).unwrap_or(usize::MAX);
        Ok(inner.blocks.get(start..).map(<[Block]>::to_vec).unwrap_or_default())
    }

    fn select_applicable(&self, txs: Vec<SignedTx>) -> Vec<SignedTx> {
        txs
    }

    /// Miner rewards only; transfers are not tracked.
    fn balances(&self) -> BTreeMap<Account, u64> {
        let mut balances = BTreeMap::new();
        for block in &self.lock().blocks {
            *balances.entry(block.header.miner).or_insert(0) += BLOCK_REWARD;
        }
        balances
    }

    fn close(&self) -> Result<(), LedgerError> {
        self.lock().closed = true;
        Ok(())
    }
}
