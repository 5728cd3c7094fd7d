//! Account balances and nonces derived from the chain.

use std::collections::{BTreeMap, HashMap};

use tally_types::{Account, Block, SignedTx};

use crate::{Genesis, LedgerError};

/// Flat fee charged to the sender of every transaction and paid to the miner.
pub const TX_FEE: u64 = 50;

/// Reward credited to the miner of every block.
pub const BLOCK_REWARD: u64 = 100;

/// Balances and last-used nonces for every account the chain has touched.
#[derive(Clone, Debug, Default)]
pub struct AccountState {
    balances: BTreeMap<Account, u64>,
    nonces: HashMap<Account, u64>,
}

impl AccountState {
    pub fn from_genesis(genesis: &Genesis) -> Self {
        Self {
            balances: genesis.balances.clone(),
            nonces: HashMap::new(),
        }
    }

    pub fn balance(&self, account: &Account) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// The nonce the next transaction from `account` must carry.
    pub fn next_nonce(&self, account: &Account) -> u64 {
        self.nonces.get(account).copied().unwrap_or(0) + 1
    }

    pub fn balances(&self) -> &BTreeMap<Account, u64> {
        &self.balances
    }

    /// Apply every transaction in `block`, then credit the miner.
    ///
    /// Transactions are applied in sender and nonce order, independent of
    /// their position in the block. On error `self` may be partially updated;
    /// callers apply to a copy and only keep it when this returns `Ok`.
    pub fn apply_block(&mut self, block: &Block) -> Result<(), LedgerError> {
        let mut fees = 0u64;
        for tx in application_order(block.txs.iter()) {
            fees += self.apply_tx(tx)?;
        }

        let miner = self.balances.entry(block.header.miner).or_insert(0);
        *miner = miner.saturating_add(BLOCK_REWARD + fees);
        Ok(())
    }

    /// The subset of `txs` that applies cleanly on top of this state, in the
    /// order [`apply_block`](Self::apply_block) would apply it. Transactions
    /// with a stale nonce, a nonce gap or an unaffordable value are left out.
    pub fn select_applicable(&self, txs: Vec<SignedTx>) -> Vec<SignedTx> {
        let mut scratch = self.clone();
        let mut ordered = txs;
        ordered.sort_by_cached_key(|tx| (tx.tx.from, tx.tx.nonce, tx.hash()));
        ordered.retain(|tx| scratch.apply_tx(tx).is_ok());
        ordered
    }

    /// Debit sender, credit recipient and bump the sender nonce. Returns the fee.
    fn apply_tx(&mut self, tx: &SignedTx) -> Result<u64, LedgerError> {
        let hash = tx.hash();
        let expected = self.next_nonce(&tx.tx.from);
        if tx.tx.nonce != expected {
            return Err(LedgerError::InvalidTx {
                hash,
                reason: format!("nonce {} != expected {expected}", tx.tx.nonce),
            });
        }

        let cost = tx.tx.value.checked_add(TX_FEE).ok_or_else(|| LedgerError::InvalidTx {
            hash,
            reason: "value overflows".into(),
        })?;
        let available = self.balance(&tx.tx.from);
        if available < cost {
            return Err(LedgerError::InsufficientBalance {
                account: tx.tx.from,
                needed: cost,
                available,
            });
        }

        self.balances.insert(tx.tx.from, available - cost);
        let to = self.balances.entry(tx.tx.to).or_insert(0);
        *to = to.saturating_add(tx.tx.value);
        self.nonces.insert(tx.tx.from, tx.tx.nonce);
        Ok(TX_FEE)
    }
}

fn application_order<'a>(txs: impl Iterator<Item = &'a SignedTx>) -> Vec<&'a SignedTx> {
    let mut ordered: Vec<&SignedTx> = txs.collect();
    ordered.sort_by_cached_key(|tx| (tx.tx.from, tx.tx.nonce, tx.hash()));
    ordered
}
