//! Genesis allocation: the balances that exist before the first block.
//!
//! Stored as `genesis.json` next to the block log. A node that finds no
//! genesis file writes the one it was configured with; an existing file always
//! wins so that restarting with different flags cannot rewrite history.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tally_types::Account;

use crate::LedgerError;

/// Default allocation credited to the bootstrap account.
pub const GENESIS_ALLOCATION: u64 = 1_000_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    pub genesis_time: String,
    pub chain_id: String,
    pub balances: BTreeMap<Account, u64>,
}

impl Genesis {
    /// A genesis that credits `account` with [`GENESIS_ALLOCATION`].
    pub fn with_allocation(account: Account) -> Self {
        let mut balances = BTreeMap::new();
        balances.insert(account, GENESIS_ALLOCATION);
        Self {
            genesis_time: "2026-01-01T00:00:00.000000000Z".to_string(),
            chain_id: "tally-ledger".to_string(),
            balances,
        }
    }

    /// Read `path`, or write `default` there first if it does not exist.
    pub fn load_or_init(path: &Path, default: &Genesis) -> Result<Self, LedgerError> {
        if !path.exists() {
            let json = serde_json::to_string_pretty(default)?;
            fs::write(path, json)?;
            tracing::info!(path = %path.display(), "wrote genesis file");
            return Ok(default.clone());
        }

        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| LedgerError::Genesis(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_file_wins_over_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("genesis.json");

        let first = Genesis::with_allocation(Account::new([1; 20]));
        let loaded = Genesis::load_or_init(&path, &first).unwrap();
        assert_eq!(loaded, first);

        let second = Genesis::with_allocation(Account::new([2; 20]));
        let reloaded = Genesis::load_or_init(&path, &second).unwrap();
        assert_eq!(reloaded, first);
    }

    #[test]
    fn malformed_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("genesis.json");
        fs::write(&path, "{ not json").unwrap();

        let result = Genesis::load_or_init(&path, &Genesis::with_allocation(Account::ZERO));
        assert!(matches!(result, Err(LedgerError::Genesis(_))));
    }
}
