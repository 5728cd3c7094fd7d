//! File-backed ledger: `genesis.json` plus an append-only `block.db`.
//!
//! Every line of `block.db` is one JSON [`BlockRecord`]. Opening the ledger
//! replays the log through the same validation that `append` applies, so a
//! log that was hand-edited or truncated mid-record refuses to open.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tally_types::{Account, Block, Hash, SignedTx};
use tally_work::{validate_work, Difficulty};

use crate::{AccountState, Genesis, Ledger, LedgerError};

const DATABASE_DIR: &str = "database";
const GENESIS_FILE: &str = "genesis.json";
const BLOCK_LOG_FILE: &str = "block.db";

/// One line of the block log.
#[derive(Debug, Serialize, Deserialize)]
struct BlockRecord {
    hash: Hash,
    block: Block,
}

struct Inner {
    /// `None` once the ledger is closed.
    log: Option<File>,
    state: AccountState,
    blocks: Vec<Block>,
    head: Hash,
}

impl Inner {
    /// Check linkage, work and transactions; return the block hash and the
    /// account state after applying it, leaving `self` untouched.
    fn validate(
        &self,
        block: &Block,
        difficulty: Difficulty,
    ) -> Result<(Hash, AccountState), LedgerError> {
        if block.parent() != self.head {
            return Err(LedgerError::ParentMismatch {
                expected: self.head,
                actual: block.parent(),
            });
        }

        let expected = self.blocks.len() as u64;
        if block.number() != expected {
            return Err(LedgerError::NumberMismatch {
                expected,
                actual: block.number(),
            });
        }

        let hash = block.hash();
        if !validate_work(&hash, difficulty) {
            return Err(LedgerError::InsufficientWork { hash });
        }

        let mut next = self.state.clone();
        next.apply_block(block)?;
        Ok((hash, next))
    }

    fn commit(&mut self, hash: Hash, block: Block, state: AccountState) {
        self.state = state;
        self.blocks.push(block);
        self.head = hash;
    }
}

/// A [`Ledger`] persisted under `<data_dir>/database/`.
pub struct FileLedger {
    path: PathBuf,
    difficulty: Difficulty,
    inner: Mutex<Inner>,
}

impl FileLedger {
    /// Open (or initialize) the ledger stored under `data_dir`.
    ///
    /// `genesis` is written only when no genesis file exists yet.
    pub fn open(
        data_dir: &Path,
        difficulty: Difficulty,
        genesis: &Genesis,
    ) -> Result<Self, LedgerError> {
        let db_dir = data_dir.join(DATABASE_DIR);
        fs::create_dir_all(&db_dir)?;

        let genesis = Genesis::load_or_init(&db_dir.join(GENESIS_FILE), genesis)?;
        let path = db_dir.join(BLOCK_LOG_FILE);

        let mut inner = Inner {
            log: None,
            state: AccountState::from_genesis(&genesis),
            blocks: Vec::new(),
            head: Hash::ZERO,
        };

        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            for (index, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let corrupt = |reason: String| LedgerError::Corrupt {
                    line: index + 1,
                    reason,
                };

                let record: BlockRecord =
                    serde_json::from_str(&line).map_err(|e| corrupt(e.to_string()))?;
                let (hash, state) = inner
                    .validate(&record.block, difficulty)
                    .map_err(|e| corrupt(e.to_string()))?;
                if hash != record.hash {
                    return Err(corrupt(format!(
                        "recorded hash {} != computed {hash}",
                        record.hash
                    )));
                }
                inner.commit(hash, record.block, state);
            }
        }

        inner.log = Some(OpenOptions::new().create(true).append(true).open(&path)?);

        tracing::info!(
            path = %path.display(),
            blocks = inner.blocks.len(),
            head = %inner.head,
            %difficulty,
            "ledger opened"
        );

        Ok(Self {
            path,
            difficulty,
            inner: Mutex::new(inner),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Ledger for FileLedger {
    fn head_hash(&self) -> Hash {
        self.lock().head
    }

    fn head_number(&self) -> Option<u64> {
        let inner = self.lock();
        inner.blocks.last().map(Block::number)
    }

    fn append(&self, block: &Block) -> Result<Hash, LedgerError> {
        let mut inner = self.lock();
        if inner.log.is_none() {
            return Err(LedgerError::Closed);
        }

        let (hash, state) = inner.validate(block, self.difficulty)?;

        let record = BlockRecord {
            hash,
            block: block.clone(),
        };
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let log = inner.log.as_mut().ok_or(LedgerError::Closed)?;
        log.write_all(&line)?;
        log.sync_data()?;

        inner.commit(hash, record.block, state);
        tracing::debug!(number = block.number(), %hash, "block appended");
        Ok(hash)
    }

    fn blocks_from(&self, from: u64) -> Result<Vec<Block>, LedgerError> {
        let inner = self.lock();
        let start = usize::try_from(from).unwrap_or(usize::MAX);
        Ok(inner.blocks.get(start..).map(<[Block]>::to_vec).unwrap_or_default())
    }

    fn select_applicable(&self, txs: Vec<SignedTx>) -> Vec<SignedTx> {
        self.lock().state.select_applicable(txs)
    }

    fn balances(&self) -> BTreeMap<Account, u64> {
        self.lock().state.balances().clone()
    }

    fn close(&self) -> Result<(), LedgerError> {
        let mut inner = self.lock();
        if let Some(log) = inner.log.take() {
            log.sync_all()?;
            tracing::info!(path = %self.path.display(), "ledger closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BLOCK_REWARD, TX_FEE};
    use tally_types::{CandidateBlock, Tx};
    use tally_work::{Sealer, WorkGenerator};
    use tokio_util::sync::CancellationToken;

    const DIFFICULTY: Difficulty = Difficulty::DEFAULT;

    fn low() -> Difficulty {
        Difficulty::new(4)
    }

    fn alice() -> Account {
        Account::new([0xa1; 20])
    }

    fn bob() -> Account {
        Account::new([0xb0; 20])
    }

    fn open(dir: &Path) -> FileLedger {
        FileLedger::open(dir, low(), &Genesis::with_allocation(alice())).unwrap()
    }

    fn mine(ledger: &FileLedger, txs: Vec<SignedTx>) -> Block {
        let candidate =
            CandidateBlock::new(ledger.head_hash(), ledger.next_number(), bob(), txs);
        WorkGenerator::new(low())
            .seal(&candidate, &CancellationToken::new())
            .unwrap()
    }

    fn transfer(nonce: u64) -> SignedTx {
        SignedTx::new(Tx::new(alice(), bob(), 10, nonce, ""), "")
    }

    #[test]
    fn empty_ledger_has_zero_head() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open(dir.path());
        assert_eq!(ledger.head_hash(), Hash::ZERO);
        assert_eq!(ledger.head_number(), None);
        assert_eq!(ledger.next_number(), 0);
        assert_eq!(ledger.balances().get(&alice()), Some(&1_000_000));
    }

    #[test]
    fn append_advances_head_and_balances() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open(dir.path());

        let block = mine(&ledger, vec![transfer(1)]);
        let hash = ledger.append(&block).unwrap();

        assert_eq!(hash, block.hash());
        assert_eq!(ledger.head_hash(), hash);
        assert_eq!(ledger.head_number(), Some(0));
        assert_eq!(ledger.next_number(), 1);
        let balances = ledger.balances();
        assert_eq!(balances[&alice()], 1_000_000 - 10 - TX_FEE);
        assert_eq!(balances[&bob()], 10 + BLOCK_REWARD + TX_FEE);
    }

    #[test]
    fn second_block_for_same_number_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open(dir.path());

        let first = mine(&ledger, vec![transfer(1)]);
        let rival = mine(&ledger, vec![]);
        ledger.append(&first).unwrap();

        let err = ledger.append(&rival).unwrap_err();
        assert!(matches!(err, LedgerError::ParentMismatch { .. }));
        assert_eq!(ledger.next_number(), 1);
    }

    #[test]
    fn unsealed_block_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ledger =
            FileLedger::open(dir.path(), DIFFICULTY, &Genesis::with_allocation(alice())).unwrap();

        // A nonce picked without searching will almost never carry 20 zero bits.
        let candidate = CandidateBlock::new(Hash::ZERO, 0, bob(), vec![]);
        let block = (0..u64::MAX)
            .map(|nonce| candidate.with_nonce(nonce, 1))
            .find(|b| !validate_work(&b.hash(), DIFFICULTY))
            .unwrap();

        let err = ledger.append(&block).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientWork { .. }));
    }

    #[test]
    fn blocks_from_is_inclusive_and_empty_past_head() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open(dir.path());
        for nonce in 1..=3 {
            let block = mine(&ledger, vec![transfer(nonce)]);
            ledger.append(&block).unwrap();
        }

        let all = ledger.blocks_from(0).unwrap();
        assert_eq!(all.iter().map(Block::number).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(ledger.blocks_from(2).unwrap().len(), 1);
        assert!(ledger.blocks_from(3).unwrap().is_empty());
        assert!(ledger.blocks_from(u64::MAX).unwrap().is_empty());
    }

    #[test]
    fn reopen_replays_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let head = {
            let ledger = open(dir.path());
            let block = mine(&ledger, vec![transfer(1)]);
            ledger.append(&block).unwrap();
            ledger.close().unwrap();
            ledger.head_hash()
        };

        let reopened = open(dir.path());
        assert_eq!(reopened.head_hash(), head);
        assert_eq!(reopened.next_number(), 1);
        assert_eq!(reopened.balances()[&alice()], 1_000_000 - 10 - TX_FEE);
    }

    #[test]
    fn corrupt_log_refuses_to_open() {
        let dir = tempfile::tempdir().unwrap();
        {
            let ledger = open(dir.path());
            let block = mine(&ledger, vec![]);
            ledger.append(&block).unwrap();
        }
        let log = dir.path().join(DATABASE_DIR).join(BLOCK_LOG_FILE);
        let mut content = fs::read_to_string(&log).unwrap();
        content.push_str("{\"hash\": \"truncated\n");
        fs::write(&log, content).unwrap();

        let result = FileLedger::open(dir.path(), low(), &Genesis::with_allocation(alice()));
        assert!(matches!(result, Err(LedgerError::Corrupt { line: 2, .. })));
    }

    #[test]
    fn append_after_close_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open(dir.path());
        let block = mine(&ledger, vec![]);
        ledger.close().unwrap();
        assert!(matches!(ledger.append(&block), Err(LedgerError::Closed)));
    }
}
