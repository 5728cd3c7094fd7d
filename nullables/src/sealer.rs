//! Nullable proof-of-work: no hashing, controllable timing.

use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use tally_types::{Block, CandidateBlock, SignedTx};
use tally_work::{Sealer, WorkError};
use tokio_util::sync::CancellationToken;

const POLL: Duration = Duration::from_millis(2);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Instant,
    UntilCancelled,
}

/// A [`Sealer`] that either seals at once or blocks until cancelled.
///
/// Blocks it produces carry nonce 0 and time 0, so they only pass a ledger
/// that does not check work.
pub struct NullSealer {
    mode: Mutex<Mode>,
    candidates: Mutex<Vec<CandidateBlock>>,
}

impl NullSealer {
    /// Seal every candidate immediately.
    pub fn instant() -> Self {
        Self::with_mode(Mode::Instant)
    }

    /// Never find a nonce; return [`WorkError::Cancelled`] once cancelled.
    pub fn until_cancelled() -> Self {
        Self::with_mode(Mode::UntilCancelled)
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            mode: Mutex::new(mode),
            candidates: Mutex::new(Vec::new()),
        }
    }

    /// Switch subsequent attempts to sealing immediately.
    pub fn make_instant(&self) {
        *self.mode.lock().unwrap_or_else(PoisonError::into_inner) = Mode::Instant;
    }

    /// Every candidate handed to `seal`, in order.
    pub fn candidates(&self) -> Vec<CandidateBlock> {
        self.candidates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn attempts(&self) -> usize {
        self.candidates.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Transactions of the most recent candidate.
    pub fn last_txs(&self) -> Option<Vec<SignedTx>> {
        self.candidates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .map(|c| c.txs().to_vec())
    }
}

impl Sealer for NullSealer {
    fn seal(
        &self,
        candidate: &CandidateBlock,
        cancel: &CancellationToken,
    ) -> Result<Block, WorkError> {
        self.candidates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(candidate.clone());

        loop {
            if cancel.is_cancelled() {
                return Err(WorkError::Cancelled);
            }
            let mode = *self.mode.lock().unwrap_or_else(PoisonError::into_inner);
            if mode == Mode::Instant {
                return Ok(candidate.with_nonce(0, 0));
            }
            thread::sleep(POLL);
        }
    }
}
