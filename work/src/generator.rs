//! Block sealing (multi-threaded CPU).

use std::sync::OnceLock;

use rayon::prelude::*;
use tally_types::{unix_now_secs, Block, CandidateBlock};
use tokio_util::sync::CancellationToken;

use crate::{validate_work, Difficulty, WorkError};

/// Turns a candidate block into a sealed one.
///
/// Implementations block the calling thread until a valid block is found or
/// `cancel` fires, and must observe `cancel` often enough that an abandoned
/// search stops within a small, bounded number of attempts.
pub trait Sealer: Send + Sync {
    fn seal(&self, candidate: &CandidateBlock, cancel: &CancellationToken)
        -> Result<Block, WorkError>;
}

/// Attempts per thread between cancellation checks.
const BATCH_SIZE: u64 = 1024;

/// Searches the nonce space on all available CPU cores.
#[derive(Clone, Copy, Debug)]
pub struct WorkGenerator {
    difficulty: Difficulty,
}

impl WorkGenerator {
    pub fn new(difficulty: Difficulty) -> Self {
        Self { difficulty }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }
}

impl Sealer for WorkGenerator {
    /// Splits the nonce space across rayon threads starting from a random
    /// offset. The first thread to find a valid nonce signals the others to
    /// stop.
    fn seal(
        &self,
        candidate: &CandidateBlock,
        cancel: &CancellationToken,
    ) -> Result<Block, WorkError> {
        let time = unix_now_secs();
        let start: u64 = rand::random();

        if self.difficulty.bits() == 0 {
            return Ok(candidate.with_nonce(start, time));
        }

        let found = OnceLock::new();
        let num_threads = rayon::current_num_threads().max(1) as u64;

        (0..num_threads).into_par_iter().for_each(|thread_id| {
            let mut nonce = start.wrapping_add(thread_id);

            loop {
                if found.get().is_some() || cancel.is_cancelled() {
                    return;
                }

                for _ in 0..BATCH_SIZE {
                    if validate_work(&candidate.hash_for(nonce, time), self.difficulty) {
                        let _ = found.set(nonce);
                        return;
                    }
                    nonce = nonce.wrapping_add(num_threads);
                }
            }
        });

        match found.get() {
            Some(&nonce) => Ok(candidate.with_nonce(nonce, time)),
            None => Err(WorkError::Cancelled),
        }
    }
}
