//! Single-flight mining engine.
//!
//! One controller task owns the in-flight attempt. It starts an attempt on a
//! timer tick when the pool has work, integrates the sealed block when the
//! search finishes, and cancels the search when the sync loop reports that
//! the ledger moved past the attempt's block number.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use tally_types::{Block, CandidateBlock};
use tally_work::{Sealer, WorkError};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::NodeState;

type SealResult = Result<Result<Block, WorkError>, JoinError>;

struct Attempt {
    number: u64,
    cancel: CancellationToken,
    handle: JoinHandle<Result<Block, WorkError>>,
}

impl Attempt {
    async fn abandon(self) {
        self.cancel.cancel();
        // A seal that finished before the cancel landed is discarded.
        let _ = self.handle.await;
    }
}

/// Resolves when the current attempt finishes; never while idle.
async fn finished(attempt: &mut Option<Attempt>) -> SealResult {
    match attempt {
        Some(a) => (&mut a.handle).await,
        None => pending().await,
    }
}

pub struct MiningEngine {
    state: Arc<NodeState>,
    sealer: Arc<dyn Sealer>,
    interval: Duration,
}

impl MiningEngine {
    pub fn new(state: Arc<NodeState>, sealer: Arc<dyn Sealer>, interval: Duration) -> Self {
        Self {
            state,
            sealer,
            interval,
        }
    }

    /// Drive the engine until `shutdown` is cancelled.
    pub async fn run(self, mut synced: mpsc::Receiver<Block>, shutdown: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut attempt: Option<Attempt> = None;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    if let Some(a) = attempt.take() {
                        a.abandon().await;
                        self.state.end_mining();
                    }
                    tracing::info!("mining engine shutting down");
                    break;
                }
                Some(block) = synced.recv() => {
                    self.on_synced(&mut attempt, &block).await;
                }
                result = finished(&mut attempt) => {
                    let number = attempt.take().map(|a| a.number);
                    self.on_sealed(number, result).await;
                }
                _ = ticker.tick() => {
                    self.on_tick(&mut attempt, &shutdown).await;
                }
            }
        }
    }

    async fn on_tick(&self, attempt: &mut Option<Attempt>, shutdown: &CancellationToken) {
        if attempt.is_some() {
            tracing::trace!("mining tick while an attempt is in flight");
            return;
        }

        let candidate = {
            let pool = self.state.pool.lock().await;
            let pending = pool.snapshot_pending();
            if pending.is_empty() {
                return;
            }
            let pending_count = pending.len();
            let txs = self.state.ledger.select_applicable(pending);
            if txs.is_empty() {
                tracing::debug!(pending = pending_count, "no pending transaction applies to the head");
                return;
            }
            CandidateBlock::new(
                self.state.ledger.head_hash(),
                self.state.ledger.next_number(),
                self.state.info.account,
                txs,
            )
        };

        if !self.state.begin_mining() {
            return;
        }

        let number = candidate.number;
        tracing::info!(number, txs = candidate.txs().len(), "mining started");
        self.state.metrics.mining_attempts.inc();

        let cancel = shutdown.child_token();
        let token = cancel.clone();
        let sealer = Arc::clone(&self.sealer);
        let handle = tokio::task::spawn_blocking(move || sealer.seal(&candidate, &token));

        *attempt = Some(Attempt {
            number,
            cancel,
            handle,
        });
    }

    async fn on_sealed(&self, number: Option<u64>, result: SealResult) {
        match result {
            Ok(Ok(block)) => match self.state.accept_block(&block).await {
                Ok(hash) => {
                    self.state.metrics.blocks_mined.inc();
                    tracing::info!(number = block.number(), %hash, txs = block.txs.len(), "mined block");
                }
                Err(e) => {
                    tracing::warn!(number = block.number(), error = %e, "discarding mined block");
                }
            },
            Ok(Err(WorkError::Cancelled)) => {
                tracing::debug!(?number, "mining attempt cancelled");
            }
            Ok(Err(e)) => {
                tracing::warn!(?number, error = %e, "mining attempt failed");
            }
            Err(e) => {
                tracing::error!(?number, error = %e, "sealer task failed");
            }
        }
        self.state.end_mining();
    }

    /// A peer's block was appended. Abandon the attempt if it is now stale,
    /// and make sure the block's transactions are out of `pending`.
    async fn on_synced(&self, attempt: &mut Option<Attempt>, block: &Block) {
        let next = self.state.ledger.next_number();
        let stale = attempt.as_ref().is_some_and(|a| a.number < next);

        if stale {
            if let Some(a) = attempt.take() {
                tracing::info!(
                    number = a.number,
                    peer_block = %block.hash(),
                    "peer mined the block first, abandoning attempt"
                );
                a.abandon().await;
                self.state.metrics.mining_preemptions.inc();
                self.state.end_mining();
            }
        }

        let mut pool = self.state.pool.lock().await;
        pool.archive(block);
        self.state
            .metrics
            .pending_transactions
            .set(pool.pending_count() as i64);
    }
}
