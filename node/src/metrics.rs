//! Prometheus metrics for the tally node.
//!
//! The [`NodeMetrics`] struct owns a dedicated [`Registry`] that the RPC
//! `/metrics` endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

use crate::NodeError;

/// Central collection of all node-level Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Blocks this node sealed and appended.
    pub blocks_mined: IntCounter,
    /// Blocks fetched from peers and appended.
    pub blocks_synced: IntCounter,
    /// Mining attempts started.
    pub mining_attempts: IntCounter,
    /// Mining attempts abandoned because a peer's block arrived first.
    pub mining_preemptions: IntCounter,
    /// Transactions newly admitted into the pending pool.
    pub transactions_admitted: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub pending_transactions: IntGauge,
    pub known_peers: IntGauge,
    /// Number of the head block, -1 while the chain is empty.
    pub head_number: IntGauge,
}

impl NodeMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Result<Self, NodeError> {
        let registry = Registry::new();

        let blocks_mined = register_int_counter_with_registry!(
            Opts::new("tally_blocks_mined_total", "Blocks mined by this node"),
            registry
        )?;
        let blocks_synced = register_int_counter_with_registry!(
            Opts::new("tally_blocks_synced_total", "Blocks accepted from peers"),
            registry
        )?;
        let mining_attempts = register_int_counter_with_registry!(
            Opts::new("tally_mining_attempts_total", "Mining attempts started"),
            registry
        )?;
        let mining_preemptions = register_int_counter_with_registry!(
            Opts::new(
                "tally_mining_preemptions_total",
                "Mining attempts cancelled by a synced block"
            ),
            registry
        )?;
        let transactions_admitted = register_int_counter_with_registry!(
            Opts::new(
                "tally_transactions_admitted_total",
                "Transactions admitted into the pending pool"
            ),
            registry
        )?;

        let pending_transactions = register_int_gauge_with_registry!(
            Opts::new("tally_pending_transactions", "Transactions currently pending"),
            registry
        )?;
        let known_peers = register_int_gauge_with_registry!(
            Opts::new("tally_known_peers", "Peers in the registry"),
            registry
        )?;
        let head_number = register_int_gauge_with_registry!(
            Opts::new("tally_head_number", "Number of the head block"),
            registry
        )?;
        head_number.set(-1);

        Ok(Self {
            registry,
            blocks_mined,
            blocks_synced,
            mining_attempts,
            mining_preemptions,
            transactions_admitted,
            pending_transactions,
            known_peers,
            head_number,
        })
    }

    pub fn set_head(&self, number: Option<u64>) {
        self.head_number
            .set(number.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX)));
    }

    /// Render every metric in the text exposition format.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
