//! tally full node: the consensus and synchronization engine.
//!
//! The node is the central coordinator that:
//! - Admits transactions into the pending pool and relays them to peers
//! - Mines pending transactions into blocks on a fixed interval
//! - Polls peers for blocks it is missing and for peers it does not know
//! - Abandons an in-flight mining attempt when a peer's block lands first

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod miner;
pub mod node;
pub mod peers;
pub mod relay;
pub mod shutdown;
pub mod state;
pub mod sync;
pub mod tx_pool;

pub use config::NodeConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use miner::MiningEngine;
pub use node::Node;
pub use peers::PeerRegistry;
pub use relay::TxRelay;
pub use shutdown::ShutdownController;
pub use state::{NodeChannels, NodeState, PendingTx, PENDING_TX_CHANNEL_CAPACITY};
pub use sync::{SyncLoop, SyncReport};
pub use tx_pool::{SubmitOutcome, TransactionPool};
