//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tally_types::{Account, PeerNode};
use tally_work::Difficulty;

use crate::{LogFormat, NodeError};

/// Configuration for a tally node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Data directory for ledger storage.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Address this node listens on and announces to peers.
    #[serde(default = "default_ip")]
    pub ip: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Account credited with the reward of blocks this node mines.
    #[serde(default)]
    pub miner: Account,

    #[serde(default = "default_ip")]
    pub bootstrap_ip: String,

    #[serde(default = "default_port")]
    pub bootstrap_port: u16,

    /// Account of the bootstrap node; also the genesis allocation holder.
    #[serde(default = "default_bootstrap_account")]
    pub bootstrap_account: Account,

    /// Seconds between mining ticks.
    #[serde(default = "default_mining_interval")]
    pub mining_interval_secs: u64,

    /// Seconds between sync rounds.
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,

    /// Leading zero bits a block hash must carry.
    #[serde(default)]
    pub difficulty: Difficulty,

    /// Timeout applied to each outbound peer request.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./tally_data")
}

fn default_ip() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_bootstrap_account() -> Account {
    Account::new([
        0x09, 0xee, 0x50, 0xf2, 0xf3, 0x7f, 0xcb, 0xa1, 0x84, 0x5d, 0xe6, 0xfe, 0x5c, 0x76, 0x2e,
        0x83, 0xe6, 0x5e, 0x75, 0x5c,
    ])
}

fn default_mining_interval() -> u64 {
    10
}

fn default_sync_interval() -> u64 {
    5
}

fn default_http_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// This node as peers see it.
    pub fn self_peer(&self) -> PeerNode {
        PeerNode::new(self.ip.clone(), self.port, self.is_bootstrap(), self.miner, true)
    }

    pub fn bootstrap_peer(&self) -> PeerNode {
        PeerNode::new(
            self.bootstrap_ip.clone(),
            self.bootstrap_port,
            true,
            self.bootstrap_account,
            false,
        )
    }

    pub fn is_bootstrap(&self) -> bool {
        self.ip == self.bootstrap_ip && self.port == self.bootstrap_port
    }

    pub fn mining_interval(&self) -> Duration {
        Duration::from_secs(self.mining_interval_secs.max(1))
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            ip: default_ip(),
            port: default_port(),
            miner: Account::ZERO,
            bootstrap_ip: default_ip(),
            bootstrap_port: default_port(),
            bootstrap_account: default_bootstrap_account(),
            mining_interval_secs: default_mining_interval(),
            sync_interval_secs: default_sync_interval(),
            difficulty: Difficulty::default(),
            http_timeout_secs: default_http_timeout(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.port, config.port);
        assert_eq!(parsed.bootstrap_account, config.bootstrap_account);
        assert_eq!(parsed.difficulty, config.difficulty);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.port, 8080);
        assert_eq!(config.mining_interval_secs, 10);
        assert_eq!(config.difficulty, Difficulty::new(20));
        assert_eq!(config.log_format, LogFormat::Human);
        assert!(config.is_bootstrap());
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            port = 8081
            miner = "0x2222222222222222222222222222222222222222"
            log_format = "json"
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.port, 8081);
        assert_eq!(config.miner, Account::new([0x22; 20]));
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(!config.is_bootstrap());
        assert_eq!(config.self_peer().tcp_address(), "127.0.0.1:8081");
        assert_eq!(config.bootstrap_peer().tcp_address(), "127.0.0.1:8080");
    }

    #[test]
    fn bad_account_is_a_config_error() {
        let err = NodeConfig::from_toml_str(r#"miner = "nope""#).unwrap_err();
        assert!(matches!(err, NodeError::Config(_)));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file("/nonexistent/tally.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}
