//! tally daemon: entry point for running a tally node.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tally_ledger::{FileLedger, Genesis};
use tally_network::HttpPeerClient;
use tally_node::{init_logging, LogFormat, Node, NodeConfig, ShutdownController};
use tally_rpc::RpcServer;
use tally_types::Account;
use tally_work::{Difficulty, WorkGenerator};

#[derive(Parser)]
#[command(name = "tally", about = "tally blockchain node")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the node: mine, sync with peers and serve HTTP.
    Run(RunArgs),
    /// Print the version and exit.
    Version,
}

/// Every flag overrides the matching field of the config file, if given.
#[derive(Args)]
struct RunArgs {
    /// Path to a TOML configuration file.
    #[arg(long, env = "TALLY_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for ledger storage.
    #[arg(long, env = "TALLY_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Address to listen on and announce to peers.
    #[arg(long, env = "TALLY_IP")]
    ip: Option<String>,

    #[arg(long, env = "TALLY_PORT")]
    port: Option<u16>,

    /// Account credited with the reward of mined blocks.
    #[arg(long, env = "TALLY_MINER")]
    miner: Option<Account>,

    #[arg(long, env = "TALLY_BOOTSTRAP_IP")]
    bootstrap_ip: Option<String>,

    #[arg(long, env = "TALLY_BOOTSTRAP_PORT")]
    bootstrap_port: Option<u16>,

    #[arg(long, env = "TALLY_BOOTSTRAP_ACCOUNT")]
    bootstrap_account: Option<Account>,

    /// Seconds between mining attempts.
    #[arg(long, env = "TALLY_MINING_INTERVAL")]
    mining_interval: Option<u64>,

    /// Seconds between sync rounds.
    #[arg(long, env = "TALLY_SYNC_INTERVAL")]
    sync_interval: Option<u64>,

    /// Leading zero bits required of a block hash.
    #[arg(long, env = "TALLY_DIFFICULTY")]
    difficulty: Option<u32>,

    /// "human" or "json".
    #[arg(long, env = "TALLY_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// "trace", "debug", "info", "warn" or "error".
    #[arg(long, env = "TALLY_LOG_LEVEL")]
    log_level: Option<String>,
}

impl RunArgs {
    fn into_config(self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::from_toml_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => NodeConfig::default(),
        };

        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(ip) = self.ip {
            config.ip = ip;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(miner) = self.miner {
            config.miner = miner;
        }
        if let Some(ip) = self.bootstrap_ip {
            config.bootstrap_ip = ip;
        }
        if let Some(port) = self.bootstrap_port {
            config.bootstrap_port = port;
        }
        if let Some(account) = self.bootstrap_account {
            config.bootstrap_account = account;
        }
        if let Some(secs) = self.mining_interval {
            config.mining_interval_secs = secs;
        }
        if let Some(secs) = self.sync_interval {
            config.sync_interval_secs = secs;
        }
        if let Some(bits) = self.difficulty {
            config.difficulty = Difficulty::new(bits);
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Version => {
            println!("tally {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Run(args) => run(args.into_config()?).await,
    }
}

async fn run(config: NodeConfig) -> anyhow::Result<()> {
    init_logging(config.log_format, &config.log_level)?;

    let listen: SocketAddr = format!("{}:{}", config.ip, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.ip, config.port))?;

    let genesis = Genesis::with_allocation(config.bootstrap_account);
    let ledger = FileLedger::open(&config.data_dir, config.difficulty, &genesis)
        .with_context(|| format!("opening ledger in {}", config.data_dir.display()))?;
    let client = HttpPeerClient::new(config.http_timeout())?;
    let sealer = WorkGenerator::new(config.difficulty);

    let server = RpcServer::bind(listen).await?;
    let node = Arc::new(Node::new(
        config,
        Arc::new(ledger),
        Arc::new(client),
        Arc::new(sealer),
    )?);

    let shutdown = ShutdownController::new();
    let run_node = async {
        let result = node.run(shutdown.subscribe()).await;
        shutdown.shutdown();
        result
    };
    let serve = async {
        let result = server.serve(Arc::clone(&node), shutdown.subscribe()).await;
        shutdown.shutdown();
        result
    };

    let ((), node_result, serve_result) =
        tokio::join!(shutdown.wait_for_signal(), run_node, serve);
    serve_result?;
    node_result?;

    tracing::info!("tally daemon exited cleanly");
    Ok(())
}
