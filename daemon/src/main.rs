//! netmapd daemon: entry point for running a storage node.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use netmapd_ledger::MemoryLedger;
use netmapd_node::{init_logging, NodeConfig, NodeError, ShutdownController, StorageNode};
use tokio::task::JoinHandle;

#[derive(Parser)]
#[command(name = "netmapd", about = "Storage node netmap membership daemon")]
struct Cli {
    /// Hex-encoded public key identifying this node.
    #[arg(long, env = "NETMAPD_PUBLIC_KEY")]
    public_key: Option<String>,

    /// Address announced to the netmap.
    #[arg(long, env = "NETMAPD_ADDRESS")]
    address: Option<String>,

    /// Node attributes (comma-separated "Key:Value" pairs; `\:` escapes a colon).
    #[arg(long, env = "NETMAPD_ATTRIBUTES", value_delimiter = ',')]
    attributes: Vec<String>,

    /// Re-announce the node every `rebootstrap_interval` epochs ("true" or "false").
    #[arg(long, env = "NETMAPD_REBOOTSTRAP")]
    rebootstrap: Option<bool>,

    /// Epoch modulus for re-announcement.
    #[arg(long, env = "NETMAPD_REBOOTSTRAP_INTERVAL")]
    rebootstrap_interval: Option<u64>,

    /// Disable the RPC server.
    #[arg(long, env = "NETMAPD_DISABLE_RPC")]
    disable_rpc: bool,

    /// RPC server port.
    #[arg(long, env = "NETMAPD_RPC_PORT")]
    rpc_port: Option<u16>,

    /// Seconds between epochs of the dev ledger.
    #[arg(long, env = "NETMAPD_EPOCH_DURATION")]
    epoch_duration: Option<u64>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "NETMAPD_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "NETMAPD_LOG_FORMAT")]
    log_format: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "NETMAPD_CONFIG")]
    config: Option<PathBuf>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Storage node operations.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Run the node.
    Run,
    /// Print the effective configuration as TOML.
    Config,
}

impl Cli {
    /// Layer flags and env vars over `base`.
    fn merge_into(self, base: NodeConfig) -> NodeConfig {
        let mut config = base;
        if let Some(key) = self.public_key {
            config.node.public_key = key;
        }
        if let Some(address) = self.address {
            config.node.address = address;
        }
        if !self.attributes.is_empty() {
            config.node.attributes = self.attributes;
        }
        if let Some(enabled) = self.rebootstrap {
            config.netmap.rebootstrap_enabled = enabled;
        }
        if let Some(interval) = self.rebootstrap_interval {
            config.netmap.rebootstrap_interval = interval;
        }
        if self.disable_rpc {
            config.rpc.enabled = false;
        }
        if let Some(port) = self.rpc_port {
            config.rpc.port = port;
        }
        if let Some(secs) = self.epoch_duration {
            config.dev.epoch_duration_secs = secs;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let base = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(&path.to_string_lossy())
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => NodeConfig::default(),
    };
    let config_path = cli.config.clone();

    let print_config = matches!(
        cli.command,
        Command::Node {
            action: NodeAction::Config
        }
    );

    let config = cli.merge_into(base);

    if print_config {
        print!("{}", config.to_toml_string());
        return Ok(());
    }

    config.validate().context("invalid configuration")?;
    init_logging(config.log_format()?, &config.log_level)?;

    if let Some(path) = config_path {
        tracing::info!("Loaded config from {}", path.display());
    }

    tracing::info!(
        address = %config.node.address,
        rpc = %if config.rpc.enabled { config.rpc.port.to_string() } else { "off".into() },
        rebootstrap = config.netmap.rebootstrap_enabled,
        interval = config.netmap.rebootstrap_interval,
        "starting storage node against the dev ledger"
    );

    let ledger = Arc::new(MemoryLedger::new());
    let notifications = ledger.subscribe();
    let epoch_duration = Duration::from_secs(config.dev.epoch_duration_secs);

    let mut node = StorageNode::new(config, ledger.clone(), notifications)
        .context("wiring storage node")?;
    node.start().await.context("starting storage node")?;

    let shutdown = ShutdownController::new();
    let ticker = tokio::spawn(run_epoch_ticker(
        Arc::clone(&ledger),
        epoch_duration,
        shutdown.subscribe(),
    ));

    run_until_signal(&mut node, &shutdown, ticker, shutdown.wait_for_signal()).await?;

    tracing::info!("netmapd exited cleanly");
    Ok(())
}

/// Wait for `signal`, then stop the ticker and the node. The node is
/// stopped, and so asked to go offline, even if the signal listener fails.
async fn run_until_signal(
    node: &mut StorageNode,
    shutdown: &ShutdownController,
    ticker: JoinHandle<()>,
    signal: impl Future<Output = std::io::Result<()>>,
) -> Result<(), NodeError> {
    match signal.await {
        Ok(()) => tracing::info!("shutdown signal received, stopping node"),
        Err(e) => {
            tracing::error!(error = %e, "could not listen for shutdown signals, stopping node");
            shutdown.shutdown();
        }
    }

    if let Err(e) = ticker.await {
        tracing::warn!(error = %e, "epoch ticker ended abnormally");
    }
    node.stop().await
}

/// Advance the dev ledger's epoch at a fixed period until shutdown.
async fn run_epoch_ticker(
    ledger: Arc<MemoryLedger>,
    period: Duration,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(period);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            _ = interval.tick() => {
                let epoch = ledger.new_epoch();
                tracing::info!(epoch, "dev ledger advanced epoch");
            }
        }
    }
}
