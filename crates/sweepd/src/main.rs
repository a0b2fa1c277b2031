//! sweepd — the nodesweep daemon.
//!
//! Loads settings once, connects to the cluster control plane, and runs
//! the reconciler until Ctrl-C.
//!
//! # Usage
//!
//! ```text
//! sweepd run --config /etc/nodesweep/nodesweep.toml \
//!     --node-type system --cluster-endpoint 10.0.0.4:19080
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info, warn};

use sweep_cluster::HttpClusterClient;
use sweep_core::{NodeIdentity, Settings, TomlConfig};
use sweep_health::HealthBoard;
use sweep_reconcile::Reconciler;

#[derive(Parser)]
#[command(name = "sweepd", about = "nodesweep daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the reconciler until interrupted.
    Run {
        /// Settings file (TOML, `[NodeManagerSettings]` section).
        #[arg(long, default_value = "/etc/nodesweep/nodesweep.toml")]
        config: PathBuf,

        /// Node type this daemon runs on. Nodes of this type are never removed.
        #[arg(long, env = "SWEEP_NODE_TYPE")]
        node_type: String,

        /// Control-plane address (host:port).
        #[arg(long, default_value = "127.0.0.1:19080")]
        cluster_endpoint: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,sweepd=debug,sweep=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            node_type,
            cluster_endpoint,
        } => run(config, node_type, cluster_endpoint).await,
    }
}

async fn run(config: PathBuf, node_type: String, cluster_endpoint: String) -> anyhow::Result<()> {
    info!("nodesweep daemon starting");

    let provider = TomlConfig::from_file(&config)
        .with_context(|| format!("loading settings from {}", config.display()))?;
    let settings = Settings::load(&provider);
    info!(
        path = ?config,
        scan_interval_secs = settings.scan_interval.as_secs(),
        managed_types = ?settings.managed_types.iter().collect::<Vec<_>>(),
        "settings loaded"
    );
    if settings.managed_types.is_empty() {
        warn!("NodeTypesToManage is empty, no nodes will be removed");
    }

    let client = Arc::new(HttpClusterClient::new(cluster_endpoint));
    info!(endpoint = %client.address(), "cluster client initialized");

    let board = Arc::new(HealthBoard::new());
    let identity = Arc::new(NodeIdentity::new(node_type.clone()));
    info!(%node_type, "running on node type");

    let reconciler = Reconciler::new(settings, client, board.clone(), identity);

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let reconcile_handle = tokio::spawn(async move {
        reconciler.run(shutdown_rx).await;
    });

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    if let Err(e) = reconcile_handle.await {
        error!(error = %e, "reconciler task failed");
    }

    info!(
        active_signals = board.active().len(),
        warnings = board.warning_count(),
        "nodesweep daemon stopped"
    );
    Ok(())
}
