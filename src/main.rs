//! Argus - autonomous multi-agent token-risk runtime
//!
//! Entry point: loads configuration, wires the coordinator with its
//! collaborators, runs until interrupted, and shuts the agent pools down
//! cooperatively.

use anyhow::{Context, Result};
use argus::coordinator::Coordinator;
use argus::external::store::{PositionStore, SledStore};
use argus::external::{ChainClient, SimulatedChainClient};
use argus::AppConfig;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Operating mode (simulation or live)
    #[arg(short, long, default_value = "simulation")]
    mode: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    info!("🚀 starting argus agent runtime");
    info!("version: {}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    let chain: Arc<dyn ChainClient> = match args.mode.as_str() {
        "simulation" => Arc::new(SimulatedChainClient::new()),
        "live" | "production" => {
            anyhow::bail!(
                "live mode needs an RPC-backed ChainClient wired in; \
                 this build ships the simulation client only"
            );
        }
        other => {
            warn!("unknown mode '{other}', defaulting to simulation");
            Arc::new(SimulatedChainClient::new())
        }
    };

    let store: Option<Arc<dyn PositionStore>> = match &config.database {
        Some(database) => {
            let sled = SledStore::open(&database.path)
                .with_context(|| format!("opening store at {}", database.path))?;
            info!("📦 persistence store at {}", database.path);
            Some(Arc::new(sled))
        }
        None => {
            info!("no database configured, running memory-only");
            None
        }
    };

    let mut coordinator = Coordinator::new(config, chain).with_store(store);
    coordinator.start().await?;

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("shutdown signal received");

    coordinator.stop().await;
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(path: &str) -> Result<AppConfig> {
    if std::path::Path::new(path).exists() {
        info!("📋 loading configuration from {path}");
        AppConfig::from_file_with_env(path)
    } else {
        warn!("config file {path} not found, using defaults");
        Ok(AppConfig::default())
    }
}
