//! Quorumkeeper coordinator CLI.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quorumkeeper_service::ServiceConfig;
use quorumkeeper_store::InMemoryStore;

/// Quorumkeeper - an operator-free failover coordinator for replicated
/// database nodes.
#[derive(Parser)]
#[command(name = "quorumkeeper")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file without starting the coordinator.
    Validate {
        /// Path to the quorumkeeper.toml configuration file.
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Start the coordinator service.
    Serve {
        /// Path to the quorumkeeper.toml configuration file.
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Validate { config } => validate(&config),
        Commands::Serve { config } => {
            let runtime = tokio::runtime::Runtime::new().context("failed to start the async runtime")?;
            runtime.block_on(serve(&config))
        }
    }
}

fn validate(path: &PathBuf) -> Result<()> {
    let config = ServiceConfig::load(path).context("failed to load configuration")?;
    println!("{} formation(s) configured, binding {}", config.formations.len(), config.bind_address);
    Ok(())
}

/// Boots an in-process store seeded from configuration and idles. The
/// report-ingress transport and durable backend (spec.md §1's
/// out-of-scope list) are left for the deployment that wires this
/// binary up to a real network listener and storage engine.
async fn serve(path: &PathBuf) -> Result<()> {
    let config = ServiceConfig::load(path).context("failed to load configuration")?;
    let store = Arc::new(InMemoryStore::new());
    for formation in &config.formations {
        store.seed_formation(formation.to_record());
    }
    tracing::info!(
        formations = config.formations.len(),
        bind_address = %config.bind_address,
        "coordinator ready"
    );

    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    tracing::info!("shutting down");
    Ok(())
}
