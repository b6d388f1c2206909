//! AgentSpace Console Server - Entry Point
//!
//! This binary serves the agent console page and its JSON API.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use agentspace_core::config::{Config, LogFormat, Overrides};
use agentspace_core::server;

/// Web console for the agents of Google AgentSpace apps.
#[derive(Debug, Parser)]
#[command(name = "agentspace-server", version, about)]
struct Args {
    /// TOML configuration file (defaults to ./agentspace.toml when present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Port to listen on, overriding configuration and PORT
    #[arg(short, long)]
    port: Option<u16>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "agentspace_core=debug,agentspace_registry=debug,info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let overrides = Overrides { config_file: args.config.as_deref(), port: args.port };
    let config = Config::load(&overrides).context("Failed to load configuration")?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    init_tracing(config.logging.format);
    info!(backend = ?config.backend, "Starting AgentSpace console");

    let state = server::build_state(&config).await.context("Failed to initialize registry")?;
    server::run(&config, state).await.context("Server error")?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        // Configuration errors happen before tracing is initialized.
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
