//! noc-relay binary entry point.
//!
//! Usage:
//! ```bash
//! noc-relay --config hub.toml
//! RELAY_PUBLIC_HOST=relay.example.net RELAY_UDP_PORT=19140 noc-relay
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use noc_hub_server::config::Config;
use noc_hub_server::{init_logging, relay};
use std::path::PathBuf;

/// Session relay and UDP forwarder for NocLauncher multiplayer.
#[derive(Parser, Debug)]
#[command(name = "noc-relay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML configuration file; environment variables override it
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Default log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let running = relay::start(config).await.context("Failed to start relay")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    running.stop().await.context("Failed to stop relay")?;
    Ok(())
}
