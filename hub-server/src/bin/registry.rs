//! noc-registry binary entry point.
//!
//! Usage:
//! ```bash
//! noc-registry --config hub.toml
//! PORT=9000 ROOM_TTL_MS=30000 noc-registry
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use noc_hub_server::config::Config;
use noc_hub_server::{init_logging, registry};
use std::path::PathBuf;

/// Room registry for NocLauncher multiplayer.
#[derive(Parser, Debug)]
#[command(name = "noc-registry")]
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
    let running = registry::start(config)
        .await
        .context("Failed to start registry")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    running.stop().await.context("Failed to stop registry")?;
    Ok(())
}
