//! assethub-server - self-hosted asset application server

use anyhow::{Context, Result};
use assethub_core::Config;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "assethub-server", about = "Self-hosted asset application server")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(default_value = "assethub.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_from(&cli.config).context("failed to load configuration")?;

    assethub_core::logging::init(&config.log);

    tracing::info!(
        config = %cli.config.display(),
        "assethub application server starting"
    );

    assethub_server::run(config).await
}
