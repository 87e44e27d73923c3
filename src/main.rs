//! CLI entry point for review-trends.

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

mod app_config;
mod cli;
mod config_runtime;
mod progress;
mod runtime;

use cli::Args;
use config_runtime::RunSettings;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let loaded = app_config::load_default_file_config()?;

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config verbosity > info
    let default_level = config_runtime::default_log_level(&args, loaded.config.as_ref());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, config = ?loaded.path, "CLI arguments parsed");
    info!("review-trends starting");

    let settings = RunSettings::resolve(&args, loaded.config.as_ref());
    runtime::run(settings, args.quiet).await
}
