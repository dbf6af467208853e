mod cli;
mod config;
mod error;
mod export;
mod models;
mod sheets;

use clap::Parser;

use crate::cli::{Cli, exit_code};
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() {
    // Initialize logging
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = cli.run().await;
    if let Err(e) = &result {
        error!("Failed to download Google Sheet: {}", e);
    }

    let code = exit_code(&result, cli.ignore_failure);
    if code != 0 {
        std::process::exit(code);
    }
}
