use crate::config::Config;
use crate::error::Result;
use clap::Subcommand;
use std::path::Path;
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum ShowResource {
    /// Show configuration, credential and output paths
    Paths,
}

impl ShowResource {
    pub async fn execute(&self, config: &Config, config_path: Option<&Path>) -> Result<()> {
        match self {
            ShowResource::Paths => show_paths(config, config_path),
        }
    }
}

fn show_paths(config: &Config, config_path: Option<&Path>) -> Result<()> {
    match config_path {
        Some(path) => info!(path = ?path, "Config path"),
        None => info!("No config file found, using defaults"),
    }
    info!(path = ?config.client_secret_path(), "Client secret path");
    info!(path = ?config.token_path(), "Token path");
    info!(path = ?config.output_dir(), "Output directory");

    Ok(())
}
