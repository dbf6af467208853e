mod auth;
mod export;
mod show;

use crate::config::Config;
use crate::error::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use export::ExportArgs;
pub use show::ShowResource;

#[derive(Parser, Debug)]
#[command(name = "gsheet-export")]
#[command(about = "Download a Google Sheets tab as a CSV file", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory that secrets and output paths are relative to
    #[arg(long, global = true, default_value = ".")]
    pub project_root: PathBuf,

    /// Exit with status 0 even if the run fails
    #[arg(long, global = true)]
    pub ignore_failure: bool,

    /// Defaults to `export`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        config.project_root = self.project_root.clone();
        Ok(config)
    }

    /// The config file this run reads: `--config` if given, otherwise the
    /// XDG file when one exists.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(Config::find_config_file)
    }

    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;

        match &self.command {
            None => ExportArgs::default().execute(config).await,
            Some(Commands::Export(args)) => args.execute(config).await,
            Some(Commands::Auth { reset }) => auth::execute(config, *reset).await,
            Some(Commands::Show { resource }) => {
                resource
                    .execute(&config, self.config_path().as_deref())
                    .await
            }
        }
    }
}

/// Process exit status for a finished run.
pub fn exit_code(result: &Result<()>, ignore_failure: bool) -> i32 {
    match result {
        Err(_) if !ignore_failure => 1,
        _ => 0,
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download the configured sheet to CSV
    Export(ExportArgs),

    /// Obtain or refresh Google credentials without exporting
    Auth {
        /// Delete cached tokens first
        #[arg(long)]
        reset: bool,
    },

    Show {
        #[command(subcommand)]
        resource: ShowResource,
    },
}
