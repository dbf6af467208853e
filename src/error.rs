use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(
        "Client secret file not found at {0:?}. Please place your 'credentials_gsheet.json' file there."
    )]
    MissingCredentialsFile(PathBuf),

    #[error("Google Sheets API error: {0}")]
    Api(String),

    #[error("OAuth2 authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// True when the provider rejected the request, as opposed to a local failure.
    pub fn is_api(&self) -> bool {
        matches!(self, AppError::Api(_))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
