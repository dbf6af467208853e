mod auth;
mod client;

pub use auth::CredentialManager;
pub use client::SheetsClient;

use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::redirect::Policy;

#[async_trait]
pub trait SheetSource {
    /// Fetch every row of the named sheet, header row first.
    async fn fetch_values(&self, sheet_name: &str) -> Result<Vec<Vec<String>>>;
}

pub(crate) fn build_http_client() -> Result<reqwest::Client> {
    reqwest::ClientBuilder::new()
        .redirect(Policy::none())
        .build()
        .map_err(|e| AppError::Auth(format!("Failed to build reqwest client: {}", e)))
}
