use super::SheetSource;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::Credentials;
use crate::sheets::auth::{Authorizer, CredentialManager, LocalServerAuthorizer};
use async_trait::async_trait;
use google_sheets4::api::ValueRange;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};
use url::Url;

/// Read-only client for the Sheets v4 values endpoint. Credentials are
/// obtained on the first request and held for the lifetime of the client.
pub struct SheetsClient<A> {
    http_client: reqwest::Client,
    api_base_url: String,
    spreadsheet_id: String,
    credential_manager: CredentialManager<A>,
    credentials: OnceCell<Credentials>,
}

impl SheetsClient<LocalServerAuthorizer> {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = super::build_http_client()?;
        let authorizer = LocalServerAuthorizer::new(http_client.clone());
        Ok(Self::with_authorizer(config, authorizer, http_client))
    }
}

impl<A> SheetsClient<A>
where
    A: Authorizer + Send + Sync,
{
    pub fn with_authorizer(config: &Config, authorizer: A, http_client: reqwest::Client) -> Self {
        Self {
            credential_manager: CredentialManager::new(config, authorizer, http_client.clone()),
            http_client,
            api_base_url: config.sheet.api_base_url.clone(),
            spreadsheet_id: config.sheet.spreadsheet_id.clone(),
            credentials: OnceCell::new(),
        }
    }

    pub fn spreadsheet_url(&self) -> String {
        format!("https://docs.google.com/spreadsheets/d/{}", self.spreadsheet_id)
    }

    async fn access_token(&self) -> Result<&str> {
        let credentials = self
            .credentials
            .get_or_try_init(|| self.credential_manager.ensure_valid_credentials())
            .await?;
        Ok(&credentials.token)
    }

    fn values_url(&self, range: &str) -> Result<Url> {
        let mut url = Url::parse(&self.api_base_url)
            .map_err(|e| AppError::Config(format!("Invalid API base URL: {}", e)))?;

        url.path_segments_mut()
            .map_err(|_| AppError::Config("API base URL cannot have a path".to_string()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", range]);

        Ok(url)
    }
}

#[async_trait]
impl<A> SheetSource for SheetsClient<A>
where
    A: Authorizer + Send + Sync,
{
    #[instrument(name = "Fetching sheet", skip(self))]
    async fn fetch_values(&self, sheet_name: &str) -> Result<Vec<Vec<String>>> {
        let access_token = self.access_token().await?;
        let url = self.values_url(sheet_name)?;

        let response = self
            .http_client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Api(format!(
                "Failed to read sheet '{}': {} - {}",
                sheet_name, status, body
            )));
        }

        let value_range: ValueRange = response.json().await?;
        let values: Vec<Vec<String>> = value_range
            .values
            .unwrap_or_default()
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect();
        debug!(rows = values.len(), "Fetched sheet values");

        Ok(values)
    }
}

/// Cells arrive as JSON values; strings are taken as-is and empty cells
/// become empty strings.
fn cell_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
