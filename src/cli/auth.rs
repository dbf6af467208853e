use crate::config::Config;
use crate::error::Result;
use crate::sheets::CredentialManager;
use tracing::info;

pub async fn execute(config: Config, reset: bool) -> Result<()> {
    config.validate()?;
    let manager = CredentialManager::from_config(&config)?;

    if reset {
        manager.clear_tokens()?;
    }

    manager.ensure_valid_credentials().await?;

    info!(path = ?manager.token_path(), "Google Sheets authentication verified");

    Ok(())
}
