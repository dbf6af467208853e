use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::Credentials;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
    basic::{BasicClient, BasicTokenResponse},
};
use std::fs;
use std::path::{Path, PathBuf};
use tiny_http::{Response, Server, StatusCode};
use tracing::{debug, error, info, instrument, warn};
use url::Url;
use yup_oauth2::ApplicationSecret;

// Port 0 lets the OS pick a free port for the callback listener.
const LOOPBACK_ADDR: &str = "127.0.0.1:0";

// Used when the provider omits expires_in.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Human-in-the-loop authorization step that turns a client secret into
/// user credentials.
#[async_trait]
pub trait Authorizer {
    async fn authorize(&self, secret: &ApplicationSecret, scopes: &[String])
    -> Result<Credentials>;
}

/// Installed-app consent flow: prints the authorization URL and waits for
/// the browser to be redirected to a loopback listener.
pub struct LocalServerAuthorizer {
    http_client: reqwest::Client,
}

impl LocalServerAuthorizer {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl Authorizer for LocalServerAuthorizer {
    #[instrument(name = "Running consent flow", skip_all)]
    async fn authorize(
        &self,
        secret: &ApplicationSecret,
        scopes: &[String],
    ) -> Result<Credentials> {
        let server = Server::http(LOOPBACK_ADDR)
            .map_err(|e| AppError::Auth(format!("Failed to bind to {}: {}", LOOPBACK_ADDR, e)))?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .ok_or_else(|| AppError::Auth("Callback listener has no IP address".to_string()))?;

        let auth_url = AuthUrl::new(secret.auth_uri.clone())
            .map_err(|e| AppError::Auth(format!("Invalid auth URL: {}", e)))?;
        let token_url = TokenUrl::new(secret.token_uri.clone())
            .map_err(|e| AppError::Auth(format!("Invalid token URL: {}", e)))?;
        let redirect_url = RedirectUrl::new(format!("http://localhost:{}/", port))
            .map_err(|e| AppError::Auth(format!("Invalid redirect URL: {}", e)))?;

        let client = BasicClient::new(ClientId::new(secret.client_id.clone()))
            .set_client_secret(ClientSecret::new(secret.client_secret.clone()))
            .set_auth_type(AuthType::RequestBody)
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url);

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, csrf_token) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(scopes.iter().cloned().map(Scope::new))
            .set_pkce_challenge(pkce_challenge)
            .add_extra_param("access_type", "offline")
            .url();

        println!("Please visit this URL to authorize this application:\n{}", auth_url);
        println!();
        println!("Waiting for authorization...");

        let code = wait_for_code(server, csrf_token.secret())?;

        let token_result = client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&self.http_client)
            .await
            .map_err(|e| AppError::Auth(format!("Failed to exchange code: {:?}", e)))?;

        let base = Credentials {
            token: String::new(),
            refresh_token: None,
            token_uri: secret.token_uri.clone(),
            client_id: secret.client_id.clone(),
            client_secret: secret.client_secret.clone(),
            scopes: scopes.to_vec(),
            expiry: None,
        };
        let credentials = apply_token_response(base, &token_result);
        if credentials.refresh_token().is_none() {
            warn!("Provider did not return a refresh token; re-consent will be needed on expiry");
        }

        Ok(credentials)
    }
}

/// Block until the browser is redirected back with an authorization code.
fn wait_for_code(server: Server, expected_state: &str) -> Result<String> {
    loop {
        let request = server
            .recv()
            .map_err(|e| AppError::Auth(format!("Failed to receive request: {}", e)))?;

        let callback = parse_callback(request.url(), expected_state);
        let message = match &callback {
            Ok(None) => {
                // Browsers also ask for things like /favicon.ico
                let _ = request.respond(Response::empty(StatusCode(404)));
                continue;
            }
            Ok(Some(_)) => "The authentication flow has completed. You may close this window.",
            Err(_) => "Authentication failed. Check the terminal for details.",
        };
        request
            .respond(Response::from_string(message))
            .map_err(|e| AppError::Auth(format!("Failed to send response: {}", e)))?;

        if let Some(code) = callback? {
            return Ok(code);
        }
    }
}

/// Extract the authorization code from a loopback callback path.
///
/// Returns `Ok(None)` for requests that carry neither a code nor an error.
fn parse_callback(path: &str, expected_state: &str) -> Result<Option<String>> {
    let url = Url::parse(&format!("http://localhost{}", path))
        .map_err(|e| AppError::Auth(format!("Failed to parse callback URL: {}", e)))?;

    let param = |name: &str| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };

    if let Some(err) = param("error") {
        return Err(AppError::Auth(format!("Authorization denied: {}", err)));
    }

    let Some(code) = param("code") else {
        return Ok(None);
    };

    let state = param("state").ok_or_else(|| AppError::Auth("No state in callback".to_string()))?;
    if state != expected_state {
        return Err(AppError::Auth("CSRF token mismatch".to_string()));
    }

    Ok(Some(code))
}

/// Merge a token endpoint response into `base`, keeping the refresh token and
/// scopes from `base` when the provider leaves them out.
fn apply_token_response(base: Credentials, response: &BasicTokenResponse) -> Credentials {
    let expires_in = response
        .expires_in()
        .map(|d| d.as_secs() as i64)
        .unwrap_or(DEFAULT_EXPIRES_IN_SECS);

    Credentials {
        token: response.access_token().secret().clone(),
        refresh_token: response
            .refresh_token()
            .map(|t| t.secret().clone())
            .or(base.refresh_token),
        scopes: response
            .scopes()
            .map(|scopes| scopes.iter().map(|s| s.as_str().to_string()).collect())
            .unwrap_or(base.scopes),
        expiry: Some(Utc::now() + Duration::seconds(expires_in)),
        ..base
    }
}

fn read_client_secret(path: &Path) -> Result<ApplicationSecret> {
    let contents = fs::read(path)
        .map_err(|e| AppError::Auth(format!("Failed to read client secret file: {}", e)))?;

    yup_oauth2::parse_application_secret(contents)
        .map_err(|e| AppError::Auth(format!("Failed to parse client secret file: {}", e)))
}

/// Owns the cached token file and decides between reuse, silent refresh and
/// the interactive consent flow.
pub struct CredentialManager<A> {
    authorizer: A,
    http_client: reqwest::Client,
    client_secret_path: PathBuf,
    token_path: PathBuf,
    scopes: Vec<String>,
}

impl CredentialManager<LocalServerAuthorizer> {
    pub fn from_config(config: &Config) -> Result<Self> {
        let http_client = super::build_http_client()?;
        let authorizer = LocalServerAuthorizer::new(http_client.clone());
        Ok(Self::new(config, authorizer, http_client))
    }
}

impl<A> CredentialManager<A>
where
    A: Authorizer + Sync,
{
    pub fn new(config: &Config, authorizer: A, http_client: reqwest::Client) -> Self {
        Self {
            authorizer,
            http_client,
            client_secret_path: config.client_secret_path(),
            token_path: config.token_path(),
            scopes: config.auth.scopes.clone(),
        }
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    /// Get valid credentials, refreshing or running the consent flow as needed.
    /// Only new or refreshed credentials are written back to the token file.
    #[instrument(name = "Authenticating to Google Sheets", skip_all)]
    pub async fn ensure_valid_credentials(&self) -> Result<Credentials> {
        info!("Authenticating with Google Sheets API...");

        if let Some(cached) = Credentials::load(&self.token_path)? {
            if !cached.covers(&self.scopes) {
                warn!(granted = ?cached.scopes, "Cached token does not cover the requested scopes");
            } else if cached.is_valid() {
                debug!("Using cached Google tokens");
                info!("Authentication successful.");
                return Ok(cached);
            } else if let Some(refresh_token) = cached.refresh_token() {
                info!("Credentials expired. Refreshing token...");
                let refreshed = self.refresh(&cached, refresh_token).await?;
                return self.persist(refreshed);
            }
        }

        info!("No valid credentials found. Starting authentication flow...");
        if !self.client_secret_path.exists() {
            error!(path = ?self.client_secret_path, "Credentials file not found");
            return Err(AppError::MissingCredentialsFile(
                self.client_secret_path.clone(),
            ));
        }

        let secret = read_client_secret(&self.client_secret_path)?;
        let credentials = self.authorizer.authorize(&secret, &self.scopes).await?;
        self.persist(credentials)
    }

    async fn refresh(&self, cached: &Credentials, refresh_token: &str) -> Result<Credentials> {
        let token_url = TokenUrl::new(cached.token_uri.clone())
            .map_err(|e| AppError::Auth(format!("Invalid token URL: {}", e)))?;

        let client = BasicClient::new(ClientId::new(cached.client_id.clone()))
            .set_client_secret(ClientSecret::new(cached.client_secret.clone()))
            .set_auth_type(AuthType::RequestBody)
            .set_token_uri(token_url);

        let token_result = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| AppError::Auth(format!("Failed to refresh token: {:?}", e)))?;

        Ok(apply_token_response(cached.clone(), &token_result))
    }

    fn persist(&self, credentials: Credentials) -> Result<Credentials> {
        credentials.save(&self.token_path)?;
        info!(path = ?self.token_path, "Credentials saved");
        info!("Authentication successful.");
        Ok(credentials)
    }

    /// Clear cached Google tokens by deleting the token file
    #[instrument(name = "Clearing auth tokens for Google Sheets", skip_all)]
    pub fn clear_tokens(&self) -> Result<()> {
        if !self.token_path.exists() {
            debug!("No Google Sheets tokens to clear");
            return Ok(());
        }

        fs::remove_file(&self.token_path)
            .map_err(|e| AppError::Auth(format!("Failed to delete tokens file: {}", e)))?;
        info!("Cleared Google Sheets cached tokens");

        Ok(())
    }
}
