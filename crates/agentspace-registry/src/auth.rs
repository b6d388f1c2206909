//! OAuth2 access tokens for Google Cloud APIs.
//!
//! Four sources are supported:
//! - Application Default Credentials: a service-account key file, the
//!   gcloud application-default login, then the metadata server
//! - the GCE / Cloud Run metadata server alone
//! - the `gcloud` CLI (local development)
//! - a fixed token supplied through configuration

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use agentspace_abstraction::RegistryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gcp_auth::TokenProvider as _;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, warn};

/// Default base URL of the metadata server.
pub const METADATA_BASE_URL: &str = "http://metadata.google.internal/computeMetadata/v1";

/// Scope requested for Application Default Credentials.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// `gcloud` does not report a lifetime; its tokens last an hour.
const GCLOUD_TOKEN_LIFETIME_SECS: i64 = 45 * 60;

/// Errors raised while obtaining credentials.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The metadata server could not be reached or answered with an error.
    #[error("Metadata server error: {0}")]
    Metadata(String),

    /// The `gcloud` CLI failed or is not installed.
    #[error("gcloud error: {0}")]
    Gcloud(String),

    /// Application Default Credentials could not be found or used.
    #[error("Application Default Credentials error: {0}")]
    Adc(String),

    /// No usable token was configured.
    #[error("No access token configured")]
    MissingToken,
}

impl From<AuthError> for RegistryError {
    fn from(err: AuthError) -> Self {
        RegistryError::Auth(err.to_string())
    }
}

/// A source of bearer tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a token valid for at least the next minute.
    async fn access_token(&self) -> Result<String, AuthError>;

    /// Project the credentials belong to, when the source knows it.
    async fn project_id(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Utc::now() + chrono::Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

async fn cached_or_refresh<F, Fut>(
    cache: &RwLock<Option<CachedToken>>,
    refresh: F,
) -> Result<String, AuthError>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<CachedToken, AuthError>>,
{
    if let Some(cached) = cache.read().await.as_ref().filter(|c| c.is_fresh()) {
        return Ok(cached.token.clone());
    }

    let mut guard = cache.write().await;
    // Another request may have refreshed while we waited for the lock.
    if let Some(cached) = guard.as_ref().filter(|c| c.is_fresh()) {
        return Ok(cached.token.clone());
    }
    let fresh = refresh().await?;
    let token = fresh.token.clone();
    *guard = Some(fresh);
    Ok(token)
}

#[derive(Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Token provider backed by the instance metadata server.
pub struct MetadataTokenProvider {
    http_client: Client,
    base_url: String,
    cache: RwLock<Option<CachedToken>>,
}

impl MetadataTokenProvider {
    /// Creates a provider talking to the standard metadata endpoint.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(METADATA_BASE_URL.to_string())
    }

    /// Creates a provider talking to a custom metadata endpoint.
    #[must_use]
    pub fn with_base_url(base_url: String) -> Self {
        Self { http_client: Client::new(), base_url, cache: RwLock::new(None) }
    }

    async fn fetch(&self) -> Result<CachedToken, AuthError> {
        let url = format!("{}/instance/service-accounts/default/token", self.base_url);
        debug!(%url, "Requesting access token from metadata server");

        let response = self
            .http_client
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| AuthError::Metadata(format!("Failed to request token: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Metadata(format!("Token request returned {status}")));
        }

        let body: MetadataTokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Metadata(format!("Failed to parse token response: {e}")))?;

        Ok(CachedToken {
            token: body.access_token,
            expires_at: Utc::now() + chrono::Duration::seconds(body.expires_in),
        })
    }
}

impl Default for MetadataTokenProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenProvider for MetadataTokenProvider {
    async fn access_token(&self) -> Result<String, AuthError> {
        cached_or_refresh(&self.cache, || self.fetch()).await
    }
}

/// Token provider that shells out to `gcloud auth print-access-token`.
pub struct GcloudTokenProvider {
    program: String,
    cache: RwLock<Option<CachedToken>>,
}

impl GcloudTokenProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::with_program("gcloud".to_string())
    }

    /// Uses a different executable in place of `gcloud`.
    #[must_use]
    pub fn with_program(program: String) -> Self {
        Self { program, cache: RwLock::new(None) }
    }

    async fn fetch(&self) -> Result<CachedToken, AuthError> {
        debug!(program = %self.program, "Requesting access token from gcloud");

        let output = Command::new(&self.program)
            .args(["auth", "print-access-token"])
            .output()
            .await
            .map_err(|e| AuthError::Gcloud(format!("Failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = ?output.status, "gcloud auth print-access-token failed");
            return Err(AuthError::Gcloud(stderr.trim().to_string()));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(AuthError::Gcloud("gcloud printed an empty token".to_string()));
        }

        Ok(CachedToken {
            token,
            expires_at: Utc::now() + chrono::Duration::seconds(GCLOUD_TOKEN_LIFETIME_SECS),
        })
    }
}

impl Default for GcloudTokenProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenProvider for GcloudTokenProvider {
    async fn access_token(&self) -> Result<String, AuthError> {
        cached_or_refresh(&self.cache, || self.fetch()).await
    }
}

/// Token provider backed by Application Default Credentials.
///
/// Looks for `GOOGLE_APPLICATION_CREDENTIALS`, then the gcloud
/// application-default login, then the metadata server. The chain is
/// resolved on first use, so the server starts even without credentials.
/// Token caching is done by `gcp_auth`.
pub struct AdcTokenProvider {
    /// Service-account key file used instead of the discovery chain.
    key_file: Option<PathBuf>,
    inner: OnceCell<Arc<dyn gcp_auth::TokenProvider>>,
}

impl AdcTokenProvider {
    #[must_use]
    pub fn new() -> Self {
        Self { key_file: None, inner: OnceCell::new() }
    }

    /// Uses the service-account key at `path` only.
    #[must_use]
    pub fn with_key_file(path: impl Into<PathBuf>) -> Self {
        Self { key_file: Some(path.into()), inner: OnceCell::new() }
    }

    async fn provider(&self) -> Result<&Arc<dyn gcp_auth::TokenProvider>, AuthError> {
        self.inner
            .get_or_try_init(|| async {
                let provider: Arc<dyn gcp_auth::TokenProvider> = match &self.key_file {
                    Some(path) => {
                        let account =
                            gcp_auth::CustomServiceAccount::from_file(path).map_err(|e| {
                                let path = path.display();
                                AuthError::Adc(format!("Failed to load key file {path}: {e}"))
                            })?;
                        Arc::new(account)
                    }
                    None => gcp_auth::provider()
                        .await
                        .map_err(|e| AuthError::Adc(format!("No credentials found: {e}")))?,
                };
                info!(key_file = ?self.key_file, "Application Default Credentials resolved");
                Ok::<_, AuthError>(provider)
            })
            .await
    }
}

impl Default for AdcTokenProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenProvider for AdcTokenProvider {
    async fn access_token(&self) -> Result<String, AuthError> {
        let token = self
            .provider()
            .await?
            .token(&[CLOUD_PLATFORM_SCOPE])
            .await
            .map_err(|e| AuthError::Adc(format!("Failed to obtain token: {e}")))?;
        Ok(token.as_str().to_string())
    }

    async fn project_id(&self) -> Option<String> {
        let provider = self.provider().await.ok()?;
        match provider.project_id().await {
            Ok(project_id) => Some(project_id.to_string()),
            Err(e) => {
                debug!(error = %e, "Credentials do not name a project");
                None
            }
        }
    }
}

/// Token provider returning a fixed token.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, AuthError> {
        if self.token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        Ok(self.token.clone())
    }
}

/// Asks the metadata server which project this instance runs in.
///
/// `base_url` defaults to [`METADATA_BASE_URL`] when `None`.
pub async fn fetch_project_id(base_url: Option<&str>) -> Result<String, AuthError> {
    let url = format!("{}/project/project-id", base_url.unwrap_or(METADATA_BASE_URL));

    let client = Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(|e| AuthError::Metadata(format!("Failed to build HTTP client: {e}")))?;

    let response = client
        .get(&url)
        .header("Metadata-Flavor", "Google")
        .send()
        .await
        .map_err(|e| AuthError::Metadata(format!("Failed to fetch project ID: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AuthError::Metadata(format!("Project ID request returned {status}")));
    }

    let project_id = response
        .text()
        .await
        .map_err(|e| AuthError::Metadata(format!("Failed to read project ID: {e}")))?
        .trim()
        .to_string();

    if project_id.is_empty() {
        return Err(AuthError::Metadata("Metadata server returned an empty project ID".to_string()));
    }
    Ok(project_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token_provider() {
        let provider = StaticTokenProvider::new("abc");
        assert_eq!(provider.access_token().await.unwrap(), "abc");

        let empty = StaticTokenProvider::new("");
        assert!(matches!(empty.access_token().await, Err(AuthError::MissingToken)));
    }

    #[tokio::test]
    async fn test_metadata_token_is_cached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/instance/service-accounts/default/token")
            .match_header("metadata-flavor", "Google")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "ya29.token", "expires_in": 3599, "token_type": "Bearer"}"#)
            .expect(1)
            .create_async()
            .await;

        let provider = MetadataTokenProvider::with_base_url(server.url());
        assert_eq!(provider.access_token().await.unwrap(), "ya29.token");
        assert_eq!(provider.access_token().await.unwrap(), "ya29.token");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_metadata_token_refreshes_when_nearly_expired() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/instance/service-accounts/default/token")
            .with_status(200)
            .with_body(r#"{"access_token": "short-lived", "expires_in": 30}"#)
            .expect(2)
            .create_async()
            .await;

        let provider = MetadataTokenProvider::with_base_url(server.url());
        provider.access_token().await.unwrap();
        provider.access_token().await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_metadata_token_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/instance/service-accounts/default/token")
            .with_status(404)
            .create_async()
            .await;

        let provider = MetadataTokenProvider::with_base_url(server.url());
        let err = provider.access_token().await.unwrap_err();
        assert!(matches!(err, AuthError::Metadata(_)));

        let registry_err: RegistryError = err.into();
        assert_eq!(registry_err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_fetch_project_id() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/project/project-id")
            .match_header("metadata-flavor", "Google")
            .with_status(200)
            .with_body("my-project\n")
            .create_async()
            .await;

        let project = fetch_project_id(Some(&server.url())).await.unwrap();
        assert_eq!(project, "my-project");
    }

    #[tokio::test]
    async fn test_gcloud_missing_binary() {
        let provider = GcloudTokenProvider::with_program("definitely-not-gcloud-xyz".to_string());
        assert!(matches!(provider.access_token().await, Err(AuthError::Gcloud(_))));
    }

    #[tokio::test]
    async fn test_adc_missing_key_file() {
        let provider = AdcTokenProvider::with_key_file("/nonexistent/agentspace-key.json");
        let err = provider.access_token().await.unwrap_err();
        assert!(matches!(err, AuthError::Adc(_)));
        assert!(err.to_string().contains("/nonexistent/agentspace-key.json"));

        let registry_err: RegistryError = err.into();
        assert_eq!(registry_err.status_code(), 500);
        assert_eq!(provider.project_id().await, None);
    }

    #[tokio::test]
    async fn test_adc_malformed_key_file() {
        let file_name = format!("agentspace-bad-key-{}.json", std::process::id());
        let path = std::env::temp_dir().join(file_name);
        std::fs::write(&path, r#"{"type": "service_account"}"#).unwrap();

        let provider = AdcTokenProvider::with_key_file(&path);
        let result = provider.access_token().await;
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(AuthError::Adc(_))));
    }

    #[tokio::test]
    async fn test_other_providers_do_not_name_a_project() {
        assert_eq!(StaticTokenProvider::new("abc").project_id().await, None);
    }
}
