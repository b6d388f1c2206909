//! Configuration for the AgentSpace console server.
//!
//! Values are layered, later sources winning:
//!
//! 1. built-in defaults
//! 2. an optional TOML file (`agentspace.toml` unless `--config` names another)
//! 3. `AGENTSPACE__SECTION__KEY` environment variables
//! 4. the deployment variables `GOOGLE_CLOUD_PROJECT`, `PORT`,
//!    `DISCOVERY_ENGINE_LOCATION`, `DISCOVERY_ENGINE_COLLECTION_ID` and
//!    `REASONING_ENGINE_LOCATION`
//! 5. command-line flags

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use agentspace_registry::GoogleSettings;
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "agentspace.toml";

/// Prefix of structured environment overrides.
const ENV_PREFIX: &str = "AGENTSPACE";

/// Deployment variables and the keys they override.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("GOOGLE_CLOUD_PROJECT", "google.project_id"),
    ("PORT", "server.port"),
    ("DISCOVERY_ENGINE_LOCATION", "google.discovery_location"),
    ("DISCOVERY_ENGINE_COLLECTION_ID", "google.collection_id"),
    ("REASONING_ENGINE_LOCATION", "google.reasoning_engine_location"),
];

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

impl ServerConfig {
    /// Socket address built from `host` and `port`.
    pub fn address(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ServerError::InvalidAddress(addr))
    }
}

/// Google Cloud project, locations and endpoint overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// Project whose apps are listed. Asked from the metadata server when unset.
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_discovery_location")]
    pub discovery_location: String,
    #[serde(default = "default_collection_id")]
    pub collection_id: String,
    #[serde(default = "default_reasoning_engine_location")]
    pub reasoning_engine_location: String,
    /// Replaces the Discovery Engine base URL.
    #[serde(default)]
    pub discovery_endpoint: Option<String>,
    /// Replaces the Vertex AI base URL.
    #[serde(default)]
    pub vertex_endpoint: Option<String>,
    /// Replaces the metadata server base URL.
    #[serde(default)]
    pub metadata_endpoint: Option<String>,
}

fn default_discovery_location() -> String {
    "global".to_string()
}

fn default_collection_id() -> String {
    "default_collection".to_string()
}

fn default_reasoning_engine_location() -> String {
    "us-central1".to_string()
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            discovery_location: default_discovery_location(),
            collection_id: default_collection_id(),
            reasoning_engine_location: default_reasoning_engine_location(),
            discovery_endpoint: None,
            vertex_endpoint: None,
            metadata_endpoint: None,
        }
    }
}

/// Where access tokens come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Application Default Credentials: `GOOGLE_APPLICATION_CREDENTIALS`, the
    /// gcloud application-default login, then the metadata server.
    #[default]
    Adc,
    /// The GCE / Cloud Run metadata server.
    Metadata,
    /// `gcloud auth print-access-token`.
    Gcloud,
    /// The token set in `auth.token`.
    Static,
}

/// Credential configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,
    /// Access token for `mode = "static"`.
    #[serde(default)]
    pub token: Option<String>,
    /// Service-account key for `mode = "adc"`, used instead of the lookup chain.
    #[serde(default)]
    pub key_file: Option<String>,
}

/// Outbound HTTP settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Per-request timeout in seconds; none when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Registry implementation behind the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Discovery Engine and Vertex AI.
    #[default]
    Google,
    /// In-process registry, for working on the page without a project.
    Memory,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

/// Command-line values that override every other source.
#[derive(Debug, Clone, Default)]
pub struct Overrides<'a> {
    /// Config file to read instead of [`DEFAULT_CONFIG_FILE`].
    pub config_file: Option<&'a Path>,
    pub port: Option<u16>,
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the configuration from the file, the process environment and `overrides`.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or a value has the wrong type.
    pub fn load(overrides: &Overrides<'_>) -> Result<Self> {
        Self::load_with_env(overrides, std::env::vars().collect())
    }

    /// Same as [`Config::load`] with an explicit environment.
    pub fn load_with_env(overrides: &Overrides<'_>, env: HashMap<String, String>) -> Result<Self> {
        let file = match overrides.config_file {
            Some(path) => File::from(path).format(FileFormat::Toml).required(true),
            None => File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
        };

        let structured = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .source(Some(env.clone()));

        let mut builder = config::Config::builder().add_source(file).add_source(structured);

        for (var, key) in LEGACY_ENV {
            let value = env.get(*var).filter(|v| !v.trim().is_empty()).cloned();
            builder = builder.set_override_option(*key, value)?;
        }
        builder = builder.set_override_option("server.port", overrides.port.map(i64::from))?;

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.backend == Backend::Google
            && self.auth.mode == AuthMode::Static
            && self.auth.token.as_deref().is_none_or(str::is_empty)
        {
            return Err(ServerError::Config(
                "auth.mode is \"static\" but auth.token is not set".to_string(),
            ));
        }
        Ok(())
    }

    /// Settings for the Google registry.
    pub fn google_settings(&self) -> GoogleSettings {
        GoogleSettings {
            discovery_location: self.google.discovery_location.clone(),
            collection_id: self.google.collection_id.clone(),
            reasoning_engine_location: self.google.reasoning_engine_location.clone(),
            discovery_endpoint: self.google.discovery_endpoint.clone(),
            vertex_endpoint: self.google.vertex_endpoint.clone(),
            timeout: self.upstream.timeout_secs.map(Duration::from_secs),
        }
    }

    /// Effective configuration rendered as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }
}
