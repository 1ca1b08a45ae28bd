//! TOML Configuration File Support
//!
//! Client configuration loaded from `~/.config/knowte/client.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [api]
//! url = "https://api.knowte.app/api/v1"
//! connect_timeout_ms = 5000
//! request_timeout_ms = 60000
//!
//! [auth]
//! token_file = "/home/me/.config/knowte/access_token"
//!
//! [context]
//! max_chars = 12000
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::DEFAULT_CONTEXT_CHARS;

/// Default API base URL (local development server)
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api/v1";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[api]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiToml {
    /// API base URL
    pub url: Option<String>,

    /// Connection timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,

    /// Total timeout for non-streaming requests in milliseconds (0 = none)
    pub request_timeout_ms: Option<u64>,
}

/// `[auth]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthToml {
    /// File holding the access token
    pub token_file: Option<PathBuf>,
}

/// `[context]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextToml {
    /// Character budget for document text in the system prompt
    pub max_chars: Option<usize>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientToml {
    /// API section
    pub api: ApiToml,

    /// Authentication section
    pub auth: AuthToml,

    /// Document context section
    pub context: ContextToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// API base URL
    pub api_url: String,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Total timeout for non-streaming requests
    pub request_timeout: Option<Duration>,

    /// Access token file (`None` falls back to the default location)
    pub token_file: Option<PathBuf>,

    /// Character budget for document text in the system prompt
    pub context_max_chars: usize,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Highest layer that set any value
    source: ConfigSource,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Some(Duration::from_secs(120)),
            token_file: None,
            context_max_chars: DEFAULT_CONTEXT_CHARS,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check that the resolved values are usable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for an unparseable or
    /// non-HTTP API URL, a zero connect timeout, or a zero context budget.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.api_url).map_err(|e| {
            ConfigError::ValidationError(format!("api url '{}': {e}", self.api_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "api url '{}' must use http or https",
                self.api_url
            )));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "connect timeout must be greater than zero".to_string(),
            ));
        }
        if self.context_max_chars == 0 {
            return Err(ConfigError::ValidationError(
                "context max_chars must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/knowte/client.toml` or
/// `~/.config/knowte/client.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("knowte").join("client.toml"))
}

/// Load configuration from the default path and the process environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path and the process environment
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ClientConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration, resolving environment variables through `env`
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<ClientConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ClientConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ClientToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);

    Ok(config)
}

fn apply_toml_config(config: &mut ClientConfig, toml: &ClientToml) {
    if let Some(ref url) = toml.api.url {
        config.api_url = url.clone();
    }
    if let Some(ms) = toml.api.connect_timeout_ms {
        config.connect_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.api.request_timeout_ms {
        config.request_timeout = timeout_from_ms(ms);
    }
    if toml.auth.token_file.is_some() {
        config.token_file = toml.auth.token_file.clone();
    }
    if let Some(chars) = toml.context.max_chars {
        config.context_max_chars = chars;
    }
}

fn apply_env_config<F>(config: &mut ClientConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env("KNOWTE_API_URL") {
        config.api_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(timeout) = env("KNOWTE_CONNECT_TIMEOUT_MS") {
        if let Ok(ms) = timeout.parse::<u64>() {
            config.connect_timeout = Duration::from_millis(ms);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(timeout) = env("KNOWTE_REQUEST_TIMEOUT_MS") {
        if let Ok(ms) = timeout.parse::<u64>() {
            config.request_timeout = timeout_from_ms(ms);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(path) = env("KNOWTE_TOKEN_FILE") {
        config.token_file = Some(PathBuf::from(path));
        config.source = ConfigSource::Env;
    }
}

fn timeout_from_ms(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// API URL override
    pub api_url: Option<String>,

    /// Connect timeout override (milliseconds)
    pub connect_timeout_ms: Option<u64>,

    /// Token file override
    pub token_file: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set API URL override
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    /// Set connect timeout override
    #[must_use]
    pub fn with_connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = Some(ms);
        self
    }

    /// Set token file override
    #[must_use]
    pub fn with_token_file(mut self, path: PathBuf) -> Self {
        self.token_file = Some(path);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut ClientConfig) {
        if self.api_url.is_some() || self.connect_timeout_ms.is_some() || self.token_file.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref url) = self.api_url {
            config.api_url = url.clone();
        }
        if let Some(ms) = self.connect_timeout_ms {
            config.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ref path) = self.token_file {
            config.token_file = Some(path.clone());
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
