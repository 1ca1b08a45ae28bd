//! Bearer Credentials
//!
//! Where the access token attached to agent requests comes from. A missing
//! token is never an error: the request is simply sent anonymously.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

/// Environment variable holding an access token
pub const ACCESS_TOKEN_ENV: &str = "KNOWTE_ACCESS_TOKEN";

/// Source of the bearer token for API requests
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Current token, or `None` to send the request without authorization
    async fn bearer_token(&self) -> Option<String>;
}

/// Fixed token supplied by the caller
#[derive(Clone, Debug, Default)]
pub struct StaticCredential(Option<String>);

impl StaticCredential {
    /// Use the given token
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    /// Send requests without a token
    #[must_use]
    pub fn anonymous() -> Self {
        Self(None)
    }
}

#[async_trait]
impl CredentialSource for StaticCredential {
    async fn bearer_token(&self) -> Option<String> {
        self.0.as_deref().and_then(normalize)
    }
}

/// Token read from an environment variable on every request
#[derive(Clone, Debug)]
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    /// Read the token from `var`
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvCredential {
    fn default() -> Self {
        Self::new(ACCESS_TOKEN_ENV)
    }
}

#[async_trait]
impl CredentialSource for EnvCredential {
    async fn bearer_token(&self) -> Option<String> {
        std::env::var(&self.var).ok().as_deref().and_then(normalize)
    }
}

/// Token stored in a file, re-read on every request so a fresh sign-in is
/// picked up without restarting
#[derive(Clone, Debug)]
pub struct TokenFileCredential {
    path: PathBuf,
}

impl TokenFileCredential {
    /// Read the token from `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the token file
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl CredentialSource for TokenFileCredential {
    async fn bearer_token(&self) -> Option<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => normalize(&contents),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "No access token file");
                None
            }
        }
    }
}

/// Default token file: `$XDG_CONFIG_HOME/knowte/access_token`
#[must_use]
pub fn default_token_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("knowte").join("access_token"))
}

fn normalize(token: &str) -> Option<String> {
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}
