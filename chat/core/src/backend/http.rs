//! HTTP Backend Implementation
//!
//! Talks to the Knowte API over HTTP with reqwest.
//!
//! # Knowte agent API
//!
//! - `POST /agent/chat/stream` - streamed reply, one `data: {...}` line per frame
//! - `POST /agent/chat` - complete reply as `{conversation_id, reply, model}`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use tracing::debug;

use super::credentials::CredentialSource;
use super::traits::{ByteStream, ChatBackend};
use crate::config::ClientConfig;
use crate::error::StreamTransportError;
use crate::messages::{ChatRequest, ChatResponse};

/// Streaming chat endpoint, relative to the API base URL
pub const STREAM_PATH: &str = "/agent/chat/stream";

/// Non-streaming chat endpoint, relative to the API base URL
pub const CHAT_PATH: &str = "/agent/chat";

/// Knowte API client
#[derive(Clone)]
pub struct HttpBackend {
    /// API base URL, without trailing slash
    base_url: String,
    /// Total timeout for non-streaming requests
    request_timeout: Option<Duration>,
    /// HTTP client
    http_client: reqwest::Client,
    /// Bearer token source
    credentials: Arc<dyn CredentialSource>,
}

impl HttpBackend {
    /// Create a backend for `base_url` with default timeouts
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        base_url: impl Into<String>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Result<Self, StreamTransportError> {
        Self::with_timeouts(base_url, Duration::from_secs(10), None, credentials)
    }

    /// Create from a resolved [`ClientConfig`]
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(
        config: &ClientConfig,
        credentials: Arc<dyn CredentialSource>,
    ) -> Result<Self, StreamTransportError> {
        Self::with_timeouts(
            config.api_url.clone(),
            config.connect_timeout,
            config.request_timeout,
            credentials,
        )
    }

    fn with_timeouts(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Option<Duration>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Result<Self, StreamTransportError> {
        // No overall timeout on the client: streamed replies can run long.
        let http_client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout,
            http_client,
            credentials,
        })
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a request body, attaching the bearer token when one is available,
    /// and reject non-success statuses
    async fn post(
        &self,
        path: &str,
        request: &ChatRequest,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, StreamTransportError> {
        let url = self.endpoint(path);
        let mut builder = self.http_client.post(&url).json(request);

        if let Some(token) = self.credentials.bearer_token().await {
            builder = builder.bearer_auth(token);
        }
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        debug!(url = %url, "Sending chat request");
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StreamTransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "Knowte HTTP"
    }

    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, StreamTransportError> {
        let response = self.post(STREAM_PATH, request, None).await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Err(StreamTransportError::MissingBody {
                status: response.status().as_u16(),
            });
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| StreamTransportError::Read(e.to_string())))
            .boxed())
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, StreamTransportError> {
        let response = self.post(CHAT_PATH, request, self.request_timeout).await?;
        Ok(response.json::<ChatResponse>().await?)
    }
}
