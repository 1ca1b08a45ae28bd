//! Backend Traits
//!
//! The seam between the chat session and whatever serves the agent API.
//! Implementations handle URLs, credentials and status handling; the session
//! only sees a byte stream.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::StreamTransportError;
use crate::messages::{ChatRequest, ChatResponse};

/// Raw body of a streaming reply, chunked as it arrives
pub type ByteStream = BoxStream<'static, Result<Bytes, StreamTransportError>>;

/// Chat backend trait
///
/// Implement this trait to connect a session to a different transport.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Get the backend name (for logging)
    fn name(&self) -> &str;

    /// Open the streaming endpoint for a request
    ///
    /// Resolves once response headers are in and the status is a success.
    /// Dropping the returned stream closes the connection.
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, StreamTransportError>;

    /// Send a request and wait for the complete reply (non-streaming)
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, StreamTransportError>;
}
