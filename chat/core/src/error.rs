//! Error Types
//!
//! Errors surfaced by the chat core. Cancellation is deliberately absent:
//! a cancelled send resolves with an empty reply instead of failing.

use thiserror::Error;

/// Transport-level failure while talking to the chat endpoint
#[derive(Debug, Error)]
pub enum StreamTransportError {
    /// Connection or protocol failure reported by the HTTP client
    #[error("request to chat endpoint failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("chat endpoint returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, if it could be read
        body: String,
    },

    /// Server answered successfully but sent no body to stream
    #[error("chat endpoint returned {status} without a response body")]
    MissingBody {
        /// HTTP status code
        status: u16,
    },

    /// Failure reading the body after the stream was opened
    #[error("failed reading chat stream: {0}")]
    Read(String),
}

impl StreamTransportError {
    /// HTTP status associated with the failure, when one is known
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            Self::Status { status, .. } | Self::MissingBody { status } => Some(*status),
            Self::Read(_) => None,
        }
    }
}

/// A chat request that the backend would reject
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The message has no characters
    #[error("message cannot be empty")]
    EmptyMessage,

    /// The message exceeds the backend's length limit
    #[error("message exceeds max length of {max} characters (actual: {actual})")]
    MessageTooLong {
        /// Maximum accepted length
        max: usize,
        /// Length of the rejected message
        actual: usize,
    },

    /// A history entry has no content
    #[error("history entry {index} has empty content")]
    EmptyHistoryContent {
        /// Position of the offending entry
        index: usize,
    },
}

/// Error returned by a chat session operation
#[derive(Debug, Error)]
pub enum SessionError {
    /// The request failed validation; nothing was sent
    #[error("invalid chat request: {0}")]
    InvalidRequest(#[from] RequestError),

    /// The exchange failed at the transport level
    #[error(transparent)]
    Transport(#[from] StreamTransportError),
}

impl SessionError {
    /// HTTP status of the underlying transport failure, if any
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::InvalidRequest(_) => None,
            Self::Transport(e) => e.status(),
        }
    }

    /// Whether the error came from the transport rather than validation
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
