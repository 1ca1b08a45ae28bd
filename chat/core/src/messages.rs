//! Chat Messages and Wire Payloads
//!
//! Types exchanged with the Knowte agent endpoints and the append-only
//! message list a session keeps for building conversation history.

use serde::{Deserialize, Serialize};

use crate::error::RequestError;

/// Longest message the agent endpoint accepts, in characters
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Who authored a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User input
    User,
    /// Assistant reply
    Assistant,
    /// Hidden instructions
    System,
}

/// A finalized message in a session's transcript
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who sent this message
    pub role: MessageRole,
    /// Message content
    pub content: String,
    /// When the message was created (Unix timestamp ms)
    pub timestamp: u64,
}

impl ChatMessage {
    /// Create a new message
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: now_ms(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// One prior message as sent in a request's `history`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    /// Author of the message
    pub role: MessageRole,
    /// Message text
    pub content: String,
}

impl From<&ChatMessage> for HistoryItem {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Convert transcript messages into request history, preserving order
///
/// A user message not directly followed by an assistant reply (its exchange
/// failed, was stopped, or was superseded) is left out, so the history never
/// carries an unanswered turn.
#[must_use]
pub fn build_history(messages: &[ChatMessage]) -> Vec<HistoryItem> {
    messages
        .iter()
        .enumerate()
        .filter(|&(i, message)| {
            message.role != MessageRole::User
                || messages
                    .get(i + 1)
                    .is_some_and(|next| next.role == MessageRole::Assistant)
        })
        .map(|(_, message)| HistoryItem::from(message))
        .collect()
}

/// Body of a chat request (streaming and non-streaming endpoints alike)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// What the user is asking right now
    pub message: String,
    /// Conversation to continue; omitted to start a new one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Previous messages, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoryItem>,
    /// Hidden instructions that shape the reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl ChatRequest {
    /// Create a request carrying only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// Continue an existing conversation
    #[must_use]
    pub fn with_conversation_id(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }

    /// Attach prior messages
    #[must_use]
    pub fn with_history(mut self, history: Vec<HistoryItem>) -> Self {
        self.history = history;
        self
    }

    /// Set the system prompt
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Check the request against the limits the agent endpoint enforces
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.message.is_empty() {
            return Err(RequestError::EmptyMessage);
        }

        let chars = self.message.chars().count();
        if chars > MAX_MESSAGE_CHARS {
            return Err(RequestError::MessageTooLong {
                max: MAX_MESSAGE_CHARS,
                actual: chars,
            });
        }

        if let Some(index) = self.history.iter().position(|h| h.content.is_empty()) {
            return Err(RequestError::EmptyHistoryContent { index });
        }

        Ok(())
    }
}

/// Reply from the non-streaming chat endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Conversation the reply belongs to
    pub conversation_id: String,
    /// Full reply text
    pub reply: String,
    /// Model that produced the reply
    pub model: String,
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
