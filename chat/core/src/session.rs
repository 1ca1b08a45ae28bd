//! Chat Session
//!
//! A [`ChatSession`] owns the lifecycle of one "ask the assistant" exchange
//! at a time: it opens the streaming endpoint, folds incoming frames into
//! the reply buffer, and settles with the full reply, an empty reply when
//! cancelled, or a transport error.
//!
//! # Lifecycle
//!
//! ```text
//!            send()                 done frame / end of stream
//!   Idle ───────────► Streaming ─────────────────────────────► Completed
//!                      │   │  stop() / superseded by send()
//!                      │   └────────────────────────────────► Cancelled
//!                      └──── transport error ───────────────► Failed
//! ```
//!
//! `Completed`, `Cancelled` and `Failed` go back to `Streaming` on the next
//! `send()`; `reset()` returns to `Idle`.
//!
//! At most one exchange is in flight per session. Starting a new one cancels
//! the previous exchange first, and a cancelled exchange can no longer touch
//! session state even if its read loop has not yet observed the cancellation.

use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::ChatBackend;
use crate::context::DocumentContext;
use crate::error::SessionError;
use crate::messages::{build_history, ChatMessage, ChatRequest};
use crate::streaming::{FrameDecoder, StreamFrame};

/// Where the session is in its lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Nothing sent since creation or the last reset
    #[default]
    Idle,
    /// A reply is streaming in
    Streaming,
    /// The last reply finished (final frame or end of stream)
    Completed,
    /// The last exchange was stopped or superseded
    Cancelled,
    /// The last exchange failed at the transport level
    Failed,
}

/// Observable view of a session, published on every change
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Lifecycle phase
    pub phase: SessionPhase,
    /// Reply text accumulated so far
    pub reply: String,
    /// Conversation assigned by the backend
    pub conversation_id: Option<String>,
    /// Whether an exchange is in flight
    pub streaming: bool,
}

/// How an exchange settled, before cancellation is folded into an empty reply
enum Outcome {
    Completed(String),
    Cancelled,
}

struct Inflight {
    generation: u64,
    cancel: CancellationToken,
}

#[derive(Default)]
struct SessionState {
    reply: String,
    conversation_id: Option<String>,
    phase: SessionPhase,
    inflight: Option<Inflight>,
    generation: u64,
    transcript: Vec<ChatMessage>,
    /// Start of the transcript slice sent as history (moves on reset)
    history_start: usize,
    system_prompt: Option<String>,
}

impl SessionState {
    fn is_current(&self, generation: u64) -> bool {
        self.inflight
            .as_ref()
            .is_some_and(|f| f.generation == generation)
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            reply: self.reply.clone(),
            conversation_id: self.conversation_id.clone(),
            streaming: self.inflight.is_some(),
        }
    }
}

struct Shared {
    backend: Arc<dyn ChatBackend>,
    state: Mutex<SessionState>,
    updates: watch::Sender<SessionSnapshot>,
}

/// Streaming chat session
///
/// Cloning is cheap and yields a handle to the same session, so one task can
/// `send()` while another calls `stop()`.
#[derive(Clone)]
pub struct ChatSession {
    shared: Arc<Shared>,
}

impl ChatSession {
    /// Create an idle session that talks to `backend`
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        let (updates, _) = watch::channel(SessionSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                backend,
                state: Mutex::new(SessionState::default()),
                updates,
            }),
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Send a request and stream the reply
    ///
    /// Any exchange already in flight is cancelled first. Resolves with the
    /// full reply once the final frame arrives or the server closes the
    /// stream, and with an empty string if this exchange is cancelled.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidRequest`] if the request fails validation (the
    /// session is left untouched), [`SessionError::Transport`] on network
    /// failure or a non-success status.
    pub async fn send(&self, request: ChatRequest) -> Result<String, SessionError> {
        match self.run(&request).await? {
            Outcome::Completed(reply) => Ok(reply),
            Outcome::Cancelled => Ok(String::new()),
        }
    }

    /// Ask a question in the session's running conversation
    ///
    /// Builds the request from session state (conversation id, transcript
    /// since the last reset, attached document context), records the user
    /// message, and records the assistant reply if the exchange completes
    /// with text. A question whose exchange fails, is stopped or is
    /// superseded stays in the transcript but is not sent as history.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub async fn ask(&self, message: impl Into<String>) -> Result<String, SessionError> {
        let request = self.build_request(message.into());
        request.validate()?;
        self.push_message(ChatMessage::user(request.message.clone()));

        match self.run(&request).await? {
            Outcome::Completed(reply) => {
                if !reply.is_empty() {
                    self.push_message(ChatMessage::assistant(reply.clone()));
                }
                Ok(reply)
            }
            Outcome::Cancelled => Ok(String::new()),
        }
    }

    /// Cancel the in-flight exchange, if any
    ///
    /// The pending `send()` resolves with an empty reply. The accumulated
    /// reply text is kept until the next send or reset.
    pub fn stop(&self) {
        let mut state = self.shared.state.lock();
        let Some(inflight) = state.inflight.take() else {
            return;
        };

        inflight.cancel.cancel();
        state.phase = SessionPhase::Cancelled;
        info!(generation = inflight.generation, "Chat stream stopped");
        self.publish(&state);
    }

    /// Stop, then forget the reply and the conversation
    ///
    /// Later requests start a new conversation; messages already in the
    /// transcript stay but are no longer sent as history.
    pub fn reset(&self) {
        let mut state = self.shared.state.lock();
        if let Some(inflight) = state.inflight.take() {
            inflight.cancel.cancel();
        }

        state.reply.clear();
        state.conversation_id = None;
        state.phase = SessionPhase::Idle;
        state.history_start = state.transcript.len();
        debug!("Chat session reset");
        self.publish(&state);
    }

    /// Reset and ground later questions in a document
    pub fn attach_document(&self, document: &DocumentContext, max_chars: usize) {
        self.reset();
        self.set_system_prompt(Some(document.system_prompt(max_chars)));
        info!(document_id = %document.document_id, "Attached document context");
    }

    /// Set or clear the system prompt used by [`ask`](Self::ask)
    pub fn set_system_prompt(&self, prompt: Option<String>) {
        self.shared.state.lock().system_prompt = prompt;
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// Subscribe to state changes (reply deltas, phase, conversation id)
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.updates.subscribe()
    }

    /// Current state
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.state.lock().snapshot()
    }

    /// Reply text accumulated so far
    #[must_use]
    pub fn reply(&self) -> String {
        self.shared.state.lock().reply.clone()
    }

    /// Conversation assigned by the backend, once the first frame arrived
    #[must_use]
    pub fn conversation_id(&self) -> Option<String> {
        self.shared.state.lock().conversation_id.clone()
    }

    /// Whether an exchange is in flight
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.shared.state.lock().inflight.is_some()
    }

    /// Lifecycle phase
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.shared.state.lock().phase
    }

    /// Messages exchanged through [`ask`](Self::ask), oldest first
    #[must_use]
    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.shared.state.lock().transcript.clone()
    }

    /// System prompt used by [`ask`](Self::ask)
    #[must_use]
    pub fn system_prompt(&self) -> Option<String> {
        self.shared.state.lock().system_prompt.clone()
    }

    // =========================================================================
    // Exchange
    // =========================================================================

    async fn run(&self, request: &ChatRequest) -> Result<Outcome, SessionError> {
        request.validate()?;

        let (generation, cancel) = self.begin();
        let result = self.stream_reply(request, generation, &cancel).await;
        self.finish(generation, result)
    }

    /// Cancel any previous exchange and mark a new one in flight
    fn begin(&self) -> (u64, CancellationToken) {
        let mut state = self.shared.state.lock();
        if let Some(previous) = state.inflight.take() {
            previous.cancel.cancel();
            info!(
                generation = previous.generation,
                "Superseding in-flight chat stream"
            );
        }

        state.generation += 1;
        let generation = state.generation;
        let cancel = CancellationToken::new();
        state.inflight = Some(Inflight {
            generation,
            cancel: cancel.clone(),
        });
        state.reply.clear();
        state.phase = SessionPhase::Streaming;

        info!(
            generation,
            backend = self.shared.backend.name(),
            conversation_id = ?state.conversation_id,
            "Chat stream started"
        );
        self.publish(&state);

        (generation, cancel)
    }

    /// Read the reply; the body stream is dropped before this returns
    async fn stream_reply(
        &self,
        request: &ChatRequest,
        generation: u64,
        cancel: &CancellationToken,
    ) -> Result<Outcome, SessionError> {
        let mut body = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(Outcome::Cancelled),
            opened = self.shared.backend.open_stream(request) => opened?,
        };

        let mut decoder = FrameDecoder::new();
        let mut reply = String::new();

        loop {
            let chunk = tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(Outcome::Cancelled),
                chunk = body.next() => chunk,
            };
            let Some(chunk) = chunk else {
                break;
            };

            for frame in decoder.push(&chunk?) {
                if !self.apply_frame(generation, &frame) {
                    return Ok(Outcome::Cancelled);
                }
                reply.push_str(&frame.delta);
                if frame.done {
                    return Ok(Outcome::Completed(reply));
                }
            }
        }

        decoder.finish();
        debug!(
            generation,
            chars = reply.len(),
            "Chat stream ended without a final frame"
        );
        Ok(Outcome::Completed(reply))
    }

    /// Fold a frame into session state; `false` once this exchange is stale
    fn apply_frame(&self, generation: u64, frame: &StreamFrame) -> bool {
        let mut state = self.shared.state.lock();
        if !state.is_current(generation) {
            return false;
        }

        if state.conversation_id.is_none() {
            state.conversation_id = Some(frame.conversation_id.clone());
        } else if state.conversation_id.as_deref() != Some(frame.conversation_id.as_str()) {
            debug!(
                current = ?state.conversation_id,
                received = %frame.conversation_id,
                "Ignoring conversation id change mid-conversation"
            );
        }
        state.reply.push_str(&frame.delta);
        self.publish(&state);
        true
    }

    /// Settle the exchange; a stale exchange always reads as cancelled
    fn finish(
        &self,
        generation: u64,
        result: Result<Outcome, SessionError>,
    ) -> Result<Outcome, SessionError> {
        let mut state = self.shared.state.lock();
        if !state.is_current(generation) {
            return Ok(Outcome::Cancelled);
        }
        state.inflight = None;

        state.phase = match &result {
            Ok(Outcome::Completed(reply)) => {
                info!(generation, chars = reply.len(), "Chat stream completed");
                SessionPhase::Completed
            }
            Ok(Outcome::Cancelled) => SessionPhase::Cancelled,
            Err(e) => {
                warn!(generation, error = %e, status = ?e.status(), "Chat stream failed");
                SessionPhase::Failed
            }
        };
        self.publish(&state);

        result
    }

    fn build_request(&self, message: String) -> ChatRequest {
        let state = self.shared.state.lock();
        ChatRequest {
            message,
            conversation_id: state.conversation_id.clone(),
            history: build_history(&state.transcript[state.history_start..]),
            system_prompt: state.system_prompt.clone(),
        }
    }

    fn push_message(&self, message: ChatMessage) {
        self.shared.state.lock().transcript.push(message);
    }

    fn publish(&self, state: &SessionState) {
        self.shared.updates.send_replace(state.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::backend::ByteStream;
    use crate::error::{RequestError, StreamTransportError};
    use crate::messages::ChatResponse;

    /// Backend whose stream carries one fixed body
    struct FixedBody(&'static str);

    #[async_trait]
    impl ChatBackend for FixedBody {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn open_stream(
            &self,
            _request: &ChatRequest,
        ) -> Result<ByteStream, StreamTransportError> {
            let chunk = bytes::Bytes::from_static(self.0.as_bytes());
            Ok(futures::stream::iter(vec![Ok(chunk)]).boxed())
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, StreamTransportError> {
            Err(StreamTransportError::Read("not supported".to_string()))
        }
    }

    fn session(body: &'static str) -> ChatSession {
        ChatSession::new(Arc::new(FixedBody(body)))
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = session("");
        assert_eq!(session.snapshot(), SessionSnapshot::default());
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(!session.is_streaming());
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let session = session("");
        let updates = session.subscribe();
        session.stop();

        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(!updates.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_send_and_reset() {
        let session = session(
            "data: {\"conversation_id\":\"c1\",\"delta\":\"Hi\",\"done\":true}\n",
        );

        let reply = session.send(ChatRequest::new("Hello")).await.unwrap();
        assert_eq!(reply, "Hi");
        assert_eq!(session.reply(), "Hi");
        assert_eq!(session.conversation_id().as_deref(), Some("c1"));
        assert_eq!(session.phase(), SessionPhase::Completed);

        session.reset();
        assert_eq!(session.snapshot(), SessionSnapshot::default());
    }

    #[tokio::test]
    async fn test_invalid_request_leaves_state_untouched() {
        let session = session("");
        let err = session.send(ChatRequest::new("")).await.unwrap_err();

        assert!(matches!(
            err,
            SessionError::InvalidRequest(RequestError::EmptyMessage)
        ));
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_attach_document_sets_prompt() {
        let session = session("");
        session.attach_document(&DocumentContext::new("d1", "Mitosis."), 100);

        let prompt = session.system_prompt().unwrap();
        assert!(prompt.contains("Mitosis."));
        assert_eq!(session.build_request("Q".to_string()).system_prompt, Some(prompt));

        session.set_system_prompt(None);
        assert_eq!(session.system_prompt(), None);
    }
}
