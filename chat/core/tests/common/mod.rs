//! Shared fixtures for session integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use knowte_chat_core::backend::{ByteStream, ChatBackend};
use knowte_chat_core::{ChatRequest, ChatResponse, StreamTransportError};

/// Sender side of a test-controlled response body
pub type BodySender = mpsc::Sender<Result<Bytes, StreamTransportError>>;

/// What the backend does for one `open_stream` call
pub enum Script {
    /// Body made of these chunks, then end of stream
    Chunks(Vec<Vec<u8>>),
    /// Body fed by the test through a channel; dropping the sender ends it
    Channel(mpsc::Receiver<Result<Bytes, StreamTransportError>>),
    /// Opening the stream fails
    Fail(StreamTransportError),
    /// Opening the stream never completes
    Hang,
}

/// Backend replaying scripted responses and recording requests
#[derive(Default)]
pub struct ScriptedBackend {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, script: Script) {
        self.scripts.lock().push_back(script);
    }

    /// Queue a channel-fed body and return its sender
    pub fn push_channel(&self) -> BodySender {
        let (tx, rx) = mpsc::channel(16);
        self.push(Script::Channel(rx));
        tx
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, StreamTransportError> {
        self.requests.lock().push(request.clone());
        let script = self.scripts.lock().pop_front();

        match script {
            Some(Script::Chunks(chunks)) => {
                let chunks: Vec<_> = chunks.into_iter().map(|c| Ok(Bytes::from(c))).collect();
                Ok(futures::stream::iter(chunks).boxed())
            }
            Some(Script::Channel(rx)) => Ok(ReceiverStream::new(rx).boxed()),
            Some(Script::Fail(error)) => Err(error),
            Some(Script::Hang) => futures::future::pending().await,
            None => Err(StreamTransportError::Read("no scripted response".to_string())),
        }
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, StreamTransportError> {
        self.requests.lock().push(request.clone());
        Err(StreamTransportError::Read("non-streaming chat not scripted".to_string()))
    }
}

/// One `data:` line for a frame
pub fn frame_line(conversation_id: &str, delta: &str, done: bool) -> String {
    let frame = serde_json::json!({
        "conversation_id": conversation_id,
        "delta": delta,
        "done": done,
    });
    format!("data: {frame}\n")
}

/// A frame line as a body chunk
pub fn frame_chunk(conversation_id: &str, delta: &str, done: bool) -> Bytes {
    Bytes::from(frame_line(conversation_id, delta, done))
}
