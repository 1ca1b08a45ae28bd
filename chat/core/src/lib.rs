//! Knowte Chat Core - Streaming Chat Sessions for the Knowte Assistant
//!
//! This crate provides the client-side core of Knowte's assistant chat:
//! opening the agent's streaming endpoint, decoding its line-delimited
//! frames into a live reply, and the send / stop / reset lifecycle around
//! one outstanding exchange. It has no UI dependencies; a terminal, desktop
//! or web surface drives it through [`ChatSession`] and observes it through
//! [`ChatSession::subscribe`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Surface (CLI, ...)                    │
//! │        send / ask / stop / reset        subscribe()           │
//! └───────────────┬──────────────────────────────▲───────────────┘
//!                 │                              │ SessionSnapshot
//! ┌───────────────▼──────────────────────────────┴───────────────┐
//! │                         ChatSession                           │
//! │   single in-flight exchange, CancellationToken per send       │
//! │   ┌──────────────┐   bytes   ┌──────────────┐                 │
//! │   │ ChatBackend  │ ────────► │ FrameDecoder │ ─► StreamFrame  │
//! │   │ (HttpBackend)│           └──────────────┘                 │
//! │   └──────────────┘                                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use knowte_chat_core::{
//!     backend::{EnvCredential, HttpBackend},
//!     ChatRequest, ChatSession,
//! };
//!
//! let backend = HttpBackend::new("http://127.0.0.1:8000/api/v1", Arc::new(EnvCredential::default()))?;
//! let session = ChatSession::new(Arc::new(backend));
//!
//! let mut updates = session.subscribe();
//! tokio::spawn(async move {
//!     while updates.changed().await.is_ok() {
//!         println!("{}", updates.borrow().reply);
//!     }
//! });
//!
//! let reply = session.send(ChatRequest::new("Summarize chapter 1")).await?;
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: the [`ChatBackend`](backend::ChatBackend) seam, HTTP client, credentials
//! - [`config`]: TOML / environment / CLI configuration
//! - [`context`]: document text as a system prompt
//! - [`error`]: error types
//! - [`messages`]: request/response payloads and transcript messages
//! - [`session`]: the streaming chat session
//! - [`streaming`]: frame decoding

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod messages;
pub mod session;
pub mod streaming;

// Re-exports for convenience
pub use backend::{ChatBackend, HttpBackend};
pub use config::{
    default_config_path, load_config, load_config_from_path, ClientConfig, ConfigError,
    ConfigOverrides, ConfigSource,
};
pub use context::DocumentContext;
pub use error::{RequestError, SessionError, StreamTransportError};
pub use messages::{build_history, ChatMessage, ChatRequest, ChatResponse, HistoryItem, MessageRole};
pub use session::{ChatSession, SessionPhase, SessionSnapshot};
pub use streaming::{FrameDecoder, StreamFrame};
