//! Knowte API Backend
//!
//! This module provides access to the Knowte agent endpoints through the
//! [`ChatBackend`] trait, so a [`ChatSession`](crate::ChatSession) can be
//! driven by the real HTTP client or by an in-memory stand-in.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use knowte_chat_core::backend::{EnvCredential, HttpBackend};
//!
//! let backend = HttpBackend::new("http://127.0.0.1:8000/api/v1", Arc::new(EnvCredential::default()))?;
//! let body = backend.open_stream(&ChatRequest::new("Hello")).await?;
//! ```

mod credentials;
mod http;
mod traits;

pub use credentials::{
    default_token_path, CredentialSource, EnvCredential, StaticCredential, TokenFileCredential,
    ACCESS_TOKEN_ENV,
};
pub use http::{HttpBackend, CHAT_PATH, STREAM_PATH};
pub use traits::{ByteStream, ChatBackend};
