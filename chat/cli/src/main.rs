//! Knowte Chat - Terminal Chat with the Knowte Assistant
//!
//! Streams assistant replies from the Knowte agent service into the
//! terminal, optionally grounded in a document's extracted text.
//!
//! # Usage
//!
//! ```bash
//! # One question, streamed
//! knowte-chat "What does chapter 2 argue?"
//!
//! # Interactive: one question per line, `/reset` starts a new conversation
//! knowte-chat --document notes.txt
//!
//! # Another server
//! knowte-chat --api-url https://knowte.example.edu/api/v1 --token "$TOKEN"
//!
//! # Verbose logging
//! RUST_LOG=debug knowte-chat "hello"
//! ```
//!
//! # Signals
//!
//! - `SIGINT` while a reply streams: stop that reply
//! - `SIGINT` while idle: exit

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use knowte_chat_core::backend::{
    default_token_path, CredentialSource, EnvCredential, StaticCredential, TokenFileCredential,
    ACCESS_TOKEN_ENV,
};
use knowte_chat_core::{
    default_config_path, load_config_from_path, ChatBackend, ChatRequest, ChatSession,
    ClientConfig, ConfigOverrides, DocumentContext, HttpBackend, SessionError,
};

const FAILURE_NOTICE: &str = "I couldn't generate a response right now.";

/// Knowte Chat - ask the Knowte assistant from the terminal
#[derive(Parser, Debug)]
#[command(name = "knowte-chat")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Question to ask; without one, questions are read from stdin
    prompt: Option<String>,

    /// Agent API base URL
    #[arg(short = 'u', long, value_name = "URL")]
    api_url: Option<String>,

    /// Bearer token for the agent API
    #[arg(short = 't', long, value_name = "TOKEN")]
    token: Option<String>,

    /// File holding the bearer token
    #[arg(long, value_name = "PATH")]
    token_file: Option<PathBuf>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "KNOWTE_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Text file whose contents ground the conversation
    #[arg(short = 'd', long, value_name = "FILE")]
    document: Option<PathBuf>,

    /// Wait for the whole reply instead of streaming it (one-shot only)
    #[arg(long, requires = "prompt")]
    no_stream: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "KNOWTE_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

/// Initialize logging on stderr so stdout carries only replies
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("knowte_chat={level},knowte_chat_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve configuration: file, then environment, then flags
fn resolve_config(args: &Args) -> Result<ClientConfig> {
    let path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(path).context("Failed to load configuration")?;

    let mut overrides = ConfigOverrides::new();
    if let Some(ref url) = args.api_url {
        overrides = overrides.with_api_url(url.clone());
    }
    if let Some(ref path) = args.token_file {
        overrides = overrides.with_token_file(path.clone());
    }
    overrides.apply(&mut config);

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Pick where the bearer token comes from: flag, environment, token file
fn credentials(args: &Args, config: &ClientConfig) -> Arc<dyn CredentialSource> {
    if let Some(ref token) = args.token {
        debug!("Using token from command line");
        return Arc::new(StaticCredential::new(token.clone()));
    }
    if std::env::var_os(ACCESS_TOKEN_ENV).is_some() {
        debug!(var = ACCESS_TOKEN_ENV, "Using token from environment");
        return Arc::new(EnvCredential::default());
    }
    match config.token_file.clone().or_else(default_token_path) {
        Some(path) => {
            debug!(path = %path.display(), "Using token file");
            Arc::new(TokenFileCredential::new(path))
        }
        None => Arc::new(StaticCredential::anonymous()),
    }
}

async fn load_document(path: &Path) -> Result<DocumentContext> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read document {}", path.display()))?;
    let document_id = path
        .file_stem()
        .map_or_else(|| "document".to_string(), |s| s.to_string_lossy().into_owned());

    info!(document_id = %document_id, chars = text.chars().count(), "Loaded document");
    Ok(DocumentContext::new(document_id, text))
}

/// Ask one question, echoing the reply as it streams
///
/// Returns `false` when the exchange failed.
async fn ask_and_print(session: &ChatSession, question: &str) -> Result<bool> {
    let mut updates = session.subscribe();
    let mut stdout = tokio::io::stdout();
    let mut printed = 0usize;

    let ask = session.ask(question);
    tokio::pin!(ask);

    let result = loop {
        tokio::select! {
            result = &mut ask => break result,
            changed = updates.changed() => {
                if changed.is_err() {
                    break (&mut ask).await;
                }
                let reply = updates.borrow_and_update().reply.clone();
                if let Some(delta) = reply.get(printed..) {
                    stdout.write_all(delta.as_bytes()).await?;
                    stdout.flush().await?;
                    printed = reply.len();
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping reply");
                session.stop();
            }
        }
    };

    match result {
        Ok(reply) => {
            if let Some(rest) = reply.get(printed..) {
                stdout.write_all(rest.as_bytes()).await?;
            }
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
            Ok(true)
        }
        Err(SessionError::InvalidRequest(e)) => {
            eprintln!("{e}");
            Ok(false)
        }
        Err(e) => {
            warn!(error = %e, status = ?e.status(), "Chat exchange failed");
            if printed > 0 {
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
            eprintln!("{FAILURE_NOTICE}");
            Ok(false)
        }
    }
}

/// Ask one question and print the complete reply
async fn ask_once(
    backend: &HttpBackend,
    session: &ChatSession,
    question: &str,
) -> Result<bool> {
    let mut request = ChatRequest::new(question);
    if let Some(prompt) = session.system_prompt() {
        request = request.with_system_prompt(prompt);
    }
    if let Err(e) = request.validate() {
        eprintln!("{e}");
        return Ok(false);
    }

    match backend.chat(&request).await {
        Ok(response) => {
            debug!(model = %response.model, conversation_id = %response.conversation_id, "Reply received");
            let mut stdout = tokio::io::stdout();
            stdout.write_all(response.reply.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
            Ok(true)
        }
        Err(e) => {
            warn!(error = %e, status = ?e.status(), "Chat request failed");
            eprintln!("{FAILURE_NOTICE}");
            Ok(false)
        }
    }
}

/// Read questions from stdin until EOF, `/quit` or an idle interrupt
async fn repl(session: &ChatSession) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted while idle, exiting");
                break;
            }
        };
        let Some(line) = line else { break };

        match line.trim() {
            "" => {}
            "/quit" => break,
            "/reset" => {
                session.reset();
                info!("Started a new conversation");
            }
            question => {
                ask_and_print(session, question).await?;
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    init_logging(&args.log_level);

    let config = resolve_config(&args)?;
    info!(api_url = %config.api_url, source = %config.source(), "Configuration resolved");

    let credentials = credentials(&args, &config);
    let backend = Arc::new(
        HttpBackend::from_config(&config, credentials).context("Failed to build HTTP client")?,
    );
    let session = ChatSession::new(backend.clone());

    if let Some(ref path) = args.document {
        let document = load_document(path).await?;
        session.attach_document(&document, config.context_max_chars);
    }

    let Some(ref prompt) = args.prompt else {
        repl(&session).await?;
        return Ok(ExitCode::SUCCESS);
    };

    let ok = if args.no_stream {
        ask_once(&backend, &session, prompt).await?
    } else {
        ask_and_print(&session, prompt).await?
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
