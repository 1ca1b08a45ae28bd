//! Line-delimited frame decoding.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Prefix marking an event line
pub const DATA_PREFIX: &str = "data: ";

/// One decoded server event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFrame {
    /// Conversation the backend assigned to this exchange
    pub conversation_id: String,
    /// Text contributed by this frame
    pub delta: String,
    /// Whether this is the last frame of the reply
    pub done: bool,
}

/// Decode a single line into a frame
///
/// Returns `None` for non-event lines, empty payloads, and payloads that do
/// not match the frame schema.
#[must_use]
pub fn decode_line(line: &str) -> Option<StreamFrame> {
    let payload = line.strip_prefix(DATA_PREFIX)?.trim();
    if payload.is_empty() {
        return None;
    }

    match serde_json::from_str(payload) {
        Ok(frame) => Some(frame),
        Err(e) => {
            debug!(error = %e, payload, "Skipping malformed stream frame");
            None
        }
    }
}

/// Incremental decoder for a chunked body
///
/// Bytes are buffered until a newline arrives, so both partial lines and
/// multi-byte characters split across chunks are reassembled before decoding.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to hold no newline
    scanned: usize,
}

impl FrameDecoder {
    /// Create an empty decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the frames completed by it, in order
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut start = 0;
        let mut search_from = self.scanned;
        while let Some(offset) = self.buffer[search_from..].iter().position(|&b| b == b'\n') {
            let end = search_from + offset;
            let raw = &self.buffer[start..end];
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            if let Some(frame) = decode_line(&String::from_utf8_lossy(raw)) {
                frames.push(frame);
            }
            start = end + 1;
            search_from = start;
        }
        self.buffer.drain(..start);
        self.scanned = self.buffer.len();

        frames
    }

    /// Bytes held back waiting for a newline
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any unterminated trailing line, returning its length in bytes
    pub fn finish(&mut self) -> usize {
        let discarded = self.buffer.len();
        if discarded > 0 {
            debug!(bytes = discarded, "Discarding unterminated trailing line");
        }
        self.buffer.clear();
        self.scanned = 0;
        discarded
    }
}
