//! Document Context
//!
//! Turns the text the document service extracted from an upload into the
//! system prompt that grounds the assistant's answers.

use serde::{Deserialize, Serialize};

/// Default character budget for document text in a system prompt
pub const DEFAULT_CONTEXT_CHARS: usize = 12_000;

const PREAMBLE: &str = "You are Knowte, an academic assistant. Answer the user's questions \
using the document below. If the document does not contain the answer, say so.";

/// Extracted text of an uploaded document
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentContext {
    /// Identifier assigned by the document service
    pub document_id: String,
    /// Plain text extracted from the document
    pub text: String,
}

impl DocumentContext {
    /// Create a context from extracted text
    pub fn new(document_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            text: text.into(),
        }
    }

    /// Render the system prompt, keeping at most `max_chars` characters of
    /// document text
    #[must_use]
    pub fn system_prompt(&self, max_chars: usize) -> String {
        let text = self.text.trim();
        let (excerpt, truncated) = match text.char_indices().nth(max_chars) {
            Some((cut, _)) => (&text[..cut], true),
            None => (text, false),
        };

        let mut prompt = String::with_capacity(PREAMBLE.len() + excerpt.len() + 64);
        prompt.push_str(PREAMBLE);
        prompt.push_str("\n\n--- Document ");
        prompt.push_str(&self.document_id);
        prompt.push_str(" ---\n");
        prompt.push_str(excerpt);
        if truncated {
            prompt.push_str("\n[document truncated]");
        }
        prompt
    }
}
