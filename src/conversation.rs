//! Caller-owned chat transcript.
//!
//! [`Conversation`] holds the turns of one session together with the pending
//! flag and the last error. It talks to the relay through a
//! [`RelayTransport`], so tests can drive it without a network.

use crate::converters::gemini::{GeminiRequest, extract_reply_text};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use thiserror::Error;
use tracing::{debug, warn};

pub const NO_REPLY_PLACEHOLDER: &str = "No response from AI.";
pub const GENERIC_REQUEST_FAILURE: &str = "Request failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub content: String,
    pub sender: Sender,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { content: content.into(), sender: Sender::User }
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self { content: content.into(), sender: Sender::Bot }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    /// The relay answered with an error status.
    #[error("relay returned {status}: {}", .message.as_deref().unwrap_or("<no message>"))]
    Relay { status: u16, message: Option<String> },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl TransportError {
    /// Text shown to the user: the relay's `error` field, else the transport
    /// error itself, else a generic fallback.
    pub fn user_message(&self) -> String {
        let message = match self {
            TransportError::Relay { status, message } => message
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| format!("Request failed with status code {}", status)),
            TransportError::Http(e) => e.to_string(),
        };
        if message.trim().is_empty() { GENERIC_REQUEST_FAILURE.to_string() } else { message }
    }
}

/// Sends a transcript to the relay and yields the provider's JSON body.
pub trait RelayTransport {
    fn send(&self, request: &GeminiRequest) -> impl Future<Output = Result<Value, TransportError>> + Send;
}

#[derive(Debug, Default)]
pub struct Conversation {
    turns: Vec<ChatTurn>,
    pending: bool,
    error: Option<String>,
    scroll_anchor: Option<usize>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Index of the turn the view should keep in sight.
    pub fn scroll_anchor(&self) -> Option<usize> {
        self.scroll_anchor
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn reset(&mut self) {
        self.turns.clear();
        self.on_transcript_changed();
    }

    /// Runs one full exchange. Returns `false` when the input was ignored.
    pub async fn submit<T: RelayTransport>(&mut self, text: &str, transport: &T) -> bool {
        let Some(request) = self.begin_submit(text) else {
            return false;
        };
        let result = transport.send(&request).await;
        self.finish_submit(result);
        true
    }

    /// First half of [`submit`](Self::submit): records the user turn and
    /// returns the payload to send, or `None` for blank input or while a
    /// request is outstanding.
    pub fn begin_submit(&mut self, text: &str) -> Option<GeminiRequest> {
        if text.trim().is_empty() || self.pending {
            return None;
        }
        self.push(ChatTurn::user(text));
        self.pending = true;
        self.error = None;
        Some(GeminiRequest::from_turns(&self.turns))
    }

    pub fn finish_submit(&mut self, result: Result<Value, TransportError>) {
        self.pending = false;
        match result {
            Ok(body) => {
                let reply = match extract_reply_text(&body) {
                    Ok(text) => text.to_string(),
                    Err(gap) => {
                        debug!("No reply text in relay response: {}", gap);
                        NO_REPLY_PLACEHOLDER.to_string()
                    }
                };
                self.push(ChatTurn::bot(reply));
            }
            Err(e) => {
                warn!("Relay call failed: {}", e);
                self.error = Some(e.user_message());
            }
        }
    }

    fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
        self.on_transcript_changed();
    }

    fn on_transcript_changed(&mut self) {
        self.scroll_anchor = self.turns.len().checked_sub(1);
    }
}
