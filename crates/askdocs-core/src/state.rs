//! UI-agnostic conversation state
//!
//! The transcript is append-only for the lifetime of a session. While an
//! answer streams in, exactly one assistant message (the last one) is being
//! extended; everything before it is frozen.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub role: ChatRole,
    pub content: String,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    next_id: u64,
    // Id of the assistant message currently receiving deltas
    streaming: Option<u64>,
    loading: bool,
    error: Option<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether an assistant message has been started for the current turn.
    pub fn is_streaming(&self) -> bool {
        self.streaming.is_some()
    }

    /// Start a new turn with the user's question.
    ///
    /// Returns the trimmed question to send, or `None` when the input is blank
    /// or another answer is still in flight.
    pub fn begin_turn(&mut self, text: &str) -> Option<String> {
        let question = text.trim();
        if question.is_empty() || self.loading {
            return None;
        }

        self.push(ChatRole::User, question.to_string());
        self.loading = true;
        self.error = None;
        Some(question.to_string())
    }

    /// Append the empty assistant message that deltas will stream into.
    pub fn start_reply(&mut self) {
        if self.streaming.is_some() {
            return;
        }
        let id = self.push(ChatRole::Assistant, String::new());
        self.streaming = Some(id);
    }

    pub fn append_delta(&mut self, delta: &str) {
        if self.streaming.is_none() {
            self.start_reply();
        }
        if let Some(message) = self.streaming_message_mut() {
            message.content.push_str(delta);
        }
    }

    pub fn finish_reply(&mut self) {
        if let Some(message) = self.streaming_message_mut() {
            debug!(id = message.id, chars = message.content.chars().count(), "answer complete");
        }
        self.streaming = None;
        self.loading = false;
    }

    /// Abort the current turn: the partial answer is dropped and `error`
    /// becomes the single user-visible error.
    pub fn fail_reply(&mut self, error: impl Into<String>) {
        if let Some(id) = self.streaming.take() {
            self.messages.retain(|m| m.id != id);
        }
        self.loading = false;
        self.error = Some(error.into());
    }

    /// Empty the transcript. Refused while an answer is in flight.
    pub fn clear(&mut self) -> bool {
        if self.loading {
            return false;
        }
        self.messages.clear();
        self.error = None;
        true
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    fn push(&mut self, role: ChatRole, content: String) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.messages.push(ChatMessage { id, role, content });
        id
    }

    fn streaming_message_mut(&mut self) -> Option<&mut ChatMessage> {
        let id = self.streaming?;
        self.messages.iter_mut().rev().find(|m| m.id == id)
    }
}
