//! Incremental decoding of streamed answers
//!
//! The ask API answers with a chunked body framed as server-sent events:
//!
//! ```text
//! data: {"content": "Hello"}
//!
//! data: {"content": " world"}
//!
//! data: [DONE]
//! ```
//!
//! Network chunks do not line up with characters or lines, so the decoder
//! buffers partial UTF-8 sequences and partial lines between calls to
//! [`SseDecoder::push`]. The payload shape is not fixed either; see
//! [`extract_delta`] for the accepted variants.

use serde_json::Value;
use tracing::{debug, warn};

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Top-level string fields that may carry the text delta, checked in order.
const DELTA_FIELDS: [&str; 5] = ["content", "delta", "text", "token", "response"];

/// Nested locations used by OpenAI, Anthropic and Ollama style payloads.
const DELTA_POINTERS: [&str; 5] = [
    "/delta/content",
    "/delta/text",
    "/message/content",
    "/choices/0/delta/content",
    "/choices/0/text",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A piece of answer text to append to the transcript.
    Delta(String),
    /// The server signalled the end of the answer.
    Done,
    /// The server reported an error inside the stream.
    Error(String),
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    // Trailing bytes of an incomplete UTF-8 sequence
    pending_bytes: Vec<u8>,
    // Text received after the last newline
    line: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of the response body, returning the events completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let text = self.decode(chunk);
        self.line.push_str(&text);

        let mut events = Vec::new();
        while let Some(newline) = self.line.find('\n') {
            let line: String = self.line.drain(..=newline).collect();
            if let Some(event) = parse_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush whatever is left once the body has ended.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        if !self.pending_bytes.is_empty() {
            let tail = String::from_utf8_lossy(&self.pending_bytes).into_owned();
            self.pending_bytes.clear();
            self.line.push_str(&tail);
        }

        let line = std::mem::take(&mut self.line);
        parse_line(&line).into_iter().collect()
    }

    fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending_bytes);
        bytes.extend_from_slice(chunk);

        let mut text = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        // Sequence continues in the next chunk
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        self.pending_bytes = rest.to_vec();
        text
    }
}

fn parse_line(raw: &str) -> Option<SseEvent> {
    let line = raw.trim_end_matches(|c: char| c == '\n' || c == '\r');
    let payload = line.strip_prefix(DATA_PREFIX)?;
    let payload = payload.strip_prefix(' ').unwrap_or(payload).trim();

    if payload.is_empty() {
        return None;
    }
    if payload == DONE_SENTINEL {
        return Some(SseEvent::Done);
    }

    let value: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(err) => {
            warn!(%err, payload, "skipping unparsable stream payload");
            return None;
        }
    };

    if let Some(message) = extract_error(&value) {
        return Some(SseEvent::Error(message));
    }

    match extract_delta(&value) {
        Some(delta) if !delta.is_empty() => Some(SseEvent::Delta(delta)),
        _ => {
            debug!(payload, "stream payload carried no text");
            None
        }
    }
}

/// Pull the text delta out of one decoded payload.
///
/// A bare JSON string is the delta itself. Objects are checked for the
/// top-level fields `content`, `delta`, `text`, `token` and `response`, then
/// for `delta.content`, `delta.text`, `message.content`,
/// `choices[0].delta.content` and `choices[0].text`.
pub fn extract_delta(value: &Value) -> Option<String> {
    if let Some(text) = value.as_str() {
        return Some(text.to_owned());
    }

    DELTA_FIELDS
        .iter()
        .find_map(|field| value.get(field).and_then(Value::as_str))
        .or_else(|| {
            DELTA_POINTERS
                .iter()
                .find_map(|pointer| value.pointer(pointer).and_then(Value::as_str))
        })
        .map(str::to_owned)
}

fn extract_error(value: &Value) -> Option<String> {
    match value.get("error")? {
        Value::Null => None,
        Value::String(message) => Some(message.clone()),
        other => Some(
            other
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .unwrap_or_else(|| other.to_string()),
        ),
    }
}
