pub mod client;
pub mod config;
pub mod error;
pub mod prompts;
pub mod sources;
pub mod state;
pub mod stream;

// Re-export main types for convenience
pub use client::{AskClient, HealthStatus};
pub use config::{Config, ConfigOverrides, Endpoint, Theme, API_URL_ENV};
pub use error::{ChatError, Result};
pub use prompts::{DefaultPrompt, DEFAULT_PROMPTS};
pub use sources::{Source, KNOWN_SOURCES};
pub use state::{ChatMessage, ChatRole, Conversation};
pub use stream::{extract_delta, SseDecoder, SseEvent};
