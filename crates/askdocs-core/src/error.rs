use thiserror::Error;

/// Everything that can go wrong while asking a question.
///
/// The `Display` output is what the chat screen shows in its error banner.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("HTTP error! status: {0}")]
    Status(u16),

    #[error("{0}")]
    Request(#[from] reqwest::Error),

    /// The backend reported a failure inside the stream (`data: {"error": ...}`).
    #[error("{0}")]
    Server(String),

    #[error("question must not be empty")]
    EmptyQuestion,

    #[error("temperature must be between 0.0 and 2.0, got {0}")]
    InvalidTemperature(f32),
}

pub type Result<T> = std::result::Result<T, ChatError>;
