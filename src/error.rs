//! Error types for Sigma

use thiserror::Error;

/// Result type alias for Sigma operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur across the Sigma toolkit
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (bad environment variable, unreadable config)
    #[error("configuration error: {0}")]
    Config(String),

    /// Endpoint registry lookup failed
    #[error("{0}")]
    Registry(String),

    /// Caller supplied an argument the operation cannot accept
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// LLM request or response error
    #[error("{0}")]
    Llm(String),

    /// Speech-to-text error
    #[error("{0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Audio encoding error
    #[error("audio error: {0}")]
    Audio(String),

    /// Conversation orchestration error
    #[error("conversation error: {0}")]
    Conversation(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<hound::Error> for Error {
    fn from(e: hound::Error) -> Self {
        Self::Audio(e.to_string())
    }
}
