//! Error types for the Michi gateway

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Michi gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio payload exceeds the configured maximum
    #[error("audio payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Audio decoding/validation error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("transcription failed: {0}")]
    Stt(String),

    /// Text-to-speech error (both synthesis tiers exhausted)
    #[error("speech synthesis failed: {0}")]
    Tts(String),

    /// LLM completion error
    #[error("generation failed: {0}")]
    Llm(String),

    /// Embedding error
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Command publish error
    #[error("publish error: {0}")]
    Publish(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}
