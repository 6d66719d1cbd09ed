//! Error types for the Jarvis assistant

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the assistant
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Microphone produced no usable utterance
    #[error("capture failed: {0}")]
    CaptureFailure(String),

    /// Wake-word input stream could not be opened or read
    #[error("audio stream failure: {0}")]
    StreamFailure(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Name not present in either command table
    #[error("command not found: {0}")]
    LookupMiss(String),

    /// Process or browser could not be started
    #[error("launch failed: {0}")]
    LaunchFailure(String),

    /// Utterance matched no intent rule
    #[error("unhandled intent: {0}")]
    UnhandledIntent(String),

    /// Invalid command entry
    #[error("invalid command: {0}")]
    InvalidCommand(String),

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

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}
