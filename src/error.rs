//! Error types for chat-tts.

/// Errors raised by the gating engine, the speech sink and the preference store.
#[derive(Debug, thiserror::Error)]
pub enum TtsError {
    /// A replacement rule was added with an empty pattern.
    #[error("invalid pattern: replacement patterns must not be empty")]
    InvalidPattern,

    /// Wrong argument count or unknown subcommand.
    #[error("command error: {0}")]
    CommandParse(String),

    /// Writing an utterance to the speech process failed.
    #[error("sink write error: {0}")]
    SinkWrite(String),

    /// The speech process could not be started.
    #[error("sink spawn error: {0}")]
    SinkSpawn(String),

    /// Reading or writing stored preferences failed.
    #[error("preferences error: {0}")]
    Preferences(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, TtsError>;
