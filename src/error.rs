//! Error types for the speakstream pipeline.

/// Top-level error type for the streaming speech front-end.
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    /// Model stream read or open error.
    #[error("stream error: {0}")]
    Stream(String),

    /// Speech playback collaborator error.
    #[error("playback error: {0}")]
    Playback(String),

    /// Correction service request or response error.
    #[error("correction error: {0}")]
    Correction(String),

    /// Agent classifier error.
    #[error("classifier error: {0}")]
    Classifier(String),

    /// Key-value persistence error.
    #[error("store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, SpeechError>;
