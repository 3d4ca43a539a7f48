//! Serving error types.

/// Errors that end a serving loop.
///
/// Failures of individual operations never surface here; they become
/// error replies on the wire.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// Byte channel I/O error
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Outbound message could not be encoded
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Writer task did not complete
    #[error("Writer task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The session's outbound channel was already claimed by another serve loop
    #[error("Session is already being served")]
    AlreadyServing,
}
