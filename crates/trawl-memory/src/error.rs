//! Error types for memory operations.

/// Errors returned by memory stores.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// The backing log could not be read or written.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// A log line could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Conversation id cannot be mapped to a log.
    #[error("invalid conversation id: {0:?}")]
    InvalidConversation(String),
}
