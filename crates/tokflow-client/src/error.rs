//! Error types for the stream consumer.

use thiserror::Error;

/// Stream consumer error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// The relay answered with a terminal error response.
    #[error("{message}")]
    Relay { status: u16, message: String },

    /// The event stream closed without delivering the Done sentinel.
    #[error("Stream ended before completion")]
    StreamFault,

    /// The event stream reported a transport fault.
    #[error("Stream failed: {0}")]
    Stream(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for consumer operations
pub type Result<T> = std::result::Result<T, ClientError>;
