//! Error types for the affinity scheduler.

use thiserror::Error;

/// Result type alias using the affinity scheduler's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for affinity scheduler operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Proposal not found
    #[error("Proposal not found: {0}")]
    ProposalNotFound(uuid::Uuid),

    /// Embedding computation failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Clustering capability failed
    #[error("Clustering error: {0}")]
    Clustering(String),

    /// A capability call exceeded its bounded timeout
    #[error("Capability timeout: {0}")]
    CapabilityTimeout(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
