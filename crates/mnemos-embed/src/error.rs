//! Error types for embedding providers.

use thiserror::Error;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Errors that can occur while producing embeddings.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// No provider is configured, or the provider cannot be reached.
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with an error status.
    #[error("provider error: {0}")]
    Backend(String),

    /// The provider answered with something we could not use.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Provider configuration is incomplete or unknown.
    #[error("configuration error: {0}")]
    Config(String),
}

impl EmbedError {
    /// Whether this error means "no provider" rather than a failed call.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, EmbedError::Unavailable(_))
    }
}
