//! Error types for the memory engine.
//!
//! Hard failures are returned as [`MemoryError`]. Conditions the engine
//! recovers from on its own are reported alongside a successful outcome as
//! [`SoftFailure`] entries.

use serde::Serialize;
use thiserror::Error;

use crate::types::MemoryId;

/// Errors that can occur in the memory engine.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Database connection or operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Referenced memory does not exist.
    #[error("No such memory: {0}")]
    NotFound(String),

    /// Required input is missing or malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid UUID format.
    #[error("Invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    /// Stored data could not be decoded.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The record store rejected a write.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The embedding provider failed.
    #[error("Embedding error: {0}")]
    Embedding(#[from] mnemos_embed::EmbedError),
}

impl MemoryError {
    /// Shorthand for a missing node.
    pub fn not_found(id: MemoryId) -> Self {
        MemoryError::NotFound(id.to_string())
    }
}

/// Result type alias for memory operations.
pub type Result<T> = std::result::Result<T, MemoryError>;

/// Kind of a recovered failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SoftFailureKind {
    /// The embedding provider is not configured or did not answer.
    ProviderUnavailable,
    /// The record store rejected a write; in-memory state was kept.
    PersistenceFailure,
}

/// A failure the engine recovered from while completing an operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoftFailure {
    pub kind: SoftFailureKind,
    /// Node the failure relates to, if any.
    pub memory_id: Option<MemoryId>,
    pub message: String,
}

impl SoftFailure {
    /// The embedding provider could not be used.
    pub fn provider_unavailable(memory_id: Option<MemoryId>, message: impl Into<String>) -> Self {
        Self {
            kind: SoftFailureKind::ProviderUnavailable,
            memory_id,
            message: message.into(),
        }
    }

    /// A record store write failed.
    pub fn persistence(memory_id: Option<MemoryId>, err: &MemoryError) -> Self {
        Self {
            kind: SoftFailureKind::PersistenceFailure,
            memory_id,
            message: err.to_string(),
        }
    }
}
