//! Error types for the analysis engine.
//!
//! The turn pipeline never surfaces these to the chat caller directly:
//! retrieval errors degrade to empty grounding and completion errors degrade
//! to the fixed fallback reply. They exist so internal layers can report what
//! actually went wrong to logs and tests.

use thiserror::Error;

/// Errors raised by the engine's internal components.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The embedding backend failed or returned a malformed vector.
    #[error("embedding error: {message}")]
    Embedding { message: String },

    /// The completion backend failed, timed out, or returned no content.
    #[error("completion error: {message}")]
    Completion { message: String },

    /// The knowledge index could not be loaded or persisted.
    #[error("knowledge index error: {message}")]
    Index { message: String },

    /// A request was structurally invalid at the boundary.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Underlying JSON failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Shorthand for an embedding failure.
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    /// Shorthand for a completion failure.
    pub fn completion(message: impl Into<String>) -> Self {
        Self::Completion {
            message: message.into(),
        }
    }

    /// Shorthand for an index failure.
    pub fn index(message: impl Into<String>) -> Self {
        Self::Index {
            message: message.into(),
        }
    }
}
