//! Learning store error types.

use std::path::PathBuf;

use thiserror::Error;

/// Learning store operation error.
#[derive(Debug, Error)]
pub enum LearnError {
    /// The store cannot serve requests (poisoned lock, closed journal).
    #[error("learning store unavailable: {reason}")]
    Unavailable { reason: String },

    /// File I/O error.
    #[error("failed to {operation} {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A journal line could not be decoded.
    #[error("corrupt journal entry at {path}:{line}")]
    CorruptJournal {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize learning data")]
    Serialization {
        #[source]
        source: serde_json::Error,
    },

    /// Temp file could not be renamed over the target.
    #[error("failed to complete export to {target_path}")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid learning policy: {message}")]
    InvalidPolicy { message: String },
}

impl LearnError {
    pub(crate) fn poisoned() -> Self {
        Self::Unavailable {
            reason: "store lock poisoned by a panicked writer".to_string(),
        }
    }
}

/// Result type alias for learning store operations.
pub type Result<T> = std::result::Result<T, LearnError>;
