//! Error types for matching operations.

use std::path::PathBuf;

use pharm_model::ModelError;
use thiserror::Error;

/// Errors surfaced by the matching engine.
///
/// Only boundary checks and configuration loading fail; everything inside the
/// per-line pipeline degrades instead.
#[derive(Debug, Error)]
pub enum MatchError {
    /// Catalog or invoice rejected before matching started.
    #[error(transparent)]
    Boundary(#[from] ModelError),

    #[error("failed to read config {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid match config: {message}")]
    InvalidConfig { message: String },
}

/// Result type alias for matching operations.
pub type Result<T> = std::result::Result<T, MatchError>;
