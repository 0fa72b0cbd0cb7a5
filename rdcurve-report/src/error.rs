//! Report errors

use std::path::PathBuf;

use thiserror::Error;

/// Errors from curve persistence and rendering
#[derive(Error, Debug)]
pub enum ReportError {
    /// Destination could not be created; never auto-resolved
    #[error("cannot write {path}: {source}")]
    Write {
        /// Destination that failed.
        path: PathBuf,
        /// Underlying filesystem error.
        source: std::io::Error,
    },

    /// Persisted results could not be read back
    #[error("cannot read {path}: {source}")]
    Read {
        /// Source that failed.
        path: PathBuf,
        /// Underlying filesystem error.
        source: std::io::Error,
    },

    /// Plot rendering failed
    #[error("render failed: {0}")]
    Render(String),

    /// Image format name not in the supported set
    #[error("unsupported image format '{0}' (expected svg, png or webp)")]
    UnsupportedFormat(String),

    /// Serialization error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
