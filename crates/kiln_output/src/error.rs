//! Error types for output placement.

use std::path::PathBuf;

/// Errors that can occur while writing outputs or manifests.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// A file or directory could not be read, created, or copied.
    #[error("output I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A dependency manifest file is malformed.
    ///
    /// Reported as a validation failure; the consumer re-derives the
    /// dependencies from the scene instead.
    #[error("malformed dependency manifest {path}: {reason}")]
    ManifestParse {
        /// The manifest's path.
        path: PathBuf,
        /// Description of the problem.
        reason: String,
    },
}
