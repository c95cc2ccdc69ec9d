//! Error types for digest operations.

use std::path::PathBuf;

/// Errors that can occur while computing or persisting digests.
///
/// Record *reads* are fail-open and never surface these errors; they are
/// returned only from digest computation over sources and from record
/// writes, where the caller must know the update did not land.
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    /// An I/O error occurred while reading a source or writing a record.
    #[error("digest I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A record could not be serialized.
    #[error("digest record serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}
