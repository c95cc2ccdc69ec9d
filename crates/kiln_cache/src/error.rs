//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur during cache transport operations.
///
/// These never escape the [`BuildCache`](crate::BuildCache) client: every
/// failure is logged as a warning diagnostic and degraded to a miss or a
/// no-op store. The enum exists for propagation between the transport and
/// the client.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while talking to the store.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The store could not be reached within the configured timeout.
    #[error("cache store {store} unreachable within {timeout_ms}ms")]
    ConnectTimeout {
        /// The store root that was probed.
        store: PathBuf,
        /// The configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// A bundle could not be serialized or deserialized.
    #[error("cache bundle serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}
