//! Error types for scene loading and dependency collection.

use std::path::PathBuf;

/// Errors that can occur while loading scenes or collecting dependencies.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// A scene or emitter-config file could not be read.
    #[error("scene I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A scene or emitter-config file is not valid JSON or has the wrong shape.
    #[error("failed to parse {path}: {reason}")]
    Parse {
        /// The file that failed to parse.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// An emitter config references itself, directly or through a chain of
    /// super-emitters.
    #[error("emitter config cycle detected at {path} (chain: {chain})")]
    EmitterCycle {
        /// The config at which the cycle closed.
        path: PathBuf,
        /// The reference chain that led back to `path`, rendered `a -> b -> a`.
        chain: String,
    },
}
