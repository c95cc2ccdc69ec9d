//! Error types for atlas packing.

use std::path::PathBuf;

/// Errors that can occur while packing or composing an atlas.
#[derive(Debug, thiserror::Error)]
pub enum AtlasError {
    /// A single frame cannot fit even the maximum page resolution.
    ///
    /// Reported as a validation failure rather than emitting an oversized
    /// page.
    #[error("frame '{name}' ({width}x{height} with margin) exceeds the {max}x{max} page maximum")]
    FrameTooLarge {
        /// The frame's name.
        name: String,
        /// Frame width including margin, in pixels.
        width: u32,
        /// Frame height including margin, in pixels.
        height: u32,
        /// The configured maximum page dimension.
        max: u32,
    },

    /// A definition manifest or page image could not be read or written.
    #[error("atlas I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Page composition was given no pixels for a placed frame.
    #[error("no source image supplied for placed frame '{name}'")]
    MissingImage {
        /// The frame's name.
        name: String,
    },

    /// A supplied source image does not match its frame's declared size.
    #[error("frame '{name}' declared {declared_width}x{declared_height} but image is {actual_width}x{actual_height}")]
    SizeMismatch {
        /// The frame's name.
        name: String,
        /// Declared width in pixels.
        declared_width: u32,
        /// Declared height in pixels.
        declared_height: u32,
        /// Actual image width in pixels.
        actual_width: u32,
        /// Actual image height in pixels.
        actual_height: u32,
    },

    /// A definition manifest failed to serialize or deserialize.
    #[error("atlas definition error: {reason}")]
    Definition {
        /// Description of the failure.
        reason: String,
    },
}
