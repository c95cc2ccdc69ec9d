//! Error types for texture compression.

use std::path::PathBuf;

use crate::gpu::{GpuFamily, PixelFormat};

/// Errors that can occur while validating or compressing a texture.
///
/// Validation variants mark a single (texture, GPU family) pair as failed;
/// the compressor keeps processing the remaining pairs.
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    /// A source or artifact file could not be read or written.
    #[error("texture I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The texture has no configured pixel format for the requested family.
    #[error("{path}: no pixel format configured for GPU family {family}")]
    NoFormatForFamily {
        /// The texture's relative path.
        path: PathBuf,
        /// The family that lacks a format.
        family: GpuFamily,
    },

    /// A descriptor names a pixel format or family this pipeline doesn't know.
    #[error("{path}: unknown name in descriptor: {name}")]
    UnknownName {
        /// The descriptor's path.
        path: PathBuf,
        /// The unrecognized family or format name.
        name: String,
    },

    /// The descriptor file is not valid TOML.
    #[error("failed to parse descriptor {path}: {reason}")]
    DescriptorParse {
        /// The descriptor's path.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// A block format requiring square input was given a non-square image.
    #[error("{path}: {format} requires square input, got {width}x{height}")]
    NonSquareSource {
        /// The texture's relative path.
        path: PathBuf,
        /// The format that demands square input.
        format: PixelFormat,
        /// Source width in pixels.
        width: u32,
        /// Source height in pixels.
        height: u32,
    },

    /// The source image is too small to block-compress.
    #[error("{path}: {width}x{height} is below the {min}x{min} compression minimum")]
    SourceTooSmall {
        /// The texture's relative path.
        path: PathBuf,
        /// Source width in pixels.
        width: u32,
        /// Source height in pixels.
        height: u32,
        /// The fixed minimum dimension.
        min: u32,
    },

    /// HD mip splitting was requested but the source container cannot carry
    /// a mip chain in its native form.
    #[error("{path}: container format {container} does not support HD mip splitting")]
    HdSplitUnsupported {
        /// The texture's relative path.
        path: PathBuf,
        /// Name of the offending container format.
        container: String,
    },

    /// The external encoder failed.
    #[error("encoder failed for {path}: {reason}")]
    EncoderFailed {
        /// The texture's relative path.
        path: PathBuf,
        /// Captured tool output or invocation error.
        reason: String,
    },

    /// A staleness digest could not be computed or recorded.
    #[error(transparent)]
    Digest(#[from] kiln_digest::DigestError),

    /// A compressed container file is malformed.
    #[error("invalid compressed container {path}: {reason}")]
    InvalidContainer {
        /// The container's path.
        path: PathBuf,
        /// Description of the problem.
        reason: String,
    },
}
