//! Per-GPU texture compression for the Kiln asset pipeline.
//!
//! For each requested GPU family this crate resolves the configured target
//! pixel format, validates the source images against the format's
//! constraints, dispatches compression to an external block encoder, and
//! optionally splits high-detail mip levels into separately loadable files.
//! The pixel-level encoders themselves are external tools; only the decision
//! of what to invoke and how results are validated and cached lives here.

#![warn(missing_docs)]

pub mod compress;
pub mod container;
pub mod descriptor;
pub mod error;
pub mod gpu;
pub mod source;
pub mod validate;

pub use compress::{CompressedArtifact, Encoder, TextureCompressor, TextureOutcome, ToolEncoder};
pub use container::{CompressedTexture, MIN_COMPRESS_DIM};
pub use descriptor::CompressionDescriptor;
pub use error::TextureError;
pub use gpu::{GpuFamily, PixelFormat};
pub use source::{SourceFormat, TextureSource};
