//! Output placement for the Kiln asset pipeline.
//!
//! Mirrors the source tree's directory layout into every output target,
//! copies exported files (skipping byte-identical destinations), places
//! GPU-specific artifacts under per-family subdirectories, and reads and
//! writes the per-scene dependency manifest.

#![warn(missing_docs)]

pub mod error;
pub mod manifest;
pub mod writer;

pub use error::OutputError;
pub use manifest::{read_manifest, write_manifest};
pub use writer::OutputWriter;
