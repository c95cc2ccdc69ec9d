//! The Kiln export orchestrator.
//!
//! Drives the leaf components over a source tree: change detection decides
//! what to rebuild, the build cache short-circuits rebuilds that another
//! machine already did, scenes are sanitized and their dependencies
//! collected, textures are compressed per GPU family on a worker pool, and
//! everything lands in every configured output target.

#![warn(missing_docs)]

pub mod params;
pub mod pipeline;
pub mod state;

pub use params::BuildParams;
pub use pipeline::Pipeline;
pub use state::ExportState;
