//! Project configuration loading for the Kiln asset pipeline.
//!
//! Parses and validates `kiln.toml`, which declares the source root, the
//! output targets with their GPU families, build options, atlas packing
//! parameters, external tool paths, and the optional build-cache store.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use types::{
    AtlasConfig, BuildConfig, CacheConfig, OutputTarget, ProjectConfig, ProjectMeta, Quality,
    ToolsConfig,
};
