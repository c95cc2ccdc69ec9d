//! Distributed build cache for the Kiln asset pipeline.
//!
//! The cache is content-addressed by a 32-byte composite [`CacheKey`]
//! (source digest + parameter digest) and strictly advisory: any transport
//! or store-side failure is logged and degraded to a cache miss or a no-op
//! store, and the pipeline proceeds with a full local rebuild. A store that
//! cannot be reached within the configured timeout at attach time disables
//! caching for the remainder of the run instead of retrying per object.
//!
//! [`CacheKey`]: kiln_common::CacheKey

#![warn(missing_docs)]

pub mod bundle;
pub mod client;
pub mod error;
pub mod store;

pub use bundle::{BundleMeta, CacheBundle};
pub use client::BuildCache;
pub use error::CacheError;
pub use store::{CacheTransport, DirStore};
