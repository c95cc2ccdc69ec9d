//! Shared foundational types used across the Kiln asset pipeline.
//!
//! This crate provides core types including content digests, composite cache
//! keys, and the exported-object data model that every pipeline stage
//! exchanges.

#![warn(missing_docs)]

pub mod digest;
pub mod key;
pub mod object;

pub use digest::{Digest, DigestFold};
pub use key::CacheKey;
pub use object::{ExportedObject, ExportedObjectCollection, ObjectKind};
