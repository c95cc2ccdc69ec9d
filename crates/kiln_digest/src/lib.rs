//! Change detection for the Kiln asset pipeline.
//!
//! Computes content digests for directory subtrees, single files, and
//! build-parameter strings, and persists them in small binary records so
//! later runs can tell whether a rebuild is needed. All record reads are
//! fail-open: a missing or corrupt record means "changed", triggering a
//! rebuild rather than a silent skip.

#![warn(missing_docs)]

pub mod detector;
pub mod error;
pub mod record;

pub use detector::ChangeDetector;
pub use error::DigestError;
pub use record::DigestRecord;
