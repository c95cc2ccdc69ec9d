//! Content digests for change detection and cache addressing.

use serde::{Deserialize, Serialize};
use std::fmt;
use xxhash_rust::xxh3::Xxh3;

/// A 128-bit content digest computed using XXH3.
///
/// Two inputs with the same `Digest` are assumed to have identical content.
/// Used throughout the pipeline to decide whether a source file, directory
/// subtree, or parameter set has changed since the last export, and as both
/// halves of a [`CacheKey`](crate::CacheKey).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest([u8; 16]);

impl Digest {
    /// Size of a digest in bytes.
    pub const SIZE: usize = 16;

    /// Computes a digest of a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Self(hash.to_le_bytes())
    }

    /// Reconstructs a digest from its raw 16-byte representation.
    pub fn from_raw(raw: [u8; 16]) -> Self {
        Self(raw)
    }

    /// Returns the raw 16-byte representation.
    pub fn as_raw(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// An incremental digest accumulator for multi-part inputs.
///
/// Directory digests fold many file names and contents into one
/// [`Digest`]; the fold is order-sensitive, so callers must feed parts in a
/// deterministic (sorted) order to produce machine-independent results.
pub struct DigestFold {
    state: Xxh3,
}

impl DigestFold {
    /// Creates an empty fold.
    pub fn new() -> Self {
        Self { state: Xxh3::new() }
    }

    /// Feeds a chunk of bytes into the fold.
    pub fn update(&mut self, data: &[u8]) {
        self.state.update(data);
    }

    /// Finishes the fold and returns the accumulated digest.
    pub fn finish(self) -> Digest {
        Digest(self.state.digest128().to_le_bytes())
    }
}

impl Default for DigestFold {
    fn default() -> Self {
        Self::new()
    }
}
