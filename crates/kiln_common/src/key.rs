//! Composite cache keys identifying (source content, build parameters) pairs.

use crate::digest::Digest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte build-cache key: a 16-byte primary (source content) digest
/// followed by a 16-byte secondary (build parameters) digest.
///
/// Two builds with identical source content and identical declared
/// parameters produce byte-identical keys on any machine; nothing
/// machine-local (absolute paths, timestamps, hostnames) may feed into
/// either half.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Size of a cache key in bytes.
    pub const SIZE: usize = 32;

    /// Composes a key from a primary (source) and secondary (parameter) digest.
    pub fn new(primary: Digest, secondary: Digest) -> Self {
        let mut raw = [0u8; 32];
        raw[..16].copy_from_slice(primary.as_raw());
        raw[16..].copy_from_slice(secondary.as_raw());
        Self(raw)
    }

    /// Returns the primary (source content) half of the key.
    pub fn primary(&self) -> Digest {
        let mut raw = [0u8; 16];
        raw.copy_from_slice(&self.0[..16]);
        Digest::from_raw(raw)
    }

    /// Returns the secondary (build parameters) half of the key.
    pub fn secondary(&self) -> Digest {
        let mut raw = [0u8; 16];
        raw.copy_from_slice(&self.0[16..]);
        Digest::from_raw(raw)
    }

    /// Returns the raw 32-byte representation.
    pub fn as_raw(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halves_roundtrip() {
        let primary = Digest::from_bytes(b"scene content");
        let secondary = Digest::from_bytes(b"gpu=mali;quality=high");
        let key = CacheKey::new(primary, secondary);
        assert_eq!(key.primary(), primary);
        assert_eq!(key.secondary(), secondary);
    }

    #[test]
    fn identical_inputs_identical_keys() {
        let a = CacheKey::new(Digest::from_bytes(b"src"), Digest::from_bytes(b"params"));
        let b = CacheKey::new(Digest::from_bytes(b"src"), Digest::from_bytes(b"params"));
        assert_eq!(a, b);
    }

    #[test]
    fn parameter_change_changes_key() {
        let src = Digest::from_bytes(b"src");
        let a = CacheKey::new(src, Digest::from_bytes(b"optimize=true"));
        let b = CacheKey::new(src, Digest::from_bytes(b"optimize=false"));
        assert_ne!(a, b);
    }

    #[test]
    fn display_is_64_hex_chars() {
        let key = CacheKey::new(Digest::from_bytes(b"a"), Digest::from_bytes(b"b"));
        let s = format!("{key}");
        assert_eq!(s.len(), 64);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn layout_is_primary_then_secondary() {
        let primary = Digest::from_bytes(b"p");
        let secondary = Digest::from_bytes(b"s");
        let key = CacheKey::new(primary, secondary);
        assert_eq!(&key.as_raw()[..16], primary.as_raw());
        assert_eq!(&key.as_raw()[16..], secondary.as_raw());
    }
}
