//! Cache bundles: opaque groups of output files plus descriptive metadata.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use kiln_common::Digest;

use crate::error::CacheError;

/// Magic bytes identifying a Kiln cache bundle.
const BUNDLE_MAGIC: [u8; 4] = *b"KBDL";

/// Current bundle format version. Increment on breaking changes.
const BUNDLE_FORMAT_VERSION: u32 = 1;

/// Descriptive metadata stored alongside a bundle's files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleMeta {
    /// Hostname of the machine that produced the bundle.
    pub machine: String,
    /// Unix timestamp (seconds) when the bundle was stored.
    pub timestamp: u64,
    /// Free-text description supplied when the cache was attached.
    pub comment: String,
}

impl BundleMeta {
    /// Creates metadata for a bundle produced right now on this machine.
    pub fn now(comment: impl Into<String>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let machine = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
        Self {
            machine,
            timestamp,
            comment: comment.into(),
        }
    }
}

/// An opaque bundle of output files keyed by their output-relative paths.
///
/// The pipeline stores one bundle per rebuilt directory and replays its
/// files into every requested output target on a later cache hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheBundle {
    /// Bundle metadata.
    pub meta: BundleMeta,
    /// File contents keyed by path relative to the output target root.
    pub files: BTreeMap<PathBuf, Vec<u8>>,
}

impl CacheBundle {
    /// Creates an empty bundle with the given metadata.
    pub fn new(meta: BundleMeta) -> Self {
        Self {
            meta,
            files: BTreeMap::new(),
        }
    }

    /// Adds a file to the bundle.
    pub fn insert(&mut self, relative_path: impl Into<PathBuf>, bytes: Vec<u8>) {
        self.files.insert(relative_path.into(), bytes);
    }

    /// Serializes the bundle with a validated binary framing:
    /// 4-byte little-endian payload-header length, then the bincode header
    /// (magic, format version, payload checksum), then the bincode payload.
    pub fn encode(&self) -> Result<Vec<u8>, CacheError> {
        let payload = bincode::serde::encode_to_vec(self, bincode::config::standard()).map_err(
            |e| CacheError::Serialization {
                reason: e.to_string(),
            },
        )?;

        let header = BundleHeader {
            magic: BUNDLE_MAGIC,
            format_version: BUNDLE_FORMAT_VERSION,
            checksum: Digest::from_bytes(&payload),
        };
        let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;

        let header_len = header_bytes.len() as u32;
        let mut out = Vec::with_capacity(4 + header_bytes.len() + payload.len());
        out.extend_from_slice(&header_len.to_le_bytes());
        out.extend_from_slice(&header_bytes);
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// Deserializes a bundle, validating magic, format version, and checksum.
    ///
    /// Returns `None` on any validation failure; corruption reads as a cache
    /// miss.
    pub fn decode(raw: &[u8]) -> Option<Self> {
        if raw.len() < 4 {
            return None;
        }
        let header_len = u32::from_le_bytes(raw[..4].try_into().ok()?) as usize;
        if raw.len() < 4 + header_len {
            return None;
        }

        let header: BundleHeader =
            bincode::serde::decode_from_slice(&raw[4..4 + header_len], bincode::config::standard())
                .ok()?
                .0;
        if header.magic != BUNDLE_MAGIC || header.format_version != BUNDLE_FORMAT_VERSION {
            return None;
        }

        let payload = &raw[4 + header_len..];
        if Digest::from_bytes(payload) != header.checksum {
            return None;
        }

        bincode::serde::decode_from_slice(payload, bincode::config::standard())
            .ok()
            .map(|(bundle, _)| bundle)
    }
}

/// Header prepended to every encoded bundle for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BundleHeader {
    magic: [u8; 4],
    format_version: u32,
    checksum: Digest,
}
