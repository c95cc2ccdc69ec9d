//! Persisted digest records.
//!
//! A record is a small binary file holding exactly one content digest,
//! framed with magic bytes and a format version so stale or foreign files
//! read as "no record" instead of a bogus digest.

use std::path::Path;

use kiln_common::Digest;
use serde::{Deserialize, Serialize};

use crate::error::DigestError;

/// Magic bytes identifying a Kiln digest record.
const RECORD_MAGIC: [u8; 4] = *b"KDIG";

/// Current record format version. Increment on breaking changes.
const RECORD_FORMAT_VERSION: u32 = 1;

/// A persisted digest record for a directory subtree, file, or parameter set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestRecord {
    /// Magic bytes: must be `b"KDIG"`.
    magic: [u8; 4],
    /// Record format version.
    format_version: u32,
    /// The stored digest.
    digest: Digest,
}

impl DigestRecord {
    /// Creates a record holding the given digest.
    pub fn new(digest: Digest) -> Self {
        Self {
            magic: RECORD_MAGIC,
            format_version: RECORD_FORMAT_VERSION,
            digest,
        }
    }

    /// Returns the stored digest.
    pub fn digest(&self) -> Digest {
        self.digest
    }

    /// Loads a record from disk, returning `None` if the file is missing,
    /// truncated, carries the wrong magic, or has a different format version.
    ///
    /// This is fail-open: any problem reads as "no prior digest", which the
    /// change detector treats as "changed".
    pub fn load(path: &Path) -> Option<Self> {
        let raw = std::fs::read(path).ok()?;
        let record: DigestRecord =
            bincode::serde::decode_from_slice(&raw, bincode::config::standard())
                .ok()?
                .0;
        if record.magic != RECORD_MAGIC || record.format_version != RECORD_FORMAT_VERSION {
            return None;
        }
        Some(record)
    }

    /// Writes the record atomically.
    ///
    /// The bytes land in a sibling temp file first and are renamed into
    /// place, so a crash mid-write leaves either the old record or no
    /// record, never a partially written one.
    pub fn store(&self, path: &Path) -> Result<(), DigestError> {
        let bytes = bincode::serde::encode_to_vec(self, bincode::config::standard()).map_err(
            |e| DigestError::Serialization {
                reason: e.to_string(),
            },
        )?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| DigestError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let tmp = path.with_extension("digest.tmp");
        std::fs::write(&tmp, &bytes).map_err(|e| DigestError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, path).map_err(|e| DigestError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
