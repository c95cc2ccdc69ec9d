//! Cache transport abstraction and the shared-directory store.

use std::path::{Path, PathBuf};
use std::time::Duration;

use kiln_common::CacheKey;

use crate::bundle::CacheBundle;
use crate::error::CacheError;

/// Subdirectory of the store root holding bundle files.
const BUNDLE_SUBDIR: &str = "bundles";

/// File extension for stored bundles.
const BUNDLE_EXT: &str = "kbdl";

/// Synchronous request/add transport to a cache store.
///
/// Both calls block; "not found" is a normal `Ok(None)` outcome, not an
/// error. The store itself guarantees that a key maps to at most one valid
/// bundle at a time; the client only issues these two calls and never holds
/// a lock. The trait is the seam that lets a future implementation swap in
/// asynchronous I/O without touching packing or compression logic.
pub trait CacheTransport: Send + Sync {
    /// Probes the store, honoring `timeout`. Called once when the cache is
    /// attached; failure or timeout disables caching for the run.
    fn connect(&self, timeout: Duration) -> Result<(), CacheError>;

    /// Fetches the bundle stored under `key`, if any.
    fn request(&self, key: CacheKey) -> Result<Option<CacheBundle>, CacheError>;

    /// Stores `bundle` under `key`, replacing any previous bundle for that
    /// key. Returns `true` if the bundle was written.
    fn add(&self, key: CacheKey, bundle: &CacheBundle) -> Result<bool, CacheError>;
}

/// A cache store rooted in a shared directory, typically a network mount.
///
/// Bundles live at `<root>/bundles/<key-hex>.kbdl`. Writes go through a
/// sibling temp file and a rename so concurrent readers never observe a
/// half-written bundle; the final rename is what makes a key visible.
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Creates a store rooted at the given directory.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn bundle_path(&self, key: CacheKey) -> PathBuf {
        self.root.join(BUNDLE_SUBDIR).join(format!("{key}.{BUNDLE_EXT}"))
    }
}

impl CacheTransport for DirStore {
    /// Probes the store root on a helper thread so a hung network mount
    /// cannot stall the pipeline past the configured timeout.
    fn connect(&self, timeout: Duration) -> Result<(), CacheError> {
        let root = self.root.clone();
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let ok = root.is_dir();
            let _ = tx.send(ok);
        });

        match rx.recv_timeout(timeout) {
            Ok(true) => Ok(()),
            Ok(false) => Err(CacheError::Io {
                path: self.root.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "store root is not a directory",
                ),
            }),
            Err(_) => Err(CacheError::ConnectTimeout {
                store: self.root.clone(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    fn request(&self, key: CacheKey) -> Result<Option<CacheBundle>, CacheError> {
        let path = self.bundle_path(key);
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::Io { path, source: e }),
        };
        // Corruption reads as a miss, not an error.
        Ok(CacheBundle::decode(&raw))
    }

    fn add(&self, key: CacheKey, bundle: &CacheBundle) -> Result<bool, CacheError> {
        let dir = self.root.join(BUNDLE_SUBDIR);
        std::fs::create_dir_all(&dir).map_err(|e| CacheError::Io {
            path: dir.clone(),
            source: e,
        })?;

        let raw = bundle.encode()?;
        let path = self.bundle_path(key);
        let tmp = path.with_extension("kbdl.tmp");
        std::fs::write(&tmp, &raw).map_err(|e| CacheError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| CacheError::Io { path, source: e })?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::BundleMeta;
    use kiln_common::Digest;

    fn make_key(tag: &[u8]) -> CacheKey {
        CacheKey::new(Digest::from_bytes(tag), Digest::from_bytes(b"params"))
    }

    fn make_bundle() -> CacheBundle {
        let mut bundle = CacheBundle::new(BundleMeta {
            machine: "m".to_string(),
            timestamp: 1,
            comment: String::new(),
        });
        bundle.insert("a.bin", vec![9, 9]);
        bundle
    }

    #[test]
    fn connect_existing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::new(dir.path());
        assert!(store.connect(Duration::from_millis(500)).is_ok());
    }

    #[test]
    fn connect_missing_dir_fails() {
        let store = DirStore::new(Path::new("/nonexistent/cache/root"));
        assert!(store.connect(Duration::from_millis(500)).is_err());
    }

    #[test]
    fn request_miss_is_ok_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::new(dir.path());
        assert!(store.request(make_key(b"absent")).unwrap().is_none());
    }

    #[test]
    fn add_then_request_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::new(dir.path());
        let key = make_key(b"hit");

        assert!(store.add(key, &make_bundle()).unwrap());
        let fetched = store.request(key).unwrap().unwrap();
        assert_eq!(fetched.files[&PathBuf::from("a.bin")], vec![9, 9]);
    }

    #[test]
    fn add_replaces_previous_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::new(dir.path());
        let key = make_key(b"replace");

        store.add(key, &make_bundle()).unwrap();

        let mut newer = make_bundle();
        newer.insert("b.bin", vec![1]);
        store.add(key, &newer).unwrap();

        let fetched = store.request(key).unwrap().unwrap();
        assert_eq!(fetched.files.len(), 2);
    }

    #[test]
    fn corrupt_bundle_reads_as_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::new(dir.path());
        let key = make_key(b"corrupt");

        store.add(key, &make_bundle()).unwrap();
        let path = dir
            .path()
            .join("bundles")
            .join(format!("{key}.kbdl"));
        std::fs::write(&path, b"scribbled over").unwrap();

        assert!(store.request(key).unwrap().is_none());
    }

    #[test]
    fn distinct_keys_distinct_bundles() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::new(dir.path());

        store.add(make_key(b"one"), &make_bundle()).unwrap();
        assert!(store.request(make_key(b"two")).unwrap().is_none());
    }
}
