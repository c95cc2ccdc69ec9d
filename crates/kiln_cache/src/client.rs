//! The advisory build-cache client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use kiln_common::CacheKey;
use kiln_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};

use crate::bundle::{BundleMeta, CacheBundle};
use crate::store::CacheTransport;

/// Diagnostic code for a failed connect probe.
const CODE_CONNECT: DiagnosticCode = DiagnosticCode {
    category: Category::Cache,
    number: 1,
};

/// Diagnostic code for a failed request.
const CODE_REQUEST: DiagnosticCode = DiagnosticCode {
    category: Category::Cache,
    number: 2,
};

/// Diagnostic code for a failed add.
const CODE_ADD: DiagnosticCode = DiagnosticCode {
    category: Category::Cache,
    number: 3,
};

/// Advisory client over a [`CacheTransport`].
///
/// Every failure on the transport is emitted as a warning diagnostic and
/// degraded: `request` failures become misses, `add` failures become no-ops.
/// The connect probe runs once when the client is created; if it fails or
/// times out, the client stays disabled for the remainder of the run and
/// every later call short-circuits without touching the transport.
pub struct BuildCache {
    transport: Box<dyn CacheTransport>,
    enabled: AtomicBool,
    description: String,
}

impl BuildCache {
    /// Attaches a cache transport, probing it with the given timeout.
    ///
    /// A failed or timed-out probe logs a warning and returns a disabled
    /// client; the pipeline carries on uncached.
    pub fn attach(
        transport: Box<dyn CacheTransport>,
        timeout: Duration,
        description: impl Into<String>,
        sink: &DiagnosticSink,
    ) -> Self {
        let enabled = match transport.connect(timeout) {
            Ok(()) => true,
            Err(e) => {
                sink.emit(
                    Diagnostic::warning(CODE_CONNECT, format!("build cache disabled: {e}"))
                        .with_note("all objects will be rebuilt locally"),
                );
                false
            }
        };
        Self {
            transport,
            enabled: AtomicBool::new(enabled),
            description: description.into(),
        }
    }

    /// Returns `true` if the cache is live for this run.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Requests the bundle stored under `key`.
    ///
    /// Returns `None` on a miss, a transport failure, or when the cache is
    /// disabled; "not found" is a normal outcome, never an error.
    pub fn request(&self, key: CacheKey, sink: &DiagnosticSink) -> Option<CacheBundle> {
        if !self.is_enabled() {
            return None;
        }
        match self.transport.request(key) {
            Ok(bundle) => bundle,
            Err(e) => {
                sink.emit(Diagnostic::warning(
                    CODE_REQUEST,
                    format!("cache request failed, treating as miss: {e}"),
                ));
                None
            }
        }
    }

    /// Stores a bundle under `key` after a successful local rebuild.
    ///
    /// Returns `true` only if the bundle actually landed in the store.
    pub fn add(&self, key: CacheKey, files: CacheBundle, sink: &DiagnosticSink) -> bool {
        if !self.is_enabled() {
            return false;
        }
        match self.transport.add(key, &files) {
            Ok(stored) => stored,
            Err(e) => {
                sink.emit(Diagnostic::warning(
                    CODE_ADD,
                    format!("cache add failed, continuing without store: {e}"),
                ));
                false
            }
        }
    }

    /// Creates bundle metadata carrying this client's description.
    pub fn bundle_meta(&self) -> BundleMeta {
        BundleMeta::now(self.description.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use crate::store::DirStore;
    use kiln_common::Digest;
    use std::path::PathBuf;

    fn make_key() -> CacheKey {
        CacheKey::new(Digest::from_bytes(b"src"), Digest::from_bytes(b"params"))
    }

    fn make_bundle() -> CacheBundle {
        let mut bundle = CacheBundle::new(BundleMeta {
            machine: "m".to_string(),
            timestamp: 1,
            comment: String::new(),
        });
        bundle.insert("out.bin", vec![7]);
        bundle
    }

    /// A transport whose every call fails, for exercising degradation.
    struct BrokenTransport;

    impl CacheTransport for BrokenTransport {
        fn connect(&self, _timeout: Duration) -> Result<(), CacheError> {
            Ok(())
        }
        fn request(&self, _key: CacheKey) -> Result<Option<CacheBundle>, CacheError> {
            Err(CacheError::Io {
                path: PathBuf::from("/mnt/buildcache"),
                source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"),
            })
        }
        fn add(&self, _key: CacheKey, _bundle: &CacheBundle) -> Result<bool, CacheError> {
            Err(CacheError::Io {
                path: PathBuf::from("/mnt/buildcache"),
                source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"),
            })
        }
    }

    #[test]
    fn roundtrip_through_dir_store() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DiagnosticSink::new();
        let cache = BuildCache::attach(
            Box::new(DirStore::new(dir.path())),
            Duration::from_millis(500),
            "test",
            &sink,
        );
        assert!(cache.is_enabled());

        let key = make_key();
        assert!(cache.request(key, &sink).is_none());
        assert!(cache.add(key, make_bundle(), &sink));
        let hit = cache.request(key, &sink).unwrap();
        assert_eq!(hit.files[&PathBuf::from("out.bin")], vec![7]);
        assert!(!sink.has_errors());
    }

    #[test]
    fn failed_probe_disables_cache() {
        let sink = DiagnosticSink::new();
        let cache = BuildCache::attach(
            Box::new(DirStore::new(std::path::Path::new("/nonexistent/root"))),
            Duration::from_millis(100),
            "test",
            &sink,
        );
        assert!(!cache.is_enabled());
        // Disabled client never surfaces errors.
        assert!(cache.request(make_key(), &sink).is_none());
        assert!(!cache.add(make_key(), make_bundle(), &sink));
        // One warning for the probe, nothing per call.
        assert_eq!(sink.diagnostics().len(), 1);
        assert!(!sink.has_errors());
    }

    #[test]
    fn transport_failures_degrade_to_miss() {
        let sink = DiagnosticSink::new();
        let cache = BuildCache::attach(
            Box::new(BrokenTransport),
            Duration::from_millis(100),
            "test",
            &sink,
        );
        assert!(cache.is_enabled());

        assert!(cache.request(make_key(), &sink).is_none());
        assert!(!cache.add(make_key(), make_bundle(), &sink));

        // Failures are warnings, never errors.
        assert_eq!(sink.diagnostics().len(), 2);
        assert!(!sink.has_errors());
    }

    #[test]
    fn bundle_meta_carries_description() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DiagnosticSink::new();
        let cache = BuildCache::attach(
            Box::new(DirStore::new(dir.path())),
            Duration::from_millis(500),
            "nightly farm",
            &sink,
        );
        assert_eq!(cache.bundle_meta().comment, "nightly farm");
    }
}
