//! Digest computation over directories, files, and parameter strings.

use std::path::Path;

use kiln_common::{Digest, DigestFold};

use crate::error::DigestError;
use crate::record::DigestRecord;

/// Computes content digests and compares them against persisted records.
///
/// Digests feed two independent decisions: "has this subtree changed since
/// the last run" (directory/file digests, persisted) and "have the build
/// parameters changed" (parameter digests, recomputed from scratch every
/// run). The three checks are independent; the orchestrator rebuilds when
/// any of them says "changed" or a force flag is set.
pub struct ChangeDetector;

impl ChangeDetector {
    /// Computes the digest of a single file's contents.
    pub fn digest_file(path: &Path) -> Result<Digest, DigestError> {
        let content = std::fs::read(path).map_err(|e| DigestError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Digest::from_bytes(&content))
    }

    /// Computes a digest over a directory subtree.
    ///
    /// Folds each contained file's name and contents, in sorted name order,
    /// so the result is stable across platforms and directory-listing order.
    /// When `recursive` is set, child directories are folded in the same
    /// sorted order; otherwise only direct children count. Digest record
    /// files themselves are excluded so updating a record does not dirty the
    /// directory it describes.
    pub fn digest_directory(path: &Path, recursive: bool) -> Result<Digest, DigestError> {
        let mut fold = DigestFold::new();
        Self::fold_directory(path, recursive, &mut fold)?;
        Ok(fold.finish())
    }

    /// Computes the digest of a build-parameter string.
    ///
    /// Cheap; the orchestrator recomputes it from scratch on every run
    /// instead of persisting the inputs.
    pub fn digest_params(params: &str) -> Digest {
        Digest::from_bytes(params.as_bytes())
    }

    /// Compares a freshly computed digest against the record at `record_path`.
    ///
    /// Returns `true` (changed) when no readable record exists or the stored
    /// digest differs byte-for-byte. Does not touch the record; callers
    /// persist the new digest with [`update`](Self::update) only after the
    /// rebuild decision has been fully consumed.
    pub fn has_changed(digest: Digest, record_path: &Path) -> bool {
        match DigestRecord::load(record_path) {
            Some(record) => record.digest() != digest,
            None => true,
        }
    }

    /// Persists `digest` at `record_path`, atomically replacing any previous
    /// record.
    pub fn update(digest: Digest, record_path: &Path) -> Result<(), DigestError> {
        DigestRecord::new(digest).store(record_path)
    }

    fn fold_directory(
        path: &Path,
        recursive: bool,
        fold: &mut DigestFold,
    ) -> Result<(), DigestError> {
        let mut entries: Vec<_> = std::fs::read_dir(path)
            .map_err(|e| DigestError::Io {
                path: path.to_path_buf(),
                source: e,
            })?
            .collect::<Result<_, _>>()
            .map_err(|e| DigestError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let entry_path = entry.path();
            let name = entry.file_name();

            if entry_path.is_dir() {
                if recursive {
                    fold.update(name.to_string_lossy().as_bytes());
                    Self::fold_directory(&entry_path, true, fold)?;
                }
                continue;
            }

            if entry_path.extension().and_then(|e| e.to_str()) == Some("digest") {
                continue;
            }

            let content = std::fs::read(&entry_path).map_err(|e| DigestError::Io {
                path: entry_path.clone(),
                source: e,
            })?;
            fold.update(name.to_string_lossy().as_bytes());
            fold.update(&content);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_digest_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rock.png");
        std::fs::write(&path, b"pixels").unwrap();

        let a = ChangeDetector::digest_file(&path).unwrap();
        let b = ChangeDetector::digest_file(&path).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn file_digest_missing_errors() {
        assert!(ChangeDetector::digest_file(Path::new("/nonexistent/file.png")).is_err());
    }

    #[test]
    fn directory_digest_changes_with_content() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"one").unwrap();

        let before = ChangeDetector::digest_directory(dir.path(), false).unwrap();
        std::fs::write(dir.path().join("a.png"), b"two").unwrap();
        let after = ChangeDetector::digest_directory(dir.path(), false).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn directory_digest_changes_with_rename() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"same").unwrap();
        let before = ChangeDetector::digest_directory(dir.path(), false).unwrap();

        std::fs::rename(dir.path().join("a.png"), dir.path().join("b.png")).unwrap();
        let after = ChangeDetector::digest_directory(dir.path(), false).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn directory_digest_ignores_records() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"pixels").unwrap();
        let before = ChangeDetector::digest_directory(dir.path(), false).unwrap();

        ChangeDetector::update(before, &dir.path().join("tree.digest")).unwrap();
        let after = ChangeDetector::digest_directory(dir.path(), false).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn recursive_includes_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("props");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("crate.png"), b"pixels").unwrap();

        let shallow = ChangeDetector::digest_directory(dir.path(), false).unwrap();
        let deep = ChangeDetector::digest_directory(dir.path(), true).unwrap();
        assert_ne!(shallow, deep);

        std::fs::write(sub.join("crate.png"), b"new pixels").unwrap();
        let deep_after = ChangeDetector::digest_directory(dir.path(), true).unwrap();
        assert_ne!(deep, deep_after);
        // Non-recursive digest is blind to the nested change.
        assert_eq!(
            shallow,
            ChangeDetector::digest_directory(dir.path(), false).unwrap()
        );
    }

    #[test]
    fn params_digest_is_pure() {
        let a = ChangeDetector::digest_params("gpus=mali,adreno;quality=high;optimize=1");
        let b = ChangeDetector::digest_params("gpus=mali,adreno;quality=high;optimize=1");
        let c = ChangeDetector::digest_params("gpus=mali,adreno;quality=fast;optimize=1");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn has_changed_without_record() {
        let dir = tempfile::tempdir().unwrap();
        let digest = Digest::from_bytes(b"content");
        assert!(ChangeDetector::has_changed(
            digest,
            &dir.path().join("missing.digest")
        ));
    }

    #[test]
    fn has_changed_with_matching_record() {
        let dir = tempfile::tempdir().unwrap();
        let record_path = dir.path().join("tree.digest");
        let digest = Digest::from_bytes(b"content");

        ChangeDetector::update(digest, &record_path).unwrap();
        assert!(!ChangeDetector::has_changed(digest, &record_path));
    }

    #[test]
    fn has_changed_with_stale_record() {
        let dir = tempfile::tempdir().unwrap();
        let record_path = dir.path().join("tree.digest");

        ChangeDetector::update(Digest::from_bytes(b"old"), &record_path).unwrap();
        assert!(ChangeDetector::has_changed(
            Digest::from_bytes(b"new"),
            &record_path
        ));
    }

    #[test]
    fn has_changed_does_not_touch_record() {
        let dir = tempfile::tempdir().unwrap();
        let record_path = dir.path().join("tree.digest");
        let old = Digest::from_bytes(b"old");

        ChangeDetector::update(old, &record_path).unwrap();
        ChangeDetector::has_changed(Digest::from_bytes(b"new"), &record_path);

        // The record still holds the old digest until update() is called.
        assert!(!ChangeDetector::has_changed(old, &record_path));
    }

    #[test]
    fn corrupt_record_reads_as_changed() {
        let dir = tempfile::tempdir().unwrap();
        let record_path = dir.path().join("tree.digest");
        std::fs::write(&record_path, b"scrambled").unwrap();
        assert!(ChangeDetector::has_changed(
            Digest::from_bytes(b"anything"),
            &record_path
        ));
    }
}
