//! Mirroring exported files into output targets.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use kiln_common::ExportedObjectCollection;

use crate::error::OutputError;

/// Writes exported files into every configured output target, preserving
/// each object's source-root-relative path.
pub struct OutputWriter {
    targets: Vec<PathBuf>,
}

impl OutputWriter {
    /// Creates a writer over the given target root directories.
    pub fn new(targets: Vec<PathBuf>) -> Self {
        Self { targets }
    }

    /// The configured target roots.
    pub fn targets(&self) -> &[PathBuf] {
        &self.targets
    }

    /// Creates every distinct parent directory the collection references,
    /// under every target, before any file is written.
    pub fn prepare_directories(
        &self,
        collection: &ExportedObjectCollection,
    ) -> Result<(), OutputError> {
        let mut parents = BTreeSet::new();
        for object in collection.iter() {
            if let Some(parent) = object.relative_path.parent() {
                if !parent.as_os_str().is_empty() {
                    parents.insert(parent.to_path_buf());
                }
            }
        }
        for target in &self.targets {
            for parent in &parents {
                let dir = target.join(parent);
                std::fs::create_dir_all(&dir).map_err(|e| OutputError::Io {
                    path: dir.clone(),
                    source: e,
                })?;
            }
        }
        Ok(())
    }

    /// Copies a plain file (scene, heightmap, non-GPU texture) to
    /// `<target>/<relative>` in every target. Byte-identical destinations
    /// are left untouched.
    pub fn copy_object(&self, source: &Path, relative: &Path) -> Result<(), OutputError> {
        for target in &self.targets {
            copy_if_different(source, &target.join(relative))?;
        }
        Ok(())
    }

    /// Writes raw bytes to `<target>/<relative>` in every target,
    /// skipping destinations that already hold exactly these bytes.
    pub fn write_bytes(&self, relative: &Path, bytes: &[u8]) -> Result<(), OutputError> {
        for target in &self.targets {
            let dest = target.join(relative);
            ensure_parent(&dest)?;
            if std::fs::read(&dest).is_ok_and(|existing| existing == bytes) {
                continue;
            }
            std::fs::write(&dest, bytes).map_err(|e| OutputError::Io {
                path: dest.clone(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// Places a GPU-specific artifact under `<target>/<family>/` in every
    /// target, preserving the object's relative directory. Multi-file
    /// artifacts (HD-split containers) keep their file names. Returns the
    /// written paths relative to a target root.
    pub fn write_gpu_artifact(
        &self,
        family: &str,
        relative: &Path,
        artifact_files: &[&Path],
    ) -> Result<Vec<PathBuf>, OutputError> {
        let relative_dir = relative.parent().unwrap_or_else(|| Path::new(""));
        let mut written = Vec::with_capacity(artifact_files.len());
        for file in artifact_files {
            let name = file.file_name().ok_or_else(|| OutputError::Io {
                path: file.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "artifact path has no file name",
                ),
            })?;
            written.push(Path::new(family).join(relative_dir).join(name));
        }
        for target in &self.targets {
            let dest_dir = target.join(family).join(relative_dir);
            std::fs::create_dir_all(&dest_dir).map_err(|e| OutputError::Io {
                path: dest_dir.clone(),
                source: e,
            })?;
            for file in artifact_files {
                let name = file.file_name().unwrap_or_default();
                copy_if_different(file, &dest_dir.join(name))?;
            }
        }
        Ok(written)
    }

    /// Removes `<target>/<relative_dir>` in every target. Used when a
    /// source directory no longer holds any eligible files.
    pub fn clear_directory(&self, relative_dir: &Path) -> Result<(), OutputError> {
        for target in &self.targets {
            let dir = target.join(relative_dir);
            if dir.is_dir() {
                std::fs::remove_dir_all(&dir).map_err(|e| OutputError::Io {
                    path: dir.clone(),
                    source: e,
                })?;
            }
        }
        Ok(())
    }
}

/// Copies `source` to `dest` unless the destination already holds identical
/// bytes. Returns `true` when a copy happened.
pub(crate) fn copy_if_different(source: &Path, dest: &Path) -> Result<bool, OutputError> {
    let source_bytes = std::fs::read(source).map_err(|e| OutputError::Io {
        path: source.to_path_buf(),
        source: e,
    })?;
    if std::fs::read(dest).is_ok_and(|existing| existing == source_bytes) {
        return Ok(false);
    }
    ensure_parent(dest)?;
    std::fs::write(dest, source_bytes).map_err(|e| OutputError::Io {
        path: dest.to_path_buf(),
        source: e,
    })?;
    Ok(true)
}

fn ensure_parent(path: &Path) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| OutputError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}
