//! The per-scene dependency manifest.
//!
//! Plain text: line 1 is the object count, each following line is
//! `<kindWireValue>,<relativePath>`. Later pipeline runs and downstream
//! tooling read it back instead of re-deriving dependencies from the full
//! scene graph.

use std::path::Path;

use kiln_common::{ExportedObject, ExportedObjectCollection, ObjectKind};

use crate::error::OutputError;

/// Writes a collection as a dependency manifest.
pub fn write_manifest(
    path: &Path,
    collection: &ExportedObjectCollection,
) -> Result<(), OutputError> {
    let mut text = format!("{}\n", collection.len());
    for object in collection.iter() {
        text.push_str(&format!(
            "{},{}\n",
            object.kind.wire_value(),
            object.relative_path.display()
        ));
    }
    std::fs::write(path, text).map_err(|e| OutputError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Reads a dependency manifest back into a collection.
///
/// The declared count must match the number of entry lines exactly.
pub fn read_manifest(path: &Path) -> Result<ExportedObjectCollection, OutputError> {
    let content = std::fs::read_to_string(path).map_err(|e| OutputError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let malformed = |reason: String| OutputError::ManifestParse {
        path: path.to_path_buf(),
        reason,
    };

    let mut lines = content.lines();
    let count: usize = lines
        .next()
        .ok_or_else(|| malformed("empty file".to_string()))?
        .trim()
        .parse()
        .map_err(|_| malformed("first line is not a count".to_string()))?;

    let mut collection = ExportedObjectCollection::new();
    let mut parsed = 0usize;
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let (kind_text, rel_path) = line
            .split_once(',')
            .ok_or_else(|| malformed(format!("entry without separator: '{line}'")))?;
        let wire: u8 = kind_text
            .trim()
            .parse()
            .map_err(|_| malformed(format!("bad object kind: '{kind_text}'")))?;
        let kind = ObjectKind::from_wire_value(wire)
            .ok_or_else(|| malformed(format!("unknown object kind {wire}")))?;
        if rel_path.is_empty() {
            return Err(malformed("entry with empty path".to_string()));
        }
        collection.push(ExportedObject::new(kind, rel_path));
        parsed += 1;
    }

    if parsed != count {
        return Err(malformed(format!(
            "count {count} does not match {parsed} entries"
        )));
    }
    Ok(collection)
}
