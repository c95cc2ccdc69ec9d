//! The exported-object data model exchanged between pipeline stages.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// The kind of an asset the pipeline can export.
///
/// The discriminant is the wire value written into dependency manifests, so
/// variants must not be reordered.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[repr(u8)]
pub enum ObjectKind {
    /// A 3D scene file, the root of a dependency tree.
    Scene = 0,
    /// A source texture referenced from a scene or emitter.
    Texture = 1,
    /// A landscape heightmap.
    Heightmap = 2,
    /// A particle-emitter configuration file.
    EmitterConfig = 3,
}

impl ObjectKind {
    /// Returns the integer wire value used in dependency manifests.
    pub fn wire_value(self) -> u8 {
        self as u8
    }

    /// Parses a manifest wire value back into a kind.
    pub fn from_wire_value(value: u8) -> Option<Self> {
        match value {
            0 => Some(ObjectKind::Scene),
            1 => Some(ObjectKind::Texture),
            2 => Some(ObjectKind::Heightmap),
            3 => Some(ObjectKind::EmitterConfig),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Scene => write!(f, "scene"),
            ObjectKind::Texture => write!(f, "texture"),
            ObjectKind::Heightmap => write!(f, "heightmap"),
            ObjectKind::EmitterConfig => write!(f, "emitter config"),
        }
    }
}

/// A single exportable asset, identified by `(kind, relative_path)`.
///
/// `relative_path` is always relative to the configured source root, never
/// absolute. Relative paths are what keep cache keys portable across
/// machines.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct ExportedObject {
    /// The asset kind.
    pub kind: ObjectKind,
    /// Path relative to the source root.
    pub relative_path: PathBuf,
}

impl ExportedObject {
    /// Creates an exported object for the given kind and source-root-relative path.
    pub fn new(kind: ObjectKind, relative_path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            relative_path: relative_path.into(),
        }
    }
}

/// A collection of exported objects grouped and ordered by kind.
///
/// Built fresh for each export pass. Insertion order within a kind is
/// irrelevant; pushing an object that is already present (same kind and
/// path) is a no-op.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExportedObjectCollection {
    groups: BTreeMap<ObjectKind, Vec<PathBuf>>,
}

impl ExportedObjectCollection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object, deduplicating on `(kind, relative_path)`.
    pub fn push(&mut self, object: ExportedObject) {
        let group = self.groups.entry(object.kind).or_default();
        if !group.contains(&object.relative_path) {
            group.push(object.relative_path);
        }
    }

    /// Returns the number of objects across all kinds.
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Returns `true` if the collection holds no objects.
    pub fn is_empty(&self) -> bool {
        self.groups.values().all(Vec::is_empty)
    }

    /// Returns `true` if the collection contains the given object.
    pub fn contains(&self, kind: ObjectKind, relative_path: &Path) -> bool {
        self.groups
            .get(&kind)
            .is_some_and(|g| g.iter().any(|p| p == relative_path))
    }

    /// Iterates the paths of a single kind.
    pub fn of_kind(&self, kind: ObjectKind) -> impl Iterator<Item = &Path> {
        self.groups
            .get(&kind)
            .into_iter()
            .flat_map(|g| g.iter().map(PathBuf::as_path))
    }

    /// Iterates all objects, grouped by ascending kind.
    pub fn iter(&self) -> impl Iterator<Item = ExportedObject> + '_ {
        self.groups.iter().flat_map(|(kind, paths)| {
            paths
                .iter()
                .map(move |p| ExportedObject::new(*kind, p.clone()))
        })
    }

    /// Merges another collection into this one, deduplicating.
    pub fn extend(&mut self, other: &ExportedObjectCollection) {
        for object in other.iter() {
            self.push(object);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values_are_stable() {
        assert_eq!(ObjectKind::Scene.wire_value(), 0);
        assert_eq!(ObjectKind::Texture.wire_value(), 1);
        assert_eq!(ObjectKind::Heightmap.wire_value(), 2);
        assert_eq!(ObjectKind::EmitterConfig.wire_value(), 3);
    }

    #[test]
    fn wire_value_roundtrip() {
        for kind in [
            ObjectKind::Scene,
            ObjectKind::Texture,
            ObjectKind::Heightmap,
            ObjectKind::EmitterConfig,
        ] {
            assert_eq!(ObjectKind::from_wire_value(kind.wire_value()), Some(kind));
        }
        assert_eq!(ObjectKind::from_wire_value(7), None);
    }

    #[test]
    fn push_deduplicates() {
        let mut coll = ExportedObjectCollection::new();
        coll.push(ExportedObject::new(ObjectKind::Texture, "rock.png"));
        coll.push(ExportedObject::new(ObjectKind::Texture, "rock.png"));
        coll.push(ExportedObject::new(ObjectKind::Texture, "grass.png"));
        assert_eq!(coll.len(), 2);
    }

    #[test]
    fn same_path_different_kind_is_distinct() {
        let mut coll = ExportedObjectCollection::new();
        coll.push(ExportedObject::new(ObjectKind::Texture, "a.png"));
        coll.push(ExportedObject::new(ObjectKind::Heightmap, "a.png"));
        assert_eq!(coll.len(), 2);
        assert!(coll.contains(ObjectKind::Texture, Path::new("a.png")));
        assert!(coll.contains(ObjectKind::Heightmap, Path::new("a.png")));
    }

    #[test]
    fn iter_groups_by_kind_order() {
        let mut coll = ExportedObjectCollection::new();
        coll.push(ExportedObject::new(ObjectKind::EmitterConfig, "fire.emit"));
        coll.push(ExportedObject::new(ObjectKind::Scene, "level1.scene"));
        coll.push(ExportedObject::new(ObjectKind::Texture, "rock.png"));

        let kinds: Vec<ObjectKind> = coll.iter().map(|o| o.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ObjectKind::Scene,
                ObjectKind::Texture,
                ObjectKind::EmitterConfig
            ]
        );
    }

    #[test]
    fn extend_merges_and_dedupes() {
        let mut a = ExportedObjectCollection::new();
        a.push(ExportedObject::new(ObjectKind::Texture, "rock.png"));

        let mut b = ExportedObjectCollection::new();
        b.push(ExportedObject::new(ObjectKind::Texture, "rock.png"));
        b.push(ExportedObject::new(ObjectKind::Heightmap, "hills.hmap"));

        a.extend(&b);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn empty_collection() {
        let coll = ExportedObjectCollection::new();
        assert!(coll.is_empty());
        assert_eq!(coll.len(), 0);
        assert_eq!(coll.iter().count(), 0);
    }
}
