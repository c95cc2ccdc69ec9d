//! The exporter's view of a loaded scene.
//!
//! Scenes and emitter configs are JSON on disk. Paths inside them are always
//! relative to the project's source root; the loader does not resolve or
//! canonicalize them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::SceneError;

/// Custom-property keys that survive export even though they carry the
/// editor-only `editor.` prefix.
pub const WHITELISTED_EDITOR_KEYS: [&str; 2] = ["editor.collision_preset", "editor.export_scale"];

/// Prefix marking a custom property as editor-only.
const EDITOR_KEY_PREFIX: &str = "editor.";

/// A loaded scene: an entity hierarchy plus an optional landscape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    /// The scene's display name.
    pub name: String,
    /// Root entities of the hierarchy.
    #[serde(default)]
    pub entities: Vec<Entity>,
    /// The landscape, if this scene has terrain.
    #[serde(default)]
    pub landscape: Option<Landscape>,
}

/// One entity in the scene hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// The entity's name.
    pub name: String,
    /// Entities flagged editor-only exist for authoring convenience and are
    /// excluded from export entirely, children included.
    #[serde(default)]
    pub editor_only: bool,
    /// Texture references on this entity's materials.
    #[serde(default)]
    pub textures: Vec<TextureRef>,
    /// Source-root-relative paths of particle-emitter configs attached here.
    #[serde(default)]
    pub emitters: Vec<PathBuf>,
    /// Free-form custom properties.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Child entities.
    #[serde(default)]
    pub children: Vec<Entity>,
}

/// A texture reference, either a file on disk or an in-memory render target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureRef {
    /// A texture sourced from a file under the source root.
    File {
        /// Source-root-relative path.
        path: PathBuf,
    },
    /// A texture that exists only in memory (render target, procedural).
    /// Never exported.
    InMemory {
        /// Identifier of the in-memory texture.
        id: String,
    },
}

/// Landscape terrain data referenced by a scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Landscape {
    /// Source-root-relative path of the heightmap.
    pub heightmap: PathBuf,
}

/// A particle-emitter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmitterConfig {
    /// The emitter's display name.
    pub name: String,
    /// The emitter's layers.
    #[serde(default)]
    pub layers: Vec<EmitterLayer>,
}

/// One layer of a particle emitter.
///
/// A layer may embed a whole other emitter ("super-emitter"); such
/// references nest arbitrarily deep and are followed transitively during
/// dependency collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmitterLayer {
    /// Particle texture used by this layer, if any.
    #[serde(default)]
    pub texture: Option<PathBuf>,
    /// Source-root-relative path of an embedded emitter config, if any.
    #[serde(default)]
    pub super_emitter: Option<PathBuf>,
}

impl Scene {
    /// Loads a scene from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let content = std::fs::read_to_string(path).map_err(|e| SceneError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| SceneError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Returns the scene as it should be saved: editor-only entities removed
    /// from the hierarchy and editor-only custom properties dropped, except
    /// for the whitelisted keys.
    pub fn sanitized(&self) -> Scene {
        Scene {
            name: self.name.clone(),
            entities: self
                .entities
                .iter()
                .filter(|e| !e.editor_only)
                .map(Entity::sanitized)
                .collect(),
            landscape: self.landscape.clone(),
        }
    }
}

impl Entity {
    fn sanitized(&self) -> Entity {
        Entity {
            name: self.name.clone(),
            editor_only: false,
            textures: self.textures.clone(),
            emitters: self.emitters.clone(),
            properties: self
                .properties
                .iter()
                .filter(|(key, _)| {
                    !key.starts_with(EDITOR_KEY_PREFIX)
                        || WHITELISTED_EDITOR_KEYS.contains(&key.as_str())
                })
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            children: self
                .children
                .iter()
                .filter(|c| !c.editor_only)
                .map(Entity::sanitized)
                .collect(),
        }
    }
}

impl EmitterConfig {
    /// Loads an emitter config from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let content = std::fs::read_to_string(path).map_err(|e| SceneError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| SceneError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(name: &str) -> Entity {
        Entity {
            name: name.to_string(),
            editor_only: false,
            textures: Vec::new(),
            emitters: Vec::new(),
            properties: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    #[test]
    fn scene_json_roundtrip() {
        let scene = Scene {
            name: "level1".to_string(),
            entities: vec![entity("rock")],
            landscape: Some(Landscape {
                heightmap: PathBuf::from("terrain/hills.hmap"),
            }),
        };
        let json = serde_json::to_string(&scene).unwrap();
        let back: Scene = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "level1");
        assert_eq!(back.entities.len(), 1);
        assert!(back.landscape.is_some());
    }

    #[test]
    fn load_minimal_scene() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("min.scene");
        std::fs::write(&path, r#"{"name": "min"}"#).unwrap();
        let scene = Scene::load(&path).unwrap();
        assert_eq!(scene.name, "min");
        assert!(scene.entities.is_empty());
        assert!(scene.landscape.is_none());
    }

    #[test]
    fn load_malformed_scene_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.scene");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Scene::load(&path),
            Err(SceneError::Parse { .. })
        ));
    }

    #[test]
    fn load_missing_scene_errors() {
        assert!(matches!(
            Scene::load(Path::new("/nonexistent/a.scene")),
            Err(SceneError::Io { .. })
        ));
    }

    #[test]
    fn sanitized_drops_editor_entities() {
        let mut gizmo = entity("gizmo");
        gizmo.editor_only = true;

        let mut parent = entity("parent");
        let mut editor_child = entity("editor_child");
        editor_child.editor_only = true;
        parent.children = vec![editor_child, entity("kept_child")];

        let scene = Scene {
            name: "s".to_string(),
            entities: vec![gizmo, parent],
            landscape: None,
        };

        let clean = scene.sanitized();
        assert_eq!(clean.entities.len(), 1);
        assert_eq!(clean.entities[0].children.len(), 1);
        assert_eq!(clean.entities[0].children[0].name, "kept_child");
    }

    #[test]
    fn sanitized_filters_editor_properties() {
        let mut e = entity("props");
        e.properties
            .insert("material".to_string(), "stone".to_string());
        e.properties
            .insert("editor.grid_snap".to_string(), "1".to_string());
        e.properties
            .insert("editor.collision_preset".to_string(), "convex".to_string());
        e.properties
            .insert("editor.export_scale".to_string(), "0.5".to_string());

        let scene = Scene {
            name: "s".to_string(),
            entities: vec![e],
            landscape: None,
        };
        let props = &scene.sanitized().entities[0].properties;
        assert_eq!(props.len(), 3);
        assert!(props.contains_key("material"));
        assert!(!props.contains_key("editor.grid_snap"));
        assert!(props.contains_key("editor.collision_preset"));
        assert!(props.contains_key("editor.export_scale"));
    }

    #[test]
    fn emitter_config_roundtrip() {
        let cfg = EmitterConfig {
            name: "fire".to_string(),
            layers: vec![EmitterLayer {
                texture: Some(PathBuf::from("fx/flame.png")),
                super_emitter: Some(PathBuf::from("fx/sparks.emit")),
            }],
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: EmitterConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.layers.len(), 1);
        assert_eq!(
            back.layers[0].super_emitter.as_deref(),
            Some(Path::new("fx/sparks.emit"))
        );
    }
}
