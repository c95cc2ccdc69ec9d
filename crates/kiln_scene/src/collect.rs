//! Dependency collection from a loaded scene.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use kiln_common::{ExportedObject, ExportedObjectCollection, ObjectKind};

use crate::error::SceneError;
use crate::model::{EmitterConfig, Entity, Scene, TextureRef};

/// Walks a loaded scene and produces the typed collection of every object
/// it references.
///
/// The collection contains: the landscape heightmap (if present, collected
/// first by convention), every distinct file-backed texture reference
/// (in-memory textures are excluded), and every emitter config including
/// those referenced transitively through super-emitter nesting. Emitter
/// traversal carries a visited set; a config that references itself,
/// directly or indirectly, fails with [`SceneError::EmitterCycle`] instead
/// of hanging.
pub struct DependencyCollector<'a> {
    source_root: &'a Path,
}

impl<'a> DependencyCollector<'a> {
    /// Creates a collector that resolves emitter-config paths against the
    /// given source root.
    pub fn new(source_root: &'a Path) -> Self {
        Self { source_root }
    }

    /// Collects every object the scene references.
    pub fn collect(&self, scene: &Scene) -> Result<ExportedObjectCollection, SceneError> {
        let mut collection = ExportedObjectCollection::new();

        // Heightmap first, by convention.
        if let Some(landscape) = &scene.landscape {
            collection.push(ExportedObject::new(
                ObjectKind::Heightmap,
                landscape.heightmap.clone(),
            ));
        }

        let mut done = BTreeSet::new();
        for entity in &scene.entities {
            self.collect_entity(entity, &mut collection, &mut done)?;
        }

        Ok(collection)
    }

    fn collect_entity(
        &self,
        entity: &Entity,
        collection: &mut ExportedObjectCollection,
        done: &mut BTreeSet<PathBuf>,
    ) -> Result<(), SceneError> {
        if entity.editor_only {
            return Ok(());
        }

        for texture in &entity.textures {
            if let TextureRef::File { path } = texture {
                collection.push(ExportedObject::new(ObjectKind::Texture, path.clone()));
            }
        }

        for emitter in &entity.emitters {
            let mut stack = Vec::new();
            self.collect_emitter(emitter, collection, &mut stack, done)?;
        }

        for child in &entity.children {
            self.collect_entity(child, collection, done)?;
        }

        Ok(())
    }

    /// Collects one emitter config and, recursively, every super-emitter it
    /// embeds. `stack` holds the chain of configs currently being expanded;
    /// re-entering one of them is a cycle.
    fn collect_emitter(
        &self,
        relative_path: &Path,
        collection: &mut ExportedObjectCollection,
        stack: &mut Vec<PathBuf>,
        done: &mut BTreeSet<PathBuf>,
    ) -> Result<(), SceneError> {
        if stack.iter().any(|p| p == relative_path) {
            let mut chain: Vec<String> = stack
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            chain.push(relative_path.display().to_string());
            return Err(SceneError::EmitterCycle {
                path: relative_path.to_path_buf(),
                chain: chain.join(" -> "),
            });
        }

        collection.push(ExportedObject::new(
            ObjectKind::EmitterConfig,
            relative_path.to_path_buf(),
        ));

        if done.contains(relative_path) {
            return Ok(());
        }

        let config = EmitterConfig::load(&self.source_root.join(relative_path))?;

        stack.push(relative_path.to_path_buf());
        for layer in &config.layers {
            if let Some(texture) = &layer.texture {
                collection.push(ExportedObject::new(ObjectKind::Texture, texture.clone()));
            }
            if let Some(super_emitter) = &layer.super_emitter {
                self.collect_emitter(super_emitter, collection, stack, done)?;
            }
        }
        stack.pop();
        done.insert(relative_path.to_path_buf());

        Ok(())
    }
}
