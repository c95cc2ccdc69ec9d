//! Loaded-scene data model and dependency collection.
//!
//! The scene graph runtime itself lives outside the pipeline; this crate
//! models only what the exporter needs from a loaded scene: entity
//! hierarchy, landscape heightmap, texture references, particle-emitter
//! references, and custom properties. The [`DependencyCollector`] walks a
//! loaded scene and produces the typed [`ExportedObjectCollection`] that
//! drives the rest of the export.
//!
//! [`ExportedObjectCollection`]: kiln_common::ExportedObjectCollection

#![warn(missing_docs)]

pub mod collect;
pub mod error;
pub mod model;

pub use collect::DependencyCollector;
pub use error::SceneError;
pub use model::{EmitterConfig, EmitterLayer, Entity, Landscape, Scene, TextureRef};
