//! Texture-atlas packing for the Kiln asset pipeline.
//!
//! Packs many source frames into the smallest power-of-two atlas page that
//! admits them all, using MaxRects placement under a set of selectable
//! heuristics, and falls back to multiple pages when no single page fits.
//! Emits a JSON definition manifest per atlas and composes the final RGBA
//! page images.

#![warn(missing_docs)]

pub mod compose;
pub mod error;
pub mod layout;
pub mod maxrects;
pub mod packer;
pub mod rect;

pub use compose::compose_page;
pub use error::AtlasError;
pub use layout::{AtlasDefinition, PackedAtlasLayout, PlacedFrame};
pub use maxrects::{MaxRectsBin, PackHeuristic};
pub use packer::{AtlasPacker, Frame};
pub use rect::Rect;
