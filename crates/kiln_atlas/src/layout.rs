//! Atlas layouts and the JSON definition manifest.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AtlasError;
use crate::rect::Rect;

/// One frame's placement within an atlas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedFrame {
    /// The frame's name.
    pub name: String,
    /// Index of the page holding the frame.
    pub page: usize,
    /// Placed bounds including margin.
    pub placed: Rect,
    /// Original bounds: `placed` shrunk by `margin` on every side.
    pub original: Rect,
    /// Margin in pixels trimmed on each side.
    pub margin: u32,
}

/// The non-overlapping placements making up one atlas page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedAtlasLayout {
    /// Page width in pixels.
    pub width: u32,
    /// Page height in pixels.
    pub height: u32,
    /// Frames placed on this page.
    pub frames: Vec<PlacedFrame>,
}

impl PackedAtlasLayout {
    /// Total area covered by placed frames, margins included.
    pub fn placed_area(&self) -> u64 {
        self.frames.iter().map(|f| f.placed.area()).sum()
    }
}

/// Size of one atlas page, recorded in the definition manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSize {
    /// Page width in pixels.
    pub width: u32,
    /// Page height in pixels.
    pub height: u32,
}

/// The `.atlas.json` definition manifest: every frame's placement across
/// all pages of one atlas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlasDefinition {
    /// The atlas name.
    pub name: String,
    /// Per-page dimensions, indexed by `PlacedFrame::page`.
    pub pages: Vec<PageSize>,
    /// Every placed frame.
    pub frames: Vec<PlacedFrame>,
}

impl AtlasDefinition {
    /// Builds a definition from the packed page layouts.
    pub fn from_layouts(name: impl Into<String>, layouts: &[PackedAtlasLayout]) -> Self {
        Self {
            name: name.into(),
            pages: layouts
                .iter()
                .map(|l| PageSize {
                    width: l.width,
                    height: l.height,
                })
                .collect(),
            frames: layouts.iter().flat_map(|l| l.frames.clone()).collect(),
        }
    }

    /// Writes the manifest as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), AtlasError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| AtlasError::Definition {
            reason: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(|e| AtlasError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Reads a manifest back.
    pub fn load(path: &Path) -> Result<Self, AtlasError> {
        let content = std::fs::read_to_string(path).map_err(|e| AtlasError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| AtlasError::Definition {
            reason: e.to_string(),
        })
    }
}
