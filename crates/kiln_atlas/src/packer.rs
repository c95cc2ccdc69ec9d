//! The atlas packer: candidate resolution search over MaxRects placement.

use kiln_config::AtlasConfig;

use crate::error::AtlasError;
use crate::layout::{PackedAtlasLayout, PlacedFrame};
use crate::maxrects::{MaxRectsBin, PackHeuristic};
use crate::rect::Rect;

/// A frame pending placement: its name and original (pre-margin) size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame name, unique within one atlas.
    pub name: String,
    /// Original width in pixels, without margin.
    pub width: u32,
    /// Original height in pixels, without margin.
    pub height: u32,
}

impl Frame {
    /// Builds a frame.
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
        }
    }

    fn padded(&self, margin: u32) -> (u32, u32) {
        (self.width + 2 * margin, self.height + 2 * margin)
    }
}

/// Packs frames into power-of-two atlas pages.
pub struct AtlasPacker {
    max_dimension: u32,
    margin: u32,
    square_only: bool,
    heuristics: Vec<PackHeuristic>,
}

impl AtlasPacker {
    /// Builds a packer from the project's atlas configuration.
    pub fn new(config: &AtlasConfig) -> Self {
        Self {
            max_dimension: config.max_dimension,
            margin: config.margin,
            square_only: config.square_only,
            heuristics: PackHeuristic::ALL.to_vec(),
        }
    }

    /// Overrides the square-only constraint (some compressed formats demand
    /// square pages regardless of configuration).
    pub fn square_only(mut self, square_only: bool) -> Self {
        self.square_only = square_only;
        self
    }

    /// Packs all frames, producing one layout per page.
    ///
    /// First tries each candidate resolution (ascending area) for a
    /// placement of every frame; the first resolution/heuristic combination
    /// that fits everything wins, so a single-page result always uses the
    /// smallest tested resolution that works. When no single page fits,
    /// each pass keeps the placement covering the most area, emits it as a
    /// page, and retries with the rest.
    pub fn pack(&self, frames: Vec<Frame>) -> Result<Vec<PackedAtlasLayout>, AtlasError> {
        for frame in &frames {
            let (w, h) = frame.padded(self.margin);
            if w > self.max_dimension || h > self.max_dimension {
                return Err(AtlasError::FrameTooLarge {
                    name: frame.name.clone(),
                    width: w,
                    height: h,
                    max: self.max_dimension,
                });
            }
        }

        // Largest first improves pack density.
        let mut pending = frames;
        pending.sort_by(|a, b| {
            let area_a = u64::from(a.width) * u64::from(a.height);
            let area_b = u64::from(b.width) * u64::from(b.height);
            area_b.cmp(&area_a).then_with(|| a.name.cmp(&b.name))
        });

        let candidates = self.candidate_resolutions();
        let mut pages = Vec::new();
        while !pending.is_empty() {
            let page_index = pages.len();
            let attempt = self.pack_one_page(&pending, &candidates, page_index);
            let placed_names: Vec<String> =
                attempt.frames.iter().map(|f| f.name.clone()).collect();
            pending.retain(|f| !placed_names.contains(&f.name));
            pages.push(attempt);
        }
        Ok(pages)
    }

    /// Finds the best placement of `pending` on one page: complete if any
    /// candidate admits it, otherwise the partial placement with the most
    /// placed area.
    fn pack_one_page(
        &self,
        pending: &[Frame],
        candidates: &[(u32, u32)],
        page_index: usize,
    ) -> PackedAtlasLayout {
        let mut best_partial: Option<PackedAtlasLayout> = None;
        for &(width, height) in candidates {
            for &heuristic in &self.heuristics {
                let (layout, complete) =
                    self.try_place(pending, width, height, heuristic, page_index);
                if complete {
                    return layout;
                }
                let better = match &best_partial {
                    None => true,
                    Some(best) => layout.placed_area() > best.placed_area(),
                };
                if better {
                    best_partial = Some(layout);
                }
            }
        }
        // Every frame passed the too-large check, so at least one fits the
        // maximum resolution and the partial is never empty.
        best_partial.unwrap_or(PackedAtlasLayout {
            width: 8,
            height: 8,
            frames: Vec::new(),
        })
    }

    fn try_place(
        &self,
        pending: &[Frame],
        width: u32,
        height: u32,
        heuristic: PackHeuristic,
        page_index: usize,
    ) -> (PackedAtlasLayout, bool) {
        let mut bin = MaxRectsBin::new(width, height);
        let mut placed = Vec::new();
        let mut complete = true;
        for frame in pending {
            let (w, h) = frame.padded(self.margin);
            match bin.insert(w, h, heuristic) {
                Some(rect) => placed.push(PlacedFrame {
                    name: frame.name.clone(),
                    page: page_index,
                    placed: rect,
                    original: rect.shrink(self.margin),
                    margin: self.margin,
                }),
                None => complete = false,
            }
        }
        (
            PackedAtlasLayout {
                width,
                height,
                frames: placed,
            },
            complete,
        )
    }

    /// Power-of-two page sizes from 8x8 up to the maximum, ordered by
    /// ascending total area with squarer pages first among equals.
    fn candidate_resolutions(&self) -> Vec<(u32, u32)> {
        let mut sizes = Vec::new();
        let mut w = 8u32;
        while w <= self.max_dimension {
            let mut h = 8u32;
            while h <= self.max_dimension {
                if !self.square_only || w == h {
                    sizes.push((w, h));
                }
                h *= 2;
            }
            w *= 2;
        }
        sizes.sort_by_key(|&(w, h)| (u64::from(w) * u64::from(h), w.max(h)));
        sizes
    }
}
