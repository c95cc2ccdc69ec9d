//! Axis-aligned pixel rectangles.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in page coordinates, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    /// Builds a rectangle from its top-left corner and size.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Area in square pixels.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// One past the right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// One past the bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Whether `other` lies entirely within `self`.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Whether `self` and `other` share any interior pixels.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Shrinks the rectangle inward by `margin` on every side.
    ///
    /// Reconstructs a frame's original bounds from its placed bounds.
    pub fn shrink(&self, margin: u32) -> Rect {
        Rect {
            x: self.x + margin,
            y: self.y + margin,
            width: self.width.saturating_sub(2 * margin),
            height: self.height.saturating_sub(2 * margin),
        }
    }
}
