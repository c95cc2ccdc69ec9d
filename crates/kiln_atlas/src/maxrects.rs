//! MaxRects rectangle packing.
//!
//! The bin tracks maximal free rectangles; each placement splits every
//! intersecting free rectangle into up to four remainders and prunes the
//! ones contained in another. Frames are never rotated, so a placed
//! rectangle always has the orientation the caller asked for.

use std::fmt;

use crate::rect::Rect;

/// Placement scoring heuristics. Lower score wins within a heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackHeuristic {
    /// Smallest leftover free-rectangle area.
    BestAreaFit,
    /// Smallest leftover along the shorter free-rectangle side.
    BestShortSideFit,
    /// Smallest leftover along the longer free-rectangle side.
    BestLongSideFit,
    /// Lowest, then leftmost, placement.
    BottomLeft,
    /// Longest shared perimeter with placed rectangles and the page edge.
    ContactPoint,
}

impl PackHeuristic {
    /// Every heuristic, in the order the packer tries them.
    pub const ALL: [PackHeuristic; 5] = [
        PackHeuristic::BestAreaFit,
        PackHeuristic::BestShortSideFit,
        PackHeuristic::BestLongSideFit,
        PackHeuristic::BottomLeft,
        PackHeuristic::ContactPoint,
    ];
}

impl fmt::Display for PackHeuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PackHeuristic::BestAreaFit => "best-area-fit",
            PackHeuristic::BestShortSideFit => "best-short-side-fit",
            PackHeuristic::BestLongSideFit => "best-long-side-fit",
            PackHeuristic::BottomLeft => "bottom-left",
            PackHeuristic::ContactPoint => "contact-point",
        };
        write!(f, "{name}")
    }
}

/// A single page being packed.
pub struct MaxRectsBin {
    width: u32,
    height: u32,
    free: Vec<Rect>,
    used: Vec<Rect>,
}

impl MaxRectsBin {
    /// Creates an empty bin of the given page size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            free: vec![Rect::new(0, 0, width, height)],
            used: Vec::new(),
        }
    }

    /// The rectangles placed so far.
    pub fn used(&self) -> &[Rect] {
        &self.used
    }

    /// Places a `width`x`height` rectangle, choosing the position the
    /// heuristic scores best. Returns `None` when nothing fits.
    pub fn insert(&mut self, width: u32, height: u32, heuristic: PackHeuristic) -> Option<Rect> {
        let placement = self.find_position(width, height, heuristic)?;
        self.place(placement);
        Some(placement)
    }

    fn find_position(&self, width: u32, height: u32, heuristic: PackHeuristic) -> Option<Rect> {
        let mut best: Option<(Rect, (u64, u64))> = None;
        for free in &self.free {
            if free.width < width || free.height < height {
                continue;
            }
            let candidate = Rect::new(free.x, free.y, width, height);
            let score = self.score(free, &candidate, heuristic);
            let better = match &best {
                None => true,
                Some((_, best_score)) => score < *best_score,
            };
            if better {
                best = Some((candidate, score));
            }
        }
        best.map(|(rect, _)| rect)
    }

    /// Scores a candidate placement. Lower is better; the secondary score
    /// breaks ties deterministically.
    fn score(&self, free: &Rect, candidate: &Rect, heuristic: PackHeuristic) -> (u64, u64) {
        let leftover_w = u64::from(free.width - candidate.width);
        let leftover_h = u64::from(free.height - candidate.height);
        match heuristic {
            PackHeuristic::BestAreaFit => (
                free.area() - candidate.area(),
                leftover_w.min(leftover_h),
            ),
            PackHeuristic::BestShortSideFit => {
                (leftover_w.min(leftover_h), leftover_w.max(leftover_h))
            }
            PackHeuristic::BestLongSideFit => {
                (leftover_w.max(leftover_h), leftover_w.min(leftover_h))
            }
            PackHeuristic::BottomLeft => (
                u64::from(candidate.bottom()),
                u64::from(candidate.x),
            ),
            // Inverted so that more contact scores lower.
            PackHeuristic::ContactPoint => (
                u64::MAX - self.contact_score(candidate),
                u64::from(candidate.y),
            ),
        }
    }

    /// Total edge length the candidate shares with placed rectangles and
    /// the page border.
    fn contact_score(&self, candidate: &Rect) -> u64 {
        let mut score = 0u64;
        if candidate.x == 0 || candidate.right() == self.width {
            score += u64::from(candidate.height);
        }
        if candidate.y == 0 || candidate.bottom() == self.height {
            score += u64::from(candidate.width);
        }
        for used in &self.used {
            if used.x == candidate.right() || used.right() == candidate.x {
                score += u64::from(overlap_1d(
                    candidate.y,
                    candidate.bottom(),
                    used.y,
                    used.bottom(),
                ));
            }
            if used.y == candidate.bottom() || used.bottom() == candidate.y {
                score += u64::from(overlap_1d(
                    candidate.x,
                    candidate.right(),
                    used.x,
                    used.right(),
                ));
            }
        }
        score
    }

    fn place(&mut self, rect: Rect) {
        let mut next_free = Vec::with_capacity(self.free.len() + 4);
        for free in &self.free {
            if !free.overlaps(&rect) {
                next_free.push(*free);
                continue;
            }
            // Up to four maximal remainders around the placed rectangle.
            if rect.x > free.x {
                next_free.push(Rect::new(free.x, free.y, rect.x - free.x, free.height));
            }
            if rect.right() < free.right() {
                next_free.push(Rect::new(
                    rect.right(),
                    free.y,
                    free.right() - rect.right(),
                    free.height,
                ));
            }
            if rect.y > free.y {
                next_free.push(Rect::new(free.x, free.y, free.width, rect.y - free.y));
            }
            if rect.bottom() < free.bottom() {
                next_free.push(Rect::new(
                    free.x,
                    rect.bottom(),
                    free.width,
                    free.bottom() - rect.bottom(),
                ));
            }
        }
        self.free = next_free;
        self.prune();
        self.used.push(rect);
    }

    /// Drops free rectangles fully contained in another.
    fn prune(&mut self) {
        let mut keep = vec![true; self.free.len()];
        for i in 0..self.free.len() {
            if !keep[i] {
                continue;
            }
            for j in 0..self.free.len() {
                if i == j || !keep[j] {
                    continue;
                }
                if self.free[j].contains(&self.free[i]) {
                    keep[i] = false;
                    break;
                }
            }
        }
        let mut index = 0;
        self.free.retain(|_| {
            let kept = keep[index];
            index += 1;
            kept
        });
    }
}

fn overlap_1d(a_start: u32, a_end: u32, b_start: u32, b_end: u32) -> u32 {
    a_end.min(b_end).saturating_sub(a_start.max(b_start))
}
