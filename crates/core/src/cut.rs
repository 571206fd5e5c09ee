//! Guillotine cut segments.

use crate::geometry::Mm;
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Direction of a saw cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Orientation {
    /// Fixed x, runs along y.
    #[cfg_attr(feature = "serde", serde(rename = "V"))]
    Vertical,
    /// Fixed y, runs along x.
    #[cfg_attr(feature = "serde", serde(rename = "H"))]
    Horizontal,
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vertical => write!(f, "V"),
            Self::Horizontal => write!(f, "H"),
        }
    }
}

/// A straight cut on one sheet.
///
/// For a vertical cut `coord` is x and the span runs over y; for a horizontal
/// cut `coord` is y and the span runs over x. `stage` only groups cuts for
/// display and sequencing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CutSegment {
    pub sheet_index: usize,
    pub orientation: Orientation,
    pub coord: Mm,
    pub start: Mm,
    pub end: Mm,
    pub stage: u32,
}

impl CutSegment {
    /// Creates a cut. Zero-length spans are rejected.
    pub fn new(
        sheet_index: usize,
        orientation: Orientation,
        coord: Mm,
        start: Mm,
        end: Mm,
        stage: u32,
    ) -> Result<Self> {
        if start == end {
            return Err(Error::InvalidCut(format!(
                "{} cut at {} has zero length ({}..{})",
                orientation, coord, start, end
            )));
        }
        Ok(Self {
            sheet_index,
            orientation,
            coord,
            start,
            end,
            stage,
        })
    }

    pub fn vertical(sheet_index: usize, x: Mm, y0: Mm, y1: Mm, stage: u32) -> Result<Self> {
        Self::new(sheet_index, Orientation::Vertical, x, y0, y1, stage)
    }

    pub fn horizontal(sheet_index: usize, y: Mm, x0: Mm, x1: Mm, stage: u32) -> Result<Self> {
        Self::new(sheet_index, Orientation::Horizontal, y, x0, x1, stage)
    }

    pub fn length(&self) -> Mm {
        (self.end - self.start).abs()
    }

    /// Copy shifted by `(dx, dy)` in sheet coordinates.
    pub fn translated(&self, dx: Mm, dy: Mm) -> Self {
        let (dc, ds) = match self.orientation {
            Orientation::Vertical => (dx, dy),
            Orientation::Horizontal => (dy, dx),
        };
        Self {
            coord: self.coord + dc,
            start: self.start + ds,
            end: self.end + ds,
            ..self.clone()
        }
    }

    /// Copy with `offset` added to the stage tag.
    pub fn with_stage_offset(mut self, offset: u32) -> Self {
        self.stage += offset;
        self
    }

    /// Copy moved onto another sheet.
    pub fn on_sheet(mut self, sheet_index: usize) -> Self {
        self.sheet_index = sheet_index;
        self
    }

    /// Returns true if the segment lies inside a `usable_w` x `usable_h` sheet.
    pub fn within(&self, usable_w: Mm, usable_h: Mm) -> bool {
        let (coord_max, span_max) = match self.orientation {
            Orientation::Vertical => (usable_w, usable_h),
            Orientation::Horizontal => (usable_h, usable_w),
        };
        let (lo, hi) = (self.start.min(self.end), self.start.max(self.end));
        (0..=coord_max).contains(&self.coord) && lo >= 0 && hi <= span_max
    }
}
