//! Board, trim and rectangle primitives.
//!
//! All lengths are integer millimetres. Placement coordinates are relative to
//! the usable (trimmed) rectangle, with the origin at its bottom-left corner.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Length in millimetres.
pub type Mm = i64;

/// Default raw board width (mm).
pub const DEFAULT_BOARD_W: Mm = 2800;
/// Default raw board height (mm).
pub const DEFAULT_BOARD_H: Mm = 2070;
/// Default board thickness (mm).
pub const DEFAULT_THICKNESS: Mm = 18;
/// Default trim on every side (mm).
pub const DEFAULT_TRIM: Mm = 10;

/// Margins removed from each side of a raw board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "TrimFields"))]
pub struct Trim {
    pub left: Mm,
    pub right: Mm,
    pub top: Mm,
    pub bottom: Mm,
}

impl Trim {
    /// Creates a trim from four margins. Negative margins are rejected.
    pub fn new(left: Mm, right: Mm, top: Mm, bottom: Mm) -> Result<Self> {
        if left < 0 || right < 0 || top < 0 || bottom < 0 {
            return Err(Error::InvalidBoard(format!(
                "trim margins must be >= 0, got ({}, {}, {}, {})",
                left, right, top, bottom
            )));
        }
        Ok(Self {
            left,
            right,
            top,
            bottom,
        })
    }

    /// Same margin on all four sides.
    pub fn uniform(margin: Mm) -> Result<Self> {
        Self::new(margin, margin, margin, margin)
    }

    /// No trim at all.
    pub fn none() -> Self {
        Self::default()
    }
}

/// Stock sheet specification.
///
/// Usable width and height are derived from the raw size and the trim and are
/// guaranteed to be strictly positive once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "BoardFields"))]
pub struct Board {
    name: String,
    width: Mm,
    height: Mm,
    thickness: Mm,
    trim: Trim,
}

impl Board {
    /// Creates a board, failing when the trim leaves no usable area.
    pub fn new(
        name: impl Into<String>,
        width: Mm,
        height: Mm,
        thickness: Mm,
        trim: Trim,
    ) -> Result<Self> {
        let name = name.into();
        if thickness < 0 {
            return Err(Error::InvalidBoard(format!(
                "board '{}' thickness must be >= 0",
                name
            )));
        }
        let usable_w = width - trim.left - trim.right;
        let usable_h = height - trim.top - trim.bottom;
        if usable_w <= 0 || usable_h <= 0 {
            return Err(Error::InvalidBoard(format!(
                "board '{}' {}x{} leaves usable area {}x{} after trim",
                name, width, height, usable_w, usable_h
            )));
        }
        Ok(Self {
            name,
            width,
            height,
            thickness,
            trim,
        })
    }

    /// Untrimmed board whose usable size equals `width` x `height`.
    pub fn usable(width: Mm, height: Mm) -> Result<Self> {
        Self::new("sheet", width, height, 0, Trim::none())
    }

    /// Board name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw width.
    pub fn width(&self) -> Mm {
        self.width
    }

    /// Raw height.
    pub fn height(&self) -> Mm {
        self.height
    }

    /// Thickness (informational only).
    pub fn thickness(&self) -> Mm {
        self.thickness
    }

    /// Trim margins.
    pub fn trim(&self) -> Trim {
        self.trim
    }

    /// Width inside the trim.
    pub fn usable_w(&self) -> Mm {
        self.width - self.trim.left - self.trim.right
    }

    /// Height inside the trim.
    pub fn usable_h(&self) -> Mm {
        self.height - self.trim.top - self.trim.bottom
    }

    /// Usable area in mm².
    pub fn usable_area(&self) -> Mm {
        self.usable_w() * self.usable_h()
    }

    /// The usable rectangle at the origin.
    pub fn usable_rect(&self) -> Rect {
        Rect::new(0, 0, self.usable_w(), self.usable_h())
    }
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct TrimFields {
    #[serde(default)]
    left: Mm,
    #[serde(default)]
    right: Mm,
    #[serde(default)]
    top: Mm,
    #[serde(default)]
    bottom: Mm,
}

#[cfg(feature = "serde")]
impl TryFrom<TrimFields> for Trim {
    type Error = Error;

    fn try_from(raw: TrimFields) -> Result<Self> {
        Trim::new(raw.left, raw.right, raw.top, raw.bottom)
    }
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct BoardFields {
    name: String,
    width: Mm,
    height: Mm,
    #[serde(default)]
    thickness: Mm,
    #[serde(default)]
    trim: Trim,
}

#[cfg(feature = "serde")]
impl TryFrom<BoardFields> for Board {
    type Error = Error;

    fn try_from(raw: BoardFields) -> Result<Self> {
        Board::new(raw.name, raw.width, raw.height, raw.thickness, raw.trim)
    }
}

/// Returns the default 2800x2070x18 board with a 10 mm trim.
pub fn default_board() -> Board {
    Board {
        name: "board".to_string(),
        width: DEFAULT_BOARD_W,
        height: DEFAULT_BOARD_H,
        thickness: DEFAULT_THICKNESS,
        trim: Trim {
            left: DEFAULT_TRIM,
            right: DEFAULT_TRIM,
            top: DEFAULT_TRIM,
            bottom: DEFAULT_TRIM,
        },
    }
}

/// Axis-aligned rectangle in usable coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rect {
    pub x: Mm,
    pub y: Mm,
    pub w: Mm,
    pub h: Mm,
}

impl Rect {
    pub fn new(x: Mm, y: Mm, w: Mm, h: Mm) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> Mm {
        self.x + self.w
    }

    pub fn top(&self) -> Mm {
        self.y + self.h
    }

    pub fn area(&self) -> Mm {
        self.w * self.h
    }

    /// Returns true if `w` x `h` fits inside without rotation.
    pub fn fits(&self, w: Mm, h: Mm) -> bool {
        w <= self.w && h <= self.h
    }

    /// Returns true if `other` lies completely inside this rectangle.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.top() <= self.top()
    }

    /// Returns true if the interiors intersect. Touching edges do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.overlaps_with_gap(other, 0)
    }

    /// Returns true if the rectangles are closer than `gap` on both axes.
    pub fn overlaps_with_gap(&self, other: &Rect, gap: Mm) -> bool {
        self.x < other.right() + gap
            && other.x < self.right() + gap
            && self.y < other.top() + gap
            && other.y < self.top() + gap
    }

    /// Moves the rectangle by `(dx, dy)`.
    pub fn translated(&self, dx: Mm, dy: Mm) -> Self {
        Self::new(self.x + dx, self.y + dy, self.w, self.h)
    }

    /// Long side divided by short side.
    pub fn aspect(&self) -> f64 {
        aspect_ratio(self.w, self.h)
    }
}

/// Long side over short side; infinite for degenerate sizes.
pub fn aspect_ratio(w: Mm, h: Mm) -> f64 {
    let lo = w.min(h);
    if lo <= 0 {
        return f64::INFINITY;
    }
    w.max(h) as f64 / lo as f64
}
