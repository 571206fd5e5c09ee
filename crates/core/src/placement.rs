//! Placed part representation.

use crate::geometry::{Mm, Rect};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A part instance placed on a sheet, in usable coordinates.
///
/// `w` and `h` are the effective dimensions after rotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Placement {
    pub sheet_index: usize,
    pub part_id: String,
    pub x: Mm,
    pub y: Mm,
    pub w: Mm,
    pub h: Mm,
    pub rotated: bool,
}

impl Placement {
    pub fn new(
        sheet_index: usize,
        part_id: impl Into<String>,
        x: Mm,
        y: Mm,
        w: Mm,
        h: Mm,
        rotated: bool,
    ) -> Self {
        Self {
            sheet_index,
            part_id: part_id.into(),
            x,
            y,
            w,
            h,
            rotated,
        }
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

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }

    /// Returns true if the placement lies inside a `usable_w` x `usable_h` sheet.
    pub fn within(&self, usable_w: Mm, usable_h: Mm) -> bool {
        self.x >= 0 && self.y >= 0 && self.right() <= usable_w && self.top() <= usable_h
    }

    /// Copy shifted by `(dx, dy)`, used to lift zone-local layouts onto the sheet.
    pub fn translated(&self, dx: Mm, dy: Mm) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self.clone()
        }
    }

    /// Copy moved onto another sheet.
    pub fn on_sheet(mut self, sheet_index: usize) -> Self {
        self.sheet_index = sheet_index;
        self
    }
}
