//! Waste and cut-length metrics.
//!
//! Metrics are solver agnostic: they only look at placements and cut segments
//! of one sheet and never influence packing decisions.

use crate::cut::CutSegment;
use crate::geometry::{Board, Mm};
use crate::placement::Placement;
use crate::result::SheetResult;
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Metrics of one sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SheetMetrics {
    /// Usable area not covered by parts (mm²).
    pub waste_area: Mm,
    /// Sum of all cut segment lengths (mm).
    pub internal_cut_length: Mm,
    /// Border length charged because a part touches it (mm).
    pub trim_cut_length: Mm,
}

impl SheetMetrics {
    /// Internal plus trim-charged length.
    pub fn total_cut_length(&self) -> Mm {
        self.internal_cut_length + self.trim_cut_length
    }
}

impl std::ops::Add for SheetMetrics {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            waste_area: self.waste_area + rhs.waste_area,
            internal_cut_length: self.internal_cut_length + rhs.internal_cut_length,
            trim_cut_length: self.trim_cut_length + rhs.trim_cut_length,
        }
    }
}

fn check_within_usable(board: &Board, placements: &[Placement]) -> Result<()> {
    let (w, h) = (board.usable_w(), board.usable_h());
    for p in placements {
        if !p.within(w, h) {
            return Err(Error::OutOfBounds(format!(
                "{} at ({}, {}) size {}x{} exceeds usable {}x{}",
                p.part_id, p.x, p.y, p.w, p.h, w, h
            )));
        }
    }
    Ok(())
}

/// Usable area minus placed area.
///
/// Fails if a placement is outside the usable rectangle or if the placed area
/// exceeds the usable area, which can only happen with overlapping parts.
pub fn waste_area(board: &Board, placements: &[Placement]) -> Result<Mm> {
    check_within_usable(board, placements)?;
    let used: Mm = placements.iter().map(Placement::area).sum();
    let total = board.usable_area();
    let waste = total - used;
    if waste < 0 {
        return Err(Error::InvariantViolation(format!(
            "negative waste area (used {} > usable {})",
            used, total
        )));
    }
    Ok(waste)
}

/// Sum of cut segment lengths.
pub fn internal_cut_length(cuts: &[CutSegment]) -> Mm {
    cuts.iter().map(CutSegment::length).sum()
}

/// Border length charged for parts touching the usable boundary.
///
/// Each part adds its height for every left/right border it touches and its
/// width for every bottom/top border it touches, so a corner part is charged
/// on two borders. Placements are assumed not to overlap.
pub fn trim_cut_length(board: &Board, placements: &[Placement]) -> Result<Mm> {
    check_within_usable(board, placements)?;
    let (w, h) = (board.usable_w(), board.usable_h());

    let mut charged = 0;
    for p in placements {
        if p.x == 0 {
            charged += p.h;
        }
        if p.right() == w {
            charged += p.h;
        }
        if p.y == 0 {
            charged += p.w;
        }
        if p.top() == h {
            charged += p.w;
        }
    }
    Ok(charged)
}

/// Computes all three metrics and stores them on the sheet.
pub fn compute_sheet_metrics(sheet: &mut SheetResult) -> Result<SheetMetrics> {
    let metrics = SheetMetrics {
        waste_area: waste_area(&sheet.board, &sheet.placements)?,
        internal_cut_length: internal_cut_length(&sheet.cuts),
        trim_cut_length: trim_cut_length(&sheet.board, &sheet.placements)?,
    };
    sheet.metrics = Some(metrics);
    Ok(metrics)
}

/// Recomputes metrics on every sheet and returns the totals.
pub fn compute_solution_metrics(sheets: &mut [SheetResult]) -> Result<SheetMetrics> {
    let mut total = SheetMetrics::default();
    for sheet in sheets.iter_mut() {
        total = total + compute_sheet_metrics(sheet)?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Trim;

    fn board(w: Mm, h: Mm) -> Board {
        Board::new("t", w, h, 18, Trim::none()).unwrap()
    }

    #[test]
    fn test_waste_area() {
        let b = board(1000, 500);
        let placements = vec![
            Placement::new(0, "a#1", 0, 0, 400, 500, false),
            Placement::new(0, "b#1", 403, 0, 200, 200, false),
        ];
        assert_eq!(waste_area(&b, &placements).unwrap(), 500_000 - 200_000 - 40_000);
    }

    #[test]
    fn test_out_of_bounds_fails() {
        let b = board(1000, 500);
        let placements = vec![Placement::new(0, "a#1", 700, 0, 400, 100, false)];
        assert!(matches!(
            waste_area(&b, &placements),
            Err(Error::OutOfBounds(_))
        ));
        let negative = vec![Placement::new(0, "a#1", -1, 0, 10, 10, false)];
        assert!(trim_cut_length(&b, &negative).is_err());
    }

    #[test]
    fn test_negative_waste_raises() {
        let b = board(100, 100);
        let placements = vec![
            Placement::new(0, "a#1", 0, 0, 100, 100, false),
            Placement::new(0, "b#1", 0, 0, 100, 100, false),
        ];
        assert!(matches!(
            waste_area(&b, &placements),
            Err(Error::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_trim_charged_corner_counts_twice() {
        let b = board(1000, 500);
        // Bottom-left corner: touches left and bottom.
        let corner = vec![Placement::new(0, "a#1", 0, 0, 300, 200, false)];
        assert_eq!(trim_cut_length(&b, &corner).unwrap(), 200 + 300);

        // Full-height part at the right border: right, bottom and top.
        let tall = vec![Placement::new(0, "b#1", 700, 0, 300, 500, false)];
        assert_eq!(trim_cut_length(&b, &tall).unwrap(), 500 + 300 + 300);

        // Floating part touches nothing.
        let inner = vec![Placement::new(0, "c#1", 10, 10, 100, 100, false)];
        assert_eq!(trim_cut_length(&b, &inner).unwrap(), 0);
    }

    #[test]
    fn test_compute_sheet_metrics_is_idempotent() {
        let b = board(1000, 500);
        let mut sheet = SheetResult::new(0, b);
        sheet.placements = vec![
            Placement::new(0, "a#1", 0, 0, 400, 500, false),
            Placement::new(0, "b#1", 403, 0, 200, 200, false),
        ];
        sheet.cuts = vec![CutSegment::vertical(0, 400, 0, 500, 2).unwrap()];

        let first = compute_sheet_metrics(&mut sheet).unwrap();
        let second = compute_sheet_metrics(&mut sheet).unwrap();
        assert_eq!(first, second);
        assert_eq!(sheet.metrics, Some(first));
        assert_eq!(first.internal_cut_length, 500);
        assert_eq!(first.total_cut_length(), 500 + first.trim_cut_length);
    }
}
