//! Cut reconstruction for shelf layouts.
//!
//! Shelves are identified by a shared y origin. One horizontal cut is emitted
//! above every shelf except the topmost, spanning the full width; inside each
//! shelf one vertical cut is emitted at the right edge of every part that has
//! a right-hand neighbour. Kerf is already baked into the coordinates.

use crate::cut::CutSegment;
use crate::geometry::Mm;
use crate::placement::Placement;
use crate::Result;
use std::collections::BTreeMap;

/// Stage tag of shelf separating cuts.
pub const STAGE_SHELF: u32 = 1;
/// Stage tag of cuts between parts inside a shelf.
pub const STAGE_PART: u32 = 2;

/// Derives guillotine cuts from a shelf-structured placement set.
///
/// `width` is the width of the region the shelves span (the usable sheet
/// width, or a zone width for zone-local layouts).
pub fn shelf_cuts(
    placements: &[Placement],
    width: Mm,
    sheet_index: usize,
) -> Result<Vec<CutSegment>> {
    if placements.is_empty() {
        return Ok(Vec::new());
    }

    let mut shelves: BTreeMap<Mm, Vec<&Placement>> = BTreeMap::new();
    for p in placements {
        shelves.entry(p.y).or_default().push(p);
    }

    let shelf_info: Vec<(Mm, Mm, Vec<&Placement>)> = shelves
        .into_iter()
        .map(|(y0, mut parts)| {
            let h = parts.iter().map(|p| p.h).max().unwrap_or(0);
            parts.sort_by_key(|p| (p.x, p.part_id.clone()));
            (y0, h, parts)
        })
        .collect();

    let mut cuts = Vec::new();

    for (y0, h, _) in shelf_info.iter().take(shelf_info.len() - 1) {
        cuts.push(CutSegment::horizontal(
            sheet_index,
            y0 + h,
            0,
            width,
            STAGE_SHELF,
        )?);
    }

    for (y0, h, parts) in &shelf_info {
        for pair in parts.windows(2) {
            cuts.push(CutSegment::vertical(
                sheet_index,
                pair[0].right(),
                *y0,
                y0 + h,
                STAGE_PART,
            )?);
        }
    }

    Ok(cuts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cut::Orientation;

    fn place(id: &str, x: Mm, y: Mm, w: Mm, h: Mm) -> Placement {
        Placement::new(0, id, x, y, w, h, false)
    }

    #[test]
    fn test_empty_layout_has_no_cuts() {
        assert!(shelf_cuts(&[], 1000, 0).unwrap().is_empty());
    }

    #[test]
    fn test_single_part_has_no_internal_cuts() {
        let cuts = shelf_cuts(&[place("a#1", 0, 0, 500, 400)], 1000, 0).unwrap();
        assert!(cuts.is_empty());
    }

    #[test]
    fn test_two_shelves() {
        // Shelf 0: two parts 500x400 and 300x200, shelf height 400.
        // Shelf 1 at y = 403: one part.
        let placements = vec![
            place("a#1", 0, 0, 500, 400),
            place("b#1", 503, 0, 300, 200),
            place("c#1", 0, 403, 700, 300),
        ];
        let cuts = shelf_cuts(&placements, 1000, 4).unwrap();
        assert_eq!(cuts.len(), 2);

        let h = &cuts[0];
        assert_eq!(h.orientation, Orientation::Horizontal);
        assert_eq!((h.coord, h.start, h.end, h.stage), (400, 0, 1000, STAGE_SHELF));
        assert_eq!(h.sheet_index, 4);

        let v = &cuts[1];
        assert_eq!(v.orientation, Orientation::Vertical);
        assert_eq!((v.coord, v.start, v.end, v.stage), (500, 0, 400, STAGE_PART));
    }

    #[test]
    fn test_deterministic_regardless_of_input_order() {
        let a = vec![
            place("a#1", 0, 0, 100, 100),
            place("b#1", 103, 0, 100, 100),
            place("c#1", 206, 0, 100, 50),
        ];
        let mut b = a.clone();
        b.reverse();
        assert_eq!(shelf_cuts(&a, 400, 0).unwrap(), shelf_cuts(&b, 400, 0).unwrap());
    }
}
