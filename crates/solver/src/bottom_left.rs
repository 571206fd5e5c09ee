//! Bottom-left greedy packer.
//!
//! Parts are taken largest first and dropped at the lowest, then leftmost,
//! anchor where they fit without coming closer than one kerf to any placed
//! part. Anchors are the origin plus the right and top edges (offset by the
//! kerf) of every placed part. There is no backtracking: a part that does not
//! fit is left for the next sheet.

use crate::driver::{SheetLayout, SheetStrategy};
use std::collections::HashSet;
use u_panelcut_core::{Board, CutSegment, Mm, PartInstance, Placement, Rect, Result};

/// Stage tag of the edge cuts emitted for bottom-left layouts.
pub const STAGE_EDGE: u32 = 3;

/// Bottom-left heuristic as a sheet strategy.
#[derive(Debug, Clone)]
pub struct BottomLeftPacker {
    kerf: Mm,
}

impl BottomLeftPacker {
    pub fn new(kerf: Mm) -> Self {
        Self { kerf }
    }

    /// Packs `parts` into a `width` x `height` region.
    pub fn pack(
        &self,
        width: Mm,
        height: Mm,
        parts: &[PartInstance],
        sheet_index: usize,
    ) -> Result<SheetLayout> {
        let mut order: Vec<&PartInstance> = parts.iter().collect();
        order.sort_by(|a, b| b.area().cmp(&a.area()));

        let mut occupied: Vec<Rect> = Vec::new();
        let mut placements = Vec::new();
        let mut remaining = Vec::new();

        for part in order {
            let best = part
                .orientations()
                .into_iter()
                .filter_map(|(w, h, rotated)| {
                    self.find_position(&occupied, width, height, w, h)
                        .map(|(x, y)| (y, x, w, h, rotated))
                })
                .min_by_key(|&(y, x, ..)| (y, x));

            match best {
                Some((y, x, w, h, rotated)) => {
                    occupied.push(Rect::new(x, y, w, h));
                    let id = part.id.clone();
                    placements.push(Placement::new(sheet_index, id, x, y, w, h, rotated));
                }
                None => remaining.push(part.clone()),
            }
        }

        let cuts = edge_cuts(&placements, width, height, sheet_index)?;
        // Keep leftovers in pool order.
        let leftover: HashSet<&str> = remaining.iter().map(|p| p.id.as_str()).collect();
        let remaining = parts
            .iter()
            .filter(|p| leftover.contains(p.id.as_str()))
            .cloned()
            .collect();

        Ok(SheetLayout {
            placements,
            cuts,
            remaining,
        })
    }

    fn find_position(
        &self,
        occupied: &[Rect],
        width: Mm,
        height: Mm,
        w: Mm,
        h: Mm,
    ) -> Option<(Mm, Mm)> {
        if w > width || h > height {
            return None;
        }
        let mut anchors = vec![(0, 0)];
        for r in occupied {
            anchors.push((r.right() + self.kerf, r.y));
            anchors.push((r.x, r.top() + self.kerf));
        }
        anchors.sort_by_key(|&(x, y)| (y, x));
        anchors.dedup();

        anchors.into_iter().find(|&(x, y)| {
            let candidate = Rect::new(x, y, w, h);
            x + w <= width
                && y + h <= height
                && !occupied
                    .iter()
                    .any(|r| candidate.overlaps_with_gap(r, self.kerf))
        })
    }
}

impl SheetStrategy for BottomLeftPacker {
    fn name(&self) -> &'static str {
        "bottom-left"
    }

    fn pack_sheet(
        &mut self,
        board: &Board,
        parts: &[PartInstance],
        sheet_index: usize,
    ) -> Result<SheetLayout> {
        self.pack(board.usable_w(), board.usable_h(), parts, sheet_index)
    }
}

/// One cut along every part edge that faces the interior of the sheet.
fn edge_cuts(
    placements: &[Placement],
    width: Mm,
    height: Mm,
    sheet_index: usize,
) -> Result<Vec<CutSegment>> {
    let mut cuts = Vec::new();
    for p in placements {
        if p.right() < width {
            let cut = CutSegment::vertical(sheet_index, p.right(), p.y, p.top(), STAGE_EDGE)?;
            cuts.push(cut);
        }
        if p.top() < height {
            let cut = CutSegment::horizontal(sheet_index, p.top(), p.x, p.right(), STAGE_EDGE)?;
            cuts.push(cut);
        }
    }
    Ok(cuts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fills_bottom_row_first() {
        let parts: Vec<_> = (1..=3)
            .map(|k| PartInstance::new(format!("p#{}", k), 300, 200, false))
            .collect();
        let layout = BottomLeftPacker::new(3).pack(1000, 1000, &parts, 0).unwrap();
        let positions: Vec<_> = layout.placements.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(positions, vec![(0, 0), (303, 0), (606, 0)]);
        assert!(layout.remaining.is_empty());
    }

    #[test]
    fn test_kerf_gap_is_respected() {
        let parts: Vec<_> = (1..=4)
            .map(|k| PartInstance::new(format!("p#{}", k), 250, 500, false))
            .collect();
        // Four 250 wide parts only fit side by side without kerf.
        let layout = BottomLeftPacker::new(3).pack(1000, 500, &parts, 0).unwrap();
        assert_eq!(layout.placements.len(), 3);
        assert_eq!(layout.remaining.len(), 1);
        for (i, a) in layout.placements.iter().enumerate() {
            for b in &layout.placements[i + 1..] {
                assert!(!a.rect().overlaps_with_gap(&b.rect(), 3));
            }
        }

        let layout = BottomLeftPacker::new(0).pack(1000, 500, &parts, 0).unwrap();
        assert_eq!(layout.placements.len(), 4);
    }

    #[test]
    fn test_rotates_when_allowed() {
        let parts = vec![PartInstance::new("tall#1", 900, 1300, true)];
        let layout = BottomLeftPacker::new(3).pack(2000, 1200, &parts, 0).unwrap();
        assert_eq!(layout.placements.len(), 1);
        assert!(layout.placements[0].rotated);
        assert_eq!((layout.placements[0].w, layout.placements[0].h), (1300, 900));

        let fixed = vec![PartInstance::new("tall#1", 900, 1300, false)];
        let layout = BottomLeftPacker::new(3).pack(2000, 1200, &fixed, 0).unwrap();
        assert!(layout.placements.is_empty());
        assert_eq!(layout.remaining, fixed);
    }

    #[test]
    fn test_edge_cuts_stay_inside() {
        let parts = vec![
            PartInstance::new("a#1", 1000, 300, false),
            PartInstance::new("b#1", 400, 400, false),
        ];
        let layout = BottomLeftPacker::new(3).pack(1000, 1000, &parts, 0).unwrap();
        // a spans the full width: only its top edge is cut.
        assert!(layout.cuts.iter().all(|c| c.within(1000, 1000)));
        assert_eq!(layout.cuts.len(), 3);
    }
}
