//! Zones and the zone allocation heuristic.
//!
//! A zone is a rectangle of a sheet produced by the two guillotine cuts of a
//! hybrid pattern. Allocation decides up front which zone each part should be
//! packed into, so long parts end up together in strip zones instead of being
//! scattered. It is advisory only; the zone packer may still reject a part.

use u_panelcut_core::{aspect_ratio, Mm, PartInstance, Rect};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const STRIP_BIAS: f64 = 0.20;
const BLOCK_BIAS: f64 = 0.10;
const NEAR_BONUS: f64 = 0.10;
/// A part dimension this close to the zone's counts as a near match.
const NEAR_TOLERANCE: Mm = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ZoneKind {
    /// Elongated zone, preferred for long parts.
    Strip,
    Block,
}

impl ZoneKind {
    pub fn classify(w: Mm, h: Mm, strip_aspect: f64) -> Self {
        if aspect_ratio(w, h) >= strip_aspect {
            Self::Strip
        } else {
            Self::Block
        }
    }
}

/// Rectangle of a sheet, in usable sheet coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zone {
    pub id: usize,
    pub rect: Rect,
    pub kind: ZoneKind,
}

impl Zone {
    pub fn new(id: usize, rect: Rect, strip_aspect: f64) -> Self {
        Self {
            id,
            rect,
            kind: ZoneKind::classify(rect.w, rect.h, strip_aspect),
        }
    }

    pub fn w(&self) -> Mm {
        self.rect.w
    }

    pub fn h(&self) -> Mm {
        self.rect.h
    }

    pub fn area(&self) -> Mm {
        self.rect.area()
    }

    pub fn is_strip(&self) -> bool {
        self.kind == ZoneKind::Strip
    }
}

/// Part to zone mapping, indexed like the allocated parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    assignment: Vec<Option<usize>>,
}

impl Allocation {
    /// Zone id assigned to part `i`.
    pub fn zone_of(&self, i: usize) -> Option<usize> {
        self.assignment.get(i).copied().flatten()
    }

    pub fn assigned_count(&self) -> usize {
        self.assignment.iter().flatten().count()
    }

    /// Parts assigned to `zone_id`, in input order.
    pub fn parts_in(&self, zone_id: usize, parts: &[PartInstance]) -> Vec<PartInstance> {
        parts
            .iter()
            .zip(&self.assignment)
            .filter(|(_, z)| **z == Some(zone_id))
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// Parts no zone can hold, in input order.
    pub fn unassigned(&self, parts: &[PartInstance]) -> Vec<PartInstance> {
        parts
            .iter()
            .zip(&self.assignment)
            .filter(|(_, z)| z.is_none())
            .map(|(p, _)| p.clone())
            .collect()
    }
}

/// How well a `pw` x `ph` footprint fills a `zw` x `zh` zone; higher is better.
pub fn efficiency_score(pw: Mm, ph: Mm, zw: Mm, zh: Mm) -> f64 {
    let r1 = pw as f64 / zw.max(1) as f64;
    let r2 = ph as f64 / zh.max(1) as f64;
    r1.max(r2) * 0.7 + r1 * r2 * 0.3
}

/// Best fitting footprint of `part` in `zone`; the turned one only wins if strictly better.
pub fn best_orientation(part: &PartInstance, zone: &Zone) -> Option<(Mm, Mm, bool)> {
    let (zw, zh) = (zone.w(), zone.h());
    let mut best = None;
    for (w, h, rotated) in part.orientations() {
        if w > zw || h > zh {
            continue;
        }
        best = match best {
            Some((bw, bh, br))
                if efficiency_score(w, h, zw, zh) <= efficiency_score(bw, bh, zw, zh) =>
            {
                Some((bw, bh, br))
            }
            _ => Some((w, h, rotated)),
        };
    }
    best
}

/// Greedily assigns each part to its best scoring zone.
///
/// Parts are visited largest first. A part with aspect ratio at least
/// `strip_aspect` is long and scans strip zones before block zones; other
/// parts scan block zones first. Among equal scores the first zone scanned
/// wins.
pub fn allocate_parts_to_zones(parts: &[PartInstance], zones: &[Zone], strip_aspect: f64) -> Allocation {
    let mut order: Vec<usize> = (0..parts.len()).collect();
    order.sort_by(|&a, &b| {
        let (pa, pb) = (&parts[a], &parts[b]);
        pb.area()
            .cmp(&pa.area())
            .then(pb.max_dim().cmp(&pa.max_dim()))
    });

    let strips: Vec<&Zone> = zones.iter().filter(|z| z.is_strip()).collect();
    let blocks: Vec<&Zone> = zones.iter().filter(|z| !z.is_strip()).collect();

    let mut assignment = vec![None; parts.len()];
    for i in order {
        let part = &parts[i];
        let long = aspect_ratio(part.w, part.h) >= strip_aspect;
        let scan = if long && !strips.is_empty() {
            strips.iter().chain(blocks.iter())
        } else {
            blocks.iter().chain(strips.iter())
        };

        let mut best: Option<(f64, usize)> = None;
        for zone in scan {
            let Some((w, h, _)) = best_orientation(part, zone) else {
                continue;
            };
            let mut score = efficiency_score(w, h, zone.w(), zone.h());
            match (zone.kind, long) {
                (ZoneKind::Strip, true) => score += STRIP_BIAS,
                (ZoneKind::Block, false) => score += BLOCK_BIAS,
                _ => {}
            }
            if (h - zone.h()).abs() <= NEAR_TOLERANCE || (w - zone.w()).abs() <= NEAR_TOLERANCE {
                score += NEAR_BONUS;
            }
            if best.map_or(true, |(s, _)| score > s) {
                best = Some((score, zone.id));
            }
        }
        assignment[i] = best.map(|(_, id)| id);
    }

    Allocation { assignment }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ASPECT: f64 = 2.2;

    fn zones() -> Vec<Zone> {
        vec![
            Zone::new(0, Rect::new(0, 0, 600, 2000), ASPECT),
            Zone::new(1, Rect::new(603, 0, 1400, 900), ASPECT),
            Zone::new(2, Rect::new(603, 903, 1400, 1097), ASPECT),
        ]
    }

    #[test]
    fn test_zone_kind() {
        let z = zones();
        assert_eq!(z[0].kind, ZoneKind::Strip);
        assert_eq!(z[1].kind, ZoneKind::Block);
        assert_eq!(ZoneKind::classify(220, 100, ASPECT), ZoneKind::Strip);
        assert_eq!(ZoneKind::classify(219, 100, ASPECT), ZoneKind::Block);
    }

    #[test]
    fn test_efficiency_score() {
        assert_relative_eq!(efficiency_score(100, 100, 100, 100), 1.0);
        assert_relative_eq!(efficiency_score(50, 100, 100, 100), 0.7 + 0.15);
        assert_relative_eq!(efficiency_score(10, 10, 0, 0), 10.0 * 0.7 + 100.0 * 0.3);
    }

    #[test]
    fn test_best_orientation_prefers_fuller_fit() {
        let zone = Zone::new(0, Rect::new(0, 0, 1000, 300), ASPECT);
        let part = PartInstance::new("p#1", 250, 900, true);
        assert_eq!(best_orientation(&part, &zone), Some((900, 250, true)));
        let fixed = PartInstance::new("p#1", 250, 900, false);
        assert_eq!(best_orientation(&fixed, &zone), None);
    }

    #[test]
    fn test_long_parts_go_to_strip() {
        let parts = vec![
            PartInstance::new("side#1", 560, 1900, false),
            PartInstance::new("door#1", 700, 850, true),
        ];
        let alloc = allocate_parts_to_zones(&parts, &zones(), ASPECT);
        assert_eq!(alloc.zone_of(0), Some(0));
        // Fills the 900 high block better than the taller one.
        assert_eq!(alloc.zone_of(1), Some(1));
        assert_eq!(alloc.assigned_count(), 2);
    }

    #[test]
    fn test_oversized_part_unassigned() {
        let parts = vec![
            PartInstance::new("big#1", 2500, 2500, true),
            PartInstance::new("small#1", 100, 100, true),
        ];
        let alloc = allocate_parts_to_zones(&parts, &zones(), ASPECT);
        assert_eq!(alloc.zone_of(0), None);
        assert_eq!(alloc.unassigned(&parts), vec![parts[0].clone()]);
        let zone = alloc.zone_of(1).unwrap();
        assert_eq!(alloc.parts_in(zone, &parts), vec![parts[1].clone()]);
    }
}
