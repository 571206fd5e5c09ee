//! Two-level hybrid search.
//!
//! For one sheet the search compares a baseline full-sheet shelf packing with
//! layouts built from "two-cut" patterns: a first guillotine cut splits the
//! sheet in two, a second cut splits one of the halves again, giving three
//! zones. Parts are allocated to zones up front, each zone is shelf packed
//! through the [`ZonePackCache`], and the layout placing the most area wins
//! (then less waste, then less cutting).
//!
//! The baseline is always a candidate, so the result is never worse than
//! plain shelving. The search stops at the per-sheet deadline or after
//! `max_patterns` patterns, whichever comes first.

use crate::driver::{SheetLayout, SheetStrategy};
use crate::shelf::ShelfPacker;
use crate::zone::{allocate_parts_to_zones, Zone};
use crate::zone_cache::{ZonePack, ZonePackCache};
use std::collections::{BTreeSet, HashSet};
use std::time::{Duration, Instant};
use u_panelcut_core::{
    shelf_cuts, Board, CutSegment, HybridConfig, Mm, ObjectiveWeights, Orientation, PartInstance,
    Placement, Rect, Result, SheetResult, SolverConfig,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stage of the first pattern cut.
pub const STAGE_FIRST: u32 = 0;
/// Stage of the second pattern cut.
pub const STAGE_SECOND: u32 = 1;
/// Offset added to the stages of cuts made inside a zone.
pub const ZONE_STAGE_OFFSET: u32 = 2;

const ZONE_TIME_MIN: f64 = 0.2;
const ZONE_TIME_MAX: f64 = 0.6;

/// Half of the sheet the second cut splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Side {
    /// Left half after a vertical cut, bottom half after a horizontal one.
    First,
    Second,
}

/// Two guillotine cuts producing three zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TwoCutPattern {
    pub first: Orientation,
    /// Cut coordinate in sheet space.
    pub first_pos: Mm,
    pub side: Side,
    pub second: Orientation,
    /// Cut coordinate relative to the split half.
    pub second_pos: Mm,
}

/// Zones and explicit cuts of a pattern, in usable sheet coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternSplit {
    /// The unsplit half, then the two pieces of the split one.
    pub zones: [Rect; 3],
    pub cuts: [CutSegment; 2],
}

impl TwoCutPattern {
    /// Splits a `w` x `h` region; `None` if any zone would be empty.
    pub fn split(&self, w: Mm, h: Mm, kerf: Mm) -> Result<Option<PatternSplit>> {
        let (a, b, first_cut) = match self.first {
            Orientation::Vertical => {
                let x = self.first_pos;
                let (wa, wb) = (x, w - x - kerf);
                if wa <= 0 || wb <= 0 {
                    return Ok(None);
                }
                (
                    Rect::new(0, 0, wa, h),
                    Rect::new(x + kerf, 0, wb, h),
                    CutSegment::vertical(0, x, 0, h, STAGE_FIRST)?,
                )
            }
            Orientation::Horizontal => {
                let y = self.first_pos;
                let (ha, hb) = (y, h - y - kerf);
                if ha <= 0 || hb <= 0 {
                    return Ok(None);
                }
                (
                    Rect::new(0, 0, w, ha),
                    Rect::new(0, y + kerf, w, hb),
                    CutSegment::horizontal(0, y, 0, w, STAGE_FIRST)?,
                )
            }
        };
        let (target, other) = match self.side {
            Side::First => (a, b),
            Side::Second => (b, a),
        };

        let pos = self.second_pos;
        let (r1, r2, second_cut) = match self.second {
            Orientation::Vertical => {
                let (w1, w2) = (pos, target.w - pos - kerf);
                if w1 <= 0 || w2 <= 0 {
                    return Ok(None);
                }
                (
                    Rect::new(target.x, target.y, w1, target.h),
                    Rect::new(target.x + pos + kerf, target.y, w2, target.h),
                    CutSegment::vertical(
                        0,
                        target.x + pos,
                        target.y,
                        target.top(),
                        STAGE_SECOND,
                    )?,
                )
            }
            Orientation::Horizontal => {
                let (h1, h2) = (pos, target.h - pos - kerf);
                if h1 <= 0 || h2 <= 0 {
                    return Ok(None);
                }
                (
                    Rect::new(target.x, target.y, target.w, h1),
                    Rect::new(target.x, target.y + pos + kerf, target.w, h2),
                    CutSegment::horizontal(
                        0,
                        target.y + pos,
                        target.x,
                        target.right(),
                        STAGE_SECOND,
                    )?,
                )
            }
        };

        Ok(Some(PatternSplit {
            zones: [other, r1, r2],
            cuts: [first_cut, second_cut],
        }))
    }
}

/// Candidate cut positions along a side of length `length`.
///
/// Part widths and heights plus multiples of `step`, keeping only positions
/// that leave at least `min_side` on both sides of the kerf. Lists longer
/// than `cap` are evenly subsampled.
pub fn candidate_positions(
    parts: &[PartInstance],
    length: Mm,
    kerf: Mm,
    step: Mm,
    cap: usize,
    min_side: Mm,
) -> Vec<Mm> {
    let mut set: BTreeSet<Mm> = parts.iter().flat_map(|p| [p.w, p.h]).collect();
    if step > 0 {
        set.extend((1..).map(|k| k * step).take_while(|&x| x < length));
    }
    let good: Vec<Mm> = set
        .into_iter()
        .filter(|&a| a >= min_side && length - a - kerf >= min_side)
        .collect();

    if good.len() <= cap {
        return good;
    }
    match cap {
        0 => Vec::new(),
        1 => vec![good[(good.len() - 1) / 2]],
        _ => {
            let last = (good.len() - 1) as f64;
            let picked: BTreeSet<Mm> = (0..cap)
                .map(|i| {
                    let idx = (i as f64 * last / (cap - 1) as f64).round() as usize;
                    good[idx]
                })
                .collect();
            picked.into_iter().collect()
        }
    }
}

/// Every two-cut pattern for a `w` x `h` sheet, in search order.
pub fn enumerate_patterns(
    parts: &[PartInstance],
    w: Mm,
    h: Mm,
    kerf: Mm,
    config: &HybridConfig,
) -> Vec<TwoCutPattern> {
    let positions = |length, cap| {
        candidate_positions(parts, length, kerf, config.grid_step, cap, config.min_side)
    };
    let first = |length| positions(length, config.max_candidates);
    let second = |length| positions(length, config.max_candidates_second);

    let pattern = |first, first_pos, side, second, second_pos| TwoCutPattern {
        first,
        first_pos,
        side,
        second,
        second_pos,
    };
    let (v, hz) = (Orientation::Vertical, Orientation::Horizontal);
    let mut out = Vec::new();

    let across_h = second(h);
    for x in first(w) {
        for (side, width) in [(Side::First, x), (Side::Second, w - x - kerf)] {
            out.extend(across_h.iter().map(|&y2| pattern(v, x, side, hz, y2)));
            out.extend(second(width).into_iter().map(|x2| pattern(v, x, side, v, x2)));
        }
    }

    let across_w = second(w);
    for y in first(h) {
        for (side, height) in [(Side::First, y), (Side::Second, h - y - kerf)] {
            out.extend(across_w.iter().map(|&x2| pattern(hz, y, side, v, x2)));
            out.extend(second(height).into_iter().map(|y2| pattern(hz, y, side, hz, y2)));
        }
    }
    out
}

/// Layout chosen for one sheet.
#[derive(Debug, Clone)]
pub struct HybridOutcome {
    pub layout: SheetLayout,
    /// Winning pattern, `None` if the baseline won.
    pub pattern: Option<TwoCutPattern>,
    pub patterns_tried: usize,
    pub baseline_area: Mm,
}

/// A scored candidate layout.
struct Candidate {
    sheet: SheetResult,
    remaining: Vec<PartInstance>,
    pattern: Option<TwoCutPattern>,
}

impl Candidate {
    /// (placed area, waste, total cut); metrics are always present here.
    fn score(&self) -> (Mm, Mm, Mm) {
        let m = self.sheet.metrics.unwrap_or_default();
        (self.sheet.placed_area(), m.waste_area, m.total_cut_length())
    }

    fn beats(&self, other: &Candidate) -> bool {
        let (area, waste, cut) = self.score();
        let (o_area, o_waste, o_cut) = other.score();
        area > o_area || (area == o_area && (waste < o_waste || (waste == o_waste && cut < o_cut)))
    }
}

/// Hybrid two-level search over a borrowed zone cache.
pub struct HybridSearch<'c> {
    config: HybridConfig,
    kerf: Mm,
    time_limit: Duration,
    weights: ObjectiveWeights,
    node_limit: Option<u64>,
    cache: &'c mut ZonePackCache,
}

impl<'c> HybridSearch<'c> {
    pub fn new(config: &SolverConfig, cache: &'c mut ZonePackCache) -> Self {
        Self {
            config: config.hybrid.clone(),
            kerf: config.kerf,
            time_limit: config.time_limit(),
            weights: config.weights,
            node_limit: config.node_limit,
            cache,
        }
    }

    fn packer(&self) -> ShelfPacker {
        ShelfPacker::new(self.kerf)
            .with_max_shelves(Some(self.config.zone_max_shelves))
            .with_weights(self.weights)
            .with_node_limit(self.node_limit)
    }

    /// Time for one zone pack: a twelfth of the budget, clamped to 0.2..0.6 s.
    fn zone_budget(&self) -> Duration {
        let secs = (self.time_limit.as_secs_f64() / 12.0).clamp(ZONE_TIME_MIN, ZONE_TIME_MAX);
        Duration::from_secs_f64(secs)
    }

    /// Best layout for one sheet.
    pub fn best_layout(
        &mut self,
        board: &Board,
        parts: &[PartInstance],
        sheet_index: usize,
    ) -> Result<HybridOutcome> {
        let start = Instant::now();
        let deadline = start + self.time_limit;
        let (w, h) = (board.usable_w(), board.usable_h());

        // The baseline gets a third of the budget, the patterns the rest.
        let baseline = self.packer().pack(w, h, parts, self.time_limit / 3)?;
        let cuts = baseline.cuts(w, sheet_index)?;
        let placements = baseline
            .placements
            .iter()
            .map(|p| p.clone().on_sheet(sheet_index))
            .collect();
        let mut best = Candidate {
            sheet: SheetResult::with_layout(sheet_index, board.clone(), placements, cuts)?,
            remaining: baseline.remaining,
            pattern: None,
        };
        let baseline_area = best.sheet.placed_area();

        if best.remaining.is_empty() {
            log::debug!("hybrid: baseline places all {} parts", parts.len());
            return Ok(finish(best, 0, baseline_area));
        }

        let patterns = enumerate_patterns(parts, w, h, self.kerf, &self.config);
        log::debug!("hybrid: {} candidate patterns for {}x{}", patterns.len(), w, h);

        let mut tried = 0;
        for pattern in patterns {
            if tried >= self.config.max_patterns {
                break;
            }
            if Instant::now() >= deadline {
                log::debug!("hybrid: deadline reached after {} patterns", tried);
                break;
            }
            tried += 1;
            let candidate = self.build_pattern(board, parts, pattern, sheet_index, deadline)?;
            if let Some(candidate) = candidate.filter(|c| c.beats(&best)) {
                best = candidate;
            }
        }

        let stats = self.cache.stats();
        log::debug!(
            "hybrid: sheet {} tried {} patterns, cache {} hits / {} misses, {} ms",
            sheet_index,
            tried,
            stats.hits,
            stats.misses,
            start.elapsed().as_millis()
        );
        Ok(finish(best, tried, baseline_area))
    }

    fn build_pattern(
        &mut self,
        board: &Board,
        parts: &[PartInstance],
        pattern: TwoCutPattern,
        sheet_index: usize,
        deadline: Instant,
    ) -> Result<Option<Candidate>> {
        let Some(split) = pattern.split(board.usable_w(), board.usable_h(), self.kerf)? else {
            return Ok(None);
        };
        let zones: Vec<Zone> = split
            .zones
            .iter()
            .enumerate()
            .map(|(i, r)| Zone::new(i, *r, self.config.strip_aspect))
            .collect();
        let allocation = allocate_parts_to_zones(parts, &zones, self.config.strip_aspect);

        let mut order: Vec<&Zone> = zones.iter().collect();
        order.sort_by_key(|z| (!z.is_strip(), std::cmp::Reverse(z.area())));

        let mut placed: HashSet<String> = HashSet::new();
        let mut placements: Vec<Placement> = Vec::new();
        let mut cuts: Vec<CutSegment> = split
            .cuts
            .iter()
            .map(|c| c.clone().on_sheet(sheet_index))
            .collect();

        for zone in order {
            let mut candidates: Vec<PartInstance> = allocation
                .parts_in(zone.id, parts)
                .into_iter()
                .filter(|p| !placed.contains(&p.id))
                .collect();
            if !zone.is_strip() {
                self.inject_from_pool(&mut candidates, parts, &placed, zone);
            }
            if candidates.is_empty() {
                continue;
            }

            let remaining_time = deadline.saturating_duration_since(Instant::now());
            let budget = self.zone_budget().min(remaining_time).max(Duration::from_millis(1));
            let packer = self.packer();
            let (zw, zh) = (zone.w(), zone.h());
            let pack = self.cache.get_or_pack(zw, zh, self.kerf, &candidates, |c| {
                pack_zone(&packer, zw, zh, c, budget)
            })?;

            for p in pack.placements {
                placed.insert(p.part_id.clone());
                placements.push(p.translated(zone.rect.x, zone.rect.y).on_sheet(sheet_index));
            }
            cuts.extend(pack.cuts.iter().map(|c| {
                c.translated(zone.rect.x, zone.rect.y)
                    .with_stage_offset(ZONE_STAGE_OFFSET)
                    .on_sheet(sheet_index)
            }));
        }

        let remaining = parts.iter().filter(|p| !placed.contains(&p.id)).cloned().collect();
        let sheet = SheetResult::with_layout(sheet_index, board.clone(), placements, cuts)?;
        Ok(Some(Candidate {
            sheet,
            remaining,
            pattern: Some(pattern),
        }))
    }

    /// Tops up a block zone with the largest unplaced parts that fit it.
    fn inject_from_pool(
        &self,
        candidates: &mut Vec<PartInstance>,
        pool: &[PartInstance],
        placed: &HashSet<String>,
        zone: &Zone,
    ) {
        if self.config.inject_cap == 0 {
            return;
        }
        let have: HashSet<String> = candidates.iter().map(|p| p.id.clone()).collect();
        let mut extra: Vec<&PartInstance> = pool
            .iter()
            .filter(|p| !placed.contains(&p.id) && !have.contains(&p.id))
            .filter(|p| p.fits_in(zone.w(), zone.h()))
            .collect();
        extra.sort_by(|a, b| b.area().cmp(&a.area()));
        candidates.extend(extra.into_iter().take(self.config.inject_cap).cloned());
    }
}

fn pack_zone(
    packer: &ShelfPacker,
    w: Mm,
    h: Mm,
    parts: &[PartInstance],
    budget: Duration,
) -> Result<ZonePack> {
    let pack = packer.pack(w, h, parts, budget)?;
    let cuts = shelf_cuts(&pack.placements, w, 0)?;
    Ok(ZonePack {
        placements: pack.placements,
        cuts,
        remaining: pack.remaining,
    })
}

fn finish(best: Candidate, tried: usize, baseline_area: Mm) -> HybridOutcome {
    HybridOutcome {
        layout: SheetLayout {
            placements: best.sheet.placements,
            cuts: best.sheet.cuts,
            remaining: best.remaining,
        },
        pattern: best.pattern,
        patterns_tried: tried,
        baseline_area,
    }
}

impl SheetStrategy for HybridSearch<'_> {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    fn pack_sheet(
        &mut self,
        board: &Board,
        parts: &[PartInstance],
        sheet_index: usize,
    ) -> Result<SheetLayout> {
        let outcome = self.best_layout(board, parts, sheet_index)?;
        if let Some(pattern) = outcome.pattern {
            log::debug!("hybrid: sheet {} uses {:?}", sheet_index, pattern);
        }
        Ok(outcome.layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(id: &str, w: Mm, h: Mm, rot: bool) -> PartInstance {
        PartInstance::new(id, w, h, rot)
    }

    #[test]
    fn test_candidate_positions_filter_and_cap() {
        let parts = vec![part("a#1", 300, 40, true)];
        // 40 is too close to the edge, grid adds 100..900.
        let pos = candidate_positions(&parts, 1000, 3, 100, 50, 50);
        assert_eq!(pos, vec![100, 200, 300, 400, 500, 600, 700, 800, 900]);

        let pos = candidate_positions(&parts, 1000, 3, 100, 3, 50);
        assert_eq!(pos, vec![100, 500, 900]);
        assert_eq!(candidate_positions(&parts, 1000, 3, 100, 1, 50), vec![500]);
        assert!(candidate_positions(&parts, 1000, 3, 100, 0, 50).is_empty());
    }

    #[test]
    fn test_candidate_positions_respect_kerf() {
        let parts = vec![part("a#1", 948, 100, false)];
        let pos = candidate_positions(&parts, 1000, 3, 0, 10, 50);
        // 948 leaves 49 after the kerf.
        assert_eq!(pos, vec![100]);
    }

    #[test]
    fn test_split_vertical_then_horizontal() {
        let pattern = TwoCutPattern {
            first: Orientation::Vertical,
            first_pos: 600,
            side: Side::Second,
            second: Orientation::Horizontal,
            second_pos: 900,
        };
        let split = pattern.split(2000, 2000, 3).unwrap().unwrap();
        assert_eq!(split.zones[0], Rect::new(0, 0, 600, 2000));
        assert_eq!(split.zones[1], Rect::new(603, 0, 1397, 900));
        assert_eq!(split.zones[2], Rect::new(603, 903, 1397, 1097));
        assert_eq!(split.cuts[0].coord, 600);
        assert_eq!((split.cuts[0].start, split.cuts[0].end), (0, 2000));
        assert_eq!(split.cuts[1].coord, 900);
        assert_eq!((split.cuts[1].start, split.cuts[1].end), (603, 2000));
        assert_eq!(split.cuts[1].stage, STAGE_SECOND);
    }

    #[test]
    fn test_split_rejects_empty_zone() {
        let pattern = TwoCutPattern {
            first: Orientation::Horizontal,
            first_pos: 500,
            side: Side::First,
            second: Orientation::Horizontal,
            second_pos: 498,
        };
        assert!(pattern.split(1000, 1000, 3).unwrap().is_none());
    }

    #[test]
    fn test_enumerate_patterns_all_valid() {
        let parts = vec![part("a#1", 400, 300, true)];
        let config = HybridConfig::default().with_grid_step(250);
        let patterns = enumerate_patterns(&parts, 1000, 800, 3, &config);
        assert!(!patterns.is_empty());
        assert_eq!(patterns[0].first, Orientation::Vertical);
        for p in &patterns {
            assert!(p.split(1000, 800, 3).unwrap().is_some(), "{:?}", p);
        }
    }

    #[test]
    fn test_baseline_exit_when_everything_fits() {
        let board = Board::usable(1000, 1000).unwrap();
        let parts = vec![part("a#1", 400, 400, true), part("b#1", 400, 400, true)];
        let config = SolverConfig::new().with_time_limit(500);
        let mut cache = ZonePackCache::new(16);
        let outcome = HybridSearch::new(&config, &mut cache)
            .best_layout(&board, &parts, 0)
            .unwrap();
        assert_eq!(outcome.patterns_tried, 0);
        assert!(outcome.pattern.is_none());
        assert!(outcome.layout.remaining.is_empty());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_never_worse_than_baseline() {
        let board = Board::usable(1200, 1000).unwrap();
        let mut parts: Vec<_> = (1..=3)
            .map(|k| part(&format!("side#{}", k), 250, 990, false))
            .collect();
        parts.extend((1..=8).map(|k| part(&format!("box#{}", k), 300, 260, true)));
        let config = SolverConfig::new()
            .with_time_limit(1500)
            .with_node_limit(5_000)
            .with_hybrid(HybridConfig::default().with_max_patterns(12).with_grid_step(200));
        let mut cache = ZonePackCache::new(64);
        let outcome = HybridSearch::new(&config, &mut cache)
            .best_layout(&board, &parts, 0)
            .unwrap();
        assert!(outcome.layout.placed_area() >= outcome.baseline_area);
        assert!(outcome.patterns_tried <= 12);
        let layout = outcome.layout;
        let sheet = SheetResult::with_layout(0, board, layout.placements, layout.cuts).unwrap();
        assert!(sheet.metrics.is_some());
    }
}
