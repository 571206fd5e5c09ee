//! Single-sheet shelf packer.
//!
//! Parts are grouped into horizontal shelves stacked from the bottom of a
//! region. Each candidate is either unused or assigned to exactly one shelf,
//! optionally turned when its rotation flag allows it and `w != h`. A shelf is
//! as tall as its tallest part. Inside a shelf every part reserves `w + kerf`
//! and the sum must stay within `width + kerf`; between two consecutive used
//! shelves a kerf gap is charged. Used shelves occupy the lowest slots.
//!
//! The objective maximised is
//!
//! ```text
//! placed_area
//!   - cut_weight   * ((used_shelves - 1) * width + Σ (parts_in_shelf - 1) * shelf_height)
//!   - shelf_weight * used_shelves
//! ```
//!
//! The model is solved by a [`ShelfBackend`]: the built-in [`ShelfSearch`]
//! branch and bound, or the MILP backend behind the `milp` feature.

pub mod milp;
pub mod search;

pub use milp::{is_milp_available, MilpShelfBackend};
pub use search::ShelfSearch;

use std::time::{Duration, Instant};
use u_panelcut_core::{
    shelf_cuts, CutSegment, Error, Mm, ObjectiveWeights, PackStats, PartInstance, Placement,
    Result, ShelfBackendKind, SolutionStatus, SolverConfig,
};

/// One shelf packing instance.
#[derive(Debug, Clone)]
pub struct ShelfProblem<'a> {
    pub width: Mm,
    pub height: Mm,
    pub kerf: Mm,
    pub parts: &'a [PartInstance],
    /// Shelf slots available; never more than one per part is useful.
    pub max_shelves: usize,
    pub weights: ObjectiveWeights,
}

impl<'a> ShelfProblem<'a> {
    /// Problem with one shelf slot per candidate part.
    pub fn new(width: Mm, height: Mm, kerf: Mm, parts: &'a [PartInstance]) -> Self {
        Self {
            width,
            height,
            kerf,
            parts,
            max_shelves: parts.len(),
            weights: ObjectiveWeights::default(),
        }
    }

    /// Caps the shelf slots; `None` keeps one slot per part.
    pub fn with_max_shelves(mut self, max_shelves: Option<usize>) -> Self {
        self.max_shelves = max_shelves
            .unwrap_or(self.parts.len())
            .min(self.parts.len());
        self
    }

    pub fn with_weights(mut self, weights: ObjectiveWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Allowed `(w, h, rotated)` footprints of part `i` that fit the region.
    pub fn orientations(&self, i: usize) -> Vec<(Mm, Mm, bool)> {
        self.parts[i]
            .orientations()
            .into_iter()
            .filter(|&(w, h, _)| w <= self.width && h <= self.height)
            .collect()
    }
}

/// Shelf slot and orientation of one part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub shelf: usize,
    pub rotated: bool,
}

/// Per-part decision, indexed like `ShelfProblem::parts`.
pub type ShelfAssignment = Vec<Option<Slot>>;

/// Result of a backend run.
#[derive(Debug, Clone)]
pub struct ShelfOutcome {
    pub assignment: ShelfAssignment,
    pub stats: PackStats,
}

/// Pluggable solver for the shelf model.
pub trait ShelfBackend {
    /// Backend name for logs and reports.
    fn name(&self) -> &'static str;

    /// Solves `problem`, returning the best assignment found by `deadline`.
    fn solve(&self, problem: &ShelfProblem<'_>, deadline: Instant) -> Result<ShelfOutcome>;
}

fn effective_dims(part: &PartInstance, rotated: bool) -> (Mm, Mm) {
    if rotated {
        (part.h, part.w)
    } else {
        (part.w, part.h)
    }
}

/// Shelf heights and part counts of an assignment, in slot order.
fn shelf_profile(problem: &ShelfProblem<'_>, assignment: &ShelfAssignment) -> Vec<(Mm, usize)> {
    let slots = assignment
        .iter()
        .flatten()
        .map(|s| s.shelf + 1)
        .max()
        .unwrap_or(0);
    let mut profile = vec![(0, 0); slots];
    for (i, slot) in assignment.iter().enumerate() {
        if let Some(slot) = slot {
            let (_, h) = effective_dims(&problem.parts[i], slot.rotated);
            let entry = &mut profile[slot.shelf];
            entry.0 = entry.0.max(h);
            entry.1 += 1;
        }
    }
    profile
}

/// Approximate internal cut length used by the objective.
pub fn approx_cut_length(width: Mm, shelves: &[(Mm, usize)]) -> Mm {
    let used: Vec<_> = shelves.iter().filter(|(_, count)| *count > 0).collect();
    if used.is_empty() {
        return 0;
    }
    let horizontal = (used.len() as Mm - 1) * width;
    let vertical: Mm = used.iter().map(|(h, c)| (*c as Mm - 1) * h).sum();
    horizontal + vertical
}

/// Objective value of an assignment.
pub fn objective(problem: &ShelfProblem<'_>, assignment: &ShelfAssignment) -> f64 {
    let area: Mm = assignment
        .iter()
        .zip(problem.parts)
        .filter(|(slot, _)| slot.is_some())
        .map(|(_, p)| p.area())
        .sum();
    let profile = shelf_profile(problem, assignment);
    let used = profile.iter().filter(|(_, c)| *c > 0).count();
    area as f64
        - problem.weights.cut_weight * approx_cut_length(problem.width, &profile) as f64
        - problem.weights.shelf_weight * used as f64
}

/// Turns an assignment into placements and the list of unselected parts.
///
/// Empty slots are skipped, so the used shelves are stacked contiguously from
/// `y = 0`. Fails if the assignment breaks the width or height capacity.
pub fn decode(
    problem: &ShelfProblem<'_>,
    assignment: &ShelfAssignment,
    sheet_index: usize,
) -> Result<(Vec<Placement>, Vec<PartInstance>)> {
    let profile = shelf_profile(problem, assignment);
    let k = problem.kerf;

    let mut shelf_y = vec![0; profile.len()];
    let mut y = 0;
    let mut first = true;
    for (s, &(h, count)) in profile.iter().enumerate() {
        if count == 0 {
            continue;
        }
        if !first {
            y += k;
        }
        first = false;
        shelf_y[s] = y;
        y += h;
    }
    if y > problem.height {
        return Err(Error::InvariantViolation(format!(
            "shelves need height {} but region is {}",
            y, problem.height
        )));
    }

    let mut shelf_x = vec![0; profile.len()];
    let mut placements = Vec::new();
    let mut remaining = Vec::new();
    for (i, part) in problem.parts.iter().enumerate() {
        match assignment[i] {
            Some(slot) => {
                let (w, h) = effective_dims(part, slot.rotated);
                if slot.rotated && !part.can_rotate {
                    return Err(Error::InvariantViolation(format!(
                        "{} rotated but rotation is not allowed",
                        part.id
                    )));
                }
                let x = shelf_x[slot.shelf];
                placements.push(Placement::new(
                    sheet_index,
                    part.id.clone(),
                    x,
                    shelf_y[slot.shelf],
                    w,
                    h,
                    slot.rotated,
                ));
                shelf_x[slot.shelf] = x + w + k;
            }
            None => remaining.push(part.clone()),
        }
    }
    if let Some(s) = shelf_x.iter().position(|&used| used > problem.width + k) {
        return Err(Error::InvariantViolation(format!(
            "shelf {} needs width {} but region is {}",
            s,
            shelf_x[s] - k,
            problem.width
        )));
    }

    Ok((placements, remaining))
}

/// Placements, leftovers and statistics of one shelf pack.
#[derive(Debug, Clone)]
pub struct ShelfPack {
    pub placements: Vec<Placement>,
    pub remaining: Vec<PartInstance>,
    pub stats: PackStats,
}

impl ShelfPack {
    /// Reconstructs the guillotine cuts of the layout.
    pub fn cuts(&self, width: Mm, sheet_index: usize) -> Result<Vec<CutSegment>> {
        shelf_cuts(&self.placements, width, sheet_index)
    }

    pub fn placed_area(&self) -> Mm {
        self.placements.iter().map(Placement::area).sum()
    }
}

/// Shelf packer bound to a backend and objective.
#[derive(Debug, Clone)]
pub struct ShelfPacker {
    pub kerf: Mm,
    pub weights: ObjectiveWeights,
    pub max_shelves: Option<usize>,
    pub backend: ShelfBackendKind,
    pub node_limit: Option<u64>,
    /// Keep the caller's part order as the branching order.
    pub preserve_order: bool,
}

impl ShelfPacker {
    pub fn new(kerf: Mm) -> Self {
        Self {
            kerf,
            weights: ObjectiveWeights::default(),
            max_shelves: None,
            backend: ShelfBackendKind::default(),
            node_limit: None,
            preserve_order: false,
        }
    }

    /// Packer configured like `config`.
    pub fn from_config(config: &SolverConfig) -> Self {
        Self {
            kerf: config.kerf,
            weights: config.weights,
            max_shelves: config.max_shelves,
            backend: config.backend,
            node_limit: config.node_limit,
            preserve_order: false,
        }
    }

    pub fn with_max_shelves(mut self, max_shelves: Option<usize>) -> Self {
        self.max_shelves = max_shelves;
        self
    }

    pub fn with_weights(mut self, weights: ObjectiveWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_node_limit(mut self, node_limit: Option<u64>) -> Self {
        self.node_limit = node_limit;
        self
    }

    pub fn with_preserve_order(mut self, preserve_order: bool) -> Self {
        self.preserve_order = preserve_order;
        self
    }

    fn search(&self) -> ShelfSearch {
        ShelfSearch::new()
            .with_node_limit(self.node_limit)
            .with_input_order(self.preserve_order)
    }

    /// Packs `parts` into a `width` x `height` region within `time_limit`.
    ///
    /// Placing nothing is a valid outcome (every part too large, or no
    /// layout found in time); all parts are then returned as remaining.
    pub fn pack(
        &self,
        width: Mm,
        height: Mm,
        parts: &[PartInstance],
        time_limit: Duration,
    ) -> Result<ShelfPack> {
        let start = Instant::now();
        let deadline = start + time_limit;
        let problem = ShelfProblem::new(width, height, self.kerf, parts)
            .with_max_shelves(self.max_shelves)
            .with_weights(self.weights);

        if parts.is_empty() || (0..parts.len()).all(|i| problem.orientations(i).is_empty()) {
            return Ok(ShelfPack {
                placements: Vec::new(),
                remaining: parts.to_vec(),
                stats: PackStats::infeasible(),
            });
        }

        let outcome = match self.backend {
            ShelfBackendKind::Search => self.search().solve(&problem, deadline)?,
            ShelfBackendKind::Milp => self.solve_milp(&problem, deadline)?,
        };

        let (placements, remaining) = decode(&problem, &outcome.assignment, 0)?;
        let stats = outcome
            .stats
            .with_elapsed(start.elapsed().as_millis() as u64);
        log::debug!(
            "shelf pack {}x{}: {}/{} parts placed, status {}",
            width,
            height,
            placements.len(),
            parts.len(),
            stats.status
        );
        Ok(ShelfPack {
            placements,
            remaining,
            stats,
        })
    }

    fn solve_milp(&self, problem: &ShelfProblem<'_>, deadline: Instant) -> Result<ShelfOutcome> {
        let milp = MilpShelfBackend::new();
        match milp.solve(problem, deadline) {
            Ok(outcome) if decode(problem, &outcome.assignment, 0).is_ok() => Ok(outcome),
            Ok(_) => {
                log::warn!("MILP assignment failed the capacity check, using shelf search");
                self.fallback(problem, deadline)
            }
            Err(e) => {
                log::warn!("{}, using shelf search", e);
                self.fallback(problem, deadline)
            }
        }
    }

    fn fallback(&self, problem: &ShelfProblem<'_>, deadline: Instant) -> Result<ShelfOutcome> {
        // At least 50 ms, even past the deadline.
        let deadline = deadline.max(Instant::now() + Duration::from_millis(50));
        let mut outcome = self.search().solve(problem, deadline)?;
        if outcome.stats.status == SolutionStatus::Optimal {
            outcome.stats.status = SolutionStatus::Feasible;
        }
        outcome.stats.message = format!("fallback: {}", outcome.stats.message);
        Ok(outcome)
    }
}

/// Packs one sheet with the default branch and bound backend.
///
/// Returns the placements (tagged with sheet 0) and the candidates that were
/// not selected.
pub fn solve_single_sheet(
    width: Mm,
    height: Mm,
    kerf: Mm,
    parts: &[PartInstance],
    time_limit: Duration,
    weights: ObjectiveWeights,
) -> Result<(Vec<Placement>, Vec<PartInstance>)> {
    let pack = ShelfPacker::new(kerf)
        .with_weights(weights)
        .pack(width, height, parts, time_limit)?;
    Ok((pack.placements, pack.remaining))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(id: &str, w: Mm, h: Mm, rot: bool) -> PartInstance {
        PartInstance::new(id, w, h, rot)
    }

    #[test]
    fn test_decode_stacks_shelves_with_kerf() {
        let parts = vec![
            part("a#1", 500, 400, false),
            part("b#1", 300, 200, false),
            part("c#1", 700, 300, false),
        ];
        let problem = ShelfProblem::new(1000, 1000, 3, &parts);
        let assignment = vec![
            Some(Slot { shelf: 0, rotated: false }),
            Some(Slot { shelf: 0, rotated: false }),
            Some(Slot { shelf: 2, rotated: false }),
        ];
        let (placements, remaining) = decode(&problem, &assignment, 0).unwrap();
        assert!(remaining.is_empty());
        assert_eq!((placements[0].x, placements[0].y), (0, 0));
        assert_eq!((placements[1].x, placements[1].y), (503, 0));
        // Slot 1 is empty, so slot 2 sits right above slot 0.
        assert_eq!((placements[2].x, placements[2].y), (0, 403));
    }

    #[test]
    fn test_decode_rejects_overfull_shelf() {
        let parts = vec![part("a#1", 600, 100, false), part("b#1", 400, 100, false)];
        let problem = ShelfProblem::new(1000, 1000, 3, &parts);
        let both = vec![Some(Slot { shelf: 0, rotated: false }); 2];
        assert!(decode(&problem, &both, 0).is_err());

        // Exactly W + kerf is allowed without kerf.
        let problem = ShelfProblem::new(1000, 1000, 0, &parts);
        assert!(decode(&problem, &both, 0).is_ok());
    }

    #[test]
    fn test_objective_penalises_cuts() {
        let parts = vec![part("a#1", 100, 100, false), part("b#1", 100, 50, false)];
        let problem = ShelfProblem::new(1000, 1000, 0, &parts)
            .with_weights(ObjectiveWeights::new(1.0, 10.0));
        let same_shelf = vec![
            Some(Slot { shelf: 0, rotated: false }),
            Some(Slot { shelf: 0, rotated: false }),
        ];
        // area 15000, one vertical cut of shelf height 100, one shelf.
        assert_eq!(objective(&problem, &same_shelf), 15000.0 - 100.0 - 10.0);

        let stacked = vec![
            Some(Slot { shelf: 0, rotated: false }),
            Some(Slot { shelf: 1, rotated: false }),
        ];
        assert_eq!(objective(&problem, &stacked), 15000.0 - 1000.0 - 20.0);
    }

    #[test]
    fn test_approx_cut_length_ignores_empty_slots() {
        assert_eq!(approx_cut_length(1000, &[]), 0);
        assert_eq!(approx_cut_length(1000, &[(100, 3), (0, 0), (50, 1)]), 1000 + 200);
    }

    #[test]
    fn test_pack_nothing_fits() {
        let parts = vec![part("big#1", 900, 1300, false)];
        let pack = ShelfPacker::new(3)
            .pack(2000, 1200, &parts, Duration::from_millis(200))
            .unwrap();
        assert!(pack.placements.is_empty());
        assert_eq!(pack.remaining, parts);
        assert_eq!(pack.stats.status, SolutionStatus::Infeasible);
    }

    #[test]
    fn test_solve_single_sheet() {
        let parts = vec![part("a#1", 400, 300, true), part("b#1", 400, 300, true)];
        let (placements, remaining) = solve_single_sheet(
            1000,
            500,
            3,
            &parts,
            Duration::from_secs(1),
            ObjectiveWeights::default(),
        )
        .unwrap();
        assert_eq!(placements.len(), 2);
        assert!(remaining.is_empty());
    }
}
