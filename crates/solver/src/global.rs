//! Multi-ordering shelf packer.
//!
//! Runs the sheet-by-sheet shelf packer once per part ordering and keeps the
//! run with the fewest unplaced parts, then the fewest sheets. Earlier
//! orderings win ties.

use crate::driver::{Driver, ShelfStrategy};
use crate::shelf::ShelfPacker;
use std::cmp::Ordering;
use std::time::Duration;
use u_panelcut_core::{Board, PartInstance, Result, Solution, SolverConfig};

/// Ranking of a run: fewer sheets only counts among runs leaving as many parts
/// unplaced, so a cap-limited run never wins by dropping parts.
fn selection_key(solution: &Solution) -> (usize, usize) {
    (solution.unplaced.len(), solution.sheet_count())
}

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Part ordering heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PartOrder {
    AreaDesc,
    MaxDimDesc,
    WidthThenHeight,
    HeightThenWidth,
}

impl PartOrder {
    pub const ALL: [PartOrder; 4] = [
        PartOrder::AreaDesc,
        PartOrder::MaxDimDesc,
        PartOrder::WidthThenHeight,
        PartOrder::HeightThenWidth,
    ];

    /// Decreasing order by this heuristic, ties broken by id.
    pub fn compare(&self, a: &PartInstance, b: &PartInstance) -> Ordering {
        let primary = match self {
            Self::AreaDesc => b.area().cmp(&a.area()),
            Self::MaxDimDesc => b.max_dim().cmp(&a.max_dim()),
            Self::WidthThenHeight => b.w.cmp(&a.w).then(b.h.cmp(&a.h)),
            Self::HeightThenWidth => b.h.cmp(&a.h).then(b.w.cmp(&a.w)),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }

    pub fn sorted(&self, parts: &[PartInstance]) -> Vec<PartInstance> {
        let mut out = parts.to_vec();
        out.sort_by(|a, b| self.compare(a, b));
        out
    }
}

/// Shelf packer over several orderings.
#[derive(Debug, Clone)]
pub struct GlobalPacker {
    packer: ShelfPacker,
    time_per_sheet: Duration,
    max_sheets: usize,
    orders: Vec<PartOrder>,
}

impl GlobalPacker {
    /// Each ordering gets an equal share of the per-sheet budget.
    pub fn from_config(config: &SolverConfig) -> Self {
        let orders = PartOrder::ALL.to_vec();
        let share = config.time_limit() / orders.len() as u32;
        Self {
            packer: ShelfPacker::from_config(config).with_preserve_order(true),
            time_per_sheet: share.max(Duration::from_millis(50)),
            max_sheets: config.max_sheets,
            orders,
        }
    }

    pub fn with_orders(mut self, orders: Vec<PartOrder>) -> Self {
        self.orders = orders;
        self
    }

    /// Runs every ordering and returns the best solution.
    pub fn solve(&self, board: &Board, parts: &[PartInstance]) -> Result<Solution> {
        let mut best: Option<Solution> = None;
        for order in &self.orders {
            let mut strategy = ShelfStrategy::new(self.packer.clone(), self.time_per_sheet);
            let solution =
                Driver::new(self.max_sheets).run(board, order.sorted(parts), &mut strategy)?;
            log::debug!(
                "global order {:?}: {} sheets, {} unplaced",
                order,
                solution.sheet_count(),
                solution.unplaced.len()
            );
            let better = best
                .as_ref()
                .map_or(true, |b| selection_key(&solution) < selection_key(b));
            if better {
                best = Some(solution);
            }
        }
        let solution = match best {
            Some(s) => s,
            None => Solution::new(board.clone(), parts.len()),
        };
        Ok(solution.with_strategy("global"))
    }
}
