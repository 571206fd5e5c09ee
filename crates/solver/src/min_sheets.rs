//! Minimum sheet count search.
//!
//! Starts from the area lower bound `ceil(total part area / usable area)`
//! and raises the sheet cap one at a time until a run places every part. The
//! bound assumes perfect packing, so it is only a starting point.

use crate::driver::{Driver, ShelfStrategy};
use crate::shelf::ShelfPacker;
use std::time::Duration;
use u_panelcut_core::part::total_area;
use u_panelcut_core::{Board, PartInstance, Result, Solution, SolverConfig};

/// Area-based lower bound on the number of sheets (at least one).
pub fn sheet_lower_bound(board: &Board, parts: &[PartInstance]) -> usize {
    let usable = board.usable_area();
    let total = total_area(parts);
    let bound = (total + usable - 1) / usable;
    (bound as usize).max(1)
}

/// Increasing-cap search over the shelf driver.
#[derive(Debug, Clone)]
pub struct MinSheetsSearch {
    packer: ShelfPacker,
    time_per_sheet: Duration,
    search_max_sheets: usize,
}

impl MinSheetsSearch {
    pub fn from_config(config: &SolverConfig) -> Self {
        Self {
            packer: ShelfPacker::from_config(config),
            time_per_sheet: config.time_limit(),
            search_max_sheets: config.search_max_sheets.max(1),
        }
    }

    fn run(&self, board: &Board, parts: &[PartInstance], cap: usize) -> Result<Solution> {
        let mut strategy = ShelfStrategy::new(self.packer.clone(), self.time_per_sheet);
        Driver::new(cap).run(board, parts.to_vec(), &mut strategy)
    }

    /// First cap that places everything, or the best partial attempt.
    pub fn solve(&self, board: &Board, parts: &[PartInstance]) -> Result<Solution> {
        let lower = sheet_lower_bound(board, parts);
        log::info!(
            "min-sheets: lower bound {} sheets, trying up to {}",
            lower,
            self.search_max_sheets
        );

        let mut best: Option<Solution> = None;
        for cap in lower.min(self.search_max_sheets)..=self.search_max_sheets {
            let solution = self.run(board, parts, cap)?;
            if solution.all_placed() {
                log::info!("min-sheets: all {} parts placed with cap {}", parts.len(), cap);
                return Ok(solution.with_strategy("min-sheets"));
            }
            log::debug!(
                "min-sheets: cap {} placed {}/{}",
                cap,
                solution.placed_count(),
                parts.len()
            );
            let better = best.as_ref().map_or(true, |b| {
                solution.placed_count() > b.placed_count()
                    || (solution.placed_count() == b.placed_count()
                        && solution.sheet_count() < b.sheet_count())
            });
            if better {
                best = Some(solution);
            }
        }

        log::warn!(
            "min-sheets: could not place every part within {} sheets",
            self.search_max_sheets
        );
        let solution = match best {
            Some(s) => s,
            None => self.run(board, parts, self.search_max_sheets)?,
        };
        Ok(solution.with_strategy("min-sheets"))
    }
}
