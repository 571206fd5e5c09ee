//! Top-level planner dispatching on [`Strategy`].

use crate::bottom_left::BottomLeftPacker;
use crate::driver::{Driver, ShelfStrategy};
use crate::global::GlobalPacker;
use crate::hybrid::HybridSearch;
use crate::min_sheets::MinSheetsSearch;
use crate::shelf::ShelfPacker;
use crate::zone_cache::ZonePackCache;
use std::time::Instant;
use u_panelcut_core::{
    expand_parts, raise_on_errors, validate_solution, Board, PartRequest, ProgressCallback,
    ProgressInfo, Result, Solution, Solver, SolverConfig, Strategy,
};

/// Multi-sheet cutting planner.
#[derive(Debug, Clone, Default)]
pub struct Planner {
    config: SolverConfig,
}

impl Planner {
    /// Creates a planner with the given configuration.
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solves with a caller-owned zone cache, reused across calls.
    ///
    /// Only the hybrid strategy uses the cache.
    pub fn solve_with_cache(
        &self,
        board: &Board,
        parts: &[PartRequest],
        cache: &mut ZonePackCache,
    ) -> Result<Solution> {
        self.plan(board, parts, None, cache)
    }

    fn plan(
        &self,
        board: &Board,
        parts: &[PartRequest],
        progress: Option<&ProgressCallback>,
        cache: &mut ZonePackCache,
    ) -> Result<Solution> {
        self.config.validate()?;
        let start = Instant::now();
        let instances = expand_parts(parts);
        let config = &self.config;
        log::info!(
            "planning {} parts on {}x{} usable, strategy {}, kerf {}",
            instances.len(),
            board.usable_w(),
            board.usable_h(),
            config.strategy,
            config.kerf
        );

        let mut driver = Driver::new(config.max_sheets);
        if let Some(callback) = progress {
            driver = driver.with_progress(callback);
        }

        let mut solution = match config.strategy {
            Strategy::Shelf => {
                let mut strategy = ShelfStrategy::new(ShelfPacker::from_config(config), config.time_limit());
                driver.run(board, instances, &mut strategy)?
            }
            Strategy::Hybrid => {
                let mut search = HybridSearch::new(config, cache);
                driver.run(board, instances, &mut search)?
            }
            Strategy::BottomLeft => {
                let mut packer = BottomLeftPacker::new(config.kerf);
                driver.run(board, instances, &mut packer)?
            }
            Strategy::Global => GlobalPacker::from_config(config).solve(board, &instances)?,
            Strategy::MinSheets => MinSheetsSearch::from_config(config).solve(board, &instances)?,
        };

        solution.computation_time_ms = start.elapsed().as_millis() as u64;
        if matches!(config.strategy, Strategy::Global | Strategy::MinSheets) {
            if let Some(callback) = progress {
                callback(
                    ProgressInfo::new()
                        .with_sheets(solution.sheet_count())
                        .with_items(solution.placed_count(), solution.total_parts)
                        .with_elapsed(solution.computation_time_ms)
                        .with_phase("done")
                        .finished(),
                );
            }
        }

        raise_on_errors(&validate_solution(&solution))?;
        log::info!(
            "{} sheets, {}/{} parts placed in {} ms",
            solution.sheet_count(),
            solution.placed_count(),
            solution.total_parts,
            solution.computation_time_ms
        );
        Ok(solution)
    }
}

impl Solver for Planner {
    fn solve(&self, board: &Board, parts: &[PartRequest]) -> Result<Solution> {
        let mut cache = ZonePackCache::new(self.config.hybrid.cache_capacity);
        self.plan(board, parts, None, &mut cache)
    }

    fn solve_with_progress(
        &self,
        board: &Board,
        parts: &[PartRequest],
        callback: ProgressCallback,
    ) -> Result<Solution> {
        let mut cache = ZonePackCache::new(self.config.hybrid.cache_capacity);
        self.plan(board, parts, Some(&callback), &mut cache)
    }
}
