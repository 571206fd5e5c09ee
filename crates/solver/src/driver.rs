//! Multi-sheet driver.
//!
//! Repeatedly hands the remaining pool to a [`SheetStrategy`] on a fresh
//! sheet until the pool is empty, the sheet cap is reached, or a sheet comes
//! back empty. Parts left over are reported in [`Solution::unplaced`]; they
//! are never an error.

use crate::shelf::ShelfPacker;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use u_panelcut_core::{
    expand_parts, Board, CutSegment, Error, Mm, ObjectiveWeights, PartInstance, PartRequest,
    Placement, ProgressCallback, ProgressInfo, Result, SheetResult, Solution,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Layout of one sheet as produced by a strategy.
#[derive(Debug, Clone, Default)]
pub struct SheetLayout {
    pub placements: Vec<Placement>,
    pub cuts: Vec<CutSegment>,
    /// Candidates that were not placed, in input order.
    pub remaining: Vec<PartInstance>,
}

impl SheetLayout {
    /// Layout that places nothing.
    pub fn empty(parts: &[PartInstance]) -> Self {
        Self {
            placements: Vec::new(),
            cuts: Vec::new(),
            remaining: parts.to_vec(),
        }
    }

    pub fn placed_area(&self) -> Mm {
        self.placements.iter().map(Placement::area).sum()
    }
}

/// Packs one sheet from a pool of candidates.
pub trait SheetStrategy {
    /// Name stored on the resulting solution.
    fn name(&self) -> &'static str;

    /// Packs as much of `parts` as possible into the usable area of `board`.
    fn pack_sheet(
        &mut self,
        board: &Board,
        parts: &[PartInstance],
        sheet_index: usize,
    ) -> Result<SheetLayout>;
}

/// Why a driver run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StopReason {
    AllPlaced,
    /// A sheet came back empty; the rest cannot be packed.
    NoProgress,
    SheetCap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriverState {
    Packing,
    Done(StopReason),
}

/// Sheet-by-sheet iteration over a strategy.
pub struct Driver<'a> {
    max_sheets: usize,
    progress: Option<&'a ProgressCallback>,
}

impl<'a> Driver<'a> {
    pub fn new(max_sheets: usize) -> Self {
        Self {
            max_sheets,
            progress: None,
        }
    }

    /// Reports progress after every finished sheet.
    pub fn with_progress(mut self, callback: &'a ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Runs `strategy` until the pool is exhausted or the run stalls.
    pub fn run<S: SheetStrategy + ?Sized>(
        &self,
        board: &Board,
        parts: Vec<PartInstance>,
        strategy: &mut S,
    ) -> Result<Solution> {
        let start = Instant::now();
        let total = parts.len();
        let mut solution = Solution::new(board.clone(), total).with_strategy(strategy.name());
        let mut remaining = parts;
        let mut state = DriverState::Packing;

        while state == DriverState::Packing {
            state = if remaining.is_empty() {
                DriverState::Done(StopReason::AllPlaced)
            } else if solution.sheets.len() >= self.max_sheets {
                DriverState::Done(StopReason::SheetCap)
            } else {
                let sheet_index = solution.sheets.len();
                let layout = strategy.pack_sheet(board, &remaining, sheet_index)?;
                if layout.placements.is_empty() {
                    DriverState::Done(StopReason::NoProgress)
                } else {
                    check_partition(&remaining, &layout)?;
                    let placements = layout
                        .placements
                        .into_iter()
                        .map(|p| p.on_sheet(sheet_index))
                        .collect();
                    let cuts = layout
                        .cuts
                        .into_iter()
                        .map(|c| c.on_sheet(sheet_index))
                        .collect();
                    let sheet = SheetResult::with_layout(sheet_index, board.clone(), placements, cuts)?;
                    log::info!(
                        "sheet {}: {} parts placed, utilization {:.1}%, {} remaining",
                        sheet_index,
                        sheet.placements.len(),
                        sheet.utilization() * 100.0,
                        layout.remaining.len()
                    );
                    solution.sheets.push(sheet);
                    remaining = layout.remaining;
                    self.report(&solution, total, start, "packing");
                    DriverState::Packing
                }
            };
        }

        if let DriverState::Done(reason) = state {
            log::debug!("driver stopped: {:?}", reason);
        }
        solution.unplaced = remaining.into_iter().map(|p| p.id).collect();
        solution.computation_time_ms = start.elapsed().as_millis() as u64;
        if let Some(message) = solution.unplaced_message() {
            log::warn!("{}", message);
        }
        self.report(&solution, total, start, "done");
        Ok(solution)
    }

    fn report(&self, solution: &Solution, total: usize, start: Instant, phase: &str) {
        if let Some(callback) = self.progress {
            let mut info = ProgressInfo::new()
                .with_sheets(solution.sheet_count())
                .with_items(solution.placed_count(), total)
                .with_elapsed(start.elapsed().as_millis() as u64)
                .with_phase(phase);
            if phase == "done" {
                info = info.finished();
            }
            callback(info);
        }
    }
}

/// Placed ids and remaining ids must split the pool exactly.
fn check_partition(pool: &[PartInstance], layout: &SheetLayout) -> Result<()> {
    let pool_ids: HashSet<&str> = pool.iter().map(|p| p.id.as_str()).collect();
    let mut seen = HashSet::new();
    let ids = layout
        .placements
        .iter()
        .map(|p| p.part_id.as_str())
        .chain(layout.remaining.iter().map(|p| p.id.as_str()));
    for id in ids {
        if !pool_ids.contains(id) || !seen.insert(id) {
            return Err(Error::InvariantViolation(format!(
                "strategy returned unknown or duplicate part {}",
                id
            )));
        }
    }
    if seen.len() != pool_ids.len() {
        return Err(Error::InvariantViolation(format!(
            "strategy lost {} parts",
            pool_ids.len() - seen.len()
        )));
    }
    Ok(())
}

/// Full-sheet shelf packing as a sheet strategy.
#[derive(Debug, Clone)]
pub struct ShelfStrategy {
    packer: ShelfPacker,
    time_limit: Duration,
}

impl ShelfStrategy {
    pub fn new(packer: ShelfPacker, time_limit: Duration) -> Self {
        Self { packer, time_limit }
    }
}

impl SheetStrategy for ShelfStrategy {
    fn name(&self) -> &'static str {
        "shelf"
    }

    fn pack_sheet(
        &mut self,
        board: &Board,
        parts: &[PartInstance],
        sheet_index: usize,
    ) -> Result<SheetLayout> {
        let width = board.usable_w();
        let pack = self
            .packer
            .pack(width, board.usable_h(), parts, self.time_limit)?;
        let cuts = pack.cuts(width, sheet_index)?;
        Ok(SheetLayout {
            placements: pack.placements,
            cuts,
            remaining: pack.remaining,
        })
    }
}

/// Plans every sheet with the shelf packer.
///
/// Expands `requests` into instances and drives [`ShelfStrategy`] with
/// `time_per_sheet` per sheet, up to `max_sheets` sheets.
pub fn solve_all_sheets(
    board: &Board,
    requests: &[PartRequest],
    kerf: Mm,
    time_per_sheet: Duration,
    max_sheets: usize,
    weights: ObjectiveWeights,
) -> Result<Solution> {
    if max_sheets == 0 {
        return Err(Error::InvalidConfig("max_sheets must be at least 1".into()));
    }
    if kerf < 0 {
        return Err(Error::InvalidConfig("kerf must be non-negative".into()));
    }
    let packer = ShelfPacker::new(kerf).with_weights(weights);
    let mut strategy = ShelfStrategy::new(packer, time_per_sheet);
    Driver::new(max_sheets).run(board, expand_parts(requests), &mut strategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Places the first part of the pool at the origin.
    struct OnePerSheet;

    impl SheetStrategy for OnePerSheet {
        fn name(&self) -> &'static str {
            "one"
        }

        fn pack_sheet(
            &mut self,
            _board: &Board,
            parts: &[PartInstance],
            sheet_index: usize,
        ) -> Result<SheetLayout> {
            let first = &parts[0];
            Ok(SheetLayout {
                placements: vec![Placement::new(
                    sheet_index,
                    first.id.clone(),
                    0,
                    0,
                    first.w,
                    first.h,
                    false,
                )],
                cuts: Vec::new(),
                remaining: parts[1..].to_vec(),
            })
        }
    }

    struct Nothing;

    impl SheetStrategy for Nothing {
        fn name(&self) -> &'static str {
            "nothing"
        }

        fn pack_sheet(&mut self, _: &Board, parts: &[PartInstance], _: usize) -> Result<SheetLayout> {
            Ok(SheetLayout::empty(parts))
        }
    }

    struct Loses;

    impl SheetStrategy for Loses {
        fn name(&self) -> &'static str {
            "loses"
        }

        fn pack_sheet(&mut self, _: &Board, parts: &[PartInstance], i: usize) -> Result<SheetLayout> {
            let p = &parts[0];
            Ok(SheetLayout {
                placements: vec![Placement::new(i, p.id.clone(), 0, 0, p.w, p.h, false)],
                cuts: Vec::new(),
                remaining: Vec::new(),
            })
        }
    }

    fn parts(n: usize) -> Vec<PartInstance> {
        (1..=n)
            .map(|k| PartInstance::new(format!("p#{}", k), 100, 100, true))
            .collect()
    }

    #[test]
    fn test_driver_stops_at_sheet_cap() {
        let board = Board::usable(1000, 1000).unwrap();
        let solution = Driver::new(2).run(&board, parts(5), &mut OnePerSheet).unwrap();
        assert_eq!(solution.sheet_count(), 2);
        assert_eq!(solution.unplaced, vec!["p#3", "p#4", "p#5"]);
        assert_eq!(solution.unplaced_message().unwrap(), "3 of 5 parts unplaced");
        assert_eq!(solution.sheets[1].placements[0].sheet_index, 1);
        assert!(solution.sheets.iter().all(|s| s.metrics.is_some()));
    }

    #[test]
    fn test_driver_stops_without_progress() {
        let board = Board::usable(1000, 1000).unwrap();
        let solution = Driver::new(10).run(&board, parts(2), &mut Nothing).unwrap();
        assert_eq!(solution.sheet_count(), 0);
        assert_eq!(solution.unplaced.len(), 2);
    }

    #[test]
    fn test_driver_rejects_lost_parts() {
        let board = Board::usable(1000, 1000).unwrap();
        let err = Driver::new(10).run(&board, parts(2), &mut Loses).unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
    }

    #[test]
    fn test_progress_reports_every_sheet() {
        let board = Board::usable(1000, 1000).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: ProgressCallback = Box::new(move |info| {
            sink.lock().unwrap().push((info.sheets_done, info.running));
        });
        Driver::new(10)
            .with_progress(&callback)
            .run(&board, parts(3), &mut OnePerSheet)
            .unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![(1, true), (2, true), (3, true), (3, false)]);
    }

    #[test]
    fn test_solve_all_sheets_with_shelves() {
        let board = Board::usable(1000, 1000).unwrap();
        let requests = vec![PartRequest::new("panel", 600, 600, 3).unwrap()];
        let solution = solve_all_sheets(
            &board,
            &requests,
            3,
            Duration::from_millis(500),
            5,
            ObjectiveWeights::default(),
        )
        .unwrap();
        assert_eq!(solution.sheet_count(), 3);
        assert!(solution.all_placed());
        assert_eq!(solution.strategy.as_deref(), Some("shelf"));
    }

    #[test]
    fn test_solve_all_sheets_rejects_zero_cap() {
        let board = Board::usable(1000, 1000).unwrap();
        let err = solve_all_sheets(&board, &[], 3, Duration::from_secs(1), 0, ObjectiveWeights::default())
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
