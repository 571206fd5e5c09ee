//! Sheet and solution representation.

use crate::cut::CutSegment;
use crate::geometry::{Board, Mm};
use crate::metrics::{self, SheetMetrics};
use crate::placement::Placement;
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One consumed sheet with its layout, cuts and (once computed) metrics.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SheetResult {
    pub sheet_index: usize,
    pub board: Board,
    pub placements: Vec<Placement>,
    pub cuts: Vec<CutSegment>,
    pub metrics: Option<SheetMetrics>,
}

impl SheetResult {
    /// Creates an empty sheet.
    pub fn new(sheet_index: usize, board: Board) -> Self {
        Self {
            sheet_index,
            board,
            placements: Vec::new(),
            cuts: Vec::new(),
            metrics: None,
        }
    }

    /// Creates a sheet from a layout and computes its metrics.
    pub fn with_layout(
        sheet_index: usize,
        board: Board,
        placements: Vec<Placement>,
        cuts: Vec<CutSegment>,
    ) -> Result<Self> {
        let mut sheet = Self {
            sheet_index,
            board,
            placements,
            cuts,
            metrics: None,
        };
        metrics::compute_sheet_metrics(&mut sheet)?;
        Ok(sheet)
    }

    /// Recomputes and stores the metrics.
    pub fn compute_metrics(&mut self) -> Result<SheetMetrics> {
        metrics::compute_sheet_metrics(self)
    }

    /// Sum of placed part areas.
    pub fn placed_area(&self) -> Mm {
        self.placements.iter().map(Placement::area).sum()
    }

    /// Placed area over usable area (0.0 - 1.0).
    pub fn utilization(&self) -> f64 {
        self.placed_area() as f64 / self.board.usable_area() as f64
    }

    pub fn waste_area(&self) -> Option<Mm> {
        self.metrics.map(|m| m.waste_area)
    }

    pub fn internal_cut_length(&self) -> Option<Mm> {
        self.metrics.map(|m| m.internal_cut_length)
    }

    pub fn trim_cut_length(&self) -> Option<Mm> {
        self.metrics.map(|m| m.trim_cut_length)
    }

    pub fn total_cut_length(&self) -> Option<Mm> {
        self.metrics.map(|m| m.total_cut_length())
    }
}

/// Result of a multi-sheet solve.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Solution {
    pub board: Board,
    pub sheets: Vec<SheetResult>,
    /// Ids of instances left unplaced (infeasible or sheet cap reached).
    pub unplaced: Vec<String>,
    /// Number of instances the solve started with.
    pub total_parts: usize,
    /// Strategy used for solving.
    pub strategy: Option<String>,
    /// Computation time in milliseconds.
    pub computation_time_ms: u64,
}

impl Solution {
    /// Creates an empty solution for `total_parts` instances.
    pub fn new(board: Board, total_parts: usize) -> Self {
        Self {
            board,
            sheets: Vec::new(),
            unplaced: Vec::new(),
            total_parts,
            strategy: None,
            computation_time_ms: 0,
        }
    }

    /// Sets the strategy name.
    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn placed_count(&self) -> usize {
        self.sheets.iter().map(|s| s.placements.len()).sum()
    }

    /// Returns true if every instance was placed.
    pub fn all_placed(&self) -> bool {
        self.unplaced.is_empty()
    }

    /// Iterates over every placement of every sheet.
    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.sheets.iter().flat_map(|s| s.placements.iter())
    }

    /// Iterates over every cut of every sheet.
    pub fn cuts(&self) -> impl Iterator<Item = &CutSegment> {
        self.sheets.iter().flat_map(|s| s.cuts.iter())
    }

    /// User facing infeasibility report, `None` when everything was placed.
    pub fn unplaced_message(&self) -> Option<String> {
        if self.unplaced.is_empty() {
            None
        } else {
            Some(format!(
                "{} of {} parts unplaced",
                self.unplaced.len(),
                self.total_parts
            ))
        }
    }

    /// Totals across sheets. Fails if any sheet lacks metrics.
    pub fn totals(&self) -> Result<SheetMetrics> {
        let mut total = SheetMetrics::default();
        for sheet in &self.sheets {
            let m = sheet
                .metrics
                .ok_or(Error::MissingMetrics(sheet.sheet_index))?;
            total = total + m;
        }
        Ok(total)
    }

    pub fn total_waste_area(&self) -> Result<Mm> {
        self.totals().map(|t| t.waste_area)
    }

    pub fn total_internal_cut_length(&self) -> Result<Mm> {
        self.totals().map(|t| t.internal_cut_length)
    }

    pub fn total_trim_cut_length(&self) -> Result<Mm> {
        self.totals().map(|t| t.trim_cut_length)
    }

    pub fn total_cut_length(&self) -> Result<Mm> {
        self.totals().map(|t| t.total_cut_length())
    }

    /// Placed area over used sheet area (0.0 - 1.0).
    pub fn utilization(&self) -> f64 {
        if self.sheets.is_empty() {
            return 0.0;
        }
        let placed: Mm = self.sheets.iter().map(SheetResult::placed_area).sum();
        placed as f64 / (self.board.usable_area() * self.sheets.len() as Mm) as f64
    }

    /// Computes summary statistics.
    pub fn summary(&self) -> SolveSummary {
        SolveSummary::from(self)
    }
}

/// Summary statistics for a solution.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolveSummary {
    /// Total instances requested.
    pub total_requested: usize,
    /// Total instances placed.
    pub total_placed: usize,
    /// Number of sheets used.
    pub sheets_used: usize,
    /// Utilization percentage.
    pub utilization_percent: f64,
    /// Total waste area, when every sheet has metrics.
    pub waste_area: Option<Mm>,
    /// Total internal cut length, when every sheet has metrics.
    pub internal_cut_length: Option<Mm>,
    /// Total trim-charged cut length, when every sheet has metrics.
    pub trim_cut_length: Option<Mm>,
    /// Computation time in milliseconds.
    pub time_ms: u64,
    /// Strategy used.
    pub strategy: String,
}

impl From<&Solution> for SolveSummary {
    fn from(solution: &Solution) -> Self {
        let totals = solution.totals().ok();
        Self {
            total_requested: solution.total_parts,
            total_placed: solution.placed_count(),
            sheets_used: solution.sheet_count(),
            utilization_percent: solution.utilization() * 100.0,
            waste_area: totals.map(|t| t.waste_area),
            internal_cut_length: totals.map(|t| t.internal_cut_length),
            trim_cut_length: totals.map(|t| t.trim_cut_length),
            time_ms: solution.computation_time_ms,
            strategy: solution
                .strategy
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Trim;
    use approx::assert_relative_eq;

    fn board() -> Board {
        Board::new("t", 1000, 500, 18, Trim::none()).unwrap()
    }

    fn sheet(index: usize) -> SheetResult {
        SheetResult::with_layout(
            index,
            board(),
            vec![Placement::new(index, "a#1", 0, 0, 500, 500, false)],
            Vec::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_solution_new() {
        let solution = Solution::new(board(), 0);
        assert_eq!(solution.sheet_count(), 0);
        assert!(solution.all_placed());
        assert_eq!(solution.total_waste_area(), Ok(0));
        assert_eq!(solution.unplaced_message(), None);
    }

    #[test]
    fn test_totals_sum_sheets() {
        let mut solution = Solution::new(board(), 2);
        solution.sheets.push(sheet(0));
        solution.sheets.push(sheet(1));
        assert_eq!(solution.total_waste_area(), Ok(2 * 250_000));
        assert_eq!(solution.total_trim_cut_length(), Ok(2 * 1500));
        assert_relative_eq!(solution.utilization(), 0.5);
    }

    #[test]
    fn test_totals_require_metrics() {
        let mut solution = Solution::new(board(), 1);
        solution.sheets.push(SheetResult::new(0, board()));
        assert_eq!(solution.total_cut_length(), Err(Error::MissingMetrics(0)));
        assert_eq!(solution.summary().waste_area, None);
    }

    #[test]
    fn test_unplaced_message() {
        let mut solution = Solution::new(board(), 5);
        solution.unplaced = vec!["a#1".into(), "a#2".into()];
        assert_eq!(
            solution.unplaced_message().as_deref(),
            Some("2 of 5 parts unplaced")
        );
    }

    #[test]
    fn test_solve_summary() {
        let mut solution = Solution::new(board(), 1).with_strategy("shelf");
        solution.sheets.push(sheet(0));
        solution.computation_time_ms = 12;

        let summary = solution.summary();
        assert_eq!(summary.total_placed, 1);
        assert_eq!(summary.sheets_used, 1);
        assert_relative_eq!(summary.utilization_percent, 50.0);
        assert_eq!(summary.strategy, "shelf");
        assert_eq!(summary.waste_area, Some(250_000));
    }
}
