//! Cutting cost computation from sheet metrics.
//!
//! Prices are per millimetre of cut. Internal and trim-charged cuts can carry
//! separate rates; a per-sheet fee and a minimum billable length per sheet are
//! optional. The top-up to the minimum is charged at the base rate.

use crate::geometry::Mm;
use crate::result::{SheetResult, Solution};
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pricing of a cutting job.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PriceModel {
    /// Base price per mm of charged cut.
    pub price_per_mm: f64,
    /// Rate for internal cuts, base rate when `None`.
    pub price_per_mm_internal: Option<f64>,
    /// Rate for trim-charged cuts, base rate when `None`.
    pub price_per_mm_trim: Option<f64>,
    /// Fixed fee per used sheet.
    pub price_per_sheet: f64,
    /// Minimum billable cut length per sheet.
    pub min_billable_mm_per_sheet: Mm,
}

impl PriceModel {
    pub fn new(price_per_mm: f64) -> Self {
        Self {
            price_per_mm,
            price_per_mm_internal: None,
            price_per_mm_trim: None,
            price_per_sheet: 0.0,
            min_billable_mm_per_sheet: 0,
        }
    }

    pub fn with_internal_rate(mut self, rate: f64) -> Self {
        self.price_per_mm_internal = Some(rate);
        self
    }

    pub fn with_trim_rate(mut self, rate: f64) -> Self {
        self.price_per_mm_trim = Some(rate);
        self
    }

    pub fn with_sheet_fee(mut self, fee: f64) -> Self {
        self.price_per_sheet = fee;
        self
    }

    pub fn with_min_billable(mut self, mm: Mm) -> Self {
        self.min_billable_mm_per_sheet = mm;
        self
    }

    pub fn rate_internal(&self) -> f64 {
        self.price_per_mm_internal.unwrap_or(self.price_per_mm)
    }

    pub fn rate_trim(&self) -> f64 {
        self.price_per_mm_trim.unwrap_or(self.price_per_mm)
    }
}

/// Cost breakdown of one sheet.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SheetCost {
    pub sheet_index: usize,
    pub cut_internal_mm: Mm,
    pub cut_trim_mm: Mm,
    pub cut_total_mm: Mm,
    pub billable_mm: Mm,
    pub cost_cuts: f64,
    pub cost_sheet_fee: f64,
    pub cost_total: f64,
}

/// Cost breakdown of a solution.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolutionCost {
    pub sheets: Vec<SheetCost>,
    pub total_cut_internal_mm: Mm,
    pub total_cut_trim_mm: Mm,
    pub total_cut_mm: Mm,
    pub total_billable_mm: Mm,
    pub total_cost_cuts: f64,
    pub total_cost_sheet_fees: f64,
    pub total_cost: f64,
}

/// Prices one sheet. Fails if its metrics were never computed.
pub fn sheet_cost(sheet: &SheetResult, price: &PriceModel) -> Result<SheetCost> {
    let metrics = sheet
        .metrics
        .ok_or(Error::MissingMetrics(sheet.sheet_index))?;

    let internal = metrics.internal_cut_length;
    let trim = metrics.trim_cut_length;
    let total = internal + trim;
    let billable = total.max(price.min_billable_mm_per_sheet);

    let mut cost_cuts = internal as f64 * price.rate_internal() + trim as f64 * price.rate_trim();
    if billable > total {
        cost_cuts += (billable - total) as f64 * price.price_per_mm;
    }
    let cost_sheet_fee = price.price_per_sheet;

    Ok(SheetCost {
        sheet_index: sheet.sheet_index,
        cut_internal_mm: internal,
        cut_trim_mm: trim,
        cut_total_mm: total,
        billable_mm: billable,
        cost_cuts,
        cost_sheet_fee,
        cost_total: cost_cuts + cost_sheet_fee,
    })
}

/// Prices every sheet and sums the totals.
pub fn solution_cost(solution: &Solution, price: &PriceModel) -> Result<SolutionCost> {
    let mut out = SolutionCost::default();
    for sheet in &solution.sheets {
        let sc = sheet_cost(sheet, price)?;
        out.total_cut_internal_mm += sc.cut_internal_mm;
        out.total_cut_trim_mm += sc.cut_trim_mm;
        out.total_cut_mm += sc.cut_total_mm;
        out.total_billable_mm += sc.billable_mm;
        out.total_cost_cuts += sc.cost_cuts;
        out.total_cost_sheet_fees += sc.cost_sheet_fee;
        out.sheets.push(sc);
    }
    out.total_cost = out.total_cost_cuts + out.total_cost_sheet_fees;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Board, Trim};
    use crate::metrics::SheetMetrics;
    use approx::assert_relative_eq;

    fn sheet(internal: Mm, trim: Mm) -> SheetResult {
        let board = Board::new("t", 1000, 1000, 18, Trim::none()).unwrap();
        let mut sheet = SheetResult::new(0, board);
        sheet.metrics = Some(SheetMetrics {
            waste_area: 0,
            internal_cut_length: internal,
            trim_cut_length: trim,
        });
        sheet
    }

    #[test]
    fn test_separate_rates() {
        let price = PriceModel::new(0.01)
            .with_trim_rate(0.02)
            .with_sheet_fee(5.0);
        let cost = sheet_cost(&sheet(1000, 500), &price).unwrap();
        assert_eq!(cost.cut_total_mm, 1500);
        assert_relative_eq!(cost.cost_cuts, 10.0 + 10.0);
        assert_relative_eq!(cost.cost_total, 25.0);
    }

    #[test]
    fn test_minimum_billable_top_up() {
        let price = PriceModel::new(0.01).with_min_billable(10_000);
        let cost = sheet_cost(&sheet(1000, 0), &price).unwrap();
        assert_eq!(cost.billable_mm, 10_000);
        assert_relative_eq!(cost.cost_cuts, 100.0);
    }

    #[test]
    fn test_missing_metrics_fails() {
        let board = Board::new("t", 1000, 1000, 18, Trim::none()).unwrap();
        let bare = SheetResult::new(3, board);
        assert_eq!(
            sheet_cost(&bare, &PriceModel::new(1.0)),
            Err(Error::MissingMetrics(3))
        );
    }

    #[test]
    fn test_solution_totals() {
        let board = Board::new("t", 1000, 1000, 18, Trim::none()).unwrap();
        let mut solution = Solution::new(board, 0);
        solution.sheets.push(sheet(100, 50));
        solution.sheets.push(sheet(200, 0));
        let cost = solution_cost(&solution, &PriceModel::new(1.0).with_sheet_fee(2.0)).unwrap();
        assert_eq!(cost.total_cut_mm, 350);
        assert_relative_eq!(cost.total_cost, 354.0);
        assert_eq!(cost.sheets.len(), 2);
    }
}
