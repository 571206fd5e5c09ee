//! Report export: JSON report and CSV tables.

use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use u_panelcut_core::{
    Board, CutSegment, Placement, SheetMetrics, Solution, SolutionCost, SolveSummary,
    ValidationIssue,
};

#[derive(Debug, Serialize)]
struct SheetReport<'a> {
    sheet_index: usize,
    placements: &'a [Placement],
    cuts: &'a [CutSegment],
    metrics: Option<SheetMetrics>,
}

/// Full JSON report of a solve.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    board: &'a Board,
    usable: (i64, i64),
    summary: SolveSummary,
    sheets: Vec<SheetReport<'a>>,
    unplaced: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    cost: Option<&'a SolutionCost>,
    issues: &'a [ValidationIssue],
}

impl<'a> Report<'a> {
    pub fn new(
        solution: &'a Solution,
        cost: Option<&'a SolutionCost>,
        issues: &'a [ValidationIssue],
    ) -> Self {
        Self {
            board: &solution.board,
            usable: (solution.board.usable_w(), solution.board.usable_h()),
            summary: solution.summary(),
            sheets: solution
                .sheets
                .iter()
                .map(|s| SheetReport {
                    sheet_index: s.sheet_index,
                    placements: &s.placements,
                    cuts: &s.cuts,
                    metrics: s.metrics,
                })
                .collect(),
            unplaced: &solution.unplaced,
            cost,
            issues,
        }
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }
}

/// Writes `placements.csv`, `cuts.csv` and `summary.csv` into `dir`.
pub fn save_csv_dir(solution: &Solution, dir: impl AsRef<Path>) -> std::io::Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut file = File::create(dir.join("placements.csv"))?;
    writeln!(file, "sheet,part_id,x,y,w,h,rotated")?;
    for p in solution.placements() {
        writeln!(
            file,
            "{},{},{},{},{},{},{}",
            p.sheet_index, p.part_id, p.x, p.y, p.w, p.h, p.rotated
        )?;
    }

    let mut file = File::create(dir.join("cuts.csv"))?;
    writeln!(file, "sheet,orientation,coord,start,end,length,stage")?;
    for c in solution.cuts() {
        writeln!(
            file,
            "{},{},{},{},{},{},{}",
            c.sheet_index,
            c.orientation,
            c.coord,
            c.start,
            c.end,
            c.length(),
            c.stage
        )?;
    }

    let mut file = File::create(dir.join("summary.csv"))?;
    writeln!(
        file,
        "sheet,parts,utilization,waste_area,internal_cut_mm,trim_cut_mm,total_cut_mm"
    )?;
    for sheet in &solution.sheets {
        let opt = |v: Option<i64>| v.map_or(String::new(), |v| v.to_string());
        writeln!(
            file,
            "{},{},{:.4},{},{},{},{}",
            sheet.sheet_index,
            sheet.placements.len(),
            sheet.utilization(),
            opt(sheet.waste_area()),
            opt(sheet.internal_cut_length()),
            opt(sheet.trim_cut_length()),
            opt(sheet.total_cut_length()),
        )?;
    }
    Ok(())
}

/// Prints a summary table to stdout.
pub fn print_summary(solution: &Solution, cost: Option<&SolutionCost>) {
    let summary = solution.summary();
    println!("\n{:=<72}", "");
    println!(
        "PANELCUT PLAN  strategy={}  board {}x{} (usable {}x{})",
        summary.strategy,
        solution.board.width(),
        solution.board.height(),
        solution.board.usable_w(),
        solution.board.usable_h()
    );
    println!("{:=<72}", "");
    println!(
        "{:<7} {:>7} {:>8} {:>12} {:>12} {:>12}",
        "Sheet", "Parts", "Util%", "Waste mm²", "Internal mm", "Trim mm"
    );
    println!("{:-<72}", "");
    for sheet in &solution.sheets {
        let dash = |v: Option<i64>| v.map_or("-".to_string(), |v| v.to_string());
        println!(
            "{:<7} {:>7} {:>8.1} {:>12} {:>12} {:>12}",
            sheet.sheet_index,
            sheet.placements.len(),
            sheet.utilization() * 100.0,
            dash(sheet.waste_area()),
            dash(sheet.internal_cut_length()),
            dash(sheet.trim_cut_length())
        );
    }
    println!("{:-<72}", "");
    println!(
        "placed {}/{} on {} sheets, utilization {:.1}%, {} ms",
        summary.total_placed,
        summary.total_requested,
        summary.sheets_used,
        summary.utilization_percent,
        summary.time_ms
    );
    if let Some(message) = solution.unplaced_message() {
        println!("{}: {}", message, solution.unplaced.join(", "));
    }
    if let Some(cost) = cost {
        println!(
            "cost: cuts {:.2} ({} mm billable) + sheets {:.2} = {:.2}",
            cost.total_cost_cuts,
            cost.total_billable_mm,
            cost.total_cost_sheet_fees,
            cost.total_cost
        );
    }
}
