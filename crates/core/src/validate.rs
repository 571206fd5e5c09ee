//! Geometric validation of solutions.
//!
//! Validation never fails by itself; it collects issues tagged with a severity
//! and leaves the decision to the caller (see [`raise_on_errors`]).

use crate::result::Solution;
use crate::{Error, Result};
use std::collections::HashSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Severity of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Severity {
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IssueKind {
    NonPositiveSize,
    OutOfBounds,
    Overlap,
    CutOutOfRange,
    ZeroLengthCut,
    DuplicatePart,
    SheetIndexMismatch,
    EmptySheet,
    MissingMetrics,
    NoSheets,
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ValidationIssue {
    pub severity: Severity,
    pub kind: IssueKind,
    pub sheet_index: Option<usize>,
    pub part_id: Option<String>,
    pub message: String,
}

impl ValidationIssue {
    fn error(kind: IssueKind, sheet_index: usize, message: String) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            sheet_index: Some(sheet_index),
            part_id: None,
            message,
        }
    }

    fn warning(kind: IssueKind, sheet_index: Option<usize>, message: String) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            sheet_index,
            part_id: None,
            message,
        }
    }

    fn with_part(mut self, part_id: &str) -> Self {
        self.part_id = Some(part_id.to_string());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.severity)?;
        if let Some(sheet) = self.sheet_index {
            write!(f, " sheet={}", sheet)?;
        }
        if let Some(part) = &self.part_id {
            write!(f, " part={}", part)?;
        }
        write!(f, " :: {}", self.message)
    }
}

/// Checks bounds, overlaps, cut ranges and id uniqueness of a solution.
pub fn validate_solution(solution: &Solution) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut seen_ids: HashSet<&str> = HashSet::new();

    if solution.sheets.is_empty() {
        issues.push(ValidationIssue::warning(
            IssueKind::NoSheets,
            None,
            "solution has 0 sheets".to_string(),
        ));
    }

    for sheet in &solution.sheets {
        let idx = sheet.sheet_index;
        let (w, h) = (sheet.board.usable_w(), sheet.board.usable_h());

        if sheet.placements.is_empty() {
            issues.push(ValidationIssue::warning(
                IssueKind::EmptySheet,
                Some(idx),
                "sheet has no placements".to_string(),
            ));
        }
        if sheet.metrics.is_none() {
            issues.push(ValidationIssue::warning(
                IssueKind::MissingMetrics,
                Some(idx),
                "metrics not computed".to_string(),
            ));
        }

        for p in &sheet.placements {
            if p.sheet_index != idx {
                issues.push(
                    ValidationIssue::error(
                        IssueKind::SheetIndexMismatch,
                        idx,
                        format!("placement tagged with sheet {}", p.sheet_index),
                    )
                    .with_part(&p.part_id),
                );
            }
            if p.w <= 0 || p.h <= 0 {
                issues.push(
                    ValidationIssue::error(
                        IssueKind::NonPositiveSize,
                        idx,
                        format!("non-positive size {}x{}", p.w, p.h),
                    )
                    .with_part(&p.part_id),
                );
            }
            if !p.within(w, h) {
                issues.push(
                    ValidationIssue::error(
                        IssueKind::OutOfBounds,
                        idx,
                        format!(
                            "x={}, y={}, w={}, h={} exceeds usable {}x{}",
                            p.x, p.y, p.w, p.h, w, h
                        ),
                    )
                    .with_part(&p.part_id),
                );
            }
            if !seen_ids.insert(p.part_id.as_str()) {
                issues.push(
                    ValidationIssue::error(
                        IssueKind::DuplicatePart,
                        idx,
                        "part placed more than once".to_string(),
                    )
                    .with_part(&p.part_id),
                );
            }
        }

        for (i, a) in sheet.placements.iter().enumerate() {
            for b in &sheet.placements[i + 1..] {
                if a.rect().overlaps(&b.rect()) {
                    issues.push(
                        ValidationIssue::error(
                            IssueKind::Overlap,
                            idx,
                            format!("{} overlaps {}", a.part_id, b.part_id),
                        )
                        .with_part(&a.part_id),
                    );
                }
            }
        }

        for cut in &sheet.cuts {
            if cut.length() == 0 {
                issues.push(ValidationIssue::error(
                    IssueKind::ZeroLengthCut,
                    idx,
                    format!("{} cut at {} has zero length", cut.orientation, cut.coord),
                ));
            }
            if !cut.within(w, h) {
                issues.push(ValidationIssue::error(
                    IssueKind::CutOutOfRange,
                    idx,
                    format!(
                        "{} cut at {} span [{}, {}] outside usable {}x{}",
                        cut.orientation, cut.coord, cut.start, cut.end, w, h
                    ),
                ));
            }
        }
    }

    log::debug!(
        "validated {} sheets: {} issues ({} errors)",
        solution.sheets.len(),
        issues.len(),
        issues.iter().filter(|i| i.is_error()).count()
    );
    issues
}

/// Returns true if no error-level issue is present.
pub fn is_valid(issues: &[ValidationIssue]) -> bool {
    !issues.iter().any(ValidationIssue::is_error)
}

/// Converts error-level issues into an [`Error::InvariantViolation`].
pub fn raise_on_errors(issues: &[ValidationIssue]) -> Result<()> {
    let errors: Vec<String> = issues
        .iter()
        .filter(|i| i.is_error())
        .map(ToString::to_string)
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::InvariantViolation(format!(
            "validation failed:\n{}",
            errors.join("\n")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cut::CutSegment;
    use crate::geometry::{Board, Trim};
    use crate::placement::Placement;
    use crate::result::SheetResult;

    fn solution_with(placements: Vec<Placement>, cuts: Vec<CutSegment>) -> Solution {
        let board = Board::new("t", 1000, 500, 18, Trim::none()).unwrap();
        let mut solution = Solution::new(board.clone(), placements.len());
        let mut sheet = SheetResult::new(0, board);
        sheet.placements = placements;
        sheet.cuts = cuts;
        solution.sheets.push(sheet);
        solution
    }

    #[test]
    fn test_clean_solution_has_no_errors() {
        let solution = solution_with(
            vec![
                Placement::new(0, "a#1", 0, 0, 500, 500, false),
                Placement::new(0, "b#1", 503, 0, 400, 500, false),
            ],
            vec![CutSegment::vertical(0, 500, 0, 500, 2).unwrap()],
        );
        let issues = validate_solution(&solution);
        assert!(is_valid(&issues));
        assert!(raise_on_errors(&issues).is_ok());
        // Metrics were never computed.
        assert!(issues.iter().any(|i| i.kind == IssueKind::MissingMetrics));
    }

    #[test]
    fn test_overlap_detected() {
        let solution = solution_with(
            vec![
                Placement::new(0, "a#1", 0, 0, 500, 500, false),
                Placement::new(0, "b#1", 499, 0, 400, 500, false),
            ],
            Vec::new(),
        );
        let issues = validate_solution(&solution);
        assert!(issues.iter().any(|i| i.kind == IssueKind::Overlap));
        assert!(matches!(
            raise_on_errors(&issues),
            Err(Error::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_out_of_bounds_and_duplicates() {
        let solution = solution_with(
            vec![
                Placement::new(0, "a#1", 900, 0, 200, 100, false),
                Placement::new(0, "a#1", 0, 200, 100, 100, false),
            ],
            Vec::new(),
        );
        let kinds: Vec<_> = validate_solution(&solution)
            .into_iter()
            .map(|i| i.kind)
            .collect();
        assert!(kinds.contains(&IssueKind::OutOfBounds));
        assert!(kinds.contains(&IssueKind::DuplicatePart));
    }

    #[test]
    fn test_cut_out_of_range() {
        let solution = solution_with(
            vec![Placement::new(0, "a#1", 0, 0, 100, 100, false)],
            vec![CutSegment::horizontal(0, 100, 0, 1200, 1).unwrap()],
        );
        let issues = validate_solution(&solution);
        assert!(issues.iter().any(|i| i.kind == IssueKind::CutOutOfRange));
    }

    #[test]
    fn test_empty_solution_warns() {
        let board = Board::new("t", 1000, 500, 18, Trim::none()).unwrap();
        let issues = validate_solution(&Solution::new(board, 0));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(is_valid(&issues));
    }
}
