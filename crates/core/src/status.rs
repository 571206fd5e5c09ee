//! Status reporting of the single-sheet packer backends.
//!
//! Both the branch and bound search and the MILP backend report how their
//! run ended through [`PackStats`]. Timeouts are not failures: the packer
//! still returns the best feasible layout found by the deadline.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a packer run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SolutionStatus {
    /// Search space exhausted; the layout maximises the objective.
    Optimal,
    /// Feasible layout, optimality not proven (node cap or solver gap).
    Feasible,
    /// No candidate part fits at all.
    Infeasible,
    /// Deadline reached; best layout so far returned.
    Timeout,
    /// Backend failed; layout comes from the fallback.
    Error,
    /// Status unknown or not applicable.
    #[default]
    Unknown,
}

impl std::fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Optimal => write!(f, "Optimal"),
            Self::Feasible => write!(f, "Feasible"),
            Self::Infeasible => write!(f, "Infeasible"),
            Self::Timeout => write!(f, "Timeout"),
            Self::Error => write!(f, "Error"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Statistics of one packer run (objective is maximised).
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PackStats {
    pub status: SolutionStatus,
    /// Objective of the returned layout.
    pub objective_value: f64,
    /// Upper bound on the optimal objective.
    pub best_bound: f64,
    /// Search nodes explored (0 for backends that do not report it).
    pub nodes_explored: u64,
    /// Wall-clock time spent.
    pub elapsed_ms: u64,
    pub message: String,
}

impl PackStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Proven optimal layout.
    pub fn optimal(objective: f64) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            objective_value: objective,
            best_bound: objective,
            message: "optimal layout found".to_string(),
            ..Default::default()
        }
    }

    /// Feasible layout with a remaining gap to `bound`.
    pub fn feasible(objective: f64, bound: f64) -> Self {
        let mut stats = Self {
            status: SolutionStatus::Feasible,
            objective_value: objective,
            best_bound: bound,
            ..Default::default()
        };
        stats.message = format!("feasible layout (gap: {:.2}%)", stats.gap() * 100.0);
        stats
    }

    /// Deadline reached with `objective` as the incumbent.
    pub fn timeout(objective: f64, bound: f64) -> Self {
        Self {
            status: SolutionStatus::Timeout,
            objective_value: objective,
            best_bound: bound,
            message: "time limit reached".to_string(),
            ..Default::default()
        }
    }

    /// Nothing fits.
    pub fn infeasible() -> Self {
        Self {
            status: SolutionStatus::Infeasible,
            message: "no candidate fits the region".to_string(),
            ..Default::default()
        }
    }

    /// Backend failure described by `message`.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: SolutionStatus::Error,
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_nodes(mut self, nodes: u64) -> Self {
        self.nodes_explored = nodes;
        self
    }

    pub fn with_elapsed(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }

    /// Relative gap between bound and objective.
    pub fn gap(&self) -> f64 {
        if self.best_bound.abs() > 1e-10 {
            ((self.best_bound - self.objective_value) / self.best_bound.abs()).max(0.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_status_display() {
        assert_eq!(SolutionStatus::Timeout.to_string(), "Timeout");
        assert_eq!(SolutionStatus::default(), SolutionStatus::Unknown);
    }

    #[test]
    fn test_optimal_has_no_gap() {
        let stats = PackStats::optimal(1000.0).with_nodes(42);
        assert!(stats.is_optimal());
        assert_eq!(stats.nodes_explored, 42);
        assert_relative_eq!(stats.gap(), 0.0);
    }

    #[test]
    fn test_feasible_gap() {
        let stats = PackStats::feasible(900.0, 1000.0);
        assert_relative_eq!(stats.gap(), 0.1);
        assert!(stats.message.contains("10.00%"));
    }
}
