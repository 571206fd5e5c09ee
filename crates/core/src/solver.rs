//! Solver trait and configuration.

use crate::geometry::{Board, Mm};
use crate::part::PartRequest;
use crate::result::Solution;
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default saw kerf (mm).
pub const DEFAULT_KERF: Mm = 3;
/// Default wall-clock budget per sheet (ms).
pub const DEFAULT_TIME_LIMIT_MS: u64 = 10_000;
/// Default sheet cap.
pub const DEFAULT_MAX_SHEETS: usize = 20;
/// Aspect ratio from which a zone or a part counts as elongated.
pub const STRIP_ASPECT: f64 = 2.2;

/// Packing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Strategy {
    /// Shelf constraint packer, sheet by sheet.
    #[default]
    Shelf,
    /// Two-level zone decomposition on top of the shelf packer.
    Hybrid,
    /// Greedy bottom-left heuristic (fast, more waste).
    BottomLeft,
    /// Shelf packer run once per part ordering, best run kept.
    Global,
    /// Increasing sheet caps from the area lower bound.
    MinSheets,
}

impl Strategy {
    /// All strategies, in documentation order.
    pub const ALL: [Strategy; 5] = [
        Strategy::Shelf,
        Strategy::Hybrid,
        Strategy::BottomLeft,
        Strategy::Global,
        Strategy::MinSheets,
    ];

    /// Stable short name, used in reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Shelf => "shelf",
            Self::Hybrid => "hybrid",
            Self::BottomLeft => "bottom-left",
            Self::Global => "global",
            Self::MinSheets => "min-sheets",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|st| st.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidConfig(format!("unknown strategy '{}'", s)))
    }
}

/// Backend used by the single-sheet shelf packer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ShelfBackendKind {
    /// Built-in branch and bound.
    #[default]
    Search,
    /// MILP model solved with HiGHS (requires the `milp` feature).
    Milp,
}

/// Objective penalties of the shelf packer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObjectiveWeights {
    /// Penalty per mm of approximate internal cut length.
    pub cut_weight: f64,
    /// Penalty per used shelf.
    pub shelf_weight: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            cut_weight: 1.0,
            shelf_weight: 0.0,
        }
    }
}

impl ObjectiveWeights {
    pub fn new(cut_weight: f64, shelf_weight: f64) -> Self {
        Self {
            cut_weight,
            shelf_weight,
        }
    }
}

/// Parameters of the two-level zone search.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HybridConfig {
    /// Hard cap on two-cut patterns tried per sheet.
    pub max_patterns: usize,
    /// Grid step for candidate cut positions (0 disables the grid).
    pub grid_step: Mm,
    /// Candidate cap for the first cut, per orientation.
    pub max_candidates: usize,
    /// Candidate cap for the second cut, per orientation.
    pub max_candidates_second: usize,
    /// Shelf cap inside zones and for the baseline layout.
    pub zone_max_shelves: usize,
    /// Extra pool parts a block zone may absorb.
    pub inject_cap: usize,
    /// Minimum length left on both sides of a cut.
    pub min_side: Mm,
    /// Aspect ratio from which a zone is a strip.
    pub strip_aspect: f64,
    /// Capacity of the zone pack cache.
    pub cache_capacity: usize,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            max_patterns: 80,
            grid_step: 50,
            max_candidates: 24,
            max_candidates_second: 18,
            zone_max_shelves: 18,
            inject_cap: 24,
            min_side: 50,
            strip_aspect: STRIP_ASPECT,
            cache_capacity: 256,
        }
    }
}

impl HybridConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_patterns(mut self, max_patterns: usize) -> Self {
        self.max_patterns = max_patterns;
        self
    }

    pub fn with_grid_step(mut self, step: Mm) -> Self {
        self.grid_step = step;
        self
    }

    pub fn with_candidates(mut self, first: usize, second: usize) -> Self {
        self.max_candidates = first;
        self.max_candidates_second = second;
        self
    }

    pub fn with_inject_cap(mut self, cap: usize) -> Self {
        self.inject_cap = cap;
        self
    }

    pub fn with_zone_max_shelves(mut self, shelves: usize) -> Self {
        self.zone_max_shelves = shelves;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }
}

/// Configuration shared by every strategy.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverConfig {
    /// Packing strategy.
    pub strategy: Strategy,
    /// Saw kerf reserved between adjacent parts and shelves.
    pub kerf: Mm,
    /// Wall-clock budget per sheet in milliseconds.
    pub time_limit_ms: u64,
    /// Sheet cap for one run.
    pub max_sheets: usize,
    /// Objective penalties of the shelf packer.
    pub weights: ObjectiveWeights,
    /// Shelf slots per sheet (`None` = one per candidate part).
    pub max_shelves: Option<usize>,
    /// Shelf packer backend.
    pub backend: ShelfBackendKind,
    /// Node cap of the branch and bound backend (`None` = time only).
    pub node_limit: Option<u64>,
    /// Highest sheet cap tried by the minimum sheet search.
    pub search_max_sheets: usize,
    /// Two-level zone search parameters.
    pub hybrid: HybridConfig,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            kerf: DEFAULT_KERF,
            time_limit_ms: DEFAULT_TIME_LIMIT_MS,
            max_sheets: DEFAULT_MAX_SHEETS,
            weights: ObjectiveWeights::default(),
            max_shelves: None,
            backend: ShelfBackendKind::default(),
            node_limit: None,
            search_max_sheets: DEFAULT_MAX_SHEETS,
            hybrid: HybridConfig::default(),
        }
    }
}

impl SolverConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_kerf(mut self, kerf: Mm) -> Self {
        self.kerf = kerf;
        self
    }

    /// Sets the per-sheet time limit in milliseconds.
    pub fn with_time_limit(mut self, ms: u64) -> Self {
        self.time_limit_ms = ms;
        self
    }

    pub fn with_max_sheets(mut self, max_sheets: usize) -> Self {
        self.max_sheets = max_sheets;
        self
    }

    pub fn with_weights(mut self, weights: ObjectiveWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_max_shelves(mut self, max_shelves: usize) -> Self {
        self.max_shelves = Some(max_shelves);
        self
    }

    pub fn with_backend(mut self, backend: ShelfBackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Caps branch and bound nodes per sheet; keeps runs reproducible.
    pub fn with_node_limit(mut self, nodes: u64) -> Self {
        self.node_limit = Some(nodes);
        self
    }

    pub fn with_search_max_sheets(mut self, max_sheets: usize) -> Self {
        self.search_max_sheets = max_sheets;
        self
    }

    pub fn with_hybrid(mut self, hybrid: HybridConfig) -> Self {
        self.hybrid = hybrid;
        self
    }

    /// Per-sheet budget as a `Duration`.
    pub fn time_limit(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.time_limit_ms)
    }

    /// Rejects out-of-range values.
    pub fn validate(&self) -> Result<()> {
        if self.kerf < 0 {
            return Err(Error::InvalidConfig(format!(
                "kerf must be >= 0, got {}",
                self.kerf
            )));
        }
        if self.time_limit_ms == 0 {
            return Err(Error::InvalidConfig("time limit must be > 0".into()));
        }
        if self.max_sheets == 0 {
            return Err(Error::InvalidConfig("max_sheets must be >= 1".into()));
        }
        if self.max_shelves == Some(0) {
            return Err(Error::InvalidConfig("max_shelves must be >= 1".into()));
        }
        let w = self.weights;
        if !(w.cut_weight >= 0.0 && w.shelf_weight >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "objective weights must be >= 0, got cut={} shelf={}",
                w.cut_weight, w.shelf_weight
            )));
        }
        if self.hybrid.grid_step < 0 || self.hybrid.min_side < 0 {
            return Err(Error::InvalidConfig(
                "hybrid grid step and min side must be >= 0".into(),
            ));
        }
        if !(self.hybrid.strip_aspect >= 1.0) {
            return Err(Error::InvalidConfig(
                "strip aspect must be >= 1.0".into(),
            ));
        }
        Ok(())
    }
}

/// Progress callback invoked after every finished sheet.
pub type ProgressCallback = Box<dyn Fn(ProgressInfo) + Send + Sync>;

/// Progress information during solving.
#[derive(Debug, Clone, Default)]
pub struct ProgressInfo {
    /// Sheets finished so far.
    pub sheets_done: usize,
    /// Instances placed so far.
    pub items_placed: usize,
    /// Total number of instances.
    pub total_items: usize,
    /// Elapsed time in milliseconds.
    pub elapsed_ms: u64,
    /// Current phase description.
    pub phase: String,
    /// Whether the solver is still running.
    pub running: bool,
}

impl ProgressInfo {
    pub fn new() -> Self {
        Self {
            running: true,
            ..Default::default()
        }
    }

    pub fn with_sheets(mut self, sheets_done: usize) -> Self {
        self.sheets_done = sheets_done;
        self
    }

    pub fn with_items(mut self, placed: usize, total: usize) -> Self {
        self.items_placed = placed;
        self.total_items = total;
        self
    }

    pub fn with_elapsed(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = phase.into();
        self
    }

    /// Marks the solver as finished.
    pub fn finished(mut self) -> Self {
        self.running = false;
        self
    }

    /// Fraction of instances placed (0.0 to 1.0).
    pub fn progress_percent(&self) -> f64 {
        if self.total_items > 0 {
            self.items_placed as f64 / self.total_items as f64
        } else {
            0.0
        }
    }
}

/// Multi-sheet planner interface.
pub trait Solver {
    /// Plans all sheets for the requested parts.
    fn solve(&self, board: &Board, parts: &[PartRequest]) -> Result<Solution>;

    /// Plans all sheets, reporting progress after every sheet.
    fn solve_with_progress(
        &self,
        board: &Board,
        parts: &[PartRequest],
        callback: ProgressCallback,
    ) -> Result<Solution>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SolverConfig::default();
        assert_eq!(config.kerf, 3);
        assert_eq!(config.time_limit_ms, 10_000);
        assert_eq!(config.max_sheets, 20);
        assert_eq!(config.weights, ObjectiveWeights::new(1.0, 0.0));
        assert_eq!(config.hybrid.max_patterns, 80);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = SolverConfig::new()
            .with_strategy(Strategy::Hybrid)
            .with_kerf(4)
            .with_time_limit(500)
            .with_max_sheets(3)
            .with_node_limit(10_000);
        assert_eq!(config.strategy, Strategy::Hybrid);
        assert_eq!(config.kerf, 4);
        assert_eq!(config.time_limit().as_millis(), 500);
        assert_eq!(config.node_limit, Some(10_000));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(SolverConfig::new().with_kerf(-1).validate().is_err());
        assert!(SolverConfig::new().with_max_sheets(0).validate().is_err());
        assert!(SolverConfig::new().with_time_limit(0).validate().is_err());
        assert!(SolverConfig::new()
            .with_weights(ObjectiveWeights::new(-1.0, 0.0))
            .validate()
            .is_err());
        assert!(SolverConfig::new().with_max_shelves(0).validate().is_err());
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("hybrid".parse::<Strategy>(), Ok(Strategy::Hybrid));
        assert_eq!("Bottom-Left".parse::<Strategy>(), Ok(Strategy::BottomLeft));
        assert!("annealing".parse::<Strategy>().is_err());
        for s in Strategy::ALL {
            assert_eq!(s.to_string().parse::<Strategy>(), Ok(s));
        }
    }

    #[test]
    fn test_progress_percent() {
        let info = ProgressInfo::new().with_items(3, 12);
        assert!(info.running);
        assert_eq!(info.progress_percent(), 0.25);
        assert!(!info.finished().running);
    }
}
