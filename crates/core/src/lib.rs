//! # U-Panelcut Core
//!
//! Data model, metrics and validation for guillotine panel cutting.
//!
//! This crate holds everything the packers in `u-panelcut-solver` share but
//! that carries no search logic of its own: boards and trims, part requests and
//! instances, placements and cut segments, per-sheet metrics, cut reconstruction
//! for shelf layouts, solution validation, costing and configuration.
//!
//! ## Units
//!
//! All lengths are integer millimetres ([`Mm`]). Placement coordinates are
//! relative to the usable (trimmed) rectangle of a sheet.
//!
//! ## Configuration
//!
//! ```rust
//! use u_panelcut_core::{SolverConfig, Strategy};
//!
//! let config = SolverConfig::new()
//!     .with_strategy(Strategy::Hybrid)
//!     .with_kerf(4)
//!     .with_time_limit(5_000)
//!     .with_max_sheets(10);
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization support

pub mod costing;
pub mod cut;
pub mod error;
pub mod geometry;
pub mod metrics;
pub mod part;
pub mod placement;
pub mod reconstruct;
pub mod result;
pub mod sample;
pub mod solver;
pub mod status;
pub mod validate;

// Re-exports
pub use costing::{sheet_cost, solution_cost, PriceModel, SheetCost, SolutionCost};
pub use cut::{CutSegment, Orientation};
pub use error::{Error, Result};
pub use geometry::{aspect_ratio, default_board, Board, Mm, Rect, Trim};
pub use metrics::{compute_sheet_metrics, compute_solution_metrics, SheetMetrics};
pub use part::{expand_parts, PartInstance, PartRequest};
pub use placement::Placement;
pub use reconstruct::shelf_cuts;
pub use result::{SheetResult, Solution, SolveSummary};
pub use sample::{generate_random_parts, RandomPartsConfig};
pub use solver::{
    HybridConfig, ObjectiveWeights, ProgressCallback, ProgressInfo, ShelfBackendKind, Solver,
    SolverConfig, Strategy,
};
pub use status::{PackStats, SolutionStatus};
pub use validate::{raise_on_errors, validate_solution, IssueKind, Severity, ValidationIssue};
