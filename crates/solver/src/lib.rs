//! # U-Panelcut Solver
//!
//! Packing engines for guillotine panel cutting on top of `u-panelcut-core`.
//!
//! - [`shelf`]: single-sheet shelf packer with a branch and bound backend
//!   (and a MILP backend behind the `milp` feature)
//! - [`driver`]: sheet-by-sheet iteration over any [`SheetStrategy`]
//! - [`bottom_left`], [`global`], [`min_sheets`]: alternative packers
//! - [`zone`], [`zone_cache`], [`hybrid`]: the two-level zone search
//! - [`Planner`]: configuration-driven entry point
//!
//! ## Quick Start
//!
//! ```rust
//! use u_panelcut_core::{Board, PartRequest, Solver, SolverConfig, Strategy, Trim};
//! use u_panelcut_solver::Planner;
//!
//! let board = Board::new("MDF", 2800, 2070, 18, Trim::uniform(10).unwrap()).unwrap();
//! let parts = vec![
//!     PartRequest::new("side", 2400, 560, 2).unwrap().with_rotation(false),
//!     PartRequest::new("shelf", 560, 500, 6).unwrap().with_rotation(true),
//! ];
//!
//! let config = SolverConfig::new()
//!     .with_strategy(Strategy::Shelf)
//!     .with_kerf(3)
//!     .with_time_limit(1_000);
//!
//! let solution = Planner::new(config).solve(&board, &parts).unwrap();
//! assert!(solution.all_placed());
//! println!("{} sheets, waste {} mm²", solution.sheet_count(), solution.total_waste_area().unwrap());
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization support
//! - `milp`: MILP shelf backend using HiGHS via `good_lp`

pub mod bottom_left;
pub mod driver;
pub mod global;
pub mod hybrid;
pub mod min_sheets;
pub mod planner;
pub mod shelf;
pub mod zone;
pub mod zone_cache;

// Re-exports
pub use bottom_left::BottomLeftPacker;
pub use driver::{solve_all_sheets, Driver, SheetLayout, SheetStrategy, ShelfStrategy, StopReason};
pub use global::{GlobalPacker, PartOrder};
pub use hybrid::{candidate_positions, enumerate_patterns, HybridOutcome, HybridSearch, Side, TwoCutPattern};
pub use min_sheets::{sheet_lower_bound, MinSheetsSearch};
pub use planner::Planner;
pub use shelf::{
    is_milp_available, solve_single_sheet, MilpShelfBackend, ShelfBackend, ShelfPack, ShelfPacker, ShelfProblem,
    ShelfSearch,
};
pub use zone::{allocate_parts_to_zones, Allocation, Zone, ZoneKind};
pub use zone_cache::{CacheStats, ZonePack, ZonePackCache};
