//! Property tests: every packer output respects bounds, kerf spacing and
//! the placed/remaining partition.

use proptest::prelude::*;
use std::collections::HashSet;
use std::time::Duration;
use u_panelcut_core::{
    validate_solution, Board, PartInstance, PartRequest, Placement, Solver, SolverConfig,
    Strategy as PackStrategy,
};
use u_panelcut_solver::{BottomLeftPacker, Driver, Planner, SheetLayout, ShelfPacker};

fn part_strategy() -> impl Strategy<Value = (i64, i64, bool)> {
    (50i64..=900, 50i64..=900, any::<bool>())
}

fn instances(specs: &[(i64, i64, bool)]) -> Vec<PartInstance> {
    specs
        .iter()
        .enumerate()
        .map(|(i, &(w, h, rot))| PartInstance::new(format!("p{}#1", i), w, h, rot))
        .collect()
}

fn check_layout(
    placements: &[Placement],
    remaining: &[PartInstance],
    parts: &[PartInstance],
    w: i64,
    h: i64,
    kerf: i64,
) {
    let mut ids: HashSet<&str> = HashSet::new();
    for p in placements {
        assert!(p.within(w, h), "{} outside {}x{}", p.part_id, w, h);
        assert!(ids.insert(p.part_id.as_str()), "{} placed twice", p.part_id);
        let source = parts.iter().find(|s| s.id == p.part_id).unwrap();
        if p.rotated {
            assert!(source.can_rotate);
            assert_eq!((p.w, p.h), (source.h, source.w));
        } else {
            assert_eq!((p.w, p.h), (source.w, source.h));
        }
    }
    for (i, a) in placements.iter().enumerate() {
        for b in &placements[i + 1..] {
            assert!(!a.rect().overlaps_with_gap(&b.rect(), kerf));
        }
    }
    for r in remaining {
        assert!(ids.insert(r.id.as_str()), "{} both placed and remaining", r.id);
    }
    assert_eq!(ids.len(), parts.len());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn shelf_pack_is_feasible(specs in prop::collection::vec(part_strategy(), 1..9), kerf in 0i64..6) {
        let parts = instances(&specs);
        let pack = ShelfPacker::new(kerf)
            .with_node_limit(Some(5_000))
            .pack(1500, 1200, &parts, Duration::from_secs(2))
            .unwrap();
        check_layout(&pack.placements, &pack.remaining, &parts, 1500, 1200, kerf);
        for cut in pack.cuts(1500, 0).unwrap() {
            prop_assert!(cut.within(1500, 1200));
        }
    }

    #[test]
    fn bottom_left_is_feasible(specs in prop::collection::vec(part_strategy(), 1..12), kerf in 0i64..6) {
        let parts = instances(&specs);
        let SheetLayout { placements, cuts, remaining } =
            BottomLeftPacker::new(kerf).pack(1500, 1200, &parts, 0).unwrap();
        check_layout(&placements, &remaining, &parts, 1500, 1200, kerf);
        for cut in &cuts {
            prop_assert!(cut.within(1500, 1200));
        }
    }

    #[test]
    fn planner_solutions_validate(
        sizes in prop::collection::vec((100i64..=800, 100i64..=800, 1usize..=3), 1..5),
        pick in 0usize..3,
    ) {
        let strategy = [PackStrategy::Shelf, PackStrategy::BottomLeft, PackStrategy::Hybrid][pick];
        let parts: Vec<PartRequest> = sizes
            .iter()
            .enumerate()
            .map(|(i, &(w, h, qty))| PartRequest::new(format!("r{}", i), w, h, qty).unwrap())
            .collect();
        let board = Board::usable(1200, 1000).unwrap();
        let config = SolverConfig::new()
            .with_strategy(strategy)
            .with_time_limit(300)
            .with_node_limit(2_000)
            .with_max_sheets(10);
        let solution = Planner::new(config).solve(&board, &parts).unwrap();
        prop_assert!(validate_solution(&solution).iter().all(|issue| !issue.is_error()));
        prop_assert_eq!(solution.placed_count() + solution.unplaced.len(), solution.total_parts);
    }

    #[test]
    fn waste_plus_placed_area_is_usable_area(
        sizes in prop::collection::vec((100i64..=700, 100i64..=700, 1usize..=4), 1..5),
    ) {
        let parts: Vec<PartRequest> = sizes
            .iter()
            .enumerate()
            .map(|(i, &(w, h, qty))| PartRequest::new(format!("r{}", i), w, h, qty).unwrap())
            .collect();
        let board = Board::usable(1400, 900).unwrap();
        let config = SolverConfig::new().with_time_limit(200).with_node_limit(2_000);
        let solution = Planner::new(config).solve(&board, &parts).unwrap();
        for sheet in &solution.sheets {
            prop_assert_eq!(sheet.waste_area().unwrap() + sheet.placed_area(), board.usable_area());
        }
    }

    #[test]
    fn more_sheets_never_place_fewer_parts(
        specs in prop::collection::vec(part_strategy(), 1..15),
        cap in 1usize..4,
    ) {
        let parts = instances(&specs);
        let board = Board::usable(1000, 1000).unwrap();
        let small = Driver::new(cap)
            .run(&board, parts.clone(), &mut BottomLeftPacker::new(3))
            .unwrap();
        let large = Driver::new(cap + 1)
            .run(&board, parts, &mut BottomLeftPacker::new(3))
            .unwrap();
        prop_assert!(large.placed_count() >= small.placed_count());
    }
}
