//! Branch and bound backend for the shelf model.
//!
//! Parts are branched in decreasing area order. For every part the search
//! tries each open shelf, then a new shelf, then leaving the part out; the
//! first descent is therefore a first-fit-decreasing layout and serves as the
//! initial incumbent. Every node is itself a feasible layout (undecided parts
//! stay unused), so the incumbent is refreshed on every node.
//!
//! Pruning uses `placed + min(fitting_suffix_area, free_area) - penalty`. The
//! penalty never decreases when parts are added, so this is a valid bound.
//! Identical consecutive parts are kept in canonical order: a copy may only
//! be used if its predecessor is, and never on a lower shelf.

use super::{ShelfBackend, ShelfOutcome, ShelfProblem, Slot};
use std::time::Instant;
use u_panelcut_core::{Mm, PackStats, Result};

const EPS: f64 = 1e-9;

/// Default mask: check the clock every 1024 nodes.
const DEFAULT_CLOCK_CHECK_MASK: u64 = 0x3FF;

/// Depth-first branch and bound over (part -> shelf, orientation).
#[derive(Debug, Clone)]
pub struct ShelfSearch {
    node_limit: Option<u64>,
    clock_check_mask: u64,
    input_order: bool,
}

impl Default for ShelfSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl ShelfSearch {
    pub fn new() -> Self {
        Self {
            node_limit: None,
            clock_check_mask: DEFAULT_CLOCK_CHECK_MASK,
            input_order: false,
        }
    }

    /// Stops after `nodes` search nodes; `None` relies on the deadline only.
    pub fn with_node_limit(mut self, nodes: Option<u64>) -> Self {
        self.node_limit = nodes;
        self
    }

    /// Branches on parts in the given order instead of by decreasing area.
    pub fn with_input_order(mut self, input_order: bool) -> Self {
        self.input_order = input_order;
        self
    }

    pub fn with_clock_check_mask(mut self, mask: u64) -> Self {
        self.clock_check_mask = mask;
        self
    }
}

impl ShelfBackend for ShelfSearch {
    fn name(&self) -> &'static str {
        "shelf-search"
    }

    fn solve(&self, problem: &ShelfProblem<'_>, deadline: Instant) -> Result<ShelfOutcome> {
        let mut state = SearchState::new(problem, self, deadline);
        state.dfs(0);

        let root_bound = state.suffix_area.first().copied().unwrap_or(0) as f64;
        let root_bound = root_bound.min((problem.width * problem.height) as f64);
        let stats = match state.stop {
            None => PackStats::optimal(state.best_obj),
            Some(StopReason::Deadline) => PackStats::timeout(state.best_obj, root_bound),
            Some(StopReason::NodeLimit) => PackStats::feasible(state.best_obj, root_bound),
        }
        .with_nodes(state.nodes);

        let mut assignment = vec![None; problem.parts.len()];
        for (pos, slot) in state.best.iter().enumerate() {
            assignment[state.order[pos]] = *slot;
        }
        Ok(ShelfOutcome { assignment, stats })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Deadline,
    NodeLimit,
}

#[derive(Debug, Clone, Copy)]
struct Shelf {
    height: Mm,
    /// Σ (w + kerf) of the parts in the shelf.
    width_used: Mm,
    count: usize,
}

struct SearchState<'p, 'a> {
    problem: &'p ShelfProblem<'a>,
    node_limit: Option<u64>,
    clock_check_mask: u64,
    deadline: Instant,

    /// Part indices in branching order.
    order: Vec<usize>,
    /// Fitting orientations per order position.
    options: Vec<Vec<(Mm, Mm, bool)>>,
    /// Order position holds the same shape as its predecessor.
    same_as_prev: Vec<bool>,
    /// Area of fitting parts from each order position on.
    suffix_area: Vec<Mm>,

    shelves: Vec<Shelf>,
    /// Σ shelf heights plus the kerf gaps between them.
    stack_height: Mm,
    placed_area: Mm,
    /// Σ (count - 1) * height over shelves.
    vertical_cut: Mm,
    current: Vec<Option<Slot>>,

    best: Vec<Option<Slot>>,
    best_obj: f64,
    nodes: u64,
    first_leaf_done: bool,
    stop: Option<StopReason>,
}

impl<'p, 'a> SearchState<'p, 'a> {
    fn new(problem: &'p ShelfProblem<'a>, search: &ShelfSearch, deadline: Instant) -> Self {
        let parts = problem.parts;
        let mut order: Vec<usize> = (0..parts.len()).collect();
        if !search.input_order {
            order.sort_by(|&a, &b| {
                let (pa, pb) = (&parts[a], &parts[b]);
                pb.area()
                    .cmp(&pa.area())
                    .then(pb.max_dim().cmp(&pa.max_dim()))
                    .then(pb.w.cmp(&pa.w))
                    .then(pb.can_rotate.cmp(&pa.can_rotate))
                    .then(a.cmp(&b))
            });
        }

        let options: Vec<_> = order.iter().map(|&i| problem.orientations(i)).collect();
        let same_as_prev: Vec<bool> = (0..order.len())
            .map(|pos| {
                pos > 0 && {
                    let (p, q) = (&parts[order[pos]], &parts[order[pos - 1]]);
                    p.w == q.w && p.h == q.h && p.can_rotate == q.can_rotate
                }
            })
            .collect();

        let mut suffix_area = vec![0; order.len() + 1];
        for pos in (0..order.len()).rev() {
            let area = if options[pos].is_empty() {
                0
            } else {
                parts[order[pos]].area()
            };
            suffix_area[pos] = suffix_area[pos + 1] + area;
        }

        let n = order.len();
        Self {
            problem,
            node_limit: search.node_limit,
            clock_check_mask: search.clock_check_mask,
            deadline,
            order,
            options,
            same_as_prev,
            suffix_area,
            shelves: Vec::new(),
            stack_height: 0,
            placed_area: 0,
            vertical_cut: 0,
            current: vec![None; n],
            best: vec![None; n],
            best_obj: 0.0,
            nodes: 0,
            first_leaf_done: false,
            stop: None,
        }
    }

    fn penalty(&self) -> f64 {
        let used = self.shelves.len() as Mm;
        let horizontal = if used > 0 {
            (used - 1) * self.problem.width
        } else {
            0
        };
        let w = self.problem.weights;
        w.cut_weight * (horizontal + self.vertical_cut) as f64 + w.shelf_weight * used as f64
    }

    fn should_stop(&mut self) -> bool {
        if self.stop.is_some() {
            return true;
        }
        if !self.first_leaf_done {
            return false;
        }
        if let Some(limit) = self.node_limit {
            if self.nodes >= limit {
                self.stop = Some(StopReason::NodeLimit);
                return true;
            }
        }
        if (self.nodes & self.clock_check_mask) == 0 && Instant::now() >= self.deadline {
            self.stop = Some(StopReason::Deadline);
            return true;
        }
        false
    }

    fn dfs(&mut self, pos: usize) {
        if self.should_stop() {
            return;
        }
        self.nodes = self.nodes.wrapping_add(1);

        let obj = self.placed_area as f64 - self.penalty();
        if obj > self.best_obj + EPS {
            self.best_obj = obj;
            self.best.clone_from(&self.current);
        }

        if pos == self.order.len() {
            self.first_leaf_done = true;
            return;
        }

        let free = self.problem.width * self.problem.height - self.placed_area;
        let bound = (self.placed_area + self.suffix_area[pos].min(free)) as f64 - self.penalty();
        if bound <= self.best_obj + EPS && self.first_leaf_done {
            return;
        }

        let forced_skip = self.same_as_prev[pos] && self.current[pos - 1].is_none();
        if !forced_skip && !self.options[pos].is_empty() {
            let min_shelf = if self.same_as_prev[pos] {
                self.current[pos - 1].map_or(0, |s| s.shelf)
            } else {
                0
            };
            self.branch_existing(pos, min_shelf);
            if self.stop.is_some() {
                return;
            }
            self.branch_new(pos);
            if self.stop.is_some() {
                return;
            }
        }

        self.current[pos] = None;
        self.dfs(pos + 1);
    }

    fn branch_existing(&mut self, pos: usize, min_shelf: usize) {
        let (width, height, kerf) = (self.problem.width, self.problem.height, self.problem.kerf);
        let area = self.problem.parts[self.order[pos]].area();

        for s in min_shelf..self.shelves.len() {
            for o in 0..self.options[pos].len() {
                let (w, h, rotated) = self.options[pos][o];
                let shelf = self.shelves[s];
                if shelf.width_used + w > width {
                    continue;
                }
                let new_height = shelf.height.max(h);
                let new_stack = self.stack_height - shelf.height + new_height;
                if new_stack > height {
                    continue;
                }

                let old_vertical = (shelf.count as Mm - 1) * shelf.height;
                let new_vertical = shelf.count as Mm * new_height;
                self.shelves[s] = Shelf {
                    height: new_height,
                    width_used: shelf.width_used + w + kerf,
                    count: shelf.count + 1,
                };
                self.stack_height = new_stack;
                self.vertical_cut += new_vertical - old_vertical;
                self.placed_area += area;
                self.current[pos] = Some(Slot { shelf: s, rotated });

                self.dfs(pos + 1);

                self.current[pos] = None;
                self.placed_area -= area;
                self.vertical_cut -= new_vertical - old_vertical;
                self.stack_height = self.stack_height - new_height + shelf.height;
                self.shelves[s] = shelf;

                if self.stop.is_some() {
                    return;
                }
            }
        }
    }

    fn branch_new(&mut self, pos: usize) {
        if self.shelves.len() >= self.problem.max_shelves {
            return;
        }
        let (height, kerf) = (self.problem.height, self.problem.kerf);
        let gap = if self.shelves.is_empty() { 0 } else { kerf };
        let area = self.problem.parts[self.order[pos]].area();

        for o in 0..self.options[pos].len() {
            let (w, h, rotated) = self.options[pos][o];
            if self.stack_height + gap + h > height {
                continue;
            }
            let s = self.shelves.len();
            self.shelves.push(Shelf {
                height: h,
                width_used: w + kerf,
                count: 1,
            });
            self.stack_height += gap + h;
            self.placed_area += area;
            self.current[pos] = Some(Slot { shelf: s, rotated });

            self.dfs(pos + 1);

            self.current[pos] = None;
            self.placed_area -= area;
            self.stack_height -= gap + h;
            self.shelves.pop();

            if self.stop.is_some() {
                return;
            }
        }
    }
}
