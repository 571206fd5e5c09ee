//! MILP formulation of the shelf model, solved with HiGHS via `good_lp`.
//!
//! Variables:
//! - `a[i][s][o]` binary: part `i` sits in shelf `s` with orientation `o`
//! - `used[s]` binary: shelf `s` holds at least one part
//! - `h[s]` in `[0, H]`: shelf height
//! - `p[i][s]` in `[0, H]`: linearisation of `in[i][s] * h[s]`
//!
//! where `in[i][s] = Σ_o a[i][s][o]`. The objective counts the vertical cuts
//! of a shelf as `Σ_i p[i][s] - h[s]`, i.e. `(count - 1) * height`.
//!
//! Only compiled with the `milp` feature; otherwise [`MilpShelfBackend`]
//! reports that it is unavailable and callers fall back to the search.

use super::{ShelfBackend, ShelfOutcome, ShelfProblem};
use std::time::Instant;
use u_panelcut_core::Result;

/// Shelf backend that builds and solves the MILP.
#[derive(Debug, Clone, Default)]
pub struct MilpShelfBackend {
    verbose: bool,
}

impl MilpShelfBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lets HiGHS print its log.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl ShelfBackend for MilpShelfBackend {
    fn name(&self) -> &'static str {
        "shelf-milp"
    }

    fn solve(&self, problem: &ShelfProblem<'_>, deadline: Instant) -> Result<ShelfOutcome> {
        solve_milp(problem, deadline, self.verbose)
    }
}

#[cfg(feature = "milp")]
fn solve_milp(problem: &ShelfProblem<'_>, deadline: Instant, verbose: bool) -> Result<ShelfOutcome> {
    use super::{objective, Slot};
    use good_lp::solvers::highs::highs;
    use good_lp::{constraint, variable, Expression, ProblemVariables, Solution, SolverModel, Variable};
    use std::time::Duration;
    use u_panelcut_core::{Error, PackStats};

    let start = Instant::now();
    let n = problem.parts.len();
    let shelves = problem.max_shelves;
    let width = problem.width as f64;
    let height = problem.height as f64;
    let kerf = problem.kerf as f64;
    let weights = problem.weights;

    let options: Vec<_> = (0..n).map(|i| problem.orientations(i)).collect();

    let mut vars = ProblemVariables::new();
    // a[i][s] holds (variable, w, h, rotated) per fitting orientation.
    let mut a: Vec<Vec<Vec<(Variable, f64, f64, bool)>>> = Vec::with_capacity(n);
    for (i, opts) in options.iter().enumerate() {
        let mut per_shelf = Vec::with_capacity(shelves);
        for s in 0..shelves {
            let row = opts
                .iter()
                .enumerate()
                .map(|(o, &(w, h, rotated))| {
                    let v = vars.add(variable().binary().name(format!("a_{}_{}_{}", i, s, o)));
                    (v, w as f64, h as f64, rotated)
                })
                .collect();
            per_shelf.push(row);
        }
        a.push(per_shelf);
    }
    let used: Vec<Variable> = (0..shelves)
        .map(|s| vars.add(variable().binary().name(format!("used_{}", s))))
        .collect();
    let h: Vec<Variable> = (0..shelves)
        .map(|s| vars.add(variable().min(0.0).max(height).name(format!("h_{}", s))))
        .collect();
    let p: Vec<Vec<Variable>> = (0..n)
        .map(|i| {
            (0..shelves)
                .map(|s| vars.add(variable().min(0.0).max(height).name(format!("p_{}_{}", i, s))))
                .collect()
        })
        .collect();

    let in_expr = |i: usize, s: usize| -> Expression {
        a[i][s]
            .iter()
            .fold(Expression::from(0.0), |acc, &(v, _, _, _)| acc + v)
    };

    let area_term = (0..n).fold(Expression::from(0.0), |acc, i| {
        let area = problem.parts[i].area() as f64;
        (0..shelves).fold(acc, |acc, s| acc + area * in_expr(i, s))
    });
    let used_sum = used.iter().fold(Expression::from(0.0), |acc, &u| acc + u);
    let h_sum = h.iter().fold(Expression::from(0.0), |acc, &v| acc + v);
    let p_sum = p
        .iter()
        .flatten()
        .fold(Expression::from(0.0), |acc, &v| acc + v);
    let first_used: Expression = used.first().map_or(Expression::from(0.0), |&u| u.into());
    let cut_term = width * (used_sum.clone() - first_used) + p_sum - h_sum.clone();
    let goal = area_term - weights.cut_weight * cut_term - weights.shelf_weight * used_sum.clone();

    let remaining = deadline
        .saturating_duration_since(Instant::now())
        .max(Duration::from_millis(50));
    let mut model = vars
        .maximise(goal)
        .using(highs)
        .set_verbose(verbose)
        .set_time_limit(remaining.as_secs_f64());

    for i in 0..n {
        let total = (0..shelves).fold(Expression::from(0.0), |acc, s| acc + in_expr(i, s));
        model = model.with(constraint!(total <= 1.0));
    }
    for s in 0..shelves {
        let mut width_use = Expression::from(0.0);
        for i in 0..n {
            for &(v, w, ph, _) in &a[i][s] {
                model = model.with(constraint!(h[s] >= ph * v));
                width_use = width_use + (w + kerf) * v;
            }
            let part_in = in_expr(i, s);
            model = model.with(constraint!(part_in.clone() <= used[s]));
            model = model.with(constraint!(p[i][s] >= h[s] + height * part_in.clone() - height));
            model = model.with(constraint!(p[i][s] <= height * part_in));
            model = model.with(constraint!(p[i][s] <= h[s]));
        }
        model = model.with(constraint!(width_use <= (width + kerf) * used[s]));
        model = model.with(constraint!(h[s] <= height * used[s]));
        if s + 1 < shelves {
            model = model.with(constraint!(used[s + 1] <= used[s]));
        }
    }
    model = model.with(constraint!(h_sum + kerf * used_sum - kerf <= height));

    log::info!(
        "Solving shelf MILP with {} parts, {} shelf slots",
        n,
        shelves
    );
    let solution = model
        .solve()
        .map_err(|e| Error::Internal(format!("MILP solver error: {:?}", e)))?;

    let assignment = a
        .iter()
        .map(|per_shelf| {
            per_shelf.iter().enumerate().find_map(|(s, row)| {
                row.iter()
                    .find(|(v, _, _, _)| solution.value(*v) > 0.5)
                    .map(|&(_, _, _, rotated)| Slot { shelf: s, rotated })
            })
        })
        .collect();

    let value = objective(problem, &assignment);
    Ok(ShelfOutcome {
        assignment,
        stats: PackStats::optimal(value).with_elapsed(start.elapsed().as_millis() as u64),
    })
}

#[cfg(not(feature = "milp"))]
fn solve_milp(_problem: &ShelfProblem<'_>, _deadline: Instant, _verbose: bool) -> Result<ShelfOutcome> {
    Err(u_panelcut_core::Error::InvalidConfig(
        "MILP backend not available (compile with 'milp' feature)".into(),
    ))
}

/// Check if the MILP backend is compiled in.
pub fn is_milp_available() -> bool {
    cfg!(feature = "milp")
}
