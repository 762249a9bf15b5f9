use nalgebra::{DMatrix, DVector};
use proptest::prelude::*;
use vpsc::{Constraint, IncSolver, SolverOptions, Variable};

fn cost(vars: &[(f64, f64)], xs: &[f64]) -> f64 {
    vars.iter()
        .zip(xs)
        .map(|(&(d, w), &x)| w * (x - d) * (x - d))
        .sum()
}

fn feasible(cs: &[(usize, usize, f64)], xs: &[f64], eps: f64) -> bool {
    cs.iter().all(|&(l, r, g)| xs[r] - xs[l] >= g - eps)
}

/// Exhaustive optimum: every subset of constraints is tried as an equality set, the resulting
/// equality-constrained least squares problem is solved through its KKT system and the cheapest
/// feasible candidate wins.
fn brute_force_optimum(vars: &[(f64, f64)], cs: &[(usize, usize, f64)]) -> f64 {
    let n = vars.len();
    let mut best = f64::INFINITY;
    for mask in 0u32..(1u32 << cs.len()) {
        let active: Vec<&(usize, usize, f64)> = cs
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, c)| c)
            .collect();
        let m = active.len();
        let mut kkt = DMatrix::<f64>::zeros(n + m, n + m);
        let mut rhs = DVector::<f64>::zeros(n + m);
        for (i, &(d, w)) in vars.iter().enumerate() {
            kkt[(i, i)] = 2.0 * w;
            rhs[i] = 2.0 * w * d;
        }
        for (k, &&(l, r, g)) in active.iter().enumerate() {
            kkt[(n + k, l)] = -1.0;
            kkt[(n + k, r)] = 1.0;
            kkt[(l, n + k)] = -1.0;
            kkt[(r, n + k)] = 1.0;
            rhs[n + k] = g;
        }
        let Some(sol) = kkt.lu().solve(&rhs) else {
            continue;
        };
        let xs: Vec<f64> = (0..n).map(|i| sol[i]).collect();
        if xs.iter().all(|x| x.is_finite()) && feasible(cs, &xs, 1e-7) {
            best = best.min(cost(vars, &xs));
        }
    }
    best
}

fn solve(vars: &[(f64, f64)], cs: &[(usize, usize, f64)]) -> (Vec<f64>, vpsc::SolveReport) {
    let variables = vars.iter().map(|&(d, w)| Variable::new(d, w)).collect();
    let constraints = cs.iter().map(|&(l, r, g)| Constraint::new(l, r, g)).collect();
    let mut solver = IncSolver::new(variables, constraints).expect("valid problem");
    let report = solver.solve().expect("solvable");
    (solver.final_positions(), report)
}

#[test]
fn incremental_solver_matches_the_exhaustive_optimum_on_a_fixed_instance() {
    let vars = [(0.0, 1.0), (1.0, 2.0), (1.5, 1.0), (-3.0, 0.5), (4.0, 1.0)];
    let cs = [(0, 1, 2.0), (1, 2, 1.0), (3, 2, 1.0), (2, 4, 3.0)];
    let (xs, report) = solve(&vars, &cs);
    assert!(feasible(&cs, &xs, 1e-6), "{xs:?}");
    let best = brute_force_optimum(&vars, &cs);
    assert!(
        (cost(&vars, &xs) - best).abs() < 1e-6,
        "solver cost {} vs optimum {best}",
        cost(&vars, &xs)
    );
    assert!(report.converged);
}

#[test]
fn solver_resumes_after_desired_positions_change() {
    let vars = vec![Variable::new(0.0, 1.0), Variable::new(0.0, 1.0)];
    let cs = vec![Constraint::new(0, 1, 2.0)];
    let mut solver = IncSolver::new(vars, cs).unwrap();
    solver.solve().unwrap();
    assert!(solver.constraints()[0].is_active());

    // Pull the right variable far away: the active constraint must be released.
    solver.set_desired_position(1, 10.0);
    solver.solve().unwrap();
    let xs = solver.final_positions();
    assert!((xs[0] - 0.0).abs() < 1e-9 && (xs[1] - 10.0).abs() < 1e-9, "{xs:?}");
    assert!(!solver.constraints()[0].is_active());
    assert_eq!(solver.block_count(), 2);
}

#[test]
fn scaled_variables_respect_scaled_constraints() {
    // 2 * x1 - x0 >= 4
    let vars = vec![Variable::new(0.0, 1.0), Variable::new(0.0, 1.0).with_scale(2.0)];
    let cs = vec![Constraint::new(0, 1, 4.0)];
    let mut solver = IncSolver::new(vars, cs).unwrap();
    solver.solve().unwrap();
    let xs = solver.final_positions();
    assert!(2.0 * xs[1] - xs[0] >= 4.0 - 1e-9, "{xs:?}");
    // min x0^2 + x1^2 on 2 x1 - x0 = 4  =>  x0 = -0.8, x1 = 1.6
    assert!((xs[0] + 0.8).abs() < 1e-6 && (xs[1] - 1.6).abs() < 1e-6, "{xs:?}");
}

#[test]
fn long_active_chain_does_not_overflow_the_stack() {
    let n = 10_000;
    let vars = (0..n).map(|_| Variable::new(0.0, 1.0)).collect();
    let cs = (0..n - 1).map(|i| Constraint::new(i, i + 1, 1.0)).collect();
    let (xs, report) = vpsc::solve_positions(vars, cs, SolverOptions::default()).unwrap();

    assert!(report.converged);
    assert_eq!(report.active_constraints, n - 1);
    let mid = (n - 1) as f64 / 2.0;
    for (i, x) in xs.iter().enumerate() {
        assert!((x - (i as f64 - mid)).abs() < 1e-6, "x[{i}] = {x}");
    }
}

#[test]
fn solver_options_deserialize_with_defaults() {
    let opts: SolverOptions = serde_json::from_str(r#"{ "max_passes": 7 }"#).unwrap();
    assert_eq!(opts.max_passes, 7);
    assert_eq!(opts.cost_tolerance, SolverOptions::default().cost_tolerance);
}

fn problem() -> impl Strategy<Value = (Vec<(f64, f64)>, Vec<(usize, usize, f64)>)> {
    (2usize..=5).prop_flat_map(|n| {
        let vars = proptest::collection::vec((-10.0f64..10.0, 0.5f64..4.0), n);
        // Constraints only point from lower to higher index, so the set is always acyclic.
        let cs = proptest::collection::vec((0..n, 0..n, 0.0f64..5.0), 0..=4).prop_map(|raw| {
            raw.into_iter()
                .filter(|(a, b, _)| a != b)
                .map(|(a, b, g)| (a.min(b), a.max(b), g))
                .collect::<Vec<_>>()
        });
        (vars, cs)
    })
}

proptest! {
    #[test]
    fn solved_positions_satisfy_every_constraint((vars, cs) in problem()) {
        let (xs, report) = solve(&vars, &cs);
        prop_assert!(feasible(&cs, &xs, 1e-6), "infeasible: {:?}", xs);
        prop_assert!(report.unsatisfiable.is_empty());
    }

    #[test]
    fn solved_positions_are_no_worse_than_brute_force((vars, cs) in problem()) {
        let (xs, _) = solve(&vars, &cs);
        let best = brute_force_optimum(&vars, &cs);
        let got = cost(&vars, &xs);
        prop_assert!(got <= best + 1e-4 * (1.0 + best), "solver {} vs brute force {}", got, best);
    }
}
