#![forbid(unsafe_code)]

//! Variable placement with separation constraints (VPSC).
//!
//! Given scalar variables with desired positions and weights, and constraints of the form
//! `right - left >= gap`, [`IncSolver`] finds the feasible placement with the least weighted
//! squared movement. [`remove_rectangle_overlap`] builds such problems per axis from a set of
//! rectangles to push them apart with minimal movement.

mod block;
pub mod constraint;
pub mod error;
pub mod generate;
pub mod overlap;
pub mod rectangle;
pub mod solver;
pub mod variable;

pub use constraint::Constraint;
pub use error::{Error, Result};
pub use generate::{Axis, generate_constraints};
pub use overlap::{
    EXTRA_GAP, OverlapRemoval, OverlapReport, remove_rectangle_overlap, removed_rectangle_overlap,
};
pub use rectangle::Rectangle;
pub use solver::{IncSolver, SolveReport, SolverOptions};
pub use variable::Variable;

/// Solves a one-dimensional placement problem and returns the final positions.
pub fn solve_positions(
    vars: Vec<Variable>,
    cs: Vec<Constraint>,
    options: SolverOptions,
) -> Result<(Vec<f64>, SolveReport)> {
    let mut solver = IncSolver::with_options(vars, cs, options)?;
    let report = solver.solve()?;
    Ok((solver.final_positions(), report))
}
