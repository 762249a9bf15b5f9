//! Minimal-movement rectangle overlap removal.
//!
//! Three VPSC passes:
//!
//! 1. a provisional horizontal pass that only separates neighbours which overlap less in x than
//!    in y, to decide which pairs are better pulled apart horizontally;
//! 2. a vertical pass over the provisionally moved rectangles, after which x is restored;
//! 3. a final horizontal pass for whatever still overlaps.
//!
//! The first two passes use a slightly larger border (`EXTRA_GAP`) so that rectangles moved
//! to be exactly adjacent are not considered overlapping afterwards. A pass whose constraints
//! already hold at the plain border moves nothing, so a layout without overlaps is left as it
//! is.

use crate::constraint::Constraint;
use crate::error::Result;
use crate::generate::{Axis, generate_constraints};
use crate::rectangle::Rectangle;
use crate::solver::{SolveReport, SolverOptions, ZERO_UPPERBOUND};
use crate::variable::Variable;

pub const EXTRA_GAP: f64 = 1e-4;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlapReport {
    /// One report per VPSC pass, in execution order (provisional x, y, final x).
    pub passes: Vec<SolveReport>,
}

impl OverlapReport {
    pub fn converged(&self) -> bool {
        self.passes.iter().all(|p| p.converged)
    }

    pub fn unsatisfiable(&self) -> usize {
        self.passes.iter().map(|p| p.unsatisfiable.len()).sum()
    }
}

/// Overlap removal with optional extra separation constraints per axis.
///
/// Extra constraints use rectangle indices as variable indices. They are added to both
/// horizontal passes (x) or to the vertical pass (y).
#[derive(Debug, Clone, Default)]
pub struct OverlapRemoval {
    x_border: f64,
    y_border: f64,
    weights: Option<Vec<f64>>,
    x_constraints: Vec<Constraint>,
    y_constraints: Vec<Constraint>,
    options: SolverOptions,
}

impl OverlapRemoval {
    pub fn new(x_border: f64, y_border: f64) -> Self {
        Self {
            x_border,
            y_border,
            ..Default::default()
        }
    }

    pub fn with_x_constraints(mut self, cs: Vec<Constraint>) -> Self {
        self.x_constraints = cs;
        self
    }

    pub fn with_y_constraints(mut self, cs: Vec<Constraint>) -> Self {
        self.y_constraints = cs;
        self
    }

    /// Per-rectangle weights; heavier rectangles move less. Defaults to `1.0` for all.
    pub fn with_weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn with_solver_options(mut self, options: SolverOptions) -> Self {
        self.options = options;
        self
    }

    pub fn apply(&self, rects: &mut [Rectangle]) -> Result<OverlapReport> {
        let mut report = OverlapReport::default();
        if rects.len() < 2 && self.x_constraints.is_empty() && self.y_constraints.is_empty() {
            return Ok(report);
        }
        let span = tracing::debug_span!(
            "remove_rectangle_overlap",
            rects = rects.len(),
            x_border = self.x_border,
            y_border = self.y_border
        );
        let _guard = span.enter();

        let original_x: Vec<f64> = rects.iter().map(|r| r.center_x).collect();

        let (xs, r) = self.pass(rects, Axis::Horizontal, EXTRA_GAP, true)?;
        report.passes.push(r);
        for (rect, x) in rects.iter_mut().zip(xs) {
            rect.move_center_x(x);
        }

        let (ys, r) = self.pass(rects, Axis::Vertical, EXTRA_GAP, false)?;
        report.passes.push(r);
        for ((rect, y), x) in rects.iter_mut().zip(ys).zip(&original_x) {
            rect.move_center_y(y);
            rect.move_center_x(*x);
        }

        let (xs, r) = self.pass(rects, Axis::Horizontal, 0.0, false)?;
        report.passes.push(r);
        for (rect, x) in rects.iter_mut().zip(xs) {
            rect.move_center_x(x);
        }

        tracing::debug!(
            converged = report.converged(),
            unsatisfiable = report.unsatisfiable(),
            "overlap removal finished"
        );
        Ok(report)
    }

    /// One VPSC pass along `axis`. Pair selection and the solved gaps use the border plus
    /// `extra`; a pass whose constraints already hold without `extra` leaves positions alone.
    fn pass(
        &self,
        rects: &[Rectangle],
        axis: Axis,
        extra: f64,
        use_neighbour_lists: bool,
    ) -> Result<(Vec<f64>, SolveReport)> {
        let (x_border, y_border, user) = match axis {
            Axis::Horizontal => (self.x_border + extra, self.y_border, &self.x_constraints),
            Axis::Vertical => (self.x_border, self.y_border + extra, &self.y_constraints),
        };
        let bordered: Vec<Rectangle> =
            rects.iter().map(|r| r.expanded(x_border, y_border)).collect();
        let mut cs = generate_constraints(&bordered, axis, use_neighbour_lists);
        let generated = cs.len();
        cs.extend(user.iter().cloned());

        let centers: Vec<f64> = rects.iter().map(|r| axis.center(r)).collect();
        let holds = cs.iter().enumerate().all(|(i, c)| {
            let gap = if i < generated { c.gap - extra } else { c.gap };
            let (Some(l), Some(r)) = (centers.get(c.left), centers.get(c.right)) else {
                return false;
            };
            let slack = r - l - gap;
            if c.equality {
                slack.abs() <= -ZERO_UPPERBOUND
            } else {
                slack >= ZERO_UPPERBOUND
            }
        });
        if holds {
            tracing::trace!(?axis, constraints = cs.len(), "overlap pass already satisfied");
            return Ok((
                centers,
                SolveReport {
                    converged: true,
                    ..Default::default()
                },
            ));
        }
        self.solve_axis(rects, axis, cs)
    }

    fn solve_axis(
        &self,
        rects: &[Rectangle],
        axis: Axis,
        cs: Vec<Constraint>,
    ) -> Result<(Vec<f64>, SolveReport)> {
        let vars: Vec<Variable> = rects
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let weight = self
                    .weights
                    .as_ref()
                    .and_then(|w| w.get(i).copied())
                    .unwrap_or(1.0);
                Variable::new(axis.center(r), weight)
            })
            .collect();
        tracing::trace!(?axis, constraints = cs.len(), "overlap pass");
        crate::solve_positions(vars, cs, self.options)
    }
}

/// Moves `rects` as little as possible (in the weighted least-squares sense) so that no two
/// overlap, keeping at least `x_border` / `y_border` between them.
pub fn remove_rectangle_overlap(
    rects: &mut [Rectangle],
    x_border: f64,
    y_border: f64,
) -> Result<OverlapReport> {
    OverlapRemoval::new(x_border, y_border).apply(rects)
}

/// Like [`remove_rectangle_overlap`] but leaves the input untouched.
pub fn removed_rectangle_overlap(
    rects: &[Rectangle],
    x_border: f64,
    y_border: f64,
) -> Result<(Vec<Rectangle>, OverlapReport)> {
    let mut out = rects.to_vec();
    let report = remove_rectangle_overlap(&mut out, x_border, y_border)?;
    Ok((out, report))
}
