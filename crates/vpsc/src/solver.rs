//! Incremental VPSC solver.
//!
//! Finds positions minimizing `sum(weight * (position - desired)^2)` subject to separation
//! constraints by maintaining blocks of variables joined by active constraints: violated
//! constraints merge blocks, active constraints with negative Lagrange multipliers split them.

use crate::block::Blocks;
use crate::constraint::Constraint;
use crate::error::{Error, Result};
use crate::variable::Variable;

/// Slack below this counts as a violation.
pub const ZERO_UPPERBOUND: f64 = -1e-10;
/// Active constraints whose multiplier drops below this are split.
pub const LAGRANGIAN_TOLERANCE: f64 = -1e-4;

#[derive(Debug, Clone, Copy, serde::Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// Upper bound on `satisfy` passes in [`IncSolver::solve`].
    pub max_passes: usize,
    /// `solve` stops once the cost changes by no more than this between passes.
    pub cost_tolerance: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_passes: 100,
            cost_tolerance: 1e-4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolveReport {
    pub passes: usize,
    /// `false` when `max_passes` ran out before the cost settled.
    pub converged: bool,
    pub cost: f64,
    pub active_constraints: usize,
    /// Constraints relaxed because they would have closed a cycle of active constraints.
    pub unsatisfiable: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct IncSolver {
    blocks: Blocks,
    inactive: Vec<usize>,
    options: SolverOptions,
}

impl IncSolver {
    pub fn new(vars: Vec<Variable>, cs: Vec<Constraint>) -> Result<Self> {
        Self::with_options(vars, cs, SolverOptions::default())
    }

    pub fn with_options(
        vars: Vec<Variable>,
        cs: Vec<Constraint>,
        options: SolverOptions,
    ) -> Result<Self> {
        for (i, v) in vars.iter().enumerate() {
            v.validate(i)?;
        }
        for (i, c) in cs.iter().enumerate() {
            c.validate(i, vars.len())?;
        }
        let inactive = (0..cs.len()).collect();
        Ok(Self {
            blocks: Blocks::new(vars, cs),
            inactive,
            options,
        })
    }

    pub fn variables(&self) -> &[Variable] {
        &self.blocks.vars
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.blocks.cs
    }

    pub fn final_positions(&self) -> Vec<f64> {
        self.blocks.vars.iter().map(|v| v.final_position).collect()
    }

    pub fn into_parts(self) -> (Vec<Variable>, Vec<Constraint>) {
        (self.blocks.vars, self.blocks.cs)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.live.len()
    }

    pub fn cost(&self) -> f64 {
        self.blocks.cost()
    }

    /// Changes the desired position of a variable between passes; the next `satisfy`/`solve`
    /// starts from the current block structure.
    pub fn set_desired_position(&mut self, v: usize, desired: f64) {
        self.blocks.vars[v].desired_position = desired;
    }

    /// Runs `satisfy` until the cost settles, then writes `final_position` of every variable.
    pub fn solve(&mut self) -> Result<SolveReport> {
        let span = tracing::debug_span!(
            "vpsc_solve",
            vars = self.blocks.vars.len(),
            constraints = self.blocks.cs.len()
        );
        let _guard = span.enter();

        self.satisfy()?;
        let mut passes = 1;
        let mut last_cost = f64::MAX;
        let mut cost = self.blocks.cost();
        while (last_cost - cost).abs() > self.options.cost_tolerance {
            if passes >= self.options.max_passes {
                break;
            }
            self.satisfy()?;
            passes += 1;
            last_cost = cost;
            cost = self.blocks.cost();
        }
        let converged = (last_cost - cost).abs() <= self.options.cost_tolerance;
        self.copy_result();

        let report = SolveReport {
            passes,
            converged,
            cost,
            active_constraints: self.blocks.cs.iter().filter(|c| c.active).count(),
            unsatisfiable: self
                .blocks
                .cs
                .iter()
                .enumerate()
                .filter(|(_, c)| c.unsatisfiable)
                .map(|(i, _)| i)
                .collect(),
        };
        tracing::debug!(
            passes,
            converged,
            cost,
            blocks = self.blocks.live.len(),
            active = report.active_constraints,
            unsatisfiable = report.unsatisfiable.len(),
            "vpsc solve finished"
        );
        Ok(report)
    }

    /// Makes every constraint hold: splits blocks with negative multipliers, then merges across
    /// the most violated constraint until none is violated.
    ///
    /// Returns whether any constraint ended up active.
    pub fn satisfy(&mut self) -> Result<bool> {
        self.split_blocks();

        while let Some(c) = self.most_violated() {
            let (left, right) = (self.blocks.cs[c].left, self.blocks.cs[c].right);
            let lb = self.blocks.block_of(left);
            let rb = self.blocks.block_of(right);
            if lb != rb {
                self.blocks.merge(c);
            } else {
                if self.blocks.is_active_directed_path_between(lb, right, left) {
                    tracing::debug!(constraint = c, "relaxing constraint that closes a cycle");
                    self.blocks.cs[c].unsatisfiable = true;
                    continue;
                }
                let Some((split_c, l, r)) = self.blocks.split_between(lb, left, right) else {
                    tracing::debug!(constraint = c, "no split point between endpoints");
                    self.blocks.cs[c].unsatisfiable = true;
                    continue;
                };
                debug_assert!(!self.blocks.cs[split_c].active);
                self.inactive.push(split_c);
                if self.blocks.slack(c) >= 0.0 {
                    // The split alone satisfied `c`.
                    self.inactive.push(c);
                    self.blocks.live.insert(l);
                    self.blocks.live.insert(r);
                } else {
                    let merged = self.blocks.merge(c);
                    self.blocks.live.insert(merged);
                }
            }
            self.blocks.cleanup();
        }
        self.blocks.cleanup();

        let mut any_active = false;
        for (i, c) in self.blocks.cs.iter().enumerate() {
            any_active |= c.active;
            let slack = self.blocks.slack(i);
            if slack < ZERO_UPPERBOUND {
                return Err(Error::UnsatisfiedConstraint { index: i, slack });
            }
        }
        self.copy_result();
        Ok(any_active)
    }

    fn split_blocks(&mut self) {
        let live: Vec<usize> = self.blocks.live.iter().copied().collect();
        for &b in &live {
            self.blocks.update_weighted_position(b);
        }
        for b in live {
            let Some(c) = self.blocks.find_min_lm(b) else {
                continue;
            };
            if self.blocks.cs[c].lm >= LAGRANGIAN_TOLERANCE {
                continue;
            }
            debug_assert!(!self.blocks.cs[c].equality);
            let (l, r) = self.blocks.split(b, c);
            self.blocks.update_weighted_position(l);
            self.blocks.update_weighted_position(r);
            self.blocks.live.insert(l);
            self.blocks.live.insert(r);
            self.blocks.mark_deleted(b);
            self.inactive.push(c);
        }
        self.blocks.cleanup();
    }

    /// Picks the next constraint to process and removes it from the inactive list. Equality
    /// constraints come first; otherwise the smallest slack wins, ties going to the lowest
    /// constraint index. Returns `None` once nothing is violated.
    fn most_violated(&mut self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        let mut best_pos = 0;
        for (pos, &c) in self.inactive.iter().enumerate() {
            let con = &self.blocks.cs[c];
            let slack = self.blocks.slack(c);
            let better = match best {
                None => true,
                Some((b, b_slack)) => {
                    let b_eq = self.blocks.cs[b].equality;
                    match (con.equality, b_eq) {
                        (true, false) => true,
                        (false, true) => false,
                        (true, true) => c < b,
                        (false, false) => slack < b_slack || (slack == b_slack && c < b),
                    }
                }
            };
            if better {
                best = Some((c, slack));
                best_pos = pos;
            }
        }

        let (c, slack) = best?;
        let con = &self.blocks.cs[c];
        if con.equality || (slack < ZERO_UPPERBOUND && !con.active) {
            self.inactive.swap_remove(best_pos);
            Some(c)
        } else {
            None
        }
    }

    fn copy_result(&mut self) {
        for v in 0..self.blocks.vars.len() {
            let p = self.blocks.position(v);
            debug_assert!(!p.is_nan(), "variable {v} has a NaN position");
            self.blocks.vars[v].final_position = p;
        }
    }
}
