//! Constrained stress majorization.
//!
//! Stress is `sum_{i<j} w_ij (|p_i - p_j| - d_ij)^2` with `d_ij` the shortest path length
//! between nodes and `w_ij = d_ij^-2`. Each iteration minimizes the majorizing quadratic per
//! axis with conjugate gradient, then projects the result onto the separation constraints
//! (directed edges, non-overlap) with VPSC.

use nalgebra::{DMatrix, DVector};
use vpsc::{Constraint, OverlapRemoval, Rectangle, SolverOptions, Variable};

use crate::conjugate_gradient::{CgScratch, solve_in_place_with};
use crate::error::Result;
use crate::options::{InitialPlacement, LayoutOptions};
use crate::rng::XorShift64Star;
use crate::shortest_paths;

// Distances below this are treated as coincident positions.
const COINCIDENT: f64 = 1e-9;
// Amplitude of the noise used to separate coincident nodes, relative to the ideal edge length.
const JITTER: f64 = 0.1;
// Stress is dimensionless; changes below this fraction of it are noise.
const STRESS_FLOOR: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    MajorizeStep,
    ConstrainStep,
    Converged,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutReport {
    pub iterations: usize,
    pub stress: f64,
    /// `false` when the iteration cap was hit before the stress settled.
    pub converged: bool,
}

impl LayoutReport {
    /// Folds the report of another independently laid out part into this one.
    pub fn merge(&mut self, other: &LayoutReport) {
        self.iterations = self.iterations.max(other.iterations);
        self.stress += other.stress;
        self.converged &= other.converged;
    }
}

/// Stress majorization over one connected set of nodes.
///
/// Node `i` is `rects[i]`; its center is the position being optimized and its extents are only
/// used for overlap avoidance. Drive it with [`StressMajorization::step`] or run it to the end
/// with [`StressMajorization::run`].
#[derive(Debug, Clone)]
pub struct StressMajorization {
    rects: Vec<Rectangle>,
    edges: Vec<(usize, usize, f64)>,
    directed: Vec<Constraint>,
    options: LayoutOptions,

    x: DVector<f64>,
    y: DVector<f64>,
    dist: DMatrix<f64>,
    weights: DMatrix<f64>,
    // L_w + s * I
    lap: DMatrix<f64>,
    lz: DMatrix<f64>,
    rhs: DVector<f64>,
    scratch: CgScratch,

    phase: Phase,
    stress: f64,
    iterations: usize,
    converged: bool,
}

impl StressMajorization {
    /// `edges` are undirected `(a, b, ideal_length)` triples. `directed_edges` get a vertical
    /// separation constraint `y_b - y_a >= options.directed_edge_gap()`; they must not form a
    /// cycle.
    pub fn new(
        rects: Vec<Rectangle>,
        edges: &[(usize, usize, f64)],
        directed_edges: &[(usize, usize)],
        options: &LayoutOptions,
    ) -> Self {
        let n = rects.len();
        let gap = options.directed_edge_gap();
        Self {
            rects,
            edges: edges.to_vec(),
            directed: directed_edges
                .iter()
                .filter(|(a, b)| a != b)
                .map(|&(a, b)| Constraint::new(a, b, gap))
                .collect(),
            options: options.clone(),
            x: DVector::zeros(n),
            y: DVector::zeros(n),
            dist: DMatrix::zeros(n, n),
            weights: DMatrix::zeros(n, n),
            lap: DMatrix::zeros(n, n),
            lz: DMatrix::zeros(n, n),
            rhs: DVector::zeros(n),
            scratch: CgScratch::new(n),
            phase: Phase::Initializing,
            stress: 0.0,
            iterations: 0,
            converged: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stress(&self) -> f64 {
        self.stress
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Ideal distances used for the stress; only meaningful after initialization.
    pub fn ideal_distances(&self) -> &DMatrix<f64> {
        &self.dist
    }

    /// Node rectangles moved to the current positions.
    pub fn rectangles(&self) -> Vec<Rectangle> {
        let mut out = self.rects.clone();
        for (i, r) in out.iter_mut().enumerate() {
            r.move_center_x(self.x[i]);
            r.move_center_y(self.y[i]);
        }
        out
    }

    pub fn report(&self) -> LayoutReport {
        LayoutReport {
            iterations: self.iterations,
            stress: self.stress,
            converged: self.converged,
        }
    }

    /// Runs the remaining phases until [`Phase::Converged`].
    pub fn run(&mut self) -> Result<LayoutReport> {
        let span = tracing::debug_span!(
            "stress_majorization",
            nodes = self.rects.len(),
            edges = self.edges.len(),
            directed = self.directed.len()
        );
        let _guard = span.enter();

        while self.phase != Phase::Converged {
            self.step()?;
        }
        tracing::debug!(
            iterations = self.iterations,
            stress = self.stress,
            converged = self.converged,
            "stress majorization finished"
        );
        Ok(self.report())
    }

    /// Advances by one phase and returns the phase that comes next.
    pub fn step(&mut self) -> Result<Phase> {
        self.phase = match self.phase {
            Phase::Initializing => self.initialize(),
            Phase::MajorizeStep => self.majorize(),
            Phase::ConstrainStep => self.constrain()?,
            Phase::Converged => Phase::Converged,
        };
        Ok(self.phase)
    }

    fn initialize(&mut self) -> Phase {
        let n = self.rects.len();
        for (i, r) in self.rects.iter().enumerate() {
            self.x[i] = r.center_x;
            self.y[i] = r.center_y;
        }
        if n < 2 {
            self.converged = true;
            return Phase::Converged;
        }

        match self.options.initial_placement {
            InitialPlacement::FromGraph => self.spread_coincident(),
            InitialPlacement::Circle => self.place_on_circle(),
        }
        self.compute_distances();

        let s = self.sticky();
        for i in 0..n {
            let mut diag = 0.0;
            for j in 0..n {
                if i != j {
                    self.lap[(i, j)] = -self.weights[(i, j)];
                    diag += self.weights[(i, j)];
                }
            }
            self.lap[(i, i)] = diag + s;
        }

        self.stress = self.compute_stress();
        tracing::trace!(stress = self.stress, "initial stress");
        Phase::MajorizeStep
    }

    // Scaled by the weight of an edge at its ideal length.
    fn sticky(&self) -> f64 {
        let ideal = self.options.ideal_edge_length;
        self.options.sticky_weight / (ideal * ideal)
    }

    fn spread_coincident(&mut self) {
        let n = self.x.len();
        let amplitude = self.options.ideal_edge_length * JITTER;
        let mut rng = XorShift64Star::new(self.options.random_seed);
        let mut seen: rustc_hash::FxHashSet<(u64, u64)> = rustc_hash::FxHashSet::default();
        for i in 0..n {
            if !seen.insert((self.x[i].to_bits(), self.y[i].to_bits())) {
                self.x[i] += amplitude * rng.next_f64_signed();
                self.y[i] += amplitude * rng.next_f64_signed();
            }
        }

        // Majorization never leaves a line all nodes start on.
        if n > 2 {
            let flat_x = (1..n).all(|i| (self.x[i] - self.x[0]).abs() < COINCIDENT);
            let flat_y = (1..n).all(|i| (self.y[i] - self.y[0]).abs() < COINCIDENT);
            if flat_x {
                for i in 0..n {
                    self.x[i] += amplitude * rng.next_f64_signed();
                }
            }
            if flat_y {
                for i in 0..n {
                    self.y[i] += amplitude * rng.next_f64_signed();
                }
            }
        }
    }

    fn place_on_circle(&mut self) {
        let n = self.x.len();
        let cx = self.x.mean();
        let cy = self.y.mean();
        let radius = self.options.ideal_edge_length * (n as f64) / std::f64::consts::TAU;
        for i in 0..n {
            let angle = std::f64::consts::TAU * (i as f64) / (n as f64);
            self.x[i] = cx + radius * angle.cos();
            self.y[i] = cy + radius * angle.sin();
        }
    }

    fn compute_distances(&mut self) {
        let n = self.x.len();
        self.dist = shortest_paths::all_pairs(n, &self.edges);
        let max_finite = self
            .dist
            .iter()
            .copied()
            .filter(|d| d.is_finite())
            .fold(0.0, f64::max);
        let unreachable = max_finite + self.options.ideal_edge_length;
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let mut d = self.dist[(i, j)];
                if !d.is_finite() {
                    d = unreachable;
                    self.dist[(i, j)] = d;
                }
                self.weights[(i, j)] = if d > 0.0 { 1.0 / (d * d) } else { 0.0 };
            }
        }
    }

    fn compute_stress(&self) -> f64 {
        let n = self.x.len();
        let mut stress = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                let dx = self.x[i] - self.x[j];
                let dy = self.y[i] - self.y[j];
                let diff = (dx * dx + dy * dy).sqrt() - self.dist[(i, j)];
                stress += self.weights[(i, j)] * diff * diff;
            }
        }
        stress
    }

    fn majorize(&mut self) -> Phase {
        let n = self.x.len();
        for i in 0..n {
            let mut diag = 0.0;
            for j in 0..n {
                if i == j {
                    continue;
                }
                let dx = self.x[i] - self.x[j];
                let dy = self.y[i] - self.y[j];
                let norm = (dx * dx + dy * dy).sqrt();
                let v = if norm > COINCIDENT {
                    -self.weights[(i, j)] * self.dist[(i, j)] / norm
                } else {
                    0.0
                };
                self.lz[(i, j)] = v;
                diag -= v;
            }
            self.lz[(i, i)] = diag;
        }

        let max_it = match self.options.cg_max_iterations {
            0 => n,
            m => m,
        };
        let s = self.sticky();

        // Both right-hand sides use the positions from before this step.
        let z_x = self.x.clone();
        let z_y = self.y.clone();
        for (axis, z) in [(&mut self.x, z_x), (&mut self.y, z_y)] {
            self.lz.mul_to(&z, &mut self.rhs);
            self.rhs.axpy(s, &z, 1.0);
            let tol = self.options.cg_tolerance * self.rhs.norm();
            let outcome =
                solve_in_place_with(&mut self.scratch, &self.lap, axis, &self.rhs, tol, max_it);
            tracing::trace!(
                iterations = outcome.iterations(),
                residual = outcome.residual(),
                "majorization solve"
            );
        }
        Phase::ConstrainStep
    }

    fn constrain(&mut self) -> Result<Phase> {
        if self.options.avoid_overlaps {
            let mut rects = self.rectangles();
            OverlapRemoval::new(self.options.x_border, self.options.y_border)
                .with_y_constraints(self.directed.clone())
                .apply(&mut rects)?;
            for (i, r) in rects.iter().enumerate() {
                self.x[i] = r.center_x;
                self.y[i] = r.center_y;
            }
        } else if !self.directed.is_empty() {
            let vars = self.y.iter().map(|&y| Variable::new(y, 1.0)).collect();
            let (ys, _) =
                vpsc::solve_positions(vars, self.directed.clone(), SolverOptions::default())?;
            for (i, y) in ys.into_iter().enumerate() {
                self.y[i] = y;
            }
        }

        let previous = self.stress;
        self.stress = self.compute_stress();
        self.iterations += 1;
        tracing::trace!(
            iteration = self.iterations,
            stress = self.stress,
            "majorization iteration"
        );

        let change = (previous - self.stress).abs();
        if change <= self.options.tolerance * (self.stress + STRESS_FLOOR) {
            self.converged = true;
            return Ok(Phase::Converged);
        }
        if self.iterations >= self.options.max_iterations {
            return Ok(Phase::Converged);
        }
        Ok(Phase::MajorizeStep)
    }
}
