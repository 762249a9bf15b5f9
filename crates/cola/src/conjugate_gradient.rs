//! Unpreconditioned conjugate gradient for symmetric positive definite systems `A x = b`.

use nalgebra::{DMatrix, DVector};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CgOutcome {
    /// `‖b - A x‖ <= tol` was reached.
    Converged { iterations: usize, residual: f64 },
    /// Stopped on the iteration cap, or (release builds only) because the matrix is not
    /// positive definite along the current search direction.
    MaxIterationsReached { iterations: usize, residual: f64 },
}

impl CgOutcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, CgOutcome::Converged { .. })
    }

    pub fn iterations(&self) -> usize {
        match *self {
            CgOutcome::Converged { iterations, .. }
            | CgOutcome::MaxIterationsReached { iterations, .. } => iterations,
        }
    }

    pub fn residual(&self) -> f64 {
        match *self {
            CgOutcome::Converged { residual, .. }
            | CgOutcome::MaxIterationsReached { residual, .. } => residual,
        }
    }
}

/// Work vectors for [`solve_in_place_with`], reusable across solves of any size.
#[derive(Debug, Clone)]
pub struct CgScratch {
    r: DVector<f64>,
    p: DVector<f64>,
    ap: DVector<f64>,
}

impl CgScratch {
    pub fn new(n: usize) -> Self {
        Self {
            r: DVector::zeros(n),
            p: DVector::zeros(n),
            ap: DVector::zeros(n),
        }
    }

    fn resize(&mut self, n: usize) {
        if self.r.len() != n {
            *self = Self::new(n);
        }
    }
}

impl Default for CgScratch {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Solves `A x = b` in place, starting from the current `x`. Stops once `‖b - A x‖ <= tol` or
/// after `max_iterations` iterations, whichever comes first.
///
/// # Panics
///
/// If the dimensions of `a`, `x` and `b` do not agree.
pub fn conjugate_gradient(
    a: &DMatrix<f64>,
    x: &mut DVector<f64>,
    b: &DVector<f64>,
    tol: f64,
    max_iterations: usize,
) {
    let _ = solve_in_place(a, x, b, tol, max_iterations);
}

/// Like [`conjugate_gradient`] but reports how the iteration ended.
pub fn solve_in_place(
    a: &DMatrix<f64>,
    x: &mut DVector<f64>,
    b: &DVector<f64>,
    tol: f64,
    max_iterations: usize,
) -> CgOutcome {
    let mut scratch = CgScratch::new(b.len());
    solve_in_place_with(&mut scratch, a, x, b, tol, max_iterations)
}

/// Pure variant: returns the solution instead of overwriting `x0`.
pub fn solve(
    a: &DMatrix<f64>,
    b: &DVector<f64>,
    x0: &DVector<f64>,
    tol: f64,
    max_iterations: usize,
) -> (DVector<f64>, CgOutcome) {
    let mut x = x0.clone();
    let outcome = solve_in_place(a, &mut x, b, tol, max_iterations);
    (x, outcome)
}

pub fn solve_in_place_with(
    scratch: &mut CgScratch,
    a: &DMatrix<f64>,
    x: &mut DVector<f64>,
    b: &DVector<f64>,
    tol: f64,
    max_iterations: usize,
) -> CgOutcome {
    let n = b.len();
    assert_eq!(a.nrows(), n, "matrix rows do not match the right-hand side");
    assert_eq!(a.ncols(), n, "matrix is not square");
    assert_eq!(x.len(), n, "initial guess does not match the right-hand side");
    scratch.resize(n);

    a.mul_to(&*x, &mut scratch.ap);
    scratch.r.copy_from(b);
    scratch.r -= &scratch.ap;
    let mut r_r = scratch.r.dot(&scratch.r);
    let tol_sq = tol * tol;

    let mut iterations = 0;
    let mut r_r_old = r_r;
    while iterations < max_iterations && r_r > tol_sq {
        if iterations == 0 {
            scratch.p.copy_from(&scratch.r);
        } else {
            let beta = r_r / r_r_old;
            scratch.p.axpy(1.0, &scratch.r, beta);
        }
        a.mul_to(&scratch.p, &mut scratch.ap);
        let p_ap = scratch.p.dot(&scratch.ap);
        if !(p_ap > 0.0) {
            debug_assert!(p_ap > 0.0, "matrix is not positive definite: p·Ap = {p_ap}");
            tracing::debug!(iterations, p_ap, "matrix is not positive definite along p");
            return CgOutcome::MaxIterationsReached {
                iterations,
                residual: r_r.sqrt(),
            };
        }
        let alpha = r_r / p_ap;
        x.axpy(alpha, &scratch.p, 1.0);
        scratch.r.axpy(-alpha, &scratch.ap, 1.0);
        r_r_old = r_r;
        r_r = scratch.r.dot(&scratch.r);
        iterations += 1;
        tracing::trace!(iterations, residual = r_r.sqrt(), "cg step");
    }

    let residual = r_r.sqrt();
    if r_r <= tol_sq {
        CgOutcome::Converged {
            iterations,
            residual,
        }
    } else {
        CgOutcome::MaxIterationsReached {
            iterations,
            residual,
        }
    }
}
