use crate::error::{Error, Result};

/// A separation constraint `right - left >= gap` (or `== gap` for equalities) between two
/// variables, addressed by their index in the solver's variable list.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub left: usize,
    pub right: usize,
    pub gap: f64,
    pub equality: bool,

    pub(crate) active: bool,
    pub(crate) lm: f64,
    pub(crate) unsatisfiable: bool,
}

impl Constraint {
    pub fn new(left: usize, right: usize, gap: f64) -> Self {
        Self {
            left,
            right,
            gap,
            equality: false,
            active: false,
            lm: 0.0,
            unsatisfiable: false,
        }
    }

    pub fn equality(left: usize, right: usize, gap: f64) -> Self {
        Self {
            equality: true,
            ..Self::new(left, right, gap)
        }
    }

    /// Whether the constraint is currently tight and holds two variables in one block.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Lagrange multiplier from the last multiplier computation that touched this constraint.
    pub fn lagrange_multiplier(&self) -> f64 {
        self.lm
    }

    /// Set when the constraint closed a cycle of active constraints and had to be relaxed.
    pub fn is_unsatisfiable(&self) -> bool {
        self.unsatisfiable
    }

    pub(crate) fn reset(&mut self) {
        self.active = false;
        self.lm = 0.0;
        self.unsatisfiable = false;
    }

    pub(crate) fn validate(&self, index: usize, var_count: usize) -> Result<()> {
        for variable in [self.left, self.right] {
            if variable >= var_count {
                return Err(Error::MissingVariable {
                    index,
                    variable,
                    count: var_count,
                });
            }
        }
        if !self.gap.is_finite() {
            return Err(Error::InvalidGap { index });
        }
        Ok(())
    }
}
