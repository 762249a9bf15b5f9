use crate::error::{Error, Result};

/// A scalar position on one axis.
///
/// `desired_position` and `weight` describe the objective term
/// `weight * (position - desired_position)^2`. `scale` lets a variable take part in scaled
/// separation constraints (`right.scale * right - left.scale * left >= gap`); most callers leave
/// it at `1.0`.
#[derive(Debug, Clone)]
pub struct Variable {
    pub desired_position: f64,
    pub weight: f64,
    pub scale: f64,
    /// Written by the solver once a pass completes.
    pub final_position: f64,

    // Position relative to the owning block's reference position.
    pub(crate) offset: f64,
    pub(crate) block: usize,
    pub(crate) in_cs: Vec<usize>,
    pub(crate) out_cs: Vec<usize>,
}

impl Variable {
    pub fn new(desired_position: f64, weight: f64) -> Self {
        Self {
            desired_position,
            weight,
            scale: 1.0,
            final_position: desired_position,
            offset: 0.0,
            block: usize::MAX,
            in_cs: Vec::new(),
            out_cs: Vec::new(),
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub(crate) fn validate(&self, index: usize) -> Result<()> {
        if !self.desired_position.is_finite() {
            return Err(Error::InvalidVariable {
                index,
                reason: "desired position is not finite",
            });
        }
        if !(self.weight.is_finite() && self.weight >= 0.0) {
            return Err(Error::InvalidVariable {
                index,
                reason: "weight must be finite and non-negative",
            });
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(Error::InvalidVariable {
                index,
                reason: "scale must be finite and positive",
            });
        }
        Ok(())
    }
}
