use serde::Deserialize;

use crate::error::{Error, Result};

/// How node positions are seeded before the first majorization step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialPlacement {
    /// Start from the positions stored on the graph nodes. Nodes sharing a position are
    /// spread apart with a little seeded noise.
    #[default]
    FromGraph,
    /// Place every component's nodes evenly on a circle around its original center.
    Circle,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    /// Target length of an edge without an explicit `length`.
    pub ideal_edge_length: f64,
    /// Point edges downwards: every edge that is not on a directed cycle gets a vertical
    /// separation constraint.
    pub directed: bool,
    pub avoid_overlaps: bool,
    /// Vertical separation of directed edges, as a multiple of `ideal_edge_length`.
    pub directed_edge_height_modifier: f64,
    /// Minimum horizontal clearance between nodes when avoiding overlaps.
    pub x_border: f64,
    /// Minimum vertical clearance between nodes when avoiding overlaps.
    pub y_border: f64,
    /// Clearance kept between the bounding boxes of disconnected components.
    pub component_gap: f64,
    pub max_iterations: usize,
    /// Stress change, relative to the current stress, below which the layout counts as
    /// converged.
    pub tolerance: f64,
    /// Residual tolerance of the inner solves, relative to the norm of the right-hand side.
    pub cg_tolerance: f64,
    /// `0` means one iteration per node.
    pub cg_max_iterations: usize,
    /// Pull towards the previous positions added to the diagonal of the majorization system,
    /// in units of the weight of an edge at `ideal_edge_length`. Keeps it positive definite.
    pub sticky_weight: f64,
    pub initial_placement: InitialPlacement,
    pub random_seed: u64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            ideal_edge_length: 100.0,
            directed: false,
            avoid_overlaps: true,
            directed_edge_height_modifier: 1.0,
            x_border: 0.0,
            y_border: 0.0,
            component_gap: 25.0,
            max_iterations: 200,
            tolerance: 1e-4,
            cg_tolerance: 1e-6,
            cg_max_iterations: 0,
            sticky_weight: 1e-4,
            initial_placement: InitialPlacement::FromGraph,
            random_seed: 1,
        }
    }
}

impl LayoutOptions {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("ideal_edge_length", self.ideal_edge_length),
            ("sticky_weight", self.sticky_weight),
        ];
        for (name, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return Err(Error::InvalidOption {
                    name,
                    reason: "must be finite and positive",
                });
            }
        }
        let non_negative = [
            (
                "directed_edge_height_modifier",
                self.directed_edge_height_modifier,
            ),
            ("x_border", self.x_border),
            ("y_border", self.y_border),
            ("component_gap", self.component_gap),
            ("tolerance", self.tolerance),
            ("cg_tolerance", self.cg_tolerance),
        ];
        for (name, v) in non_negative {
            if !(v.is_finite() && v >= 0.0) {
                return Err(Error::InvalidOption {
                    name,
                    reason: "must be finite and non-negative",
                });
            }
        }
        Ok(())
    }

    pub(crate) fn directed_edge_gap(&self) -> f64 {
        self.ideal_edge_length * self.directed_edge_height_modifier
    }
}

#[cfg(test)]
mod tests {
    use super::{InitialPlacement, LayoutOptions};
    use crate::Error;

    #[test]
    fn partial_config_keeps_defaults() {
        let opts: LayoutOptions = serde_json::from_str(
            r#"{ "ideal_edge_length": 60, "directed": true, "initial_placement": "circle" }"#,
        )
        .unwrap();
        assert_eq!(opts.ideal_edge_length, 60.0);
        assert!(opts.directed);
        assert_eq!(opts.initial_placement, InitialPlacement::Circle);
        assert!(opts.avoid_overlaps);
        assert_eq!(opts.max_iterations, 200);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn non_positive_edge_length_is_rejected() {
        let opts = LayoutOptions {
            ideal_edge_length: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            opts.validate(),
            Err(Error::InvalidOption {
                name: "ideal_edge_length",
                ..
            })
        ));
    }
}
