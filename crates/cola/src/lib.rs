#![forbid(unsafe_code)]

//! Headless constraint-based graph layout.
//!
//! Node positions come from stress majorization: ideal distances are shortest path lengths, and
//! each iteration solves one linear system per axis with conjugate gradient. The result of every
//! iteration is projected onto separation constraints with [`vpsc`], which keeps nodes from
//! overlapping and, for directed layouts, points acyclic edges downwards. Edges on directed
//! cycles are found by [`CycleDetector`] and left unconstrained.

mod components;
pub mod conjugate_gradient;
pub mod cycle_detector;
pub mod error;
pub mod graph;
mod layout;
pub mod majorization;
pub mod options;
mod rng;
pub mod shortest_paths;

pub use conjugate_gradient::{CgOutcome, CgScratch, conjugate_gradient};
pub use cycle_detector::CycleDetector;
pub use error::{Error, Result};
pub use graph::{Edge, Graph, LayoutResult, Node, Point};
pub use layout::graph_layout;
pub use majorization::{LayoutReport, Phase, StressMajorization};
pub use options::{InitialPlacement, LayoutOptions};
