use crate::error::{Error, Result};
use crate::majorization::LayoutReport;

#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn validate(&self) -> Result<()> {
        let mut node_exists: std::collections::BTreeSet<&str> = std::collections::BTreeSet::new();
        for n in &self.nodes {
            if !node_exists.insert(n.id.as_str()) {
                return Err(Error::DuplicateNode {
                    node_id: n.id.clone(),
                });
            }
            n.validate()?;
        }
        for e in &self.edges {
            if !node_exists.contains(e.source.as_str()) || !node_exists.contains(e.target.as_str())
            {
                return Err(Error::MissingEndpoint {
                    edge_id: e.id.clone(),
                });
            }
            if let Some(len) = e.length {
                if !(len.is_finite() && len > 0.0) {
                    return Err(Error::InvalidGeometry {
                        id: e.id.clone(),
                        reason: "edge length must be finite and positive",
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub width: f64,
    pub height: f64,
    /// Initial position (center).
    pub x: f64,
    pub y: f64,
}

impl Node {
    fn validate(&self) -> Result<()> {
        let reason = if !(self.width.is_finite() && self.height.is_finite()) {
            "size is not finite"
        } else if self.width < 0.0 || self.height < 0.0 {
            "size is negative"
        } else if !(self.x.is_finite() && self.y.is_finite()) {
            "position is not finite"
        } else {
            return Ok(());
        };
        Err(Error::InvalidGeometry {
            id: self.id.clone(),
            reason,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    /// Ideal length for this edge; `None` uses `LayoutOptions::ideal_edge_length`.
    pub length: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone)]
pub struct LayoutResult {
    pub positions: std::collections::BTreeMap<String, Point>,
    /// Ids of edges that lie on a directed cycle (only filled for directed layouts).
    pub cyclic_edges: Vec<String>,
    /// Number of connected components laid out independently.
    pub components: usize,
    pub report: LayoutReport,
}
