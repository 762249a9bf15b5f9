use rustc_hash::FxHashMap;
use vpsc::{Rectangle, remove_rectangle_overlap};

use crate::components::connected_components;
use crate::cycle_detector::CycleDetector;
use crate::error::Result;
use crate::graph::{Graph, LayoutResult, Point};
use crate::majorization::{LayoutReport, StressMajorization};
use crate::options::LayoutOptions;

/// Lays out `graph`: every connected component is placed by stress majorization (keeping its
/// original center), then the components are pushed apart so their bounding boxes keep
/// `component_gap` between them.
pub fn graph_layout(graph: &Graph, opts: &LayoutOptions) -> Result<LayoutResult> {
    graph.validate()?;
    opts.validate()?;
    let span = tracing::debug_span!(
        "graph_layout",
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        directed = opts.directed
    );
    let _guard = span.enter();

    let n = graph.nodes.len();
    let mut id_to_idx: FxHashMap<&str, usize> = FxHashMap::default();
    id_to_idx.reserve(n);
    for (idx, node) in graph.nodes.iter().enumerate() {
        id_to_idx.insert(node.id.as_str(), idx);
    }

    // Endpoints were checked by `validate`.
    let mut pairs: Vec<(usize, usize)> = Vec::with_capacity(graph.edges.len());
    let mut lengths: Vec<f64> = Vec::with_capacity(graph.edges.len());
    for e in &graph.edges {
        let (Some(&s), Some(&t)) = (
            id_to_idx.get(e.source.as_str()),
            id_to_idx.get(e.target.as_str()),
        ) else {
            continue;
        };
        pairs.push((s, t));
        lengths.push(e.length.unwrap_or(opts.ideal_edge_length));
    }

    let cyclic = if opts.directed {
        CycleDetector::new(n, &pairs).detect_cycles()
    } else {
        vec![false; pairs.len()]
    };
    let cyclic_edges: Vec<String> = graph
        .edges
        .iter()
        .zip(&cyclic)
        .filter(|(_, c)| **c)
        .map(|(e, _)| e.id.clone())
        .collect();

    let components = connected_components(n, &pairs);

    let mut local = vec![0usize; n];
    let mut component_of = vec![0usize; n];
    for (ci, comp) in components.iter().enumerate() {
        for (li, &v) in comp.iter().enumerate() {
            local[v] = li;
            component_of[v] = ci;
        }
    }

    let mut comp_edges: Vec<Vec<(usize, usize, f64)>> = vec![Vec::new(); components.len()];
    let mut comp_directed: Vec<Vec<(usize, usize)>> = vec![Vec::new(); components.len()];
    for (i, &(s, t)) in pairs.iter().enumerate() {
        if s == t {
            continue;
        }
        let ci = component_of[s];
        comp_edges[ci].push((local[s], local[t], lengths[i]));
        if opts.directed && !cyclic[i] {
            comp_directed[ci].push((local[s], local[t]));
        }
    }

    let mut rects: Vec<Rectangle> = graph
        .nodes
        .iter()
        .map(|node| Rectangle::new(node.x, node.y, node.width / 2.0, node.height / 2.0))
        .collect();

    let mut report = LayoutReport {
        converged: true,
        ..Default::default()
    };
    for (ci, comp) in components.iter().enumerate() {
        let comp_rects: Vec<Rectangle> = comp.iter().map(|&v| rects[v]).collect();
        let Some(orig_center) = bounding_box_center(&comp_rects) else {
            continue;
        };

        let mut layout =
            StressMajorization::new(comp_rects, &comp_edges[ci], &comp_directed[ci], opts);
        let comp_report = layout.run()?;
        report.merge(&comp_report);

        // Relocate to the original center.
        let mut placed = layout.rectangles();
        if let Some(new_center) = bounding_box_center(&placed) {
            let (dx, dy) = (orig_center.0 - new_center.0, orig_center.1 - new_center.1);
            for r in &mut placed {
                r.translate(dx, dy);
            }
        }
        for (&v, r) in comp.iter().zip(placed) {
            rects[v] = r;
        }
    }

    if components.len() > 1 {
        separate_components(&components, &mut rects, opts.component_gap)?;
    }

    let mut positions: std::collections::BTreeMap<String, Point> =
        std::collections::BTreeMap::new();
    for (node, r) in graph.nodes.iter().zip(&rects) {
        positions.insert(
            node.id.clone(),
            Point {
                x: r.center_x,
                y: r.center_y,
            },
        );
    }

    tracing::debug!(
        components = components.len(),
        cyclic = cyclic_edges.len(),
        iterations = report.iterations,
        stress = report.stress,
        converged = report.converged,
        "graph layout finished"
    );
    Ok(LayoutResult {
        positions,
        cyclic_edges,
        components: components.len(),
        report,
    })
}

fn bounding_box(rects: &[Rectangle]) -> Option<Rectangle> {
    let (first, rest) = rects.split_first()?;
    Some(rest.iter().fold(*first, |acc, r| acc.union(r)))
}

fn bounding_box_center(rects: &[Rectangle]) -> Option<(f64, f64)> {
    let bb = bounding_box(rects)?;
    if !(bb.center_x.is_finite() && bb.center_y.is_finite()) {
        return None;
    }
    Some((bb.center_x, bb.center_y))
}

fn separate_components(
    components: &[Vec<usize>],
    rects: &mut [Rectangle],
    gap: f64,
) -> Result<()> {
    let Some(mut boxes) = components
        .iter()
        .map(|comp| {
            let members: Vec<Rectangle> = comp.iter().map(|&v| rects[v]).collect();
            bounding_box(&members)
        })
        .collect::<Option<Vec<Rectangle>>>()
    else {
        return Ok(());
    };
    let before = boxes.clone();
    remove_rectangle_overlap(&mut boxes, gap, gap)?;

    for ((comp, old), new) in components.iter().zip(&before).zip(&boxes) {
        let (dx, dy) = (new.center_x - old.center_x, new.center_y - old.center_y);
        if dx == 0.0 && dy == 0.0 {
            continue;
        }
        tracing::trace!(nodes = comp.len(), dx, dy, "moving component");
        for &v in comp {
            rects[v].translate(dx, dy);
        }
    }
    Ok(())
}
