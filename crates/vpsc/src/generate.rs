//! Separation constraint generation for rectangles by a scanline sweep.
//!
//! For [`Axis::Horizontal`] the sweep runs over y: a rectangle enters the scanline at its top
//! edge and leaves it at its bottom edge, and the scanline is ordered by center x. Constraints
//! are emitted when a rectangle leaves, between it and the rectangles next to it in the
//! scanline. [`Axis::Vertical`] is the same with the roles of x and y swapped.

use crate::constraint::Constraint;
use crate::rectangle::Rectangle;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn center(self, r: &Rectangle) -> f64 {
        match self {
            Axis::Horizontal => r.center_x,
            Axis::Vertical => r.center_y,
        }
    }

    fn size(self, r: &Rectangle) -> f64 {
        match self {
            Axis::Horizontal => r.width(),
            Axis::Vertical => r.height(),
        }
    }

    // Extent along the sweep direction, which is the other axis.
    fn sweep_extent(self, r: &Rectangle) -> (f64, f64) {
        match self {
            Axis::Horizontal => (r.min_y(), r.max_y()),
            Axis::Vertical => (r.min_x(), r.max_x()),
        }
    }

    fn overlap_along(self, a: &Rectangle, b: &Rectangle) -> f64 {
        match self {
            Axis::Horizontal => a.overlap_x(b),
            Axis::Vertical => a.overlap_y(b),
        }
    }

    fn overlap_across(self, a: &Rectangle, b: &Rectangle) -> f64 {
        match self {
            Axis::Horizontal => a.overlap_y(b),
            Axis::Vertical => a.overlap_x(b),
        }
    }
}

// At equal positions, rectangles that merely touch along the sweep never share the scanline:
// closes come first, then rectangles without extent along the sweep enter and leave, then the
// rest open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EventKind {
    Close,
    OpenFlat,
    CloseFlat,
    Open,
}

impl EventKind {
    fn opens(self) -> bool {
        matches!(self, EventKind::Open | EventKind::OpenFlat)
    }
}

#[derive(Debug, Clone, Copy)]
struct Event {
    kind: EventKind,
    node: usize,
    pos: f64,
}

#[derive(Debug, Clone, Default)]
struct SweepNode {
    prev: Option<usize>,
    next: Option<usize>,
    left_neighbours: Vec<usize>,
    right_neighbours: Vec<usize>,
}

/// Generates separation constraints along `axis` for `rects` (which should already include any
/// border). Variable `i` stands for the center of `rects[i]`.
///
/// With `use_neighbour_lists` every rectangle is constrained against each scanline neighbour
/// that overlaps it less along `axis` than across it (plus the first one that does not overlap
/// along `axis` at all); otherwise only against its immediate scanline neighbours.
pub fn generate_constraints(
    rects: &[Rectangle],
    axis: Axis,
    use_neighbour_lists: bool,
) -> Vec<Constraint> {
    let mut events: Vec<Event> = Vec::with_capacity(rects.len() * 2);
    for (i, r) in rects.iter().enumerate() {
        let (open, close) = axis.sweep_extent(r);
        let (open_kind, close_kind, close) = if close <= open {
            (EventKind::OpenFlat, EventKind::CloseFlat, open)
        } else {
            (EventKind::Open, EventKind::Close, close)
        };
        events.push(Event {
            kind: open_kind,
            node: i,
            pos: open,
        });
        events.push(Event {
            kind: close_kind,
            node: i,
            pos: close,
        });
    }
    events.sort_by(|a, b| {
        a.pos
            .total_cmp(&b.pos)
            .then(a.kind.cmp(&b.kind))
            .then(a.node.cmp(&b.node))
    });

    let order = |a: usize, b: usize| -> Ordering {
        axis.center(&rects[a])
            .total_cmp(&axis.center(&rects[b]))
            .then(a.cmp(&b))
    };
    let sep = |a: usize, b: usize| (axis.size(&rects[a]) + axis.size(&rects[b])) / 2.0;

    let mut nodes: Vec<SweepNode> = vec![SweepNode::default(); rects.len()];
    let mut scanline: Vec<usize> = Vec::new();
    let mut cs: Vec<Constraint> = Vec::new();

    for e in events {
        let v = e.node;
        if e.kind.opens() {
            let idx = scanline.partition_point(|&u| order(u, v) == Ordering::Less);
            scanline.insert(idx, v);
            if use_neighbour_lists {
                let left = left_neighbours(rects, axis, &scanline, idx);
                let right = right_neighbours(rects, axis, &scanline, idx);
                for &u in &left {
                    nodes[u].right_neighbours.push(v);
                }
                for &u in &right {
                    nodes[u].left_neighbours.push(v);
                }
                nodes[v].left_neighbours = left;
                nodes[v].right_neighbours = right;
            } else {
                if idx > 0 {
                    let u = scanline[idx - 1];
                    nodes[v].prev = Some(u);
                    nodes[u].next = Some(v);
                }
                if let Some(&u) = scanline.get(idx + 1) {
                    nodes[v].next = Some(u);
                    nodes[u].prev = Some(v);
                }
            }
        } else {
            if use_neighbour_lists {
                for u in std::mem::take(&mut nodes[v].left_neighbours) {
                    cs.push(Constraint::new(u, v, sep(u, v)));
                    nodes[u].right_neighbours.retain(|&w| w != v);
                }
                for u in std::mem::take(&mut nodes[v].right_neighbours) {
                    cs.push(Constraint::new(v, u, sep(v, u)));
                    nodes[u].left_neighbours.retain(|&w| w != v);
                }
            } else {
                let (prev, next) = (nodes[v].prev, nodes[v].next);
                if let Some(l) = prev {
                    cs.push(Constraint::new(l, v, sep(l, v)));
                    nodes[l].next = next;
                }
                if let Some(r) = next {
                    cs.push(Constraint::new(v, r, sep(v, r)));
                    nodes[r].prev = prev;
                }
            }
            if let Some(idx) = scanline.iter().position(|&u| u == v) {
                scanline.remove(idx);
            }
        }
    }

    cs
}

fn left_neighbours(rects: &[Rectangle], axis: Axis, scanline: &[usize], idx: usize) -> Vec<usize> {
    let v = &rects[scanline[idx]];
    let mut out = Vec::new();
    for &u in scanline[..idx].iter().rev() {
        let along = axis.overlap_along(&rects[u], v);
        if along <= 0.0 {
            out.push(u);
            break;
        }
        if along <= axis.overlap_across(&rects[u], v) {
            out.push(u);
        }
    }
    out
}

fn right_neighbours(rects: &[Rectangle], axis: Axis, scanline: &[usize], idx: usize) -> Vec<usize> {
    let v = &rects[scanline[idx]];
    let mut out = Vec::new();
    for &u in &scanline[idx + 1..] {
        let along = axis.overlap_along(&rects[u], v);
        if along <= 0.0 {
            out.push(u);
            break;
        }
        if along <= axis.overlap_across(&rects[u], v) {
            out.push(u);
        }
    }
    out
}
