//! All-pairs shortest path lengths over an undirected, positively weighted graph (Dijkstra from
//! every node).

use nalgebra::DMatrix;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    dist: f64,
    node: usize,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    // Reversed so that `BinaryHeap` pops the closest node first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Undirected adjacency lists `(neighbour, length)`; self-loops are dropped.
pub fn adjacency(node_count: usize, edges: &[(usize, usize, f64)]) -> Vec<Vec<(usize, f64)>> {
    let mut adj: Vec<Vec<(usize, f64)>> = vec![Vec::new(); node_count];
    for &(a, b, len) in edges {
        if a == b {
            continue;
        }
        adj[a].push((b, len));
        adj[b].push((a, len));
    }
    adj
}

/// Fills `dist` with the shortest path length from `source` to every node; unreachable nodes
/// get `f64::INFINITY`.
pub fn dijkstra(adj: &[Vec<(usize, f64)>], source: usize, dist: &mut [f64]) {
    debug_assert_eq!(adj.len(), dist.len());
    dist.fill(f64::INFINITY);
    dist[source] = 0.0;
    let mut heap = BinaryHeap::new();
    heap.push(QueueEntry {
        dist: 0.0,
        node: source,
    });
    while let Some(QueueEntry { dist: d, node: v }) = heap.pop() {
        if d > dist[v] {
            continue;
        }
        for &(u, len) in &adj[v] {
            let nd = d + len;
            if nd < dist[u] {
                dist[u] = nd;
                heap.push(QueueEntry { dist: nd, node: u });
            }
        }
    }
}

/// Matrix of shortest path lengths. Entry `(i, j)` is `f64::INFINITY` when `j` is unreachable
/// from `i`.
pub fn all_pairs(node_count: usize, edges: &[(usize, usize, f64)]) -> DMatrix<f64> {
    let adj = adjacency(node_count, edges);
    let mut out = DMatrix::<f64>::from_element(node_count, node_count, f64::INFINITY);
    let mut row = vec![0.0; node_count];
    for i in 0..node_count {
        dijkstra(&adj, i, &mut row);
        for (j, &d) in row.iter().enumerate() {
            out[(i, j)] = d;
        }
    }
    out
}
