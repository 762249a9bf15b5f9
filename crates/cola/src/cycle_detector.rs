//! Flags directed edges that lie on a cycle.
//!
//! Strongly connected components are found with an iterative Tarjan traversal (three-state
//! coloring plus discovery stamps and low-links). An edge is cyclic iff both of its endpoints
//! belong to the same component; self-loops always are.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    NotVisited,
    BeingVisited,
    DoneVisiting,
}

/// Reusable detector over a graph of `node_count` nodes and `(source, target)` edges.
///
/// All buffers are kept between runs, so re-targeting with [`CycleDetector::mod_graph`] and
/// detecting again does not reallocate for graphs of similar size.
#[derive(Debug, Clone, Default)]
pub struct CycleDetector {
    node_count: usize,
    edges: Vec<(usize, usize)>,
    out_edges: Vec<Vec<usize>>,
    state: Vec<VisitState>,
    stamp: Vec<usize>,
    low: Vec<usize>,
    component: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    // (node, position of the next outgoing edge to explore)
    frames: Vec<(usize, usize)>,
}

impl CycleDetector {
    /// # Panics
    ///
    /// If an edge endpoint is `>= node_count`.
    pub fn new(node_count: usize, edges: &[(usize, usize)]) -> Self {
        let mut detector = Self::default();
        detector.mod_graph(node_count, edges);
        detector
    }

    /// Re-targets the detector at another graph.
    ///
    /// # Panics
    ///
    /// If an edge endpoint is `>= node_count`.
    pub fn mod_graph(&mut self, node_count: usize, edges: &[(usize, usize)]) {
        for (i, &(s, t)) in edges.iter().enumerate() {
            assert!(
                s < node_count && t < node_count,
                "edge {i} ({s} -> {t}) is out of range for {node_count} nodes"
            );
        }
        self.node_count = node_count;
        self.edges.clear();
        self.edges.extend_from_slice(edges);

        for out in &mut self.out_edges {
            out.clear();
        }
        self.out_edges.resize_with(node_count, Vec::new);
        for (i, &(s, _)) in edges.iter().enumerate() {
            self.out_edges[s].push(i);
        }
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    /// One flag per edge, in input order: `true` if the edge lies on a directed cycle.
    pub fn detect_cycles(&mut self) -> Vec<bool> {
        self.compute_components();
        let flags: Vec<bool> = self
            .edges
            .iter()
            .map(|&(s, t)| self.component[s] == self.component[t])
            .collect();
        tracing::debug!(
            nodes = self.node_count,
            edges = self.edges.len(),
            cyclic = flags.iter().filter(|&&c| c).count(),
            "cycle detection finished"
        );
        flags
    }

    /// Indices of the cyclic edges, ascending.
    pub fn cyclic_edges(&mut self) -> Vec<usize> {
        self.detect_cycles()
            .into_iter()
            .enumerate()
            .filter_map(|(i, cyclic)| cyclic.then_some(i))
            .collect()
    }

    fn compute_components(&mut self) {
        let n = self.node_count;
        self.state.clear();
        self.state.resize(n, VisitState::NotVisited);
        self.stamp.clear();
        self.stamp.resize(n, 0);
        self.low.clear();
        self.low.resize(n, 0);
        self.component.clear();
        self.component.resize(n, usize::MAX);
        self.on_stack.clear();
        self.on_stack.resize(n, false);
        self.stack.clear();
        self.frames.clear();

        let mut time = 0;
        let mut components = 0;
        for root in 0..n {
            if self.state[root] != VisitState::NotVisited {
                continue;
            }
            self.discover(root, &mut time);

            while let Some(&(v, pos)) = self.frames.last() {
                if let Some(&e) = self.out_edges[v].get(pos) {
                    if let Some(top) = self.frames.last_mut() {
                        top.1 += 1;
                    }
                    let w = self.edges[e].1;
                    match self.state[w] {
                        VisitState::NotVisited => self.discover(w, &mut time),
                        // Back edge into the current path.
                        VisitState::BeingVisited => self.low[v] = self.low[v].min(self.stamp[w]),
                        VisitState::DoneVisiting => {
                            if self.on_stack[w] {
                                self.low[v] = self.low[v].min(self.stamp[w]);
                            }
                        }
                    }
                    continue;
                }

                self.frames.pop();
                self.state[v] = VisitState::DoneVisiting;
                if let Some(&(parent, _)) = self.frames.last() {
                    self.low[parent] = self.low[parent].min(self.low[v]);
                }
                if self.low[v] == self.stamp[v] {
                    while let Some(w) = self.stack.pop() {
                        self.on_stack[w] = false;
                        self.component[w] = components;
                        if w == v {
                            break;
                        }
                    }
                    components += 1;
                }
            }
        }
        tracing::trace!(components, "strongly connected components");
    }

    fn discover(&mut self, v: usize, time: &mut usize) {
        self.state[v] = VisitState::BeingVisited;
        self.stamp[v] = *time;
        self.low[v] = *time;
        *time += 1;
        self.stack.push(v);
        self.on_stack[v] = true;
        self.frames.push((v, 0));
    }
}

#[cfg(test)]
mod tests {
    use super::CycleDetector;

    #[test]
    fn empty_graph_has_no_cyclic_edges() {
        let mut d = CycleDetector::new(0, &[]);
        assert!(d.detect_cycles().is_empty());
        let mut d = CycleDetector::new(3, &[]);
        assert!(d.cyclic_edges().is_empty());
    }

    #[test]
    fn self_loop_is_cyclic() {
        let mut d = CycleDetector::new(2, &[(0, 1), (1, 1)]);
        assert_eq!(d.detect_cycles(), vec![false, true]);
    }

    #[test]
    fn two_cycle_with_tail() {
        // 0 -> 1 -> 2 -> 1, 2 -> 3
        let mut d = CycleDetector::new(4, &[(0, 1), (1, 2), (2, 1), (2, 3)]);
        assert_eq!(d.detect_cycles(), vec![false, true, true, false]);
    }

    #[test]
    fn cross_edge_into_finished_component_is_not_cyclic() {
        // Component {1, 2} is finished before 3 reaches into it.
        let mut d = CycleDetector::new(4, &[(0, 1), (1, 2), (2, 1), (0, 3), (3, 2)]);
        assert_eq!(d.cyclic_edges(), vec![1, 2]);
    }

    #[test]
    fn chord_inside_a_cycle_is_cyclic() {
        // 0 -> 1 -> 2 -> 0 with the chord 0 -> 2.
        let mut d = CycleDetector::new(3, &[(0, 1), (1, 2), (2, 0), (0, 2)]);
        assert_eq!(d.detect_cycles(), vec![true, true, true, true]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_endpoint_panics() {
        let _ = CycleDetector::new(2, &[(0, 2)]);
    }
}
