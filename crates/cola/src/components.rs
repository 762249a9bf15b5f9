/// Splits `0..node_count` into the connected components of the undirected graph `edges`.
/// Components are ordered by their smallest node and list their nodes in ascending order.
pub(crate) fn connected_components(
    node_count: usize,
    edges: &[(usize, usize)],
) -> Vec<Vec<usize>> {
    // Disjoint sets whose representative is always the smallest member.
    let mut parent: Vec<usize> = (0..node_count).collect();
    for &(a, b) in edges {
        let (ra, rb) = (root(&mut parent, a), root(&mut parent, b));
        if ra != rb {
            parent[ra.max(rb)] = ra.min(rb);
        }
    }

    let mut slot: Vec<Option<usize>> = vec![None; node_count];
    let mut out: Vec<Vec<usize>> = Vec::new();
    for v in 0..node_count {
        let r = root(&mut parent, v);
        let idx = *slot[r].get_or_insert_with(|| {
            out.push(Vec::new());
            out.len() - 1
        });
        out[idx].push(v);
    }
    out
}

fn root(parent: &mut [usize], mut v: usize) -> usize {
    while parent[v] != v {
        parent[v] = parent[parent[v]];
        v = parent[v];
    }
    v
}

#[cfg(test)]
mod tests {
    use super::connected_components;

    #[test]
    fn isolated_nodes_form_their_own_components() {
        let edges = [(2, 0), (3, 2), (1, 1)];
        assert_eq!(
            connected_components(4, &edges),
            vec![vec![0, 2, 3], vec![1]]
        );
    }

    #[test]
    fn late_edges_join_components_found_earlier() {
        let edges = [(4, 5), (2, 3), (3, 5), (0, 1)];
        assert_eq!(
            connected_components(6, &edges),
            vec![vec![0, 1], vec![2, 3, 4, 5]]
        );
    }
}
