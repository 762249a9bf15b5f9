use cola::{Edge, Error, Graph, InitialPlacement, LayoutOptions, Node, graph_layout};

fn node(id: &str, x: f64, y: f64, width: f64, height: f64) -> Node {
    Node {
        id: id.to_string(),
        width,
        height,
        x,
        y,
    }
}

fn edge(id: &str, source: &str, target: &str) -> Edge {
    Edge {
        id: id.to_string(),
        source: source.to_string(),
        target: target.to_string(),
        length: None,
    }
}

fn distance(a: cola::Point, b: cola::Point) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

#[test]
fn empty_graph_yields_an_empty_layout() {
    let result = graph_layout(&Graph::default(), &LayoutOptions::default()).unwrap();
    assert!(result.positions.is_empty());
    assert_eq!(result.components, 0);
    assert!(result.report.converged);
}

#[test]
fn connected_pair_settles_at_the_ideal_length() {
    let graph = Graph {
        nodes: vec![
            node("a", 0.0, 0.0, 10.0, 10.0),
            node("b", 30.0, 0.0, 10.0, 10.0),
        ],
        edges: vec![edge("ab", "a", "b")],
    };
    let result = graph_layout(&graph, &LayoutOptions::default()).unwrap();
    let d = distance(result.positions["a"], result.positions["b"]);
    assert!((d - 100.0).abs() < 1.0, "distance {d}");
    assert_eq!(result.components, 1);
    assert!(result.report.converged, "{:?}", result.report);
}

#[test]
fn explicit_edge_length_overrides_the_default() {
    let mut e = edge("ab", "a", "b");
    e.length = Some(40.0);
    let graph = Graph {
        nodes: vec![
            node("a", 0.0, 0.0, 10.0, 10.0),
            node("b", 100.0, 0.0, 10.0, 10.0),
        ],
        edges: vec![e],
    };
    let result = graph_layout(&graph, &LayoutOptions::default()).unwrap();
    let d = distance(result.positions["a"], result.positions["b"]);
    assert!((d - 40.0).abs() < 1.0, "distance {d}");
}

#[test]
fn single_component_keeps_its_center() {
    let graph = Graph {
        nodes: vec![
            node("a", 10.0, 10.0, 20.0, 20.0),
            node("b", 60.0, 15.0, 20.0, 20.0),
            node("c", 20.0, 70.0, 20.0, 20.0),
            node("d", 90.0, 90.0, 20.0, 20.0),
        ],
        edges: vec![edge("ab", "a", "b"), edge("bc", "b", "c"), edge("cd", "c", "d")],
    };
    let center = |points: Vec<(f64, f64)>| {
        let min_x = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let max_x = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        let min_y = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let max_y = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
        ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0)
    };
    let before = center(graph.nodes.iter().map(|n| (n.x, n.y)).collect());
    let result = graph_layout(&graph, &LayoutOptions::default()).unwrap();
    // All nodes have the same size, so the bounding box center is the center of the centers.
    let after = center(result.positions.values().map(|p| (p.x, p.y)).collect());
    assert!((before.0 - after.0).abs() < 1e-6, "{before:?} vs {after:?}");
    assert!((before.1 - after.1).abs() < 1e-6, "{before:?} vs {after:?}");
}

#[test]
fn directed_chain_points_downwards() {
    let graph = Graph {
        nodes: vec![
            node("a", 0.0, 0.0, 10.0, 10.0),
            node("b", 40.0, 100.0, 10.0, 10.0),
            node("c", 80.0, 200.0, 10.0, 10.0),
        ],
        edges: vec![edge("ab", "a", "b"), edge("bc", "b", "c")],
    };
    let opts = LayoutOptions {
        directed: true,
        ..Default::default()
    };
    let result = graph_layout(&graph, &opts).unwrap();
    let p = &result.positions;
    assert!(p["b"].y - p["a"].y >= 100.0 - 1e-6, "{p:?}");
    assert!(p["c"].y - p["b"].y >= 100.0 - 1e-6, "{p:?}");
    assert!(result.cyclic_edges.is_empty());
}

#[test]
fn directed_cycle_is_reported_and_left_unconstrained() {
    let graph = Graph {
        nodes: vec![
            node("a", 0.0, 0.0, 10.0, 10.0),
            node("b", 100.0, 0.0, 10.0, 10.0),
            node("c", 50.0, 80.0, 10.0, 10.0),
            node("d", 50.0, 200.0, 10.0, 10.0),
        ],
        edges: vec![
            edge("ab", "a", "b"),
            edge("bc", "b", "c"),
            edge("ca", "c", "a"),
            edge("cd", "c", "d"),
        ],
    };
    let opts = LayoutOptions {
        directed: true,
        directed_edge_height_modifier: 0.5,
        ..Default::default()
    };
    let result = graph_layout(&graph, &opts).unwrap();
    assert_eq!(result.cyclic_edges, vec!["ab", "bc", "ca"]);
    let p = &result.positions;
    assert!(p["d"].y - p["c"].y >= 50.0 - 1e-6, "{p:?}");

    let undirected = graph_layout(&graph, &LayoutOptions::default()).unwrap();
    assert!(undirected.cyclic_edges.is_empty());
}

#[test]
fn isolated_nodes_stacked_on_each_other_are_separated() {
    let graph = Graph {
        nodes: (0..5)
            .map(|i| node(&format!("n{i}"), 0.0, 0.0, 30.0, 30.0))
            .collect(),
        edges: Vec::new(),
    };
    let opts = LayoutOptions::default();
    let result = graph_layout(&graph, &opts).unwrap();
    assert_eq!(result.components, 5);
    let points: Vec<_> = result.positions.values().copied().collect();
    let min_sep = 30.0 + opts.component_gap - 1e-6;
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            let (a, b) = (points[i], points[j]);
            assert!(
                (a.x - b.x).abs() >= min_sep || (a.y - b.y).abs() >= min_sep,
                "{a:?} and {b:?} overlap"
            );
        }
    }
}

#[test]
fn overlapping_neighbours_are_pushed_apart() {
    // Big boxes with a short ideal length: stress alone would make them overlap.
    let graph = Graph {
        nodes: vec![
            node("a", 0.0, 0.0, 80.0, 40.0),
            node("b", 5.0, 5.0, 80.0, 40.0),
            node("c", 10.0, -5.0, 80.0, 40.0),
        ],
        edges: vec![edge("ab", "a", "b"), edge("bc", "b", "c"), edge("ca", "c", "a")],
    };
    let opts = LayoutOptions {
        ideal_edge_length: 20.0,
        x_border: 4.0,
        y_border: 4.0,
        ..Default::default()
    };
    let result = graph_layout(&graph, &opts).unwrap();
    let p: Vec<_> = result.positions.values().copied().collect();
    for i in 0..p.len() {
        for j in (i + 1)..p.len() {
            let dx = (p[i].x - p[j].x).abs();
            let dy = (p[i].y - p[j].y).abs();
            assert!(dx >= 84.0 - 1e-6 || dy >= 44.0 - 1e-6, "{p:?}");
        }
    }
}

#[test]
fn circle_placement_is_deterministic() {
    let graph = Graph {
        nodes: (0..6)
            .map(|i| node(&format!("n{i}"), 0.0, 0.0, 10.0, 10.0))
            .collect(),
        edges: (0..6)
            .map(|i| edge(&format!("e{i}"), &format!("n{i}"), &format!("n{}", (i + 1) % 6)))
            .collect(),
    };
    let opts = LayoutOptions {
        initial_placement: InitialPlacement::Circle,
        ..Default::default()
    };
    let first = graph_layout(&graph, &opts).unwrap();
    let second = graph_layout(&graph, &opts).unwrap();
    assert_eq!(first.positions, second.positions);
    // A symmetric start keeps the ring a regular hexagon; its side trades the 100 of adjacent
    // nodes against the 200 and 300 of the nodes further round.
    let sides: Vec<f64> = (0..6)
        .map(|i| {
            distance(
                first.positions[&format!("n{i}")],
                first.positions[&format!("n{}", (i + 1) % 6)],
            )
        })
        .collect();
    let mean = sides.iter().sum::<f64>() / 6.0;
    assert!((100.0..125.0).contains(&mean), "{sides:?}");
    assert!(sides.iter().all(|s| (s - mean).abs() < 1.0), "{sides:?}");
}

#[test]
fn invalid_graphs_are_rejected() {
    let opts = LayoutOptions::default();

    let missing = Graph {
        nodes: vec![node("a", 0.0, 0.0, 1.0, 1.0)],
        edges: vec![edge("ax", "a", "x")],
    };
    assert!(matches!(
        graph_layout(&missing, &opts),
        Err(Error::MissingEndpoint { edge_id }) if edge_id == "ax"
    ));

    let duplicate = Graph {
        nodes: vec![node("a", 0.0, 0.0, 1.0, 1.0), node("a", 5.0, 0.0, 1.0, 1.0)],
        edges: Vec::new(),
    };
    assert!(matches!(
        graph_layout(&duplicate, &opts),
        Err(Error::DuplicateNode { node_id }) if node_id == "a"
    ));

    let negative = Graph {
        nodes: vec![node("a", 0.0, 0.0, -1.0, 1.0)],
        edges: Vec::new(),
    };
    assert!(matches!(
        graph_layout(&negative, &opts),
        Err(Error::InvalidGeometry { id, .. }) if id == "a"
    ));

    let nan = Graph {
        nodes: vec![node("a", f64::NAN, 0.0, 1.0, 1.0)],
        edges: Vec::new(),
    };
    assert!(matches!(
        graph_layout(&nan, &opts),
        Err(Error::InvalidGeometry { .. })
    ));

    let bad_opts = LayoutOptions {
        tolerance: -1.0,
        ..Default::default()
    };
    assert!(matches!(
        graph_layout(&Graph::default(), &bad_opts),
        Err(Error::InvalidOption {
            name: "tolerance",
            ..
        })
    ));
}
