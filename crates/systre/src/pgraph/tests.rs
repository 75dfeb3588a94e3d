use super::*;
use crate::arith::{frac, rat, QVec};

pub(crate) fn dia() -> PeriodicGraph {
    PeriodicGraph::from_edges(
        3,
        2,
        &[
            (0, 1, vec![0, 0, 0]),
            (0, 1, vec![-1, 0, 0]),
            (0, 1, vec![0, -1, 0]),
            (0, 1, vec![0, 0, -1]),
        ],
    )
    .unwrap()
}

pub(crate) fn cds() -> PeriodicGraph {
    PeriodicGraph::from_edges(
        3,
        4,
        &[
            (0, 2, vec![-1, 0, 0]),
            (0, 2, vec![0, 0, 0]),
            (0, 3, vec![0, 0, 0]),
            (0, 3, vec![0, 1, 1]),
            (1, 2, vec![0, -1, 0]),
            (1, 2, vec![0, 0, -1]),
            (1, 3, vec![0, 0, 0]),
            (1, 3, vec![1, 0, 0]),
        ],
    )
    .unwrap()
}

pub(crate) fn hex_grid() -> PeriodicGraph {
    PeriodicGraph::from_edges(2, 2, &[(0, 1, vec![0, 0]), (0, 1, vec![1, 0]), (0, 1, vec![0, 1])])
        .unwrap()
}

/// Two interpenetrating copies of the hexagonal grid, joined by one edge.
pub(crate) fn double_hex_grid() -> PeriodicGraph {
    PeriodicGraph::from_edges(
        2,
        4,
        &[
            (0, 1, vec![0, 0]),
            (0, 1, vec![1, 0]),
            (0, 1, vec![0, 1]),
            (2, 3, vec![0, 0]),
            (2, 3, vec![1, 0]),
            (2, 3, vec![0, 1]),
            (0, 2, vec![-1, -1]),
        ],
    )
    .unwrap()
}

/// Two nodes with loops; the same net as the minimal image of `cds`.
pub(crate) fn loops_graph() -> PeriodicGraph {
    PeriodicGraph::from_edges(
        3,
        2,
        &[
            (0, 1, vec![0, 0, 0]),
            (1, 1, vec![1, 0, 0]),
            (1, 0, vec![0, -1, 0]),
            (0, 0, vec![0, 0, 1]),
        ],
    )
    .unwrap()
}

fn q(v: &[i64]) -> QVec {
    v.iter().map(|&x| rat(x)).collect()
}

#[test]
fn new_edge_display_and_delete() {
    let mut g = loops_graph();
    assert_eq!(
        g.to_string(),
        "(1,1,[0,0,-1])(1,2,[0,0,0])(1,2,[0,1,0])(2,2,[-1,0,0])"
    );
    let e = g.new_edge(NodeId(0), NodeId(1), &[1, 1, 1]).unwrap();
    assert_eq!(
        g.to_string(),
        "(1,1,[0,0,-1])(1,2,[0,0,0])(1,2,[0,1,0])(1,2,[1,1,1])(2,2,[-1,0,0])"
    );
    g.delete_edge(e).unwrap();
    let v3 = g.new_node();
    g.new_edge(NodeId(0), v3, &[0, 0, 0]).unwrap();
    assert_eq!(
        g.to_string(),
        "(1,1,[0,0,-1])(1,2,[0,0,0])(1,2,[0,1,0])(1,3,[0,0,0])(2,2,[-1,0,0])"
    );

    assert!(matches!(
        g.new_edge(NodeId(0), NodeId(1), &[0, 0, 0]),
        Err(GraphError::DuplicateEdge { .. })
    ));
    // the reverse of an existing edge is the same edge
    assert!(matches!(
        g.new_edge(NodeId(1), NodeId(0), &[0, -1, 0]),
        Err(GraphError::DuplicateEdge { .. })
    ));
    assert!(matches!(
        g.new_edge(v3, v3, &[0, 0, 0]),
        Err(GraphError::DegenerateLoop(_))
    ));
    assert!(matches!(
        g.new_edge(v3, v3, &[1, 2, 3, 4]),
        Err(GraphError::InvalidShift { .. })
    ));
    assert!(matches!(
        g.new_edge_q(v3, v3, vec![frac(1, 2), rat(0), rat(0)]),
        Err(GraphError::InvalidShift { .. })
    ));
    g.new_edge(v3, v3, &[1, 2, 3]).unwrap();
}

#[test]
fn deleting_elements() {
    let mut g = loops_graph();
    let e3 = EdgeId(2);
    g.delete_edge(e3).unwrap();
    assert!(g.edge(e3).is_none());
    assert_eq!(g.delete_edge(e3), Err(GraphError::NoSuchElement("edge")));
    assert_eq!(g.to_string(), "(1,1,[0,0,-1])(1,2,[0,0,0])(2,2,[-1,0,0])");

    g.delete_node(NodeId(0)).unwrap();
    assert_eq!(g.number_of_nodes(), 1);
    assert_eq!(g.number_of_edges(), 1);
    assert_eq!(g.to_string(), "(1,1,[-1,0,0])");
}

#[test]
fn shifts_and_lookup() {
    let g = loops_graph();
    let e2 = DirEdge::forward(EdgeId(1));
    let e3 = DirEdge::forward(EdgeId(2));
    assert_eq!(g.shift(e2), q(&[1, 0, 0]));
    assert_eq!(g.shift(e2.reverse()), q(&[-1, 0, 0]));
    assert_eq!(g.shift(e3.reverse()), q(&[0, 1, 0]));

    assert_eq!(g.get_edge(NodeId(0), NodeId(1), &q(&[0, 1, 0])), Some(e3.reverse()));
    assert_eq!(g.get_edge(NodeId(1), NodeId(0), &q(&[0, -1, 0])), Some(e3));
    assert_eq!(g.get_edge(NodeId(1), NodeId(0), &q(&[1, -1, 0])), None);
    assert_eq!(g.get_edge(NodeId(1), NodeId(1), &q(&[1, 0, 0])), Some(e2));
    assert_eq!(g.get_edge(NodeId(1), NodeId(1), &q(&[-1, 0, 0])), Some(e2.reverse()));
}

#[test]
fn loops_are_incident_in_both_directions() {
    let g = loops_graph();
    assert_eq!(g.degree(NodeId(0)), 4);
    assert_eq!(g.degree(NodeId(1)), 4);
    assert_eq!(g.directed_edges().len(), 8);
}

#[test]
fn coordination_sequence_of_diamond() {
    let g = dia();
    let cs: Vec<usize> = g.coordination_sequence(NodeId(0)).take(11).collect();
    assert_eq!(cs, vec![1, 4, 12, 24, 42, 64, 92, 124, 162, 204, 252]);
}

#[test]
fn connectivity_needs_full_lattice() {
    let mut h = PeriodicGraph::new(3);
    let v1 = h.new_node();
    let v2 = h.new_node();
    assert!(!h.is_connected());
    h.new_edge(v1, v2, &[1, 0, 0]).unwrap();
    h.new_edge(v1, v2, &[0, 1, 0]).unwrap();
    h.new_edge(v1, v2, &[0, 0, 1]).unwrap();
    assert!(!h.is_connected());
    h.new_edge(v1, v2, &[3, 0, 0]).unwrap();
    assert!(!h.is_connected());
    let e = h.new_edge(v1, v2, &[2, 0, 0]).unwrap();
    assert!(h.is_connected());
    h.delete_edge(e).unwrap();
    h.new_edge(v1, v2, &[0, 0, 0]).unwrap();
    assert!(h.is_connected());
    assert!(PeriodicGraph::new(2).is_connected());
}

#[test]
fn barycentric_placements() {
    for g in [loops_graph(), dia(), cds()] {
        let pos = g.barycentric_placement().unwrap().to_vec();
        assert!(g.is_barycentric(&pos));
    }
    let pos = dia().barycentric_placement().unwrap().to_vec();
    assert_eq!(pos[0], q(&[0, 0, 0]));
    assert_eq!(pos[1], vec![frac(1, 4), frac(1, 4), frac(1, 4)]);

    let mut disconnected = PeriodicGraph::new(2);
    disconnected.new_node();
    disconnected.new_node();
    assert_eq!(
        disconnected.barycentric_placement().unwrap_err(),
        GraphError::NotConnected
    );
}

#[test]
fn stability() {
    for g in [loops_graph(), dia(), cds()] {
        assert!(g.is_stable().unwrap());
        assert!(g.is_locally_stable().unwrap());
    }
    let h = double_hex_grid();
    assert!(!h.is_stable().unwrap());
    assert!(h.is_locally_stable().unwrap());

    let h2 = PeriodicGraph::from_edges(
        2,
        3,
        &[
            (0, 0, vec![1, 0]),
            (0, 1, vec![0, 0]),
            (0, 1, vec![0, 1]),
            (0, 2, vec![0, 0]),
            (0, 2, vec![0, 1]),
            (1, 2, vec![0, 0]),
        ],
    )
    .unwrap();
    assert!(!h2.is_stable().unwrap());
    assert!(!h2.is_locally_stable().unwrap());
}

#[test]
fn embedded_neighbourhoods() {
    let n = hex_grid().embedded_neighbourhood(NodeId(0), 3);
    assert_eq!((n.nodes.len(), n.edges.len()), (19, 21));
    let n = dia().embedded_neighbourhood(NodeId(0), 3);
    assert_eq!((n.nodes.len(), n.edges.len()), (41, 52));
}

#[test]
fn keys_parse_back() {
    let g = PeriodicGraph::from_key("3 1 2 0 0 0 1 2 0 0 1 1 2 0 1 0 1 2 1 0 0").unwrap();
    assert_eq!(g.number_of_nodes(), 2);
    assert_eq!(g.number_of_edges(), 4);
    assert!(matches!(
        PeriodicGraph::from_key("3 1 2 0 0"),
        Err(GraphError::MalformedKey(_))
    ));
    assert!(matches!(
        PeriodicGraph::from_key("2 0 1 0 0"),
        Err(GraphError::MalformedKey(_))
    ));
    assert!(PeriodicGraph::from_key("x").is_err());
}

#[test]
fn mutation_clears_cached_placement() {
    let mut g = hex_grid();
    let before = g.barycentric_placement().unwrap().to_vec();
    let v = g.new_node();
    g.new_edge(NodeId(1), v, &[0, 0]).unwrap();
    g.new_edge(v, v, &[1, 1]).unwrap();
    let after = g.barycentric_placement().unwrap().to_vec();
    assert_eq!(after.len(), 3);
    assert!(g.is_barycentric(&after));
    assert_eq!(before.len(), 2);
}
