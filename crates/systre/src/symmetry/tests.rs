use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::arith::QMatrix;
use crate::error::SystreError;
use crate::pgraph::{NodeId, PeriodicGraph};

fn dia() -> PeriodicGraph {
    PeriodicGraph::from_key("3 1 2 0 0 0 1 2 -1 0 0 1 2 0 -1 0 1 2 0 0 -1").unwrap()
}

fn cds() -> PeriodicGraph {
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

fn loops_graph() -> PeriodicGraph {
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

fn double_hex_grid() -> PeriodicGraph {
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

/// Square with both diagonals attached differently; the two variants are
/// the same net.
fn four_node_graph(variant: u8) -> PeriodicGraph {
    let (x, y) = (vec![1, 0], vec![0, 1]);
    PeriodicGraph::from_edges(
        2,
        4,
        &[
            (0, 1, vec![0, 0]),
            (0, 2, vec![0, 0]),
            (0, 3, vec![0, 0]),
            (1, 2, x.clone()),
            (1, 3, if variant == 1 { x } else { y.clone() }),
            (2, 3, y),
        ],
    )
    .unwrap()
}

const FIXED_POINT_KEYS: &[&str] = &[
    "3 1 2 0 0 0 1 2 0 0 1 1 2 0 1 0 1 2 1 0 0",
    "3 1 1 -1 0 0 1 2 0 0 0 1 2 0 1 0 2 2 0 0 -1",
    "2 1 2 0 0 1 2 0 1 1 2 1 0",
    "3 1 2 0 0 0 1 3 0 0 0 1 4 0 0 0 2 3 0 1 0 2 4 1 0 0 3 4 0 0 1",
    "3 1 2 0 0 0 1 3 0 0 0 1 4 0 0 0 2 5 0 0 0 2 6 0 0 0 3 4 0 0 0 3 7 0 0 0 4 8 0 0 0 \
     5 6 0 0 0 5 9 0 0 0 6 10 0 0 0 7 10 1 0 0 7 11 0 0 0 8 9 0 1 0 8 12 0 0 0 \
     9 12 0 -1 0 10 11 -1 0 0 11 12 0 0 1",
    "3 1 2 0 0 0 1 2 0 1 0 1 3 0 0 0 1 3 1 0 0 2 3 0 0 1 2 3 1 -1 -1",
    "3 1 2 0 0 0 1 3 0 0 0 1 4 0 0 0 2 5 0 0 0 2 6 0 0 0 3 7 0 0 0 3 8 0 0 0 4 8 0 0 0 \
     4 9 0 0 0 5 10 0 0 0 5 11 0 0 0 6 10 0 0 0 6 12 0 0 0 7 11 0 1 0 7 12 1 0 0 \
     8 10 0 0 1 9 11 -1 0 1 9 12 0 -1 1",
    "3 1 2 0 0 0 1 3 0 0 0 1 4 0 0 0 2 5 0 0 0 3 6 0 0 0 4 7 0 0 0 5 8 0 0 0 5 9 0 0 0 \
     6 9 1 0 0 6 10 0 0 0 7 8 0 0 1 7 10 0 1 0",
];

#[test]
fn keys_are_fixed_points() {
    for key in FIXED_POINT_KEYS {
        let g = PeriodicGraph::from_key(key).unwrap();
        assert_eq!(&g.systre_key().unwrap(), key);
    }
}

#[test]
fn symmetries_act_on_barycentric_positions() {
    use crate::arith::{mod_one, rat, vec_mat};

    let mut graphs: Vec<PeriodicGraph> = FIXED_POINT_KEYS
        .iter()
        .map(|k| PeriodicGraph::from_key(k).unwrap())
        .collect();
    graphs.push(cds().minimal_image().unwrap());
    for g in &graphs {
        let d = g.dimension();
        let pos = g.barycentric_placement().unwrap().to_vec();
        for phi in g.symmetries().unwrap() {
            for v in g.node_ids() {
                let mut p = pos[v.0].clone();
                p.push(rat(1));
                let moved = vec_mat(&p, phi.operator())[..d].to_vec();
                assert_eq!(
                    mod_one(&moved),
                    mod_one(&pos[phi.image(v).0]),
                    "{g} node {}",
                    v.0 + 1
                );
            }
        }
    }
}

#[test]
fn minimal_image_is_idempotent() {
    let once = cds().minimal_image().unwrap();
    let twice = once.minimal_image().unwrap();
    assert_eq!(twice.number_of_nodes(), once.number_of_nodes());
    assert_eq!(twice.number_of_edges(), once.number_of_edges());
    assert_eq!(twice.systre_key().unwrap(), once.systre_key().unwrap());
    assert!(once.number_of_nodes() < cds().number_of_nodes());
}

#[test]
fn diamond_invariant_and_canonical_form() {
    let g = dia();
    assert_eq!(g.systre_key().unwrap(), "3 1 2 0 0 0 1 2 0 0 1 1 2 0 1 0 1 2 1 0 0");
    assert_eq!(
        g.canonical().unwrap().to_string(),
        "(1,2,[0,0,0])(1,2,[0,0,1])(1,2,[0,1,0])(1,2,[1,0,0])"
    );
}

#[test]
fn invariants_distinguish_and_identify() {
    let g = loops_graph();
    let cds1 = cds().minimal_image().unwrap();
    assert_eq!(g.invariant().unwrap(), cds1.invariant().unwrap());
    assert_eq!(
        cds1.systre_key().unwrap(),
        "3 1 1 -1 0 0 1 2 0 0 0 1 2 0 1 0 2 2 0 0 -1"
    );
    assert_ne!(g.invariant().unwrap(), dia().invariant().unwrap());
    assert!(g.is_isomorphic(&cds1).unwrap());
    assert!(!g.is_isomorphic(&dia()).unwrap());
    assert_eq!(
        four_node_graph(1).canonical().unwrap().to_string(),
        four_node_graph(2).canonical().unwrap().to_string()
    );
    assert!(four_node_graph(1).is_isomorphic(&four_node_graph(2)).unwrap());
}

#[test]
fn characteristic_basis_counts() {
    for (g, n) in [
        (dia(), 48),
        (loops_graph(), 16),
        (cds().minimal_image().unwrap(), 16),
        (double_hex_grid(), 24),
    ] {
        let bases = g.characteristic_bases().unwrap();
        assert_eq!(bases.len(), n);
        let d = g.dimension();
        let mut seen = std::collections::HashSet::new();
        for b in bases {
            let rows = b.iter().map(|&e| g.diff(e).unwrap()).collect();
            assert_eq!(QMatrix::from_rows(rows, d).rank(), d);
            assert!(seen.insert(b.clone()));
        }
    }
}

#[test]
fn symmetry_group_orders() {
    for (g, n) in [
        (dia(), 48),
        (loops_graph(), 16),
        (cds().minimal_image().unwrap(), 16),
        (double_hex_grid(), 12),
    ] {
        let syms = g.symmetries().unwrap();
        assert_eq!(syms.len(), n);
        assert!(syms[0].matrix().is_identity());
        for s in syms {
            assert!(s.matrix().is_unimodular());
        }
    }
}

#[test]
fn symmetries_compose_within_the_group() {
    let g = dia();
    let syms = g.symmetries().unwrap();
    for a in syms.iter().take(6) {
        for b in syms.iter().take(6) {
            let c = a.compose(b);
            assert!(syms.contains(&c));
        }
    }
}

#[test]
fn symmetric_basis_makes_symmetries_orthogonal() {
    for g in [loops_graph(), dia(), double_hex_grid()] {
        let b = g.symmetric_basis().unwrap();
        let b_inv = b.clone().try_inverse().unwrap();
        let d = g.dimension();
        for s in g.symmetries().unwrap() {
            let m = s.matrix().to_dmatrix();
            let a = &b_inv * m * &b;
            let dd = &a * a.transpose();
            let err = (dd - nalgebra::DMatrix::<f64>::identity(d, d)).norm();
            assert!(err < 1e-12, "deviation {err}");
        }
    }
}

#[test]
fn orbits_and_density() {
    let g = dia();
    assert_eq!(g.node_orbits().unwrap(), vec![vec![NodeId(0), NodeId(1)]]);
    assert_eq!(g.edge_orbits().unwrap().len(), 1);
    assert!((g.td10().unwrap() - 981.0).abs() < 1e-9);
    assert_eq!(g.symmetry_operators().unwrap().len(), 48);
}

#[test]
fn translational_classes_and_minimal_image() {
    assert!(dia().translational_classes().unwrap().is_empty());
    assert!(loops_graph().translational_classes().unwrap().is_empty());
    assert_eq!(cds().translational_classes().unwrap().len(), 2);
    assert_eq!(
        double_hex_grid().translational_classes().unwrap(),
        vec![vec![NodeId(0), NodeId(2)], vec![NodeId(1), NodeId(3)]]
    );

    let h = PeriodicGraph::from_edges(
        3,
        2,
        &[
            (0, 0, vec![1, 0, 0]),
            (0, 0, vec![0, 1, 0]),
            (1, 1, vec![1, 0, 0]),
            (1, 1, vec![0, 1, 0]),
            (0, 1, vec![0, 0, 0]),
            (0, 1, vec![0, 0, 1]),
        ],
    )
    .unwrap();
    assert_eq!(h.translational_classes().unwrap().len(), 1);
    assert_eq!(h.minimal_image().unwrap().number_of_nodes(), 1);

    let cds1 = cds().minimal_image().unwrap();
    assert_eq!(cds1.dimension(), 3);
    assert_eq!(cds1.number_of_nodes(), 2);
    assert_eq!(cds1.number_of_edges(), 4);
    assert!(cds1.is_connected());
    assert!(cds1.is_stable().unwrap());
    for v in cds1.node_ids() {
        let loops = cds1
            .incidences(v)
            .iter()
            .filter(|&&e| cds1.target(e) == v && !e.rev)
            .count();
        assert_eq!(loops, 1);
    }

    assert!(matches!(
        double_hex_grid().minimal_image(),
        Err(SystreError::NonTranslationalQuotient)
    ));
    let d = dia();
    assert_eq!(d.minimal_image().unwrap().to_string(), d.to_string());
}

#[test]
fn morphism_rejects_wrong_linear_part() {
    let g = dia();
    let swap = QMatrix::from_i64_rows(&[vec![0, 1, 0], vec![1, 0, 0], vec![0, 0, 1]]);
    assert!(crate::symmetry::Morphism::new(&g, NodeId(0), NodeId(0), &swap)
        .unwrap()
        .is_some());
    let shear = QMatrix::from_i64_rows(&[vec![1, 1, 0], vec![0, 1, 0], vec![0, 0, 1]]);
    assert!(crate::symmetry::Morphism::new(&g, NodeId(0), NodeId(0), &shear)
        .unwrap()
        .is_none());
}

#[test]
fn invariant_survives_random_basis_changes() {
    let mut rng = StdRng::seed_from_u64(7);
    let base = PeriodicGraph::from_key(FIXED_POINT_KEYS[3]).unwrap();
    for _ in 0..5 {
        // product of random elementary integer matrices
        let mut u = QMatrix::identity(3);
        for _ in 0..4 {
            let (i, j) = (rng.gen_range(0..3), rng.gen_range(0..3));
            if i == j {
                continue;
            }
            let k = rng.gen_range(-2i64..=2);
            let mut e = QMatrix::identity(3);
            e.set(i, j, crate::arith::rat(k));
            u = &u * &e;
        }
        let mut h = PeriodicGraph::new(3);
        for _ in base.node_ids() {
            h.new_node();
        }
        for e in base.edge_ids() {
            let data = base.edge(e).unwrap();
            let s = crate::arith::vec_mat(&data.shift, &u);
            h.new_edge_q(data.source, data.target, s).unwrap();
        }
        assert_eq!(h.invariant().unwrap(), base.invariant().unwrap());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn invariant_ignores_node_order(perm in Just((0..4usize).collect::<Vec<_>>()).prop_shuffle()) {
        let base = PeriodicGraph::from_key(FIXED_POINT_KEYS[3]).unwrap();
        let mut h = PeriodicGraph::new(3);
        for _ in 0..4 {
            h.new_node();
        }
        for e in base.edge_ids() {
            let data = base.edge(e).unwrap();
            h.new_edge_q(
                NodeId(perm[data.source.0]),
                NodeId(perm[data.target.0]),
                data.shift.clone(),
            )
            .unwrap();
        }
        prop_assert_eq!(h.invariant().unwrap(), base.invariant().unwrap());
    }
}
