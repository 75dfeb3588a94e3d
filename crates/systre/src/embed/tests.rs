use nalgebra::DMatrix;

use super::*;
use crate::arith::{frac, rat, QMatrix};
use crate::error::SystreError;
use crate::pgraph::{NodeId, PeriodicGraph};
use crate::spacegroup::Operator;

fn dia() -> PeriodicGraph {
    PeriodicGraph::from_key("3 1 2 0 0 0 1 2 0 0 1 1 2 0 1 0 1 2 1 0 0").unwrap()
}

fn hcb() -> PeriodicGraph {
    PeriodicGraph::from_edges(2, 2, &[(0, 1, vec![0, 0]), (0, 1, vec![1, 0]), (0, 1, vec![0, 1])])
        .unwrap()
}

fn pcu() -> PeriodicGraph {
    PeriodicGraph::from_edges(
        3,
        1,
        &[(0, 0, vec![1, 0, 0]), (0, 0, vec![0, 1, 0]), (0, 0, vec![0, 0, 1])],
    )
    .unwrap()
}

fn cds() -> PeriodicGraph {
    PeriodicGraph::from_key("3 1 1 -1 0 0 1 2 0 0 0 1 2 0 1 0 2 2 0 0 -1").unwrap()
}

fn linear(s: &str) -> QMatrix {
    Operator::parse(s).unwrap().linear()
}

fn quick() -> EmbedCfg {
    EmbedCfg {
        passes: 1,
        restarts: 2,
        ..EmbedCfg::default()
    }
}

#[test]
fn gram_space_of_tetragonal_axis() {
    assert_eq!(gram_config_space(3, &[]).nrows(), 6);
    assert_eq!(gram_config_space(3, &[linear("-y,x,z")]).nrows(), 2);
    assert_eq!(gram_config_space(2, &[linear("-y,x-y")]).nrows(), 1);
    let ortho = [linear("-x,-y,z"), linear("x,-y,-z")];
    assert_eq!(gram_config_space(3, &ortho).nrows(), 3);
}

#[test]
fn position_spaces_from_symmetrizers() {
    // trivial site symmetry: all of space
    let free = normalized_position_space(&QMatrix::identity(4)).unwrap();
    assert_eq!(free.nrows(), 4);
    assert_eq!(free.get(3, 3), &rat(1));
    for i in 0..3 {
        assert_eq!(free.get(i, 3), &rat(0));
    }

    // projection onto a single point
    let mut s = QMatrix::zero(4, 4);
    s.set(3, 0, frac(1, 4));
    s.set(3, 1, frac(1, 2));
    s.set(3, 3, rat(1));
    let pinned = normalized_position_space(&s).unwrap();
    assert_eq!(pinned.nrows(), 1);
    assert_eq!(pinned.row(0), &[frac(1, 4), frac(1, 2), rat(0), rat(1)]);

    // average of the identity and the mirror x -> -x
    let mut m = QMatrix::identity(4);
    m.set(0, 0, rat(0));
    let plane = normalized_position_space(&m).unwrap();
    assert_eq!(plane.nrows(), 3);
    assert_eq!(plane.get(2, 0), &rat(0));
}

#[test]
fn diamond_parameter_space() {
    let emb = Embedder::new(&dia(), EmbedCfg::default()).unwrap();
    assert_eq!(emb.gram_dimension(), 1);
    assert_eq!(emb.parameter_dimension(), 1);
    assert_eq!(emb.degrees_of_freedom(), 0);
    assert!(!emb.cell_relaxed());
    assert!(!emb.positions_relaxed());

    let stats = emb.edge_statistics().unwrap().unwrap();
    assert!(stats.max - stats.min < 1e-9);
    let angles = emb.angle_statistics().unwrap().unwrap();
    let tetrahedral = (-1.0f64 / 3.0).acos().to_degrees();
    assert!((angles.min - tetrahedral).abs() < 1e-6);
    assert!((angles.max - tetrahedral).abs() < 1e-6);
}

#[test]
fn fixed_nodes_stay_pinned() {
    for g in [hcb(), pcu()] {
        let emb = Embedder::new(&g, EmbedCfg::default()).unwrap();
        assert_eq!(emb.gram_dimension(), 1);
        assert_eq!(emb.parameter_dimension(), 1);
        assert_eq!(emb.degrees_of_freedom(), 0);
    }
}

#[test]
fn diamond_relaxes_to_uniform_edges() {
    let mut emb = Embedder::new(&dia(), quick()).unwrap();
    let before = emb.energy();
    assert!(before.is_finite());
    emb.go(300);
    assert!(emb.cell_relaxed());
    assert!(emb.positions_relaxed());
    assert!(emb.energy() <= before);

    emb.normalize().unwrap();
    let stats = emb.edge_statistics().unwrap().unwrap();
    assert!((stats.avg - 1.0).abs() < 1e-9);
    assert!(stats.max - stats.min < 1e-9);

    let g = emb.gram_matrix();
    assert!((g[(0, 0)] - g[(1, 1)]).abs() < 1e-9);
    assert!((g[(1, 1)] - g[(2, 2)]).abs() < 1e-9);
    assert!(g.determinant() > 0.0);
}

#[test]
fn passes_never_increase_energy() {
    let mut emb = Embedder::new(&cds(), quick()).unwrap();
    let mut last = emb.energy();
    for _ in 0..3 {
        emb.go(200);
        let e = emb.energy();
        assert!(e <= last + 1e-12, "{e} > {last}");
        last = e;
    }
}

#[test]
fn cell_only_relaxation_keeps_positions() {
    let g = cds();
    let mut emb = Embedder::new(&g, quick()).unwrap();
    let start = emb.positions();
    emb.set_relax_positions(false);
    emb.go(200);
    assert!(emb.cell_relaxed());
    assert!(!emb.positions_relaxed());
    for (v, p) in emb.positions() {
        assert!((&p - &start[&v]).norm() < 1e-12);
    }

    emb.reset().unwrap();
    assert!(!emb.cell_relaxed());
    let pos = g.barycentric_placement().unwrap();
    for (v, p) in emb.positions() {
        for (x, y) in p.iter().zip(&pos[v.0]) {
            assert!((x - crate::arith::to_f64(y)).abs() < 1e-12);
        }
    }
}

#[test]
fn setters_reject_symmetry_breaking_input() {
    let mut emb = Embedder::new(&dia(), EmbedCfg::default()).unwrap();
    let positions = emb.positions();
    emb.set_positions(&positions).unwrap();

    let mut moved = positions[&NodeId(0)].clone();
    moved[0] += 0.1;
    assert!(matches!(
        emb.set_position(NodeId(0), &moved),
        Err(SystreError::Internal(_))
    ));

    let skewed = DMatrix::from_diagonal(&nalgebra::DVector::from_vec(vec![1.0, 2.0, 3.0]));
    assert!(emb.set_gram_matrix(&skewed).is_err());
    let g = emb.gram_matrix() * 4.0;
    emb.set_gram_matrix(&g).unwrap();
    assert!((emb.gram_matrix() - g).amax() < 1e-12);
}

#[test]
fn amoeba_finds_a_quadratic_minimum() {
    let amoeba = Amoeba::new(1e-12, 2000, 3, 1.0);
    let f = |x: &[f64]| (x[0] - 1.0).powi(2) + 3.0 * (x[1] + 2.0).powi(2) + 0.5;
    let (x, fx) = amoeba.minimize(f, &[0.0, 0.0]);
    assert!((x[0] - 1.0).abs() < 1e-4);
    assert!((x[1] + 2.0).abs() < 1e-4);
    assert!((fx - 0.5).abs() < 1e-8);
}

#[test]
fn amoeba_treats_nan_as_infinite() {
    let amoeba = Amoeba::new(1e-9, 500, 1, 0.5);
    let f = |x: &[f64]| if x[0] < 0.0 { f64::NAN } else { (x[0] - 2.0).powi(2) };
    let (x, fx) = amoeba.minimize(f, &[0.25]);
    assert!(fx <= (0.25f64 - 2.0).powi(2));
    assert!(x[0] >= 0.0);
}

#[test]
fn relaxation_warnings_render() {
    let w = RelaxationWarning::DegenerateCell { pass: 1, det: 1e-5 };
    assert_eq!(w.pass(), 1);
    assert_eq!(w.to_string(), "Unit cell degenerated in relaxation.");
    let w = RelaxationWarning::CouldNotRelax {
        pass: 0,
        reason: "degenerate unit cell while relaxing".into(),
    };
    assert_eq!(w.to_string(), "Could not relax: degenerate unit cell while relaxing");
}
