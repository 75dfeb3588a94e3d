use std::collections::BTreeMap;
use std::sync::OnceLock;

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::arith::{frac, rat, QMatrix};
use crate::error::SystreError;
use crate::pgraph::PeriodicGraph;

fn catalogue() -> &'static Catalogue {
    static CAT: OnceLock<Catalogue> = OnceLock::new();
    CAT.get_or_init(|| Catalogue::builtin().unwrap())
}

fn op(s: &str) -> Operator {
    Operator::parse(s).unwrap()
}

#[test]
fn operator_parse_and_display() {
    let a = op("-y,x-y,z+1/2");
    assert_eq!(a.dimension(), 3);
    assert_eq!(a.to_string(), "-y,x-y,z+1/2");
    assert_eq!(a.shift(), vec![rat(0), rat(0), frac(1, 2)]);
    // the image of (1,0,0) is (0,1,0)
    assert_eq!(a.apply_linear(&[rat(1), rat(0), rat(0)]), vec![rat(0), rat(1), rat(0)]);

    assert_eq!(op("1/2+x, y").to_string(), "x+1/2,y");
    assert_eq!(op("-X+0.25,2y").to_string(), "-x+1/4,2*y");
    assert!(matches!(Operator::parse("x,q"), Err(SystreError::Parse { .. })));
    assert!(Operator::parse("x,y,z,x").is_err());
}

#[test]
fn operator_algebra() {
    let four = op("-y,x,z");
    let mut p = Operator::identity(3);
    for _ in 0..4 {
        p = p.then(&four);
    }
    assert_eq!(p, Operator::identity(3));

    let screw = op("-y,x,z+1/4");
    let inv = screw.inverse().unwrap();
    assert_eq!(screw.then(&inv), Operator::identity(3));
    assert_eq!(op("x+3/2,y-1,z").mod_z(), op("x+1/2,y,z"));
    assert!(op("x+1/2,y+1/2,z").is_translation());
}

#[test]
fn operator_types() {
    let t = OperatorType::of(&op("-y,x,z").linear());
    assert!(t.orientation_preserving);
    assert_eq!(t.order, 4);
    assert_eq!(t.axis, Some(vec![rat(0), rat(0), rat(1)]));

    let mirror = OperatorType::of(&op("-x,y,z").linear());
    assert!(!mirror.orientation_preserving);
    assert_eq!(mirror.order, 2);
    assert_eq!(mirror.axis, Some(vec![rat(1), rat(0), rat(0)]));

    let inversion = OperatorType::of(&op("-x,-y,-z").linear());
    assert_eq!(inversion.order, 1);

    let a = OperatorType::of(&op("-y,x").linear());
    let b = OperatorType::of(&op("y,-x").linear());
    assert_eq!((a.order, b.order), (4, 4));
    assert_ne!(a.clockwise, b.clockwise);
}

#[test]
fn catalogue_contents() {
    let cat = catalogue();
    assert_eq!(cat.len(), 247);
    let mut systems: BTreeMap<(usize, CrystalSystem), usize> = BTreeMap::new();
    for e in cat.entries() {
        *systems.entry((e.dimension, e.system)).or_default() += 1;
    }
    let expect = [
        ((2, CrystalSystem::Oblique), 2),
        ((2, CrystalSystem::Rectangular), 7),
        ((2, CrystalSystem::Square), 3),
        ((2, CrystalSystem::Hexagonal), 5),
        ((3, CrystalSystem::Triclinic), 2),
        ((3, CrystalSystem::Monoclinic), 13),
        ((3, CrystalSystem::Orthorhombic), 59),
        ((3, CrystalSystem::Tetragonal), 68),
        ((3, CrystalSystem::Trigonal), 25),
        ((3, CrystalSystem::Hexagonal), 27),
        ((3, CrystalSystem::Cubic), 36),
    ];
    for (k, n) in expect {
        assert_eq!(systems.get(&k), Some(&n), "{k:?}");
    }

    let fd3m = cat.entry("Fd-3m").unwrap();
    assert_eq!(fd3m.operators.len(), 192);
    assert_eq!(fd3m.point_group_order(), 48);
    assert_eq!(fd3m.centering, 'F');
    assert_eq!(fd3m.primitive_cell.determinant(), frac(1, 4));
    assert!(fd3m.transform.linear().is_identity());
}

#[test]
fn catalogue_names_and_aliases() {
    let cat = catalogue();
    assert_eq!(cat.normalized_name("P 21/c"), Some("P121/c1"));
    assert_eq!(cat.normalized_name("P121/c1"), Some("P121/c1"));
    assert_eq!(cat.normalized_name("p6m"), Some("p6mm"));
    assert_eq!(cat.normalized_name("Xyz"), None);
    assert_eq!(cat.operators("C2/c").map(<[Operator]>::len), Some(8));
    assert!(cat.transform("Ia-3d").is_some());
}

#[test]
fn catalogue_parse_errors() {
    let err = Catalogue::parse("  x,y\n").unwrap_err();
    assert!(matches!(err, SystreError::Parse { line: 1, .. }));
    let err = Catalogue::parse("p1\n  x,y\np2\n  x,y\n  -x,w\n").unwrap_err();
    assert!(matches!(err, SystreError::Parse { line: 5, .. }));
    let err = Catalogue::parse("alias p\n").unwrap_err();
    assert!(matches!(err, SystreError::Parse { .. }));
}

#[test]
fn groups_close_and_reduce() {
    let g = SpaceGroup::generated_by(3, &[op("-x,-y,-z"), op("-x,y+1/2,-z+1/2")]).unwrap();
    assert_eq!(g.len(), 4);
    assert!(g.is_group());
    assert_eq!(g.crystal_system(), CrystalSystem::Monoclinic);

    let c = SpaceGroup::new(2, [op("x,y"), op("x+1/2,y+1/2"), op("-x,y"), op("-x+1/2,y+1/2")])
        .unwrap();
    assert!(c.is_group());
    assert_eq!(c.pure_translations(), vec![vec![frac(1, 2), frac(1, 2)]]);
    assert_eq!(c.primitive_operators().unwrap().len(), 2);

    let partial = SpaceGroup::new(3, [op("-y,x,z")]).unwrap();
    assert!(!partial.is_group());
    assert!(SpaceGroup::new(3, [op("2*x,y,z")]).is_err());
    assert!(SpaceGroup::new(3, [op("x,y")]).is_err());
}

#[test]
fn catalogue_groups_are_closed() {
    for name in ["P121/c1", "p4gm", "R-3m", "I4132", "Pnma"] {
        let e = catalogue().entry(name).unwrap();
        let g = SpaceGroup::new(e.dimension, e.operators.clone()).unwrap();
        assert!(g.is_group(), "{name}");
    }
}

fn random_unimodular(rng: &mut StdRng, d: usize) -> QMatrix {
    loop {
        let m = QMatrix::from_fn(d, d, |_, _| rat(rng.gen_range(-2..=2)));
        if m.determinant() == rat(1) {
            return m;
        }
    }
}

/// Operators of `entry` in a random primitive setting.
fn disguised(entry: &CatalogueEntry, rng: &mut StdRng) -> Vec<Operator> {
    let d = entry.dimension;
    let prim = SpaceGroup::new(d, entry.operators.clone())
        .unwrap()
        .primitive_operators()
        .unwrap();
    let shift: Vec<_> = (0..d).map(|_| frac(rng.gen_range(0..8), 8)).collect();
    let change = Operator::from_parts(&random_unimodular(rng, d), &shift);
    let back = change.inverse().unwrap();
    prim.iter()
        .map(|p| change.then(p).then(&back).mod_z())
        .collect()
}

#[test]
fn finder_recognizes_disguised_groups() {
    let cat = catalogue();
    let finder = SpaceGroupFinder::new(cat);
    let mut rng = StdRng::seed_from_u64(11);
    let names = [
        "p2mg", "p31m", "p6mm", "P-1", "P121/c1", "C12/c1", "Pnma", "Fddd", "I41/amd", "R-3m",
        "P6122", "P6522", "Pa-3", "I4132", "Fd-3m", "Ia-3d",
    ];
    for name in names {
        let entry = cat.entry(name).unwrap();
        let ops = disguised(entry, &mut rng);
        let m = finder.find_operators(entry.dimension, &ops).unwrap();
        assert_eq!(m.name, name);
        assert_eq!(m.system, entry.system);
        finder.verify(&m, &ops).unwrap();
    }
}

#[test]
fn finder_rejects_unsupported_input() {
    let finder = SpaceGroupFinder::new(catalogue());
    let ops = vec![Operator::identity(4)];
    assert!(matches!(
        finder.find_operators(4, &ops),
        Err(SystreError::UnsupportedDimension(4))
    ));
    let centred = vec![op("x,y,z"), op("x+1/2,y+1/2,z")];
    assert!(finder.find_operators(3, &centred).is_err());
}

#[test]
fn diamond_is_fd3m() {
    let dia = PeriodicGraph::from_key("3 1 2 0 0 0 1 2 0 0 1 1 2 0 1 0 1 2 1 0 0").unwrap();
    let ops: Vec<Operator> = dia
        .symmetry_operators()
        .unwrap()
        .into_iter()
        .filter_map(Operator::from_homogeneous)
        .collect();
    assert_eq!(ops.len(), 48);
    let finder = SpaceGroupFinder::new(catalogue());
    let m = finder.find_operators(3, &ops).unwrap();
    assert_eq!(m.name, "Fd-3m");
    assert_eq!(m.centering, 'F');
    finder.verify(&m, &ops).unwrap();
}

#[test]
fn reduced_bases() {
    let g2 = DMatrix::<f64>::identity(2, 2);
    let v = vec![vec![rat(1), rat(0)], vec![rat(1), rat(1)]];
    let w = reduced_lattice_basis(&v, &g2).unwrap();
    assert_eq!(w, vec![vec![rat(1), rat(0)], vec![rat(0), rat(1)]]);

    let g3 = DMatrix::<f64>::identity(3, 3);
    let v = vec![
        vec![rat(1), rat(0), rat(0)],
        vec![rat(1), rat(1), rat(0)],
        vec![rat(1), rat(1), rat(1)],
    ];
    let w = reduced_lattice_basis(&v, &g3).unwrap();
    for row in &w {
        let norm: i64 = row.iter().map(|x| crate::arith::to_i64(&(x * x)).unwrap()).sum();
        assert_eq!(norm, 1);
    }
    assert_eq!(QMatrix::from_rows(w, 3).determinant(), rat(1));
}

#[test]
fn monoclinic_cell_correction() {
    let m = GroupMatch {
        name: "P121/c1".into(),
        system: CrystalSystem::Monoclinic,
        centering: 'P',
        to_std: Operator::identity(3),
    };
    let gram = DMatrix::from_row_slice(3, 3, &[4.0, 0.0, 3.0, 0.0, 1.0, 0.0, 3.0, 0.0, 4.0]);
    let c = cell_correction(&m, &gram).unwrap();
    assert_eq!(c, QMatrix::from_i64_rows(&[vec![1, 0, 1], vec![0, 1, 0], vec![0, 0, 1]]));

    let cubic = GroupMatch {
        system: CrystalSystem::Cubic,
        ..m.clone()
    };
    assert!(cell_correction(&cubic, &gram).unwrap().is_identity());

    let odd = GroupMatch {
        name: "P2".into(),
        ..m
    };
    assert!(matches!(cell_correction(&odd, &gram), Err(SystreError::Internal(_))));
}
