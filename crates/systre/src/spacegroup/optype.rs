//! Geometric classification of point-group elements and crystal systems.

use std::fmt;

use num_traits::{One, Signed, Zero};

use crate::arith::{rat, sign_of, vec_mat, QMatrix, QVec, Rat};

/// Smallest `k ≤ max` with `m^k = I`, or 0.
pub(crate) fn matrix_order(m: &QMatrix, max: u32) -> u32 {
    let mut p = m.clone();
    for k in 1..=max {
        if p.is_identity() {
            return k;
        }
        p = &p * m;
    }
    0
}

/// Conjugation-invariant summary of a linear part, used to pre-filter
/// candidate groups: `(det, order or 0, trace)`.
pub(crate) fn signature(m: &QMatrix) -> (Rat, u32, Rat) {
    (m.determinant(), matrix_order(m, 6), m.trace())
}

/// What kind of motion a linear part describes.
///
/// In 3D an orientation-reversing part is classified through its negative,
/// so a mirror reads as a twofold axis perpendicular to the mirror plane and
/// a rotoinversion as the associated rotation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OperatorType {
    pub dimension: usize,
    pub orientation_preserving: bool,
    /// 1, 2, 3, 4 or 6; 0 when the order is not crystallographic.
    pub order: u32,
    pub clockwise: bool,
    /// Spans the fixed space when that is one-dimensional.
    pub axis: Option<QVec>,
}

impl OperatorType {
    pub fn of(linear: &QMatrix) -> Self {
        let d = linear.nrows();
        let orientation_preserving = !linear.determinant().is_negative();
        let m = if d == 3 && !orientation_preserving {
            -linear
        } else {
            linear.clone()
        };
        let order = matrix_order(&m, 6);
        let fixed = (&m - &QMatrix::identity(d)).row_null_space();
        let axis = (fixed.nrows() == 1).then(|| {
            let a = fixed.row(0).to_vec();
            if sign_of(&a) < 0 {
                a.iter().map(|x| -x.clone()).collect()
            } else {
                a
            }
        });
        let turns = order == 0 || order > 2;
        let clockwise = match d {
            2 => {
                if !orientation_preserving {
                    false
                } else if turns {
                    let v = vec![Rat::one(), Rat::zero()];
                    oriented(&[v.clone(), vec_mat(&v, &m)])
                } else {
                    true
                }
            }
            3 => match &axis {
                Some(a) if turns => {
                    let along_x = a[1].is_zero() && a[2].is_zero();
                    let v = if along_x {
                        vec![rat(0), rat(1), rat(0)]
                    } else {
                        vec![rat(1), rat(0), rat(0)]
                    };
                    oriented(&[a.clone(), v.clone(), vec_mat(&v, &m)])
                }
                _ => true,
            },
            _ => true,
        };
        Self {
            dimension: d,
            orientation_preserving,
            order,
            clockwise,
            axis,
        }
    }
}

fn oriented(rows: &[QVec]) -> bool {
    QMatrix::from_rows(rows.to_vec(), rows.len())
        .determinant()
        .is_positive()
}

/// Crystal systems of plane and space groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CrystalSystem {
    Oblique,
    Rectangular,
    Square,
    Triclinic,
    Monoclinic,
    Orthorhombic,
    Tetragonal,
    Trigonal,
    Hexagonal,
    Cubic,
}

impl CrystalSystem {
    /// Derives the system from the linear parts of a point group.
    pub fn of_point_group(dim: usize, linear_parts: &[QMatrix]) -> Self {
        let types: Vec<OperatorType> = linear_parts.iter().map(OperatorType::of).collect();
        let count = |k: u32| types.iter().filter(|t| t.order == k).count();
        if dim == 2 {
            if count(6) > 0 || count(3) > 0 {
                CrystalSystem::Hexagonal
            } else if count(4) > 0 {
                CrystalSystem::Square
            } else if types.iter().any(|t| !t.orientation_preserving) {
                CrystalSystem::Rectangular
            } else {
                CrystalSystem::Oblique
            }
        } else if count(6) > 0 {
            CrystalSystem::Hexagonal
        } else if count(3) >= 8 {
            CrystalSystem::Cubic
        } else if count(3) > 0 {
            CrystalSystem::Trigonal
        } else if count(4) > 0 {
            CrystalSystem::Tetragonal
        } else if count(2) > 2 {
            CrystalSystem::Orthorhombic
        } else if count(2) > 0 {
            CrystalSystem::Monoclinic
        } else {
            CrystalSystem::Triclinic
        }
    }
}

impl fmt::Display for CrystalSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CrystalSystem::Oblique => "oblique",
            CrystalSystem::Rectangular => "rectangular",
            CrystalSystem::Square => "square",
            CrystalSystem::Triclinic => "triclinic",
            CrystalSystem::Monoclinic => "monoclinic",
            CrystalSystem::Orthorhombic => "orthorhombic",
            CrystalSystem::Tetragonal => "tetragonal",
            CrystalSystem::Trigonal => "trigonal",
            CrystalSystem::Hexagonal => "hexagonal",
            CrystalSystem::Cubic => "cubic",
        })
    }
}
