//! Choice of a reduced conventional cell for monoclinic and triclinic
//! groups, where the conventional setting leaves the cell underdetermined.

use std::cmp::Ordering;

use nalgebra::DMatrix;
use num_traits::{Signed, Zero};

use crate::arith::{add, neg, rat, sign_of, sub, to_f64, QMatrix, QVec, Rat};
use crate::error::{Result, SystreError};

use super::finder::GroupMatch;
use super::optype::CrystalSystem;

const REDUCTION_EPS: f64 = 1e-12;
const MAX_REDUCTION_STEPS: usize = 10_000;

/// Monoclinic settings where both `a` and `c` may be changed.
const FREE_AC: [&str; 5] = ["P121", "P1211", "P1m1", "P12/m1", "P121/m1"];
/// Monoclinic settings where `c` is fixed by a glide.
const FIXED_C: [&str; 3] = ["P1c1", "P12/c1", "P121/c1"];
/// Monoclinic settings where `a` is fixed by the centering.
const FIXED_A: [&str; 3] = ["C121", "C1m1", "C12/m1"];
/// Monoclinic settings where glide and centering fix the cell.
const FIXED_AC: [&str; 2] = ["C1c1", "C12/c1"];

/// `u·G·vᵀ` for rational coordinate vectors and a floating-point metric.
fn dot_g(u: &[Rat], v: &[Rat], gram: &DMatrix<f64>) -> f64 {
    let mut s = 0.0;
    for (i, ui) in u.iter().enumerate() {
        let ui = to_f64(ui);
        for (j, vj) in v.iter().enumerate() {
            s += ui * gram[(i, j)] * to_f64(vj);
        }
    }
    s
}

fn round_rat(x: f64) -> Rat {
    rat(x.round() as i64)
}

fn minus_multiple(a: &[Rat], t: &Rat, b: &[Rat]) -> QVec {
    let tb: QVec = b.iter().map(|x| t * x).collect();
    sub(a, &tb)
}

/// Linear change `C` (acting as `y ↦ y·C` on conventional coordinates) onto
/// the corrected cell, for a net whose metric in input coordinates is
/// `gram`. Identity unless the group is monoclinic or triclinic in 3D.
pub fn cell_correction(m: &GroupMatch, gram: &DMatrix<f64>) -> Result<QMatrix> {
    let d = gram.nrows();
    if d != 3 || !matches!(m.system, CrystalSystem::Monoclinic | CrystalSystem::Triclinic) {
        return Ok(QMatrix::identity(d));
    }
    let from = m.from_std()?.linear().to_rows();
    let (a, b, c) = (from[0].clone(), from[1].clone(), from[2].clone());

    let mut to = if m.system == CrystalSystem::Triclinic {
        reduced_lattice_basis(&from, gram)?
    } else {
        let name = m.name.as_str();
        if FREE_AC.contains(&name) {
            let nu = reduced_lattice_basis(&[a, c], gram)?;
            vec![nu[0].clone(), b, nu[1].clone()]
        } else if FIXED_C.contains(&name) {
            let t = round_rat(dot_g(&a, &c, gram) / dot_g(&c, &c, gram));
            let mut new_a = minus_multiple(&a, &t, &c);
            if dot_g(&new_a, &c, gram) > 0.0 {
                new_a = neg(&new_a);
            }
            vec![new_a, b, c]
        } else if FIXED_A.contains(&name) {
            let t = round_rat(dot_g(&a, &c, gram) / dot_g(&a, &a, gram));
            let mut new_c = minus_multiple(&c, &t, &a);
            if dot_g(&a, &new_c, gram) > 0.0 {
                new_c = neg(&new_c);
            }
            vec![a, b, new_c]
        } else if FIXED_AC.contains(&name) {
            vec![a, b, c]
        } else {
            return Err(SystreError::Internal(format!(
                "Cannot handle monoclinic space group {name}."
            )));
        }
    };
    if m.system == CrystalSystem::Monoclinic && dot_g(&to[0], &to[2], gram) > 0.0 {
        to[2] = neg(&to[2]);
    }

    let f = QMatrix::from_rows(from, 3);
    let t = QMatrix::from_rows(to, 3);
    let ti = t
        .inverse()
        .ok_or_else(|| SystreError::Internal("corrected cell is degenerate".into()))?;
    Ok(&f * &ti)
}

/// Shortest-vector basis of the lattice spanned by `v` (two or three
/// vectors), picked from the Dirichlet domain normals. Orientation is kept
/// for full-dimensional input.
pub fn reduced_lattice_basis(v: &[QVec], gram: &DMatrix<f64>) -> Result<Vec<QVec>> {
    let mut normals = match v.len() {
        2 => {
            let t = gauss_reduced(v, gram)?;
            let sum = add(&t[0], &t[1]);
            vec![t[0].clone(), t[1].clone(), sum]
        }
        3 => {
            let t = selling_reduced(v, gram)?;
            vec![
                t[0].clone(),
                t[1].clone(),
                t[2].clone(),
                add(&t[0], &t[1]),
                add(&t[0], &t[2]),
                add(&t[1], &t[2]),
                add(&add(&t[0], &t[1]), &t[2]),
            ]
        }
        n => {
            return Err(SystreError::Internal(format!(
                "cannot reduce a lattice basis of {n} vectors"
            )))
        }
    };
    normals.sort_by(|x, y| {
        let (nx, ny) = (dot_g(x, x, gram), dot_g(y, y, gram));
        match nx.partial_cmp(&ny) {
            Some(Ordering::Equal) | None => {
                let ax: QVec = x.iter().map(|c| c.abs()).collect();
                let ay: QVec = y.iter().map(|c| c.abs()).collect();
                ay.cmp(&ax)
            }
            Some(o) => o,
        }
    });

    let k_dim = v.len();
    let cols = v[0].len();
    let mut w: Vec<QVec> = Vec::with_capacity(k_dim);
    let mut k = 0;
    for i in 0..k_dim {
        loop {
            let Some(cand) = normals.get(k) else {
                return Err(SystreError::Internal(
                    "could not find a reduced lattice basis".into(),
                ));
            };
            let mut x = cand.clone();
            if sign_of(&x) < 0 {
                x = neg(&x);
            }
            if i > 0 && dot_g(&w[0], &x, gram) > 0.0 {
                x = neg(&x);
            }
            let mut trial = w.clone();
            trial.push(x);
            if QMatrix::from_rows(trial.clone(), cols).rank() > i {
                w = trial;
                break;
            }
            k += 1;
        }
    }
    if k_dim == cols {
        let old = QMatrix::from_rows(v.to_vec(), cols).determinant();
        let new = QMatrix::from_rows(w.clone(), cols).determinant();
        if old.is_zero() {
            return Err(SystreError::Internal("lattice vectors do not form a basis".into()));
        }
        if (old > Rat::zero()) != (new > Rat::zero()) {
            let last = k_dim - 1;
            w[last] = neg(&w[last]);
        }
    }
    Ok(w)
}

/// Gauss (Lagrange) reduction of two vectors.
fn gauss_reduced(v: &[QVec], gram: &DMatrix<f64>) -> Result<Vec<QVec>> {
    let mut v = v.to_vec();
    let mut sl = [dot_g(&v[0], &v[0], gram), dot_g(&v[1], &v[1], gram)];
    for _ in 0..MAX_REDUCTION_STEPS {
        let i = if sl[0] < sl[1] { 0 } else { 1 };
        let j = 1 - i;
        let t = round_rat(dot_g(&v[i], &v[j], gram) / sl[i]);
        v[j] = minus_multiple(&v[j], &t, &v[i]);
        sl[j] = dot_g(&v[j], &v[j], gram);
        if sl[j] >= sl[i] - REDUCTION_EPS {
            if dot_g(&v[0], &v[1], gram) > 0.0 {
                v[1] = neg(&v[1]);
            }
            return Ok(v);
        }
    }
    Err(SystreError::Internal("Gauss reduction did not terminate".into()))
}

/// Selling reduction of three vectors: makes all pairwise products of the
/// superbase `v0, v1, v2, -(v0+v1+v2)` non-positive.
fn selling_reduced(v: &[QVec], gram: &DMatrix<f64>) -> Result<Vec<QVec>> {
    let s = add(&add(&v[0], &v[1]), &v[2]);
    let mut w = vec![v[0].clone(), v[1].clone(), v[2].clone(), neg(&s)];
    for _ in 0..MAX_REDUCTION_STEPS {
        let mut changed = false;
        'pairs: for i in 0..3 {
            for j in i + 1..4 {
                if dot_g(&w[i], &w[j], gram) > REDUCTION_EPS {
                    for k in 0..4 {
                        if k != i && k != j {
                            w[k] = add(&w[k], &w[i]);
                        }
                    }
                    w[i] = neg(&w[i]);
                    changed = true;
                    break 'pairs;
                }
            }
        }
        if !changed {
            w.truncate(3);
            return Ok(w);
        }
    }
    Err(SystreError::Internal("Selling reduction did not terminate".into()))
}
