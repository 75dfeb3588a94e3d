//! Exact construction of the embedder's parameter spaces.

use std::collections::BTreeSet;

use num_traits::{One, Zero};

use crate::arith::{frac, rat, sub, QMatrix, QVec, Rat};
use crate::error::{Result, SystreError};
use crate::pgraph::{NodeId, PeriodicGraph};

/// Position of entry `(i, j)` of a symmetric `d×d` matrix in the packed
/// upper triangle, row by row with the diagonal first.
pub(crate) fn gram_index(d: usize) -> Vec<Vec<usize>> {
    let mut index = vec![vec![0; d]; d];
    let mut k = 0;
    for i in 0..d {
        index[i][i] = k;
        k += 1;
        for j in i + 1..d {
            index[i][j] = k;
            index[j][i] = k;
            k += 1;
        }
    }
    index
}

/// Rows span the symmetric matrices `G` (packed as in [`gram_index`]) with
/// `A·G·Aᵀ = G` for every given linear part.
pub fn gram_config_space(d: usize, linear_parts: &[QMatrix]) -> QMatrix {
    let index = gram_index(d);
    let m = d * (d + 1) / 2;
    let parts: BTreeSet<&QMatrix> = linear_parts.iter().filter(|a| !a.is_identity()).collect();
    if parts.is_empty() {
        return QMatrix::identity(m);
    }

    // column block per linear part, one column per packed entry
    let mut coeff = QMatrix::zero(m, m * parts.len());
    for (i, j) in (0..d).flat_map(|i| (i..d).map(move |j| (i, j))) {
        let mut e = QMatrix::zero(d, d);
        e.set(i, j, Rat::one());
        e.set(j, i, Rat::one());
        let k = index[i][j];
        for (b, a) in parts.iter().enumerate() {
            let image = &(&(*a * &e) * &a.transpose()) - &e;
            for (r, s) in (0..d).flat_map(|r| (r..d).map(move |s| (r, s))) {
                coeff.set(k, b * m + index[r][s], image.get(r, s).clone());
            }
        }
    }
    coeff.row_null_space()
}

/// Average of `A·G·Aᵀ` over the given linear parts.
pub(crate) fn resymmetrized(g: &QMatrix, linear_parts: &[QMatrix]) -> QMatrix {
    let d = g.nrows();
    if linear_parts.is_empty() {
        return g.clone();
    }
    let mut sum = QMatrix::zero(d, d);
    for a in linear_parts {
        sum = &sum + &(&(a * g) * &a.transpose());
    }
    sum.scaled(&frac(1, linear_parts.len() as i64))
}

/// Homogeneous matrix of the translation by `t`.
pub(crate) fn translation(t: &[Rat]) -> QMatrix {
    let d = t.len();
    let mut m = QMatrix::identity(d + 1);
    for (i, x) in t.iter().enumerate() {
        m.set(d, i, x.clone());
    }
    m
}

/// Image of the point `p` under the homogeneous operator `op`.
pub(crate) fn apply(p: &[Rat], op: &QMatrix) -> QVec {
    let d = p.len();
    (0..d)
        .map(|j| {
            p.iter()
                .enumerate()
                .fold(op.get(d, j).clone(), |acc, (i, x)| acc + x * op.get(i, j))
        })
        .collect()
}

/// Stabilizer average of the affine action at `v`. Each stabilizing
/// operator is followed by the lattice translation that returns `v`'s
/// barycentric position to itself, so the average fixes that position and
/// projects onto the affine subspace of positions with the same site
/// symmetry.
pub(crate) fn node_symmetrizer(g: &PeriodicGraph, v: NodeId) -> Result<QMatrix> {
    let d = g.dimension();
    let pos = g.barycentric_placement()?;
    let p = &pos[v.0];
    let mut sum = QMatrix::zero(d + 1, d + 1);
    let mut count = 0i64;
    for s in g.symmetries()? {
        if s.image(v) != v {
            continue;
        }
        let a = s.operator();
        let back = sub(p, &apply(p, a));
        sum = &sum + &(a * &translation(&back));
        count += 1;
    }
    if count == 0 {
        return Err(SystreError::Internal(format!(
            "node {} has an empty stabilizer",
            v.0 + 1
        )));
    }
    Ok(sum.scaled(&frac(1, count)))
}

/// Normalized homogeneous basis of the fixed points of the symmetrizer `s`.
///
/// All rows but the last are direction vectors (last entry 0); the last row
/// is a base point with last entry 1. A node with `k` free coordinates gets
/// `k + 1` rows.
pub fn normalized_position_space(s: &QMatrix) -> Result<QMatrix> {
    let n = s.nrows();
    let fixed = (s - &QMatrix::identity(n)).row_null_space();
    let (echelon, pivots) = fixed.row_echelon();
    let mut rows: Vec<QVec> = echelon.to_rows().into_iter().take(pivots.len()).collect();
    let last = n - 1;
    let Some(k) = rows.iter().position(|r| !r[last].is_zero()) else {
        return Err(SystreError::Internal(
            "symmetrizer has no fixed point".into(),
        ));
    };
    let top = rows.len() - 1;
    rows.swap(k, top);
    let pivot = rows[top][last].clone();
    rows[top] = rows[top].iter().map(|x| x / &pivot).collect();
    let base = rows[top].clone();
    for row in rows.iter_mut().take(top) {
        let f = row[last].clone();
        if !f.is_zero() {
            *row = row.iter().zip(&base).map(|(x, b)| x - &f * b).collect();
        }
    }
    Ok(QMatrix::from_rows(rows, n))
}

/// Orbit representatives in node order, each with the operators moving it
/// onto the members of its orbit (itself first, with the identity). Every
/// operator maps the representative's barycentric position exactly onto
/// the member's.
pub(crate) fn node_images(g: &PeriodicGraph) -> Result<Vec<(NodeId, Vec<(NodeId, QMatrix)>)>> {
    let d = g.dimension();
    let pos = g.barycentric_placement()?;
    let syms = g.symmetries()?;
    let mut seen = vec![false; g.node_capacity()];
    let mut out = Vec::new();
    for v in g.node_ids() {
        if seen[v.0] {
            continue;
        }
        seen[v.0] = true;
        let mut images = vec![(v, QMatrix::identity(d + 1))];
        for s in syms {
            let w = s.image(v);
            if seen[w.0] {
                continue;
            }
            seen[w.0] = true;
            let a = s.operator();
            let fix = sub(&pos[w.0], &apply(&pos[v.0], a));
            let op = a * &translation(&fix);
            if apply(&pos[v.0], &op) != pos[w.0] {
                return Err(SystreError::Internal(format!(
                    "bad operator for node {} onto {}",
                    v.0 + 1,
                    w.0 + 1
                )));
            }
            images.push((w, op));
        }
        out.push((v, images));
    }
    Ok(out)
}

/// Dimension of the subspace fixed by all linear parts: directions in which
/// the whole net may slide without changing its geometry.
pub(crate) fn translational_freedom(d: usize, linear_parts: &[QMatrix]) -> usize {
    let parts: BTreeSet<&QMatrix> = linear_parts.iter().filter(|a| !a.is_identity()).collect();
    if parts.is_empty() {
        return d;
    }
    let id = QMatrix::identity(d);
    let mut m = QMatrix::zero(d, d * parts.len());
    for (b, a) in parts.iter().enumerate() {
        let diff = *a - &id;
        for i in 0..d {
            for j in 0..d {
                m.set(i, b * d + j, diff.get(i, j).clone());
            }
        }
    }
    m.row_null_space().nrows()
}

/// Distinct linear parts of the net's symmetries.
pub(crate) fn linear_parts(g: &PeriodicGraph) -> Result<Vec<QMatrix>> {
    let set: BTreeSet<QMatrix> = g.symmetries()?.iter().map(|s| s.matrix().clone()).collect();
    Ok(set.into_iter().collect())
}

/// The identity metric averaged over the symmetry group.
pub(crate) fn default_gram(g: &PeriodicGraph) -> Result<QMatrix> {
    let parts: Vec<QMatrix> = g.symmetries()?.iter().map(|s| s.matrix().clone()).collect();
    let gram = resymmetrized(&QMatrix::identity(g.dimension()), &parts);
    debug_assert!(gram.determinant() > rat(0));
    Ok(gram)
}
