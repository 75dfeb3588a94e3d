//! Integer lattice algorithms over rational matrices.
//!
//! All routines work with the Euclidean algorithm on rational entries, so the
//! "lattice" generated by a set of rational row vectors is handled the same
//! way as an integral one.

use num_traits::{Signed, Zero};

use super::{dot, QMatrix, QVec, Rat};

/// Integral row triangulation.
///
/// Returns `(H, T, r)` with `H = T·A`, `T` unimodular, the first `r` rows of
/// `H` in echelon form with positive pivots and all further rows zero. The
/// non-zero rows of `H` generate the same Z-module as the rows of `A`.
pub fn triangulate_integral(a: &QMatrix) -> (QMatrix, QMatrix, usize) {
    let m = a.nrows();
    let n = a.ncols();
    let mut h = a.clone();
    let mut t = QMatrix::identity(m);
    let mut r = 0;
    for c in 0..n {
        if r >= m {
            break;
        }
        loop {
            let Some(p) = (r..m)
                .filter(|&i| !h.get(i, c).is_zero())
                .min_by(|&i, &j| h.get(i, c).abs().cmp(&h.get(j, c).abs()))
            else {
                break;
            };
            h.swap_rows(r, p);
            t.swap_rows(r, p);
            if h.get(r, c).is_negative() {
                negate_row(&mut h, r);
                negate_row(&mut t, r);
            }
            let mut clean = true;
            for i in r + 1..m {
                if h.get(i, c).is_zero() {
                    continue;
                }
                let q = (h.get(i, c) / h.get(r, c)).floor();
                sub_row_multiple(&mut h, i, r, &q);
                sub_row_multiple(&mut t, i, r, &q);
                if !h.get(i, c).is_zero() {
                    clean = false;
                }
            }
            if clean {
                r += 1;
                break;
            }
        }
    }
    (h, t, r)
}

/// A Z-basis (as rows) of `{u ∈ Zⁿ : C·u = 0}` for an integral matrix `C`.
pub fn integer_kernel(c: &QMatrix) -> Vec<QVec> {
    let (_, t, r) = triangulate_integral(&c.transpose());
    (r..t.nrows()).map(|i| t.row(i).to_vec()).collect()
}

/// LLL reduction (δ = 3/4) of linearly independent rows under the standard
/// inner product.
pub fn lll_reduce(basis: Vec<QVec>) -> Vec<QVec> {
    let n = basis.len();
    let mut b = basis;
    if n < 2 {
        return b;
    }
    let delta = Rat::new(3.into(), 4.into());
    let (mut bs, mut mu) = gram_schmidt(&b);
    let mut k = 1;
    while k < n {
        for j in (0..k).rev() {
            let q = mu[k][j].round();
            if !q.is_zero() {
                let bj = b[j].clone();
                for (x, y) in b[k].iter_mut().zip(&bj) {
                    *x -= &q * y;
                }
                (bs, mu) = gram_schmidt(&b);
            }
        }
        let lhs = dot(&bs[k], &bs[k]);
        let rhs = (&delta - &mu[k][k - 1] * &mu[k][k - 1]) * dot(&bs[k - 1], &bs[k - 1]);
        if lhs >= rhs {
            k += 1;
        } else {
            b.swap(k, k - 1);
            (bs, mu) = gram_schmidt(&b);
            k = (k - 1).max(1);
        }
    }
    b
}

fn gram_schmidt(b: &[QVec]) -> (Vec<QVec>, Vec<Vec<Rat>>) {
    let n = b.len();
    let mut bs: Vec<QVec> = Vec::with_capacity(n);
    let mut mu = vec![vec![Rat::zero(); n]; n];
    for i in 0..n {
        let mut v = b[i].clone();
        for j in 0..i {
            let den = dot(&bs[j], &bs[j]);
            if den.is_zero() {
                continue;
            }
            mu[i][j] = dot(&b[i], &bs[j]) / den;
            for (x, y) in v.iter_mut().zip(&bs[j]) {
                *x -= &mu[i][j] * y;
            }
        }
        bs.push(v);
    }
    (bs, mu)
}

/// Diagonalization `S·A·T = D` with `S`, `T` unimodular, for integral `A`.
///
/// Only the diagonal shape is guaranteed; the divisibility chain of the true
/// Smith form is not enforced since congruence solving does not need it.
pub fn smith_normal_form(a: &QMatrix) -> (QMatrix, QMatrix, QMatrix) {
    let m = a.nrows();
    let n = a.ncols();
    let mut d = a.clone();
    let mut s = QMatrix::identity(m);
    let mut t = QMatrix::identity(n);
    let mut k = 0;
    while k < m.min(n) {
        let mut best: Option<(usize, usize)> = None;
        for i in k..m {
            for j in k..n {
                if d.get(i, j).is_zero() {
                    continue;
                }
                if best.map_or(true, |(bi, bj)| d.get(i, j).abs() < d.get(bi, bj).abs()) {
                    best = Some((i, j));
                }
            }
        }
        let Some((i, j)) = best else {
            break;
        };
        d.swap_rows(k, i);
        s.swap_rows(k, i);
        d.swap_cols(k, j);
        t.swap_cols(k, j);

        let mut done = true;
        for i in k + 1..m {
            let q = (d.get(i, k) / d.get(k, k)).floor();
            if !q.is_zero() {
                sub_row_multiple(&mut d, i, k, &q);
                sub_row_multiple(&mut s, i, k, &q);
            }
            if !d.get(i, k).is_zero() {
                done = false;
            }
        }
        for j in k + 1..n {
            let q = (d.get(k, j) / d.get(k, k)).floor();
            if !q.is_zero() {
                sub_col_multiple(&mut d, j, k, &q);
                sub_col_multiple(&mut t, j, k, &q);
            }
            if !d.get(k, j).is_zero() {
                done = false;
            }
        }
        if done {
            if d.get(k, k).is_negative() {
                negate_row(&mut d, k);
                negate_row(&mut s, k);
            }
            k += 1;
        }
    }
    (s, d, t)
}

/// Finds a rational `x` with `C·x ≡ r (mod Z)` componentwise, for integral `C`.
pub fn solve_mod_one(c: &QMatrix, r: &[Rat]) -> Option<QVec> {
    let m = c.nrows();
    let n = c.ncols();
    debug_assert_eq!(r.len(), m);
    let (s, d, t) = smith_normal_form(c);
    let sr: QVec = (0..m)
        .map(|i| (0..m).fold(Rat::zero(), |acc, k| acc + s.get(i, k) * &r[k]))
        .collect();
    let mut y = vec![Rat::zero(); n];
    for i in 0..m {
        let di = if i < n { d.get(i, i).clone() } else { Rat::zero() };
        if di.is_zero() {
            if !sr[i].is_integer() {
                return None;
            }
        } else {
            y[i] = &sr[i] / di;
        }
    }
    Some(
        (0..n)
            .map(|i| (0..n).fold(Rat::zero(), |acc, k| acc + t.get(i, k) * &y[k]))
            .collect(),
    )
}

fn negate_row(m: &mut QMatrix, i: usize) {
    for j in 0..m.ncols() {
        let x = -m.get(i, j).clone();
        m.set(i, j, x);
    }
}

/// `row[i] -= q · row[r]`
fn sub_row_multiple(m: &mut QMatrix, i: usize, r: usize, q: &Rat) {
    for j in 0..m.ncols() {
        let x = m.get(i, j) - q * m.get(r, j);
        m.set(i, j, x);
    }
}

/// `col[j] -= q · col[k]`
fn sub_col_multiple(m: &mut QMatrix, j: usize, k: usize, q: &Rat) {
    for i in 0..m.nrows() {
        let x = m.get(i, j) - q * m.get(i, k);
        m.set(i, j, x);
    }
}
