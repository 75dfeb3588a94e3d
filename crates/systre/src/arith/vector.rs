//! Helpers on rational row vectors.

use std::cmp::Ordering;

use num_traits::{Signed, Zero};

use super::{QMatrix, QVec, Rat};

#[inline]
pub fn add(a: &[Rat], b: &[Rat]) -> QVec {
    a.iter().zip(b).map(|(x, y)| x + y).collect()
}

#[inline]
pub fn sub(a: &[Rat], b: &[Rat]) -> QVec {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

#[inline]
pub fn neg(a: &[Rat]) -> QVec {
    a.iter().map(|x| -x).collect()
}

#[inline]
pub fn scale(a: &[Rat], f: &Rat) -> QVec {
    a.iter().map(|x| x * f).collect()
}

pub fn dot(a: &[Rat], b: &[Rat]) -> Rat {
    a.iter().zip(b).fold(Rat::zero(), |acc, (x, y)| acc + x * y)
}

#[inline]
pub fn is_zero(a: &[Rat]) -> bool {
    a.iter().all(Zero::is_zero)
}

#[inline]
pub fn is_integral(a: &[Rat]) -> bool {
    a.iter().all(|x| x.is_integer())
}

/// Componentwise reduction into `[0,1)`.
pub fn mod_one(a: &[Rat]) -> QVec {
    a.iter().map(|x| x - x.floor()).collect()
}

/// Sign of the first non-zero entry (0 for the zero vector).
pub fn sign_of(a: &[Rat]) -> i32 {
    for x in a {
        if x.is_negative() {
            return -1;
        }
        if x.is_positive() {
            return 1;
        }
    }
    0
}

/// Lexicographic comparison; this is the order used for difference vectors
/// and shifts throughout the canonical traversal.
pub fn vec_cmp(a: &[Rat], b: &[Rat]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        match x.cmp(y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

/// Row vector times matrix.
pub fn vec_mat(v: &[Rat], m: &QMatrix) -> QVec {
    debug_assert_eq!(v.len(), m.nrows());
    (0..m.ncols())
        .map(|j| {
            v.iter()
                .enumerate()
                .fold(Rat::zero(), |acc, (k, x)| acc + x * m.get(k, j))
        })
        .collect()
}
