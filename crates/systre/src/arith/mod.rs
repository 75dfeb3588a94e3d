//! Exact arithmetic: rationals, dense rational matrices, and integer lattices.
//!
//! Purpose
//! - Everything group-theoretic (placements, morphisms, invariants, space
//!   groups) is computed over `BigRational` so that equality tests are exact.
//! - Floating point appears only in the embedder; conversions are explicit via
//!   [`to_f64`] and [`QMatrix::to_dmatrix`].
//!
//! Conventions
//! - Vectors are row vectors. A linear map acts as `v ↦ v·M`, an affine map in
//!   homogeneous form as `(v,1) ↦ (v,1)·A` with the translation in the last row.
//!
//! Layout
//! - `matrix.rs`: the `QMatrix` type with elimination-based algorithms.
//! - `vector.rs`: small helpers on `&[Rat]`.
//! - `lattice.rs`: integral triangulation, integer kernels, Smith normal form,
//!   congruence solving and LLL reduction.
//! - `metric.rs`: floating-point Gram matrix helpers.

mod lattice;
mod matrix;
mod metric;
mod vector;

pub use lattice::{integer_kernel, lll_reduce, smith_normal_form, solve_mod_one, triangulate_integral};
pub use matrix::QMatrix;
pub use metric::{cell_parameters, orthonormal_row_basis};
pub use vector::{
    add, dot, is_integral, is_zero, mod_one, neg, scale, sign_of, sub, vec_cmp, vec_mat,
};

use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// Arbitrary precision rational number.
pub type Rat = num_rational::BigRational;

/// Row vector of rationals.
pub type QVec = Vec<Rat>;

/// Rational from an integer.
#[inline]
pub fn rat(n: i64) -> Rat {
    Rat::from_integer(BigInt::from(n))
}

/// Rational `n/d`; `d` must be non-zero.
#[inline]
pub fn frac(n: i64, d: i64) -> Rat {
    Rat::new(BigInt::from(n), BigInt::from(d))
}

/// Lossy conversion to `f64`.
#[inline]
pub fn to_f64(x: &Rat) -> f64 {
    let n = x.numer().to_f64().unwrap_or(f64::NAN);
    let d = x.denom().to_f64().unwrap_or(f64::NAN);
    n / d
}

/// Integer value of an integral rational that fits into `i64`.
#[inline]
pub fn to_i64(x: &Rat) -> Option<i64> {
    if x.is_integer() {
        x.to_integer().to_i64()
    } else {
        None
    }
}
