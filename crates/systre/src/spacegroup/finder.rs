//! Identification of a space group and of the coordinate change into its
//! conventional setting.
//!
//! The input group is given in coordinates where its translation lattice is
//! exactly `Z^d`. For a catalogue entry with primitive point group `{B}` we
//! look for a unimodular `U` and an origin `o` such that `y = x·U + o` maps
//! every input operator `(A, a)` onto an entry operator:
//! `A·U = U·B` and `o·(I − B) ≡ b − a·U (mod Z^d)`.

use std::collections::{BTreeMap, HashSet};

use num_traits::{One, Zero};

use crate::arith::{
    integer_kernel, lll_reduce, mod_one, rat, solve_mod_one, sub, vec_mat, QMatrix, QVec, Rat,
};
use crate::error::{Result, SystreError};

use super::catalogue::{Catalogue, CatalogueEntry};
use super::group::SpaceGroup;
use super::operator::Operator;
use super::optype::{signature, CrystalSystem};

/// A successful identification.
#[derive(Clone, Debug)]
pub struct GroupMatch {
    pub name: String,
    pub system: CrystalSystem,
    pub centering: char,
    /// Input coordinates to conventional coordinates.
    pub to_std: Operator,
}

impl GroupMatch {
    pub fn from_std(&self) -> Result<Operator> {
        self.to_std
            .inverse()
            .ok_or_else(|| SystreError::Internal("singular coordinate change".into()))
    }
}

/// Point group of the input with one translation per element.
struct PrimitiveOps {
    dim: usize,
    by_linear: BTreeMap<QMatrix, QVec>,
    signatures: Vec<(Rat, u32, Rat)>,
}

impl PrimitiveOps {
    fn of(ops: &[Operator], dim: usize) -> Result<Self> {
        let mut by_linear: BTreeMap<QMatrix, QVec> = BTreeMap::new();
        for op in ops {
            let shift = mod_one(&op.shift());
            let linear = op.linear();
            match by_linear.get(&linear) {
                Some(old) if old != &shift => {
                    return Err(SystreError::Internal(
                        "operators contain a pure translation; group is not primitive".into(),
                    ))
                }
                Some(_) => {}
                None => {
                    by_linear.insert(linear, shift);
                }
            }
        }
        let mut signatures: Vec<(Rat, u32, Rat)> = by_linear.keys().map(signature).collect();
        signatures.sort();
        Ok(Self {
            dim,
            by_linear,
            signatures,
        })
    }
}

/// Matches groups against a [`Catalogue`].
pub struct SpaceGroupFinder<'a> {
    catalogue: &'a Catalogue,
}

impl<'a> SpaceGroupFinder<'a> {
    pub fn new(catalogue: &'a Catalogue) -> Self {
        Self { catalogue }
    }

    /// Identifies `group`, whose operators must live in coordinates with
    /// translation lattice `Z^d`.
    pub fn find(&self, group: &SpaceGroup) -> Result<GroupMatch> {
        self.find_operators(group.dimension(), group.operators())
    }

    pub fn find_operators(&self, dim: usize, ops: &[Operator]) -> Result<GroupMatch> {
        if dim != 2 && dim != 3 {
            return Err(SystreError::UnsupportedDimension(dim));
        }
        let input = PrimitiveOps::of(ops, dim)?;
        for sign in [1i64, -1] {
            for entry in self.catalogue.entries() {
                if entry.dimension != dim || entry.signatures != input.signatures {
                    continue;
                }
                if let Some((u, o)) = match_entry(&input, entry, &rat(sign)) {
                    let p = &entry.primitive_cell;
                    let to_std = Operator::from_parts(&(&u * p), &vec_mat(&o, p));
                    tracing::debug!(group = %entry.name, sign, "space group identified");
                    return Ok(GroupMatch {
                        name: entry.name.clone(),
                        system: entry.system,
                        centering: entry.centering,
                        to_std,
                    });
                }
            }
        }
        Err(SystreError::UnrecognizedGroup(format!(
            "{} operators in dimension {dim}",
            input.by_linear.len()
        )))
    }

    /// Every input operator, moved into the conventional setting, must be
    /// one of the catalogued operators.
    pub fn verify(&self, m: &GroupMatch, ops: &[Operator]) -> Result<()> {
        let entry = self
            .catalogue
            .entry(&m.name)
            .ok_or_else(|| SystreError::Internal(format!("unknown group {}", m.name)))?;
        let std: HashSet<&Operator> = entry.operators.iter().collect();
        for op in ops {
            let conj = op
                .conjugate(&m.to_std)
                .ok_or_else(|| SystreError::Internal("singular coordinate change".into()))?
                .mod_z();
            if !std.contains(&conj) {
                return Err(SystreError::Internal(format!(
                    "operator {conj} is not in group {}",
                    m.name
                )));
            }
        }
        Ok(())
    }
}

fn match_entry(input: &PrimitiveOps, entry: &CatalogueEntry, sign: &Rat) -> Option<(QMatrix, QVec)> {
    let d = input.dim;
    let candidates: Vec<Vec<&QMatrix>> = entry
        .generators
        .iter()
        .map(|b| {
            let sb = signature(b);
            input.by_linear.keys().filter(|a| signature(a) == sb).collect()
        })
        .collect();
    if candidates.iter().any(Vec::is_empty) {
        return None;
    }
    let mut tried: HashSet<QMatrix> = HashSet::new();
    let mut choice = vec![0usize; candidates.len()];
    loop {
        let pairs: Vec<(&QMatrix, &QMatrix)> = choice
            .iter()
            .zip(&candidates)
            .zip(&entry.generators)
            .map(|((&k, c), b)| (c[k], b))
            .collect();
        for limit in [1, 2] {
            for u in basis_changes(d, &pairs, sign, limit) {
                if !tried.insert(u.clone()) {
                    continue;
                }
                if let Some(o) = try_basis_change(input, entry, &u) {
                    return Some((u, o));
                }
            }
        }
        if !advance(&mut choice, &candidates) {
            return None;
        }
    }
}

/// Odometer step over the candidate lists.
fn advance(choice: &mut [usize], candidates: &[Vec<&QMatrix>]) -> bool {
    for i in (0..choice.len()).rev() {
        choice[i] += 1;
        if choice[i] < candidates[i].len() {
            return true;
        }
        choice[i] = 0;
    }
    false
}

/// Integral `U` with `det U = sign` and `A·U = U·B` for all pairs, built
/// from small combinations (coefficients up to `limit`) of a reduced basis
/// of the solution lattice.
fn basis_changes(
    d: usize,
    pairs: &[(&QMatrix, &QMatrix)],
    sign: &Rat,
    limit: i64,
) -> Vec<QMatrix> {
    let n = d * d;
    let mut rows: Vec<QVec> = Vec::with_capacity(pairs.len() * n);
    for (a, b) in pairs {
        for i in 0..d {
            for j in 0..d {
                let mut row = vec![Rat::zero(); n];
                for k in 0..d {
                    row[k * d + j] += a.get(i, k);
                    row[i * d + k] -= b.get(k, j);
                }
                rows.push(row);
            }
        }
    }
    let kernel = if rows.is_empty() {
        QMatrix::identity(n).to_rows()
    } else {
        integer_kernel(&QMatrix::from_rows(rows, n))
    };
    if kernel.is_empty() {
        return Vec::new();
    }
    if kernel.len() == n {
        let mut u = QMatrix::identity(d);
        if !sign.is_one() {
            u.set(0, 0, rat(-1));
        }
        return vec![u];
    }
    let kernel = lll_reduce(kernel);
    let reshape = |v: &[Rat]| QMatrix::from_fn(d, d, |i, j| v[i * d + j].clone());
    let mut out = Vec::new();
    let mut coeffs = vec![-limit; kernel.len()];
    loop {
        if coeffs.iter().any(|&c| c != 0) {
            let mut v = vec![Rat::zero(); n];
            for (&c, k) in coeffs.iter().zip(&kernel) {
                if c != 0 {
                    let c = rat(c);
                    for (x, y) in v.iter_mut().zip(k) {
                        *x += &c * y;
                    }
                }
            }
            let u = reshape(&v);
            if &u.determinant() == sign {
                out.push(u);
            }
        }
        // odometer over [-limit, limit]^r
        let mut i = coeffs.len();
        loop {
            if i == 0 {
                return out;
            }
            i -= 1;
            if coeffs[i] < limit {
                coeffs[i] += 1;
                break;
            }
            coeffs[i] = -limit;
        }
    }
}

/// Checks that `U` conjugates the whole point group onto the entry's and
/// solves for the origin.
fn try_basis_change(input: &PrimitiveOps, entry: &CatalogueEntry, u: &QMatrix) -> Option<QVec> {
    let d = input.dim;
    let ui = u.inverse()?;
    let mut c_rows: Vec<QVec> = Vec::with_capacity(d * input.by_linear.len());
    let mut rhs: QVec = Vec::with_capacity(d * input.by_linear.len());
    let mut hit = HashSet::new();
    let id = QMatrix::identity(d);
    for (a, t) in &input.by_linear {
        let b = &(&ui * a) * u;
        let target = entry.primitive.get(&b)?;
        hit.insert(b.clone());
        let lhs = (&id - &b).transpose();
        c_rows.extend(lhs.to_rows());
        rhs.extend(sub(target, &vec_mat(t, u)));
    }
    if hit.len() != entry.primitive.len() {
        return None;
    }
    solve_mod_one(&QMatrix::from_rows(c_rows, d), &rhs)
}
