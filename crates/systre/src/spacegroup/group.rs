//! Space groups as finite sets of operators modulo lattice translations.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::arith::{is_zero, mod_one, triangulate_integral, vec_mat, QMatrix, QVec};
use crate::error::{Result, SystreError};

use super::operator::Operator;
use super::optype::CrystalSystem;

/// Closing a generator set stops here; crystallographic groups are far
/// smaller even in a centred conventional cell.
const MAX_GROUP_SIZE: usize = 1024;

/// Operators are stored reduced modulo `Z^d`, sorted and without
/// duplicates, so two groups with the same operator set compare equal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpaceGroup {
    dim: usize,
    operators: Vec<Operator>,
}

impl SpaceGroup {
    /// Takes the operators as given, after validation and reduction. Does
    /// not close the set; see [`SpaceGroup::generated_by`].
    pub fn new(dim: usize, operators: impl IntoIterator<Item = Operator>) -> Result<Self> {
        let mut set = BTreeSet::new();
        for op in operators {
            validate(dim, &op)?;
            set.insert(op.mod_z());
        }
        if set.is_empty() {
            set.insert(Operator::identity(dim));
        }
        Ok(Self {
            dim,
            operators: set.into_iter().collect(),
        })
    }

    /// The group generated by `generators` modulo lattice translations.
    pub fn generated_by(dim: usize, generators: &[Operator]) -> Result<Self> {
        for g in generators {
            validate(dim, g)?;
        }
        let gens: Vec<Operator> = generators.iter().map(Operator::mod_z).collect();
        let id = Operator::identity(dim);
        let mut seen = BTreeSet::from([id.clone()]);
        let mut queue = VecDeque::from([id]);
        while let Some(a) = queue.pop_front() {
            for g in &gens {
                let b = a.then(g).mod_z();
                if seen.insert(b.clone()) {
                    if seen.len() > MAX_GROUP_SIZE {
                        return Err(SystreError::Internal(
                            "generated operator set is not a finite group".into(),
                        ));
                    }
                    queue.push_back(b);
                }
            }
        }
        Ok(Self {
            dim,
            operators: seen.into_iter().collect(),
        })
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dim
    }

    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn contains(&self, op: &Operator) -> bool {
        self.operators.binary_search(&op.mod_z()).is_ok()
    }

    /// Contains the identity and is closed under products and inverses
    /// (modulo lattice translations).
    pub fn is_group(&self) -> bool {
        if !self.contains(&Operator::identity(self.dim)) {
            return false;
        }
        for a in &self.operators {
            match a.inverse() {
                Some(inv) if self.contains(&inv) => {}
                _ => return false,
            }
            if !self.operators.iter().all(|b| self.contains(&a.then(b))) {
                return false;
            }
        }
        true
    }

    /// Translation parts of the operators with identity linear part,
    /// the zero translation excluded.
    pub fn pure_translations(&self) -> Vec<QVec> {
        self.operators
            .iter()
            .filter(|op| op.is_translation())
            .map(Operator::shift)
            .filter(|t| !is_zero(t))
            .collect()
    }

    /// Rows form a basis of the lattice generated by `Z^d` and the pure
    /// translations, in the group's coordinates.
    pub fn primitive_cell(&self) -> QMatrix {
        let d = self.dim;
        let mut rows = QMatrix::identity(d).to_rows();
        rows.extend(self.pure_translations());
        let (h, _, _) = triangulate_integral(&QMatrix::from_rows(rows, d));
        h.submatrix(0, 0, d, d)
    }

    /// The group expressed in primitive-cell coordinates: one operator per
    /// point-group element, translations reduced modulo `Z^d`.
    pub fn primitive_operators(&self) -> Result<Vec<Operator>> {
        let p = self.primitive_cell();
        let pi = p
            .inverse()
            .ok_or_else(|| SystreError::Internal("singular primitive cell".into()))?;
        let mut by_linear: BTreeMap<QMatrix, QVec> = BTreeMap::new();
        for op in &self.operators {
            let linear = &(&p * &op.linear()) * &pi;
            if !linear.is_integral() {
                return Err(SystreError::Internal(
                    "operator does not preserve the primitive lattice".into(),
                ));
            }
            let shift = mod_one(&vec_mat(&op.shift(), &pi));
            match by_linear.get(&linear) {
                Some(old) if old != &shift => {
                    return Err(SystreError::Internal(
                        "inconsistent translations in primitive setting".into(),
                    ))
                }
                Some(_) => {}
                None => {
                    by_linear.insert(linear, shift);
                }
            }
        }
        Ok(by_linear
            .into_iter()
            .map(|(l, t)| Operator::from_parts(&l, &t))
            .collect())
    }

    /// Distinct linear parts.
    pub fn point_group(&self) -> Vec<QMatrix> {
        let set: BTreeSet<QMatrix> = self.operators.iter().map(Operator::linear).collect();
        set.into_iter().collect()
    }

    pub fn crystal_system(&self) -> CrystalSystem {
        CrystalSystem::of_point_group(self.dim, &self.point_group())
    }
}

fn validate(dim: usize, op: &Operator) -> Result<()> {
    if op.dimension() != dim {
        return Err(SystreError::Internal(format!(
            "operator {op} has dimension {}, expected {dim}",
            op.dimension()
        )));
    }
    let l = op.linear();
    if !l.is_integral() || !l.is_unimodular() {
        return Err(SystreError::Internal(format!(
            "operator {op} does not preserve the lattice"
        )));
    }
    Ok(())
}
