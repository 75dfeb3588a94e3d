//! Canonical form: a complete isomorphism invariant of periodic nets.
//!
//! For every characteristic basis the net is traversed breadth-first in the
//! coordinates of that basis, emitting one `(source, target, shift)` step per
//! edge. The lexicographically smallest step list wins; a traversal is
//! abandoned as soon as it compares greater than the best one so far.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;

use num_traits::{One, Signed, Zero};

use crate::arith::{
    add, neg, sign_of, sub, to_i64, triangulate_integral, vec_cmp, vec_mat, QMatrix, QVec, Rat,
};
use crate::error::{Result, SystreError};
use crate::pgraph::{DirEdge, GraphError, NodeId, PeriodicGraph};

use super::group::basis_matrix;
use super::morphism::Morphism;

/// `[d, s1, t1, shift1…, s2, t2, shift2…, …]` with 1-based node numbers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Invariant(Vec<i64>);

impl Invariant {
    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    pub fn dimension(&self) -> usize {
        self.0.first().map_or(0, |&d| d as usize)
    }

    /// The canonical graph this invariant describes.
    pub fn to_graph(&self) -> std::result::Result<PeriodicGraph, GraphError> {
        PeriodicGraph::from_invariant(&self.0)
    }
}

impl fmt::Display for Invariant {
    /// Space separated; this is the Systre key.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(" "))
    }
}

type Step = (usize, usize, QVec);

fn cmp_step(a: &Step, b: &Step) -> Ordering {
    a.0.cmp(&b.0)
        .then(a.1.cmp(&b.1))
        .then_with(|| vec_cmp(&a.2, &b.2))
}

impl PeriodicGraph {
    pub fn invariant(&self) -> Result<&Invariant> {
        if let Some(inv) = self.cache.invariant.get() {
            return Ok(inv);
        }
        if !self.is_connected() {
            return Err(GraphError::NotConnected.into());
        }
        if !self.is_locally_stable()? {
            return Err(GraphError::NotLocallyStable.into());
        }
        let inv = self.compute_invariant()?;
        Ok(self.cache.invariant.get_or_init(|| inv))
    }

    /// The Systre key: the invariant as a space-separated string.
    pub fn systre_key(&self) -> Result<String> {
        Ok(self.invariant()?.to_string())
    }

    /// The canonical representative of this net's isomorphism class.
    pub fn canonical(&self) -> Result<PeriodicGraph> {
        Ok(self.invariant()?.to_graph()?)
    }

    /// Total order on nets: dimension, node count, edge count, invariant.
    pub fn net_cmp(&self, other: &PeriodicGraph) -> Result<Ordering> {
        let head = |g: &PeriodicGraph| (g.dimension(), g.number_of_nodes(), g.number_of_edges());
        match head(self).cmp(&head(other)) {
            Ordering::Equal => Ok(self.invariant()?.cmp(other.invariant()?)),
            o => Ok(o),
        }
    }

    pub fn is_isomorphic(&self, other: &PeriodicGraph) -> Result<bool> {
        Ok(self.net_cmp(other)? == Ordering::Equal)
    }

    fn compute_invariant(&self) -> Result<Invariant> {
        let d = self.dimension();
        let pos = self.barycentric_placement()?;
        let bases = self.characteristic_bases()?;
        let zero: QVec = vec![Rat::zero(); d];

        let mut best: Vec<Step> = Vec::with_capacity(self.number_of_edges());
        let mut best_basis: Option<&[DirEdge]> = None;

        'bases: for b in bases {
            let Some(to_basis) = basis_matrix(self, pos, b).inverse() else {
                continue;
            };
            let v0 = self.source(b[0]);
            let mut number = vec![0usize; self.node_capacity()];
            let mut npos: Vec<QVec> = vec![Vec::new(); self.node_capacity()];
            number[v0.0] = 1;
            npos[v0.0] = zero.clone();
            let mut queue = VecDeque::from([(v0, zero.clone())]);
            let mut next = 2;
            let mut emitted = 0;
            let mut equal = best_basis.is_some();

            while let Some((v, p)) = queue.pop_front() {
                let vn = number[v.0];
                let mut inc: Vec<(QVec, DirEdge)> = self
                    .incidences(v)
                    .iter()
                    .map(|&e| (vec_mat(&self.difference(pos, e), &to_basis), e))
                    .collect();
                inc.sort_by(|a, b| vec_cmp(&a.0, &b.0));

                for (row, e) in inc {
                    let w = self.target(e);
                    let s = add(&p, &row);
                    let (wn, shift) = if number[w.0] == 0 {
                        let wn = next;
                        next += 1;
                        number[w.0] = wn;
                        npos[w.0] = s.clone();
                        queue.push_back((w, s));
                        (wn, zero.clone())
                    } else {
                        let wn = number[w.0];
                        if wn < vn {
                            continue;
                        }
                        let shift = sub(&s, &npos[w.0]);
                        (wn, shift)
                    };
                    if vn < wn || (vn == wn && sign_of(&shift) < 0) {
                        let step = (vn, wn, shift);
                        if equal {
                            match best.get(emitted).map(|old| cmp_step(&step, old)) {
                                Some(Ordering::Less) => {
                                    equal = false;
                                    best_basis = Some(b);
                                }
                                Some(Ordering::Greater) => continue 'bases,
                                Some(Ordering::Equal) => {}
                                None => {
                                    return Err(SystreError::Internal(
                                        "canonical traversal emitted too many edges".into(),
                                    ))
                                }
                            }
                        }
                        if !equal {
                            if emitted < best.len() {
                                best[emitted] = step;
                            } else {
                                best.push(step);
                            }
                        }
                        emitted += 1;
                    }
                }
            }
            best_basis = Some(b);
        }

        let basis = best_basis
            .ok_or_else(|| SystreError::Internal("no characteristic basis".into()))?;
        let b_mat = basis_matrix(self, pos, basis);
        let lattice = self.lattice_basis(&best, &b_mat)?;
        let to_lattice = lattice
            .inverse()
            .ok_or_else(|| SystreError::Internal("singular lattice basis".into()))?;

        let mut script: Vec<(i64, i64, Vec<i64>)> = Vec::with_capacity(best.len());
        for (s, t, shift) in &best {
            let mut sh = vec_mat(shift, &to_lattice);
            if s == t && sign_of(&sh) > 0 {
                sh = neg(&sh);
            }
            let ints: Option<Vec<i64>> = sh.iter().map(to_i64).collect();
            let ints = ints.ok_or_else(|| {
                SystreError::Internal("non-integral shift in canonical form".into())
            })?;
            script.push((*s as i64, *t as i64, ints));
        }
        script.sort();
        let mut inv = vec![d as i64];
        for (s, t, sh) in script {
            inv.push(s);
            inv.push(t);
            inv.extend(sh);
        }
        let inv = Invariant(inv);

        // the canonical graph must be isomorphic to this one under the
        // induced coordinate change
        let canon = inv.to_graph()?;
        let m = (&lattice * &b_mat)
            .inverse()
            .ok_or_else(|| SystreError::Internal("singular coordinate change".into()))?;
        if Morphism::between(self, &canon, self.source(basis[0]), NodeId(0), &m)?.is_none() {
            return Err(SystreError::Internal(
                "canonical form is not isomorphic to the input".into(),
            ));
        }
        tracing::debug!(key = %inv, "invariant");
        Ok(inv)
    }

    /// Lattice basis for the step shifts: the first `d` independent ones,
    /// or the integral triangulation of all of them when those do not span
    /// a unimodular cell.
    fn lattice_basis(&self, steps: &[Step], b_mat: &QMatrix) -> Result<QMatrix> {
        let d = self.dimension();
        let mut rows: Vec<QVec> = Vec::with_capacity(d);
        for (_, _, shift) in steps {
            let mut trial = rows.clone();
            trial.push(shift.clone());
            if QMatrix::from_rows(trial.clone(), d).rank() == trial.len() {
                rows = trial;
                if rows.len() == d {
                    break;
                }
            }
        }
        let unimodular = |a: &QMatrix| (a * b_mat).determinant().abs().is_one();
        if rows.len() == d {
            let a = QMatrix::from_rows(rows, d);
            if unimodular(&a) {
                return Ok(a);
            }
        }
        let all = QMatrix::from_rows(steps.iter().map(|s| s.2.clone()).collect(), d);
        let (h, _, r) = triangulate_integral(&all);
        if r < d {
            return Err(SystreError::Internal("step shifts do not span the lattice".into()));
        }
        let a = h.submatrix(0, 0, d, d);
        if !unimodular(&a) {
            return Err(SystreError::Internal("no unimodular lattice basis".into()));
        }
        Ok(a)
    }
}
