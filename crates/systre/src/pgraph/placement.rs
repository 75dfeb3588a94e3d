//! Barycentric placement, connectivity and stability.

use std::collections::{HashSet, VecDeque};

use num_traits::{One, Signed, Zero};

use crate::arith::{add, is_zero, mod_one, rat, sub, triangulate_integral, QMatrix, QVec, Rat};

use super::graph::PeriodicGraph;
use super::types::{DirEdge, GraphError, NodeId};

impl PeriodicGraph {
    /// Connected as a periodic net: every node is reachable in the quotient
    /// and the cycle shifts generate the full translation lattice.
    pub fn is_connected(&self) -> bool {
        *self.cache.connected.get_or_init(|| self.compute_connected())
    }

    fn compute_connected(&self) -> bool {
        let d = self.dimension();
        let Some(start) = self.node_ids().next() else {
            return true;
        };
        let mut seen: Vec<Option<QVec>> = vec![None; self.node_capacity()];
        seen[start.0] = Some(vec![Rat::zero(); d]);
        let mut queue = VecDeque::from([start]);
        let mut cycles: Vec<QVec> = Vec::new();
        while let Some(v) = queue.pop_front() {
            let Some(sv) = seen[v.0].clone() else { continue };
            for &e in self.incidences(v) {
                let w = self.target(e);
                let t = add(&sv, &self.shift(e));
                match &seen[w.0] {
                    Some(sw) => {
                        let c = sub(&t, sw);
                        if !is_zero(&c) {
                            cycles.push(c);
                        }
                    }
                    None => {
                        seen[w.0] = Some(t);
                        queue.push_back(w);
                    }
                }
            }
        }
        if self.node_ids().any(|v| seen[v.0].is_none()) {
            return false;
        }
        if cycles.len() < d {
            return d == 0;
        }
        let (h, _, r) = triangulate_integral(&QMatrix::from_rows(cycles, d));
        if r != d {
            return false;
        }
        (0..d)
            .fold(Rat::one(), |acc, i| acc * h.get(i, i))
            .abs()
            .is_one()
    }

    /// The unique barycentric placement with the first node at the origin,
    /// indexed by `NodeId`. Fails for graphs whose quotient is disconnected.
    pub fn barycentric_placement(&self) -> Result<&[QVec], GraphError> {
        if let Some(p) = self.cache.placement.get() {
            return Ok(p);
        }
        let pos = self.compute_placement()?;
        Ok(self.cache.placement.get_or_init(|| pos))
    }

    fn compute_placement(&self) -> Result<Vec<QVec>, GraphError> {
        let n = self.node_capacity();
        let d = self.dimension();
        let mut m = QMatrix::zero(n + 1, n);
        let mut rhs = QMatrix::zero(n + 1, d);
        for i in 0..n {
            let v = NodeId(i);
            if !self.has_node(v) {
                m.set(i, i, Rat::one());
                continue;
            }
            for &e in self.incidences(v) {
                let w = self.target(e);
                if w == v {
                    continue;
                }
                m.set(i, w.0, m.get(i, w.0) - rat(1));
                m.set(i, i, m.get(i, i) + rat(1));
                let s = self.shift(e);
                for (k, x) in s.iter().enumerate() {
                    rhs.set(i, k, rhs.get(i, k) + x);
                }
            }
        }
        if let Some(first) = self.node_ids().next() {
            m.set(n, first.0, Rat::one());
        }
        if m.rank() < n {
            return Err(GraphError::NotConnected);
        }
        let x = m.solve(&rhs).ok_or(GraphError::NotConnected)?;
        Ok(x.to_rows())
    }

    /// Checks the equilibrium condition exactly: every node sits at the
    /// average of its neighbours.
    pub fn is_barycentric(&self, pos: &[QVec]) -> bool {
        self.node_ids().all(|v| {
            let deg = self.incidences(v).iter().filter(|&&e| self.target(e) != v).count();
            let mut sum = vec![Rat::zero(); self.dimension()];
            for &e in self.incidences(v) {
                let w = self.target(e);
                if w != v {
                    sum = add(&sum, &add(&pos[w.0], &self.shift(e)));
                }
            }
            let lhs: QVec = pos[v.0].iter().map(|x| x * rat(deg as i64)).collect();
            lhs == sum
        })
    }

    /// Difference vector `pos(target) + shift - pos(source)` of a directed edge.
    pub fn difference(&self, pos: &[QVec], e: DirEdge) -> QVec {
        add(&sub(&pos[self.target(e).0], &pos[self.source(e).0]), &self.shift(e))
    }

    /// Difference vector under the barycentric placement.
    pub fn diff(&self, e: DirEdge) -> Result<QVec, GraphError> {
        let pos = self.barycentric_placement()?;
        Ok(self.difference(pos, e))
    }

    /// No two nodes of the infinite net share a barycentric position.
    pub fn is_stable(&self) -> Result<bool, GraphError> {
        let pos = self.barycentric_placement()?;
        let mut seen = HashSet::new();
        Ok(self.node_ids().all(|v| seen.insert(mod_one(&pos[v.0]))))
    }

    /// No two neighbours of any node share a barycentric position.
    pub fn is_locally_stable(&self) -> Result<bool, GraphError> {
        if let Some(&b) = self.cache.locally_stable.get() {
            return Ok(b);
        }
        let pos = self.barycentric_placement()?;
        let ok = self.node_ids().all(|v| {
            let mut seen = HashSet::new();
            self.incidences(v)
                .iter()
                .all(|&e| seen.insert(self.difference(pos, e)))
        });
        Ok(*self.cache.locally_stable.get_or_init(|| ok))
    }
}
