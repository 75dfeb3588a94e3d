//! The symmetry group of a net and what is derived from it: orbits,
//! translational classes, the minimal image and a symmetric basis.

use std::collections::{HashMap, HashSet, VecDeque};

use nalgebra::DMatrix;

use crate::arith::{
    add, frac, is_zero, mod_one, orthonormal_row_basis, sub, triangulate_integral, vec_mat,
    QMatrix, QVec,
};
use crate::error::{Result, SystreError};
use crate::pgraph::{DirEdge, EdgeId, GraphError, NodeId, PeriodicGraph};

use super::morphism::{DiffIndex, Morphism};

/// Disjoint sets over small dense indices.
pub(crate) struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    pub(crate) fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    pub(crate) fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    pub(crate) fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra] = rb;
        }
    }
}

#[inline]
fn dir_index(e: DirEdge) -> usize {
    2 * e.id.0 + usize::from(e.rev)
}

impl PeriodicGraph {
    fn require_symmetric_ready(&self) -> Result<()> {
        if !self.is_connected() {
            return Err(GraphError::NotConnected.into());
        }
        if !self.is_locally_stable()? {
            return Err(GraphError::NotLocallyStable.into());
        }
        Ok(())
    }

    /// The full group of net automorphisms, identity first.
    pub fn symmetries(&self) -> Result<&[Morphism]> {
        if let Some(s) = self.cache.symmetries.get() {
            return Ok(s);
        }
        self.require_symmetric_ready()?;
        let syms = self.compute_symmetries()?;
        tracing::debug!(count = syms.len(), "symmetries");
        Ok(self.cache.symmetries.get_or_init(|| syms))
    }

    fn compute_symmetries(&self) -> Result<Vec<Morphism>> {
        let d = self.dimension();
        let pos = self.barycentric_placement()?;
        let bases = self.characteristic_bases()?;
        let index = DiffIndex::new(self, pos);
        let Some(b0) = bases.first() else {
            return Err(SystreError::Internal("no characteristic basis".into()));
        };
        let v0 = self.source(b0[0]);
        let m0 = basis_matrix(self, pos, b0);

        let mut uf = UnionFind::new(2 * self.edges_capacity());
        let mut generators: Vec<Morphism> = Vec::new();
        for b in bases {
            if (0..d).all(|k| uf.find(dir_index(b0[k])) == uf.find(dir_index(b[k]))) {
                continue;
            }
            let Some(m) = m0.solve(&basis_matrix(self, pos, b)) else {
                continue;
            };
            if !m.is_unimodular() {
                continue;
            }
            let v = self.source(b[0]);
            let Some(iso) = Morphism::search(self, self, pos, pos, &index, v0, v, &m) else {
                continue;
            };
            for e in self.directed_edges() {
                if let Some(f) = iso.edge_image(e) {
                    uf.union(dir_index(e), dir_index(f));
                }
            }
            generators.push(iso);
        }

        let identity = Morphism::search(self, self, pos, pos, &index, v0, v0, &QMatrix::identity(d))
            .ok_or_else(|| SystreError::Internal("identity is not a morphism".into()))?;
        let mut seen: HashSet<(Vec<NodeId>, QMatrix)> = HashSet::new();
        seen.insert((identity.node_map().to_vec(), identity.matrix().clone()));
        let mut out = vec![identity];
        let mut queue = VecDeque::from([0usize]);
        while let Some(i) = queue.pop_front() {
            for g in &generators {
                let next = out[i].compose(g);
                if seen.insert((next.node_map().to_vec(), next.matrix().clone())) {
                    queue.push_back(out.len());
                    out.push(next);
                }
            }
        }
        Ok(out)
    }

    fn edges_capacity(&self) -> usize {
        self.edge_ids().map(|e| e.0 + 1).max().unwrap_or(0)
    }

    /// Affine operators of all symmetries, in homogeneous row form.
    pub fn symmetry_operators(&self) -> Result<Vec<QMatrix>> {
        Ok(self.symmetries()?.iter().map(|s| s.operator().clone()).collect())
    }

    /// Node orbits under the symmetry group, each sorted, ordered by their
    /// smallest member.
    pub fn node_orbits(&self) -> Result<Vec<Vec<NodeId>>> {
        let syms = self.symmetries()?;
        let mut uf = UnionFind::new(self.node_capacity());
        for s in syms {
            for v in self.node_ids() {
                uf.union(v.0, s.image(v).0);
            }
        }
        Ok(collect_classes(self.node_ids().map(|v| v.0), &mut uf)
            .into_iter()
            .map(|c| c.into_iter().map(NodeId).collect())
            .collect())
    }

    /// Undirected edge orbits under the symmetry group.
    pub fn edge_orbits(&self) -> Result<Vec<Vec<EdgeId>>> {
        let syms = self.symmetries()?;
        let mut uf = UnionFind::new(self.edges_capacity());
        for s in syms {
            for e in self.edge_ids() {
                if let Some(f) = s.edge_image(DirEdge::forward(e)) {
                    uf.union(e.0, f.id.0);
                }
            }
        }
        Ok(collect_classes(self.edge_ids().map(|e| e.0), &mut uf)
            .into_iter()
            .map(|c| c.into_iter().map(EdgeId).collect())
            .collect())
    }

    /// Classes of nodes related by pure translations of the net. Empty when
    /// every class is a singleton.
    pub fn translational_classes(&self) -> Result<Vec<Vec<NodeId>>> {
        self.require_symmetric_ready()?;
        let pos = self.barycentric_placement()?;
        let index = DiffIndex::new(self, pos);
        let identity = QMatrix::identity(self.dimension());
        let nodes: Vec<NodeId> = self.node_ids().collect();
        let mut uf = UnionFind::new(self.node_capacity());
        let Some(&first) = nodes.first() else {
            return Ok(Vec::new());
        };
        for &v in &nodes[1..] {
            if uf.find(first.0) == uf.find(v.0) {
                continue;
            }
            if let Some(iso) = Morphism::search(self, self, pos, pos, &index, first, v, &identity) {
                for &w in &nodes {
                    uf.union(w.0, iso.image(w).0);
                }
            }
        }
        let classes = collect_classes(nodes.iter().map(|v| v.0), &mut uf);
        if classes.len() == nodes.len() {
            return Ok(Vec::new());
        }
        Ok(classes
            .into_iter()
            .map(|c| c.into_iter().map(NodeId).collect())
            .collect())
    }

    /// The quotient by the full translation group of the net. Returns a copy
    /// of `self` when the given repeat unit is already minimal.
    pub fn minimal_image(&self) -> Result<PeriodicGraph> {
        let classes = self.translational_classes()?;
        if classes.is_empty() {
            return Ok(self.clone());
        }
        let d = self.dimension();
        let pos = self.barycentric_placement()?;
        let c0 = &classes[0];
        let mut vectors = Vec::new();
        for &w in &c0[1..] {
            let t = mod_one(&sub(&pos[w.0], &pos[c0[0].0]));
            if is_zero(&t) {
                return Err(SystreError::NonTranslationalQuotient);
            }
            vectors.push(t);
        }
        let lattice = QMatrix::from_rows(vectors, d).vstack(&QMatrix::identity(d));
        let (h, _, _) = triangulate_integral(&lattice);
        let basis = h.submatrix(0, 0, d, d);
        let to_new = basis
            .inverse()
            .ok_or_else(|| SystreError::Internal("degenerate translation lattice".into()))?;

        let mut image = PeriodicGraph::new(d);
        let mut old2new: HashMap<NodeId, NodeId> = HashMap::new();
        let mut rep: HashMap<NodeId, NodeId> = HashMap::new();
        for class in &classes {
            let vn = image.new_node();
            rep.insert(vn, class[0]);
            for &v in class {
                old2new.insert(v, vn);
            }
        }
        for e in self.edge_ids() {
            let de = DirEdge::forward(e);
            let (v, w) = (self.source(de), self.target(de));
            let (vn, wn) = (old2new[&v], old2new[&w]);
            let vs = sub(&pos[v.0], &pos[rep[&vn].0]);
            let ws = sub(&pos[w.0], &pos[rep[&wn].0]);
            let s = vec_mat(&add(&sub(&ws, &vs), &self.shift(de)), &to_new);
            if image.get_edge(vn, wn, &s).is_none() {
                image.new_edge_q(vn, wn, s)?;
            }
        }
        tracing::debug!(
            nodes = image.number_of_nodes(),
            edges = image.number_of_edges(),
            "minimal image"
        );
        Ok(image)
    }

    /// A basis in which every symmetry acts orthogonally, expressed in the
    /// original lattice coordinates (rows are the new basis vectors' inverse).
    pub fn symmetric_basis(&self) -> Result<DMatrix<f64>> {
        let syms = self.symmetries()?;
        let d = self.dimension();
        let mut form = QMatrix::zero(d, d);
        for s in syms {
            let a = s.matrix();
            form = &form + &(a * &a.transpose());
        }
        let form = form.scaled(&frac(1, syms.len() as i64));
        let b = orthonormal_row_basis(&form.to_dmatrix());
        b.try_inverse()
            .ok_or_else(|| SystreError::Internal("singular symmetric basis".into()))
    }

    /// Topological density: average over nodes of `1 + |shell 1| + … + |shell 10|`.
    pub fn td10(&self) -> Result<f64> {
        let orbits = self.node_orbits()?;
        let n = self.number_of_nodes();
        if n == 0 {
            return Ok(0.0);
        }
        let total: usize = orbits
            .iter()
            .map(|orb| orb.len() * self.coordination_sequence(orb[0]).take(11).sum::<usize>())
            .sum();
        Ok(total as f64 / n as f64)
    }
}

fn collect_classes(items: impl Iterator<Item = usize>, uf: &mut UnionFind) -> Vec<Vec<usize>> {
    let mut by_root: HashMap<usize, Vec<usize>> = HashMap::new();
    for x in items {
        by_root.entry(uf.find(x)).or_default().push(x);
    }
    let mut classes: Vec<Vec<usize>> = by_root.into_values().collect();
    for c in &mut classes {
        c.sort_unstable();
    }
    classes.sort();
    classes
}

/// Difference vectors of a basis as matrix rows.
pub(crate) fn basis_matrix(g: &PeriodicGraph, pos: &[QVec], b: &[DirEdge]) -> QMatrix {
    QMatrix::from_rows(b.iter().map(|&e| g.difference(pos, e)).collect(), g.dimension())
}
