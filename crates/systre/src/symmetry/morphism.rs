//! Structure-preserving maps between periodic graphs.

use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};

use crate::arith::{add, is_integral, rat, sub, vec_mat, QMatrix, QVec};
use crate::pgraph::{DirEdge, GraphError, NodeId, PeriodicGraph};

/// An isomorphism of periodic nets, given by its action on the quotient
/// graphs and the affine map `p ↦ p·M + t` it induces on barycentric
/// positions.
#[derive(Clone, Debug)]
pub struct Morphism {
    node_map: Vec<NodeId>,
    edge_map: HashMap<DirEdge, DirEdge>,
    matrix: QMatrix,
    operator: QMatrix,
}

impl PartialEq for Morphism {
    fn eq(&self, other: &Self) -> bool {
        self.matrix == other.matrix && self.node_map == other.node_map
    }
}

impl Eq for Morphism {}

impl Hash for Morphism {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.matrix.hash(state);
        self.node_map.hash(state);
    }
}

/// Per-node lookup from difference vectors to outgoing edges.
pub(crate) struct DiffIndex {
    by_node: Vec<HashMap<QVec, DirEdge>>,
}

impl DiffIndex {
    pub(crate) fn new(g: &PeriodicGraph, pos: &[QVec]) -> Self {
        let mut by_node = vec![HashMap::new(); g.node_capacity()];
        for v in g.node_ids() {
            for &e in g.incidences(v) {
                by_node[v.0].insert(g.difference(pos, e), e);
            }
        }
        Self { by_node }
    }
}

/// Breadth-first extension of a single node assignment.
struct MorphismSearch<'a> {
    src: &'a PeriodicGraph,
    dst: &'a PeriodicGraph,
    src_pos: &'a [QVec],
    dst_pos: &'a [QVec],
    index: &'a DiffIndex,
    matrix: &'a QMatrix,
    node_map: Vec<Option<NodeId>>,
    used: Vec<bool>,
    edge_map: HashMap<DirEdge, DirEdge>,
    frontier: VecDeque<NodeId>,
}

impl<'a> MorphismSearch<'a> {
    fn run(mut self, v0: NodeId, v: NodeId) -> Option<Morphism> {
        let (src, dst, index) = (self.src, self.dst, self.index);
        self.assign(v0, v)?;
        while let Some(u) = self.frontier.pop_front() {
            let fu = self.node_map[u.0]?;
            for &e in src.incidences(u) {
                let d = vec_mat(&src.difference(self.src_pos, e), self.matrix);
                let &img = index.by_node[fu.0].get(&d)?;
                self.edge_map.insert(e, img);
                self.assign(src.target(e), dst.target(img))?;
            }
        }
        self.finish(v0, v)
    }

    fn assign(&mut self, w: NodeId, fw: NodeId) -> Option<()> {
        match self.node_map[w.0] {
            Some(x) if x == fw => Some(()),
            Some(_) => None,
            None => {
                if self.used[fw.0] {
                    return None;
                }
                self.used[fw.0] = true;
                self.node_map[w.0] = Some(fw);
                self.frontier.push_back(w);
                Some(())
            }
        }
    }

    fn finish(self, v0: NodeId, v: NodeId) -> Option<Morphism> {
        let mut node_map: Vec<NodeId> = (0..self.src.node_capacity()).map(NodeId).collect();
        for w in self.src.node_ids() {
            node_map[w.0] = self.node_map[w.0]?;
        }
        let t = sub(&self.dst_pos[v.0], &vec_mat(&self.src_pos[v0.0], self.matrix));
        for w in self.src.node_ids() {
            let img = add(&vec_mat(&self.src_pos[w.0], self.matrix), &t);
            if !is_integral(&sub(&img, &self.dst_pos[node_map[w.0].0])) {
                return None;
            }
        }
        let d = self.matrix.nrows();
        let operator = QMatrix::from_fn(d + 1, d + 1, |i, j| match (i < d, j < d) {
            (true, true) => self.matrix.get(i, j).clone(),
            (true, false) => rat(0),
            (false, true) => t[j].clone(),
            (false, false) => rat(1),
        });
        Some(Morphism {
            node_map,
            edge_map: self.edge_map,
            matrix: self.matrix.clone(),
            operator,
        })
    }
}

impl Morphism {
    /// The automorphism of `g` sending `v0` to `v` with linear part `m`, if any.
    pub fn new(g: &PeriodicGraph, v0: NodeId, v: NodeId, m: &QMatrix) -> Result<Option<Self>, GraphError> {
        let pos = g.barycentric_placement()?;
        let index = DiffIndex::new(g, pos);
        Ok(Self::search(g, g, pos, pos, &index, v0, v, m))
    }

    /// The isomorphism `src → dst` sending `v0` to `v` with linear part `m`.
    pub fn between(
        src: &PeriodicGraph,
        dst: &PeriodicGraph,
        v0: NodeId,
        v: NodeId,
        m: &QMatrix,
    ) -> Result<Option<Self>, GraphError> {
        let src_pos = src.barycentric_placement()?;
        let dst_pos = dst.barycentric_placement()?;
        let index = DiffIndex::new(dst, dst_pos);
        Ok(Self::search(src, dst, src_pos, dst_pos, &index, v0, v, m))
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn search(
        src: &PeriodicGraph,
        dst: &PeriodicGraph,
        src_pos: &[QVec],
        dst_pos: &[QVec],
        index: &DiffIndex,
        v0: NodeId,
        v: NodeId,
        m: &QMatrix,
    ) -> Option<Self> {
        let d = src.dimension();
        if d != dst.dimension()
            || m.nrows() != d
            || m.ncols() != d
            || src.number_of_nodes() != dst.number_of_nodes()
            || src.number_of_edges() != dst.number_of_edges()
            || !src.has_node(v0)
            || !dst.has_node(v)
        {
            return None;
        }
        MorphismSearch {
            src,
            dst,
            src_pos,
            dst_pos,
            index,
            matrix: m,
            node_map: vec![None; src.node_capacity()],
            used: vec![false; dst.node_capacity()],
            edge_map: HashMap::new(),
            frontier: VecDeque::new(),
        }
        .run(v0, v)
    }

    /// Apply `self`, then `other`.
    pub fn compose(&self, other: &Morphism) -> Morphism {
        Morphism {
            node_map: self.node_map.iter().map(|v| other.node_map[v.0]).collect(),
            edge_map: self
                .edge_map
                .iter()
                .filter_map(|(e, f)| other.edge_map.get(f).map(|g| (*e, *g)))
                .collect(),
            matrix: &self.matrix * &other.matrix,
            operator: &self.operator * &other.operator,
        }
    }

    #[inline]
    pub fn image(&self, v: NodeId) -> NodeId {
        self.node_map[v.0]
    }

    pub fn edge_image(&self, e: DirEdge) -> Option<DirEdge> {
        self.edge_map.get(&e).copied()
    }

    /// Linear part, acting on row vectors.
    pub fn matrix(&self) -> &QMatrix {
        &self.matrix
    }

    /// Homogeneous affine operator with the translation in the last row.
    pub fn operator(&self) -> &QMatrix {
        &self.operator
    }

    pub(crate) fn node_map(&self) -> &[NodeId] {
        &self.node_map
    }
}
