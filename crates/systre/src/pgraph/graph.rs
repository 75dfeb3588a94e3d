//! The periodic graph container: arena storage, mutation, incidence queries.

use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;

use num_traits::Zero;

use crate::arith::{neg, rat, sign_of, vec_cmp, QVec, Rat};
use crate::symmetry::{Invariant, Morphism};

use super::types::{fmt_vec, DirEdge, EdgeData, EdgeId, GraphError, NodeId};

/// Memoized derived data. Every structural mutation replaces it wholesale.
#[derive(Clone, Debug, Default)]
pub(crate) struct Cache {
    pub placement: OnceCell<Vec<QVec>>,
    pub connected: OnceCell<bool>,
    pub locally_stable: OnceCell<bool>,
    pub bases: OnceCell<Vec<Vec<DirEdge>>>,
    pub symmetries: OnceCell<Vec<Morphism>>,
    pub invariant: OnceCell<Invariant>,
}

/// A finite quotient of a d-periodic graph.
///
/// Nodes and edges live in arenas indexed by [`NodeId`] and [`EdgeId`];
/// deleted slots stay allocated and are skipped by all iterators.
#[derive(Clone, Debug)]
pub struct PeriodicGraph {
    dim: usize,
    node_alive: Vec<bool>,
    edges: Vec<EdgeData>,
    edge_alive: Vec<bool>,
    adj: Vec<Vec<DirEdge>>,
    index: HashMap<(NodeId, NodeId, QVec), EdgeId>,
    pub(crate) cache: Cache,
}

impl PeriodicGraph {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            node_alive: Vec::new(),
            edges: Vec::new(),
            edge_alive: Vec::new(),
            adj: Vec::new(),
            index: HashMap::new(),
            cache: Cache::default(),
        }
    }

    /// Builds a graph with nodes `0..n` and the given integral edges.
    pub fn from_edges(
        dim: usize,
        n: usize,
        edges: &[(usize, usize, Vec<i64>)],
    ) -> Result<Self, GraphError> {
        let mut g = Self::new(dim);
        let nodes: Vec<NodeId> = (0..n).map(|_| g.new_node()).collect();
        for (v, w, s) in edges {
            let (Some(&v), Some(&w)) = (nodes.get(*v), nodes.get(*w)) else {
                return Err(GraphError::NoSuchElement("node"));
            };
            g.new_edge(v, w, s)?;
        }
        Ok(g)
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dim
    }

    fn touch(&mut self) {
        self.cache = Cache::default();
    }

    pub fn new_node(&mut self) -> NodeId {
        self.node_alive.push(true);
        self.adj.push(Vec::new());
        self.touch();
        NodeId(self.node_alive.len() - 1)
    }

    /// Adds an edge with an integer shift.
    pub fn new_edge(&mut self, v: NodeId, w: NodeId, shift: &[i64]) -> Result<EdgeId, GraphError> {
        self.new_edge_q(v, w, shift.iter().map(|&x| rat(x)).collect())
    }

    /// Adds an edge with a shift given as an (integral) rational vector.
    pub fn new_edge_q(&mut self, v: NodeId, w: NodeId, shift: QVec) -> Result<EdgeId, GraphError> {
        if !self.has_node(v) || !self.has_node(w) {
            return Err(GraphError::NoSuchElement("node"));
        }
        if shift.len() != self.dim || shift.iter().any(|x| !x.is_integer()) {
            return Err(GraphError::InvalidShift {
                shift: fmt_vec(&shift),
                dim: self.dim,
            });
        }
        if v == w && shift.iter().all(Zero::is_zero) {
            return Err(GraphError::DegenerateLoop(v.0));
        }
        let key = normalized_key(v, w, &shift);
        if self.index.contains_key(&key) {
            return Err(GraphError::DuplicateEdge {
                from: v.0,
                to: w.0,
                shift: fmt_vec(&shift),
            });
        }
        let id = EdgeId(self.edges.len());
        self.edges.push(EdgeData {
            source: v,
            target: w,
            shift,
        });
        self.edge_alive.push(true);
        self.index.insert(key, id);
        self.adj[v.0].push(DirEdge { id, rev: false });
        self.adj[w.0].push(DirEdge { id, rev: true });
        self.touch();
        Ok(id)
    }

    pub fn delete_edge(&mut self, e: EdgeId) -> Result<(), GraphError> {
        if !self.has_edge(e) {
            return Err(GraphError::NoSuchElement("edge"));
        }
        let data = &self.edges[e.0];
        let key = normalized_key(data.source, data.target, &data.shift);
        let (v, w) = (data.source, data.target);
        self.index.remove(&key);
        self.edge_alive[e.0] = false;
        self.adj[v.0].retain(|d| d.id != e);
        self.adj[w.0].retain(|d| d.id != e);
        self.touch();
        Ok(())
    }

    /// Deletes a node together with its incident edges.
    pub fn delete_node(&mut self, v: NodeId) -> Result<(), GraphError> {
        if !self.has_node(v) {
            return Err(GraphError::NoSuchElement("node"));
        }
        let mut ids: Vec<EdgeId> = self.adj[v.0].iter().map(|d| d.id).collect();
        ids.dedup();
        for e in ids {
            if self.has_edge(e) {
                self.delete_edge(e)?;
            }
        }
        self.node_alive[v.0] = false;
        self.touch();
        Ok(())
    }

    /// The stored edge from `v` to `w` with the given shift, in whichever
    /// direction it was stored.
    pub fn get_edge(&self, v: NodeId, w: NodeId, shift: &[Rat]) -> Option<DirEdge> {
        let id = *self.index.get(&normalized_key(v, w, shift))?;
        let d = DirEdge { id, rev: false };
        if self.source(d) == v && self.target(d) == w && self.shift(d) == shift {
            Some(d)
        } else {
            Some(d.reverse())
        }
    }

    #[inline]
    pub fn has_node(&self, v: NodeId) -> bool {
        self.node_alive.get(v.0).copied().unwrap_or(false)
    }

    #[inline]
    pub fn has_edge(&self, e: EdgeId) -> bool {
        self.edge_alive.get(e.0).copied().unwrap_or(false)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.node_alive.len())
            .filter(|&i| self.node_alive[i])
            .map(NodeId)
    }

    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        (0..self.edges.len())
            .filter(|&i| self.edge_alive[i])
            .map(EdgeId)
    }

    /// Every live edge in both directions, ordered by id.
    pub fn directed_edges(&self) -> Vec<DirEdge> {
        self.edge_ids()
            .flat_map(|id| [DirEdge { id, rev: false }, DirEdge { id, rev: true }])
            .collect()
    }

    pub fn number_of_nodes(&self) -> usize {
        self.node_alive.iter().filter(|&&a| a).count()
    }

    pub fn number_of_edges(&self) -> usize {
        self.edge_alive.iter().filter(|&&a| a).count()
    }

    /// Upper bound for node ids; handy for id-indexed side tables.
    #[inline]
    pub fn node_capacity(&self) -> usize {
        self.node_alive.len()
    }

    /// Outgoing directed edges at `v`, in creation order. Loops appear once
    /// in each direction.
    #[inline]
    pub fn incidences(&self, v: NodeId) -> &[DirEdge] {
        &self.adj[v.0]
    }

    #[inline]
    pub fn degree(&self, v: NodeId) -> usize {
        self.adj[v.0].len()
    }

    pub fn edge(&self, e: EdgeId) -> Option<&EdgeData> {
        if self.has_edge(e) {
            Some(&self.edges[e.0])
        } else {
            None
        }
    }

    #[inline]
    pub fn source(&self, e: DirEdge) -> NodeId {
        let d = &self.edges[e.id.0];
        if e.rev {
            d.target
        } else {
            d.source
        }
    }

    #[inline]
    pub fn target(&self, e: DirEdge) -> NodeId {
        let d = &self.edges[e.id.0];
        if e.rev {
            d.source
        } else {
            d.target
        }
    }

    pub fn shift(&self, e: DirEdge) -> QVec {
        let d = &self.edges[e.id.0];
        if e.rev {
            neg(&d.shift)
        } else {
            d.shift.clone()
        }
    }

    /// Position of `v` among the live nodes (0-based).
    pub fn node_rank(&self, v: NodeId) -> usize {
        self.node_alive[..v.0].iter().filter(|&&a| a).count()
    }

    /// Orientation with `source <= target`; loops point towards negative shifts.
    pub fn edge_normalized(&self, e: EdgeId) -> DirEdge {
        let d = DirEdge { id: e, rev: false };
        let (v, w) = (self.source(d), self.target(d));
        if v > w || (v == w && sign_of(&self.edges[e.0].shift) > 0) {
            d.reverse()
        } else {
            d
        }
    }

    /// Rebuilds the graph from a canonical invariant `[d, s1, t1, shift1…, …]`
    /// with 1-based node numbers.
    pub fn from_invariant(inv: &[i64]) -> Result<Self, GraphError> {
        let bad = || GraphError::MalformedKey(format!("{inv:?}"));
        let (&d, rest) = inv.split_first().ok_or_else(bad)?;
        let d = usize::try_from(d).map_err(|_| bad())?;
        if d == 0 || rest.len() % (d + 2) != 0 {
            return Err(bad());
        }
        let mut edges = Vec::new();
        let mut n = 0usize;
        for chunk in rest.chunks(d + 2) {
            let s = usize::try_from(chunk[0]).map_err(|_| bad())?;
            let t = usize::try_from(chunk[1]).map_err(|_| bad())?;
            if s == 0 || t == 0 {
                return Err(bad());
            }
            n = n.max(s).max(t);
            edges.push((s - 1, t - 1, chunk[2..].to_vec()));
        }
        Self::from_edges(d, n, &edges)
    }

    /// Parses a space-separated Systre key.
    pub fn from_key(key: &str) -> Result<Self, GraphError> {
        let nums: Result<Vec<i64>, _> = key.split_whitespace().map(str::parse::<i64>).collect();
        let nums = nums.map_err(|_| GraphError::MalformedKey(key.to_string()))?;
        Self::from_invariant(&nums)
    }
}

fn normalized_key(v: NodeId, w: NodeId, shift: &[Rat]) -> (NodeId, NodeId, QVec) {
    if v > w || (v == w && sign_of(shift) > 0) {
        (w, v, neg(shift))
    } else {
        (v, w, shift.to_vec())
    }
}

impl fmt::Display for PeriodicGraph {
    /// Normalized edges sorted by (source, target, shift), 1-based.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rows: Vec<(usize, usize, QVec)> = self
            .edge_ids()
            .map(|e| {
                let d = self.edge_normalized(e);
                (
                    self.node_rank(self.source(d)) + 1,
                    self.node_rank(self.target(d)) + 1,
                    self.shift(d),
                )
            })
            .collect();
        rows.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)).then_with(|| vec_cmp(&a.2, &b.2)));
        for (s, t, sh) in rows {
            write!(f, "({},{},{})", s, t, fmt_vec(&sh))?;
        }
        Ok(())
    }
}
