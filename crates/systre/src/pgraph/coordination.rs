//! Shell-by-shell exploration of the infinite net.

use std::collections::{HashMap, HashSet, VecDeque};

use num_traits::Zero;

use crate::arith::{add, QVec, Rat};

use super::graph::PeriodicGraph;
use super::types::NodeId;

/// A node of the infinite net: quotient node plus lattice translation.
pub type LiftedNode = (NodeId, QVec);

/// Shell sizes around a start node: 1, then the number of nodes at graph
/// distance 1, 2, ... Never ends for a periodic net.
pub struct CoordinationSequence<'a> {
    graph: &'a PeriodicGraph,
    start: NodeId,
    previous: HashSet<LiftedNode>,
    current: HashSet<LiftedNode>,
}

impl<'a> CoordinationSequence<'a> {
    pub fn new(graph: &'a PeriodicGraph, start: NodeId) -> Self {
        Self {
            graph,
            start,
            previous: HashSet::new(),
            current: HashSet::new(),
        }
    }
}

impl Iterator for CoordinationSequence<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.current.is_empty() {
            let zero = vec![Rat::zero(); self.graph.dimension()];
            self.current.insert((self.start, zero));
            return Some(1);
        }
        let mut next = HashSet::new();
        for (v, s) in &self.current {
            for &e in self.graph.incidences(*v) {
                let p = (self.graph.target(e), add(s, &self.graph.shift(e)));
                if !self.previous.contains(&p) && !self.current.contains(&p) {
                    next.insert(p);
                }
            }
        }
        self.previous = std::mem::replace(&mut self.current, next);
        Some(self.current.len())
    }
}

/// Finite piece of the infinite net around one node.
#[derive(Clone, Debug, Default)]
pub struct Neighbourhood {
    pub nodes: Vec<LiftedNode>,
    /// Pairs of indices into `nodes`.
    pub edges: Vec<(usize, usize)>,
}

impl PeriodicGraph {
    pub fn coordination_sequence(&self, v: NodeId) -> CoordinationSequence<'_> {
        CoordinationSequence::new(self, v)
    }

    /// All lifted nodes within graph distance `radius` of `(v, 0)` and all
    /// net edges between them.
    pub fn embedded_neighbourhood(&self, v: NodeId, radius: usize) -> Neighbourhood {
        let zero = vec![Rat::zero(); self.dimension()];
        let mut index: HashMap<LiftedNode, usize> = HashMap::new();
        let mut out = Neighbourhood::default();
        let mut queue = VecDeque::new();
        index.insert((v, zero.clone()), 0);
        out.nodes.push((v, zero));
        queue.push_back((0usize, 0usize));
        while let Some((i, dist)) = queue.pop_front() {
            if dist == radius {
                continue;
            }
            let (u, s) = out.nodes[i].clone();
            for &e in self.incidences(u) {
                let p = (self.target(e), add(&s, &self.shift(e)));
                if !index.contains_key(&p) {
                    index.insert(p.clone(), out.nodes.len());
                    queue.push_back((out.nodes.len(), dist + 1));
                    out.nodes.push(p);
                }
            }
        }
        for (i, (u, s)) in out.nodes.iter().enumerate() {
            for &e in self.incidences(*u) {
                if e.rev {
                    continue;
                }
                let p = (self.target(e), add(s, &self.shift(e)));
                if let Some(&j) = index.get(&p) {
                    out.edges.push((i, j));
                }
            }
        }
        out
    }
}
