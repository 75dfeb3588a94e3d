//! Characteristic bases: ordered d-tuples of edges with independent
//! difference vectors.

use crate::arith::{QMatrix, QVec};
use crate::pgraph::{DirEdge, GraphError, NodeId, PeriodicGraph};

impl PeriodicGraph {
    /// All characteristic bases, in a fixed deterministic order.
    ///
    /// Tries, in order: d-subsets of a single node's incidences (all
    /// orderings), edge chains found by depth-first search, and d-subsets of
    /// all directed edges. The first tier that yields anything wins.
    pub fn characteristic_bases(&self) -> Result<&[Vec<DirEdge>], GraphError> {
        if let Some(b) = self.cache.bases.get() {
            return Ok(b);
        }
        let pos = self.barycentric_placement()?;
        let d = self.dimension();
        let rank_ok = |edges: &[DirEdge]| -> bool {
            let rows: Vec<QVec> = edges.iter().map(|&e| self.difference(pos, e)).collect();
            QMatrix::from_rows(rows, d).rank() == edges.len()
        };

        let mut out = Vec::new();
        for v in self.node_ids() {
            good_combinations(self.incidences(v), d, &rank_ok, &mut out);
        }
        if out.is_empty() {
            for v in self.node_ids() {
                let mut chain = Vec::with_capacity(d);
                self.extend_chains(v, d, &mut chain, &rank_ok, &mut out);
            }
        }
        if out.is_empty() {
            good_combinations(&self.directed_edges(), d, &rank_ok, &mut out);
        }
        Ok(self.cache.bases.get_or_init(|| out))
    }

    fn extend_chains(
        &self,
        v: NodeId,
        d: usize,
        chain: &mut Vec<DirEdge>,
        rank_ok: &dyn Fn(&[DirEdge]) -> bool,
        out: &mut Vec<Vec<DirEdge>>,
    ) {
        for &e in self.incidences(v) {
            chain.push(e);
            if rank_ok(chain) {
                if chain.len() == d {
                    out.push(chain.clone());
                } else {
                    self.extend_chains(self.target(e), d, chain, rank_ok, out);
                }
            }
            chain.pop();
        }
    }
}

/// Every ordering of every independent d-subset of `edges`.
fn good_combinations(
    edges: &[DirEdge],
    d: usize,
    rank_ok: &dyn Fn(&[DirEdge]) -> bool,
    out: &mut Vec<Vec<DirEdge>>,
) {
    for comb in Combinations::new(edges.len(), d) {
        let subset: Vec<DirEdge> = comb.iter().map(|&i| edges[i]).collect();
        if !rank_ok(&subset) {
            continue;
        }
        let mut perm = comb;
        loop {
            out.push(perm.iter().map(|&i| edges[i]).collect());
            if !next_permutation(&mut perm) {
                break;
            }
        }
    }
}

/// Lexicographic k-subsets of `0..n`.
pub(crate) struct Combinations {
    n: usize,
    current: Option<Vec<usize>>,
}

impl Combinations {
    pub(crate) fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            current: (k <= n).then(|| (0..k).collect()),
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let cur = self.current.take()?;
        let k = cur.len();
        let mut nxt = cur.clone();
        let mut i = k;
        while i > 0 {
            i -= 1;
            if nxt[i] < self.n - k + i {
                nxt[i] += 1;
                for j in i + 1..k {
                    nxt[j] = nxt[j - 1] + 1;
                }
                self.current = Some(nxt);
                break;
            }
        }
        Some(cur)
    }
}

/// Advances to the next lexicographic permutation; `false` after the last.
pub(crate) fn next_permutation(a: &mut [usize]) -> bool {
    if a.len() < 2 {
        return false;
    }
    let Some(i) = (0..a.len() - 1).rev().find(|&i| a[i] < a[i + 1]) else {
        return false;
    };
    let Some(j) = (i + 1..a.len()).rev().find(|&j| a[j] > a[i]) else {
        return false;
    };
    a.swap(i, j);
    a[i + 1..].reverse();
    true
}
