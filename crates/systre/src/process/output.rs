//! `ProcessedNet`: a relaxed net in its conventional setting, with the
//! human-readable report and the `CRYSTAL` block.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;

use nalgebra::DMatrix;
use num_traits::Zero;

use crate::archive::ArchiveEntry;
use crate::arith::{cell_parameters, to_f64, to_i64, vec_mat, QMatrix, Rat};
use crate::cfg::ORDER_EPS;
use crate::embed::{Embedder, RelaxationWarning, Statistics};
use crate::error::{Result, SystreError};
use crate::net::{apply_f64, fixed, CrystalBlock, CrystalNode};
use crate::pgraph::{DirEdge, NodeId, PeriodicGraph};
use crate::spacegroup::{cell_correction, Catalogue, GroupMatch, Operator};

fn frac(p: &[f64]) -> Vec<f64> {
    p.iter().map(|x| x - x.floor()).collect()
}

fn plus(p: &[f64], q: &[f64]) -> Vec<f64> {
    p.iter().zip(q).map(|(a, b)| a + b).collect()
}

fn minus(p: &[f64], q: &[f64]) -> Vec<f64> {
    p.iter().zip(q).map(|(a, b)| a - b).collect()
}

fn is_negative(p: &[f64]) -> bool {
    p.iter()
        .find(|x| x.abs() > ORDER_EPS)
        .is_some_and(|x| *x < 0.0)
}

/// Sign first, then magnitude up to `ORDER_EPS`.
fn cmp_coord(x: f64, y: f64) -> Ordering {
    if x < 0.0 {
        if y > 0.0 {
            return Ordering::Greater;
        }
    } else if y < 0.0 {
        return Ordering::Less;
    }
    if (x.abs() - y.abs()).abs() < ORDER_EPS {
        Ordering::Equal
    } else {
        x.abs().total_cmp(&y.abs())
    }
}

/// Output order of placed points: non-negative vectors first, then by norm,
/// then coordinate by coordinate. Not transitive near ties, so only ever
/// used to pick a minimum.
pub(super) fn cmp_placed(p: &[f64], q: &[f64]) -> Ordering {
    match (is_negative(p), is_negative(q)) {
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        _ => {}
    }
    let norm = |v: &[f64]| v.iter().map(|x| x * x).sum::<f64>();
    cmp_coord(norm(p), norm(q)).then_with(|| {
        p.iter()
            .zip(q)
            .map(|(x, y)| cmp_coord(*x, *y))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    })
}

pub(super) fn least<T>(items: impl IntoIterator<Item = T>, cmp: impl Fn(&T, &T) -> Ordering) -> Option<T> {
    items.into_iter().fold(None, |best, x| match best {
        Some(b) if cmp(&x, &b) != Ordering::Less => Some(b),
        _ => Some(x),
    })
}

/// All integer vectors in `{-r..r}^d`.
pub(super) fn window(d: usize, r: i64) -> Vec<Vec<i64>> {
    let mut out = vec![Vec::new()];
    for _ in 0..d {
        out = out
            .into_iter()
            .flat_map(|v| {
                (-r..=r).map(move |k| {
                    let mut w = v.clone();
                    w.push(k);
                    w
                })
            })
            .collect();
    }
    out
}

fn row(p: &[f64]) -> String {
    p.iter().map(|x| format!(" {}", fixed(*x, 5))).collect()
}

/// A node orbit's representative in the conventional cell.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedNode {
    pub node: NodeId,
    pub name: String,
    pub degree: usize,
    pub position: Vec<f64>,
}

/// An edge orbit's representative, starting at a representative node.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedEdge {
    pub from: Vec<f64>,
    pub to: Vec<f64>,
}

impl PlacedEdge {
    pub fn center(&self) -> Vec<f64> {
        self.from
            .iter()
            .zip(&self.to)
            .map(|(a, b)| (a + b) / 2.0)
            .collect()
    }
}

/// A fully processed net.
#[derive(Clone, Debug)]
pub struct ProcessedNet {
    graph: PeriodicGraph,
    name: String,
    group: GroupMatch,
    embedder: Embedder,
    lengths: Vec<f64>,
    angles: Vec<f64>,
    nodes: Vec<PlacedNode>,
    edges: Vec<PlacedEdge>,
    edge_stats: Option<Statistics>,
    angle_stats: Option<Statistics>,
    non_bonded: Option<f64>,
    warnings: Vec<RelaxationWarning>,
    new_entry: Option<ArchiveEntry>,
}

impl ProcessedNet {
    /// Places the embedding of the minimal image `graph` in the corrected
    /// conventional cell of `group`.
    pub fn new(
        graph: PeriodicGraph,
        name: impl Into<String>,
        group: GroupMatch,
        catalogue: &Catalogue,
        embedder: Embedder,
    ) -> Result<Self> {
        let d = graph.dimension();
        let gram = embedder.gram_matrix();
        let correction = cell_correction(&group, &gram)?;
        let to_cell = group
            .to_std
            .then(&Operator::from_parts(&correction, &vec![Rat::zero(); d]));

        let inverse = correction
            .inverse()
            .ok_or_else(|| SystreError::Internal("singular cell correction".into()))?;
        let basis = (&inverse * &group.from_std()?.linear()).to_dmatrix();
        let (lengths, angles) = cell_parameters(&(&basis * &gram * basis.transpose()));

        let centering = centering(catalogue, &group, &correction)?;
        let positions = positions_of(&embedder)?;
        let placed: HashMap<NodeId, Vec<f64>> = positions
            .iter()
            .map(|(v, p)| (*v, apply_f64(&to_cell, p)))
            .collect();
        let at = |v: NodeId| {
            placed
                .get(&v)
                .ok_or_else(|| SystreError::Internal(format!("node {} has no position", v.0 + 1)))
        };

        let mut nodes = Vec::new();
        for (k, orbit) in graph.node_orbits()?.iter().enumerate() {
            let mut candidates = Vec::new();
            for &v in orbit {
                let p = at(v)?;
                candidates.extend(centering.iter().map(|c| (v, frac(&plus(p, c)))));
            }
            let (node, position) = least(candidates, |a, b| cmp_placed(&a.1, &b.1))
                .ok_or_else(|| SystreError::Internal("empty node orbit".into()))?;
            nodes.push(PlacedNode {
                node,
                name: (k + 1).to_string(),
                degree: graph.degree(node),
                position,
            });
        }

        let reps: HashMap<NodeId, &Vec<f64>> = nodes.iter().map(|n| (n.node, &n.position)).collect();
        let mut edges = Vec::new();
        for orbit in graph.edge_orbits()? {
            let mut candidates = Vec::new();
            for &e in &orbit {
                for de in [DirEdge::forward(e), DirEdge::forward(e).reverse()] {
                    let v = graph.source(de);
                    let Some(p0) = reps.get(&v) else { continue };
                    let w = graph.target(de);
                    let s: Vec<f64> = graph.shift(de).iter().map(to_f64).collect();
                    let q = apply_f64(&to_cell, &plus(&positions[&w], &s));
                    let to = plus(p0, &minus(&q, at(v)?));
                    candidates.push(PlacedEdge {
                        from: p0.to_vec(),
                        to,
                    });
                }
            }
            let best = least(candidates, |a, b| {
                cmp_placed(&a.from, &b.from).then_with(|| cmp_placed(&a.to, &b.to))
            })
            .ok_or_else(|| SystreError::Internal("edge orbit misses all representatives".into()))?;
            edges.push(best);
        }

        let non_bonded = shortest_non_bonded(&graph, &positions, &gram)?;
        let edge_stats = embedder.edge_statistics()?;
        let angle_stats = embedder.angle_statistics()?;
        Ok(Self {
            graph,
            name: name.into(),
            group,
            embedder,
            lengths,
            angles,
            nodes,
            edges,
            edge_stats,
            angle_stats,
            non_bonded,
            warnings: Vec::new(),
            new_entry: None,
        })
    }

    pub(crate) fn with_warnings(mut self, warnings: Vec<RelaxationWarning>) -> Self {
        self.warnings = warnings;
        self
    }

    pub(crate) fn with_new_entry(mut self, entry: Option<ArchiveEntry>) -> Self {
        self.new_entry = entry;
        self
    }

    /// The minimal image the embedding belongs to.
    pub fn graph(&self) -> &PeriodicGraph {
        &self.graph
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    pub fn group(&self) -> &GroupMatch {
        &self.group
    }

    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    /// Cell lengths and angles (degrees) of the corrected conventional cell.
    pub fn cell_parameters(&self) -> (&[f64], &[f64]) {
        (&self.lengths, &self.angles)
    }

    pub fn nodes(&self) -> &[PlacedNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[PlacedEdge] {
        &self.edges
    }

    pub fn edge_centers(&self) -> Vec<Vec<f64>> {
        self.edges.iter().map(PlacedEdge::center).collect()
    }

    pub fn edge_statistics(&self) -> Option<Statistics> {
        self.edge_stats
    }

    pub fn angle_statistics(&self) -> Option<Statistics> {
        self.angle_stats
    }

    /// `None` for a net without any pair of non-adjacent nodes in reach.
    pub fn shortest_non_bonded_distance(&self) -> Option<f64> {
        self.non_bonded
    }

    pub fn degrees_of_freedom(&self) -> usize {
        self.embedder.degrees_of_freedom()
    }

    pub fn warnings(&self) -> &[RelaxationWarning] {
        &self.warnings
    }

    /// The archive entry created for this net if it was new in the run.
    pub fn new_entry(&self) -> Option<&ArchiveEntry> {
        self.new_entry.as_ref()
    }

    pub fn crystal(&self) -> CrystalBlock {
        CrystalBlock {
            name: self.name.clone(),
            group: self.group.name.clone(),
            lengths: self.lengths.clone(),
            angles: self.angles.clone(),
            nodes: self
                .nodes
                .iter()
                .map(|n| CrystalNode {
                    name: n.name.clone(),
                    degree: n.degree,
                    position: n.position.clone(),
                })
                .collect(),
            edges: self
                .edges
                .iter()
                .map(|e| (e.from.clone(), e.to.clone()))
                .collect(),
            edge_centers: self.edge_centers(),
        }
    }

    /// The report printed after a successful consistency test.
    pub fn report(&self) -> Report<'_> {
        Report(self)
    }
}

/// Display adapter for [`ProcessedNet::report`].
pub struct Report<'a>(&'a ProcessedNet);

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let net = self.0;
        let cell_state = if net.embedder.cell_relaxed() { "Relaxed" } else { "Unrelaxed" };
        writeln!(f, "   {cell_state} cell parameters:")?;
        let lengths: Vec<String> = ["a", "b", "c"]
            .iter()
            .zip(&net.lengths)
            .map(|(k, x)| format!("{k} = {}", fixed(*x, 5)))
            .collect();
        writeln!(f, "       {}", lengths.join(", "))?;
        let names: &[&str] = if net.angles.len() == 1 { &["gamma"] } else { &["alpha", "beta", "gamma"] };
        let angles: Vec<String> = names
            .iter()
            .zip(&net.angles)
            .map(|(k, x)| format!("{k} = {}", fixed(*x, 4)))
            .collect();
        writeln!(f, "       {}", angles.join(", "))?;

        let pos_state = if net.embedder.positions_relaxed() { "Relaxed" } else { "Barycentric" };
        writeln!(f, "   {pos_state} atom positions:")?;
        for n in &net.nodes {
            writeln!(f, "     {}", row(&n.position))?;
        }
        writeln!(f)?;
        writeln!(f, "   Edges:")?;
        for e in &net.edges {
            writeln!(f, "     {}  <-> {}", row(&e.from), row(&e.to))?;
        }
        writeln!(f, "   Edge centers:")?;
        for c in net.edge_centers() {
            writeln!(f, "     {}", row(&c))?;
        }
        writeln!(f)?;
        if let Some(s) = net.edge_stats {
            writeln!(
                f,
                "   Edge statistics: minimum = {}, maximum = {}, average = {}",
                fixed(s.min, 5),
                fixed(s.max, 5),
                fixed(s.avg, 5)
            )?;
        }
        if let Some(s) = net.angle_stats {
            writeln!(
                f,
                "   Angle statistics: minimum = {}, maximum = {}, average = {}",
                fixed(s.min, 5),
                fixed(s.max, 5),
                fixed(s.avg, 5)
            )?;
        }
        if let Some(x) = net.non_bonded {
            writeln!(f, "   Shortest non-bonded distance = {}", fixed(x, 5))?;
        }
        writeln!(f)?;
        writeln!(f, "   Degrees of freedom: {}", net.degrees_of_freedom())
    }
}

fn positions_of(embedder: &Embedder) -> Result<HashMap<NodeId, Vec<f64>>> {
    let positions = embedder.positions();
    if positions.len() != embedder.graph().number_of_nodes() {
        return Err(SystreError::Internal("embedder lost node positions".into()));
    }
    Ok(positions
        .into_iter()
        .map(|(v, p)| (v, p.iter().copied().collect()))
        .collect())
}

/// Centering translations of the conventional group, zero included, in the
/// corrected cell.
fn centering(catalogue: &Catalogue, group: &GroupMatch, correction: &QMatrix) -> Result<Vec<Vec<f64>>> {
    let entry = catalogue
        .entry(&group.name)
        .ok_or_else(|| SystreError::UnrecognizedGroup(group.name.clone()))?;
    let d = entry.dimension;
    let mut out: Vec<Vec<f64>> = entry
        .operators
        .iter()
        .filter(|op| op.is_translation())
        .map(|op| vec_mat(&op.shift(), correction).iter().map(to_f64).collect())
        .collect();
    if !out.iter().any(|c: &Vec<f64>| c.iter().all(|x| x.abs() < ORDER_EPS)) {
        out.push(vec![0.0; d]);
    }
    Ok(out)
}

/// Smallest distance from an orbit representative to a node it is not bonded
/// to, over the translates of all nodes near the representative.
fn shortest_non_bonded(
    graph: &PeriodicGraph,
    positions: &HashMap<NodeId, Vec<f64>>,
    gram: &DMatrix<f64>,
) -> Result<Option<f64>> {
    let d = graph.dimension();
    let offsets = window(d, 2);
    let dist = |u: &[f64]| {
        let mut s = 0.0;
        for i in 0..d {
            for j in 0..d {
                s += u[i] * gram[(i, j)] * u[j];
            }
        }
        s.max(0.0).sqrt()
    };
    let mut best: Option<f64> = None;
    for orbit in graph.node_orbits()? {
        let v = orbit[0];
        let p = &positions[&v];
        let mut bonded: HashSet<(NodeId, Vec<i64>)> = HashSet::new();
        bonded.insert((v, vec![0; d]));
        for &e in graph.incidences(v) {
            let s: Option<Vec<i64>> = graph.shift(e).iter().map(to_i64).collect();
            let s = s.ok_or_else(|| SystreError::Internal("fractional edge shift".into()))?;
            bonded.insert((graph.target(e), s));
        }
        for w in graph.node_ids() {
            let q = &positions[&w];
            let base: Vec<i64> = p.iter().zip(q).map(|(a, b)| (a - b).round() as i64).collect();
            for t in &offsets {
                let shift: Vec<i64> = base.iter().zip(t).map(|(a, b)| a + b).collect();
                if bonded.contains(&(w, shift.clone())) {
                    continue;
                }
                let u: Vec<f64> = (0..d).map(|i| q[i] + shift[i] as f64 - p[i]).collect();
                let x = dist(&u);
                best = Some(best.map_or(x, |b| b.min(x)));
            }
        }
    }
    Ok(best)
}
