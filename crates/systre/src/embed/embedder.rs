//! The embedder: symmetric parameter space, energy and relaxation schedule.

use std::collections::{BTreeMap, HashMap};

use nalgebra::{DMatrix, RowDVector};

use crate::arith::{add, neg, sub, to_f64, vec_mat, QMatrix, QVec, Rat};
use crate::cfg::{BARRIER_FLOOR, MIN_EDGE_LENGTH, SHORT_EDGE, SYMMETRY_EPS};
use crate::error::{Result, SystreError};
use crate::pgraph::{DirEdge, NodeId, PeriodicGraph};
use crate::symmetry::UnionFind;

use super::amoeba::Amoeba;
use super::space::{
    apply, default_gram, gram_config_space, gram_index, linear_parts, node_images,
    node_symmetrizer, normalized_position_space, translational_freedom,
};
use super::types::{EmbedCfg, Statistics};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TermKind {
    Edge,
    Angle,
}

/// One orbit of edges or of angle diagonals (two neighbours of a node).
#[derive(Clone, Debug)]
struct Term {
    v: NodeId,
    w: NodeId,
    shift: RowDVector<f64>,
    kind: TermKind,
    weight: f64,
}

/// How a node's position is read off the parameter vector.
#[derive(Clone, Debug)]
struct NodeChart {
    offset: usize,
    /// Direction rows followed by the base point, `d` columns.
    mapping: DMatrix<f64>,
    /// Homogeneous stabilizer average.
    symmetrizer: DMatrix<f64>,
}

/// Node positions keyed by node.
pub type Positions = BTreeMap<NodeId, RowDVector<f64>>;

/// Relaxes a net's embedding inside its symmetric parameter space.
///
/// States: constructed (barycentric positions, symmetrized identity metric),
/// then after [`Embedder::go`] the cell and optionally the positions are
/// relaxed. [`Embedder::reset`] returns to the constructed state.
#[derive(Clone, Debug)]
pub struct Embedder {
    graph: PeriodicGraph,
    cfg: EmbedCfg,
    dim: usize,
    gram_index: Vec<Vec<usize>>,
    /// Rows span the invariant metrics, packed upper triangle per row.
    gram_space: DMatrix<f64>,
    charts: Vec<Option<NodeChart>>,
    terms: Vec<Term>,
    dim_gram: usize,
    dim_par: usize,
    translational_freedom: usize,
    /// `[gram parameters | node parameters]`
    params: Vec<f64>,
    volume_weight: f64,
    relax_positions: bool,
    positions_relaxed: bool,
    cell_relaxed: bool,
    barycentric: Positions,
    default_gram: DMatrix<f64>,
}

fn row_of(v: &[Rat]) -> RowDVector<f64> {
    RowDVector::from_iterator(v.len(), v.iter().map(to_f64))
}

impl Embedder {
    /// Sets up the parameter space of `graph`, which must be connected and
    /// locally stable, and places it barycentrically.
    pub fn new(graph: &PeriodicGraph, cfg: EmbedCfg) -> Result<Self> {
        let graph = graph.clone();
        let d = graph.dimension();
        let parts = linear_parts(&graph)?;

        let gram_space_q = gram_config_space(d, &parts);
        let dim_gram = gram_space_q.nrows();
        let mut k = dim_gram;

        let mut charts: Vec<Option<NodeChart>> = vec![None; graph.node_capacity()];
        for (rep, images) in node_images(&graph)? {
            let s = node_symmetrizer(&graph, rep)?;
            let n = normalized_position_space(&s)?;
            if &n * &s != n {
                return Err(SystreError::Internal(format!(
                    "bad parameter space for node {}",
                    rep.0 + 1
                )));
            }
            for (w, op) in images {
                let nm = &n * &op;
                let sw = node_symmetrizer(&graph, w)?;
                if &nm * &sw != nm {
                    return Err(SystreError::Internal(format!(
                        "bad parameter space for node {}",
                        w.0 + 1
                    )));
                }
                charts[w.0] = Some(NodeChart {
                    offset: k,
                    mapping: nm.submatrix(0, 0, nm.nrows(), d).to_dmatrix(),
                    symmetrizer: sw.to_dmatrix(),
                });
            }
            k += n.nrows() - 1;
        }
        let dim_par = k;

        let mut terms = Vec::new();
        for orbit in graph.edge_orbits()? {
            let e = DirEdge::forward(orbit[0]);
            terms.push(Term {
                v: graph.source(e),
                w: graph.target(e),
                shift: row_of(&graph.shift(e)),
                kind: TermKind::Edge,
                weight: orbit.len() as f64,
            });
        }
        terms.extend(angle_terms(&graph)?);

        let pos = graph.barycentric_placement()?;
        let barycentric: Positions = graph.node_ids().map(|v| (v, row_of(&pos[v.0]))).collect();
        let default_gram = default_gram(&graph)?.to_dmatrix();

        tracing::debug!(
            gram = dim_gram,
            parameters = dim_par,
            terms = terms.len(),
            "embedder parameter space"
        );
        let mut emb = Self {
            gram_index: gram_index(d),
            gram_space: gram_space_q.to_dmatrix(),
            translational_freedom: translational_freedom(d, &parts),
            graph,
            cfg,
            dim: d,
            charts,
            terms,
            dim_gram,
            dim_par,
            params: vec![0.0; dim_par],
            volume_weight: 1.0,
            relax_positions: true,
            positions_relaxed: false,
            cell_relaxed: false,
            barycentric,
            default_gram,
        };
        emb.reset()?;
        Ok(emb)
    }

    pub fn graph(&self) -> &PeriodicGraph {
        &self.graph
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// Length of the full parameter vector.
    pub fn parameter_dimension(&self) -> usize {
        self.dim_par
    }

    /// Number of independent metric parameters.
    pub fn gram_dimension(&self) -> usize {
        self.dim_gram
    }

    /// Free parameters minus global scale and rigid translations.
    pub fn degrees_of_freedom(&self) -> usize {
        self.dim_par.saturating_sub(1 + self.translational_freedom)
    }

    pub fn relax_positions(&self) -> bool {
        self.relax_positions
    }

    pub fn set_relax_positions(&mut self, relax: bool) {
        self.relax_positions = relax;
    }

    pub fn positions_relaxed(&self) -> bool {
        self.positions_relaxed
    }

    pub fn cell_relaxed(&self) -> bool {
        self.cell_relaxed
    }

    /// Back to barycentric positions and the symmetrized identity metric.
    pub fn reset(&mut self) -> Result<()> {
        let bary = self.barycentric.clone();
        self.set_positions(&bary)?;
        let gram = self.default_gram.clone();
        self.set_gram_matrix(&gram)?;
        self.positions_relaxed = false;
        self.cell_relaxed = false;
        Ok(())
    }

    fn chart(&self, v: NodeId) -> Result<&NodeChart> {
        self.charts
            .get(v.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| SystreError::Internal(format!("no chart for node {}", v.0 + 1)))
    }

    fn position_with(&self, chart: &NodeChart, params: &[f64]) -> RowDVector<f64> {
        let n = chart.mapping.nrows();
        let mut loc: RowDVector<f64> = chart.mapping.row(n - 1).into_owned();
        for j in 0..n - 1 {
            loc += chart.mapping.row(j) * params[chart.offset + j];
        }
        loc
    }

    pub fn position(&self, v: NodeId) -> Result<RowDVector<f64>> {
        Ok(self.position_with(self.chart(v)?, &self.params))
    }

    pub fn positions(&self) -> Positions {
        self.charts
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|c| (NodeId(i), self.position_with(c, &self.params))))
            .collect()
    }

    /// Moves `v` to `p`. The point is first projected onto the positions
    /// compatible with `v`'s site symmetry; it is an error if that moves it
    /// by more than a rounding error.
    pub fn set_position(&mut self, v: NodeId, p: &RowDVector<f64>) -> Result<()> {
        let d = self.dim;
        let chart = self.chart(v)?.clone();
        let n = chart.mapping.nrows();
        if n > 1 {
            let homogeneous = RowDVector::from_iterator(d + 1, p.iter().copied().chain([1.0]));
            let q: RowDVector<f64> = (homogeneous * &chart.symmetrizer).columns(0, d).into_owned();
            let rhs = q - chart.mapping.row(n - 1);
            let dirs = chart.mapping.rows(0, n - 1).into_owned();
            let normal = (&dirs * dirs.transpose()).try_inverse().ok_or_else(|| {
                SystreError::Internal(format!("singular chart for node {}", v.0 + 1))
            })?;
            let x: RowDVector<f64> = rhs * dirs.transpose() * normal;
            for (i, xi) in x.iter().enumerate() {
                self.params[chart.offset + i] = *xi;
            }
        }
        let got = self.position_with(&chart, &self.params);
        let miss = (&got - p).norm();
        if miss > SYMMETRY_EPS {
            return Err(SystreError::Internal(format!(
                "position mismatch: node {} set to {:?}, but turned up as {:?}",
                v.0 + 1,
                p.as_slice(),
                got.as_slice()
            )));
        }
        Ok(())
    }

    pub fn set_positions(&mut self, positions: &Positions) -> Result<()> {
        for (&v, p) in positions {
            self.set_position(v, p)?;
        }
        Ok(())
    }

    fn gram_with(&self, params: &[f64]) -> DMatrix<f64> {
        let d = self.dim;
        let m = self.gram_space.ncols();
        let packed: Vec<f64> = (0..m)
            .map(|i| (0..self.dim_gram).map(|j| params[j] * self.gram_space[(j, i)]).sum())
            .collect();
        let mut gram = DMatrix::from_fn(d, d, |i, j| packed[self.gram_index[i][j]]);
        for i in 0..d {
            if gram[(i, i)] < 0.0 {
                gram[(i, i)] = 0.0;
            }
        }
        for i in 0..d {
            for j in i + 1..d {
                let t = (gram[(i, i)] * gram[(j, j)]).sqrt();
                if gram[(i, j)] > t {
                    gram[(i, j)] = t;
                    gram[(j, i)] = t;
                }
            }
        }
        gram
    }

    /// Current metric, with entries clamped to a positive semidefinite
    /// diagonal and admissible off-diagonal products.
    pub fn gram_matrix(&self) -> DMatrix<f64> {
        self.gram_with(&self.params)
    }

    /// Sets the metric, which must be invariant under the symmetry group.
    pub fn set_gram_matrix(&mut self, gram: &DMatrix<f64>) -> Result<()> {
        let d = self.dim;
        if gram.nrows() != d || gram.ncols() != d {
            return Err(SystreError::Internal(format!(
                "expected a {d}x{d} Gram matrix"
            )));
        }
        let m = self.gram_space.ncols();
        let mut packed = RowDVector::zeros(m);
        for i in 0..d {
            for j in i..d {
                packed[self.gram_index[i][j]] = gram[(i, j)];
            }
        }
        let s = &self.gram_space;
        let normal = (s * s.transpose())
            .try_inverse()
            .ok_or_else(|| SystreError::Internal("singular Gram parameter space".into()))?;
        let x: RowDVector<f64> = &packed * s.transpose() * normal;
        let miss = (&x * s - &packed).amax();
        if miss > SYMMETRY_EPS * packed.amax().max(1.0) {
            return Err(SystreError::Internal(
                "Gram matrix does not respect the symmetry".into(),
            ));
        }
        self.params[..self.dim_gram].copy_from_slice(x.as_slice());
        Ok(())
    }

    /// Energy at the current parameters under the current volume weight.
    pub fn energy(&self) -> f64 {
        self.energy_at(&self.params, self.volume_weight)
    }

    fn energy_at(&self, params: &[f64], volume_weight: f64) -> f64 {
        let gram = self.gram_with(params);
        let n = self.graph.number_of_nodes() as f64;

        let mut lengths = Vec::with_capacity(self.terms.len());
        let (mut edge_sum, mut edge_weight) = (0.0, 0.0);
        for t in &self.terms {
            let (Some(cv), Some(cw)) = (&self.charts[t.v.0], &self.charts[t.w.0]) else {
                return f64::INFINITY;
            };
            let diff = self.position_with(cw, params) + &t.shift - self.position_with(cv, params);
            let len = (&diff * &gram).dot(&diff).max(0.0).sqrt();
            if t.kind == TermKind::Edge {
                edge_sum += len * t.weight;
                edge_weight += t.weight;
            }
            lengths.push(len);
        }
        let scaling = edge_weight / edge_sum;

        let (mut variance, mut edge_penalty, mut angle_penalty) = (0.0, 0.0, 0.0);
        for (t, len) in self.terms.iter().zip(&lengths) {
            let len = len * scaling;
            let penalty = if len < SHORT_EDGE {
                let x = len.max(BARRIER_FLOOR);
                ((0.25 - x) * 2.0 * std::f64::consts::PI).tan().exp() * t.weight
            } else {
                0.0
            };
            match t.kind {
                TermKind::Edge => {
                    let s = 1.0 - len * len;
                    variance += s * s * t.weight;
                    edge_penalty += penalty;
                }
                TermKind::Angle => angle_penalty += penalty,
            }
        }
        variance /= edge_weight;

        let volume = (gram * (scaling * scaling)).determinant().sqrt();
        let volume_penalty = (1.0 / (volume / n).max(BARRIER_FLOOR)).exp() - 1.0;
        volume_weight * volume_penalty + variance + edge_penalty + angle_penalty
    }

    /// Runs the multi-pass relaxation with `steps` simplex iterations per
    /// run. Only the metric moves unless positions are being relaxed.
    pub fn go(&mut self, steps: usize) -> usize {
        if self.dim_par == 0 {
            self.positions_relaxed = self.relax_positions;
            self.cell_relaxed = true;
            return 0;
        }
        let dim = if self.relax_positions {
            self.dim_par
        } else {
            self.dim_gram
        };
        let amoeba = Amoeba::new(self.cfg.tolerance, steps, self.cfg.restarts, self.cfg.scale);
        for pass in 0..self.cfg.passes.max(1) {
            let weight = 10f64.powi(-(pass as i32));
            self.volume_weight = weight;
            let base = self.params.clone();
            let (best, value) = amoeba.minimize(
                |x| {
                    let mut full = base.clone();
                    full[..dim].copy_from_slice(x);
                    self.energy_at(&full, weight)
                },
                &base[..dim],
            );
            self.params[..dim].copy_from_slice(&best);
            tracing::debug!(pass, energy = value, "relaxation pass");
        }
        self.positions_relaxed = self.relax_positions;
        self.cell_relaxed = true;
        steps
    }

    fn edge_lengths(&self) -> Result<Vec<f64>> {
        let gram = self.gram_matrix();
        let mut out = Vec::with_capacity(self.graph.number_of_edges());
        for e in self.graph.edge_ids() {
            let e = DirEdge::forward(e);
            let p = self.position(self.graph.source(e))?;
            let q = self.position(self.graph.target(e))?;
            let diff = q + row_of(&self.graph.shift(e)) - p;
            out.push((&diff * &gram).dot(&diff).max(0.0).sqrt());
        }
        Ok(out)
    }

    /// Edge lengths under the current metric. The minimum ignores edges of
    /// length zero.
    pub fn edge_statistics(&self) -> Result<Option<Statistics>> {
        let lengths = self.edge_lengths()?;
        let Some(mut stats) = Statistics::of(lengths.iter().copied()) else {
            return Ok(None);
        };
        stats.min = lengths
            .iter()
            .copied()
            .filter(|&x| x > 0.0)
            .fold(f64::MAX, f64::min);
        Ok(Some(stats))
    }

    /// Angles in degrees between all pairs of edges at a common node.
    pub fn angle_statistics(&self) -> Result<Option<Statistics>> {
        let gram = self.gram_matrix();
        let mut angles = Vec::new();
        for v in self.graph.node_ids() {
            let p = self.position(v)?;
            let mut vectors = Vec::new();
            for &e in self.graph.incidences(v) {
                let q = self.position(self.graph.target(e))?;
                vectors.push(q + row_of(&self.graph.shift(e)) - &p);
            }
            for (i, s) in vectors.iter().enumerate() {
                let ls = (s * &gram).dot(s).max(0.0).sqrt();
                for t in &vectors[i + 1..] {
                    let lt = (t * &gram).dot(t).max(0.0).sqrt();
                    let cos = ((s * &gram).dot(t) / (ls * lt)).clamp(-1.0, 1.0);
                    angles.push(cos.acos().to_degrees());
                }
            }
        }
        Ok(Statistics::of(angles))
    }

    /// Scales the metric so that the average edge length is 1.
    pub fn normalize(&mut self) -> Result<()> {
        let avg = self.edge_statistics()?.map_or(0.0, |s| s.avg);
        if avg.is_nan() || avg < MIN_EDGE_LENGTH {
            return Err(SystreError::Internal(
                "degenerate unit cell while relaxing".into(),
            ));
        }
        let f = avg * avg;
        for x in &mut self.params[..self.dim_gram] {
            *x /= f;
        }
        Ok(())
    }
}

type AngleKey = (NodeId, NodeId, QVec);

fn angle_key(v: NodeId, w: NodeId, s: QVec) -> AngleKey {
    let r = neg(&s);
    std::cmp::min((v, w, s), (w, v, r))
}

/// One term per orbit of angle diagonals: pairs of neighbours of a common
/// node, identified up to reversal.
fn angle_terms(g: &PeriodicGraph) -> Result<Vec<Term>> {
    let mut keys: Vec<AngleKey> = Vec::new();
    let mut index: HashMap<AngleKey, usize> = HashMap::new();
    for v in g.node_ids() {
        let inc = g.incidences(v);
        for (i, &e1) in inc.iter().enumerate() {
            for &e2 in &inc[i + 1..] {
                let key = angle_key(g.target(e1), g.target(e2), sub(&g.shift(e2), &g.shift(e1)));
                if !index.contains_key(&key) {
                    index.insert(key.clone(), keys.len());
                    keys.push(key);
                }
            }
        }
    }

    let pos = g.barycentric_placement()?;
    let mut uf = UnionFind::new(keys.len());
    for sym in g.symmetries()? {
        let op: &QMatrix = sym.operator();
        let linear = sym.matrix();
        for (i, (v, w, s)) in keys.iter().enumerate() {
            let (vp, wp) = (sym.image(*v), sym.image(*w));
            let dv = sub(&apply(&pos[v.0], op), &pos[vp.0]);
            let dw = sub(&apply(&pos[w.0], op), &pos[wp.0]);
            let sp = sub(&add(&vec_mat(s, linear), &dw), &dv);
            let Some(&j) = index.get(&angle_key(vp, wp, sp)) else {
                return Err(SystreError::Internal(
                    "symmetry does not map angles onto angles".into(),
                ));
            };
            uf.union(i, j);
        }
    }

    let mut orbits: BTreeMap<usize, (usize, usize)> = BTreeMap::new();
    for i in 0..keys.len() {
        let root = uf.find(i);
        let entry = orbits.entry(root).or_insert((i, 0));
        entry.1 += 1;
    }
    let mut reps: Vec<(usize, usize)> = orbits.into_values().collect();
    reps.sort_unstable();
    Ok(reps
        .into_iter()
        .map(|(i, size)| {
            let (v, w, s) = &keys[i];
            Term {
                v: *v,
                w: *w,
                shift: row_of(s),
                kind: TermKind::Angle,
                weight: size as f64,
            }
        })
        .collect())
}
