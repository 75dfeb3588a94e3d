//! Turning parsed blocks into periodic graphs.

use std::collections::HashMap;

use nalgebra::DMatrix;

use crate::arith::{rat, to_f64, QVec};
use crate::cfg::SITE_EPS;
use crate::error::{Result, SystreError};
use crate::pgraph::{NodeId, PeriodicGraph};
use crate::spacegroup::{Catalogue, Operator};

use super::reader::{integer, real, BlockKind, Entry, Keyword, NetBlock};

/// Neighbours closer than this are rejected as collisions.
const MIN_EDGE_LENGTH: f64 = 0.1;

impl NetBlock {
    /// The periodic graph described by this block. Crystals are expanded
    /// in their conventional cell.
    pub fn to_graph(&self, catalogue: &Catalogue) -> Result<PeriodicGraph> {
        if let Some(e) = &self.error {
            return Err(match e {
                SystreError::Parse { line, msg } => SystreError::parse(*line, msg.clone()),
                other => SystreError::Internal(other.to_string()),
            });
        }
        match self.kind {
            Some(BlockKind::PeriodicGraph) => periodic_graph(self),
            Some(BlockKind::Crystal) => Crystal::read(self, catalogue)?.to_graph(),
            None => Err(SystreError::parse(self.line, "unknown block type")),
        }
    }
}

fn periodic_graph(block: &NetBlock) -> Result<PeriodicGraph> {
    let mut graph: Option<PeriodicGraph> = None;
    let mut by_name: HashMap<&str, NodeId> = HashMap::new();
    for entry in block.entries(Keyword::Edge) {
        let row = &entry.values;
        if row.len() < 3 {
            return Err(SystreError::parse(entry.line, "not enough fields"));
        }
        let d = row.len() - 2;
        let g = graph.get_or_insert_with(|| PeriodicGraph::new(d));
        if g.dimension() != d {
            return Err(SystreError::parse(entry.line, "inconsistent shift dimensions"));
        }
        let v = *by_name.entry(row[0].as_str()).or_insert_with(|| g.new_node());
        let w = *by_name.entry(row[1].as_str()).or_insert_with(|| g.new_node());
        let shift = row[2..]
            .iter()
            .map(|s| integer(s, entry.line))
            .collect::<Result<Vec<i64>>>()?;
        g.new_edge(v, w, &shift)
            .map_err(|e| SystreError::parse(entry.line, e.to_string()))?;
    }
    graph.ok_or_else(|| SystreError::parse(block.line, "no edges given"))
}

fn frac(x: f64) -> f64 {
    x - x.floor()
}

/// Largest per-coordinate distance between two points on the torus.
fn dist_mod_z(p: &[f64], q: &[f64]) -> f64 {
    p.iter()
        .zip(q)
        .map(|(a, b)| {
            let t = frac(a - b);
            t.min(1.0 - t)
        })
        .fold(0.0, f64::max)
}

/// Applies an exact affine operator to a floating-point point.
pub(crate) fn apply_f64(op: &Operator, p: &[f64]) -> Vec<f64> {
    let m = op.homogeneous();
    let d = p.len();
    (0..d)
        .map(|j| {
            p.iter()
                .enumerate()
                .fold(to_f64(m.get(d, j)), |acc, (i, x)| acc + x * to_f64(m.get(i, j)))
        })
        .collect()
}

/// Metric tensor of a cell given by lengths and angles in degrees.
pub fn gram_from_cell(lengths: &[f64], angles: &[f64]) -> Option<DMatrix<f64>> {
    let cos = |deg: f64| deg.to_radians().cos();
    match (lengths, angles) {
        (&[a, b], &[gamma]) => {
            let x = a * b * cos(gamma);
            Some(DMatrix::from_row_slice(2, 2, &[a * a, x, x, b * b]))
        }
        (&[a, b, c], &[alpha, beta, gamma]) => {
            let (al, be, ga) = (b * c * cos(alpha), a * c * cos(beta), a * b * cos(gamma));
            Some(DMatrix::from_row_slice(
                3,
                3,
                &[a * a, ga, be, ga, b * b, al, be, al, c * c],
            ))
        }
        _ => None,
    }
}

struct NodeSpec {
    name: String,
    degree: usize,
    site: Vec<f64>,
    line: usize,
}

enum Endpoint {
    Named(String),
    At(Vec<f64>),
}

struct EdgeSpec {
    from: Endpoint,
    to: Endpoint,
    line: usize,
}

/// The contents of a `CRYSTAL` block.
struct Crystal {
    line: usize,
    dim: usize,
    ops: Vec<Operator>,
    gram: DMatrix<f64>,
    nodes: Vec<NodeSpec>,
    edges: Vec<EdgeSpec>,
}

impl Crystal {
    fn read(block: &NetBlock, catalogue: &Catalogue) -> Result<Self> {
        let group_entries: Vec<&Entry> = block.entries(Keyword::Group).collect();
        if group_entries.len() > 1 {
            return Err(SystreError::parse(group_entries[1].line, "group specified twice"));
        }
        let (dim, ops) = match group_entries.first() {
            Some(entry) => {
                let name = entry.values.join("");
                let dim = if name.starts_with(char::is_lowercase) { 2 } else { 3 };
                let entry_ops = catalogue
                    .entry(&name)
                    .filter(|e| e.dimension == dim)
                    .map(|e| e.operators.clone())
                    .ok_or_else(|| {
                        SystreError::parse(entry.line, format!("space group not recognized: {name}"))
                    })?;
                (dim, entry_ops)
            }
            None => (3, vec![Operator::identity(3)]),
        };

        let cells: Vec<&Entry> = block.entries(Keyword::Cell).collect();
        if cells.len() > 1 {
            return Err(SystreError::parse(cells[1].line, "cell specified twice"));
        }
        let gram = match cells.first() {
            Some(entry) => {
                let m = dim + dim * (dim - 1) / 2;
                if entry.values.len() != m {
                    return Err(SystreError::parse(entry.line, format!("expected {m} arguments")));
                }
                let v = entry
                    .values
                    .iter()
                    .map(|s| real(s, entry.line))
                    .collect::<Result<Vec<f64>>>()?;
                gram_from_cell(&v[..dim], &v[dim..])
                    .filter(|g| g.determinant() > 0.0)
                    .ok_or_else(|| SystreError::parse(entry.line, "degenerate cell"))?
            }
            None => DMatrix::identity(dim, dim),
        };

        let mut nodes: Vec<NodeSpec> = Vec::new();
        for entry in block.entries(Keyword::Node) {
            let row = &entry.values;
            if row.len() != dim + 2 {
                return Err(SystreError::parse(
                    entry.line,
                    format!("expected {} arguments", dim + 2),
                ));
            }
            if nodes.iter().any(|n| n.name == row[0]) {
                return Err(SystreError::parse(entry.line, "node specified twice"));
            }
            let degree = integer(&row[1], entry.line)?;
            if degree <= 0 {
                return Err(SystreError::parse(
                    entry.line,
                    "connectivity must be a positive integer",
                ));
            }
            let site = row[2..]
                .iter()
                .map(|s| real(s, entry.line))
                .collect::<Result<Vec<f64>>>()?;
            nodes.push(NodeSpec {
                name: row[0].clone(),
                degree: degree as usize,
                site,
                line: entry.line,
            });
        }

        let mut edges = Vec::new();
        for entry in block.entries(Keyword::Edge) {
            let row = &entry.values;
            let coords = |r: &[String]| {
                r.iter()
                    .map(|s| real(s, entry.line))
                    .collect::<Result<Vec<f64>>>()
            };
            let (from, to) = if row.len() == 2 {
                (Endpoint::Named(row[0].clone()), Endpoint::Named(row[1].clone()))
            } else if row.len() == dim + 1 {
                (Endpoint::Named(row[0].clone()), Endpoint::At(coords(&row[1..])?))
            } else if row.len() == 2 * dim {
                (Endpoint::At(coords(&row[..dim])?), Endpoint::At(coords(&row[dim..])?))
            } else {
                return Err(SystreError::parse(
                    entry.line,
                    format!("expected 2, {} or {} arguments", dim + 1, 2 * dim),
                ));
            };
            edges.push(EdgeSpec {
                from,
                to,
                line: entry.line,
            });
        }

        Ok(Self {
            line: block.line,
            dim,
            ops,
            gram,
            nodes,
            edges,
        })
    }

    fn to_graph(&self) -> Result<PeriodicGraph> {
        let d = self.dim;
        if self.nodes.is_empty() {
            return Err(SystreError::parse(self.line, "no nodes given"));
        }
        let mut graph = PeriodicGraph::new(d);

        // all images of the given sites, one graph node each
        let mut sites: Vec<(usize, Vec<f64>)> = Vec::new();
        for (k, given) in self.nodes.iter().enumerate() {
            for op in &self.ops {
                let p: Vec<f64> = apply_f64(op, &given.site).into_iter().map(frac).collect();
                match sites.iter().find(|(_, q)| dist_mod_z(&p, q) <= SITE_EPS) {
                    Some((j, _)) if *j == k => {}
                    Some((j, _)) => {
                        return Err(SystreError::parse(
                            given.line,
                            format!("node {} collides with node {}", given.name, self.nodes[*j].name),
                        ))
                    }
                    None => {
                        graph.new_node();
                        sites.push((k, p));
                    }
                }
            }
        }
        let ids: Vec<NodeId> = graph.node_ids().collect();
        tracing::debug!(nodes = ids.len(), "expanded crystal sites");

        let lookup = |p: &[f64], line: usize| -> Result<(NodeId, Vec<i64>)> {
            let (i, (_, q)) = sites
                .iter()
                .enumerate()
                .find(|(_, (_, q))| dist_mod_z(p, q) <= SITE_EPS)
                .ok_or_else(|| SystreError::parse(line, format!("no node at {p:?}")))?;
            let shift = p.iter().zip(q).map(|(a, b)| (a - b).round() as i64).collect();
            Ok((ids[i], shift))
        };
        let site_of = |e: &Endpoint, line: usize| -> Result<Vec<f64>> {
            match e {
                Endpoint::At(p) => Ok(p.clone()),
                Endpoint::Named(n) => self
                    .nodes
                    .iter()
                    .find(|s| &s.name == n)
                    .map(|s| s.site.clone())
                    .ok_or_else(|| SystreError::parse(line, format!("unknown node {n}"))),
            }
        };

        for edge in &self.edges {
            let p = site_of(&edge.from, edge.line)?;
            let q = site_of(&edge.to, edge.line)?;
            for op in &self.ops {
                let (v, sv) = lookup(&apply_f64(op, &p), edge.line)?;
                let (w, sw) = lookup(&apply_f64(op, &q), edge.line)?;
                let s: QVec = sw.iter().zip(&sv).map(|(a, b)| rat(a - b)).collect();
                if graph.get_edge(v, w, &s).is_none() {
                    graph
                        .new_edge_q(v, w, s)
                        .map_err(|e| SystreError::parse(edge.line, e.to_string()))?;
                }
            }
        }

        self.add_nearest_neighbours(&mut graph, &ids, &sites)?;
        Ok(graph)
    }

    /// Fills up every node to its declared degree with its nearest
    /// neighbours under the cell metric.
    fn add_nearest_neighbours(
        &self,
        graph: &mut PeriodicGraph,
        ids: &[NodeId],
        sites: &[(usize, Vec<f64>)],
    ) -> Result<()> {
        let d = self.dim;
        let range: Vec<Vec<i64>> = (0..5i64.pow(d as u32))
            .map(|mut k| {
                (0..d)
                    .map(|_| {
                        let x = k % 5 - 2;
                        k /= 5;
                        x
                    })
                    .collect()
            })
            .collect();
        let dist = |a: &[f64], b: &[f64]| {
            let diff = nalgebra::RowDVector::from_iterator(d, a.iter().zip(b).map(|(x, y)| y - x));
            (&diff * &self.gram * diff.transpose())[(0, 0)].max(0.0).sqrt()
        };

        for (i, (k, p)) in sites.iter().enumerate() {
            let given = &self.nodes[*k];
            let v = ids[i];
            let mut candidates: Vec<(f64, usize, &Vec<i64>)> = Vec::new();
            for (j, (_, q)) in sites.iter().enumerate() {
                for t in &range {
                    if j == i && t.iter().all(|&x| x == 0) {
                        continue;
                    }
                    let shifted: Vec<f64> = q.iter().zip(t).map(|(x, s)| x + *s as f64).collect();
                    candidates.push((dist(p, &shifted), j, t));
                }
            }
            candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

            for (len, j, t) in candidates {
                let deg = graph.degree(v);
                if deg >= given.degree {
                    if deg > given.degree {
                        return Err(SystreError::parse(
                            given.line,
                            format!("too many neighbours found for node {}", given.name),
                        ));
                    }
                    break;
                }
                if len < MIN_EDGE_LENGTH {
                    return Err(SystreError::parse(
                        given.line,
                        format!("found points closer than minimal edge length of {MIN_EDGE_LENGTH}"),
                    ));
                }
                let w = ids[j];
                let s: QVec = t.iter().map(|&x| rat(x)).collect();
                if graph.get_edge(v, w, &s).is_none() {
                    graph
                        .new_edge_q(v, w, s)
                        .map_err(|e| SystreError::parse(given.line, e.to_string()))?;
                }
            }
        }
        Ok(())
    }
}
