//! The `CRYSTAL` output block.

use std::fmt;

/// `x` with `digits` decimals; negative zero prints without a sign.
pub fn fixed(x: f64, digits: usize) -> String {
    let s = format!("{x:.digits$}");
    if s.starts_with('-') && s[1..].chars().all(|c| c == '0' || c == '.') {
        s[1..].to_string()
    } else {
        s
    }
}

pub(crate) fn coords(p: &[f64]) -> String {
    p.iter()
        .map(|x| fixed(*x, 5))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A node line of the crystal block.
#[derive(Clone, Debug, PartialEq)]
pub struct CrystalNode {
    pub name: String,
    pub degree: usize,
    pub position: Vec<f64>,
}

/// A net as a crystal: group, cell, one node per orbit and one edge per
/// orbit, all in conventional coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct CrystalBlock {
    pub name: String,
    pub group: String,
    /// Cell lengths `a, b[, c]`.
    pub lengths: Vec<f64>,
    /// Cell angles in degrees: `α, β, γ`, or only `γ` in the plane.
    pub angles: Vec<f64>,
    pub nodes: Vec<CrystalNode>,
    pub edges: Vec<(Vec<f64>, Vec<f64>)>,
    pub edge_centers: Vec<Vec<f64>>,
}

impl fmt::Display for CrystalBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CRYSTAL")?;
        if self.name.contains(char::is_whitespace) {
            writeln!(f, "  NAME \"{}\"", self.name)?;
        } else {
            writeln!(f, "  NAME {}", self.name)?;
        }
        writeln!(f, "  GROUP {}", self.group)?;
        let mut cell: Vec<String> = self.lengths.iter().map(|x| fixed(*x, 5)).collect();
        cell.extend(self.angles.iter().map(|x| fixed(*x, 4)));
        writeln!(f, "  CELL {}", cell.join(" "))?;
        for node in &self.nodes {
            writeln!(
                f,
                "  NODE {} {}  {}",
                node.name,
                node.degree,
                coords(&node.position)
            )?;
        }
        for (p, q) in &self.edges {
            writeln!(f, "  EDGE  {}   {}", coords(p), coords(q))?;
        }
        for c in &self.edge_centers {
            writeln!(f, "# EDGE_CENTER  {}", coords(c))?;
        }
        writeln!(f, "END")
    }
}
