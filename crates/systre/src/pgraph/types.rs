//! Identifier and edge types for periodic graphs.

use thiserror::Error;

use crate::arith::QVec;

/// Node handle; stable across deletions of other nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Undirected edge handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

/// An edge read in one of its two directions.
///
/// `rev == false` is the stored orientation `(source, target, shift)`;
/// `rev == true` is `(target, source, -shift)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirEdge {
    pub id: EdgeId,
    pub rev: bool,
}

impl DirEdge {
    #[inline]
    pub fn forward(id: EdgeId) -> Self {
        Self { id, rev: false }
    }

    #[inline]
    pub fn reverse(self) -> Self {
        Self {
            id: self.id,
            rev: !self.rev,
        }
    }
}

/// Stored edge data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeData {
    pub source: NodeId,
    pub target: NodeId,
    pub shift: QVec, // integral, length = dimension
}

/// Misuse of the graph model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("edge ({from},{to},{shift}) already exists")]
    DuplicateEdge {
        from: usize,
        to: usize,
        shift: String,
    },
    #[error("shift {shift} is not an integral vector of dimension {dim}")]
    InvalidShift { shift: String, dim: usize },
    #[error("loop at node {0} needs a non-zero shift")]
    DegenerateLoop(usize),
    #[error("no such {0}")]
    NoSuchElement(&'static str),
    #[error("graph is not connected")]
    NotConnected,
    #[error("graph is not locally stable")]
    NotLocallyStable,
    #[error("malformed key: {0}")]
    MalformedKey(String),
}

pub(crate) fn fmt_vec(v: &[crate::arith::Rat]) -> String {
    let parts: Vec<String> = v.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(","))
}
