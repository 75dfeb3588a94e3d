//! Curated API surface.
//!
//! Important
//! - Prefer these re-exports in callers; module paths may move.
//! - Everything here works on exact data except the embedder and the
//!   processed-net geometry, which are `f64`.

// Exact arithmetic
pub use crate::arith::{cell_parameters, frac, rat, to_f64, QMatrix, QVec, Rat};
// Periodic graphs
pub use crate::pgraph::{
    CoordinationSequence, DirEdge, EdgeId, GraphError, LiftedNode, Neighbourhood, NodeId,
    PeriodicGraph,
};
// Symmetry and canonical form
pub use crate::symmetry::{Invariant, Morphism};
// Space groups
pub use crate::spacegroup::{
    cell_correction, Catalogue, CatalogueEntry, CrystalSystem, GroupMatch, Operator,
    OperatorType, SpaceGroup, SpaceGroupFinder,
};
// Embedding
pub use crate::embed::{EmbedCfg, Embedder, Positions, RelaxationWarning, Statistics};
// Archives and net descriptions
pub use crate::archive::{parse_entries, Archive, ArchiveEntry, KEY_VERSION};
pub use crate::net::{
    gram_from_cell, parse_net, read_blocks, BlockKind, CrystalBlock, CrystalNode, NetBlock,
};
// Pipeline
pub use crate::error::{Category, Result, SystreError};
pub use crate::process::{
    process_graph, ArchiveHit, ArchiveSource, Archives, PlacedEdge, PlacedNode, ProcessCfg,
    ProcessedNet,
};
