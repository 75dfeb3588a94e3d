//! The processing pipeline for one net at a time.
//!
//! Purpose
//! - Take a periodic graph as given and produce everything a user wants to
//!   know about it: the minimal repeat unit, point group and vertex kinds,
//!   coordination sequences, the space group in its conventional setting,
//!   the archive name, and a relaxed embedding that provably describes the
//!   same net.
//!
//! Why this design
//! - Progress goes to a caller-supplied writer while the structured result
//!   comes back as a value. The command line prints the writer as it goes;
//!   library users and tests can throw it away and look at `ProcessedNet`.
//! - Every relaxed embedding is checked by writing it out as a crystal,
//!   reading it back and comparing nets. A failed first pass falls back to
//!   barycentric positions; only a failed second pass is an error.
//! - Cancellation is a shared flag checked between phases, never inside the
//!   exact computations.
//!
//! Layout
//! - `types.rs`: `ProcessCfg` and the `Archives` consulted during a run.
//! - `pipeline.rs`: `process_graph`.
//! - `output.rs`: `ProcessedNet`, its report and its crystal block.

mod output;
mod pipeline;
mod types;

pub use output::{PlacedEdge, PlacedNode, ProcessedNet, Report};
pub use pipeline::process_graph;
pub use types::{ArchiveHit, ArchiveSource, Archives, ProcessCfg};
