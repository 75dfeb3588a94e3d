//! Periodic nets: canonical keys, symmetry, space groups and relaxed
//! embeddings.
//!
//! A net enters as a quotient graph with integer edge shifts
//! ([`pgraph::PeriodicGraph`]). The symmetry engine reduces it to its
//! minimal repeat unit and names it by a canonical key, the space-group
//! finder puts it into a conventional setting, and the embedder relaxes a
//! maximally symmetric geometry. [`process::process_graph`] chains all of
//! it for one structure.
//!
//! API Policy
//! - [`api`] is the curated surface; the modules stay public for tests,
//!   benches and the command line.

pub mod api;
pub mod archive;
pub mod arith;
pub(crate) mod cfg;
pub mod embed;
pub mod error;
pub mod net;
pub mod pgraph;
pub mod process;
pub mod spacegroup;
pub mod symmetry;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::{Category, Result, SystreError};

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::archive::{Archive, ArchiveEntry};
    pub use crate::embed::{EmbedCfg, Embedder, RelaxationWarning};
    pub use crate::error::{Category, Result, SystreError};
    pub use crate::net::{parse_net, read_blocks};
    pub use crate::pgraph::{NodeId, PeriodicGraph};
    pub use crate::process::{process_graph, Archives, ProcessCfg, ProcessedNet};
    pub use crate::spacegroup::{Catalogue, SpaceGroupFinder};
}
