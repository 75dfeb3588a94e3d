//! Relaxed embeddings of periodic nets.
//!
//! Purpose
//! - Turn the barycentric placement into a geometric embedding: a unit-cell
//!   metric (Gram matrix) and node positions with edge lengths as uniform as
//!   the net allows, while keeping the full combinatorial symmetry exact.
//!
//! Why this design
//! - Symmetry is built into the parameter space instead of being enforced by
//!   penalties. One orbit representative per node orbit owns the free
//!   coordinates of its site-symmetry subspace; every other node is a fixed
//!   affine image of its representative. The Gram matrix lives in the space of
//!   metrics invariant under all linear parts.
//! - The parameter space is built exactly (rationals) and evaluated in `f64`.
//!   The conversion happens once, when the charts are stored.
//! - The energy is not smooth at the barriers, so the optimizer is a
//!   derivative-free simplex search with restarts.
//!
//! Layout
//! - `types.rs`: `EmbedCfg`, `RelaxationWarning`, `Statistics`.
//! - `space.rs`: exact construction of the Gram and position parameter spaces.
//! - `amoeba.rs`: Nelder–Mead simplex minimizer.
//! - `embedder.rs`: the `Embedder` state machine, energy and accessors.

mod amoeba;
mod embedder;
mod space;
mod types;

pub use amoeba::Amoeba;
pub use embedder::{Embedder, Positions};
pub use space::{gram_config_space, normalized_position_space};
pub use types::{EmbedCfg, RelaxationWarning, Statistics};

#[cfg(test)]
mod tests;
