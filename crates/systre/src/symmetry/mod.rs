//! Symmetry engine: morphisms, the automorphism group, minimal images and
//! the canonical invariant.
//!
//! Purpose
//! - Decide whether two periodic nets are the same net, and compute the
//!   Systre key that names a net independently of how it was given.
//! - Provide the symmetry operators the space-group finder and the embedder
//!   work from.
//!
//! Why this design
//! - Everything here is exact. Morphisms are found by extending a single
//!   node assignment along edges whose barycentric difference vectors match
//!   under a fixed linear map, so a candidate map is accepted or rejected in
//!   one breadth-first pass.
//! - Characteristic bases make the candidate linear maps finite: a symmetry
//!   maps one basis onto another, so the basis change determines the matrix.
//!
//! Layout
//! - `morphism.rs`: `Morphism` and the breadth-first extension.
//! - `bases.rs`: characteristic bases.
//! - `group.rs`: symmetries, orbits, translational classes, minimal image,
//!   symmetric basis, TD10.
//! - `invariant.rs`: canonical traversal, the invariant and graph ordering.

mod bases;
mod group;
mod invariant;
mod morphism;

pub(crate) use group::UnionFind;
pub use invariant::Invariant;
pub use morphism::Morphism;

#[cfg(test)]
mod tests;
