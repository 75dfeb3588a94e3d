//! Periodic graphs: the quotient multigraph with integer edge shifts.
//!
//! Purpose
//! - Store a finite quotient of a d-periodic net. Each edge `(v, w, s)` stands
//!   for the infinite family of net edges from `(v, t)` to `(w, t + s)`.
//! - Answer the structural questions every later phase depends on:
//!   connectivity, the barycentric placement, (local) stability, and the
//!   coordination sequences of the infinite net.
//!
//! Why this design
//! - Arena storage with tombstones keeps ids stable under deletion, so side
//!   tables indexed by `NodeId.0` stay valid.
//! - Derived data is memoized in `OnceCell`s and thrown away on every
//!   mutation; callers never see a stale placement or invariant.
//!
//! Layout
//! - `types.rs`: ids, directed edge views, `GraphError`.
//! - `graph.rs`: the container, mutation, incidence queries, keys.
//! - `placement.rs`: connectivity, barycentric placement, stability.
//! - `coordination.rs`: coordination sequences and finite neighbourhoods.

mod coordination;
mod graph;
mod placement;
mod types;

pub use coordination::{CoordinationSequence, LiftedNode, Neighbourhood};
pub use graph::PeriodicGraph;
pub use types::{DirEdge, EdgeData, EdgeId, GraphError, NodeId};

#[cfg(test)]
mod tests;
