//! Tolerance defaults (internal).
//!
//! Policy
//! - Exact arithmetic carries the combinatorial phases; the constants below
//!   only guard the floating-point embedding and the geometry read back from
//!   crystal descriptions.

/// Maximum deviation when pushing positions or Gram matrices into the
/// symmetric parameter space.
pub(crate) const SYMMETRY_EPS: f64 = 1e-12;
/// Smallest admissible average edge length before normalization.
pub(crate) const MIN_EDGE_LENGTH: f64 = 1e-3;
/// Cells with a smaller Gram determinant count as degenerated.
pub(crate) const MIN_CELL_DET: f64 = 1e-3;
/// Two crystal sites closer than this (fractional, per coordinate) coincide.
pub(crate) const SITE_EPS: f64 = 1e-3;
/// Tie tolerance when ordering placed nodes for output.
pub(crate) const ORDER_EPS: f64 = 1e-6;
/// Edge lengths (after scaling) below this are penalized by the barrier.
pub(crate) const SHORT_EDGE: f64 = 0.5;
/// Floor for lengths and volumes inside the energy barriers.
pub(crate) const BARRIER_FLOOR: f64 = 1e-12;
