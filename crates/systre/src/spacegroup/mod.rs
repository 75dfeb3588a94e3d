//! Space groups: operators, the catalogue of conventional settings, group
//! identification and cell correction.
//!
//! Purpose
//! - Name the symmetry group of a net and find the coordinate change that
//!   puts the net into the conventional setting of that group.
//!
//! Why this design
//! - Operators are exact homogeneous matrices acting on row vectors, the same
//!   convention as the symmetry engine, so net symmetries feed in unchanged.
//! - The catalogue is a plain value built once from the packaged table and
//!   handed around by reference; there is no global state.
//! - Matching solves `A·U = U·B` over the integers for a few generators, then
//!   checks the whole point group and solves for the origin modulo `Z^d`.
//!
//! Layout
//! - `operator.rs`: `Operator`, parsing and printing of `x,y,z` forms.
//! - `optype.rs`: `OperatorType` and `CrystalSystem`.
//! - `group.rs`: `SpaceGroup` (closure, primitive cell and operators).
//! - `catalogue.rs`: `Catalogue` over `data/sgtable.data`.
//! - `finder.rs`: `SpaceGroupFinder` and `GroupMatch`.
//! - `cell.rs`: reduced cells for monoclinic and triclinic groups.

mod catalogue;
mod cell;
mod finder;
mod group;
mod operator;
mod optype;

pub use catalogue::{Catalogue, CatalogueEntry};
pub use cell::{cell_correction, reduced_lattice_basis};
pub use finder::{GroupMatch, SpaceGroupFinder};
pub use group::SpaceGroup;
pub use operator::Operator;
pub(crate) use operator::parse_rational;
pub use optype::{CrystalSystem, OperatorType};

#[cfg(test)]
mod tests;
