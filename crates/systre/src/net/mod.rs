//! Reading and writing net descriptions.
//!
//! Purpose
//! - Feed the pipeline from text: `PERIODIC_GRAPH` blocks list quotient
//!   edges directly, `CRYSTAL` blocks give a group, a cell and node sites.
//! - Write relaxed nets back as `CRYSTAL` blocks that read back into the
//!   same net.
//!
//! Why this design
//! - Lexing is separate from interpretation: every block is read up to its
//!   `END` first, so an error inside one block never derails the rest of a
//!   file.
//! - Crystals are expanded in their conventional cell with all operators of
//!   the named group. The result may be larger than a primitive cell; the
//!   pipeline reduces it to the minimal image anyway.
//!
//! Layout
//! - `reader.rs`: fields, keywords and blocks.
//! - `convert.rs`: blocks to periodic graphs, including nearest-neighbour
//!   completion for crystals.
//! - `writer.rs`: `CrystalBlock` and number formatting.

mod convert;
mod reader;
mod writer;

pub use convert::gram_from_cell;
pub(crate) use convert::apply_f64;
pub use reader::{read_blocks, BlockKind, NetBlock};
pub use writer::{fixed, CrystalBlock, CrystalNode};

use crate::error::{Result, SystreError};
use crate::pgraph::PeriodicGraph;
use crate::spacegroup::Catalogue;

/// The graph of the first block in `text`.
pub fn parse_net(text: &str, catalogue: &Catalogue) -> Result<PeriodicGraph> {
    read_blocks(text)
        .first()
        .ok_or_else(|| SystreError::parse(1, "no data block found"))?
        .to_graph(catalogue)
}

#[cfg(test)]
mod tests;
