//! The space-group catalogue: every plane and space group in its
//! conventional setting, loaded from the packaged table.

use std::collections::{BTreeSet, HashMap, VecDeque};

use num_traits::Signed;

use crate::arith::{QMatrix, QVec, Rat};
use crate::error::{Result, SystreError};

use super::group::SpaceGroup;
use super::operator::Operator;
use super::optype::{matrix_order, signature, CrystalSystem};

const BUILTIN_TABLE: &str = include_str!("../../data/sgtable.data");

/// One catalogued group, with everything the finder needs precomputed.
#[derive(Clone, Debug)]
pub struct CatalogueEntry {
    pub name: String,
    pub dimension: usize,
    /// Conventional operators, translations in `[0,1)`.
    pub operators: Vec<Operator>,
    /// From the tabulated setting to the reference setting; identity for
    /// all packaged groups.
    pub transform: Operator,
    /// Rows are the primitive lattice vectors in conventional coordinates.
    pub primitive_cell: QMatrix,
    pub system: CrystalSystem,
    pub centering: char,
    /// Point group in primitive coordinates with the matching translation.
    pub(crate) primitive: HashMap<QMatrix, QVec>,
    /// Sorted signatures of the primitive point group.
    pub(crate) signatures: Vec<(Rat, u32, Rat)>,
    pub(crate) generators: Vec<QMatrix>,
}

impl CatalogueEntry {
    fn build(name: String, transform: Option<Operator>, ops: Vec<Operator>) -> Result<Self> {
        let dim = ops
            .first()
            .or(transform.as_ref())
            .map_or(3, Operator::dimension);
        let transform = transform.unwrap_or_else(|| Operator::identity(dim));
        let group = SpaceGroup::new(dim, ops)?;
        let primitive_cell = group.primitive_cell();
        let prim_ops = group.primitive_operators()?;
        let primitive: HashMap<QMatrix, QVec> = prim_ops
            .iter()
            .map(|op| (op.linear(), op.shift()))
            .collect();
        let point_group: Vec<QMatrix> = prim_ops.iter().map(Operator::linear).collect();
        let mut signatures: Vec<(Rat, u32, Rat)> = point_group.iter().map(signature).collect();
        signatures.sort();
        let generators = point_group_generators(&point_group);
        let system = CrystalSystem::of_point_group(dim, &point_group);
        let centering = name.chars().next().unwrap_or('P');
        Ok(Self {
            name,
            dimension: dim,
            operators: group.operators().to_vec(),
            transform,
            primitive_cell,
            system,
            centering,
            primitive,
            signatures,
            generators,
        })
    }

    pub fn point_group_order(&self) -> usize {
        self.primitive.len()
    }
}

/// Greedy generating set, trying high-order elements first.
fn point_group_generators(elements: &[QMatrix]) -> Vec<QMatrix> {
    let Some(first) = elements.first() else {
        return Vec::new();
    };
    let d = first.nrows();
    let mut sorted: Vec<&QMatrix> = elements.iter().collect();
    sorted.sort_by_key(|m| {
        let order = matrix_order(m, 6);
        let rank = if order == 0 { 100 } else { 6 - order };
        (rank, m.determinant().is_negative())
    });
    let mut gens: Vec<QMatrix> = Vec::new();
    let mut span = linear_closure(d, &gens);
    for m in sorted {
        if span.len() == elements.len() {
            break;
        }
        if !span.contains(m) {
            gens.push(m.clone());
            span = linear_closure(d, &gens);
        }
    }
    gens
}

pub(crate) fn linear_closure(d: usize, gens: &[QMatrix]) -> BTreeSet<QMatrix> {
    let id = QMatrix::identity(d);
    let mut seen = BTreeSet::from([id.clone()]);
    let mut queue = VecDeque::from([id]);
    while let Some(a) = queue.pop_front() {
        for g in gens {
            let b = &a * g;
            if seen.insert(b.clone()) {
                queue.push_back(b);
            }
        }
    }
    seen
}

/// Immutable lookup service over the catalogued groups. Construct it once
/// and pass it by reference to whatever needs group data.
#[derive(Clone, Debug)]
pub struct Catalogue {
    entries: Vec<CatalogueEntry>,
    by_name: HashMap<String, usize>,
    aliases: HashMap<String, String>,
}

impl Catalogue {
    /// The packaged table of all 17 plane and 230 space groups.
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_TABLE)
    }

    /// Reads the table format: a header line `NAME [transform]` in the first
    /// column, indented operator lines below it, `alias SHORT FULL` lines
    /// and `#` comments.
    pub fn parse(text: &str) -> Result<Self> {
        let mut entries = Vec::new();
        let mut by_name = HashMap::new();
        let mut aliases = HashMap::new();
        let mut current: Option<(String, Option<Operator>, Vec<Operator>)> = None;

        let mut flush = |cur: Option<(String, Option<Operator>, Vec<Operator>)>,
                         entries: &mut Vec<CatalogueEntry>|
         -> Result<()> {
            if let Some((name, transform, ops)) = cur {
                if by_name.insert(name.clone(), entries.len()).is_some() {
                    return Err(SystreError::Internal(format!(
                        "space group {name} listed twice"
                    )));
                }
                entries.push(CatalogueEntry::build(name, transform, ops)?);
            }
            Ok(())
        };

        for (i, raw) in text.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.split('#').next().unwrap_or("");
            if line.trim().is_empty() {
                continue;
            }
            let indented = line.starts_with(char::is_whitespace);
            let mut fields = line.split_whitespace();
            let Some(head) = fields.next() else {
                continue;
            };
            if indented {
                let Some((_, _, ops)) = current.as_mut() else {
                    return Err(SystreError::parse(lineno, "operator outside a group"));
                };
                let op = Operator::parse(line.trim())
                    .map_err(|e| e.at_line(lineno))?;
                ops.push(op);
            } else if head == "alias" {
                match (fields.next(), fields.next()) {
                    (Some(short), Some(full)) => {
                        aliases.insert(short.to_string(), full.to_string());
                    }
                    _ => return Err(SystreError::parse(lineno, "alias needs two names")),
                }
            } else {
                flush(current.take(), &mut entries)?;
                let rest: Vec<&str> = fields.collect();
                let transform = if rest.is_empty() {
                    None
                } else {
                    Some(
                        Operator::parse(&rest.join(""))
                            .map_err(|e| e.at_line(lineno))?,
                    )
                };
                current = Some((head.to_string(), transform, Vec::new()));
            }
        }
        flush(current.take(), &mut entries)?;

        tracing::debug!(groups = entries.len(), aliases = aliases.len(), "catalogue loaded");
        Ok(Self {
            entries,
            by_name,
            aliases,
        })
    }

    pub fn entries(&self) -> &[CatalogueEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Blanks removed and aliases resolved. `None` for unknown names.
    pub fn normalized_name(&self, name: &str) -> Option<&str> {
        let compact: String = name.chars().filter(|c| !c.is_whitespace()).collect();
        let full = self.aliases.get(&compact).map_or(compact.as_str(), String::as_str);
        self.by_name
            .get(full)
            .map(|&i| self.entries[i].name.as_str())
    }

    pub fn entry(&self, name: &str) -> Option<&CatalogueEntry> {
        let full = self.normalized_name(name)?;
        self.by_name.get(full).map(|&i| &self.entries[i])
    }

    /// Conventional operators of the named group.
    pub fn operators(&self, name: &str) -> Option<&[Operator]> {
        self.entry(name).map(|e| e.operators.as_slice())
    }

    pub fn transform(&self, name: &str) -> Option<&Operator> {
        self.entry(name).map(|e| &e.transform)
    }
}
