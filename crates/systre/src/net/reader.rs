//! Splitting net description text into keyword-tagged blocks.

use crate::error::{Result, SystreError};

/// Block types the reader understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    PeriodicGraph,
    Crystal,
}

impl BlockKind {
    fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "periodic_graph" => Some(BlockKind::PeriodicGraph),
            "crystal" => Some(BlockKind::Crystal),
            _ => None,
        }
    }

    fn default_key(self) -> Option<Keyword> {
        match self {
            BlockKind::PeriodicGraph => Some(Keyword::Edge),
            BlockKind::Crystal => None,
        }
    }
}

/// Keywords inside a block, after synonyms are resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Keyword {
    Name,
    Group,
    Cell,
    Node,
    Edge,
    EdgeCenter,
}

impl Keyword {
    fn parse(word: &str) -> Option<Self> {
        Some(match word.to_ascii_lowercase().as_str() {
            "name" | "id" => Keyword::Name,
            "group" | "spacegroup" | "space_group" => Keyword::Group,
            "cell" => Keyword::Cell,
            "node" | "nodes" | "vertex" | "vertices" | "vertexes" | "atom" | "atoms" => {
                Keyword::Node
            }
            "edge" | "edges" | "bond" | "bonds" => Keyword::Edge,
            "edge_center" | "edge_centers" | "edge_centre" | "edge_centres" | "edgecenter"
            | "edgecenters" | "edgecentre" | "edgecentres" => Keyword::EdgeCenter,
            _ => return None,
        })
    }
}

/// One data line: its keyword (explicit or inherited) and the fields.
#[derive(Clone, Debug)]
pub(crate) struct Entry {
    pub line: usize,
    pub key: Keyword,
    pub values: Vec<String>,
}

/// A `TYPE ... END` block. Lexical problems are kept in `error` so that a
/// bad block never hides the ones after it.
#[derive(Debug)]
pub struct NetBlock {
    pub kind: Option<BlockKind>,
    /// Line of the block header.
    pub line: usize,
    pub(crate) entries: Vec<Entry>,
    pub(crate) error: Option<SystreError>,
}

impl NetBlock {
    /// Everything given under `NAME`/`ID`; multiple entries joined by `"; "`.
    pub fn name(&self) -> Option<String> {
        self.joined(Keyword::Name)
    }

    /// The `GROUP` entry, `P1` when absent.
    pub fn group(&self) -> String {
        self.joined(Keyword::Group).unwrap_or_else(|| "P1".to_string())
    }

    fn joined(&self, key: Keyword) -> Option<String> {
        let parts: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.key == key)
            .map(|e| e.values.join(" "))
            .collect();
        (!parts.is_empty()).then(|| parts.join("; "))
    }

    pub(crate) fn entries(&self, key: Keyword) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(move |e| e.key == key)
    }
}

/// Splits a line into fields. Double quotes group a field with blanks;
/// `#` outside quotes starts a comment.
fn fields(line: &str, lineno: usize) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let mut chars = line.char_indices().peekable();
    while let Some(&(i, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '#' {
            break;
        }
        if c == '"' {
            chars.next();
            let rest = &line[i + 1..];
            let Some(len) = rest.find('"') else {
                return Err(SystreError::parse(lineno, "no closing quotes"));
            };
            out.push(rest[..len].to_string());
            let end = i + 1 + len + 1;
            while chars.peek().is_some_and(|&(j, _)| j < end) {
                chars.next();
            }
            if let Some(&(_, next)) = chars.peek() {
                if !next.is_whitespace() && next != '#' {
                    return Err(SystreError::parse(lineno, "missing space after string"));
                }
            }
            continue;
        }
        let start = i;
        let mut end = line.len();
        while let Some(&(j, c)) = chars.peek() {
            if c.is_whitespace() || c == '#' {
                end = j;
                break;
            }
            chars.next();
        }
        out.push(line[start..end].to_string());
    }
    Ok(out)
}

fn starts_with_letter(s: &str) -> bool {
    s.chars().next().is_some_and(char::is_alphabetic)
}

/// Reads all blocks of `text`, in order. A block cut off by the end of the
/// input is returned with an error.
pub fn read_blocks(text: &str) -> Vec<NetBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<(NetBlock, Option<Keyword>)> = None;
    for (i, raw) in text.lines().enumerate() {
        let lineno = i + 1;
        let row = match fields(raw, lineno) {
            Ok(row) => row,
            Err(e) => {
                match current.as_mut() {
                    Some((block, _)) => {
                        block.error.get_or_insert(e);
                    }
                    None => blocks.push(NetBlock {
                        kind: None,
                        line: lineno,
                        entries: Vec::new(),
                        error: Some(e),
                    }),
                }
                continue;
            }
        };
        let Some(first) = row.first() else {
            continue;
        };

        let Some((block, key)) = current.as_mut() else {
            let kind = BlockKind::parse(first);
            let error = kind.is_none().then(|| {
                SystreError::parse(lineno, format!("type {} not supported", first.to_lowercase()))
            });
            let key = kind.and_then(BlockKind::default_key);
            current = Some((
                NetBlock {
                    kind,
                    line: lineno,
                    entries: Vec::new(),
                    error,
                },
                key,
            ));
            continue;
        };

        let mut values = row.clone();
        let mut finished = false;
        if starts_with_letter(first) {
            if first.eq_ignore_ascii_case("end") {
                finished = true;
            } else {
                match Keyword::parse(first) {
                    Some(k) => {
                        *key = Some(k);
                        values.remove(0);
                    }
                    // node names in periodic graph edge lines may be words
                    None if block.kind == Some(BlockKind::PeriodicGraph)
                        && *key == Some(Keyword::Edge) => {}
                    None => {
                        block.error.get_or_insert_with(|| {
                            SystreError::parse(lineno, format!("unknown keyword '{first}'"))
                        });
                        continue;
                    }
                }
            }
        }
        if finished {
            if let Some((block, _)) = current.take() {
                blocks.push(block);
            }
            continue;
        }
        match *key {
            Some(k) if !values.is_empty() => block.entries.push(Entry {
                line: lineno,
                key: k,
                values,
            }),
            Some(_) => {}
            None => {
                block
                    .error
                    .get_or_insert_with(|| SystreError::parse(lineno, "keyless data"));
            }
        }
    }
    if let Some((mut block, _)) = current {
        block.error.get_or_insert_with(|| {
            SystreError::parse(block.line, "end of file while reading block")
        });
        blocks.push(block);
    }
    blocks
}

/// A field as a real number; decimals and fractions are accepted.
pub(crate) fn real(s: &str, line: usize) -> Result<f64> {
    if let Some(q) = crate::spacegroup::parse_rational(s) {
        return Ok(crate::arith::to_f64(&q));
    }
    s.parse::<f64>()
        .ok()
        .filter(|x| x.is_finite())
        .ok_or_else(|| SystreError::parse(line, format!("expected a number, found '{s}'")))
}

/// A field as an integer.
pub(crate) fn integer(s: &str, line: usize) -> Result<i64> {
    s.parse::<i64>()
        .map_err(|_| SystreError::parse(line, format!("expected an integer, found '{s}'")))
}
