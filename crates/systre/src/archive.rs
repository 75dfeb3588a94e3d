//! Archives of known nets, keyed by the Systre key.
//!
//! Purpose
//! - Recognize a net by looking its canonical key up in reference archives
//!   (the packaged one, user files, and the structures seen in this run).
//!
//! Why this design
//! - Entries are plain text blocks with an MD5 checksum over key, version
//!   and name, so hand-edited or truncated archive files are detected on
//!   read.
//! - Two maps (by key, by name) make both lookups direct; names and keys are
//!   each unique within one archive.
//!
//! Layout
//! - `ArchiveEntry`: one record, its digest and text form.
//! - `Archive`: the keyed collection, its reader and the packaged archive.

use std::collections::BTreeMap;
use std::fmt;

use md5::{Digest, Md5};

use crate::error::{Result, SystreError};
use crate::pgraph::PeriodicGraph;

/// Version tag of the keys produced by [`PeriodicGraph::systre_key`].
pub const KEY_VERSION: &str = "1.0";

const BUILTIN: &str = include_str!("../data/builtin.arc");

/// One archived structure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub key: String,
    pub version: String,
    pub name: String,
}

impl ArchiveEntry {
    pub fn new(key: impl Into<String>, version: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version: version.into(),
            name: name.into(),
        }
    }

    /// Entry for `graph` under the current key version.
    pub fn of_graph(graph: &PeriodicGraph, name: &str) -> Result<Self> {
        Ok(Self::new(graph.systre_key()?, KEY_VERSION, name))
    }

    /// Lowercase hex MD5 of `key`, `version` and `name`, newline separated.
    pub fn digest(&self) -> String {
        let mut md5 = Md5::new();
        md5.update(self.key.as_bytes());
        md5.update(b"\n");
        md5.update(self.version.as_bytes());
        md5.update(b"\n");
        md5.update(self.name.as_bytes());
        format!("{:x}", md5.finalize())
    }
}

impl fmt::Display for ArchiveEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "key      {}", self.key)?;
        writeln!(f, "version  {}", self.version)?;
        writeln!(f, "id       {}", self.name)?;
        writeln!(f, "checksum {}", self.digest())?;
        writeln!(f, "end")
    }
}

/// Fields collected while reading one entry.
#[derive(Default)]
struct Pending {
    key: Option<String>,
    version: Option<String>,
    name: Option<String>,
    checksum: Option<String>,
    first_line: usize,
}

impl Pending {
    fn is_empty(&self) -> bool {
        self.key.is_none() && self.version.is_none() && self.name.is_none() && self.checksum.is_none()
    }

    fn finish(self, line: usize) -> Result<ArchiveEntry> {
        let missing = |what: &str| SystreError::parse(line, format!("entry without {what}"));
        let entry = ArchiveEntry::new(
            self.key.ok_or_else(|| missing("key"))?,
            self.version.ok_or_else(|| missing("version"))?,
            self.name.ok_or_else(|| missing("id"))?,
        );
        let checksum = self.checksum.ok_or_else(|| missing("checksum"))?;
        if checksum != entry.digest() {
            return Err(SystreError::parse(
                self.first_line,
                format!("checksum does not match for {}", entry.name),
            ));
        }
        Ok(entry)
    }
}

/// Parses archive text into entries, in file order.
pub fn parse_entries(text: &str) -> Result<Vec<ArchiveEntry>> {
    let mut out = Vec::new();
    let mut cur = Pending::default();
    for (i, raw) in text.lines().enumerate() {
        let lineno = i + 1;
        let line = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            continue;
        }
        let (tag, arg) = match line.split_once(' ') {
            Some((t, a)) => (t.to_string(), a.to_string()),
            None => (line.clone(), String::new()),
        };
        if cur.is_empty() {
            cur.first_line = lineno;
        }
        let slot = match tag.as_str() {
            "key" => &mut cur.key,
            "version" => &mut cur.version,
            "id" => &mut cur.name,
            "checksum" => &mut cur.checksum,
            "end" => {
                out.push(std::mem::take(&mut cur).finish(lineno)?);
                continue;
            }
            other => {
                return Err(SystreError::parse(lineno, format!("unknown tag '{other}'")));
            }
        };
        *slot = Some(arg);
    }
    if !cur.is_empty() {
        return Err(SystreError::parse(cur.first_line, "unterminated entry"));
    }
    Ok(out)
}

/// A collection of entries sharing one key version.
#[derive(Clone, Debug)]
pub struct Archive {
    version: String,
    by_key: BTreeMap<String, ArchiveEntry>,
    by_name: BTreeMap<String, String>,
}

impl Archive {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            by_key: BTreeMap::new(),
            by_name: BTreeMap::new(),
        }
    }

    /// The reference archive packaged with the library.
    pub fn builtin() -> Result<Self> {
        let mut arc = Self::new(KEY_VERSION);
        arc.read_all(BUILTIN)?;
        Ok(arc)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn add(&mut self, entry: ArchiveEntry) -> Result<()> {
        if entry.version != self.version {
            return Err(SystreError::File(format!(
                "entry has key of version {}, but {} is required.",
                entry.version, self.version
            )));
        }
        if self.by_key.contains_key(&entry.key) {
            return Err(SystreError::File(format!(
                "duplicates key for structure {}",
                entry.name
            )));
        }
        if self.by_name.contains_key(&entry.name) {
            return Err(SystreError::File(format!(
                "we already have a structure {}",
                entry.name
            )));
        }
        self.by_name.insert(entry.name.clone(), entry.key.clone());
        self.by_key.insert(entry.key.clone(), entry);
        Ok(())
    }

    /// Adds `graph` under `name` and returns the stored entry.
    pub fn add_graph(&mut self, graph: &PeriodicGraph, name: &str) -> Result<ArchiveEntry> {
        let entry = ArchiveEntry::of_graph(graph, name)?;
        self.add(entry.clone())?;
        Ok(entry)
    }

    pub fn add_all(&mut self, entries: impl IntoIterator<Item = ArchiveEntry>) -> Result<()> {
        entries.into_iter().try_for_each(|e| self.add(e))
    }

    /// Reads every entry of `text`; returns how many were added.
    pub fn read_all(&mut self, text: &str) -> Result<usize> {
        let entries = parse_entries(text)?;
        let n = entries.len();
        self.add_all(entries)?;
        Ok(n)
    }

    pub fn get_by_key(&self, key: &str) -> Option<&ArchiveEntry> {
        self.by_key.get(key)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&ArchiveEntry> {
        self.by_name.get(name).and_then(|k| self.by_key.get(k))
    }

    /// Lookup by key, falling back to the name.
    pub fn get(&self, key_or_name: &str) -> Option<&ArchiveEntry> {
        self.get_by_key(key_or_name)
            .or_else(|| self.get_by_name(key_or_name))
    }

    pub fn delete(&mut self, key: &str) -> Option<ArchiveEntry> {
        let entry = self.by_key.remove(key)?;
        self.by_name.remove(&entry.name);
        Some(entry)
    }

    pub fn clear(&mut self) {
        self.by_key.clear();
        self.by_name.clear();
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Entries ordered by key.
    pub fn entries(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.by_key.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRS: &str = "3 1 2 0 0 0 1 3 0 0 0 1 4 0 0 0 2 3 0 1 0 2 4 1 0 0 3 4 0 0 1";

    #[test]
    fn digests_match_reference_checksums() {
        let srs = ArchiveEntry::new(SRS, "1.0", "srs");
        assert_eq!(srs.digest(), "d01d26b1ad1122626f6c4c98415129f8");
        let dia = ArchiveEntry::new("3 1 2 0 0 0 1 2 0 0 1 1 2 0 1 0 1 2 1 0 0", "1.0", "dia");
        assert_eq!(dia.digest(), "117426f35b961b704f65f267a7ade328");
    }

    #[test]
    fn text_form_reads_back() {
        let srs = ArchiveEntry::new(SRS, "1.0", "srs");
        let text = srs.to_string();
        assert!(text.starts_with("key      3 1 2"));
        assert!(text.ends_with("checksum d01d26b1ad1122626f6c4c98415129f8\nend\n"));

        // extra blanks and empty lines are tolerated
        let messy = text.replace("id       srs", "  id   srs ") + "\n\n";
        assert_eq!(parse_entries(&messy).unwrap(), vec![srs]);
    }

    #[test]
    fn corrupted_entries_are_rejected() {
        let text = ArchiveEntry::new(SRS, "1.0", "srs").to_string();
        let bad = text.replace("id       srs", "id       srz");
        assert!(matches!(
            parse_entries(&bad),
            Err(SystreError::Parse { line: 1, .. })
        ));
        let truncated = text.replace("end\n", "");
        assert!(parse_entries(&truncated).is_err());
        assert!(parse_entries("colour red\n").is_err());
    }

    #[test]
    fn add_rejects_conflicts() {
        let mut arc = Archive::new("1.0");
        arc.add(ArchiveEntry::new(SRS, "1.0", "srs")).unwrap();
        let err = arc.add(ArchiveEntry::new(SRS, "1.0", "other")).unwrap_err();
        assert_eq!(err.to_string(), "duplicates key for structure other");
        let err = arc.add(ArchiveEntry::new("3 1", "1.0", "srs")).unwrap_err();
        assert_eq!(err.to_string(), "we already have a structure srs");
        let err = arc.add(ArchiveEntry::new("3 1", "0.9", "x")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "entry has key of version 0.9, but 1.0 is required."
        );
        assert_eq!(arc.len(), 1);

        assert_eq!(arc.get("srs").map(|e| e.key.as_str()), Some(SRS));
        assert!(arc.get(SRS).is_some());
        assert!(arc.delete(SRS).is_some());
        assert!(arc.get_by_name("srs").is_none());
        assert!(arc.is_empty());
    }

    #[test]
    fn builtin_keys_are_current() {
        let arc = Archive::builtin().unwrap();
        assert_eq!(arc.len(), 10);
        for entry in arc.entries() {
            let g = PeriodicGraph::from_key(&entry.key).unwrap();
            assert_eq!(g.systre_key().unwrap(), entry.key, "{}", entry.name);
        }
    }

    #[test]
    fn add_graph_uses_the_invariant() {
        let g = PeriodicGraph::from_edges(
            3,
            2,
            &[
                (0, 1, vec![0, 0, 0]),
                (0, 1, vec![1, 0, 0]),
                (0, 1, vec![0, 1, 0]),
                (0, 1, vec![0, 0, 1]),
            ],
        )
        .unwrap();
        let mut arc = Archive::new(KEY_VERSION);
        let entry = arc.add_graph(&g, "dia").unwrap();
        assert_eq!(entry.key, "3 1 2 0 0 0 1 2 0 0 1 1 2 0 1 0 1 2 1 0 0");
        assert_eq!(Archive::builtin().unwrap().get_by_key(&entry.key).unwrap().name, "dia");
    }
}
