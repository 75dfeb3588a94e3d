//! Configuration and archive bookkeeping of the pipeline.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::archive::{Archive, ArchiveEntry, KEY_VERSION};
use crate::embed::EmbedCfg;
use crate::error::{Result, SystreError};
use crate::pgraph::PeriodicGraph;

/// Settings of one processing run.
#[derive(Clone, Debug)]
pub struct ProcessCfg {
    /// Relax node positions in addition to the cell.
    pub relax_positions: bool,
    /// Consult the packaged archive when identifying nets.
    pub use_builtin_archive: bool,
    /// Raised by a host application to stop the current structure.
    pub cancel: Arc<AtomicBool>,
    pub embed: EmbedCfg,
}

impl Default for ProcessCfg {
    fn default() -> Self {
        Self {
            relax_positions: true,
            use_builtin_archive: true,
            cancel: Arc::new(AtomicBool::new(false)),
            embed: EmbedCfg::default(),
        }
    }
}

impl ProcessCfg {
    /// Requests cancellation; takes effect at the next phase boundary.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub(crate) fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(SystreError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Where a known net was found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArchiveSource {
    Builtin,
    Named(String),
    /// Seen earlier in the same run.
    Internal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveHit {
    pub source: ArchiveSource,
    pub name: String,
}

impl fmt::Display for ArchiveHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            ArchiveSource::Builtin => writeln!(f, "   Structure was found in builtin archive.")?,
            ArchiveSource::Named(arc) => writeln!(f, "   Structure was found in archive \"{arc}\"")?,
            ArchiveSource::Internal => writeln!(f, "   Structure already seen in this run.")?,
        }
        write!(f, "       Name: {}", self.name)
    }
}

/// The archives consulted during a run: the packaged one, archives named
/// on the command line, and the nets seen so far.
#[derive(Clone, Debug)]
pub struct Archives {
    builtin: Option<Archive>,
    named: Vec<(String, Archive)>,
    internal: Archive,
    /// Added to `internal` but not yet taken by the caller.
    fresh: Vec<ArchiveEntry>,
}

impl Default for Archives {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Archives {
    pub fn new(builtin: Option<Archive>) -> Self {
        Self {
            builtin,
            named: Vec::new(),
            internal: Archive::new(KEY_VERSION),
            fresh: Vec::new(),
        }
    }

    /// With the packaged archive loaded.
    pub fn with_builtin() -> Result<Self> {
        Ok(Self::new(Some(Archive::builtin()?)))
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.named.iter().any(|(n, _)| n == name)
    }

    /// Adds a named archive; `false` if the name is already taken.
    pub fn register(&mut self, name: impl Into<String>, archive: Archive) -> bool {
        let name = name.into();
        if self.is_registered(&name) {
            return false;
        }
        self.named.push((name, archive));
        true
    }

    /// Nets identified in this run, in the order of their keys.
    pub fn internal(&self) -> &Archive {
        &self.internal
    }

    /// Records a net as seen in this run and queues its entry for
    /// [`Archives::take_new_entries`].
    pub(crate) fn remember(&mut self, graph: &PeriodicGraph, name: &str) -> Result<ArchiveEntry> {
        let entry = self.internal.add_graph(graph, name)?;
        self.fresh.push(entry.clone());
        Ok(entry)
    }

    /// Entries remembered since the last call, whether or not the
    /// structure that produced them went on to process cleanly.
    pub fn take_new_entries(&mut self) -> Vec<ArchiveEntry> {
        std::mem::take(&mut self.fresh)
    }

    /// Every archive entry with this key, packaged archive first and the
    /// run's own archive last.
    pub fn lookup(&self, key: &str, use_builtin: bool) -> Vec<ArchiveHit> {
        let mut hits = Vec::new();
        if use_builtin {
            if let Some(e) = self.builtin.as_ref().and_then(|a| a.get_by_key(key)) {
                hits.push(ArchiveHit {
                    source: ArchiveSource::Builtin,
                    name: e.name.clone(),
                });
            }
        }
        for (arc_name, arc) in &self.named {
            if let Some(e) = arc.get_by_key(key) {
                hits.push(ArchiveHit {
                    source: ArchiveSource::Named(arc_name.clone()),
                    name: e.name.clone(),
                });
            }
        }
        if let Some(e) = self.internal.get_by_key(key) {
            hits.push(ArchiveHit {
                source: ArchiveSource::Internal,
                name: e.name.clone(),
            });
        }
        hits
    }
}
