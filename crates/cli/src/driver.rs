use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use systre::prelude::*;

/// One line of `--json` output per structure.
#[derive(Debug, Serialize)]
pub struct Summary {
    pub file: String,
    pub index: usize,
    pub name: String,
    pub ok: bool,
    pub key: Option<String>,
    pub group: Option<String>,
    pub new: bool,
    pub error: Option<String>,
    pub category: Option<String>,
    pub warnings: Vec<String>,
}

/// Batch state across all input files of one invocation.
pub struct Driver {
    catalogue: Catalogue,
    archives: Archives,
    cfg: ProcessCfg,
    json: bool,
    output_path: Option<PathBuf>,
    output_file: Option<File>,
    written: usize,
    summaries: Vec<Summary>,
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        "entry"
    } else {
        "entries"
    }
}

impl Driver {
    pub fn new(cfg: ProcessCfg, json: bool) -> Result<Self> {
        let catalogue = Catalogue::builtin().context("loading the space group table")?;
        let archives = Archives::with_builtin().context("loading the builtin archive")?;
        Ok(Self {
            catalogue,
            archives,
            cfg,
            json,
            output_path: None,
            output_file: None,
            written: 0,
            summaries: Vec::new(),
        })
    }

    /// Nets new to the run are written to `path` as they are found.
    pub fn open_output_archive(&mut self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("creating output archive {}", path.display()))?;
        self.output_path = Some(path.to_path_buf());
        self.output_file = Some(file);
        Ok(())
    }

    pub fn output_archive(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    pub fn summaries(&self) -> &[Summary] {
        &self.summaries
    }

    pub fn entries_written(&self) -> usize {
        self.written
    }

    /// Reads an `.arc` file and registers it under its file name.
    pub fn read_archive(&mut self, path: &Path, out: &mut impl Write) -> Result<()> {
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        if self.archives.is_registered(&name) {
            writeln!(out, "!!! WARNING (USAGE) - Archive \"{name}\" was given twice.")?;
            return Ok(());
        }
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "archive not readable");
                writeln!(out, "!!! ERROR (FILE) - Could not find file \"{}\".", path.display())?;
                return Ok(());
            }
        };
        let mut arc = Archive::new(systre::archive::KEY_VERSION);
        match arc.read_all(&text) {
            Ok(n) => {
                writeln!(out, "Read {n} {} from archive \"{name}\"", plural(n))?;
                writeln!(out)?;
                self.archives.register(name, arc);
            }
            Err(err) => writeln!(out, "!!! ERROR (FILE) - {err} in archive \"{name}\".")?,
        }
        Ok(())
    }

    /// Processes every net description in the file at `path`.
    pub fn process_file(&mut self, path: &Path, out: &mut impl Write) -> Result<()> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "data file not readable");
                writeln!(out, "!!! ERROR (FILE) - Could not find file \"{}\".", path.display())?;
                return Ok(());
            }
        };
        let stem = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = stem.split('.').next().unwrap_or_default().to_string();
        writeln!(out, "Data file \"{}\".", path.display())?;

        for (i, block) in read_blocks(&text).iter().enumerate() {
            let count = i + 1;
            writeln!(out)?;
            if count > 1 {
                writeln!(out)?;
                writeln!(out)?;
            }
            let (archive_name, display) = match block.name() {
                Some(name) => (name.clone(), format!(" - \"{name}\"")),
                None => (format!("{stem}-#{count}"), String::new()),
            };
            writeln!(out, "Structure #{count}{display}.")?;
            writeln!(out)?;
            let _span = tracing::debug_span!("structure", count, name = %archive_name).entered();

            let result = block.to_graph(&self.catalogue).and_then(|g| {
                process_graph(
                    &g,
                    &archive_name,
                    &block.group(),
                    &self.catalogue,
                    &mut self.archives,
                    &self.cfg,
                    out,
                )
            });
            let fresh = self.archives.take_new_entries();
            for entry in &fresh {
                self.append_to_archive(entry)?;
            }
            let summary = match result {
                Ok(net) => Summary {
                    file: path.display().to_string(),
                    index: count,
                    name: archive_name,
                    ok: true,
                    key: net.graph().systre_key().ok(),
                    group: Some(net.group().name.clone()),
                    new: !fresh.is_empty(),
                    error: None,
                    category: None,
                    warnings: net.warnings().iter().map(ToString::to_string).collect(),
                },
                Err(err) => {
                    writeln!(out, "!!! ERROR ({}) - {err}.", err.category())?;
                    Summary {
                        file: path.display().to_string(),
                        index: count,
                        name: archive_name,
                        ok: false,
                        key: None,
                        group: None,
                        new: !fresh.is_empty(),
                        error: Some(err.to_string()),
                        category: Some(err.category().to_string()),
                        warnings: Vec::new(),
                    }
                }
            };
            writeln!(out)?;
            writeln!(out, "Finished structure #{count}{display}.")?;
            if self.json {
                writeln!(out, "{}", serde_json::to_string(&summary)?)?;
            }
            self.summaries.push(summary);
        }
        writeln!(out)?;
        writeln!(out, "Finished data file \"{}\".", path.display())?;
        Ok(())
    }

    fn append_to_archive(&mut self, entry: &ArchiveEntry) -> Result<()> {
        if let Some(file) = self.output_file.as_mut() {
            writeln!(file, "{entry}")
                .and_then(|_| file.flush())
                .context("writing to the output archive")?;
            self.written += 1;
        }
        Ok(())
    }

    /// Closes the output archive and reports how much went into it.
    pub fn finish(&mut self, out: &mut impl Write) -> Result<()> {
        if let Some(mut file) = self.output_file.take() {
            file.flush().context("Output archive not completely written")?;
            writeln!(out, "Wrote {} {} to output archive.", self.written, plural(self.written))?;
        }
        Ok(())
    }
}
