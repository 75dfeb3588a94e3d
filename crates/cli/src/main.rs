use anyhow::Result;
use clap::{ArgAction, Parser};
use std::io::{self, Write};
use std::path::PathBuf;
use systre::prelude::*;
use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

mod driver;
mod provenance;

use driver::Driver;

#[derive(Parser)]
#[command(name = "systre", version)]
#[command(about = "Identify periodic nets and relax their embeddings")]
struct Cmd {
    /// Keep node positions barycentric; only the cell is relaxed
    #[arg(short = 'b')]
    barycentric: bool,

    /// Write nets that are new to this run to FILE as an archive
    #[arg(short = 'a', value_name = "FILE")]
    archive: Option<PathBuf>,

    /// Do not look nets up in the builtin archive
    #[arg(long = "nobuiltin")]
    no_builtin: bool,

    /// Print a one-line JSON summary after each structure
    #[arg(long)]
    json: bool,

    /// More log output on stderr (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Net descriptions; files ending in .arc are read as archives
    inputs: Vec<PathBuf>,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    SubscriberBuilder::default()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cmd = Cmd::parse();
    init_logging(cmd.verbose);

    let cfg = ProcessCfg {
        relax_positions: !cmd.barycentric,
        use_builtin_archive: !cmd.no_builtin,
        ..ProcessCfg::default()
    };
    let params = serde_json::json!({
        "relax_positions": cfg.relax_positions,
        "use_builtin_archive": cfg.use_builtin_archive,
        "embed": {
            "passes": cfg.embed.passes,
            "cell_steps": cfg.embed.cell_steps,
            "position_steps": cfg.embed.position_steps,
            "tolerance": cfg.embed.tolerance,
            "restarts": cfg.embed.restarts,
        },
    });
    tracing::info!(version = systre::VERSION, inputs = cmd.inputs.len(), "systre");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut driver = Driver::new(cfg, cmd.json)?;

    if cmd.inputs.is_empty() {
        writeln!(out, "!!! WARNING (USAGE) - No file names given.")?;
    }
    if let Some(path) = &cmd.archive {
        if let Err(err) = driver.open_output_archive(path) {
            writeln!(out, "!!! ERROR (FILE) - Could not open output archive: {err:#}")?;
        }
    }

    let mut count = 0;
    for path in &cmd.inputs {
        if path.extension().is_some_and(|e| e == "arc") {
            driver.read_archive(path, &mut out)?;
        } else {
            count += 1;
            if count > 1 {
                writeln!(out)?;
                writeln!(out)?;
                writeln!(out)?;
            }
            driver.process_file(path, &mut out)?;
        }
    }

    let failed = driver.summaries().iter().filter(|s| !s.ok).count();
    tracing::info!(structures = driver.summaries().len(), failed, "batch finished");
    if let Err(err) = driver.finish(&mut out) {
        writeln!(out, "!!! ERROR (FILE) - {err:#}.")?;
    }
    if let Some(path) = driver.output_archive() {
        let mut payload = provenance::Payload::new(params);
        payload.inputs = cmd
            .inputs
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        let sidecar = provenance::write_sidecar(path, &payload)?;
        tracing::info!(
            archive = %path.display(),
            entries = driver.entries_written(),
            sidecar = %sidecar.display(),
            "output archive written"
        );
    }
    out.flush()?;
    Ok(())
}
