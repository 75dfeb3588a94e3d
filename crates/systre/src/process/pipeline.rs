//! The per-structure flow: checks, minimal image, symmetry, archives,
//! embedding and the consistency test.

use std::io::Write;

use crate::cfg::MIN_CELL_DET;
use crate::embed::{Embedder, RelaxationWarning};
use crate::error::{Result, SystreError};
use crate::net::{fixed, parse_net};
use crate::pgraph::PeriodicGraph;
use crate::spacegroup::{Catalogue, GroupMatch, Operator, SpaceGroupFinder};

use super::output::ProcessedNet;
use super::types::{Archives, ProcessCfg};

const BANNER: &str = "==================================================";

fn io(err: std::io::Error) -> SystreError {
    SystreError::File(format!("could not write output: {err}"))
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{n} {}", if n == 1 { one } else { many })
}

/// Runs the whole analysis of one net, printing progress to `out`.
///
/// `graph` is the net as given and `given_group` the group named in its
/// description. A net not found in any archive is added to the run's own
/// archive as soon as it is identified; its entry comes back in the result
/// and is queued in [`Archives::take_new_entries`] even if a later phase
/// fails.
pub fn process_graph<W: Write + ?Sized>(
    graph: &PeriodicGraph,
    name: &str,
    given_group: &str,
    catalogue: &Catalogue,
    archives: &mut Archives,
    cfg: &ProcessCfg,
    out: &mut W,
) -> Result<ProcessedNet> {
    let d = graph.dimension();
    let label = if name.is_empty() { "nameless" } else { name };
    writeln!(out, "   Given space group is {given_group}.").map_err(io)?;
    let n = graph.number_of_nodes();
    let m = graph.number_of_edges();
    writeln!(
        out,
        "   {} and {} in repeat unit as given.",
        plural(n, "vertex", "vertices"),
        plural(m, "edge", "edges")
    )
    .map_err(io)?;

    if !graph.is_connected() {
        return Err(SystreError::Structure("Structure is not connected".into()));
    }
    if !graph.is_stable()? {
        return Err(SystreError::Structure("Structure has collisions".into()));
    }
    cfg.checkpoint()?;

    let g = graph.minimal_image()?;
    if g.number_of_nodes() < n {
        writeln!(
            out,
            "   Ideal repeat unit smaller than given ({} vs {m} edges).",
            g.number_of_edges()
        )
        .map_err(io)?;
    } else {
        writeln!(out, "   Given repeat unit is accurate.").map_err(io)?;
    }
    if !g.is_barycentric(g.barycentric_placement()?) {
        return Err(SystreError::Internal("Incorrect barycentric placement.".into()));
    }
    writeln!(out).map_err(io)?;
    cfg.checkpoint()?;

    let ops = g.symmetry_operators()?;
    writeln!(out, "   Point group has {} elements.", ops.len()).map_err(io)?;
    let orbits = g.node_orbits()?;
    writeln!(out, "   {} of vertex.", plural(orbits.len(), "kind", "kinds")).map_err(io)?;
    writeln!(out).map_err(io)?;

    writeln!(out, "   Coordination sequences:").map_err(io)?;
    for orbit in &orbits {
        let shells: Vec<String> = g
            .coordination_sequence(orbit[0])
            .skip(1)
            .take(10)
            .map(|x| x.to_string())
            .collect();
        writeln!(out, "       {}", shells.join(" ")).map_err(io)?;
    }
    writeln!(out).map_err(io)?;
    writeln!(out, "   TD10 = {}", fixed(g.td10()?, 4)).map_err(io)?;
    writeln!(out).map_err(io)?;
    cfg.checkpoint()?;

    if d != 3 {
        return Err(SystreError::UnsupportedDimension(d));
    }

    let operators: Vec<Operator> = ops
        .into_iter()
        .map(|m| {
            Operator::from_homogeneous(m)
                .ok_or_else(|| SystreError::Internal("symmetry is not affine".into()))
        })
        .collect::<Result<_>>()?;
    let finder = SpaceGroupFinder::new(catalogue);
    let group = finder.find_operators(d, &operators)?;
    writeln!(out, "   Ideal space group is {}.", group.name).map_err(io)?;
    let given = catalogue.normalized_name(given_group).unwrap_or(given_group);
    if given != group.name {
        writeln!(out, "   Ideal group differs from given ({} vs {given}).", group.name)
            .map_err(io)?;
    }
    writeln!(out).map_err(io)?;
    verify_group(catalogue, &finder, &group, &operators)?;
    cfg.checkpoint()?;

    let key = g.systre_key()?;
    let hits = archives.lookup(&key, cfg.use_builtin_archive);
    for hit in &hits {
        writeln!(out, "{hit}").map_err(io)?;
    }
    let new_entry = if hits.is_empty() {
        writeln!(out, "   Structure is new for this run.").map_err(io)?;
        Some(archives.remember(&g, label)?)
    } else {
        None
    };
    writeln!(out).map_err(io)?;

    let mut warnings = Vec::new();
    for pass in 0..2 {
        cfg.checkpoint()?;
        let embedder = relax(&g, cfg, pass, &mut warnings, out)?;
        let net = ProcessedNet::new(g.clone(), label, group.clone(), catalogue, embedder)?;

        let text = net.crystal().to_string();
        writeln!(out, "   Consistency test:").map_err(io)?;
        write!(out, "       reading...").map_err(io)?;
        let verdict = match parse_net(&text, catalogue).and_then(|t| t.minimal_image()) {
            Err(err) => Err(err),
            Ok(test) => {
                writeln!(out, " OK!").map_err(io)?;
                write!(out, "       comparing...").map_err(io)?;
                match test.is_isomorphic(&g) {
                    Ok(true) => Ok(()),
                    Ok(false) => Err(SystreError::ConsistencyCheck(
                        "Output does not match original graph.".into(),
                    )),
                    Err(err) => Err(err),
                }
            }
        };
        match verdict {
            Ok(()) => {
                writeln!(out, " OK!").map_err(io)?;
                writeln!(out).map_err(io)?;
                write!(out, "{}", net.report()).map_err(io)?;
                return Ok(net.with_warnings(warnings).with_new_entry(new_entry));
            }
            Err(err) => {
                writeln!(out, " Failed!").map_err(io)?;
                tracing::debug!(pass, error = %err, output = %text, "consistency test failed");
                if pass == 0 {
                    if cfg.relax_positions {
                        writeln!(out, "   Falling back to barycentric positions.").map_err(io)?;
                    }
                    warnings.push(RelaxationWarning::InconsistentOutput { pass });
                }
            }
        }
    }
    Err(SystreError::ConsistencyCheck("Could not verify output data".into()))
}

/// The finder's setting must be conventional and must reproduce the
/// catalogued operators.
fn verify_group(
    catalogue: &Catalogue,
    finder: &SpaceGroupFinder<'_>,
    group: &GroupMatch,
    operators: &[Operator],
) -> Result<()> {
    let messed_up = || SystreError::Internal("Spacegroup finder messed up operators.".into());
    let entry = catalogue.entry(&group.name).ok_or_else(messed_up)?;
    if entry.transform != Operator::identity(entry.dimension) {
        return Err(SystreError::Internal(
            "Produced non-conventional space group setting.".into(),
        ));
    }
    finder.verify(group, operators).map_err(|err| {
        tracing::debug!(error = %err, group = %group.name, "operator verification failed");
        messed_up()
    })?;
    if operators.len() != entry.point_group_order() {
        return Err(messed_up());
    }
    Ok(())
}

fn warn<W: Write + ?Sized>(out: &mut W, w: &RelaxationWarning) -> Result<()> {
    tracing::warn!(pass = w.pass(), "{w}");
    writeln!(out, "{BANNER}").map_err(io)?;
    writeln!(out, "!!! WARNING (INTERNAL) - {w}").map_err(io)?;
    writeln!(out, "{BANNER}").map_err(io)
}

/// One embedding pass. Pass 0 relaxes positions when enabled; pass 1 only
/// the cell.
fn relax<W: Write + ?Sized>(
    g: &PeriodicGraph,
    cfg: &ProcessCfg,
    pass: usize,
    warnings: &mut Vec<RelaxationWarning>,
    out: &mut W,
) -> Result<Embedder> {
    let mut embedder = Embedder::new(g, cfg.embed)?;
    embedder.set_relax_positions(false);
    embedder.go(cfg.embed.cell_steps);
    embedder.set_relax_positions(cfg.relax_positions && pass == 0);
    embedder.go(cfg.embed.position_steps);

    if let Err(err) = embedder.normalize() {
        let w = RelaxationWarning::CouldNotRelax {
            pass,
            reason: err.to_string(),
        };
        warn(out, &w)?;
        warnings.push(w);
        embedder.reset()?;
        embedder.normalize()?;
    }

    let det = embedder.gram_matrix().determinant();
    if det.abs() < MIN_CELL_DET {
        let w = RelaxationWarning::DegenerateCell { pass, det };
        warn(out, &w)?;
        warnings.push(w);
        embedder.reset()?;
        embedder.normalize()?;
    }

    if !embedder.positions_relaxed() {
        let bari = g.barycentric_placement()?;
        let misplaced = embedder
            .positions()
            .iter()
            .filter(|(v, p)| {
                let err: f64 = p
                    .iter()
                    .zip(&bari[v.0])
                    .map(|(x, q)| (x - crate::arith::to_f64(q)).powi(2))
                    .sum();
                err.sqrt() > 1e-12
            })
            .count();
        if misplaced > 0 {
            return Err(SystreError::Internal(format!(
                "Embedder misplaced {misplaced} points"
            )));
        }
    }
    Ok(embedder)
}
