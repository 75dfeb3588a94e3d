//! Configuration and small result types of the embedder.

use std::fmt;

/// Relaxation schedule and optimizer settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmbedCfg {
    /// Optimizer passes per `go`; pass `k` weighs the volume barrier by `10^-k`.
    pub passes: usize,
    /// Step budget of the cell-only phase in the processing pipeline.
    pub cell_steps: usize,
    /// Step budget of the phase that also moves nodes.
    pub position_steps: usize,
    /// Relative spread of simplex values at which a run counts as converged.
    pub tolerance: f64,
    /// Fresh simplices started from the best point after the first run.
    pub restarts: usize,
    /// Edge length of the initial simplex.
    pub scale: f64,
}

impl Default for EmbedCfg {
    fn default() -> Self {
        Self {
            passes: 3,
            cell_steps: 500,
            position_steps: 1000,
            tolerance: 1e-6,
            restarts: 10,
            scale: 1.0,
        }
    }
}

/// A relaxation that had to be undone. The embedding falls back to the
/// barycentric placement and processing continues.
#[derive(Clone, Debug, PartialEq)]
pub enum RelaxationWarning {
    /// The optimizer or the normalization failed.
    CouldNotRelax { pass: usize, reason: String },
    /// The Gram determinant dropped below the admissible minimum.
    DegenerateCell { pass: usize, det: f64 },
    /// The relaxed output did not describe the same net again.
    InconsistentOutput { pass: usize },
}

impl RelaxationWarning {
    pub fn pass(&self) -> usize {
        match self {
            RelaxationWarning::CouldNotRelax { pass, .. }
            | RelaxationWarning::DegenerateCell { pass, .. }
            | RelaxationWarning::InconsistentOutput { pass } => *pass,
        }
    }
}

impl fmt::Display for RelaxationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelaxationWarning::CouldNotRelax { reason, .. } => {
                write!(f, "Could not relax: {reason}")
            }
            RelaxationWarning::DegenerateCell { .. } => {
                f.write_str("Unit cell degenerated in relaxation.")
            }
            RelaxationWarning::InconsistentOutput { .. } => {
                f.write_str("Relaxed output failed the consistency check.")
            }
        }
    }
}

/// Minimum, maximum and average of a family of measurements.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Statistics {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl Statistics {
    /// Folds `values`; `None` when there are none.
    pub(crate) fn of(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut n = 0usize;
        let (mut min, mut max, mut sum) = (f64::MAX, f64::MIN, 0.0);
        for x in values {
            min = min.min(x);
            max = max.max(x);
            sum += x;
            n += 1;
        }
        (n > 0).then(|| Self {
            min,
            max,
            avg: sum / n as f64,
        })
    }
}
