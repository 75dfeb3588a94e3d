//! Nelder–Mead downhill simplex ("amoeba") with restarts.
//!
//! Non-finite function values (NaN included) are treated as `+∞`, so the
//! objective may step outside its domain without poisoning the simplex.

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;
const TINY: f64 = 1e-10;

/// Derivative-free minimizer.
#[derive(Clone, Copy, Debug)]
pub struct Amoeba {
    /// Relative spread of simplex values at which a run stops.
    pub tolerance: f64,
    /// Iterations per run.
    pub steps: usize,
    /// Additional runs restarted from the best point so far.
    pub restarts: usize,
    /// Edge length of each initial simplex.
    pub scale: f64,
}

#[inline]
fn sanitize(y: f64) -> f64 {
    if y.is_nan() {
        f64::INFINITY
    } else {
        y
    }
}

fn converged(lo: f64, hi: f64, tol: f64) -> bool {
    if !lo.is_finite() || !hi.is_finite() {
        return lo == hi;
    }
    2.0 * (hi - lo).abs() <= tol * (hi.abs() + lo.abs() + TINY)
}

impl Amoeba {
    pub fn new(tolerance: f64, steps: usize, restarts: usize, scale: f64) -> Self {
        Self {
            tolerance,
            steps,
            restarts,
            scale,
        }
    }

    /// Minimizes `f` starting at `start`. The returned point is never worse
    /// than `start`.
    pub fn minimize<F>(&self, mut f: F, start: &[f64]) -> (Vec<f64>, f64)
    where
        F: FnMut(&[f64]) -> f64,
    {
        let mut best = start.to_vec();
        let mut f_best = sanitize(f(&best));
        if start.is_empty() {
            return (best, f_best);
        }
        for round in 0..=self.restarts {
            let (x, fx) = self.run(&mut f, &best, f_best);
            let improved = fx < f_best;
            let significant = improved && !converged(fx, f_best, self.tolerance);
            if improved {
                best = x;
                f_best = fx;
            }
            if !significant {
                tracing::trace!(round, value = f_best, "simplex search settled");
                break;
            }
        }
        (best, f_best)
    }

    /// One simplex run from `x0`, whose value `f0` is already known.
    fn run<F>(&self, f: &mut F, x0: &[f64], f0: f64) -> (Vec<f64>, f64)
    where
        F: FnMut(&[f64]) -> f64,
    {
        let n = x0.len();
        let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
        let mut values: Vec<f64> = Vec::with_capacity(n + 1);
        simplex.push(x0.to_vec());
        values.push(f0);
        for i in 0..n {
            let mut x = x0.to_vec();
            x[i] += self.scale;
            values.push(sanitize(f(&x)));
            simplex.push(x);
        }

        let mut order: Vec<usize> = (0..=n).collect();
        for _ in 0..self.steps {
            order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
            let (lo, next, hi) = (order[0], order[n - 1], order[n]);
            if converged(values[lo], values[hi], self.tolerance) {
                break;
            }

            // centroid of all points but the worst
            let mut centroid = vec![0.0; n];
            for &k in &order[..n] {
                for (c, x) in centroid.iter_mut().zip(&simplex[k]) {
                    *c += x / n as f64;
                }
            }
            let towards = |t: f64, from: &[f64]| -> Vec<f64> {
                centroid
                    .iter()
                    .zip(from)
                    .map(|(c, x)| c + t * (c - x))
                    .collect()
            };

            let reflected = towards(REFLECT, &simplex[hi]);
            let f_reflected = sanitize(f(&reflected));
            if f_reflected < values[lo] {
                let expanded = towards(EXPAND, &simplex[hi]);
                let f_expanded = sanitize(f(&expanded));
                if f_expanded < f_reflected {
                    simplex[hi] = expanded;
                    values[hi] = f_expanded;
                } else {
                    simplex[hi] = reflected;
                    values[hi] = f_reflected;
                }
                continue;
            }
            if f_reflected < values[next] {
                simplex[hi] = reflected;
                values[hi] = f_reflected;
                continue;
            }
            let contracted = if f_reflected < values[hi] {
                towards(CONTRACT, &simplex[hi])
            } else {
                towards(-CONTRACT, &simplex[hi])
            };
            let f_contracted = sanitize(f(&contracted));
            if f_contracted < values[hi].min(f_reflected) {
                simplex[hi] = contracted;
                values[hi] = f_contracted;
                continue;
            }
            let anchor = simplex[lo].clone();
            for &k in &order[1..] {
                let x: Vec<f64> = anchor
                    .iter()
                    .zip(&simplex[k])
                    .map(|(a, x)| a + SHRINK * (x - a))
                    .collect();
                values[k] = sanitize(f(&x));
                simplex[k] = x;
            }
        }

        let lo = (0..=n)
            .min_by(|&a, &b| values[a].total_cmp(&values[b]))
            .unwrap_or(0);
        (simplex.swap_remove(lo), values[lo])
    }
}
