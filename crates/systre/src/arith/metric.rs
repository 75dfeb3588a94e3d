//! Floating-point helpers for quadratic forms.

use nalgebra::DMatrix;

/// Rows orthonormal with respect to the inner product `x·G·yᵀ`, obtained by
/// Gram–Schmidt on the unit vectors. `G` must be positive definite.
pub fn orthonormal_row_basis(gram: &DMatrix<f64>) -> DMatrix<f64> {
    let n = gram.nrows();
    let ip = |x: &DMatrix<f64>, y: &DMatrix<f64>| (x * gram * y.transpose())[(0, 0)];
    let mut rows: Vec<DMatrix<f64>> = Vec::with_capacity(n);
    for i in 0..n {
        let mut v = DMatrix::from_fn(1, n, |_, j| if i == j { 1.0 } else { 0.0 });
        for r in &rows {
            let f = ip(&v, r);
            v -= r * f;
        }
        let norm = ip(&v, &v).sqrt();
        rows.push(v / norm);
    }
    DMatrix::from_fn(n, n, |i, j| rows[i][(0, j)])
}

/// Cell parameters `(lengths, angles in degrees)` of a Gram matrix.
pub fn cell_parameters(gram: &DMatrix<f64>) -> (Vec<f64>, Vec<f64>) {
    let n = gram.nrows();
    let lengths: Vec<f64> = (0..n).map(|i| gram[(i, i)].max(0.0).sqrt()).collect();
    let angle = |i: usize, j: usize| {
        let c = gram[(i, j)] / (lengths[i] * lengths[j]);
        c.clamp(-1.0, 1.0).acos().to_degrees()
    };
    let angles = match n {
        2 => vec![angle(0, 1)],
        3 => vec![angle(1, 2), angle(0, 2), angle(0, 1)],
        _ => Vec::new(),
    };
    (lengths, angles)
}
