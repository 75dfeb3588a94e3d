//! Dense rational matrices.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use nalgebra::DMatrix;
use num_traits::{One, Signed, Zero};

use super::{rat, to_f64, QVec, Rat};

/// Row-major rational matrix.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QMatrix {
    rows: usize,
    cols: usize,
    data: Vec<Rat>,
}

impl QMatrix {
    pub fn zero(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![Rat::zero(); rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zero(n, n);
        for i in 0..n {
            m.set(i, i, Rat::one());
        }
        m
    }

    /// Builds a matrix from rows of equal length; `cols` is only used when
    /// `rows` is empty.
    pub fn from_rows(rows: Vec<QVec>, cols: usize) -> Self {
        let cols = rows.first().map_or(cols, Vec::len);
        debug_assert!(rows.iter().all(|r| r.len() == cols));
        let n = rows.len();
        Self {
            rows: n,
            cols,
            data: rows.into_iter().flatten().collect(),
        }
    }

    pub fn from_i64_rows(rows: &[Vec<i64>]) -> Self {
        let cols = rows.first().map_or(0, Vec::len);
        Self::from_rows(
            rows.iter().map(|r| r.iter().map(|&x| rat(x)).collect()).collect(),
            cols,
        )
    }

    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> Rat) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Self { rows, cols, data }
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> &Rat {
        &self.data[i * self.cols + j]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, x: Rat) {
        self.data[i * self.cols + j] = x;
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[Rat] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn set_row(&mut self, i: usize, r: &[Rat]) {
        debug_assert_eq!(r.len(), self.cols);
        self.data[i * self.cols..(i + 1) * self.cols].clone_from_slice(r);
    }

    pub fn to_rows(&self) -> Vec<QVec> {
        (0..self.rows).map(|i| self.row(i).to_vec()).collect()
    }

    pub fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for j in 0..self.cols {
            self.data.swap(a * self.cols + j, b * self.cols + j);
        }
    }

    pub fn swap_cols(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for i in 0..self.rows {
            self.data.swap(i * self.cols + a, i * self.cols + b);
        }
    }

    pub fn transpose(&self) -> Self {
        Self::from_fn(self.cols, self.rows, |i, j| self.get(j, i).clone())
    }

    pub fn submatrix(&self, r0: usize, c0: usize, nr: usize, nc: usize) -> Self {
        Self::from_fn(nr, nc, |i, j| self.get(r0 + i, c0 + j).clone())
    }

    /// Stacks `other` below `self`.
    pub fn vstack(&self, other: &Self) -> Self {
        debug_assert_eq!(self.cols, other.cols);
        let mut data = self.data.clone();
        data.extend_from_slice(&other.data);
        Self {
            rows: self.rows + other.rows,
            cols: self.cols,
            data,
        }
    }

    pub fn scaled(&self, f: &Rat) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|x| x * f).collect(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.data.iter().all(Zero::is_zero)
    }

    pub fn is_identity(&self) -> bool {
        self.rows == self.cols
            && (0..self.rows).all(|i| {
                (0..self.cols).all(|j| {
                    let x = self.get(i, j);
                    if i == j {
                        x.is_one()
                    } else {
                        x.is_zero()
                    }
                })
            })
    }

    pub fn is_integral(&self) -> bool {
        self.data.iter().all(|x| x.is_integer())
    }

    /// Integral with determinant ±1.
    pub fn is_unimodular(&self) -> bool {
        self.rows == self.cols && self.is_integral() && self.determinant().abs().is_one()
    }

    /// Entries reduced into `[0,1)`.
    pub fn mod_one(&self) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|x| x - x.floor()).collect(),
        }
    }

    pub fn trace(&self) -> Rat {
        (0..self.rows.min(self.cols)).fold(Rat::zero(), |acc, i| acc + self.get(i, i))
    }

    pub fn determinant(&self) -> Rat {
        debug_assert_eq!(self.rows, self.cols);
        let n = self.rows;
        let mut m = self.clone();
        let mut det = Rat::one();
        for c in 0..n {
            let Some(p) = (c..n).find(|&i| !m.get(i, c).is_zero()) else {
                return Rat::zero();
            };
            if p != c {
                m.swap_rows(p, c);
                det = -det;
            }
            let pivot = m.get(c, c).clone();
            det *= &pivot;
            for i in c + 1..n {
                if m.get(i, c).is_zero() {
                    continue;
                }
                let f = m.get(i, c) / &pivot;
                for j in c..n {
                    let x = m.get(i, j) - &f * m.get(c, j);
                    m.set(i, j, x);
                }
            }
        }
        det
    }

    /// Reduced row echelon form; returns the matrix and its pivot columns.
    pub fn row_echelon(&self) -> (Self, Vec<usize>) {
        let mut m = self.clone();
        let mut pivots = Vec::new();
        let mut r = 0;
        for c in 0..self.cols {
            if r == self.rows {
                break;
            }
            let Some(p) = (r..self.rows).find(|&i| !m.get(i, c).is_zero()) else {
                continue;
            };
            m.swap_rows(p, r);
            let pv = m.get(r, c).clone();
            for j in 0..self.cols {
                let x = m.get(r, j) / &pv;
                m.set(r, j, x);
            }
            for i in 0..self.rows {
                if i == r || m.get(i, c).is_zero() {
                    continue;
                }
                let f = m.get(i, c).clone();
                for j in 0..self.cols {
                    let x = m.get(i, j) - &f * m.get(r, j);
                    m.set(i, j, x);
                }
            }
            pivots.push(c);
            r += 1;
        }
        (m, pivots)
    }

    pub fn rank(&self) -> usize {
        self.row_echelon().1.len()
    }

    /// Solves `self · X = b`; `None` if the system is inconsistent.
    pub fn solve(&self, b: &Self) -> Option<Self> {
        debug_assert_eq!(self.rows, b.rows);
        let n = self.cols;
        let aug = Self::from_fn(self.rows, n + b.cols, |i, j| {
            if j < n {
                self.get(i, j).clone()
            } else {
                b.get(i, j - n).clone()
            }
        });
        let (e, pivots) = aug.row_echelon();
        if pivots.iter().any(|&c| c >= n) {
            return None;
        }
        let mut x = Self::zero(n, b.cols);
        for (r, &c) in pivots.iter().enumerate() {
            for j in 0..b.cols {
                x.set(c, j, e.get(r, n + j).clone());
            }
        }
        Some(x)
    }

    /// Solves `X · self = b`.
    pub fn solve_left(&self, b: &Self) -> Option<Self> {
        self.transpose()
            .solve(&b.transpose())
            .map(|x| x.transpose())
    }

    pub fn inverse(&self) -> Option<Self> {
        if self.rows != self.cols {
            return None;
        }
        let x = self.solve(&Self::identity(self.rows))?;
        if (&x * self).is_identity() {
            Some(x)
        } else {
            None
        }
    }

    /// Basis (as rows) of the space `{x : x·self = 0}`.
    pub fn row_null_space(&self) -> Self {
        // x·A = 0  <=>  Aᵀ·xᵀ = 0
        let (e, pivots) = self.transpose().row_echelon();
        let n = self.rows;
        let free: Vec<usize> = (0..n).filter(|c| !pivots.contains(c)).collect();
        let rows = free
            .iter()
            .map(|&f| {
                let mut v = vec![Rat::zero(); n];
                v[f] = Rat::one();
                for (r, &c) in pivots.iter().enumerate() {
                    v[c] = -e.get(r, f).clone();
                }
                v
            })
            .collect();
        Self::from_rows(rows, n)
    }

    pub fn to_dmatrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.rows, self.cols, |i, j| to_f64(self.get(i, j)))
    }
}

impl Mul<&QMatrix> for &QMatrix {
    type Output = QMatrix;

    fn mul(self, rhs: &QMatrix) -> QMatrix {
        debug_assert_eq!(self.cols, rhs.rows);
        QMatrix::from_fn(self.rows, rhs.cols, |i, j| {
            (0..self.cols).fold(Rat::zero(), |acc, k| acc + self.get(i, k) * rhs.get(k, j))
        })
    }
}

impl Add<&QMatrix> for &QMatrix {
    type Output = QMatrix;

    fn add(self, rhs: &QMatrix) -> QMatrix {
        debug_assert_eq!((self.rows, self.cols), (rhs.rows, rhs.cols));
        QMatrix::from_fn(self.rows, self.cols, |i, j| self.get(i, j) + rhs.get(i, j))
    }
}

impl Sub<&QMatrix> for &QMatrix {
    type Output = QMatrix;

    fn sub(self, rhs: &QMatrix) -> QMatrix {
        debug_assert_eq!((self.rows, self.cols), (rhs.rows, rhs.cols));
        QMatrix::from_fn(self.rows, self.cols, |i, j| self.get(i, j) - rhs.get(i, j))
    }
}

impl Neg for &QMatrix {
    type Output = QMatrix;

    fn neg(self) -> QMatrix {
        self.scaled(&-Rat::one())
    }
}

impl fmt::Display for QMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for i in 0..self.rows {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "[")?;
            for j in 0..self.cols {
                if j > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}", self.get(i, j))?;
            }
            write!(f, "]")?;
        }
        write!(f, "]")
    }
}
