//! Affine operators in homogeneous row form.

use std::fmt;

use num_traits::{One, Signed, Zero};

use crate::arith::{add, mod_one, rat, vec_mat, QMatrix, QVec, Rat};
use crate::error::{Result, SystreError};

const AXES: [char; 3] = ['x', 'y', 'z'];

/// `p ↦ p·L + t`, stored as the `(d+1)×(d+1)` matrix `[[L, 0], [t, 1]]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Operator {
    m: QMatrix,
}

impl Operator {
    pub fn identity(dim: usize) -> Self {
        Self {
            m: QMatrix::identity(dim + 1),
        }
    }

    pub fn from_parts(linear: &QMatrix, shift: &[Rat]) -> Self {
        let d = linear.nrows();
        debug_assert_eq!(shift.len(), d);
        let m = QMatrix::from_fn(d + 1, d + 1, |i, j| match (i < d, j < d) {
            (true, true) => linear.get(i, j).clone(),
            (true, false) => Rat::zero(),
            (false, true) => shift[j].clone(),
            (false, false) => Rat::one(),
        });
        Self { m }
    }

    /// Accepts a homogeneous matrix whose last column is `(0, …, 0, 1)`.
    pub fn from_homogeneous(m: QMatrix) -> Option<Self> {
        let n = m.nrows();
        if n == 0 || m.ncols() != n {
            return None;
        }
        let affine = (0..n).all(|i| {
            let x = m.get(i, n - 1);
            if i + 1 == n {
                x.is_one()
            } else {
                x.is_zero()
            }
        });
        affine.then_some(Self { m })
    }

    /// The pure translation by `t`.
    pub fn translation(t: &[Rat]) -> Self {
        Self::from_parts(&QMatrix::identity(t.len()), t)
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.m.nrows() - 1
    }

    pub fn linear(&self) -> QMatrix {
        let d = self.dimension();
        self.m.submatrix(0, 0, d, d)
    }

    pub fn shift(&self) -> QVec {
        let d = self.dimension();
        self.m.row(d)[..d].to_vec()
    }

    pub fn homogeneous(&self) -> &QMatrix {
        &self.m
    }

    /// Apply `self`, then `other`.
    pub fn then(&self, other: &Operator) -> Operator {
        Operator {
            m: &self.m * &other.m,
        }
    }

    pub fn inverse(&self) -> Option<Operator> {
        self.m.inverse().map(|m| Operator { m })
    }

    /// Same linear part, translation reduced into `[0,1)^d`.
    pub fn mod_z(&self) -> Operator {
        Operator::from_parts(&self.linear(), &mod_one(&self.shift()))
    }

    pub fn is_translation(&self) -> bool {
        self.linear().is_identity()
    }

    pub fn apply(&self, p: &[Rat]) -> QVec {
        add(&vec_mat(p, &self.linear()), &self.shift())
    }

    /// Image of a direction vector (no translation).
    pub fn apply_linear(&self, v: &[Rat]) -> QVec {
        vec_mat(v, &self.linear())
    }

    /// Conjugate by a coordinate change `c`: the same map expressed in the
    /// coordinates `c` maps to.
    pub fn conjugate(&self, c: &Operator) -> Option<Operator> {
        Some(c.inverse()?.then(self).then(c))
    }

    /// Parses the symbolic form, e.g. `-y,x-y,z+1/2`: the i-th part is the
    /// i-th coordinate of the image, written in terms of `x`, `y`, `z`.
    pub fn parse(s: &str) -> Result<Operator> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let d = parts.len();
        if !(1..=3).contains(&d) {
            return Err(bad_op(s, "expected 1 to 3 coordinates"));
        }
        let mut linear = QMatrix::zero(d, d);
        let mut shift = vec![Rat::zero(); d];
        for (i, part) in parts.iter().enumerate() {
            for (coef, var) in parse_terms(part).ok_or_else(|| bad_op(s, "malformed term"))? {
                match var {
                    Some(j) if j < d => {
                        let x = linear.get(j, i) + &coef;
                        linear.set(j, i, x);
                    }
                    Some(_) => return Err(bad_op(s, "coordinate out of range")),
                    None => shift[i] += coef,
                }
            }
        }
        Ok(Operator::from_parts(&linear, &shift))
    }
}

fn bad_op(s: &str, why: &str) -> SystreError {
    SystreError::parse(0, format!("bad operator '{s}': {why}"))
}

/// Splits one coordinate expression into `(coefficient, variable)` terms.
fn parse_terms(part: &str) -> Option<Vec<(Rat, Option<usize>)>> {
    let chars: Vec<char> = part.chars().filter(|c| !c.is_whitespace()).collect();
    if chars.is_empty() {
        return None;
    }
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let mut negative = false;
        if chars[i] == '+' || chars[i] == '-' {
            negative = chars[i] == '-';
            i += 1;
        }
        let start = i;
        while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '/' || chars[i] == '.') {
            i += 1;
        }
        let number: String = chars[start..i].iter().collect();
        if i < chars.len() && chars[i] == '*' {
            i += 1;
        }
        let var = match chars.get(i).map(|c| c.to_ascii_lowercase()) {
            Some(c) if AXES.contains(&c) => {
                i += 1;
                AXES.iter().position(|&a| a == c)
            }
            _ => None,
        };
        if number.is_empty() && var.is_none() {
            return None;
        }
        let mut coef = if number.is_empty() {
            Rat::one()
        } else {
            parse_rational(&number)?
        };
        if negative {
            coef = -coef;
        }
        out.push((coef, var));
    }
    Some(out)
}

/// `3`, `1/2` or a terminating decimal like `0.25`.
pub(crate) fn parse_rational(s: &str) -> Option<Rat> {
    let (neg, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let value = if let Some((n, d)) = body.split_once('/') {
        let n: i64 = n.parse().ok()?;
        let d: i64 = d.parse().ok()?;
        if d == 0 {
            return None;
        }
        Rat::new(n.into(), d.into())
    } else if let Some((int, fr)) = body.split_once('.') {
        if fr.len() > 15 || !fr.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let int: i64 = if int.is_empty() { 0 } else { int.parse().ok()? };
        let den = 10i64.pow(fr.len() as u32);
        let num: i64 = if fr.is_empty() { 0 } else { fr.parse().ok()? };
        rat(int) + Rat::new(num.into(), den.into())
    } else {
        rat(body.parse().ok()?)
    };
    Some(if neg { -value } else { value })
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.dimension();
        let mut parts = Vec::with_capacity(d);
        for i in 0..d {
            let mut s = String::new();
            for (j, axis) in AXES.iter().enumerate().take(d) {
                let c = self.m.get(j, i);
                if c.is_zero() {
                    continue;
                }
                if c.is_negative() {
                    s.push('-');
                } else if !s.is_empty() {
                    s.push('+');
                }
                let a = c.abs();
                if !a.is_one() {
                    s.push_str(&a.to_string());
                    s.push('*');
                }
                s.push(*axis);
            }
            let t = self.m.get(d, i);
            if !t.is_zero() {
                if t.is_positive() && !s.is_empty() {
                    s.push('+');
                }
                s.push_str(&t.to_string());
            }
            if s.is_empty() {
                s.push('0');
            }
            parts.push(s);
        }
        f.write_str(&parts.join(","))
    }
}
