//! Dense polynomial arithmetic over GF(2^61 - 1).

#![forbid(unsafe_code)]

pub mod roots;

pub use roots::{extract_roots, FactorError};

use lode_field::Fp;
use thiserror::Error;

#[cfg(feature = "quickcheck")]
use quickcheck::{Arbitrary, Gen};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PolyError {
    #[error("interpolation needs matching point and evaluation counts: {points} vs {evals}")]
    LengthMismatch { points: usize, evals: usize },
    #[error("interpolation points must be pairwise distinct")]
    RepeatedPoint,
}

/// Polynomial with coefficients stored low degree first.
///
/// The representation is canonical: trailing zero coefficients are trimmed,
/// but never below length one, so the zero polynomial is exactly `[0]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Polynomial {
    coeffs: Vec<Fp>,
}

impl Polynomial {
    /// Create a polynomial from the given coefficients (low degree first).
    pub fn new(mut coeffs: Vec<Fp>) -> Self {
        while coeffs.len() > 1 && coeffs.last() == Some(&Fp::ZERO) {
            coeffs.pop();
        }
        if coeffs.is_empty() {
            coeffs.push(Fp::ZERO);
        }
        Self { coeffs }
    }

    pub fn zero() -> Self {
        Self {
            coeffs: vec![Fp::ZERO],
        }
    }

    pub fn one() -> Self {
        Self {
            coeffs: vec![Fp::ONE],
        }
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.len() == 1 && self.coeffs[0] == Fp::ZERO
    }

    /// Degree of the polynomial (0 for the constant zero).
    pub fn degree(&self) -> usize {
        self.coeffs.len() - 1
    }

    pub fn coeffs(&self) -> &[Fp] {
        &self.coeffs
    }

    pub fn leading_coeff(&self) -> Fp {
        *self.coeffs.last().expect("canonical form is never empty")
    }

    /// Coefficients zero-padded on the high end to exactly `len` entries.
    ///
    /// Callers that feed fixed-shape pipelines rely on this length contract.
    pub fn coeffs_padded(&self, len: usize) -> Vec<Fp> {
        assert!(
            len >= self.coeffs.len(),
            "padded length {len} shorter than {} stored coefficients",
            self.coeffs.len()
        );
        let mut out = self.coeffs.clone();
        out.resize(len, Fp::ZERO);
        out
    }

    /// Evaluate the polynomial at `x`.
    pub fn eval(&self, x: Fp) -> Fp {
        let mut acc = Fp::ZERO;
        for coeff in self.coeffs.iter().rev() {
            acc = acc * x + *coeff;
        }
        acc
    }

    /// Multiply every coefficient by `k`.
    pub fn scaled(&self, k: Fp) -> Self {
        Self::new(self.coeffs.iter().map(|&c| c * k).collect())
    }

    /// Polynomial division: returns (quotient, remainder) with
    /// self = divisor * quotient + remainder and deg(remainder) < deg(divisor).
    pub fn div_rem(&self, divisor: &Self) -> (Self, Self) {
        if divisor.is_zero() {
            panic!("division by zero polynomial");
        }
        let lead_inv = divisor
            .leading_coeff()
            .inverse()
            .expect("nonzero polynomial has a nonzero leading coefficient");
        if self.degree() < divisor.degree() {
            return (Self::zero(), self.clone());
        }
        let mut quotient = vec![Fp::ZERO; self.degree() - divisor.degree() + 1];
        let mut remainder = self.coeffs.clone();
        while remainder.len() >= divisor.coeffs.len() {
            let lead_r = *remainder.last().expect("remainder is non-empty in loop");
            let factor = lead_r * lead_inv;
            let q_deg = remainder.len() - divisor.coeffs.len();
            quotient[q_deg] = factor;
            for (j, &d) in divisor.coeffs.iter().enumerate() {
                let idx = q_deg + j;
                remainder[idx] -= factor * d;
            }
            while remainder.last() == Some(&Fp::ZERO) {
                remainder.pop();
            }
        }
        (Self::new(quotient), Self::new(remainder))
    }

    /// Interpolate the unique polynomial of degree <= n-1 through the given
    /// points using the naive Lagrange basis.
    pub fn interpolate(points: &[Fp], evals: &[Fp]) -> Result<Self, PolyError> {
        if points.len() != evals.len() {
            return Err(PolyError::LengthMismatch {
                points: points.len(),
                evals: evals.len(),
            });
        }
        let n = points.len();
        let mut poly = Self::zero();
        for i in 0..n {
            let mut num = Self::one();
            let mut den = Fp::ONE;
            for j in 0..n {
                if i == j {
                    continue;
                }
                num = num * Self::new(vec![-points[j], Fp::ONE]);
                den = den * (points[i] - points[j]);
            }
            let scale = evals[i] * den.inverse().map_err(|_| PolyError::RepeatedPoint)?;
            poly = poly + num.scaled(scale);
        }
        Ok(poly)
    }
}

impl std::ops::Add for Polynomial {
    type Output = Self;
    fn add(mut self, rhs: Self) -> Self {
        let len = self.coeffs.len().max(rhs.coeffs.len());
        self.coeffs.resize(len, Fp::ZERO);
        for (i, &b) in rhs.coeffs.iter().enumerate() {
            self.coeffs[i] += b;
        }
        Self::new(self.coeffs)
    }
}

impl std::ops::Sub for Polynomial {
    type Output = Self;
    fn sub(mut self, rhs: Self) -> Self {
        let len = self.coeffs.len().max(rhs.coeffs.len());
        self.coeffs.resize(len, Fp::ZERO);
        for (i, &b) in rhs.coeffs.iter().enumerate() {
            self.coeffs[i] -= b;
        }
        Self::new(self.coeffs)
    }
}

impl std::ops::Mul for Polynomial {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        if self.is_zero() || rhs.is_zero() {
            return Self::zero();
        }
        let mut out = vec![Fp::ZERO; self.coeffs.len() + rhs.coeffs.len() - 1];
        for (i, &a) in self.coeffs.iter().enumerate() {
            if a == Fp::ZERO {
                continue;
            }
            for (j, &b) in rhs.coeffs.iter().enumerate() {
                out[i + j] += a * b;
            }
        }
        Self::new(out)
    }
}

#[cfg(feature = "quickcheck")]
impl Arbitrary for Polynomial {
    fn arbitrary(g: &mut Gen) -> Self {
        let coeffs: Vec<Fp> = Arbitrary::arbitrary(g);
        Polynomial::new(coeffs)
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        Box::new(std::iter::empty())
    }
}
