//! Complete factorization of polynomials that split into linear factors.
//!
//! The recovery pipeline interpolates a product of linear terms, so the
//! factorizer only has to find roots: take the distinct-root part with
//! `gcd(X^p - X, f)`, split it by equal-degree splitting, then count
//! multiplicities by exact deflation. Anything left over that is not a
//! constant means the input violated the linear-factors-only assumption.

use lode_field::Fp;
use rand::Rng;
use thiserror::Error;

use crate::Polynomial;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FactorError {
    #[error("cannot extract roots of the zero polynomial")]
    ZeroPolynomial,
    #[error("non-linear cofactor of degree {degree} where only linear factors were expected")]
    UnexpectedFactorDegree { degree: usize },
    #[error("expected {expected} roots counted with multiplicity, found {found}")]
    RootCountMismatch { expected: usize, found: usize },
}

/// Extract all roots of the polynomial given by `coeffs` (low degree first),
/// repeated according to multiplicity.
///
/// The input must split completely into linear factors over the field and
/// carry exactly `expected` roots; both violations are structural errors,
/// not noise, and are never worth retrying.
pub fn extract_roots(
    coeffs: &[Fp],
    expected: usize,
    rng: &mut impl Rng,
) -> Result<Vec<Fp>, FactorError> {
    let f = Polynomial::new(coeffs.to_vec());
    if f.is_zero() {
        return Err(FactorError::ZeroPolynomial);
    }
    let lead_inv = match f.leading_coeff().inverse() {
        Ok(inv) => inv,
        Err(_) => return Err(FactorError::ZeroPolynomial),
    };
    let mut remaining = f.scaled(lead_inv);

    let mut roots = Vec::with_capacity(expected);
    for root in distinct_roots(&remaining, rng) {
        let factor = Polynomial::new(vec![-root, Fp::ONE]);
        loop {
            let (quotient, rem) = remaining.div_rem(&factor);
            if !rem.is_zero() {
                break;
            }
            remaining = quotient;
            roots.push(root);
        }
    }

    if remaining.degree() > 0 {
        return Err(FactorError::UnexpectedFactorDegree {
            degree: remaining.degree(),
        });
    }
    if roots.len() != expected {
        return Err(FactorError::RootCountMismatch {
            expected,
            found: roots.len(),
        });
    }
    Ok(roots)
}

/// Distinct roots of a monic `f`, in no particular order.
fn distinct_roots(f: &Polynomial, rng: &mut impl Rng) -> Vec<Fp> {
    // X^p - X vanishes on every field element, so gcd(X^p - X, f) is the
    // product of the distinct linear factors of f.
    let x = Polynomial::new(vec![Fp::ZERO, Fp::ONE]);
    let xp = pow_mod(&x, Fp::P, f);
    let linear_part = gcd(&(xp - x), f);

    let mut out = Vec::new();
    split_linear(linear_part, rng, &mut out);
    out
}

/// Split a monic product of distinct linear factors into its roots by
/// equal-degree splitting: gcd with `(X + c)^((p-1)/2) - 1` separates the
/// roots r with `r + c` a quadratic residue from the rest.
fn split_linear(part: Polynomial, rng: &mut impl Rng, out: &mut Vec<Fp>) {
    match part.degree() {
        0 => {}
        1 => {
            if let Some(root) = linear_root(&part) {
                out.push(root);
            }
        }
        _ => loop {
            let shift = Fp::random(rng);
            let base = Polynomial::new(vec![shift, Fp::ONE]);
            let w = pow_mod(&base, (Fp::P - 1) / 2, &part);
            let half = gcd(&(w - Polynomial::one()), &part);
            if half.degree() > 0 && half.degree() < part.degree() {
                let rest = part.div_rem(&half).0;
                split_linear(half, rng, out);
                split_linear(rest, rng, out);
                return;
            }
        },
    }
}

/// Root of a linear factor `a1*X + a0`, i.e. `-a0 * a1^-1`.
fn linear_root(factor: &Polynomial) -> Option<Fp> {
    let a0 = factor.coeffs()[0];
    let a1 = factor.coeffs()[1];
    a1.inverse().ok().map(|inv| -a0 * inv)
}

/// `base^exp mod modulus` by square and multiply.
fn pow_mod(base: &Polynomial, mut exp: u64, modulus: &Polynomial) -> Polynomial {
    let mut result = Polynomial::one().div_rem(modulus).1;
    let mut base = base.div_rem(modulus).1;
    while exp > 0 {
        if exp & 1 == 1 {
            result = (result * base.clone()).div_rem(modulus).1;
        }
        base = (base.clone() * base).div_rem(modulus).1;
        exp >>= 1;
    }
    result
}

/// Monic greatest common divisor.
fn gcd(a: &Polynomial, b: &Polynomial) -> Polynomial {
    let mut a = a.clone();
    let mut b = b.clone();
    while !b.is_zero() {
        let rem = a.div_rem(&b).1;
        a = b;
        b = rem;
    }
    match a.leading_coeff().inverse() {
        Ok(inv) => a.scaled(inv),
        Err(_) => a,
    }
}
