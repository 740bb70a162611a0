//! Arithmetic in GF(p) for the Mersenne prime p = 2^61 - 1.

#![forbid(unsafe_code)]

use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[cfg(feature = "quickcheck")]
use quickcheck::{Arbitrary, Gen};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("division by zero in GF(2^61 - 1)")]
    DivisionByZero,
}

/// Residue modulo the Mersenne prime 2^61 - 1.
///
/// Invariant: `val` is always reduced into `[0, P)`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Fp {
    val: u64,
}

impl Fp {
    /// Field modulus.
    pub const P: u64 = (1u64 << 61) - 1;

    pub const ZERO: Self = Self { val: 0 };
    pub const ONE: Self = Self { val: 1 };

    pub fn from_u64(val: u64) -> Self {
        Self { val: val % Self::P }
    }

    pub fn as_u64(&self) -> u64 {
        self.val
    }

    /// Raise to the power `exp` by square and multiply.
    pub fn pow(self, mut exp: u64) -> Self {
        let mut result = Self::ONE;
        let mut base = self;
        while exp > 0 {
            if exp & 1 == 1 {
                result *= base;
            }
            base = base * base;
            exp >>= 1;
        }
        result
    }

    /// Multiplicative inverse via Fermat: `x^(P-2)`.
    ///
    /// Zero has no inverse; callers are expected to discard degenerate
    /// samples rather than treat this as fatal.
    pub fn inverse(self) -> Result<Self, FieldError> {
        if self.val == 0 {
            return Err(FieldError::DivisionByZero);
        }
        Ok(self.pow(Self::P - 2))
    }

    /// Sample a field element uniformly from the given RNG.
    pub fn random(rng: &mut impl Rng) -> Self {
        Self::from_u64(rng.random::<u64>() % Self::P)
    }
}

impl Add for Fp {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        let mut sum = self.val + rhs.val;
        if sum >= Self::P {
            sum -= Self::P;
        }
        Self { val: sum }
    }
}

impl Sub for Fp {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        let mut diff = self.val.wrapping_sub(rhs.val);
        if diff > Self::P {
            diff = diff.wrapping_add(Self::P);
        }
        Self { val: diff }
    }
}

impl Mul for Fp {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        let prod = (self.val as u128 * rhs.val as u128) % (Self::P as u128);
        Self { val: prod as u64 }
    }
}

impl Neg for Fp {
    type Output = Self;
    fn neg(self) -> Self {
        if self.val == 0 {
            self
        } else {
            Self {
                val: Self::P - self.val,
            }
        }
    }
}

impl AddAssign for Fp {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Fp {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign for Fp {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl From<u64> for Fp {
    fn from(val: u64) -> Self {
        Self::from_u64(val)
    }
}

impl From<i128> for Fp {
    fn from(val: i128) -> Self {
        let p = Self::P as i128;
        let mut v = val % p;
        if v < 0 {
            v += p;
        }
        Self::from_u64(v as u64)
    }
}

impl From<Fp> for u64 {
    fn from(val: Fp) -> u64 {
        val.val
    }
}

impl fmt::Display for Fp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.val)
    }
}

// Wire integers are "interpretable mod p": deserialization reduces, so the
// struct invariant holds no matter what the transport carried.
impl Serialize for Fp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.val)
    }
}

impl<'de> Deserialize<'de> for Fp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u64::deserialize(deserializer).map(Fp::from_u64)
    }
}

#[cfg(feature = "quickcheck")]
impl Arbitrary for Fp {
    fn arbitrary(g: &mut Gen) -> Self {
        Fp::from_u64(u64::arbitrary(g) % Self::P)
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        Box::new(std::iter::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::{rand_core::SeedableRng, ChaCha20Rng};

    #[test]
    fn reduction_on_construction() {
        assert_eq!(Fp::from_u64(Fp::P).as_u64(), 0);
        assert_eq!(Fp::from_u64(Fp::P + 5).as_u64(), 5);
        assert_eq!(Fp::from_u64(u64::MAX).as_u64(), u64::MAX % Fp::P);
    }

    #[test]
    fn addition_wraps() {
        let max = Fp::from_u64(Fp::P - 1);
        assert_eq!(max + Fp::ONE, Fp::ZERO);
        assert_eq!(Fp::from_u64(100) + Fp::from_u64(200), Fp::from_u64(300));
    }

    #[test]
    fn subtraction_wraps() {
        assert_eq!(Fp::from_u64(300) - Fp::from_u64(100), Fp::from_u64(200));
        assert_eq!(Fp::ZERO - Fp::ONE, Fp::from_u64(Fp::P - 1));
    }

    #[test]
    fn additive_inverse() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        for _ in 0..50 {
            let x = Fp::random(&mut rng);
            assert_eq!(x + (Fp::ZERO - x), Fp::ZERO);
            assert_eq!(x + (-x), Fp::ZERO);
        }
    }

    #[test]
    fn multiplicative_inverse() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        for _ in 0..50 {
            let x = Fp::random(&mut rng);
            if x == Fp::ZERO {
                continue;
            }
            assert_eq!(x * x.inverse().unwrap(), Fp::ONE);
        }
    }

    #[test]
    fn inverse_of_zero_is_an_error() {
        assert_eq!(Fp::ZERO.inverse(), Err(FieldError::DivisionByZero));
    }

    #[test]
    fn fermat_little_theorem() {
        let x = Fp::from_u64(123_456_789);
        assert_eq!(x.pow(Fp::P - 1), Fp::ONE);
        assert_eq!(Fp::from_u64(2).pow(10), Fp::from_u64(1024));
    }

    #[test]
    fn negative_i128_reduces() {
        assert_eq!(Fp::from(-1i128), Fp::from_u64(Fp::P - 1));
        assert_eq!(Fp::from(-(Fp::P as i128)), Fp::ZERO);
    }

    #[test]
    fn random_stays_reduced() {
        let mut rng = rand::rng();
        for _ in 0..100 {
            assert!(Fp::random(&mut rng).as_u64() < Fp::P);
        }
    }

    #[test]
    fn serde_reduces_wire_values() {
        let x: Fp = serde_json::from_str("5").unwrap();
        assert_eq!(x, Fp::from_u64(5));
        // 2^61 - 1 + 7 on the wire comes back reduced.
        let big: Fp = serde_json::from_str("2305843009213693958").unwrap();
        assert_eq!(big, Fp::from_u64(7));
        assert_eq!(serde_json::to_string(&Fp::from_u64(42)).unwrap(), "42");
    }

    #[cfg(feature = "quickcheck")]
    mod props {
        use super::*;
        use quickcheck_macros::quickcheck;

        #[quickcheck]
        fn mul_by_inverse_is_one(x: Fp) -> bool {
            x == Fp::ZERO || x * x.inverse().unwrap() == Fp::ONE
        }

        #[quickcheck]
        fn add_sub_round_trip(x: Fp, y: Fp) -> bool {
            x + y - y == x
        }

        #[quickcheck]
        fn mul_distributes(x: Fp, y: Fp, z: Fp) -> bool {
            x * (y + z) == x * y + x * z
        }
    }
}
