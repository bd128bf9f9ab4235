//! Exact rationals extended with signed infinities.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use std::fmt;

/// An exact rational number, or one of the two infinities.
///
/// The derived order places `NegInf` below every finite value and `PosInf` above. Infinities are
/// printed as `1/0` and `-1/0`.
///
/// # Examples
/// ```
/// # use numdom::num::Mpq;
/// assert_eq!(Mpq::new(2, 4).to_string(), "1/2");
/// assert_eq!(Mpq::new(-9, 1).to_string(), "-9");
/// assert_eq!(Mpq::new(3, 0), Mpq::PosInf);
/// assert!(Mpq::NegInf < Mpq::new(-100, 1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mpq {
    /// Negative infinity.
    NegInf,
    /// A finite rational.
    Finite(BigRational),
    /// Positive infinity.
    PosInf,
}

impl Mpq {
    /// Build `num / den`. A zero denominator gives the infinity with the sign of `num`.
    ///
    /// # Panics
    /// Panics on `0 / 0`.
    pub fn new(num: i64, den: i64) -> Mpq {
        Mpq::from_parts(BigInt::from(num), BigInt::from(den))
    }

    /// Build `num / den` from big integers. A zero denominator gives a signed infinity.
    ///
    /// # Panics
    /// Panics on `0 / 0`.
    pub fn from_parts(num: BigInt, den: BigInt) -> Mpq {
        if den.is_zero() {
            if num.is_positive() {
                Mpq::PosInf
            } else if num.is_negative() {
                Mpq::NegInf
            } else {
                panic!("Undefined rational 0/0 in Mpq::from_parts");
            }
        } else {
            Mpq::Finite(BigRational::new(num, den))
        }
    }

    /// Zero.
    pub fn zero() -> Mpq {
        Mpq::Finite(BigRational::zero())
    }

    /// One.
    pub fn one() -> Mpq {
        Mpq::Finite(BigRational::one())
    }

    /// The infinity with the sign of `sign`, or zero if `sign == 0`.
    pub fn infty(sign: i32) -> Mpq {
        match sign {
            s if s > 0 => Mpq::PosInf,
            s if s < 0 => Mpq::NegInf,
            _ => Mpq::zero(),
        }
    }

    /// The exact value of a double. Infinite doubles map to infinities.
    ///
    /// # Panics
    /// Panics if `x` is NaN.
    pub fn from_f64(x: f64) -> Mpq {
        if x.is_nan() {
            panic!("NaN has no rational value in Mpq::from_f64");
        }
        if x == f64::INFINITY {
            Mpq::PosInf
        } else if x == f64::NEG_INFINITY {
            Mpq::NegInf
        } else {
            match BigRational::from_float(x) {
                Some(r) => Mpq::Finite(r),
                None => Mpq::zero(),
            }
        }
    }

    /// The finite value, if any.
    pub fn finite(&self) -> Option<&BigRational> {
        match self {
            Mpq::Finite(r) => Some(r),
            _ => None,
        }
    }

    /// Whether this value is finite.
    pub fn is_finite(&self) -> bool {
        matches!(self, Mpq::Finite(_))
    }

    /// `-1` for negative infinity, `1` for positive infinity, `0` otherwise.
    pub fn infty_sign(&self) -> i32 {
        match self {
            Mpq::NegInf => -1,
            Mpq::Finite(_) => 0,
            Mpq::PosInf => 1,
        }
    }

    /// The sign as `-1`, `0` or `1`.
    pub fn sign(&self) -> i32 {
        match self {
            Mpq::NegInf => -1,
            Mpq::PosInf => 1,
            Mpq::Finite(r) => {
                if r.is_positive() {
                    1
                } else if r.is_negative() {
                    -1
                } else {
                    0
                }
            }
        }
    }

    /// Whether this value is zero.
    pub fn is_zero(&self) -> bool {
        self.sign() == 0
    }

    /// Whether this is a finite integer.
    pub fn is_integer(&self) -> bool {
        match self {
            Mpq::Finite(r) => r.is_integer(),
            _ => false,
        }
    }

    /// Negation.
    pub fn neg(&self) -> Mpq {
        match self {
            Mpq::NegInf => Mpq::PosInf,
            Mpq::PosInf => Mpq::NegInf,
            Mpq::Finite(r) => Mpq::Finite(-r),
        }
    }

    /// Absolute value.
    pub fn abs(&self) -> Mpq {
        match self {
            Mpq::Finite(r) => Mpq::Finite(r.abs()),
            _ => Mpq::PosInf,
        }
    }

    /// Sum. Returns `None` for the sum of opposite infinities.
    pub fn add(&self, other: &Mpq) -> Option<Mpq> {
        match (self, other) {
            (Mpq::Finite(a), Mpq::Finite(b)) => Some(Mpq::Finite(a + b)),
            (Mpq::PosInf, Mpq::NegInf) | (Mpq::NegInf, Mpq::PosInf) => None,
            (Mpq::Finite(_), inf) | (inf, _) => Some(inf.clone()),
        }
    }

    /// Difference. Returns `None` for the difference of equal infinities.
    pub fn sub(&self, other: &Mpq) -> Option<Mpq> {
        self.add(&other.neg())
    }

    /// Product. Zero times an infinity is zero, the convention used for interval bounds.
    pub fn mul(&self, other: &Mpq) -> Mpq {
        match (self, other) {
            (Mpq::Finite(a), Mpq::Finite(b)) => Mpq::Finite(a * b),
            _ => Mpq::infty(self.sign() * other.sign()),
        }
    }

    /// Quotient. A nonzero value divided by zero is an infinity; `0 / 0` and infinity divided by
    /// infinity return `None`.
    pub fn div(&self, other: &Mpq) -> Option<Mpq> {
        match (self, other) {
            (Mpq::Finite(a), Mpq::Finite(b)) => {
                if b.is_zero() {
                    if a.is_zero() {
                        None
                    } else {
                        Some(Mpq::infty(self.sign()))
                    }
                } else {
                    Some(Mpq::Finite(a / b))
                }
            }
            (Mpq::Finite(_), _) => Some(Mpq::zero()),
            (_, Mpq::Finite(b)) => {
                if b.is_negative() {
                    Some(self.neg())
                } else {
                    Some(self.clone())
                }
            }
            _ => None,
        }
    }

    /// Largest integer not above this value. Infinities are unchanged.
    pub fn floor(&self) -> Mpq {
        match self {
            Mpq::Finite(r) => Mpq::Finite(r.floor()),
            inf => inf.clone(),
        }
    }

    /// Smallest integer not below this value. Infinities are unchanged.
    pub fn ceil(&self) -> Mpq {
        match self {
            Mpq::Finite(r) => Mpq::Finite(r.ceil()),
            inf => inf.clone(),
        }
    }

    /// Nearest double, for display and heuristics only.
    pub fn to_f64_approx(&self) -> f64 {
        match self {
            Mpq::NegInf => f64::NEG_INFINITY,
            Mpq::PosInf => f64::INFINITY,
            Mpq::Finite(r) => r.to_f64().unwrap_or(0.0),
        }
    }
}

impl From<i64> for Mpq {
    fn from(x: i64) -> Mpq {
        Mpq::Finite(BigRational::from_integer(BigInt::from(x)))
    }
}

impl From<BigRational> for Mpq {
    fn from(r: BigRational) -> Mpq {
        Mpq::Finite(r)
    }
}

impl From<BigInt> for Mpq {
    fn from(n: BigInt) -> Mpq {
        Mpq::Finite(BigRational::from_integer(n))
    }
}

impl fmt::Display for Mpq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mpq::NegInf => f.write_str("-1/0"),
            Mpq::PosInf => f.write_str("1/0"),
            Mpq::Finite(r) => write!(f, "{}", r),
        }
    }
}
