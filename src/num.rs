//! The numeric tower: scalars, intervals and coefficients.
//!
//! Three number representations are supported, all behind the [`Scalar`] enum:
//!
//! * IEEE doubles, with directed rounding computed from exact error terms,
//! * exact rationals extended with signed infinities ([`Mpq`]),
//! * arbitrary precision binary floats with explicit rounding ([`Mpfr`]).
//!
//! [`Interval`] pairs two scalars of the same kind and [`Coeff`] is either one of them.
//!
//! [`Scalar`]: ./scalar/enum.Scalar.html
//! [`Mpq`]: ./mpq/enum.Mpq.html
//! [`Mpfr`]: ./mpfr/struct.Mpfr.html
//! [`Interval`]: ./interval/struct.Interval.html
//! [`Coeff`]: ./coeff/enum.Coeff.html

pub mod coeff;
pub mod interval;
pub mod mpfr;
pub mod mpq;
pub mod scalar;

pub use crate::num::coeff::Coeff;
pub use crate::num::interval::Interval;
pub use crate::num::mpfr::Mpfr;
pub use crate::num::mpq::Mpq;
pub use crate::num::scalar::Scalar;

use std::fmt;

/// Rounding direction for operations that may lose precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Round {
    /// Round to nearest, ties to even.
    Nearest,
    /// Round toward zero.
    Zero,
    /// Round toward positive infinity.
    Up,
    /// Round toward negative infinity.
    Down,
    /// Round away from zero.
    Away,
}

impl Round {
    /// The direction obtained by negating the operands, so that `-(a op_r b) = (-a) op_(-r) (-b)`.
    pub fn flip(self) -> Round {
        match self {
            Round::Up => Round::Down,
            Round::Down => Round::Up,
            r => r,
        }
    }
}

/// The representation used by a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// IEEE 754 double.
    Double,
    /// Exact rational.
    Mpq,
    /// Binary float with the given precision in bits.
    Mpfr(u32),
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::Double => f.write_str("double"),
            ScalarKind::Mpq => f.write_str("mpq"),
            ScalarKind::Mpfr(p) => write!(f, "mpfr{}", p),
        }
    }
}
