//! Coefficients: a scalar or an interval.

use crate::num::interval::Interval;
use crate::num::scalar::Scalar;
use crate::num::{Round, ScalarKind};
use std::cmp::Ordering;
use std::fmt;

/// A weight in a linear expression, or a constant of a tree expression.
///
/// Scalars compare by value and intervals by inclusion. Comparing a scalar coefficient with an
/// interval coefficient is a programming error and panics.
///
/// # Examples
/// ```
/// # use numdom::num::{Coeff, Interval, Scalar};
/// assert!(Coeff::from(Scalar::double(-1.0)) < Coeff::from(Scalar::double(0.5)));
/// assert!(Coeff::from(Interval::of_doubles(0.0, 0.0)) < Coeff::from(Interval::of_doubles(-0.5, 0.5)));
/// ```
#[derive(Debug, Clone)]
pub enum Coeff {
    /// An exact weight.
    Scalar(Scalar),
    /// A range of weights.
    Interval(Interval),
}

impl Coeff {
    /// Zero of the given kind.
    pub fn zero(kind: ScalarKind) -> Coeff {
        Coeff::Scalar(Scalar::zero(kind))
    }

    /// A double scalar coefficient.
    pub fn double(x: f64) -> Coeff {
        Coeff::Scalar(Scalar::double(x))
    }

    /// A rational scalar coefficient `num / den`.
    pub fn mpq(num: i64, den: i64) -> Coeff {
        Coeff::Scalar(Scalar::mpq(num, den))
    }

    /// The kind of the underlying scalars.
    pub fn kind(&self) -> ScalarKind {
        match self {
            Coeff::Scalar(s) => s.kind(),
            Coeff::Interval(i) => i.kind(),
        }
    }

    /// Whether this coefficient is a scalar.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Coeff::Scalar(_))
    }

    /// Whether this coefficient is zero, as a scalar or as the interval `[0,0]`.
    pub fn is_zero(&self) -> bool {
        match self {
            Coeff::Scalar(s) => s.is_zero(),
            Coeff::Interval(i) => i.is_zero(),
        }
    }

    /// The scalar value, if this is a scalar.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Coeff::Scalar(s) => Some(s),
            Coeff::Interval(_) => None,
        }
    }

    /// The coefficient as an interval; a scalar becomes a singleton.
    pub fn to_interval(&self) -> Interval {
        match self {
            Coeff::Scalar(s) => Interval::point(s.clone()),
            Coeff::Interval(i) => i.clone(),
        }
    }

    /// The coefficient as an interval of the given kind, rounded outward.
    pub fn to_interval_of(&self, kind: ScalarKind) -> Interval {
        match self {
            Coeff::Scalar(s) if s.kind() != kind => Interval::new(
                s.convert(kind, Round::Down),
                s.convert(kind, Round::Up),
            ),
            c => c.to_interval().convert(kind),
        }
    }

    /// Replace a singleton interval by its scalar.
    pub fn reduce(self) -> Coeff {
        match self {
            Coeff::Interval(i) if i.is_point() => Coeff::Scalar(i.inf().clone()),
            c => c,
        }
    }

    /// Negation.
    pub fn neg(&self) -> Coeff {
        match self {
            Coeff::Scalar(s) => Coeff::Scalar(s.neg()),
            Coeff::Interval(i) => Coeff::Interval(i.neg()),
        }
    }

    fn mismatch(&self) -> ! {
        panic!("Mismatched coefficient kinds: scalar compared with interval")
    }
}

impl PartialEq for Coeff {
    /// # Panics
    /// Panics when comparing a scalar with an interval.
    fn eq(&self, other: &Coeff) -> bool {
        match (self, other) {
            (Coeff::Scalar(a), Coeff::Scalar(b)) => a == b,
            (Coeff::Interval(a), Coeff::Interval(b)) => a == b,
            _ => self.mismatch(),
        }
    }
}

impl PartialOrd for Coeff {
    /// # Panics
    /// Panics when comparing a scalar with an interval.
    fn partial_cmp(&self, other: &Coeff) -> Option<Ordering> {
        match (self, other) {
            (Coeff::Scalar(a), Coeff::Scalar(b)) => a.partial_cmp(b),
            (Coeff::Interval(a), Coeff::Interval(b)) => a.partial_cmp(b),
            _ => self.mismatch(),
        }
    }
}

impl From<Scalar> for Coeff {
    fn from(s: Scalar) -> Coeff {
        Coeff::Scalar(s)
    }
}

impl From<Interval> for Coeff {
    fn from(i: Interval) -> Coeff {
        Coeff::Interval(i)
    }
}

impl From<f64> for Coeff {
    fn from(x: f64) -> Coeff {
        Coeff::double(x)
    }
}

impl fmt::Display for Coeff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coeff::Scalar(s) => write!(f, "{}", s),
            Coeff::Interval(i) => write!(f, "{}", i),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn scalar_order() {
        let a = Coeff::double(-1.0);
        let b = Coeff::double(0.5);
        assert!(a < b);
        assert!(b > a);
        assert!(a == Coeff::double(-1.0));
    }

    #[test]
    fn interval_order() {
        let a = Coeff::from(Interval::of_doubles(0.0, 0.0));
        let b = Coeff::from(Interval::of_doubles(-0.5, 0.5));
        assert!(a < b);
        assert!(b >= a);
    }

    #[test]
    fn negation_and_reduce() {
        assert_eq!(Coeff::double(3.0).neg(), Coeff::double(-3.0));
        let i = Coeff::from(Interval::of_doubles(-1.0, 2.0));
        assert_eq!(i.neg().to_string(), "[-2.0,1.0]");
        let p = Coeff::from(Interval::of_doubles(2.0, 2.0)).reduce();
        assert!(p.is_scalar());
        assert!(Coeff::zero(ScalarKind::Mpq).is_zero());
    }

    #[test]
    #[should_panic(expected = "Mismatched coefficient kinds")]
    fn mixed_comparison_panics() {
        let _ = Coeff::double(0.0) == Coeff::from(Interval::of_doubles(0.0, 0.0));
    }
}
