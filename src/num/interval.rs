//! Intervals of scalars.
//!
//! An [`Interval`] is a pair of bounds of the same kind. Any interval whose lower bound exceeds
//! its upper bound is empty; [`Interval::bottom`] builds the canonical empty interval `[1,-1]`.
//! All arithmetic is outward rounded: lower bounds are rounded down and upper bounds up, so the
//! result always encloses every value the operation can produce on members of its operands.
//!
//! [`Interval`]: ./struct.Interval.html
//! [`Interval::bottom`]: ./struct.Interval.html#method.bottom

use crate::expr::texpr::{RDir, RType};
use crate::num::mpfr::Mpfr;
use crate::num::mpq::Mpq;
use crate::num::scalar::Scalar;
use crate::num::{Round, ScalarKind};
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{ToPrimitive, Zero};
use std::cmp::Ordering;
use std::fmt;

/// Exponents above this only keep the bounds monotonicity gives for free.
const POW_LIMIT: u64 = 256;

/// `|s|^n` for `n >= 1`, rounded up when `up` and down otherwise.
fn magnitude_pow(s: &Scalar, n: &BigInt, up: bool) -> Scalar {
    let kind = s.kind();
    let m = s.abs();
    let one = Scalar::from_i64(kind, 1, Round::Nearest);
    let mut k = match n.to_u64() {
        Some(k) if k <= POW_LIMIT => k,
        _ => {
            // m^n <= m when m <= 1, and m^n >= m when m >= 1.
            return match (up, m <= one) {
                (true, true) | (false, false) => m,
                (true, false) => Scalar::infty(kind, 1),
                (false, true) => Scalar::zero(kind),
            };
        }
    };
    let rnd = if up { Round::Up } else { Round::Down };
    let mut base = m;
    let mut acc = one;
    while k > 0 {
        if k & 1 == 1 {
            acc = acc.mul(&base, rnd);
        }
        k >>= 1;
        if k > 0 {
            base = base.mul(&base, rnd);
        }
    }
    acc
}

/// A closed interval `[inf, sup]`.
///
/// # Examples
/// ```
/// # use numdom::num::Interval;
/// let a = Interval::of_doubles(-1.0, 2.0);
/// assert_eq!(a.neg().to_string(), "[-2.0,1.0]");
/// assert!(Interval::of_doubles(-3.0, -1.0) <= Interval::of_doubles(f64::NEG_INFINITY, -1.0));
/// ```
#[derive(Debug, Clone)]
pub struct Interval {
    inf: Scalar,
    sup: Scalar,
}

impl Interval {
    /// Build `[inf, sup]`.
    ///
    /// # Panics
    /// Panics if the bounds are of different kinds.
    pub fn new(inf: Scalar, sup: Scalar) -> Interval {
        if inf.kind() != sup.kind() {
            panic!("Mismatched bound kinds in Interval::new");
        }
        Interval { inf, sup }
    }

    /// Build a double interval.
    pub fn of_doubles(inf: f64, sup: f64) -> Interval {
        Interval::new(Scalar::double(inf), Scalar::double(sup))
    }

    /// Build a rational interval `[n1/d1, n2/d2]`.
    pub fn of_rationals(n1: i64, d1: i64, n2: i64, d2: i64) -> Interval {
        Interval::new(Scalar::mpq(n1, d1), Scalar::mpq(n2, d2))
    }

    /// Build an interval of extended rationals.
    pub fn of_mpq(inf: Mpq, sup: Mpq) -> Interval {
        Interval::new(Scalar::Mpq(inf), Scalar::Mpq(sup))
    }

    /// The singleton `[x, x]`.
    pub fn point(x: Scalar) -> Interval {
        Interval {
            inf: x.clone(),
            sup: x,
        }
    }

    /// The interval of all values of a kind.
    pub fn top(kind: ScalarKind) -> Interval {
        Interval {
            inf: Scalar::infty(kind, -1),
            sup: Scalar::infty(kind, 1),
        }
    }

    /// The canonical empty interval `[1,-1]`.
    pub fn bottom(kind: ScalarKind) -> Interval {
        Interval {
            inf: Scalar::from_i64(kind, 1, Round::Nearest),
            sup: Scalar::from_i64(kind, -1, Round::Nearest),
        }
    }

    /// The lower bound.
    pub fn inf(&self) -> &Scalar {
        &self.inf
    }

    /// The upper bound.
    pub fn sup(&self) -> &Scalar {
        &self.sup
    }

    /// The kind of the bounds.
    pub fn kind(&self) -> ScalarKind {
        self.inf.kind()
    }

    /// Whether the interval is empty.
    pub fn is_bottom(&self) -> bool {
        self.inf > self.sup
    }

    /// Whether the interval is `[-inf, +inf]`.
    pub fn is_top(&self) -> bool {
        self.inf.infty_sign() < 0 && self.sup.infty_sign() > 0
    }

    /// Whether the interval holds exactly one finite value.
    pub fn is_point(&self) -> bool {
        self.inf == self.sup && !self.inf.is_infty()
    }

    /// Whether the interval is `[0, 0]`.
    pub fn is_zero(&self) -> bool {
        self.inf.is_zero() && self.sup.is_zero()
    }

    /// Whether both bounds are finite.
    pub fn is_bounded(&self) -> bool {
        !self.inf.is_infty() && !self.sup.is_infty()
    }

    /// Whether `x` lies in the interval.
    pub fn contains(&self, x: &Scalar) -> bool {
        let x = x.to_mpq();
        self.inf.to_mpq() <= x && x <= self.sup.to_mpq()
    }

    /// Whether the interval contains zero.
    pub fn contains_zero(&self) -> bool {
        self.inf.sign() <= 0 && self.sup.sign() >= 0
    }

    /// Inclusion test. The empty interval is included in every interval.
    pub fn is_leq(&self, other: &Interval) -> bool {
        if self.is_bottom() {
            return true;
        }
        if other.is_bottom() {
            return false;
        }
        other.inf <= self.inf && self.sup <= other.sup
    }

    /// Negation: swaps and negates the bounds.
    pub fn neg(&self) -> Interval {
        Interval {
            inf: self.sup.neg(),
            sup: self.inf.neg(),
        }
    }

    /// Intersection.
    pub fn meet(&self, other: &Interval) -> Interval {
        let r = Interval {
            inf: self.inf.clone().max(other.inf.clone()),
            sup: self.sup.clone().min(other.sup.clone()),
        };
        r.canonical()
    }

    /// Smallest interval containing both operands.
    pub fn join(&self, other: &Interval) -> Interval {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        Interval {
            inf: self.inf.clone().min(other.inf.clone()),
            sup: self.sup.clone().max(other.sup.clone()),
        }
    }

    /// Standard interval widening: unstable bounds jump to infinity.
    pub fn widening(&self, other: &Interval) -> Interval {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        let kind = self.kind();
        Interval {
            inf: if other.inf < self.inf {
                Scalar::infty(kind, -1)
            } else {
                self.inf.clone()
            },
            sup: if other.sup > self.sup {
                Scalar::infty(kind, 1)
            } else {
                self.sup.clone()
            },
        }
    }

    /// Replace any empty interval by the canonical `[1,-1]`.
    pub fn canonical(self) -> Interval {
        if self.is_bottom() {
            Interval::bottom(self.kind())
        } else {
            self
        }
    }

    /// Convert to another kind, rounding outward.
    pub fn convert(&self, kind: ScalarKind) -> Interval {
        if self.kind() == kind {
            return self.clone();
        }
        if self.is_bottom() {
            return Interval::bottom(kind);
        }
        Interval {
            inf: self.inf.convert(kind, Round::Down),
            sup: self.sup.convert(kind, Round::Up),
        }
    }

    /// Sum.
    ///
    /// # Panics
    /// Panics if the kinds differ.
    pub fn add(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom(self.kind());
        }
        Interval {
            inf: self.inf.add(&other.inf, Round::Down),
            sup: self.sup.add(&other.sup, Round::Up),
        }
    }

    /// Difference.
    ///
    /// # Panics
    /// Panics if the kinds differ.
    pub fn sub(&self, other: &Interval) -> Interval {
        self.add(&other.neg())
    }

    /// Product by a scalar.
    pub fn scale(&self, c: &Scalar) -> Interval {
        self.mul(&Interval::point(c.clone()))
    }

    /// Product.
    ///
    /// # Panics
    /// Panics if the kinds differ.
    pub fn mul(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom(self.kind());
        }
        let pairs = [
            (&self.inf, &other.inf),
            (&self.inf, &other.sup),
            (&self.sup, &other.inf),
            (&self.sup, &other.sup),
        ];
        let mut lo: Option<Scalar> = None;
        let mut hi: Option<Scalar> = None;
        for (a, b) in pairs.iter() {
            let l = a.mul(b, Round::Down);
            let h = a.mul(b, Round::Up);
            lo = Some(match lo {
                Some(x) => x.min(l),
                None => l,
            });
            hi = Some(match hi {
                Some(x) => x.max(h),
                None => h,
            });
        }
        match (lo, hi) {
            (Some(inf), Some(sup)) => Interval { inf, sup },
            _ => Interval::top(self.kind()),
        }
    }

    /// Quotient. Division by an interval strictly containing zero gives top; division by exactly
    /// zero gives bottom, since no real result exists.
    ///
    /// # Panics
    /// Panics if the kinds differ.
    pub fn div(&self, other: &Interval) -> Interval {
        let kind = self.kind();
        if self.is_bottom() || other.is_bottom() || other.is_zero() {
            return Interval::bottom(kind);
        }
        if other.contains_zero() {
            return Interval::top(kind);
        }
        let pairs = [
            (&self.inf, &other.inf),
            (&self.inf, &other.sup),
            (&self.sup, &other.inf),
            (&self.sup, &other.sup),
        ];
        let mut lo = Scalar::infty(kind, 1);
        let mut hi = Scalar::infty(kind, -1);
        for (a, b) in pairs.iter() {
            match (a.div(b, Round::Down), a.div(b, Round::Up)) {
                (Some(l), Some(h)) => {
                    lo = lo.min(l);
                    hi = hi.max(h);
                }
                _ => return Interval::top(kind),
            }
        }
        Interval { inf: lo, sup: hi }
    }

    /// Square root of the nonnegative part; bottom if the interval is entirely negative.
    pub fn sqrt(&self) -> Interval {
        let kind = self.kind();
        let nonneg = self.meet(&Interval::new(Scalar::zero(kind), Scalar::infty(kind, 1)));
        if nonneg.is_bottom() {
            return Interval::bottom(kind);
        }
        match (nonneg.inf.sqrt(Round::Down), nonneg.sup.sqrt(Round::Up)) {
            (Some(inf), Some(sup)) => Interval { inf, sup },
            _ => Interval::top(kind),
        }
    }

    /// Power. The exponent must be a nonnegative integer point; any other exponent gives top.
    /// Bounds come from the monotonicity of `x^n` on each sign, so `[-3,2]^2` is `[0,9]`.
    pub fn pow(&self, exponent: &Interval) -> Interval {
        let kind = self.kind();
        if self.is_bottom() || exponent.is_bottom() {
            return Interval::bottom(kind);
        }
        let n = match exponent.inf.to_rational() {
            Some(r) if exponent.is_point() && r.is_integer() && r >= BigRational::from_integer(0.into()) => {
                r.to_integer()
            }
            _ => return Interval::top(kind),
        };
        if n.is_zero() {
            return Interval::point(Scalar::from_i64(kind, 1, Round::Nearest));
        }
        // Signed power of one bound, rounded up when `upper`.
        let bound = |s: &Scalar, upper: bool| -> Scalar {
            if s.sign() < 0 && n.is_odd() {
                magnitude_pow(s, &n, !upper).neg()
            } else {
                magnitude_pow(s, &n, upper)
            }
        };
        if n.is_odd() || self.inf.sign() >= 0 {
            Interval::new(bound(&self.inf, false), bound(&self.sup, true))
        } else if self.sup.sign() <= 0 {
            Interval::new(bound(&self.sup, false), bound(&self.inf, true))
        } else {
            let hi = bound(&self.inf, true).max(bound(&self.sup, true));
            Interval::new(Scalar::zero(kind), hi)
        }
    }

    /// Truncated remainder, with the sign of the dividend. A divisor containing zero gives top.
    pub fn modulo(&self, other: &Interval) -> Interval {
        let kind = self.kind();
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom(kind);
        }
        if other.contains_zero() {
            return Interval::top(kind);
        }
        let m = other.inf.abs().max(other.sup.abs());
        let m_lo = other.inf.abs().min(other.sup.abs());
        if self.inf.sign() >= 0 {
            if self.sup < m_lo {
                return self.clone();
            }
            Interval::new(Scalar::zero(kind), self.sup.clone().min(m))
        } else if self.sup.sign() <= 0 {
            if self.inf > m_lo.neg() {
                return self.clone();
            }
            Interval::new(self.inf.clone().max(m.neg()), Scalar::zero(kind))
        } else {
            Interval::new(self.inf.clone().max(m.neg()), self.sup.clone().min(m))
        }
    }

    fn map_bounds<F: Fn(&Scalar) -> Scalar, G: Fn(&Scalar) -> Scalar>(
        &self,
        lo: F,
        hi: G,
    ) -> Interval {
        if self.is_bottom() {
            return self.clone().canonical();
        }
        Interval {
            inf: lo(&self.inf),
            sup: hi(&self.sup),
        }
    }

    /// Round every member to an integer in direction `dir`.
    pub fn round_int(&self, dir: RDir) -> Interval {
        let kind = self.kind();
        // Ties may go either way, so widen each bound by half a unit before rounding.
        let near = |s: &Scalar, upper: bool| -> Scalar {
            match s.to_mpq() {
                Mpq::Finite(r) => {
                    let half = BigRational::new(1.into(), 2.into());
                    let v = if upper {
                        (r + half).floor()
                    } else {
                        (r - half).ceil()
                    };
                    Scalar::from_rational(kind, &v, if upper { Round::Up } else { Round::Down })
                }
                inf => Scalar::from_mpq(kind, &inf, Round::Nearest),
            }
        };
        let trunc = |s: &Scalar| -> Scalar {
            if s.sign() >= 0 {
                s.floor()
            } else {
                s.ceil()
            }
        };
        match dir {
            RDir::Up => self.map_bounds(|s| s.ceil(), |s| s.ceil()),
            RDir::Down => self.map_bounds(|s| s.floor(), |s| s.floor()),
            RDir::Zero => self.map_bounds(trunc, trunc),
            RDir::Nearest => self.map_bounds(|s| near(s, false), |s| near(s, true)),
            RDir::Rnd | RDir::Any => self.map_bounds(|s| s.floor(), |s| s.ceil()),
        }
    }

    /// Round every member to the floating point format `rtype` in direction `dir`. Values beyond
    /// the largest finite number of the format overflow to an infinity. Integer and real result
    /// types are handled by [`round`].
    ///
    /// [`round`]: #method.round
    ///
    /// # Panics
    /// Panics if `rtype` is not a floating point type.
    pub fn round_float(&self, rtype: RType, dir: RDir) -> Interval {
        let kind = self.kind();
        let (prec, emax) = match (rtype.precision(), rtype.max_exponent()) {
            (Some(p), Some(e)) => (p, e),
            _ => panic!("Interval::round_float needs a floating point type"),
        };
        let max = Mpq::Finite(BigRational::from_integer(
            ((BigInt::from(1) << prec as usize) - 1) << (emax - prec + 1) as usize,
        ));
        let to = |s: &Scalar, rnd: Round| -> Mpq { Mpfr::from_mpq(&s.to_mpq(), prec, rnd).to_mpq() };
        let (lo_rnd, hi_rnd) = match dir {
            RDir::Nearest => (Round::Nearest, Round::Nearest),
            RDir::Zero => (Round::Zero, Round::Zero),
            RDir::Up => (Round::Up, Round::Up),
            RDir::Down => (Round::Down, Round::Down),
            RDir::Rnd | RDir::Any => (Round::Down, Round::Up),
        };
        self.map_bounds(
            |s| {
                let v = to(s, lo_rnd);
                let v = if v < max.neg() {
                    Mpq::NegInf
                } else if v > max {
                    max.clone()
                } else {
                    v
                };
                Scalar::from_mpq(kind, &v, Round::Down)
            },
            |s| {
                let v = to(s, hi_rnd);
                let v = if v > max {
                    Mpq::PosInf
                } else if v < max.neg() {
                    max.neg()
                } else {
                    v
                };
                Scalar::from_mpq(kind, &v, Round::Up)
            },
        )
    }

    /// Apply the rounding of an operation with result type `rtype` and direction `dir`.
    pub fn round(&self, rtype: RType, dir: RDir) -> Interval {
        match rtype.precision() {
            None if rtype == RType::Int => self.round_int(dir),
            None => self.clone(),
            Some(_) => self.round_float(rtype, dir),
        }
    }
}

impl PartialEq for Interval {
    /// All empty intervals are equal.
    fn eq(&self, other: &Interval) -> bool {
        (self.is_bottom() && other.is_bottom())
            || (self.inf == other.inf && self.sup == other.sup)
    }
}

impl PartialOrd for Interval {
    /// Inclusion order.
    fn partial_cmp(&self, other: &Interval) -> Option<Ordering> {
        match (self.is_leq(other), other.is_leq(self)) {
            (true, true) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::Less),
            (false, true) => Some(Ordering::Greater),
            (false, false) => None,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.inf, self.sup)
    }
}
