//! Scalars: a tagged union over the three number representations.
//!
//! Double arithmetic is rounded in the requested direction without touching the FPU mode: the
//! exact error of each operation is recovered (two-sum for additions, a fused multiply-add
//! residual for products, quotients and roots) and the result is stepped by one ulp when it lies
//! on the wrong side of the exact value.

use crate::num::mpfr::{mpq_to_f64, Mpfr};
use crate::num::mpq::Mpq;
use crate::num::{Round, ScalarKind};
use num_rational::BigRational;
use std::cmp::Ordering;
use std::fmt;

/// The next double above `x`.
pub(crate) fn next_up(x: f64) -> f64 {
    if x.is_nan() || x == f64::INFINITY {
        return x;
    }
    if x == 0.0 {
        return f64::from_bits(1);
    }
    let bits = x.to_bits();
    if x > 0.0 {
        f64::from_bits(bits + 1)
    } else {
        f64::from_bits(bits - 1)
    }
}

/// The next double below `x`.
pub(crate) fn next_down(x: f64) -> f64 {
    -next_up(-x)
}

/// Adjust a rounded-to-nearest double `y` given the sign of `exact - y`.
fn adjust(y: f64, err_sign: Ordering, rnd: Round) -> f64 {
    let y = match (rnd, err_sign) {
        (_, Ordering::Equal) | (Round::Nearest, _) => y,
        (Round::Up, Ordering::Greater) => next_up(y),
        (Round::Down, Ordering::Less) => next_down(y),
        (Round::Zero, Ordering::Greater) if y < 0.0 => next_up(y),
        (Round::Zero, Ordering::Less) if y > 0.0 => next_down(y),
        (Round::Away, Ordering::Greater) if y >= 0.0 => next_up(y),
        (Round::Away, Ordering::Less) if y <= 0.0 => next_down(y),
        _ => y,
    };
    if y == 0.0 {
        0.0
    } else {
        y
    }
}

/// Fix up an overflow to infinity from finite operands.
fn overflow(y: f64, rnd: Round) -> f64 {
    match (rnd, y > 0.0) {
        (Round::Down, true) | (Round::Zero, true) => f64::MAX,
        (Round::Up, false) | (Round::Zero, false) => -f64::MAX,
        _ => y,
    }
}

fn sign_of(x: f64) -> Ordering {
    x.partial_cmp(&0.0).unwrap_or(Ordering::Equal)
}

/// Whether a result this small may have lost bits to gradual underflow, where error terms are no
/// longer exact.
fn tiny(y: f64) -> bool {
    y.abs() < f64::MIN_POSITIVE * 4.0
}

/// Sum of finite-or-infinite doubles in direction `rnd`. Returns `None` for opposite infinities.
fn add_f64(a: f64, b: f64, rnd: Round) -> Option<f64> {
    if a.is_infinite() && b.is_infinite() && a != b {
        return None;
    }
    let s = a + b;
    if s.is_infinite() {
        return Some(if a.is_finite() && b.is_finite() {
            overflow(s, rnd)
        } else {
            s
        });
    }
    let bb = s - a;
    let err = (a - (s - bb)) + (b - bb);
    Some(adjust(s, sign_of(err), rnd))
}

fn mul_f64(a: f64, b: f64, rnd: Round) -> f64 {
    if a == 0.0 || b == 0.0 {
        return 0.0;
    }
    let p = a * b;
    if p.is_infinite() {
        return if a.is_finite() && b.is_finite() {
            overflow(p, rnd)
        } else {
            p
        };
    }
    if tiny(p) {
        return exact_f64(&Mpq::from_f64(a).mul(&Mpq::from_f64(b)), rnd);
    }
    let err = a.mul_add(b, -p);
    adjust(p, sign_of(err), rnd)
}

fn div_f64(a: f64, b: f64, rnd: Round) -> Option<f64> {
    let q = Mpq::from_f64(a).div(&Mpq::from_f64(b))?;
    if !(a.is_finite() && b.is_finite()) || b == 0.0 {
        return Some(exact_f64(&q, rnd));
    }
    let y = a / b;
    if y.is_infinite() {
        return Some(overflow(y, rnd));
    }
    if tiny(y) || tiny(b) {
        return Some(exact_f64(&q, rnd));
    }
    // a - y*b, exactly; the sign of (a/b - y) is the sign of that residual times the sign of b.
    let r = -(y.mul_add(b, -a));
    let s = sign_of(r);
    Some(adjust(y, if b < 0.0 { s.reverse() } else { s }, rnd))
}

fn sqrt_f64(a: f64, rnd: Round) -> Option<f64> {
    if a < 0.0 {
        return None;
    }
    if a == 0.0 || a.is_infinite() {
        return Some(a);
    }
    let y = a.sqrt();
    let r = -(y.mul_add(y, -a));
    Some(adjust(y, sign_of(r), rnd))
}

fn exact_f64(q: &Mpq, rnd: Round) -> f64 {
    mpq_to_f64(q, rnd)
}

/// A number in one of the supported representations.
///
/// Arithmetic between scalars of different kinds is a programming error and panics; use
/// [`convert`] first. NaN is never produced: undefined operations return `None`.
///
/// # Examples
/// ```
/// # use numdom::num::{Scalar, Round};
/// let a = Scalar::double(0.5);
/// assert_eq!(a.to_string(), "0.5");
/// assert_eq!(Scalar::double(-9.0).to_string(), "-9.0");
/// assert_eq!(Scalar::mpq(1, 2).to_string(), "1/2");
/// let third = Scalar::double(1.0).div(&Scalar::double(3.0), Round::Up).unwrap();
/// assert!(third > Scalar::double(1.0 / 3.0));
/// ```
///
/// [`convert`]: #method.convert
#[derive(Debug, Clone)]
pub enum Scalar {
    /// An IEEE double. Never NaN.
    Double(f64),
    /// An extended exact rational.
    Mpq(Mpq),
    /// An arbitrary precision float.
    Mpfr(Mpfr),
}

impl Scalar {
    /// A double scalar.
    ///
    /// # Panics
    /// Panics if `x` is NaN.
    pub fn double(x: f64) -> Scalar {
        if x.is_nan() {
            panic!("NaN scalar in Scalar::double");
        }
        Scalar::Double(if x == 0.0 { 0.0 } else { x })
    }

    /// The rational `num / den`; a zero denominator gives an infinity.
    pub fn mpq(num: i64, den: i64) -> Scalar {
        Scalar::Mpq(Mpq::new(num, den))
    }

    /// A float of precision `prec` holding `x` rounded in direction `rnd`.
    pub fn mpfr(x: f64, prec: u32, rnd: Round) -> Scalar {
        Scalar::Mpfr(Mpfr::from_f64(x, prec, rnd))
    }

    /// Zero of the given kind.
    pub fn zero(kind: ScalarKind) -> Scalar {
        Scalar::infty(kind, 0)
    }

    /// The integer `x` in the given kind, rounded in direction `rnd` if needed.
    pub fn from_i64(kind: ScalarKind, x: i64, rnd: Round) -> Scalar {
        Scalar::from_mpq(kind, &Mpq::from(x), rnd)
    }

    /// Signed infinity of the given kind, or zero if `sign == 0`.
    pub fn infty(kind: ScalarKind, sign: i32) -> Scalar {
        match kind {
            ScalarKind::Double => Scalar::Double(match sign {
                s if s > 0 => f64::INFINITY,
                s if s < 0 => f64::NEG_INFINITY,
                _ => 0.0,
            }),
            ScalarKind::Mpq => Scalar::Mpq(Mpq::infty(sign)),
            ScalarKind::Mpfr(p) => Scalar::Mpfr(Mpfr::infty(sign, p)),
        }
    }

    /// Round an extended rational into the given kind.
    pub fn from_mpq(kind: ScalarKind, q: &Mpq, rnd: Round) -> Scalar {
        match kind {
            ScalarKind::Double => Scalar::Double(mpq_to_f64(q, rnd)),
            ScalarKind::Mpq => Scalar::Mpq(q.clone()),
            ScalarKind::Mpfr(p) => Scalar::Mpfr(Mpfr::from_mpq(q, p, rnd)),
        }
    }

    /// Round a finite rational into the given kind.
    pub fn from_rational(kind: ScalarKind, r: &BigRational, rnd: Round) -> Scalar {
        Scalar::from_mpq(kind, &Mpq::Finite(r.clone()), rnd)
    }

    /// The kind of this scalar.
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Double(_) => ScalarKind::Double,
            Scalar::Mpq(_) => ScalarKind::Mpq,
            Scalar::Mpfr(m) => ScalarKind::Mpfr(m.prec()),
        }
    }

    /// Convert to another kind, rounding in direction `rnd`.
    pub fn convert(&self, kind: ScalarKind, rnd: Round) -> Scalar {
        if self.kind() == kind {
            return self.clone();
        }
        Scalar::from_mpq(kind, &self.to_mpq(), rnd)
    }

    /// The exact value as an extended rational.
    pub fn to_mpq(&self) -> Mpq {
        match self {
            Scalar::Double(x) => Mpq::from_f64(*x),
            Scalar::Mpq(q) => q.clone(),
            Scalar::Mpfr(m) => m.to_mpq(),
        }
    }

    /// The exact finite value, if this scalar is finite.
    pub fn to_rational(&self) -> Option<BigRational> {
        match self.to_mpq() {
            Mpq::Finite(r) => Some(r),
            _ => None,
        }
    }

    /// `-1` or `1` for infinities, `0` for finite values.
    pub fn infty_sign(&self) -> i32 {
        match self {
            Scalar::Double(x) => {
                if *x == f64::INFINITY {
                    1
                } else if *x == f64::NEG_INFINITY {
                    -1
                } else {
                    0
                }
            }
            Scalar::Mpq(q) => q.infty_sign(),
            Scalar::Mpfr(m) => m.infty_sign(),
        }
    }

    /// Whether this is an infinity.
    pub fn is_infty(&self) -> bool {
        self.infty_sign() != 0
    }

    /// The sign as `-1`, `0` or `1`.
    pub fn sign(&self) -> i32 {
        match self {
            Scalar::Double(x) => match sign_of(*x) {
                Ordering::Less => -1,
                Ordering::Equal => 0,
                Ordering::Greater => 1,
            },
            Scalar::Mpq(q) => q.sign(),
            Scalar::Mpfr(m) => m.sign(),
        }
    }

    /// Whether this is zero.
    pub fn is_zero(&self) -> bool {
        self.sign() == 0
    }

    /// Whether this is a finite integer.
    pub fn is_integer(&self) -> bool {
        match self {
            Scalar::Double(x) => x.is_finite() && x.fract() == 0.0,
            Scalar::Mpq(q) => q.is_integer(),
            Scalar::Mpfr(m) => m.is_integer(),
        }
    }

    /// Negation, always exact.
    pub fn neg(&self) -> Scalar {
        match self {
            Scalar::Double(x) => Scalar::double(-x),
            Scalar::Mpq(q) => Scalar::Mpq(q.neg()),
            Scalar::Mpfr(m) => Scalar::Mpfr(m.neg()),
        }
    }

    /// Absolute value, always exact.
    pub fn abs(&self) -> Scalar {
        if self.sign() < 0 {
            self.neg()
        } else {
            self.clone()
        }
    }

    fn mismatch(&self, other: &Scalar, op: &str) -> ! {
        panic!(
            "Mismatched scalar kinds in Scalar::{}: {} and {}",
            op,
            self.kind(),
            other.kind()
        )
    }

    /// Resolve a sum of opposite infinities toward the rounding direction.
    fn undefined_sum(kind: ScalarKind, rnd: Round) -> Scalar {
        Scalar::infty(kind, if rnd == Round::Up { 1 } else { -1 })
    }

    /// Sum rounded in direction `rnd`. The sum of opposite infinities is the infinity in the
    /// direction of `rnd` (`+inf` for `Up`, `-inf` otherwise), which keeps bound computations
    /// sound.
    ///
    /// # Panics
    /// Panics if the kinds differ.
    pub fn add(&self, other: &Scalar, rnd: Round) -> Scalar {
        match (self, other) {
            (Scalar::Double(a), Scalar::Double(b)) => match add_f64(*a, *b, rnd) {
                Some(x) => Scalar::Double(x),
                None => Scalar::undefined_sum(ScalarKind::Double, rnd),
            },
            (Scalar::Mpq(a), Scalar::Mpq(b)) => match a.add(b) {
                Some(x) => Scalar::Mpq(x),
                None => Scalar::undefined_sum(ScalarKind::Mpq, rnd),
            },
            (Scalar::Mpfr(a), Scalar::Mpfr(b)) => match a.add(b, rnd) {
                Some(x) => Scalar::Mpfr(x),
                None => Scalar::undefined_sum(self.kind(), rnd),
            },
            _ => self.mismatch(other, "add"),
        }
    }

    /// Difference rounded in direction `rnd`.
    ///
    /// # Panics
    /// Panics if the kinds differ.
    pub fn sub(&self, other: &Scalar, rnd: Round) -> Scalar {
        self.add(&other.neg(), rnd)
    }

    /// Product rounded in direction `rnd`. Zero times an infinity is zero.
    ///
    /// # Panics
    /// Panics if the kinds differ.
    pub fn mul(&self, other: &Scalar, rnd: Round) -> Scalar {
        match (self, other) {
            (Scalar::Double(a), Scalar::Double(b)) => Scalar::Double(mul_f64(*a, *b, rnd)),
            (Scalar::Mpq(a), Scalar::Mpq(b)) => Scalar::Mpq(a.mul(b)),
            (Scalar::Mpfr(a), Scalar::Mpfr(b)) => Scalar::Mpfr(a.mul(b, rnd)),
            _ => self.mismatch(other, "mul"),
        }
    }

    /// Quotient rounded in direction `rnd`. A nonzero value divided by zero is an infinity;
    /// `0 / 0` and `inf / inf` are undefined and return `None`.
    ///
    /// # Panics
    /// Panics if the kinds differ.
    pub fn div(&self, other: &Scalar, rnd: Round) -> Option<Scalar> {
        match (self, other) {
            (Scalar::Double(a), Scalar::Double(b)) => div_f64(*a, *b, rnd).map(Scalar::Double),
            (Scalar::Mpq(a), Scalar::Mpq(b)) => a.div(b).map(Scalar::Mpq),
            (Scalar::Mpfr(a), Scalar::Mpfr(b)) => a.div(b, rnd).map(Scalar::Mpfr),
            _ => self.mismatch(other, "div"),
        }
    }

    /// Square root rounded in direction `rnd`; `None` for negative values. The square root of a
    /// rational is computed in 128-bit precision and kept as a rational.
    pub fn sqrt(&self, rnd: Round) -> Option<Scalar> {
        match self {
            Scalar::Double(a) => sqrt_f64(*a, rnd).map(Scalar::Double),
            Scalar::Mpq(q) => Mpfr::from_mpq(q, 128, rnd)
                .sqrt(rnd)
                .map(|m| Scalar::Mpq(m.to_mpq())),
            Scalar::Mpfr(m) => m.sqrt(rnd).map(Scalar::Mpfr),
        }
    }

    /// Largest integer not above this value. Infinities are unchanged.
    pub fn floor(&self) -> Scalar {
        match self {
            Scalar::Double(x) => Scalar::double(x.floor()),
            Scalar::Mpq(q) => Scalar::Mpq(q.floor()),
            Scalar::Mpfr(m) => Scalar::Mpfr(m.floor()),
        }
    }

    /// Smallest integer not below this value. Infinities are unchanged.
    pub fn ceil(&self) -> Scalar {
        match self {
            Scalar::Double(x) => Scalar::double(x.ceil()),
            Scalar::Mpq(q) => Scalar::Mpq(q.ceil()),
            Scalar::Mpfr(m) => Scalar::Mpfr(m.ceil()),
        }
    }

    /// The smaller of two scalars of the same kind.
    pub fn min(self, other: Scalar) -> Scalar {
        if other < self {
            other
        } else {
            self
        }
    }

    /// The larger of two scalars of the same kind.
    pub fn max(self, other: Scalar) -> Scalar {
        if other > self {
            other
        } else {
            self
        }
    }
}

impl PartialEq for Scalar {
    /// # Panics
    /// Panics if the kinds differ.
    fn eq(&self, other: &Scalar) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Scalar {
    /// Scalars of the same kind are totally ordered.
    ///
    /// # Panics
    /// Panics if the kinds differ.
    fn partial_cmp(&self, other: &Scalar) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Double(a), Scalar::Double(b)) => a.partial_cmp(b),
            (Scalar::Mpq(a), Scalar::Mpq(b)) => Some(a.cmp(b)),
            (Scalar::Mpfr(a), Scalar::Mpfr(b)) => Some(a.cmp(b)),
            _ => self.mismatch(other, "partial_cmp"),
        }
    }
}

impl From<f64> for Scalar {
    fn from(x: f64) -> Scalar {
        Scalar::double(x)
    }
}

impl From<Mpq> for Scalar {
    fn from(q: Mpq) -> Scalar {
        Scalar::Mpq(q)
    }
}

impl From<Mpfr> for Scalar {
    fn from(m: Mpfr) -> Scalar {
        Scalar::Mpfr(m)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Double(x) => {
                if *x == f64::INFINITY {
                    f.write_str("inf")
                } else if *x == f64::NEG_INFINITY {
                    f.write_str("-inf")
                } else if *x == 0.0 {
                    f.write_str("0.0")
                } else {
                    write!(f, "{:?}", x)
                }
            }
            Scalar::Mpq(q) => write!(f, "{}", q),
            Scalar::Mpfr(m) => write!(f, "{}", m),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn display() {
        assert_eq!(Scalar::double(0.0).to_string(), "0.0");
        assert_eq!(Scalar::double(-0.0).to_string(), "0.0");
        assert_eq!(Scalar::double(-9.0).to_string(), "-9.0");
        assert_eq!(Scalar::double(0.5).to_string(), "0.5");
        assert_eq!(Scalar::infty(ScalarKind::Double, 1).to_string(), "inf");
        assert_eq!(Scalar::infty(ScalarKind::Double, -1).to_string(), "-inf");
        assert_eq!(Scalar::mpq(0, 1).to_string(), "0");
        assert_eq!(Scalar::mpq(-9, 1).to_string(), "-9");
        assert_eq!(Scalar::mpq(2, 4).to_string(), "1/2");
        assert_eq!(Scalar::mpfr(-9.0, 53, Round::Nearest).to_string(), "-9.0");
        assert_eq!(Scalar::mpfr(0.5, 53, Round::Nearest).to_string(), "0.5");
    }

    #[test]
    fn infty_and_sign() {
        assert_eq!(Scalar::double(-3.0).infty_sign(), 0);
        assert_eq!(Scalar::infty(ScalarKind::Double, -1).infty_sign(), -1);
        assert_eq!(Scalar::infty(ScalarKind::Mpq, 1).infty_sign(), 1);
        assert_eq!(Scalar::double(-3.0).sign(), -1);
        assert_eq!(Scalar::mpq(0, 1).sign(), 0);
        assert_eq!(Scalar::mpfr(2.0, 20, Round::Nearest).sign(), 1);
    }

    #[test]
    fn negation() {
        assert_eq!(Scalar::double(-9.0).neg(), Scalar::double(9.0));
        assert_eq!(Scalar::mpq(1, 2).neg(), Scalar::mpq(-1, 2));
        assert_eq!(Scalar::infty(ScalarKind::Mpq, 1).neg(), Scalar::mpq(-1, 0));
    }

    #[test]
    fn double_directed_addition() {
        let a = Scalar::double(0.1);
        let b = Scalar::double(0.2);
        let lo = a.add(&b, Round::Down);
        let hi = a.add(&b, Round::Up);
        let exact = Mpq::from_f64(0.1).add(&Mpq::from_f64(0.2)).unwrap();
        assert!(lo.to_mpq() <= exact);
        assert!(hi.to_mpq() >= exact);
        assert!(lo < hi);
        let one = Scalar::double(1.0);
        assert_eq!(one.add(&one, Round::Up), Scalar::double(2.0));
    }

    #[test]
    fn double_directed_product_and_quotient() {
        let a = Scalar::double(1.0);
        let b = Scalar::double(3.0);
        let lo = a.div(&b, Round::Down).unwrap();
        let hi = a.div(&b, Round::Up).unwrap();
        let third = Mpq::new(1, 3);
        assert!(lo.to_mpq() < third);
        assert!(hi.to_mpq() > third);
        let c = Scalar::double(0.1);
        let d = Scalar::double(0.7);
        let exact = Mpq::from_f64(0.1).mul(&Mpq::from_f64(0.7));
        assert!(c.mul(&d, Round::Down).to_mpq() <= exact);
        assert!(c.mul(&d, Round::Up).to_mpq() >= exact);
        let neg = Scalar::double(-1.0).div(&b, Round::Up).unwrap();
        assert!(neg.to_mpq() > third.neg());
    }

    #[test]
    fn overflow_respects_direction() {
        let big = Scalar::double(f64::MAX);
        assert_eq!(big.add(&big, Round::Down), Scalar::double(f64::MAX));
        assert!(big.add(&big, Round::Up).is_infty());
        assert_eq!(big.neg().mul(&Scalar::double(2.0), Round::Up), Scalar::double(-f64::MAX));
    }

    #[test]
    fn infinities() {
        let inf = Scalar::infty(ScalarKind::Double, 1);
        let ninf = Scalar::infty(ScalarKind::Double, -1);
        assert_eq!(inf.add(&ninf, Round::Up), inf);
        assert_eq!(inf.add(&ninf, Round::Down), ninf);
        assert_eq!(Scalar::double(0.0).mul(&inf, Round::Up), Scalar::double(0.0));
        assert_eq!(Scalar::double(1.0).div(&Scalar::double(0.0), Round::Up), Some(inf));
        assert_eq!(Scalar::double(0.0).div(&Scalar::double(0.0), Round::Up), None);
    }

    #[test]
    fn sqrt() {
        assert_eq!(Scalar::double(2.25).sqrt(Round::Up), Some(Scalar::double(1.5)));
        let lo = Scalar::double(2.0).sqrt(Round::Down).unwrap().to_mpq();
        let hi = Scalar::double(2.0).sqrt(Round::Up).unwrap().to_mpq();
        assert!(lo.mul(&lo) < Mpq::from(2));
        assert!(hi.mul(&hi) > Mpq::from(2));
        assert_eq!(Scalar::mpq(9, 4).sqrt(Round::Down), Some(Scalar::mpq(3, 2)));
        assert_eq!(Scalar::double(-1.0).sqrt(Round::Up), None);
    }

    #[test]
    fn conversion() {
        let third = Scalar::mpq(1, 3);
        let lo = third.convert(ScalarKind::Double, Round::Down);
        let hi = third.convert(ScalarKind::Double, Round::Up);
        assert!(lo.to_mpq() < Mpq::new(1, 3));
        assert!(hi.to_mpq() > Mpq::new(1, 3));
        let m = Scalar::double(0.5).convert(ScalarKind::Mpfr(10), Round::Nearest);
        assert_eq!(m.kind(), ScalarKind::Mpfr(10));
        assert_eq!(m.to_mpq(), Mpq::new(1, 2));
    }

    #[test]
    #[should_panic(expected = "Mismatched scalar kinds")]
    fn mixed_kinds_panic() {
        let _ = Scalar::double(1.0) < Scalar::mpq(1, 1);
    }
}
