//! Arbitrary precision binary floating point numbers.
//!
//! A finite nonzero [`Mpfr`] is `mant · 2^exp` where `mant` is an odd integer of at most `prec`
//! bits. The exponent range is unbounded, so operations never overflow. Every operation is
//! computed exactly over rationals and then rounded once, so results are correctly rounded in the
//! requested direction.
//!
//! [`Mpfr`]: ./struct.Mpfr.html

use crate::num::mpq::Mpq;
use crate::num::scalar::{next_down, next_up};
use crate::num::Round;
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Val {
    Zero,
    Inf(bool),
    Num { mant: BigInt, exp: i64 },
}

/// A binary float with `prec` bits of mantissa.
///
/// # Examples
/// ```
/// # use numdom::num::{Mpfr, Round};
/// let a = Mpfr::from_f64(0.5, 53, Round::Nearest);
/// let b = Mpfr::from_i64(-9, 53, Round::Nearest);
/// assert_eq!(a.to_string(), "0.5");
/// assert_eq!(b.to_string(), "-9.0");
/// let third = Mpfr::from_i64(1, 8, Round::Nearest).div(&Mpfr::from_i64(3, 8, Round::Nearest), Round::Down);
/// assert_eq!(third.unwrap().to_string(), "0.33203125");
/// ```
#[derive(Debug, Clone)]
pub struct Mpfr {
    prec: u32,
    val: Val,
}

/// Floor of `log2(n / d)` for positive `n` and `d`.
fn floor_log2(n: &BigInt, d: &BigInt) -> i64 {
    let l = n.bits() as i64 - d.bits() as i64;
    let ge = if l >= 0 {
        *n >= (d << l as usize)
    } else {
        (n << (-l) as usize) >= *d
    };
    if ge {
        l
    } else {
        l - 1
    }
}

/// Scale `n / d` by `2^-e`, returning the new numerator and denominator.
fn scale(n: &BigInt, d: &BigInt, e: i64) -> (BigInt, BigInt) {
    if e >= 0 {
        (n.clone(), d << e as usize)
    } else {
        (n << (-e) as usize, d.clone())
    }
}

fn normalise(mant: BigInt, exp: i64) -> Val {
    if mant.is_zero() {
        return Val::Zero;
    }
    let tz = mant.trailing_zeros().unwrap_or(0);
    Val::Num {
        mant: mant >> tz as usize,
        exp: exp + tz as i64,
    }
}

/// Whether rounding a magnitude in direction `rnd` moves it up, given the sign of the exact value.
fn round_up_magnitude(rnd: Round, negative: bool) -> bool {
    match rnd {
        Round::Zero | Round::Nearest => false,
        Round::Away => true,
        Round::Up => !negative,
        Round::Down => negative,
    }
}

fn round_rational(q: &BigRational, prec: u32, rnd: Round) -> Val {
    if q.is_zero() {
        return Val::Zero;
    }
    let negative = q.is_negative();
    let n = q.numer().abs();
    let d = q.denom().clone();
    let e = floor_log2(&n, &d) - (prec as i64 - 1);
    let (num, den) = scale(&n, &d, e);
    let (mut t, r) = num.div_rem(&den);
    if !r.is_zero() {
        let inc = match rnd {
            Round::Nearest => match (&r << 1usize).cmp(&den) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => t.is_odd(),
            },
            _ => round_up_magnitude(rnd, negative),
        };
        if inc {
            t += 1;
        }
    }
    normalise(if negative { -t } else { t }, e)
}

fn sqrt_rational(q: &BigRational, prec: u32, rnd: Round) -> Val {
    if q.is_zero() {
        return Val::Zero;
    }
    let n = q.numer().clone();
    let d = q.denom().clone();
    let h = floor_log2(&n, &d).div_euclid(2);
    let e = h - (prec as i64 - 1);
    let (num, den) = scale(&n, &d, 2 * e);
    let mut t = (&num / &den).sqrt();
    let exact = &t * &t * &den == num;
    if !exact {
        let inc = match rnd {
            Round::Nearest => {
                let two_t1: BigInt = (&t << 1usize) + 1;
                let lhs: BigInt = &num << 2usize;
                match lhs.cmp(&(&two_t1 * &two_t1 * &den)) {
                    Ordering::Greater => true,
                    Ordering::Less => false,
                    Ordering::Equal => t.is_odd(),
                }
            }
            _ => round_up_magnitude(rnd, false),
        };
        if inc {
            t += 1;
        }
    }
    normalise(t, e)
}

fn pow10(k: usize) -> BigInt {
    let mut r = BigInt::one();
    for _ in 0..k {
        r *= 10;
    }
    r
}

impl Mpfr {
    fn with(prec: u32, val: Val) -> Mpfr {
        if prec == 0 {
            panic!("Zero precision in Mpfr");
        }
        Mpfr { prec, val }
    }

    /// Zero with the given precision.
    pub fn zero(prec: u32) -> Mpfr {
        Mpfr::with(prec, Val::Zero)
    }

    /// The infinity with the sign of `sign`, or zero if `sign == 0`.
    pub fn infty(sign: i32, prec: u32) -> Mpfr {
        match sign {
            0 => Mpfr::zero(prec),
            s => Mpfr::with(prec, Val::Inf(s < 0)),
        }
    }

    /// Round an extended rational to `prec` bits.
    pub fn from_mpq(q: &Mpq, prec: u32, rnd: Round) -> Mpfr {
        match q {
            Mpq::NegInf => Mpfr::infty(-1, prec),
            Mpq::PosInf => Mpfr::infty(1, prec),
            Mpq::Finite(r) => Mpfr::from_rational(r, prec, rnd),
        }
    }

    /// Round a rational to `prec` bits.
    pub fn from_rational(r: &BigRational, prec: u32, rnd: Round) -> Mpfr {
        Mpfr::with(prec, round_rational(r, prec, rnd))
    }

    /// Round an integer to `prec` bits.
    pub fn from_i64(x: i64, prec: u32, rnd: Round) -> Mpfr {
        Mpfr::from_mpq(&Mpq::from(x), prec, rnd)
    }

    /// Round a double to `prec` bits.
    ///
    /// # Panics
    /// Panics if `x` is NaN.
    pub fn from_f64(x: f64, prec: u32, rnd: Round) -> Mpfr {
        Mpfr::from_mpq(&Mpq::from_f64(x), prec, rnd)
    }

    /// Parse a decimal literal such as `-12.5`, `3e-2` or `inf`, rounding to `prec` bits.
    ///
    /// # Examples
    /// ```
    /// # use numdom::num::{Mpfr, Round};
    /// let x = Mpfr::parse("0.1", 53, Round::Nearest).unwrap();
    /// assert_eq!(x, Mpfr::from_f64(0.1, 53, Round::Nearest));
    /// assert!(Mpfr::parse("1.2.3", 53, Round::Nearest).is_none());
    /// ```
    pub fn parse(s: &str, prec: u32, rnd: Round) -> Option<Mpfr> {
        let s = s.trim();
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        if body == "inf" || body == "infinity" {
            return Some(Mpfr::infty(if negative { -1 } else { 1 }, prec));
        }
        let (mantissa, exponent) = match body.find(|c: char| c == 'e' || c == 'E') {
            Some(i) => (&body[..i], body[i + 1..].parse::<i64>().ok()?),
            None => (body, 0),
        };
        let (int_part, frac_part) = match mantissa.find('.') {
            Some(i) => (&mantissa[..i], &mantissa[i + 1..]),
            None => (mantissa, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !int_part
            .chars()
            .chain(frac_part.chars())
            .all(|c| c.is_ascii_digit())
        {
            return None;
        }
        let digits = format!("{}{}", int_part, frac_part);
        let mut num: BigInt = digits.parse().ok()?;
        if negative {
            num = -num;
        }
        let e10 = exponent - frac_part.len() as i64;
        let q = if e10 >= 0 {
            BigRational::from_integer(num * pow10(e10 as usize))
        } else {
            BigRational::new(num, pow10((-e10) as usize))
        };
        Some(Mpfr::from_rational(&q, prec, rnd))
    }

    /// The precision in bits.
    pub fn prec(&self) -> u32 {
        self.prec
    }

    /// The exact value as an extended rational.
    pub fn to_mpq(&self) -> Mpq {
        match &self.val {
            Val::Zero => Mpq::zero(),
            Val::Inf(true) => Mpq::NegInf,
            Val::Inf(false) => Mpq::PosInf,
            Val::Num { mant, exp } => {
                if *exp >= 0 {
                    Mpq::Finite(BigRational::from_integer(mant << *exp as usize))
                } else {
                    Mpq::Finite(BigRational::new(
                        mant.clone(),
                        BigInt::one() << (-*exp) as usize,
                    ))
                }
            }
        }
    }

    /// Round to a double in direction `rnd`.
    pub fn to_f64(&self, rnd: Round) -> f64 {
        mpq_to_f64(&self.to_mpq(), rnd)
    }

    /// The same value rounded to a different precision.
    pub fn round_to(&self, prec: u32, rnd: Round) -> Mpfr {
        Mpfr::from_mpq(&self.to_mpq(), prec, rnd)
    }

    /// The sign as `-1`, `0` or `1`.
    pub fn sign(&self) -> i32 {
        match &self.val {
            Val::Zero => 0,
            Val::Inf(neg) => {
                if *neg {
                    -1
                } else {
                    1
                }
            }
            Val::Num { mant, .. } => {
                if mant.is_negative() {
                    -1
                } else {
                    1
                }
            }
        }
    }

    /// `-1` or `1` for infinities, `0` otherwise.
    pub fn infty_sign(&self) -> i32 {
        match self.val {
            Val::Inf(_) => self.sign(),
            _ => 0,
        }
    }

    /// Whether this is zero.
    pub fn is_zero(&self) -> bool {
        self.val == Val::Zero
    }

    /// Whether this is a finite integer.
    pub fn is_integer(&self) -> bool {
        match &self.val {
            Val::Zero => true,
            Val::Inf(_) => false,
            Val::Num { exp, .. } => *exp >= 0,
        }
    }

    /// Negation, which is always exact.
    pub fn neg(&self) -> Mpfr {
        let val = match &self.val {
            Val::Zero => Val::Zero,
            Val::Inf(neg) => Val::Inf(!neg),
            Val::Num { mant, exp } => Val::Num {
                mant: -mant,
                exp: *exp,
            },
        };
        Mpfr::with(self.prec, val)
    }

    /// Absolute value, which is always exact.
    pub fn abs(&self) -> Mpfr {
        if self.sign() < 0 {
            self.neg()
        } else {
            self.clone()
        }
    }

    fn result_prec(&self, other: &Mpfr) -> u32 {
        self.prec.max(other.prec)
    }

    /// Sum rounded in direction `rnd`. Returns `None` for opposite infinities.
    pub fn add(&self, other: &Mpfr, rnd: Round) -> Option<Mpfr> {
        let q = self.to_mpq().add(&other.to_mpq())?;
        Some(Mpfr::from_mpq(&q, self.result_prec(other), rnd))
    }

    /// Difference rounded in direction `rnd`. Returns `None` for equal infinities.
    pub fn sub(&self, other: &Mpfr, rnd: Round) -> Option<Mpfr> {
        self.add(&other.neg(), rnd)
    }

    /// Product rounded in direction `rnd`. Zero times an infinity is zero.
    pub fn mul(&self, other: &Mpfr, rnd: Round) -> Mpfr {
        let q = self.to_mpq().mul(&other.to_mpq());
        Mpfr::from_mpq(&q, self.result_prec(other), rnd)
    }

    /// Quotient rounded in direction `rnd`. Returns `None` for `0 / 0` and `inf / inf`.
    pub fn div(&self, other: &Mpfr, rnd: Round) -> Option<Mpfr> {
        let q = self.to_mpq().div(&other.to_mpq())?;
        Some(Mpfr::from_mpq(&q, self.result_prec(other), rnd))
    }

    /// Square root rounded in direction `rnd`. Returns `None` for negative values.
    pub fn sqrt(&self, rnd: Round) -> Option<Mpfr> {
        match self.to_mpq() {
            Mpq::NegInf => None,
            Mpq::PosInf => Some(self.clone()),
            Mpq::Finite(r) => {
                if r.is_negative() {
                    None
                } else {
                    Some(Mpfr::with(self.prec, sqrt_rational(&r, self.prec, rnd)))
                }
            }
        }
    }

    /// Largest integer not above this value, rounded down to the precision.
    pub fn floor(&self) -> Mpfr {
        Mpfr::from_mpq(&self.to_mpq().floor(), self.prec, Round::Down)
    }

    /// Smallest integer not below this value, rounded up to the precision.
    pub fn ceil(&self) -> Mpfr {
        Mpfr::from_mpq(&self.to_mpq().ceil(), self.prec, Round::Up)
    }
}

impl PartialEq for Mpfr {
    fn eq(&self, other: &Mpfr) -> bool {
        self.val == other.val
    }
}

impl Eq for Mpfr {}

impl PartialOrd for Mpfr {
    fn partial_cmp(&self, other: &Mpfr) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Mpfr {
    fn cmp(&self, other: &Mpfr) -> Ordering {
        self.to_mpq().cmp(&other.to_mpq())
    }
}

impl fmt::Display for Mpfr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.val {
            Val::Zero => f.write_str("0.0"),
            Val::Inf(true) => f.write_str("-inf"),
            Val::Inf(false) => f.write_str("inf"),
            Val::Num { mant, exp } => {
                let sign = if mant.is_negative() { "-" } else { "" };
                if *exp >= 0 {
                    return write!(f, "{}{}.0", sign, mant.abs() << *exp as usize);
                }
                // mant / 2^k == mant * 5^k / 10^k
                let k = (-*exp) as usize;
                let mut scaled = mant.abs();
                for _ in 0..k {
                    scaled *= 5;
                }
                let mut digits = scaled.to_string();
                if digits.len() <= k {
                    digits = format!("{}{}", "0".repeat(k + 1 - digits.len()), digits);
                }
                let (int_part, frac_part) = digits.split_at(digits.len() - k);
                write!(f, "{}{}.{}", sign, int_part, frac_part.trim_end_matches('0'))
            }
        }
    }
}

/// Multiply `x` by `2^e` without intermediate overflow for moderate exponents.
fn ldexp(mut x: f64, mut e: i64) -> f64 {
    while e > 1000 && x.is_finite() {
        x *= 2f64.powi(1000);
        e -= 1000;
    }
    while e < -1000 && x != 0.0 {
        x *= 2f64.powi(-1000);
        e += 1000;
    }
    if x.is_finite() && x != 0.0 {
        x * 2f64.powi(e as i32)
    } else {
        x
    }
}

/// Round an extended rational to a double in direction `rnd`.
pub(crate) fn mpq_to_f64(q: &Mpq, rnd: Round) -> f64 {
    let r = match q {
        Mpq::NegInf => return f64::NEG_INFINITY,
        Mpq::PosInf => return f64::INFINITY,
        Mpq::Finite(r) => r,
    };
    let y = match round_rational(r, 53, rnd) {
        Val::Num { mant, exp } => ldexp(mant.to_f64().unwrap_or(0.0), exp),
        _ => 0.0,
    };
    // Out of the normal range the scaling above may round again, so fix up the direction.
    let exact = Mpq::Finite(r.clone());
    let approx = Mpq::from_f64(y);
    let y = if y.is_infinite() {
        match (rnd, y > 0.0) {
            (Round::Down, true) | (Round::Zero, true) => f64::MAX,
            (Round::Up, false) | (Round::Zero, false) => -f64::MAX,
            _ => y,
        }
    } else {
        match (rnd, approx.cmp(&exact)) {
            (Round::Up, Ordering::Less) => next_up(y),
            (Round::Down, Ordering::Greater) => next_down(y),
            (Round::Zero, Ordering::Greater) if y > 0.0 => next_down(y),
            (Round::Zero, Ordering::Less) if y < 0.0 => next_up(y),
            (Round::Away, Ordering::Less) if y >= 0.0 && !exact.is_zero() => next_up(y),
            (Round::Away, Ordering::Greater) if y <= 0.0 && !exact.is_zero() => next_down(y),
            _ => y,
        }
    };
    if y == 0.0 {
        0.0
    } else {
        y
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn m(x: f64) -> Mpfr {
        Mpfr::from_f64(x, 53, Round::Nearest)
    }

    #[test]
    fn display() {
        assert_eq!(m(0.0).to_string(), "0.0");
        assert_eq!(m(-9.0).to_string(), "-9.0");
        assert_eq!(m(0.5).to_string(), "0.5");
        assert_eq!(m(-0.375).to_string(), "-0.375");
        assert_eq!(m(f64::NEG_INFINITY).to_string(), "-inf");
        assert_eq!(m(1024.0).to_string(), "1024.0");
    }

    #[test]
    fn arithmetic() {
        assert_eq!(m(1.5).add(&m(2.25), Round::Nearest), Some(m(3.75)));
        assert_eq!(m(1.5).sub(&m(2.25), Round::Nearest), Some(m(-0.75)));
        assert_eq!(m(1.5).mul(&m(-2.0), Round::Nearest), m(-3.0));
        assert_eq!(m(-3.0).neg(), m(3.0));
        assert_eq!(m(-3.0).abs(), m(3.0));
        assert!(m(-3.0) < m(0.5));
        assert_eq!(m(f64::INFINITY).add(&m(f64::NEG_INFINITY), Round::Up), None);
    }

    #[test]
    fn directed_rounding_brackets_exact_value() {
        let one = Mpfr::from_i64(1, 10, Round::Nearest);
        let three = Mpfr::from_i64(3, 10, Round::Nearest);
        let lo = one.div(&three, Round::Down).unwrap();
        let hi = one.div(&three, Round::Up).unwrap();
        let third = Mpq::new(1, 3);
        assert!(lo.to_mpq() < third);
        assert!(third < hi.to_mpq());
        assert_eq!(hi.to_mpq().sub(&lo.to_mpq()), Some(Mpq::new(1, 2048)));
        let zero = one.div(&three, Round::Zero).unwrap();
        assert_eq!(zero, lo);
        let neg = one.neg().div(&three, Round::Zero).unwrap();
        assert_eq!(neg, lo.neg());
    }

    #[test]
    fn nearest_ties_to_even() {
        // 9 needs four bits; with three, 9 lies halfway between 8 and 10.
        assert_eq!(Mpfr::from_i64(9, 3, Round::Nearest), Mpfr::from_i64(8, 3, Round::Nearest));
        assert_eq!(Mpfr::from_i64(11, 3, Round::Nearest), Mpfr::from_i64(12, 3, Round::Nearest));
        assert_eq!(Mpfr::from_i64(9, 3, Round::Away).to_string(), "10.0");
    }

    #[test]
    fn sqrt() {
        assert_eq!(m(2.25).sqrt(Round::Nearest), Some(m(1.5)));
        let two = Mpfr::from_i64(2, 20, Round::Nearest);
        let lo = two.sqrt(Round::Down).unwrap().to_mpq();
        let hi = two.sqrt(Round::Up).unwrap().to_mpq();
        assert!(lo.mul(&lo) < Mpq::from(2));
        assert!(hi.mul(&hi) > Mpq::from(2));
        assert_eq!(m(-1.0).sqrt(Round::Nearest), None);
    }

    #[test]
    fn to_f64_directed() {
        let third = Mpq::new(1, 3);
        let lo = mpq_to_f64(&third, Round::Down);
        let hi = mpq_to_f64(&third, Round::Up);
        assert!(Mpq::from_f64(lo) < third);
        assert!(Mpq::from_f64(hi) > third);
        assert_eq!(next_up(lo), hi);
        assert_eq!(mpq_to_f64(&Mpq::new(1, 2), Round::Up), 0.5);
    }

    #[test]
    fn parse_decimal() {
        assert_eq!(Mpfr::parse("-12.5", 53, Round::Nearest), Some(m(-12.5)));
        assert_eq!(Mpfr::parse("3e2", 53, Round::Nearest), Some(m(300.0)));
        assert_eq!(Mpfr::parse("-inf", 53, Round::Nearest), Some(m(f64::NEG_INFINITY)));
        assert_eq!(Mpfr::parse("x", 53, Round::Nearest), None);
    }
}
