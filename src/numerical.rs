//! Concrete numerical domains.
//!
//! This module provides three implementations of [`DomainBackend`]:
//! * [`BoxDomain`] keeps an interval per dimension, over doubles, exact rationals or
//!   arbitrary precision floats.
//! * [`OctagonDomain`] keeps bounds on every `±x ± y`, over exact rationals.
//! * [`PolyhedraDomain`] keeps arbitrary conjunctions of linear inequalities, over exact
//!   rationals, with or without strict inequalities.
//!
//! The relational domains work on [`LinearConstraint`]s, exact rational constraints of the form
//! `x^T coeffs <= cst` (or `<`, or `=`). [`LinearConstraint::relax`] turns the interval linear
//! constraints of the public interface into such constraints.
//!
//! [`DomainBackend`]: ../trait.DomainBackend.html
//! [`BoxDomain`]: ./interval/struct.BoxDomain.html
//! [`OctagonDomain`]: ./octagon/struct.OctagonDomain.html
//! [`PolyhedraDomain`]: ./polyhedra/struct.PolyhedraDomain.html
//! [`LinearConstraint`]: ./struct.LinearConstraint.html
//! [`LinearConstraint::relax`]: ./struct.LinearConstraint.html#method.relax

pub use crate::numerical::interval::{BoxDomain, BoxValue};
pub use crate::numerical::octagon::{Octagon, OctagonDomain};
pub use crate::numerical::polyhedra::{Polyhedron, PolyhedraDomain};

pub mod interval;
pub mod octagon;
pub mod polyhedra;

use crate::constraint::{ConsType, Lincons0};
use crate::environment::Dimension;
use crate::expr::LinExpr0;
use crate::manager::{Exc, OpContext};
use crate::num::{Coeff, Interval, Mpq, Scalar, ScalarKind};
use crate::var::Dim;
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

/// How the two sides of a [`LinearConstraint`] compare.
///
/// [`LinearConstraint`]: ./struct.LinearConstraint.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// `<=`
    Le,
    /// `<`
    Lt,
    /// `=`
    Eq,
}

/// A linear constraint is a predicate of the form `x^T coeffs <= cst`, or the same with `<` or
/// `=`, over exact rationals.
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    coeffs: Vec<BigRational>,
    cst: BigRational,
    rel: Relation,
}

impl PartialEq for LinearConstraint {
    fn eq(&self, other: &LinearConstraint) -> bool {
        // Constraints are equal if they are a positive multiple of each other. Equalities may
        // also be negative multiples. Two trivial constraints are equal when both hold or both
        // fail.
        if self.coeffs.len() != other.coeffs.len() || self.rel != other.rel {
            return false;
        }
        match (self.trivial(), other.trivial()) {
            (Some(a), Some(b)) => return a == b,
            (None, None) => (),
            _ => return false,
        }
        let pivot = self.coeffs.iter().position(|c| !c.is_zero());
        let rat = match pivot {
            Some(i) if !other.coeffs[i].is_zero() => &self.coeffs[i] / &other.coeffs[i],
            _ => return false,
        };
        if !rat.is_positive() && self.rel != Relation::Eq {
            return false;
        }
        self.coeffs
            .iter()
            .zip(other.coeffs.iter())
            .all(|(a, b)| *a == &rat * b)
            && self.cst == &rat * &other.cst
    }
}

impl LinearConstraint {
    /// Create a new `LinearConstraint` which is satisfied for every point, namely `0 <= 1`.
    ///
    /// # Arguments
    /// * `dims` - The number of dimensions in the constrained space.
    ///
    /// # Examples
    /// ```
    /// # use numdom::numerical::*;
    /// let lc = LinearConstraint::from_coeffs(vec![0, 0, 0], 2);
    /// assert_eq!(lc, LinearConstraint::unconstrained(3));
    /// ```
    pub fn unconstrained(dims: usize) -> LinearConstraint {
        LinearConstraint {
            coeffs: vec![BigRational::zero(); dims],
            cst: BigRational::one(),
            rel: Relation::Le,
        }
    }

    /// The constraint `0 <= -1`, satisfied nowhere.
    pub fn unsat(dims: usize) -> LinearConstraint {
        LinearConstraint {
            coeffs: vec![BigRational::zero(); dims],
            cst: -BigRational::one(),
            rel: Relation::Le,
        }
    }

    /// Construct the constraint `x^T cfs <= ct` from integers.
    ///
    /// # Examples
    /// ```
    /// # use numdom::numerical::*;
    /// let lc = LinearConstraint::from_coeffs(vec![1, -1], 2);
    /// assert_eq!(lc, LinearConstraint::from_coeffs(vec![2, -2], 4));
    /// assert_ne!(lc, LinearConstraint::from_coeffs(vec![-1, 1], -2));
    /// ```
    pub fn from_coeffs<I>(cfs: I, ct: i64) -> LinearConstraint
    where
        I: IntoIterator<Item = i64>,
    {
        LinearConstraint::new(
            cfs.into_iter().map(|c| BigRational::from_integer(c.into())).collect(),
            BigRational::from_integer(ct.into()),
            Relation::Le,
        )
    }

    /// Construct the constraint `x^T coeffs rel cst`.
    pub fn new(coeffs: Vec<BigRational>, cst: BigRational, rel: Relation) -> LinearConstraint {
        LinearConstraint { coeffs, cst, rel }
    }

    /// Get the dimension of the space this constraint operates on.
    ///
    /// # Examples
    /// ```
    /// # use numdom::numerical::*;
    /// assert_eq!(LinearConstraint::unconstrained(3).dims(), 3);
    /// ```
    pub fn dims(&self) -> usize {
        self.coeffs.len()
    }

    /// The coefficients.
    pub fn coeffs(&self) -> &[BigRational] {
        &self.coeffs
    }

    /// The right-hand side.
    pub fn cst(&self) -> &BigRational {
        &self.cst
    }

    /// The comparison.
    pub fn relation(&self) -> Relation {
        self.rel
    }

    /// For a constraint without variables, whether it holds.
    pub fn trivial(&self) -> Option<bool> {
        if self.coeffs.iter().any(|c| !c.is_zero()) {
            return None;
        }
        Some(match self.rel {
            Relation::Le => !self.cst.is_negative(),
            Relation::Lt => self.cst.is_positive(),
            Relation::Eq => self.cst.is_zero(),
        })
    }

    /// Whether the point `x` satisfies the constraint.
    pub fn holds_at(&self, x: &[BigRational]) -> bool {
        let lhs = self
            .coeffs
            .iter()
            .zip(x.iter())
            .fold(BigRational::zero(), |acc, (c, v)| acc + c * v);
        match self.rel {
            Relation::Le => lhs <= self.cst,
            Relation::Lt => lhs < self.cst,
            Relation::Eq => lhs == self.cst,
        }
    }

    /// The constraint in the `expr typ 0` form of the public interface, with rational scalars.
    pub fn to_lincons0(&self) -> Lincons0 {
        let terms = self
            .coeffs
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_zero())
            .map(|(d, c)| (d as Dim, Coeff::Scalar(Scalar::Mpq(Mpq::Finite(-c)))));
        let e = LinExpr0::from_terms(terms, Coeff::Scalar(Scalar::Mpq(Mpq::Finite(self.cst.clone()))));
        let typ = match self.rel {
            Relation::Le => ConsType::SupEq,
            Relation::Lt => ConsType::Sup,
            Relation::Eq => ConsType::Eq,
        };
        Lincons0::new(typ, e)
    }

    /// Scale to integer coefficients with no common factor. When every variable involved is an
    /// integer, round the constant to the tightest integer bound. Returns `false` if the
    /// constraint is found unsatisfiable.
    pub fn normalize(&mut self, dim: Dimension) -> bool {
        if let Some(ok) = self.trivial() {
            return ok;
        }
        let lcm = self
            .coeffs
            .iter()
            .filter(|c| !c.is_zero())
            .fold(BigInt::one(), |acc, c| acc.lcm(c.denom()));
        let scale = BigRational::from_integer(lcm);
        for c in self.coeffs.iter_mut() {
            *c = &*c * &scale;
        }
        self.cst = &self.cst * &scale;
        let g = self
            .coeffs
            .iter()
            .filter(|c| !c.is_zero())
            .fold(BigInt::zero(), |acc, c| acc.gcd(c.numer()));
        let g = BigRational::from_integer(g);
        for c in self.coeffs.iter_mut() {
            *c = &*c / &g;
        }
        self.cst = &self.cst / &g;
        let integral = self
            .coeffs
            .iter()
            .enumerate()
            .all(|(d, c)| c.is_zero() || dim.is_int(d as Dim));
        if integral {
            match self.rel {
                Relation::Le => self.cst = self.cst.floor(),
                Relation::Lt => {
                    // x^T c < k over integers is x^T c <= ceil(k) - 1.
                    self.cst = self.cst.ceil() - BigRational::one();
                    self.rel = Relation::Le;
                }
                Relation::Eq => {
                    if !self.cst.is_integer() {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Turn an interval linear constraint into exact rational constraints over the same points,
    /// or a superset of them.
    ///
    /// Interval coefficients are first moved into the constant using `bounds`. A constraint with
    /// an interval constant `[lo, hi]` holds when some constant in the interval satisfies it, so
    /// `e + [lo, hi] >= 0` becomes `-e <= hi` and an equality becomes the pair `-e <= hi` and
    /// `e <= -lo`. Disequalities and congruences cannot be expressed; they are dropped and the
    /// operation is marked inexact. Returns `None` if the constraint is unsatisfiable.
    ///
    /// # Arguments
    /// * `c` - The constraint to relax.
    /// * `bounds` - Bounds of every dimension, used to linearize interval coefficients.
    /// * `dim` - The space of the constraint.
    /// * `ctx` - The running operation.
    pub fn relax(
        c: &Lincons0,
        bounds: &[Interval],
        dim: Dimension,
        ctx: &mut OpContext,
    ) -> Option<Vec<LinearConstraint>> {
        if c.is_unsat() {
            return None;
        }
        let size = dim.size();
        let e = c.expr.quasilinearize(bounds, ScalarKind::Mpq);
        if !c.expr.is_quasilinear() {
            ctx.inexact();
        }
        let mut coeffs = vec![BigRational::zero(); size];
        for (d, k) in e.nonzero() {
            if d as usize >= size {
                panic!("Dimension too high in LinearConstraint::relax");
            }
            match k.as_scalar().and_then(|s| s.to_rational()) {
                Some(r) => coeffs[d as usize] = -r,
                None => {
                    ctx.raise(Exc::InvalidArgument, "infinite coefficient in a constraint");
                    return Some(Vec::new());
                }
            }
        }
        let cst = e.cst().to_interval().convert(ScalarKind::Mpq);
        let lo = cst.inf().to_mpq();
        let hi = cst.sup().to_mpq();
        let upper = |rel: Relation| match &hi {
            Mpq::Finite(h) => Some(LinearConstraint::new(coeffs.clone(), h.clone(), rel)),
            _ => None,
        };
        let lower = || match &lo {
            Mpq::Finite(l) => Some(LinearConstraint::new(
                coeffs.iter().map(|x| -x).collect(),
                -l,
                Relation::Le,
            )),
            _ => None,
        };
        let typ = match (c.typ, &c.modulus) {
            (ConsType::EqMod, Some(k)) if !k.is_zero() => {
                ctx.inexact();
                return Some(Vec::new());
            }
            (ConsType::EqMod, _) => ConsType::Eq,
            (t, _) => t,
        };
        let mut out = Vec::new();
        match typ {
            ConsType::SupEq => out.extend(upper(Relation::Le)),
            ConsType::Sup => out.extend(upper(Relation::Lt)),
            ConsType::Eq if lo == hi => out.extend(upper(Relation::Eq)),
            ConsType::Eq => {
                out.extend(upper(Relation::Le));
                out.extend(lower());
            }
            _ => {
                ctx.inexact();
                return Some(Vec::new());
            }
        }
        let mut kept = Vec::with_capacity(out.len());
        for mut lc in out {
            if !lc.normalize(dim) {
                return None;
            }
            if lc.trivial() != Some(true) {
                kept.push(lc);
            }
        }
        Some(kept)
    }
}

/// Convert bounds to exact rationals.
pub(crate) fn rational_bounds(bounds: &[Interval]) -> Vec<Interval> {
    bounds.iter().map(|b| b.convert(ScalarKind::Mpq)).collect()
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::manager::{FunId, FunOpt};

    fn ctx() -> OpContext {
        OpContext::new(FunId::MeetLinconsArray, FunOpt::default())
    }

    fn rat(n: i64, d: i64) -> BigRational {
        BigRational::new(n.into(), d.into())
    }

    #[test]
    fn equality_up_to_scaling() {
        let a = LinearConstraint::from_coeffs(vec![1, 2], 3);
        assert_eq!(a, LinearConstraint::from_coeffs(vec![3, 6], 9));
        assert_ne!(a, LinearConstraint::from_coeffs(vec![-1, -2], -3));
        assert_eq!(
            LinearConstraint::from_coeffs(vec![0, 0], 3),
            LinearConstraint::unconstrained(2)
        );
        assert_ne!(LinearConstraint::unsat(2), LinearConstraint::unconstrained(2));
    }

    #[test]
    fn integer_tightening() {
        let dim = Dimension::new(2, 0);
        let mut lc = LinearConstraint::new(vec![rat(2, 1), rat(4, 1)], rat(7, 1), Relation::Le);
        assert!(lc.normalize(dim));
        assert_eq!(lc.coeffs(), &[rat(1, 1), rat(2, 1)][..]);
        assert_eq!(lc.cst(), &rat(3, 1));
        let mut lt = LinearConstraint::new(vec![rat(1, 1), rat(0, 1)], rat(3, 1), Relation::Lt);
        assert!(lt.normalize(dim));
        assert_eq!(lt.relation(), Relation::Le);
        assert_eq!(lt.cst(), &rat(2, 1));
        let mut eq = LinearConstraint::new(vec![rat(2, 1), rat(0, 1)], rat(1, 1), Relation::Eq);
        assert!(!eq.normalize(dim));
        let mut real = LinearConstraint::new(vec![rat(2, 1)], rat(1, 1), Relation::Eq);
        assert!(real.normalize(Dimension::new(0, 1)));
        assert_eq!(real.cst(), &rat(1, 2));
    }

    #[test]
    fn relax_interval_constant() {
        // x + [-1, 2] == 0 gives -1 <= -x <= 2, i.e. -x <= 2 and x <= 1.
        let mut e = LinExpr0::sparse();
        e.set_coeff(0, Coeff::mpq(1, 1));
        e.set_cst(Coeff::Interval(Interval::of_rationals(-1, 1, 2, 1)));
        let c = Lincons0::new(ConsType::Eq, e);
        let bounds = vec![Interval::top(ScalarKind::Mpq)];
        let mut ctx = ctx();
        let out = LinearConstraint::relax(&c, &bounds, Dimension::new(0, 1), &mut ctx).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.contains(&LinearConstraint::from_coeffs(vec![-1], 2)));
        assert!(out.contains(&LinearConstraint::from_coeffs(vec![1], 1)));
        assert!(ctx.is_exact());
    }

    #[test]
    fn relax_drops_disequalities() {
        let mut e = LinExpr0::sparse();
        e.set_coeff(0, Coeff::double(1.0));
        let c = Lincons0::new(ConsType::DisEq, e);
        let bounds = vec![Interval::top(ScalarKind::Double)];
        let mut ctx = ctx();
        let out = LinearConstraint::relax(&c, &bounds, Dimension::new(1, 0), &mut ctx).unwrap();
        assert!(out.is_empty());
        assert!(!ctx.is_exact());
        let mut ctx2 = self::ctx();
        assert!(LinearConstraint::relax(&Lincons0::unsat(), &[], Dimension::new(0, 0), &mut ctx2)
            .is_none());
    }

    #[test]
    fn round_trip_through_lincons() {
        let lc = LinearConstraint::from_coeffs(vec![1, -2], 5);
        let c = lc.to_lincons0();
        assert_eq!(c.to_string(), "-1·x0 + 2·x1 + 5 >= 0");
        let mut ctx = ctx();
        let back = LinearConstraint::relax(
            &c,
            &rational_bounds(&[Interval::top(ScalarKind::Mpq), Interval::top(ScalarKind::Mpq)]),
            Dimension::new(0, 2),
            &mut ctx,
        )
        .unwrap();
        assert_eq!(back, vec![lc]);
        assert!(lc_holds());
    }

    fn lc_holds() -> bool {
        let lc = LinearConstraint::from_coeffs(vec![1, 1], 2);
        lc.holds_at(&[rat(1, 1), rat(1, 1)]) && !lc.holds_at(&[rat(2, 1), rat(1, 1)])
    }
}
