//! The box domain.
//!
//! The box domain keeps track of separate bounds on each dimension. The bounds for all of the
//! dimensions are held in a [`BoxValue`], and [`BoxDomain`] chooses the numbers they are
//! computed with: doubles, exact rationals or floats of a fixed precision. Most of the time it
//! will be more convenient to work through [`AbstractValue`] than to build boxes directly, which
//! makes it easy to switch to a relational domain later. For example:
//! ```
//! use numdom::{AbstractValue, Environment, Manager, Var};
//! use numdom::num::Interval;
//! use numdom::numerical::BoxDomain;
//!
//! let man = Manager::new(BoxDomain::mpq());
//! let env = Environment::new(&[], &[Var::new("x"), Var::new("y")]).unwrap();
//! let b = AbstractValue::of_box(&man, &env, &[(Var::new("x"), Interval::of_rationals(0, 1, 2, 1))])
//!     .unwrap();
//! assert!(b.is_variable_unconstrained(&Var::new("y")).unwrap());
//! ```
//!
//! [`BoxValue`]: ./struct.BoxValue.html
//! [`BoxDomain`]: ./struct.BoxDomain.html
//! [`AbstractValue`]: ../../abstract_value/struct.AbstractValue.html

use crate::constraint::{ConsType, Lincons0};
use crate::environment::{DimChange, DimPerm, Dimension};
use crate::expr::{LinExpr0, Tree};
use crate::manager::OpContext;
use crate::num::{Coeff, Interval, Round, Scalar, ScalarKind};
use crate::var::Dim;
use crate::DomainBackend;
use log::trace;
use std::cmp;

/// The box backend. Bounds are computed in the scalar kind chosen at construction, with outward
/// rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxDomain {
    kind: ScalarKind,
}

impl BoxDomain {
    /// Boxes with double bounds.
    pub fn double() -> BoxDomain {
        BoxDomain {
            kind: ScalarKind::Double,
        }
    }

    /// Boxes with exact rational bounds.
    pub fn mpq() -> BoxDomain {
        BoxDomain {
            kind: ScalarKind::Mpq,
        }
    }

    /// Boxes with bounds held as binary floats of `prec` bits.
    ///
    /// # Panics
    /// Panics if `prec` is zero.
    pub fn mpfr(prec: u32) -> BoxDomain {
        if prec == 0 {
            panic!("Zero precision in BoxDomain::mpfr");
        }
        BoxDomain {
            kind: ScalarKind::Mpfr(prec),
        }
    }

    /// The number kind of the bounds.
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    // Bring an interval to the kind of this domain and, for an integer dimension, shrink it to
    // integer bounds.
    fn fit(&self, itv: &Interval, int: bool) -> Interval {
        let itv = itv.convert(self.kind);
        if int && !itv.is_bottom() {
            Interval::new(itv.inf().ceil(), itv.sup().floor()).canonical()
        } else {
            itv
        }
    }

    fn one(&self) -> Coeff {
        Coeff::Scalar(Scalar::from_i64(self.kind, 1, Round::Nearest))
    }

    fn zero_point(&self) -> Interval {
        Interval::point(Scalar::zero(self.kind))
    }

    // Tighten the bounds of `v` with `cs` by repeated propagation. Each round refines every
    // dimension of every constraint with the bounds of the others.
    fn propagate(&self, ctx: &mut OpContext, v: &BoxValue, cs: &[Lincons0]) -> BoxValue {
        if v.empty {
            return v.clone();
        }
        let kind = self.kind;
        for c in cs {
            let strong = c.expr.is_quasilinear()
                && c.expr.nonzero().count() <= 1
                && !matches!(c.typ, ConsType::DisEq | ConsType::EqMod);
            if !strong {
                ctx.inexact();
            }
        }
        let rounds = cmp::max(10, ctx.funopt().algorithm) as usize;
        let mut itvs = v.itvs.clone();
        for round in 0..rounds {
            let mut changed = false;
            for c in cs {
                let typ = match (c.typ, &c.modulus) {
                    (ConsType::EqMod, Some(k)) if !k.is_zero() => continue,
                    (ConsType::EqMod, _) => ConsType::Eq,
                    (t, _) => t,
                };
                let full = c.expr.eval(&itvs, kind);
                if violated(&full, typ) {
                    return BoxValue::empty(v.dim, kind);
                }
                if typ == ConsType::DisEq {
                    continue;
                }
                for (d, a) in c.expr.nonzero() {
                    let a = a.to_interval_of(kind);
                    if a.contains_zero() {
                        continue;
                    }
                    let rest = rest_of(&c.expr, &itvs, d, kind);
                    let target = match typ {
                        ConsType::Eq => rest.neg(),
                        _ => Interval::new(rest.sup().neg(), Scalar::infty(kind, 1)),
                    };
                    let mut q = target.div(&a);
                    let int = v.dim.is_int(d);
                    if int && typ == ConsType::Sup && kind == ScalarKind::Mpq && a.is_point() {
                        q = strict_int(&q, a.inf().sign() > 0);
                    }
                    let new = itvs[d as usize].meet(&self.fit(&q, int));
                    if new.is_bottom() {
                        return BoxValue::empty(v.dim, kind);
                    }
                    if new != itvs[d as usize] {
                        changed = true;
                        itvs[d as usize] = new;
                    }
                }
            }
            if !changed || ctx.timed_out() {
                trace!("box propagation stopped after {} rounds", round + 1);
                break;
            }
        }
        BoxValue::from_vec(v.dim, itvs)
    }
}

// The enclosure of `e` without its term on `d`.
fn rest_of(e: &LinExpr0, itvs: &[Interval], d: Dim, kind: ScalarKind) -> Interval {
    let mut acc = e.cst().to_interval_of(kind);
    for (i, c) in e.nonzero() {
        if i != d {
            acc = acc.add(&c.to_interval_of(kind).mul(&itvs[i as usize].convert(kind)));
        }
    }
    acc
}

// Whether an enclosure of an expression shows that `expr typ 0` holds nowhere.
fn violated(full: &Interval, typ: ConsType) -> bool {
    if full.is_bottom() {
        return true;
    }
    match typ {
        ConsType::SupEq => full.sup().sign() < 0,
        ConsType::Sup => full.sup().sign() <= 0,
        ConsType::Eq | ConsType::EqMod => !full.contains_zero(),
        ConsType::DisEq => full.is_zero(),
    }
}

// For an integer `x > q.inf` (or `x < q.sup` when `!lower`), move an integral bound one step
// inward.
fn strict_int(q: &Interval, lower: bool) -> Interval {
    let kind = q.kind();
    let one = Scalar::from_i64(kind, 1, Round::Nearest);
    if lower && q.inf().is_integer() {
        Interval::new(q.inf().add(&one, Round::Down), q.sup().clone())
    } else if !lower && q.sup().is_integer() {
        Interval::new(q.inf().clone(), q.sup().sub(&one, Round::Up))
    } else {
        q.clone()
    }
}

/// A hyperinterval: one interval per dimension.
#[derive(Clone, Debug)]
pub struct BoxValue {
    dim: Dimension,
    itvs: Vec<Interval>,
    empty: bool,
}

impl BoxValue {
    /// Construct a box from the bounds of each dimension. If any bound is empty the whole box is.
    ///
    /// # Panics
    /// Panics if `itvs` does not hold one interval per dimension.
    ///
    /// # Examples
    /// ```
    /// # use numdom::Dimension;
    /// # use numdom::num::Interval;
    /// # use numdom::numerical::BoxValue;
    /// let b = BoxValue::from_vec(Dimension::new(0, 2),
    ///     vec![Interval::of_doubles(0., 1.), Interval::of_doubles(2., 1.)]);
    /// assert!(b.is_empty());
    /// ```
    pub fn from_vec(dim: Dimension, itvs: Vec<Interval>) -> BoxValue {
        if itvs.len() != dim.size() {
            panic!("Mismatched dimensionality in BoxValue::from_vec");
        }
        if itvs.iter().any(|i| i.is_bottom()) {
            let kind = itvs[0].kind();
            return BoxValue::empty(dim, kind);
        }
        BoxValue {
            dim,
            itvs,
            empty: false,
        }
    }

    fn empty(dim: Dimension, kind: ScalarKind) -> BoxValue {
        BoxValue {
            dim,
            itvs: vec![Interval::bottom(kind); dim.size()],
            empty: true,
        }
    }

    /// The bounds of each dimension.
    pub fn bounds(&self) -> &[Interval] {
        &self.itvs
    }

    /// Whether the box holds no point.
    pub fn is_empty(&self) -> bool {
        self.empty
    }
}

impl PartialEq for BoxValue {
    fn eq(&self, other: &BoxValue) -> bool {
        self.dim == other.dim && ((self.empty && other.empty) || self.itvs == other.itvs)
    }
}

impl DomainBackend for BoxDomain {
    type Value = BoxValue;

    fn library(&self) -> &str {
        "box"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn scalar_kind(&self) -> ScalarKind {
        self.kind
    }

    fn top(&self, _ctx: &mut OpContext, dim: Dimension) -> BoxValue {
        BoxValue {
            dim,
            itvs: vec![Interval::top(self.kind); dim.size()],
            empty: false,
        }
    }

    fn bottom(&self, _ctx: &mut OpContext, dim: Dimension) -> BoxValue {
        BoxValue::empty(dim, self.kind)
    }

    fn of_box(&self, _ctx: &mut OpContext, dim: Dimension, itvs: &[Interval]) -> BoxValue {
        if itvs.len() != dim.size() {
            panic!("Mismatched dimensionality in BoxDomain::of_box");
        }
        if itvs.iter().any(|i| i.is_bottom()) {
            return BoxValue::empty(dim, self.kind);
        }
        let fitted = itvs
            .iter()
            .enumerate()
            .map(|(d, i)| self.fit(i, dim.is_int(d as Dim)))
            .collect();
        BoxValue::from_vec(dim, fitted)
    }

    fn dimension(&self, v: &BoxValue) -> Dimension {
        v.dim
    }

    fn is_bottom(&self, _ctx: &mut OpContext, v: &BoxValue) -> bool {
        v.empty
    }

    fn is_top(&self, _ctx: &mut OpContext, v: &BoxValue) -> bool {
        !v.empty && v.itvs.iter().all(|i| i.is_top())
    }

    fn is_leq(&self, _ctx: &mut OpContext, a: &BoxValue, b: &BoxValue) -> bool {
        if a.dim != b.dim {
            panic!("Mismatched dimensionality in BoxDomain::is_leq");
        }
        if a.empty {
            return true;
        }
        if b.empty {
            return false;
        }
        a.itvs.iter().zip(b.itvs.iter()).all(|(x, y)| x.is_leq(y))
    }

    fn bound_dimension(&self, _ctx: &mut OpContext, v: &BoxValue, d: Dim) -> Interval {
        if d as usize >= v.itvs.len() {
            panic!("Dimension too high in BoxDomain::bound_dimension");
        }
        v.itvs[d as usize].clone()
    }

    fn to_box(&self, _ctx: &mut OpContext, v: &BoxValue) -> Vec<Interval> {
        v.itvs.clone()
    }

    fn to_lincons(&self, _ctx: &mut OpContext, v: &BoxValue) -> Vec<Lincons0> {
        if v.empty {
            return vec![Lincons0::unsat()];
        }
        let mut out = Vec::new();
        for (d, itv) in v.itvs.iter().enumerate() {
            let d = d as Dim;
            if itv.is_point() {
                let e = LinExpr0::from_terms(
                    vec![(d, self.one())],
                    Coeff::Scalar(itv.inf().neg()),
                );
                out.push(Lincons0::new(ConsType::Eq, e));
                continue;
            }
            if !itv.inf().is_infty() {
                let e = LinExpr0::from_terms(
                    vec![(d, self.one())],
                    Coeff::Scalar(itv.inf().neg()),
                );
                out.push(Lincons0::new(ConsType::SupEq, e));
            }
            if !itv.sup().is_infty() {
                let e = LinExpr0::from_terms(
                    vec![(d, self.one().neg())],
                    Coeff::Scalar(itv.sup().clone()),
                );
                out.push(Lincons0::new(ConsType::SupEq, e));
            }
        }
        out
    }

    fn meet(&self, _ctx: &mut OpContext, a: &BoxValue, b: &BoxValue) -> BoxValue {
        if a.dim != b.dim {
            panic!("Mismatched dimensionality in BoxDomain::meet");
        }
        if a.empty || b.empty {
            return BoxValue::empty(a.dim, self.kind);
        }
        BoxValue::from_vec(
            a.dim,
            a.itvs
                .iter()
                .zip(b.itvs.iter())
                .map(|(x, y)| x.meet(y))
                .collect(),
        )
    }

    fn meet_lincons(&self, ctx: &mut OpContext, v: &BoxValue, cs: &[Lincons0]) -> BoxValue {
        self.propagate(ctx, v, cs)
    }

    fn join(&self, ctx: &mut OpContext, a: &BoxValue, b: &BoxValue) -> BoxValue {
        if a.dim != b.dim {
            panic!("Mismatched dimensionality in BoxDomain::join");
        }
        if a.empty {
            return b.clone();
        }
        if b.empty {
            return a.clone();
        }
        if !self.is_leq(ctx, a, b) && !self.is_leq(ctx, b, a) {
            ctx.inexact();
        }
        BoxValue::from_vec(
            a.dim,
            a.itvs
                .iter()
                .zip(b.itvs.iter())
                .map(|(x, y)| x.join(y))
                .collect(),
        )
    }

    fn widening(&self, _ctx: &mut OpContext, a: &BoxValue, b: &BoxValue) -> BoxValue {
        if a.dim != b.dim {
            panic!("Mismatched dimensionality in BoxDomain::widening");
        }
        if a.empty {
            return b.clone();
        }
        if b.empty {
            return a.clone();
        }
        BoxValue::from_vec(
            a.dim,
            a.itvs
                .iter()
                .zip(b.itvs.iter())
                .map(|(x, y)| x.widening(y))
                .collect(),
        )
    }

    fn add_dimensions(
        &self,
        _ctx: &mut OpContext,
        v: &BoxValue,
        dc: &DimChange,
        project: bool,
    ) -> BoxValue {
        let dim = Dimension::new(v.dim.intdim + dc.intdim, v.dim.realdim + dc.realdim);
        if v.empty {
            return BoxValue::empty(dim, self.kind);
        }
        let fill = if project {
            self.zero_point()
        } else {
            Interval::top(self.kind)
        };
        BoxValue::from_vec(dim, dc.insert_into(&v.itvs, || fill.clone()))
    }

    fn remove_dimensions(&self, _ctx: &mut OpContext, v: &BoxValue, dc: &DimChange) -> BoxValue {
        if dc.dims.iter().any(|d| *d as usize >= v.dim.size()) {
            panic!("Attempting to remove too high a dimension in BoxDomain::remove_dimensions");
        }
        let dim = Dimension::new(v.dim.intdim - dc.intdim, v.dim.realdim - dc.realdim);
        if v.empty {
            return BoxValue::empty(dim, self.kind);
        }
        BoxValue::from_vec(dim, dc.remove_from(&v.itvs))
    }

    fn permute_dimensions(&self, _ctx: &mut OpContext, v: &BoxValue, perm: &DimPerm) -> BoxValue {
        if v.empty {
            return v.clone();
        }
        BoxValue::from_vec(v.dim, perm.permute(&v.itvs))
    }

    fn forget(&self, _ctx: &mut OpContext, v: &BoxValue, dims: &[Dim], project: bool) -> BoxValue {
        if v.empty {
            return v.clone();
        }
        let mut ret = v.clone();
        for d in dims {
            if *d as usize >= ret.itvs.len() {
                panic!("Dimension too high in BoxDomain::forget");
            }
            ret.itvs[*d as usize] = if project {
                self.zero_point()
            } else {
                Interval::top(self.kind)
            };
        }
        ret
    }

    fn assign_linexpr_array(
        &self,
        ctx: &mut OpContext,
        v: &BoxValue,
        dims: &[Dim],
        exprs: &[LinExpr0],
    ) -> BoxValue {
        if dims.len() != exprs.len() {
            panic!("Mismatched lengths in BoxDomain::assign_linexpr_array");
        }
        if v.empty {
            return v.clone();
        }
        let mut itvs = v.itvs.clone();
        for (d, e) in dims.iter().zip(exprs.iter()) {
            if *d as usize >= itvs.len() {
                panic!("Dimension too high in BoxDomain::assign_linexpr_array");
            }
            if e.nonzero().count() > 1 || !e.is_linear() {
                ctx.inexact();
            }
            itvs[*d as usize] = self.fit(&e.eval(&v.itvs, self.kind), v.dim.is_int(*d));
        }
        BoxValue::from_vec(v.dim, itvs)
    }

    fn assign_texpr_array(
        &self,
        ctx: &mut OpContext,
        v: &BoxValue,
        dims: &[Dim],
        trees: &[Tree],
    ) -> BoxValue {
        if dims.len() != trees.len() {
            panic!("Mismatched lengths in BoxDomain::assign_texpr_array");
        }
        if v.empty {
            return v.clone();
        }
        let mut itvs = v.itvs.clone();
        for (d, t) in dims.iter().zip(trees.iter()) {
            if *d as usize >= itvs.len() {
                panic!("Dimension too high in BoxDomain::assign_texpr_array");
            }
            let single = t
                .to_linexpr0()
                .map(|e| e.nonzero().count() <= 1 && e.is_linear())
                .unwrap_or(false);
            if !single {
                ctx.inexact();
            }
            itvs[*d as usize] = self.fit(&t.eval(&v.itvs, self.kind), v.dim.is_int(*d));
        }
        BoxValue::from_vec(v.dim, itvs)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::manager::{FunId, FunOpt};

    fn ctx() -> OpContext {
        OpContext::new(FunId::Unknown, FunOpt::default())
    }

    fn dom() -> BoxDomain {
        BoxDomain::double()
    }

    fn itv(l: f64, u: f64) -> Interval {
        Interval::of_doubles(l, u)
    }

    fn real(itvs: Vec<Interval>) -> BoxValue {
        BoxValue::from_vec(Dimension::new(0, itvs.len()), itvs)
    }

    // x^T coeffs <= cst
    fn le(coeffs: &[f64], cst: f64) -> Lincons0 {
        let e = LinExpr0::from_terms(
            coeffs
                .iter()
                .enumerate()
                .map(|(d, c)| (d as Dim, Coeff::double(-c))),
            Coeff::double(cst),
        );
        Lincons0::new(ConsType::SupEq, e)
    }

    fn itv1() -> BoxValue {
        real(vec![
            itv(f64::NEG_INFINITY, 2.),
            itv(1., f64::INFINITY),
            itv(0., 4.),
        ])
    }

    fn itv3() -> BoxValue {
        real(vec![itv(1., 3.), itv(1., 4.), itv(0., 4.)])
    }

    fn top3() -> BoxValue {
        dom().top(&mut ctx(), Dimension::new(0, 3))
    }

    fn bottom3() -> BoxValue {
        dom().bottom(&mut ctx(), Dimension::new(0, 3))
    }

    #[test]
    fn top_is_top() {
        let a = top3();
        assert!(dom().is_top(&mut ctx(), &a));
        assert!(!dom().is_bottom(&mut ctx(), &a));
        assert!(!dom().is_top(&mut ctx(), &itv1()));
    }

    #[test]
    fn bottom_is_bottom() {
        let b = bottom3();
        assert!(dom().is_bottom(&mut ctx(), &b));
        assert!(!dom().is_top(&mut ctx(), &b));
        assert!(!dom().is_bottom(&mut ctx(), &itv1()));
    }

    #[test]
    fn is_bottom_empty_dimension() {
        let unsat = real(vec![itv(f64::NEG_INFINITY, 2.), itv(1., 0.), itv(0., 4.)]);
        assert!(dom().is_bottom(&mut ctx(), &unsat));
    }

    #[test]
    fn top_join_any_is_top() {
        let d = dom();
        assert!(d.is_top(&mut ctx(), &d.join(&mut ctx(), &top3(), &bottom3())));
        assert!(d.is_top(&mut ctx(), &d.join(&mut ctx(), &top3(), &itv1())));
    }

    #[test]
    fn top_meet_other() {
        let d = dom();
        assert_eq!(d.meet(&mut ctx(), &top3(), &bottom3()), bottom3());
        assert_eq!(d.meet(&mut ctx(), &top3(), &itv1()), itv1());
    }

    #[test]
    fn bottom_join_other() {
        let d = dom();
        assert_eq!(d.join(&mut ctx(), &bottom3(), &top3()), top3());
        assert_eq!(d.join(&mut ctx(), &bottom3(), &itv1()), itv1());
    }

    #[test]
    fn join_normal() {
        let c = real(vec![
            itv(f64::NEG_INFINITY, 3.),
            itv(1., f64::INFINITY),
            itv(0., 4.),
        ]);
        let mut ctx = ctx();
        assert_eq!(dom().join(&mut ctx, &itv1(), &itv3()), c);
        assert!(!ctx.is_exact());
    }

    #[test]
    fn meet_normal() {
        let c = real(vec![itv(1., 2.), itv(1., 4.), itv(0., 4.)]);
        assert_eq!(dom().meet(&mut ctx(), &itv1(), &itv3()), c);
    }

    #[test]
    fn widening_jumps_to_infinity() {
        let a = real(vec![itv(0., 1.), itv(0., 1.)]);
        let b = real(vec![itv(0., 2.), itv(-1., 1.)]);
        let w = dom().widening(&mut ctx(), &a, &b);
        assert_eq!(
            w,
            real(vec![itv(0., f64::INFINITY), itv(f64::NEG_INFINITY, 1.)])
        );
    }

    #[test]
    fn remove_dims_normal() {
        let dc = DimChange::new(vec![0, 1], 0, 2);
        let r = dom().remove_dimensions(&mut ctx(), &itv1(), &dc);
        assert_eq!(dom().dimension(&r).size(), 1);
        assert_eq!(r, real(vec![itv(0., 4.)]));
    }

    #[test]
    fn add_dims_project() {
        let dc = DimChange::new(vec![1], 0, 1);
        let r = dom().add_dimensions(&mut ctx(), &itv3(), &dc, true);
        assert_eq!(
            r,
            real(vec![itv(1., 3.), itv(0., 0.), itv(1., 4.), itv(0., 4.)])
        );
    }

    #[test]
    fn assign_zero_gives_zero() {
        let zero = LinExpr0::sparse();
        let c = real(vec![itv(0., 0.), itv(1., f64::INFINITY), itv(0., 4.)]);
        assert_eq!(dom().assign_linexpr_array(&mut ctx(), &itv1(), &[0], &[zero]), c);
    }

    #[test]
    fn assign_unbounded() {
        let sum = LinExpr0::from_terms(
            vec![
                (0, Coeff::double(1.)),
                (1, Coeff::double(1.)),
                (2, Coeff::double(1.)),
            ],
            Coeff::double(0.),
        );
        let c = real(vec![
            Interval::top(ScalarKind::Double),
            itv(1., f64::INFINITY),
            itv(0., 4.),
        ]);
        assert_eq!(
            dom().assign_linexpr_array(&mut ctx(), &itv1(), &[0], &[sum.clone()]),
            c
        );
        let all = dom().assign_linexpr_array(
            &mut ctx(),
            &itv1(),
            &[0, 1, 2],
            &[sum.clone(), sum.clone(), sum],
        );
        assert!(dom().is_top(&mut ctx(), &all));
    }

    #[test]
    fn assign_normal() {
        let e = LinExpr0::from_terms(
            vec![(0, Coeff::double(1.)), (2, Coeff::double(1.))],
            Coeff::double(2.),
        );
        let c = real(vec![
            itv(f64::NEG_INFINITY, 8.),
            itv(1., f64::INFINITY),
            itv(0., 4.),
        ]);
        assert_eq!(dom().assign_linexpr_array(&mut ctx(), &itv1(), &[0], &[e]), c);
        let n = LinExpr0::from_terms(
            vec![(1, Coeff::double(-1.)), (2, Coeff::double(-1.))],
            Coeff::double(-1.),
        );
        let d = real(vec![
            itv(f64::NEG_INFINITY, -2.),
            itv(1., f64::INFINITY),
            itv(0., 4.),
        ]);
        assert_eq!(dom().assign_linexpr_array(&mut ctx(), &itv1(), &[0], &[n]), d);
    }

    #[test]
    fn constrain_unsat() {
        let c = le(&[0., 0., 0.], -1.);
        let r = dom().meet_lincons(&mut ctx(), &itv1(), &[c]);
        assert!(dom().is_bottom(&mut ctx(), &r));
    }

    #[test]
    fn constrain_no_constraints() {
        assert_eq!(dom().meet_lincons(&mut ctx(), &itv1(), &[]), itv1());
    }

    #[test]
    fn constrain_normal() {
        let lc1 = le(&[1., 0., 0.], 1.);
        let lc2 = vec![le(&[0., 0., -1.], -1.), le(&[1., 1., 0.], 1.)];
        let itv4 = real(vec![itv(0., 2.), itv(0., 2.), itv(0., 2.)]);
        let res1 = real(vec![itv(1., 1.), itv(1., 4.), itv(0., 4.)]);
        let res2 = real(vec![itv(0., 1.), itv(0., 1.), itv(1., 2.)]);
        assert_eq!(dom().meet_lincons(&mut ctx(), &itv3(), &[lc1]), res1);
        assert_eq!(dom().meet_lincons(&mut ctx(), &itv4, &lc2), res2);
    }

    #[test]
    fn constrain_integer_strict() {
        let d = BoxDomain::mpq();
        let dim = Dimension::new(1, 0);
        let top = d.top(&mut ctx(), dim);
        // x0 - 1 > 0
        let e = LinExpr0::from_terms(vec![(0, Coeff::mpq(1, 1))], Coeff::mpq(-1, 1));
        let r = d.meet_lincons(&mut ctx(), &top, &[Lincons0::new(ConsType::Sup, e)]);
        assert_eq!(
            d.bound_dimension(&mut ctx(), &r, 0),
            Interval::of_mpq(crate::num::Mpq::new(2, 1), crate::num::Mpq::PosInf)
        );
        // 2·x0 - 1 >= 0
        let h = LinExpr0::from_terms(vec![(0, Coeff::mpq(2, 1))], Coeff::mpq(-1, 1));
        let r = d.meet_lincons(&mut ctx(), &top, &[Lincons0::new(ConsType::SupEq, h)]);
        assert_eq!(
            d.bound_dimension(&mut ctx(), &r, 0).inf(),
            &Scalar::mpq(1, 1)
        );
    }

    #[test]
    fn constrain_equality_point() {
        let d = BoxDomain::mpq();
        let dim = Dimension::new(0, 2);
        let b = d.of_box(
            &mut ctx(),
            dim,
            &[
                Interval::of_rationals(-5, 2, 0, 1),
                Interval::of_rationals(0, 1, 5, 2),
            ],
        );
        // x0 - x1 = 0
        let e = LinExpr0::from_terms(
            vec![(0, Coeff::mpq(1, 1)), (1, Coeff::mpq(-1, 1))],
            Coeff::mpq(0, 1),
        );
        let mut c = ctx();
        let r = d.meet_lincons(&mut c, &b, &[Lincons0::new(ConsType::Eq, e)]);
        assert!(!c.is_exact());
        assert_eq!(
            d.to_box(&mut ctx(), &r),
            vec![Interval::of_rationals(0, 1, 0, 1); 2]
        );
    }

    #[test]
    fn to_lincons_bounds() {
        let b = real(vec![itv(1., 1.), itv(0., f64::INFINITY), Interval::top(ScalarKind::Double)]);
        let cs: Vec<String> = dom()
            .to_lincons(&mut ctx(), &b)
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(cs, vec!["1.0·x0 - 1.0 == 0", "1.0·x1 + 0.0 >= 0"]);
        let e = dom().to_lincons(&mut ctx(), &bottom3());
        assert!(e[0].is_unsat());
    }

    #[test]
    fn texpr_assignment_is_direct() {
        let t = Tree::binary(
            crate::expr::TexprOp::Mul,
            Tree::dim(2),
            Tree::dim(2),
            crate::expr::RType::Real,
            crate::expr::RDir::Nearest,
        );
        let mut c = ctx();
        let r = dom().assign_texpr_array(&mut c, &itv1(), &[1], &[t]);
        assert_eq!(dom().bound_dimension(&mut ctx(), &r, 1), itv(0., 16.));
        assert!(!c.is_exact());
    }
}
