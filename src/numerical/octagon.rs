//! The octagon domain.
//!
//! An octagon bounds every sum and difference `±x_i ± x_j` of two dimensions. It is stored as a
//! difference bound matrix over `2n` nodes: node `2i` stands for `x_i` and node `2i+1` for
//! `-x_i`, and entry `(a, b)` bounds `v_a - v_b`. The matrix is coherent, so entry `(a, b)` and
//! entry `(bar(b), bar(a))` always hold the same bound. Entries are exact rationals or `+inf`.
//!
//! Most operations work on the strong closure of the matrix, where every entry is the tightest
//! bound implied by the others. Widening is the exception: its left argument is used as stored,
//! which is what makes iteration sequences stabilize.

use crate::constraint::{ConsType, Lincons0};
use crate::environment::{DimChange, DimPerm, Dimension};
use crate::expr::LinExpr0;
use crate::manager::OpContext;
use crate::num::{Coeff, Interval, Mpq, Scalar, ScalarKind};
use crate::numerical::{LinearConstraint, Relation};
use crate::var::Dim;
use crate::DomainBackend;
use log::{debug, trace};
use nalgebra::DMatrix;
use num_rational::BigRational;
use num_traits::{Signed, Zero};
use std::collections::BTreeMap;

/// The octagon backend, over exact rationals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OctagonDomain;

impl OctagonDomain {
    /// Create the backend.
    pub fn new() -> OctagonDomain {
        OctagonDomain
    }
}

/// The node standing for the opposite of node `a`.
fn bar(a: usize) -> usize {
    a ^ 1
}

// Sums of bounds only ever meet `+inf`, never `-inf`.
fn plus(a: &Mpq, b: &Mpq) -> Mpq {
    a.add(b).unwrap_or(Mpq::PosInf)
}

fn half(a: &Mpq) -> Mpq {
    a.mul(&Mpq::new(1, 2))
}

fn twice(a: &Mpq) -> Mpq {
    a.mul(&Mpq::new(2, 1))
}

// The node of dimension `d` with the given sign.
fn node(d: usize, positive: bool) -> usize {
    if positive {
        2 * d
    } else {
        2 * d + 1
    }
}

/// An octagon over a space of dimensions.
#[derive(Clone, Debug)]
pub struct Octagon {
    dim: Dimension,
    m: DMatrix<Mpq>,
    closed: bool,
    empty: bool,
    // Set on widening results, which must not be closed before the next widening.
    widened: bool,
}

impl Octagon {
    fn unconstrained(dim: Dimension) -> Octagon {
        let n = 2 * dim.size();
        Octagon {
            dim,
            m: DMatrix::from_fn(n, n, |i, j| if i == j { Mpq::zero() } else { Mpq::PosInf }),
            closed: true,
            empty: false,
            widened: false,
        }
    }

    fn empty(dim: Dimension) -> Octagon {
        let mut o = Octagon::unconstrained(dim);
        o.empty = true;
        o
    }

    fn nodes(&self) -> usize {
        self.m.nrows()
    }

    fn is_int_node(&self, a: usize) -> bool {
        self.dim.is_int((a / 2) as Dim)
    }

    /// The bound on `v_a - v_b`.
    ///
    /// # Panics
    /// Panics if either node is out of range.
    pub fn entry(&self, a: usize, b: usize) -> &Mpq {
        &self.m[(a, b)]
    }

    /// Whether the matrix is known to be strongly closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether the octagon is known to be empty. An octagon that is not closed may be empty
    /// without knowing it.
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    // Lower entry `(a, b)` and its coherent twin to at most `c`.
    fn tighten(&mut self, a: usize, b: usize, c: &Mpq) {
        for (x, y) in [(a, b), (bar(b), bar(a))].iter() {
            if *c < self.m[(*x, *y)] {
                self.m[(*x, *y)] = c.clone();
                self.closed = false;
            }
        }
    }

    fn upper(&self, k: usize) -> Mpq {
        half(&self.m[(2 * k, 2 * k + 1)])
    }

    fn lower(&self, k: usize) -> Mpq {
        half(&self.m[(2 * k + 1, 2 * k)]).neg()
    }

    fn bounds(&self) -> Vec<Interval> {
        if self.empty {
            return vec![Interval::bottom(ScalarKind::Mpq); self.dim.size()];
        }
        (0..self.dim.size())
            .map(|k| Interval::of_mpq(self.lower(k), self.upper(k)))
            .collect()
    }

    /// Compute the strong closure in place. Integer dimensions get the tight closure: unary
    /// bounds are rounded to even values before strengthening.
    fn close(&mut self, ctx: &mut OpContext) {
        if self.closed || self.empty {
            return;
        }
        let n = self.nodes();
        for k in 0..n {
            if ctx.timed_out() {
                debug!("Octagon closure interrupted at pivot {} of {}", k, n);
                return;
            }
            for i in 0..n {
                let ik = self.m[(i, k)].clone();
                if ik == Mpq::PosInf {
                    continue;
                }
                for j in 0..n {
                    let through = plus(&ik, &self.m[(k, j)]);
                    if through < self.m[(i, j)] {
                        self.m[(i, j)] = through;
                    }
                }
            }
        }
        if (0..n).any(|i| self.m[(i, i)].sign() < 0) {
            self.empty = true;
            return;
        }
        for i in 0..n {
            if !self.is_int_node(i) {
                continue;
            }
            for j in 0..n {
                if self.is_int_node(j) {
                    self.m[(i, j)] = self.m[(i, j)].floor();
                }
            }
            let b = bar(i);
            self.m[(i, b)] = twice(&half(&self.m[(i, b)]).floor());
        }
        for i in 0..n {
            for j in 0..n {
                let s = half(&plus(&self.m[(i, bar(i))], &self.m[(bar(j), j)]));
                if s < self.m[(i, j)] {
                    self.m[(i, j)] = s;
                }
            }
        }
        for i in 0..n {
            let loop_bound = plus(&self.m[(i, bar(i))], &self.m[(bar(i), i)]);
            if self.m[(i, i)].sign() < 0 || loop_bound.sign() < 0 {
                self.empty = true;
                return;
            }
            self.m[(i, i)] = Mpq::zero();
        }
        trace!("Closed an octagon over {} nodes", n);
        self.closed = true;
        self.widened = false;
    }

    fn closed_copy(&self, ctx: &mut OpContext) -> Octagon {
        let mut o = self.clone();
        o.close(ctx);
        o
    }

    // Add `sign · (x^T coeffs) <= sign · cst`. Constraints that are not octagonal are replaced by
    // the octagonal constraints their terms imply over `bounds`.
    fn add_constraint(
        &mut self,
        ctx: &mut OpContext,
        lc: &LinearConstraint,
        negate: bool,
        bounds: &[Interval],
    ) {
        let flip = |r: &BigRational| if negate { -r } else { r.clone() };
        let nz: Vec<(usize, BigRational)> = lc
            .coeffs()
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_zero())
            .map(|(d, c)| (d, flip(c)))
            .collect();
        let cst = flip(lc.cst());
        match nz.len() {
            0 => (),
            1 => {
                let (k, a) = &nz[0];
                let p = node(*k, a.is_positive());
                self.tighten(p, bar(p), &Mpq::Finite(&cst / a.abs() * BigRational::from_integer(2.into())));
            }
            2 if nz[0].1.abs() == nz[1].1.abs() => {
                let (i, a) = &nz[0];
                let (j, b) = &nz[1];
                let p = node(*i, a.is_positive());
                let q = node(*j, !b.is_positive());
                self.tighten(p, q, &Mpq::Finite(&cst / a.abs()));
            }
            _ => {
                ctx.inexact();
                self.add_implied(&nz, &cst, bounds);
            }
        }
    }

    // For `sum a_k x_k <= cst`, bound each `a_k x_k`, and each `a_k x_k + a_l x_l` with
    // `|a_k| = |a_l|`, by moving the other terms to their lowest value over `bounds`.
    fn add_implied(&mut self, nz: &[(usize, BigRational)], cst: &BigRational, bounds: &[Interval]) {
        let low: Vec<Mpq> = nz
            .iter()
            .map(|(d, a)| {
                let b = &bounds[*d];
                let x = if a.is_positive() { b.inf() } else { b.sup() };
                x.to_mpq().mul(&Mpq::Finite(a.clone()))
            })
            .collect();
        let rest = |skip: &[usize]| -> Option<BigRational> {
            let mut acc = Mpq::zero();
            for (k, x) in low.iter().enumerate() {
                if !skip.contains(&k) {
                    acc = acc.add(x)?;
                }
            }
            acc.finite().cloned()
        };
        for k in 0..nz.len() {
            if let Some(r) = rest(&[k]) {
                let (d, a) = &nz[k];
                let c = (cst - r) / a.abs();
                let p = node(*d, a.is_positive());
                self.tighten(p, bar(p), &Mpq::Finite(c * BigRational::from_integer(2.into())));
            }
            for l in k + 1..nz.len() {
                if nz[k].1.abs() != nz[l].1.abs() {
                    continue;
                }
                if let Some(r) = rest(&[k, l]) {
                    let (i, a) = &nz[k];
                    let (j, b) = &nz[l];
                    let c = (cst - r) / a.abs();
                    self.tighten(node(*i, a.is_positive()), node(*j, !b.is_positive()), &Mpq::Finite(c));
                }
            }
        }
    }

    // The linear constraint `v_a - v_b <= m[a][b]`, as `m[a][b] - v_a + v_b >= 0`.
    fn entry_constraint(&self, a: usize, b: usize) -> Option<Lincons0> {
        let c = self.m[(a, b)].finite()?;
        let mut terms: BTreeMap<Dim, BigRational> = BTreeMap::new();
        let one = BigRational::from_integer(1.into());
        for (x, s) in [(a, -1), (b, 1)].iter() {
            let sign = if x % 2 == 0 { *s } else { -*s };
            let e = terms.entry((x / 2) as Dim).or_insert_with(BigRational::zero);
            *e += BigRational::from_integer(sign.into());
        }
        let scale = if b == bar(a) {
            BigRational::new(1.into(), 2.into())
        } else {
            one
        };
        let e = LinExpr0::from_terms(
            terms
                .into_iter()
                .filter(|(_, k)| !k.is_zero())
                .map(|(d, k)| (d, Coeff::Scalar(Scalar::Mpq(Mpq::Finite(k * &scale))))),
            Coeff::Scalar(Scalar::Mpq(Mpq::Finite(c * &scale))),
        );
        Some(Lincons0::new(ConsType::SupEq, e))
    }
}

impl DomainBackend for OctagonDomain {
    type Value = Octagon;

    fn library(&self) -> &str {
        "oct"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn scalar_kind(&self) -> ScalarKind {
        ScalarKind::Mpq
    }

    fn top(&self, _ctx: &mut OpContext, dim: Dimension) -> Octagon {
        Octagon::unconstrained(dim)
    }

    fn bottom(&self, _ctx: &mut OpContext, dim: Dimension) -> Octagon {
        Octagon::empty(dim)
    }

    fn of_box(&self, _ctx: &mut OpContext, dim: Dimension, itvs: &[Interval]) -> Octagon {
        if itvs.len() != dim.size() {
            panic!("Mismatched dimensionality in OctagonDomain::of_box");
        }
        let mut o = Octagon::unconstrained(dim);
        for (k, itv) in itvs.iter().enumerate() {
            let itv = itv.convert(ScalarKind::Mpq);
            if itv.is_bottom() {
                return Octagon::empty(dim);
            }
            let (mut lo, mut hi) = (itv.inf().to_mpq(), itv.sup().to_mpq());
            if dim.is_int(k as Dim) {
                lo = lo.ceil();
                hi = hi.floor();
            }
            o.tighten(2 * k, 2 * k + 1, &twice(&hi));
            o.tighten(2 * k + 1, 2 * k, &twice(&lo.neg()));
        }
        o
    }

    fn dimension(&self, v: &Octagon) -> Dimension {
        v.dim
    }

    fn is_bottom(&self, ctx: &mut OpContext, v: &Octagon) -> bool {
        v.closed_copy(ctx).empty
    }

    fn is_top(&self, ctx: &mut OpContext, v: &Octagon) -> bool {
        let o = v.closed_copy(ctx);
        let n = o.nodes();
        !o.empty && (0..n).all(|i| (0..n).all(|j| i == j || o.m[(i, j)] == Mpq::PosInf))
    }

    fn is_leq(&self, ctx: &mut OpContext, a: &Octagon, b: &Octagon) -> bool {
        if a.dim != b.dim {
            panic!("Mismatched dimensionality in OctagonDomain::is_leq");
        }
        let a = a.closed_copy(ctx);
        if a.empty {
            return true;
        }
        if b.empty {
            return false;
        }
        a.m.iter().zip(b.m.iter()).all(|(x, y)| x <= y)
    }

    fn bound_dimension(&self, ctx: &mut OpContext, v: &Octagon, d: Dim) -> Interval {
        let o = v.closed_copy(ctx);
        if o.empty {
            return Interval::bottom(ScalarKind::Mpq);
        }
        Interval::of_mpq(o.lower(d as usize), o.upper(d as usize))
    }

    fn bound_linexpr(&self, ctx: &mut OpContext, v: &Octagon, e: &LinExpr0) -> Interval {
        let o = v.closed_copy(ctx);
        if o.empty {
            return Interval::bottom(ScalarKind::Mpq);
        }
        let direct = e.eval(&o.bounds(), ScalarKind::Mpq);
        let terms = e
            .nonzero()
            .map(|(d, k)| {
                k.as_scalar()
                    .and_then(|s| s.to_rational())
                    .map(|r| (d as usize, r))
            })
            .collect::<Option<Vec<_>>>();
        // Only `k (+-x_i +-x_j) + c` reads a matrix entry directly.
        let (i, ki, j, kj) = match terms.as_deref() {
            Some([(i, ki), (j, kj)]) if ki.abs() == kj.abs() => (*i, ki, *j, kj),
            _ => return direct,
        };
        let scale = Mpq::Finite(ki.abs());
        let up = o.m[(node(i, ki.is_positive()), node(j, kj.is_negative()))].mul(&scale);
        let down = o.m[(node(i, ki.is_negative()), node(j, kj.is_positive()))]
            .mul(&scale)
            .neg();
        let rel = Interval::of_mpq(down, up).add(&e.cst().to_interval_of(ScalarKind::Mpq));
        direct.meet(&rel)
    }

    fn to_box(&self, ctx: &mut OpContext, v: &Octagon) -> Vec<Interval> {
        v.closed_copy(ctx).bounds()
    }

    fn to_lincons(&self, ctx: &mut OpContext, v: &Octagon) -> Vec<Lincons0> {
        let o = v.closed_copy(ctx);
        if o.empty {
            return vec![Lincons0::unsat()];
        }
        let n = o.nodes();
        let mut out = Vec::new();
        for a in 0..n {
            for b in 0..n {
                if a == b || (a, b) > (bar(b), bar(a)) {
                    continue;
                }
                out.extend(o.entry_constraint(a, b));
            }
        }
        out
    }

    fn meet(&self, _ctx: &mut OpContext, a: &Octagon, b: &Octagon) -> Octagon {
        if a.dim != b.dim {
            panic!("Mismatched dimensionality in OctagonDomain::meet");
        }
        if a.empty || b.empty {
            return Octagon::empty(a.dim);
        }
        let n = a.nodes();
        Octagon {
            dim: a.dim,
            m: DMatrix::from_fn(n, n, |i, j| {
                if b.m[(i, j)] < a.m[(i, j)] {
                    b.m[(i, j)].clone()
                } else {
                    a.m[(i, j)].clone()
                }
            }),
            closed: false,
            empty: false,
            widened: false,
        }
    }

    fn meet_lincons(&self, ctx: &mut OpContext, v: &Octagon, cs: &[Lincons0]) -> Octagon {
        let mut o = v.closed_copy(ctx);
        if o.empty {
            return o;
        }
        let bounds = o.bounds();
        let mut pending = Vec::new();
        for c in cs {
            match LinearConstraint::relax(c, &bounds, o.dim, ctx) {
                Some(lcs) => pending.extend(lcs),
                None => return Octagon::empty(o.dim),
            }
        }
        for lc in pending.iter() {
            match lc.relation() {
                Relation::Le => o.add_constraint(ctx, lc, false, &bounds),
                Relation::Lt => {
                    ctx.inexact();
                    o.add_constraint(ctx, lc, false, &bounds);
                }
                Relation::Eq => {
                    o.add_constraint(ctx, lc, false, &bounds);
                    o.add_constraint(ctx, lc, true, &bounds);
                }
            }
        }
        o.close(ctx);
        o
    }

    fn join(&self, ctx: &mut OpContext, a: &Octagon, b: &Octagon) -> Octagon {
        if a.dim != b.dim {
            panic!("Mismatched dimensionality in OctagonDomain::join");
        }
        let x = a.closed_copy(ctx);
        let y = b.closed_copy(ctx);
        if x.empty {
            return y;
        }
        if y.empty {
            return x;
        }
        if !self.is_leq(ctx, &x, &y) && !self.is_leq(ctx, &y, &x) {
            ctx.inexact();
        }
        let n = x.nodes();
        Octagon {
            dim: x.dim,
            m: DMatrix::from_fn(n, n, |i, j| {
                if y.m[(i, j)] > x.m[(i, j)] {
                    y.m[(i, j)].clone()
                } else {
                    x.m[(i, j)].clone()
                }
            }),
            closed: x.closed && y.closed,
            empty: false,
            widened: false,
        }
    }

    fn widening(&self, ctx: &mut OpContext, a: &Octagon, b: &Octagon) -> Octagon {
        if a.dim != b.dim {
            panic!("Mismatched dimensionality in OctagonDomain::widening");
        }
        let x = if a.widened {
            a.clone()
        } else {
            a.closed_copy(ctx)
        };
        if x.empty {
            return b.clone();
        }
        let y = b.closed_copy(ctx);
        if y.empty {
            return x;
        }
        let n = x.nodes();
        Octagon {
            dim: x.dim,
            m: DMatrix::from_fn(n, n, |i, j| {
                if y.m[(i, j)] <= x.m[(i, j)] {
                    x.m[(i, j)].clone()
                } else {
                    Mpq::PosInf
                }
            }),
            closed: false,
            empty: false,
            widened: true,
        }
    }

    fn add_dimensions(
        &self,
        ctx: &mut OpContext,
        v: &Octagon,
        dc: &DimChange,
        project: bool,
    ) -> Octagon {
        let dim = Dimension::new(v.dim.intdim + dc.intdim, v.dim.realdim + dc.realdim);
        let size = 2 * dim.size();
        if ctx.exceeds_size(size * size) {
            return Octagon::unconstrained(dim);
        }
        if v.empty {
            return Octagon::empty(dim);
        }
        let map = dc.add_map(v.dim.size());
        let at = |a: usize| 2 * map[a / 2] as usize + a % 2;
        let mut o = Octagon::unconstrained(dim);
        for a in 0..v.nodes() {
            for b in 0..v.nodes() {
                o.m[(at(a), at(b))] = v.m[(a, b)].clone();
            }
        }
        o.closed = v.closed;
        if project {
            for d in dc.added_dims() {
                let p = 2 * d as usize;
                o.m[(p, p + 1)] = Mpq::zero();
                o.m[(p + 1, p)] = Mpq::zero();
            }
            o.closed = false;
        }
        o
    }

    fn remove_dimensions(&self, ctx: &mut OpContext, v: &Octagon, dc: &DimChange) -> Octagon {
        if dc.dims.iter().any(|d| *d as usize >= v.dim.size()) {
            panic!("Attempting to remove too high a dimension in OctagonDomain::remove_dimensions");
        }
        let dim = Dimension::new(v.dim.intdim - dc.intdim, v.dim.realdim - dc.realdim);
        let o = v.closed_copy(ctx);
        if o.empty {
            return Octagon::empty(dim);
        }
        let map = dc.remove_map(v.dim.size());
        let mut r = Octagon::unconstrained(dim);
        for a in 0..o.nodes() {
            for b in 0..o.nodes() {
                if let (Some(x), Some(y)) = (map[a / 2], map[b / 2]) {
                    let na = 2 * x as usize + a % 2;
                    let nb = 2 * y as usize + b % 2;
                    r.m[(na, nb)] = o.m[(a, b)].clone();
                }
            }
        }
        r.closed = o.closed;
        r
    }

    fn permute_dimensions(&self, _ctx: &mut OpContext, v: &Octagon, perm: &DimPerm) -> Octagon {
        if perm.len() != v.dim.size() {
            panic!("Mismatched dimensionality in OctagonDomain::permute_dimensions");
        }
        let at = |a: usize| 2 * perm.apply((a / 2) as Dim) as usize + a % 2;
        let mut o = v.clone();
        for a in 0..v.nodes() {
            for b in 0..v.nodes() {
                o.m[(at(a), at(b))] = v.m[(a, b)].clone();
            }
        }
        o
    }

    fn forget(&self, ctx: &mut OpContext, v: &Octagon, dims: &[Dim], project: bool) -> Octagon {
        let mut o = v.closed_copy(ctx);
        if o.empty {
            return o;
        }
        let n = o.nodes();
        for d in dims {
            if *d as usize >= v.dim.size() {
                panic!("Dimension too high in OctagonDomain::forget");
            }
            let (p, q) = (2 * *d as usize, 2 * *d as usize + 1);
            for x in 0..n {
                for y in [p, q].iter() {
                    if x != *y {
                        o.m[(x, *y)] = Mpq::PosInf;
                        o.m[(*y, x)] = Mpq::PosInf;
                    }
                }
            }
            if project {
                o.m[(p, q)] = Mpq::zero();
                o.m[(q, p)] = Mpq::zero();
                o.closed = false;
            }
        }
        o
    }
}
