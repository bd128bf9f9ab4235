//! The convex polyhedra domain.
//!
//! A polyhedron is stored in constraint form as `a x <= b`, one row per constraint, over exact
//! rationals. When the backend allows strict inequalities a row may instead read `a x < b`.
//! Emptiness, inclusion, projection and bounds all reduce to Fourier-Motzkin elimination.

use crate::constraint::Lincons0;
use crate::environment::{DimChange, DimPerm, Dimension};
use crate::expr::LinExpr0;
use crate::manager::{FunId, FunOpt, OpContext};
use crate::num::{Interval, Mpq, ScalarKind};
use crate::numerical::{LinearConstraint, Relation};
use crate::var::Dim;
use crate::DomainBackend;
use log::{debug, trace};
use nalgebra::{DMatrix, DVector};
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use replace_with::replace_with_or_abort;
use std::collections::BTreeMap;

/// The polyhedra backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolyhedraDomain {
    strict: bool,
}

impl PolyhedraDomain {
    /// Closed polyhedra. Strict inequalities are relaxed to loose ones.
    pub fn loose() -> PolyhedraDomain {
        PolyhedraDomain { strict: false }
    }

    /// Not necessarily closed polyhedra, which keep strict inequalities.
    pub fn strict() -> PolyhedraDomain {
        PolyhedraDomain { strict: true }
    }

    /// Whether strict inequalities are kept.
    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

/// One constraint `coeffs . x <= cst`, or `<` when the flag is set.
type Row = (Vec<BigRational>, BigRational, bool);

fn bottom_row(n: usize) -> Row {
    (vec![BigRational::zero(); n], -BigRational::one(), false)
}

fn is_contradiction(r: &Row) -> bool {
    r.0.iter().all(Zero::is_zero) && (r.1.is_negative() || (r.2 && r.1.is_zero()))
}

fn negate(r: &Row) -> Row {
    (r.0.iter().map(|x| -x).collect(), -&r.1, !r.2)
}

/// Unit rows `e_d <= 0` and `-e_d <= 0`.
fn zero_rows(n: usize, d: usize) -> Vec<Row> {
    let mut up = vec![BigRational::zero(); n];
    up[d] = BigRational::one();
    let down: Vec<BigRational> = up.iter().map(|x| -x).collect();
    vec![(up, BigRational::zero(), false), (down, BigRational::zero(), false)]
}

/// Scale every row so that its first nonzero coefficient is `+-1`, keep only the tightest row
/// for each direction, and drop rows without variables. A contradictory row collapses the whole
/// system to a single `0 <= -1`.
fn tidy(rows: Vec<Row>) -> Vec<Row> {
    let n = rows.first().map(|r| r.0.len()).unwrap_or(0);
    let mut best: BTreeMap<Vec<BigRational>, (BigRational, bool)> = BTreeMap::new();
    for r in rows {
        if is_contradiction(&r) {
            return vec![bottom_row(n)];
        }
        let (c, b, s) = r;
        let pivot = match c.iter().find(|x| !x.is_zero()) {
            Some(p) => p.abs(),
            None => continue,
        };
        let c: Vec<BigRational> = c.iter().map(|x| x / &pivot).collect();
        let b = b / &pivot;
        let e = best.entry(c).or_insert_with(|| (b.clone(), s));
        if b < e.0 || (b == e.0 && s) {
            *e = (b, s);
        }
    }
    best.into_iter().map(|(c, (b, s))| (c, b, s)).collect()
}

/// Fourier-Motzkin elimination of one column. The result has one column less and describes the
/// projection of the input onto the remaining columns.
fn eliminate_column(rows: &[Row], col: usize) -> Vec<Row> {
    let drop = |r: &[BigRational]| -> Vec<BigRational> {
        r.iter()
            .enumerate()
            .filter(|(k, _)| *k != col)
            .map(|(_, x)| x.clone())
            .collect()
    };
    let mut out = Vec::new();
    for (i, (ri, bi, si)) in rows.iter().enumerate() {
        let ci = &ri[col];
        if ci.is_zero() {
            out.push((drop(ri), bi.clone(), *si));
            continue;
        }
        for (rj, bj, sj) in rows[i + 1..].iter() {
            let cj = &rj[col];
            if cj.is_zero() || ci.is_positive() == cj.is_positive() {
                continue;
            }
            let (ki, kj) = (cj.abs(), ci.abs());
            let comb: Vec<BigRational> = ri
                .iter()
                .zip(rj.iter())
                .map(|(x, y)| x * &ki + y * &kj)
                .collect();
            out.push((drop(&comb), bi * &ki + bj * &kj, *si || *sj));
        }
    }
    tidy(out)
}

/// The number of rows eliminating `col` would produce from pairs.
fn pair_count(rows: &[Row], col: usize) -> usize {
    let pos = rows.iter().filter(|r| r.0[col].is_positive()).count();
    let neg = rows.iter().filter(|r| r.0[col].is_negative()).count();
    pos * neg
}

/// Eliminate every column not marked in `keep`, cheapest column first. Returns `None` if the
/// operation ran out of time or space, in which case nothing is known about the projection.
fn project(ctx: &mut OpContext, rows: Vec<Row>, keep: &[bool]) -> Option<Vec<Row>> {
    let mut rows = tidy(rows);
    let mut keep = keep.to_vec();
    loop {
        if rows.len() == 1 && is_contradiction(&rows[0]) {
            let n = keep.iter().filter(|k| **k).count();
            return Some(vec![bottom_row(n)]);
        }
        let col = (0..keep.len())
            .filter(|k| !keep[*k])
            .min_by_key(|k| pair_count(&rows, *k));
        let col = match col {
            Some(c) => c,
            None => return Some(rows),
        };
        if rows.is_empty() {
            keep.remove(col);
            continue;
        }
        rows = eliminate_column(&rows, col);
        keep.remove(col);
        trace!("eliminated a column, {} rows remain", rows.len());
        if ctx.exceeds_size(rows.len()) || ctx.timed_out() {
            return None;
        }
    }
}

/// Whether a system has no solution. An aborted elimination answers `false`.
fn infeasible(ctx: &mut OpContext, rows: Vec<Row>) -> bool {
    let n = rows.first().map(|r| r.0.len()).unwrap_or(0);
    match project(ctx, rows, &vec![false; n]) {
        Some(rows) => rows.iter().any(is_contradiction),
        None => false,
    }
}

/// Whether every solution of `rows` satisfies `c`.
fn entails(ctx: &mut OpContext, rows: &[Row], c: &Row) -> bool {
    let mut test = rows.to_vec();
    test.push(negate(c));
    infeasible(ctx, test)
}

/// Bounds of the single remaining column of a projected system.
fn column_bounds(rows: &[Row]) -> Interval {
    let mut lo = Mpq::NegInf;
    let mut hi = Mpq::PosInf;
    for (c, b, _) in rows.iter() {
        if c.is_empty() || c[0].is_zero() {
            continue;
        }
        let v = Mpq::Finite(b / &c[0]);
        if c[0].is_positive() {
            if v < hi {
                hi = v;
            }
        } else if v > lo {
            lo = v;
        }
    }
    Interval::of_mpq(lo, hi)
}

/// A polyhedron `a x <= b`. Rows whose `strict` flag is set are strict inequalities.
#[derive(Clone, Debug)]
pub struct Polyhedron {
    dim: Dimension,
    a: DMatrix<BigRational>,
    b: DVector<BigRational>,
    strict: Vec<bool>,
}

impl Polyhedron {
    fn from_rows(dim: Dimension, rows: Vec<Row>) -> Polyhedron {
        let n = dim.size();
        let m = rows.len();
        if rows.iter().any(|r| r.0.len() != n) {
            panic!("Mismatched dimensionality in Polyhedron::from_rows");
        }
        Polyhedron {
            dim,
            a: DMatrix::from_fn(m, n, |i, j| rows[i].0[j].clone()),
            b: DVector::from_fn(m, |i, _| rows[i].1.clone()),
            strict: rows.iter().map(|r| r.2).collect(),
        }
    }

    fn rows(&self) -> Vec<Row> {
        (0..self.a.nrows())
            .map(|i| {
                (
                    (0..self.a.ncols()).map(|j| self.a[(i, j)].clone()).collect(),
                    self.b[i].clone(),
                    self.strict[i],
                )
            })
            .collect()
    }

    /// The number of stored constraints.
    pub fn nconstraints(&self) -> usize {
        self.a.nrows()
    }

    /// The stored constraints, as `coeffs . x <= cst` or `coeffs . x < cst`.
    pub fn constraints(&self) -> Vec<LinearConstraint> {
        self.rows()
            .into_iter()
            .map(|(c, b, s)| LinearConstraint::new(c, b, if s { Relation::Lt } else { Relation::Le }))
            .collect()
    }

    fn includes(&self, ctx: &mut OpContext, other: &Polyhedron) -> bool {
        let inner = other.rows();
        if infeasible(ctx, inner.clone()) {
            return true;
        }
        self.rows().iter().all(|r| entails(ctx, &inner, r))
    }

    /// Remove redundant constraints. An empty polyhedron is reduced to the single constraint
    /// `0 <= -1`.
    pub fn minimize(&mut self, ctx: &mut OpContext) {
        let rows = tidy(self.rows());
        if infeasible(ctx, rows.clone()) {
            *self = Polyhedron::from_rows(self.dim, vec![bottom_row(self.dim.size())]);
            return;
        }
        *self = Polyhedron::from_rows(self.dim, rows);
        loop {
            let rows = self.rows();
            let mut redundant = None;
            for i in 0..rows.len() {
                let mut test: Vec<Row> = rows
                    .iter()
                    .enumerate()
                    .filter(|(k, _)| *k != i)
                    .map(|(_, r)| r.clone())
                    .collect();
                test.push(negate(&rows[i]));
                if infeasible(ctx, test) {
                    redundant = Some(i);
                    break;
                }
            }
            match redundant {
                Some(i) => {
                    replace_with_or_abort(&mut self.a, |a| a.remove_row(i));
                    replace_with_or_abort(&mut self.b, |b| b.remove_row(i));
                    self.strict.remove(i);
                }
                None => break,
            }
            if ctx.timed_out() {
                break;
            }
        }
    }
}

impl PartialEq for Polyhedron {
    fn eq(&self, other: &Self) -> bool {
        let mut ctx = OpContext::new(FunId::IsEq, FunOpt::default());
        self.dim == other.dim && self.includes(&mut ctx, other) && other.includes(&mut ctx, self)
    }
}

impl PolyhedraDomain {
    fn row_of(&self, ctx: &mut OpContext, lc: LinearConstraint) -> Vec<Row> {
        let c = lc.coeffs().to_vec();
        let b = lc.cst().clone();
        match lc.relation() {
            Relation::Le => vec![(c, b, false)],
            Relation::Lt => {
                if !self.strict {
                    ctx.inexact();
                }
                vec![(c, b, self.strict)]
            }
            Relation::Eq => {
                let r = (c, b, false);
                let n = (r.0.iter().map(|x| -x).collect(), -&r.1, false);
                vec![r, n]
            }
        }
    }

    /// Eliminate the given columns and put zero columns back in their place.
    fn forget_rows(
        &self,
        ctx: &mut OpContext,
        rows: Vec<Row>,
        dims: &[usize],
        n: usize,
    ) -> Vec<Row> {
        let keep: Vec<bool> = (0..n).map(|k| !dims.contains(&k)).collect();
        match project(ctx, rows, &keep) {
            Some(rows) => rows
                .into_iter()
                .map(|(c, b, s)| {
                    let mut it = c.into_iter();
                    let full = keep
                        .iter()
                        .map(|k| {
                            if *k {
                                it.next().unwrap_or_else(BigRational::zero)
                            } else {
                                BigRational::zero()
                            }
                        })
                        .collect();
                    (full, b, s)
                })
                .collect(),
            None => Vec::new(),
        }
    }
}

impl DomainBackend for PolyhedraDomain {
    type Value = Polyhedron;

    fn library(&self) -> &str {
        if self.strict {
            "poly, strict mode"
        } else {
            "poly, loose mode"
        }
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn scalar_kind(&self) -> ScalarKind {
        ScalarKind::Mpq
    }

    fn top(&self, _ctx: &mut OpContext, dim: Dimension) -> Polyhedron {
        Polyhedron::from_rows(dim, Vec::new())
    }

    fn bottom(&self, _ctx: &mut OpContext, dim: Dimension) -> Polyhedron {
        Polyhedron::from_rows(dim, vec![bottom_row(dim.size())])
    }

    fn of_box(&self, _ctx: &mut OpContext, dim: Dimension, itvs: &[Interval]) -> Polyhedron {
        let n = dim.size();
        if itvs.len() != n {
            panic!("Mismatched dimensionality in PolyhedraDomain::of_box");
        }
        let mut rows = Vec::new();
        for (k, itv) in itvs.iter().enumerate() {
            let itv = itv.convert(ScalarKind::Mpq);
            if itv.is_bottom() {
                return Polyhedron::from_rows(dim, vec![bottom_row(n)]);
            }
            let (mut lo, mut hi) = (itv.inf().to_mpq(), itv.sup().to_mpq());
            if dim.is_int(k as Dim) {
                lo = lo.ceil();
                hi = hi.floor();
            }
            let mut unit = vec![BigRational::zero(); n];
            unit[k] = BigRational::one();
            if let Some(h) = hi.finite() {
                rows.push((unit.clone(), h.clone(), false));
            }
            if let Some(l) = lo.finite() {
                rows.push((unit.iter().map(|x| -x).collect(), -l, false));
            }
        }
        Polyhedron::from_rows(dim, tidy(rows))
    }

    fn dimension(&self, v: &Polyhedron) -> Dimension {
        v.dim
    }

    fn is_bottom(&self, ctx: &mut OpContext, v: &Polyhedron) -> bool {
        infeasible(ctx, v.rows())
    }

    fn is_top(&self, _ctx: &mut OpContext, v: &Polyhedron) -> bool {
        v.rows()
            .iter()
            .all(|r| r.0.iter().all(Zero::is_zero) && !is_contradiction(r))
    }

    fn is_leq(&self, ctx: &mut OpContext, a: &Polyhedron, b: &Polyhedron) -> bool {
        if a.dim != b.dim {
            panic!("Mismatched dimensionality in PolyhedraDomain::is_leq");
        }
        b.includes(ctx, a)
    }

    fn bound_dimension(&self, ctx: &mut OpContext, v: &Polyhedron, d: Dim) -> Interval {
        let n = v.dim.size();
        if d as usize >= n {
            panic!("Dimension too high in PolyhedraDomain::bound_dimension");
        }
        let keep: Vec<bool> = (0..n).map(|k| k == d as usize).collect();
        match project(ctx, v.rows(), &keep) {
            Some(rows) if rows.iter().any(is_contradiction) => Interval::bottom(ScalarKind::Mpq),
            Some(rows) => column_bounds(&rows),
            None => Interval::top(ScalarKind::Mpq),
        }
    }

    fn bound_linexpr(&self, ctx: &mut OpContext, v: &Polyhedron, e: &LinExpr0) -> Interval {
        let kind = ScalarKind::Mpq;
        if self.is_bottom(ctx, v) {
            return Interval::bottom(kind);
        }
        let n = v.dim.size();
        let mut t = vec![BigRational::zero(); n + 1];
        t[n] = BigRational::one();
        for (d, k) in e.nonzero() {
            match k.as_scalar().and_then(|s| s.to_rational()) {
                Some(r) if (d as usize) < n => t[d as usize] = -r,
                _ => return e.eval(&self.to_box(ctx, v), kind),
            }
        }
        // The fresh last column equals the variable part of `e`.
        let mut rows: Vec<Row> = v
            .rows()
            .into_iter()
            .map(|(mut c, b, s)| {
                c.push(BigRational::zero());
                (c, b, s)
            })
            .collect();
        let neg: Vec<BigRational> = t.iter().map(|x| -x).collect();
        rows.push((t, BigRational::zero(), false));
        rows.push((neg, BigRational::zero(), false));
        let keep: Vec<bool> = (0..=n).map(|k| k == n).collect();
        let var = match project(ctx, rows, &keep) {
            Some(rows) => column_bounds(&rows),
            None => return e.eval(&self.to_box(ctx, v), kind),
        };
        var.add(&e.cst().to_interval_of(kind))
    }

    fn to_box(&self, ctx: &mut OpContext, v: &Polyhedron) -> Vec<Interval> {
        let n = v.dim.size();
        if self.is_bottom(ctx, v) {
            return vec![Interval::bottom(ScalarKind::Mpq); n];
        }
        (0..n)
            .map(|d| self.bound_dimension(ctx, v, d as Dim))
            .collect()
    }

    fn to_lincons(&self, ctx: &mut OpContext, v: &Polyhedron) -> Vec<Lincons0> {
        if self.is_bottom(ctx, v) {
            return vec![Lincons0::unsat()];
        }
        v.constraints().iter().map(|c| c.to_lincons0()).collect()
    }

    fn meet(&self, _ctx: &mut OpContext, a: &Polyhedron, b: &Polyhedron) -> Polyhedron {
        if a.dim != b.dim {
            panic!("Mismatched dimensionality in PolyhedraDomain::meet");
        }
        let mut rows = a.rows();
        rows.extend(b.rows());
        Polyhedron::from_rows(a.dim, tidy(rows))
    }

    fn meet_lincons(&self, ctx: &mut OpContext, v: &Polyhedron, cs: &[Lincons0]) -> Polyhedron {
        let n = v.dim.size();
        let bounds = if cs.iter().all(|c| c.expr.is_quasilinear()) {
            vec![Interval::top(ScalarKind::Mpq); n]
        } else {
            if self.is_bottom(ctx, v) {
                return v.clone();
            }
            self.to_box(ctx, v)
        };
        let mut rows = v.rows();
        for c in cs {
            match LinearConstraint::relax(c, &bounds, v.dim, ctx) {
                Some(lcs) => {
                    for lc in lcs {
                        rows.extend(self.row_of(ctx, lc));
                    }
                }
                None => return self.bottom(ctx, v.dim),
            }
        }
        Polyhedron::from_rows(v.dim, tidy(rows))
    }

    fn join(&self, ctx: &mut OpContext, a: &Polyhedron, b: &Polyhedron) -> Polyhedron {
        if a.dim != b.dim {
            panic!("Mismatched dimensionality in PolyhedraDomain::join");
        }
        if self.is_leq(ctx, a, b) {
            return b.clone();
        }
        if self.is_leq(ctx, b, a) {
            return a.clone();
        }
        ctx.inexact();
        let (ra, rb) = (a.rows(), b.rows());
        if ra.iter().chain(rb.iter()).any(|r| r.2) {
            debug!("Strict constraints are closed by the polyhedral join");
        }
        // Columns are x, y and s, where y is the part of x drawn from `a` and s its weight:
        //   a.a y <= a.b s
        //   b.a (x - y) <= b.b (1 - s)
        //   0 <= s <= 1
        let n = a.dim.size();
        let width = 2 * n + 1;
        let mut rows = Vec::with_capacity(ra.len() + rb.len() + 2);
        for (c, k, _) in ra.iter() {
            let mut r = vec![BigRational::zero(); width];
            for j in 0..n {
                r[n + j] = c[j].clone();
            }
            r[2 * n] = -k;
            rows.push((r, BigRational::zero(), false));
        }
        for (c, k, _) in rb.iter() {
            let mut r = vec![BigRational::zero(); width];
            for j in 0..n {
                r[j] = c[j].clone();
                r[n + j] = -&c[j];
            }
            r[2 * n] = k.clone();
            rows.push((r, k.clone(), false));
        }
        let mut s = vec![BigRational::zero(); width];
        s[2 * n] = BigRational::one();
        rows.push((s.iter().map(|x| -x).collect(), BigRational::zero(), false));
        rows.push((s, BigRational::one(), false));
        let keep: Vec<bool> = (0..width).map(|k| k < n).collect();
        match project(ctx, rows, &keep) {
            Some(rows) => {
                let mut p = Polyhedron::from_rows(a.dim, rows);
                p.minimize(ctx);
                p
            }
            None => self.top(ctx, a.dim),
        }
    }

    fn widening(&self, ctx: &mut OpContext, a: &Polyhedron, b: &Polyhedron) -> Polyhedron {
        if a.dim != b.dim {
            panic!("Mismatched dimensionality in PolyhedraDomain::widening");
        }
        if self.is_bottom(ctx, a) {
            return b.clone();
        }
        if self.is_bottom(ctx, b) {
            return a.clone();
        }
        let mut a = a.clone();
        a.minimize(ctx);
        let mut b = b.clone();
        b.minimize(ctx);
        let (ra, rb) = (a.rows(), b.rows());
        let mut kept: Vec<Row> = ra.iter().filter(|r| entails(ctx, &rb, r)).cloned().collect();
        // A constraint of `b` that can stand in for one of `a` is stable too.
        for c in rb.iter() {
            if kept.contains(c) || !entails(ctx, &ra, c) {
                continue;
            }
            let swaps = (0..ra.len()).any(|i| {
                let mut t = ra.clone();
                t[i] = c.clone();
                entails(ctx, &t, &ra[i])
            });
            if swaps {
                kept.push(c.clone());
            }
        }
        Polyhedron::from_rows(a.dim, tidy(kept))
    }

    fn add_dimensions(
        &self,
        _ctx: &mut OpContext,
        v: &Polyhedron,
        dc: &DimChange,
        project: bool,
    ) -> Polyhedron {
        let dim = Dimension::new(v.dim.intdim + dc.intdim, v.dim.realdim + dc.realdim);
        let n = dim.size();
        let mut rows: Vec<Row> = v
            .rows()
            .into_iter()
            .map(|(c, b, s)| (dc.insert_into(&c, BigRational::zero), b, s))
            .collect();
        if project {
            for d in dc.added_dims() {
                rows.extend(zero_rows(n, d as usize));
            }
        }
        Polyhedron::from_rows(dim, rows)
    }

    fn remove_dimensions(&self, ctx: &mut OpContext, v: &Polyhedron, dc: &DimChange) -> Polyhedron {
        let n = v.dim.size();
        if dc.dims.iter().any(|d| *d as usize >= n) {
            panic!("Attempting to remove too high a dimension in PolyhedraDomain::remove_dimensions");
        }
        let dim = Dimension::new(v.dim.intdim - dc.intdim, v.dim.realdim - dc.realdim);
        let keep: Vec<bool> = (0..n).map(|k| !dc.dims.contains(&(k as Dim))).collect();
        match project(ctx, v.rows(), &keep) {
            Some(rows) => Polyhedron::from_rows(dim, rows),
            None => self.top(ctx, dim),
        }
    }

    fn permute_dimensions(
        &self,
        _ctx: &mut OpContext,
        v: &Polyhedron,
        perm: &DimPerm,
    ) -> Polyhedron {
        if perm.len() != v.dim.size() {
            panic!("Mismatched dimensionality in PolyhedraDomain::permute_dimensions");
        }
        let rows = v
            .rows()
            .into_iter()
            .map(|(c, b, s)| (perm.permute(&c), b, s))
            .collect();
        Polyhedron::from_rows(v.dim, rows)
    }

    fn forget(&self, ctx: &mut OpContext, v: &Polyhedron, dims: &[Dim], project: bool) -> Polyhedron {
        let n = v.dim.size();
        if dims.iter().any(|d| *d as usize >= n) {
            panic!("Dimension too high in PolyhedraDomain::forget");
        }
        if self.is_bottom(ctx, v) {
            return v.clone();
        }
        let ds: Vec<usize> = dims.iter().map(|d| *d as usize).collect();
        let mut rows = self.forget_rows(ctx, v.rows(), &ds, n);
        if project {
            for d in ds {
                rows.extend(zero_rows(n, d));
            }
        }
        Polyhedron::from_rows(v.dim, tidy(rows))
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn ctx() -> OpContext {
        OpContext::new(FunId::Unknown, FunOpt::default())
    }

    fn q(n: i64) -> BigRational {
        BigRational::from_integer(n.into())
    }

    fn row(c: Vec<i64>, b: i64) -> Row {
        (c.into_iter().map(q).collect(), q(b), false)
    }

    fn poly(n: usize, rows: Vec<Row>) -> Polyhedron {
        Polyhedron::from_rows(Dimension::new(0, n), rows)
    }

    fn holds(rows: &[Row], x: &[i64]) -> bool {
        rows.iter().all(|(c, b, s)| {
            let lhs = c
                .iter()
                .zip(x.iter())
                .fold(BigRational::zero(), |acc, (k, v)| acc + k * q(*v));
            if *s {
                lhs < *b
            } else {
                lhs <= *b
            }
        })
    }

    // x^T coeffs <= cst
    fn le(coeffs: Vec<i64>, cst: i64) -> Lincons0 {
        LinearConstraint::from_coeffs(coeffs, cst).to_lincons0()
    }

    #[test]
    fn test_eliminate() {
        let rows = vec![
            row(vec![0, 0, 0, -1], 0),
            row(vec![0, 0, 0, 1], 1),
            row(vec![0, 0, -1, 0], 0),
            row(vec![1, -1, 0, -2], 0),
            row(vec![-1, 1, 0, 4], 2),
        ];
        let r = eliminate_column(&rows, 3);
        assert!(r.iter().all(|x| x.0.len() == 3));
        assert!(holds(&r, &[1, 1, 1]));
        assert!(!holds(&r, &[1, 1, -1]));
        assert!(!holds(&r, &[3, 0, 1]));
        assert!(!holds(&r, &[0, 3, 1]));
    }

    #[test]
    fn test_top_bottom() {
        let d = PolyhedraDomain::loose();
        let dim = Dimension::new(0, 3);
        let pt = d.top(&mut ctx(), dim);
        let pb = d.bottom(&mut ctx(), dim);
        assert!(d.is_top(&mut ctx(), &pt));
        assert!(!d.is_top(&mut ctx(), &pb));
        assert!(d.is_bottom(&mut ctx(), &pb));
        assert!(!d.is_bottom(&mut ctx(), &pt));
    }

    #[test]
    fn minimize() {
        let mut p = poly(2, vec![row(vec![1, 1], 2), row(vec![0, 2], 2), row(vec![1, 1], 3)]);
        p.minimize(&mut ctx());
        assert_eq!(p.nconstraints(), 2);
        let mut q = poly(2, vec![row(vec![1, 1], 2), row(vec![0, 2], 2), row(vec![1, 0], 5)]);
        q.minimize(&mut ctx());
        assert_eq!(q.nconstraints(), 3);
    }

    #[test]
    fn project_keeps_marked_columns() {
        // x - y <= 0, y - z <= 0, z <= 4; projecting out y leaves x - z <= 0.
        let rows = vec![row(vec![1, -1, 0], 0), row(vec![0, 1, -1], 0), row(vec![0, 0, 1], 4)];
        let r = project(&mut ctx(), rows, &[true, false, true]).unwrap();
        assert!(r.iter().all(|(c, _, _)| c.len() == 2));
        assert!(holds(&r, &[1, 2]));
        assert!(holds(&r, &[4, 4]));
        assert!(!holds(&r, &[3, 2]));
        assert!(!holds(&r, &[0, 5]));
    }

    #[test]
    fn minimize_empty() {
        let mut p = poly(1, vec![row(vec![1], 0), row(vec![-1], -1)]);
        p.minimize(&mut ctx());
        assert_eq!(p.nconstraints(), 1);
        assert!(PolyhedraDomain::loose().is_bottom(&mut ctx(), &p));
    }

    #[test]
    fn test_eq() {
        let mut p = poly(2, vec![row(vec![1, 1], 2), row(vec![0, 2], 2), row(vec![1, 0], 5)]);
        let p1 = p.clone();
        p.minimize(&mut ctx());
        assert_eq!(p, p1);
    }

    #[test]
    fn test_dims() {
        let d = PolyhedraDomain::loose();
        let a = d.top(&mut ctx(), Dimension::new(0, 4));
        assert_eq!(d.dimension(&a).size(), 4);
        let b = d.bottom(&mut ctx(), Dimension::new(1, 1));
        assert_eq!(d.dimension(&b), Dimension::new(1, 1));
    }

    #[test]
    fn test_add_dims() {
        let d = PolyhedraDomain::loose();
        let b = d.top(&mut ctx(), Dimension::new(0, 3));
        let a = d.top(&mut ctx(), Dimension::new(0, 4));
        let c = poly(2, vec![row(vec![1, 1], 2)]);
        let e = poly(4, vec![row(vec![0, 1, 1, 0], 2)]);
        let one = DimChange::new(vec![3], 0, 1);
        assert_eq!(d.add_dimensions(&mut ctx(), &b, &one, false), a);
        let two = DimChange::new(vec![0, 2], 0, 2);
        assert_eq!(d.add_dimensions(&mut ctx(), &c, &two, false), e);
    }

    #[test]
    fn join_is_the_hull() {
        let d = PolyhedraDomain::loose();
        let dim = Dimension::new(0, 2);
        let origin = d.of_box(&mut ctx(), dim, &vec![Interval::of_rationals(0, 1, 0, 1); 2]);
        let one = d.of_box(&mut ctx(), dim, &vec![Interval::of_rationals(1, 1, 1, 1); 2]);
        let mut c = ctx();
        let j = d.join(&mut c, &origin, &one);
        assert!(!c.is_exact());
        let diag = d.meet_lincons(
            &mut ctx(),
            &d.top(&mut ctx(), dim),
            &[le(vec![1, -1], 0), le(vec![-1, 1], 0)],
        );
        assert!(d.is_leq(&mut ctx(), &j, &diag));
        assert_eq!(
            d.bound_dimension(&mut ctx(), &j, 0),
            Interval::of_rationals(0, 1, 1, 1)
        );
        assert!(d.is_leq(&mut ctx(), &origin, &j));
        assert!(d.is_leq(&mut ctx(), &one, &j));
    }

    #[test]
    fn join_with_bottom() {
        let d = PolyhedraDomain::loose();
        let dim = Dimension::new(0, 1);
        let p = d.of_box(&mut ctx(), dim, &[Interval::of_rationals(2, 1, 3, 1)]);
        let bot = d.bottom(&mut ctx(), dim);
        let mut c = ctx();
        assert_eq!(d.join(&mut c, &bot, &p), p);
        assert!(c.is_exact());
    }

    #[test]
    fn strict_inequalities() {
        let s = PolyhedraDomain::strict();
        let dim = Dimension::new(0, 1);
        let top = s.top(&mut ctx(), dim);
        let lt = LinearConstraint::new(vec![q(1)], q(1), Relation::Lt).to_lincons0();
        let open = s.meet_lincons(&mut ctx(), &top, &[lt.clone()]);
        let closed = s.meet_lincons(&mut ctx(), &top, &[le(vec![1], 1)]);
        assert!(s.is_leq(&mut ctx(), &open, &closed));
        assert!(!s.is_leq(&mut ctx(), &closed, &open));

        let l = PolyhedraDomain::loose();
        let mut c = ctx();
        let relaxed = l.meet_lincons(&mut c, &top, &[lt]);
        assert!(!c.is_exact());
        assert_eq!(relaxed, closed);
    }

    #[test]
    fn relational_bounds() {
        let d = PolyhedraDomain::loose();
        let dim = Dimension::new(0, 2);
        let p = d.meet_lincons(
            &mut ctx(),
            &d.top(&mut ctx(), dim),
            &[le(vec![1, -1], 0), le(vec![-1, 1], 0), le(vec![1, 0], 5), le(vec![-1, 0], 0)],
        );
        let e = LinearConstraint::from_coeffs(vec![1, -1], 0).to_lincons0().expr;
        let b = d.bound_linexpr(&mut ctx(), &p, &e);
        assert!(b.is_zero());
        assert_eq!(
            d.bound_dimension(&mut ctx(), &p, 1),
            Interval::of_rationals(0, 1, 5, 1)
        );
    }

    #[test]
    fn widening_keeps_stable_constraints() {
        let d = PolyhedraDomain::loose();
        let dim = Dimension::new(0, 1);
        let a = d.of_box(&mut ctx(), dim, &[Interval::of_rationals(0, 1, 1, 1)]);
        let b = d.of_box(&mut ctx(), dim, &[Interval::of_rationals(0, 1, 2, 1)]);
        let w = d.widening(&mut ctx(), &a, &b);
        let itv = d.bound_dimension(&mut ctx(), &w, 0);
        assert_eq!(itv.inf().to_mpq(), Mpq::zero());
        assert_eq!(itv.sup().to_mpq(), Mpq::PosInf);
    }

    #[test]
    fn forget_remove_and_permute() {
        let d = PolyhedraDomain::loose();
        let dim = Dimension::new(0, 2);
        // x <= y, 0 <= x, y <= 3
        let p = d.meet_lincons(
            &mut ctx(),
            &d.top(&mut ctx(), dim),
            &[le(vec![1, -1], 0), le(vec![-1, 0], 0), le(vec![0, 1], 3)],
        );
        let f = d.forget(&mut ctx(), &p, &[1], false);
        assert_eq!(
            d.bound_dimension(&mut ctx(), &f, 0),
            Interval::of_rationals(0, 1, 3, 1)
        );
        assert!(d.bound_dimension(&mut ctx(), &f, 1).is_top());
        let z = d.forget(&mut ctx(), &p, &[1], true);
        assert!(d.bound_dimension(&mut ctx(), &z, 1).is_zero());

        let r = d.remove_dimensions(&mut ctx(), &p, &DimChange::new(vec![0], 0, 1));
        assert_eq!(
            d.bound_dimension(&mut ctx(), &r, 0),
            Interval::of_rationals(0, 1, 3, 1)
        );

        let s = d.permute_dimensions(&mut ctx(), &p, &DimPerm::new(vec![1, 0]));
        assert_eq!(
            d.bound_dimension(&mut ctx(), &s, 1),
            Interval::of_rationals(0, 1, 3, 1)
        );
    }

    #[test]
    fn unsat_constraint_gives_bottom() {
        let d = PolyhedraDomain::strict();
        let dim = Dimension::new(0, 1);
        let p = d.meet_lincons(&mut ctx(), &d.top(&mut ctx(), dim), &[Lincons0::unsat()]);
        assert!(d.is_bottom(&mut ctx(), &p));
        assert_eq!(d.to_lincons(&mut ctx(), &p).len(), 1);
    }
}
