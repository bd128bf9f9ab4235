//! Linear expressions `c_0 + Σ c_i · x_i` with scalar or interval coefficients.

use crate::environment::{DimChange, DimPerm, Environment};
use crate::error::Result;
use crate::expr::embedding;
use crate::num::{Coeff, Interval, Scalar, ScalarKind};
use crate::var::{Dim, Var};
use std::fmt;

/// The storage of the variable terms.
#[derive(Debug, Clone)]
pub enum Terms {
    /// One coefficient per dimension.
    Dense(Vec<Coeff>),
    /// Materialized `(dimension, coefficient)` pairs sorted by dimension. Absent dimensions have
    /// a zero coefficient.
    Sparse(Vec<(Dim, Coeff)>),
}

/// A linear expression over dimensions.
///
/// # Examples
/// ```
/// # use numdom::expr::LinExpr0;
/// # use numdom::num::Coeff;
/// let mut e = LinExpr0::sparse();
/// e.set_coeff(1, Coeff::double(2.0));
/// e.set_cst(Coeff::double(-1.0));
/// assert_eq!(e.to_string(), "2.0·x1 - 1.0");
/// ```
#[derive(Debug, Clone)]
pub struct LinExpr0 {
    cst: Coeff,
    terms: Terms,
}

/// Iterator over the materialized terms of a linear expression.
pub struct TermIter<'a> {
    inner: TermIterInner<'a>,
}

enum TermIterInner<'a> {
    Dense(std::iter::Enumerate<std::slice::Iter<'a, Coeff>>),
    Sparse(std::slice::Iter<'a, (Dim, Coeff)>),
}

impl<'a> Iterator for TermIter<'a> {
    type Item = (Dim, &'a Coeff);

    fn next(&mut self) -> Option<(Dim, &'a Coeff)> {
        match &mut self.inner {
            TermIterInner::Dense(it) => it.next().map(|(d, c)| (d as Dim, c)),
            TermIterInner::Sparse(it) => it.next().map(|(d, c)| (*d, c)),
        }
    }
}

impl LinExpr0 {
    /// The sparse expression `0.0`.
    pub fn sparse() -> LinExpr0 {
        LinExpr0 {
            cst: Coeff::double(0.0),
            terms: Terms::Sparse(Vec::new()),
        }
    }

    /// The dense expression `0.0·x0 + ... + 0.0·x(size-1) + 0.0`.
    pub fn dense(size: usize) -> LinExpr0 {
        LinExpr0 {
            cst: Coeff::double(0.0),
            terms: Terms::Dense(vec![Coeff::double(0.0); size]),
        }
    }

    /// A sparse expression from terms and a constant. Later terms override earlier ones on the
    /// same dimension.
    pub fn from_terms<I>(terms: I, cst: Coeff) -> LinExpr0
    where
        I: IntoIterator<Item = (Dim, Coeff)>,
    {
        let mut e = LinExpr0 {
            cst,
            terms: Terms::Sparse(Vec::new()),
        };
        for (d, c) in terms {
            e.set_coeff(d, c);
        }
        e
    }

    /// Whether the terms are stored densely.
    pub fn is_dense(&self) -> bool {
        matches!(self.terms, Terms::Dense(_))
    }

    /// The constant.
    pub fn cst(&self) -> &Coeff {
        &self.cst
    }

    /// Replace the constant.
    pub fn set_cst(&mut self, c: Coeff) {
        self.cst = c;
    }

    /// The coefficient of dimension `d`, if materialized.
    pub fn coeff(&self, d: Dim) -> Option<&Coeff> {
        match &self.terms {
            Terms::Dense(v) => v.get(d as usize),
            Terms::Sparse(v) => v
                .binary_search_by_key(&d, |(e, _)| *e)
                .ok()
                .map(|i| &v[i].1),
        }
    }

    /// Set the coefficient of dimension `d`.
    ///
    /// # Panics
    /// Panics if the expression is dense and `d` is beyond its size.
    pub fn set_coeff(&mut self, d: Dim, c: Coeff) {
        match &mut self.terms {
            Terms::Dense(v) => {
                if d as usize >= v.len() {
                    panic!("Dimension too high in LinExpr0::set_coeff");
                }
                v[d as usize] = c;
            }
            Terms::Sparse(v) => match v.binary_search_by_key(&d, |(e, _)| *e) {
                Ok(i) => v[i].1 = c,
                Err(i) => v.insert(i, (d, c)),
            },
        }
    }

    /// The materialized terms in dimension order.
    pub fn iter(&self) -> TermIter<'_> {
        TermIter {
            inner: match &self.terms {
                Terms::Dense(v) => TermIterInner::Dense(v.iter().enumerate()),
                Terms::Sparse(v) => TermIterInner::Sparse(v.iter()),
            },
        }
    }

    /// The terms with a nonzero coefficient.
    pub fn nonzero(&self) -> impl Iterator<Item = (Dim, &Coeff)> {
        self.iter().filter(|(_, c)| !c.is_zero())
    }

    /// Whether every coefficient, the constant included, is a scalar.
    pub fn is_linear(&self) -> bool {
        self.cst.is_scalar() && self.iter().all(|(_, c)| c.is_scalar())
    }

    /// Whether every variable coefficient is a scalar. The constant may be an interval.
    pub fn is_quasilinear(&self) -> bool {
        self.iter().all(|(_, c)| c.is_scalar())
    }

    /// Whether no variable has a nonzero coefficient.
    pub fn is_constant(&self) -> bool {
        self.nonzero().next().is_none()
    }

    /// Whether every nonzero coefficient is an integer scalar on an integer dimension.
    pub fn is_integer(&self, intdim: usize) -> bool {
        self.nonzero().all(|(d, c)| {
            (d as usize) < intdim && c.as_scalar().map(|s| s.is_integer()).unwrap_or(false)
        })
    }

    /// Whether every nonzero coefficient is on a real dimension.
    pub fn is_real(&self, intdim: usize) -> bool {
        self.nonzero().all(|(d, _)| d as usize >= intdim)
    }

    /// The largest materialized dimension plus one.
    pub fn support_size(&self) -> usize {
        self.iter().map(|(d, _)| d as usize + 1).max().unwrap_or(0)
    }

    /// Negate every coefficient and the constant.
    pub fn neg(&self) -> LinExpr0 {
        let terms = match &self.terms {
            Terms::Dense(v) => Terms::Dense(v.iter().map(|c| c.neg()).collect()),
            Terms::Sparse(v) => Terms::Sparse(v.iter().map(|(d, c)| (*d, c.neg())).collect()),
        };
        LinExpr0 {
            cst: self.cst.neg(),
            terms,
        }
    }

    /// Drop zero terms and turn singleton intervals into scalars.
    pub fn minimize(&mut self) {
        self.cst = self.cst.clone().reduce();
        match &mut self.terms {
            Terms::Dense(v) => {
                for c in v.iter_mut() {
                    *c = c.clone().reduce();
                }
            }
            Terms::Sparse(v) => {
                v.retain(|(_, c)| !c.is_zero());
                for (_, c) in v.iter_mut() {
                    *c = c.clone().reduce();
                }
            }
        }
    }

    /// Interval enclosure of the expression when each dimension `d` ranges over `bounds[d]`.
    ///
    /// # Panics
    /// Panics if a nonzero term refers to a dimension beyond `bounds`.
    pub fn eval(&self, bounds: &[Interval], kind: ScalarKind) -> Interval {
        let mut acc = self.cst.to_interval_of(kind);
        for (d, c) in self.nonzero() {
            let b = bounds[d as usize].convert(kind);
            acc = acc.add(&c.to_interval_of(kind).mul(&b));
        }
        acc
    }

    /// Over-approximate by a quasilinear expression: each interval coefficient `[a,b]` on `x` is
    /// replaced by a finite weight `m` in `[a,b]`, and `([a,b] - m) · bounds[x]` moves into the
    /// constant.
    pub fn quasilinearize(&self, bounds: &[Interval], kind: ScalarKind) -> LinExpr0 {
        if self.is_quasilinear() {
            return self.clone();
        }
        let mut cst = self.cst.to_interval_of(kind);
        let mut terms = Vec::new();
        for (d, c) in self.iter() {
            match c {
                Coeff::Interval(i) if !i.is_point() => {
                    let m = if !i.inf().is_infty() {
                        i.inf().clone()
                    } else if !i.sup().is_infty() {
                        i.sup().clone()
                    } else {
                        Scalar::zero(i.kind())
                    };
                    let rest = i.sub(&Interval::point(m.clone())).convert(kind);
                    cst = cst.add(&rest.mul(&bounds[d as usize].convert(kind)));
                    terms.push((d, Coeff::Scalar(m)));
                }
                c => terms.push((d, c.clone().reduce())),
            }
        }
        LinExpr0 {
            cst: Coeff::Interval(cst).reduce(),
            terms: Terms::Sparse(terms),
        }
    }

    /// Re-index after adding dimensions.
    pub fn add_dimensions(&self, dc: &DimChange) -> LinExpr0 {
        let terms = match &self.terms {
            Terms::Dense(v) => {
                let zero = Coeff::zero(self.cst.kind());
                Terms::Dense(dc.insert_into(v, || zero.clone()))
            }
            Terms::Sparse(v) => {
                let size = self.support_size();
                let map = dc.add_map(size);
                Terms::Sparse(v.iter().map(|(d, c)| (map[*d as usize], c.clone())).collect())
            }
        };
        LinExpr0 {
            cst: self.cst.clone(),
            terms,
        }
    }

    /// Re-index through a permutation.
    pub fn permute(&self, perm: &DimPerm) -> LinExpr0 {
        let terms = match &self.terms {
            Terms::Dense(v) => Terms::Dense(perm.permute(v)),
            Terms::Sparse(v) => {
                let mut t: Vec<(Dim, Coeff)> =
                    v.iter().map(|(d, c)| (perm.apply(*d), c.clone())).collect();
                t.sort_by_key(|(d, _)| *d);
                Terms::Sparse(t)
            }
        };
        LinExpr0 {
            cst: self.cst.clone(),
            terms,
        }
    }

    /// Print using `name` for dimensions.
    pub fn fmt_with<F>(&self, f: &mut fmt::Formatter<'_>, name: F) -> fmt::Result
    where
        F: Fn(Dim) -> String,
    {
        let parts: Vec<String> = self
            .iter()
            .map(|(d, c)| format!("{}·{}", c, name(d)))
            .collect();
        let s = if parts.is_empty() {
            self.cst.to_string()
        } else {
            format!("{} + {}", parts.join(" + "), self.cst)
        };
        f.write_str(&s.replace("+ -", "- "))
    }
}

impl fmt::Display for LinExpr0 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with(f, |d| format!("x{}", d))
    }
}

/// A linear expression over the variables of an environment.
///
/// # Examples
/// ```
/// # use numdom::{Environment, LinExpr, Var};
/// # use numdom::num::Coeff;
/// let e = Environment::new(&[Var::new("x"), Var::new("y")], &[Var::new("z")]).unwrap();
/// let mut l = LinExpr::sparse(&e);
/// l.set_coeff(&Var::new("x"), Coeff::double(3.0)).unwrap();
/// l.set_coeff(&Var::new("z"), Coeff::double(-9.0)).unwrap();
/// l.set_cst(Coeff::double(8.0));
/// assert_eq!(l.to_string(), "3.0·x - 9.0·z + 8.0");
/// ```
#[derive(Debug, Clone)]
pub struct LinExpr {
    env: Environment,
    expr: LinExpr0,
}

impl LinExpr {
    /// The sparse expression `0.0` over `env`.
    pub fn sparse(env: &Environment) -> LinExpr {
        LinExpr {
            env: env.clone(),
            expr: LinExpr0::sparse(),
        }
    }

    /// The dense expression with a `0.0` coefficient for every variable of `env`.
    pub fn dense(env: &Environment) -> LinExpr {
        LinExpr {
            env: env.clone(),
            expr: LinExpr0::dense(env.len()),
        }
    }

    /// A sparse expression from named terms.
    ///
    /// # Errors
    /// Fails with `UnknownVariable` if a term names a variable outside `env`.
    pub fn from_terms(env: &Environment, terms: &[(Var, Coeff)], cst: Coeff) -> Result<LinExpr> {
        let mut e = LinExpr {
            env: env.clone(),
            expr: LinExpr0::sparse(),
        };
        e.expr.set_cst(cst);
        for (v, c) in terms {
            e.set_coeff(v, c.clone())?;
        }
        Ok(e)
    }

    /// Pair a dimension-level expression with an environment.
    ///
    /// # Panics
    /// Panics if the expression refers to a dimension outside `env`.
    pub fn from_expr0(env: &Environment, expr: LinExpr0) -> LinExpr {
        if expr.support_size() > env.len() {
            panic!("Dimension too high in LinExpr::from_expr0");
        }
        LinExpr {
            env: env.clone(),
            expr,
        }
    }

    /// The environment.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// The dimension-level expression.
    pub fn expr(&self) -> &LinExpr0 {
        &self.expr
    }

    /// The coefficient of `v`; zero (as the double `0.0`) when not materialized.
    ///
    /// # Errors
    /// Fails with `UnknownVariable` if `v` is not in the environment.
    pub fn coeff(&self, v: &Var) -> Result<Coeff> {
        let d = self.env.dim_of(v)?;
        Ok(self
            .expr
            .coeff(d)
            .cloned()
            .unwrap_or_else(|| Coeff::double(0.0)))
    }

    /// Set the coefficient of `v`.
    ///
    /// # Errors
    /// Fails with `UnknownVariable` if `v` is not in the environment.
    pub fn set_coeff(&mut self, v: &Var, c: Coeff) -> Result<()> {
        let d = self.env.dim_of(v)?;
        self.expr.set_coeff(d, c);
        Ok(())
    }

    /// The constant.
    pub fn cst(&self) -> &Coeff {
        self.expr.cst()
    }

    /// Replace the constant.
    pub fn set_cst(&mut self, c: Coeff) {
        self.expr.set_cst(c);
    }

    /// The materialized terms in dimension order.
    pub fn terms(&self) -> TermIter<'_> {
        self.expr.iter()
    }

    /// Whether no variable has a nonzero coefficient.
    pub fn is_constant(&self) -> bool {
        self.expr.is_constant()
    }

    /// Whether every nonzero coefficient is an integer on an integer variable.
    pub fn is_integer(&self) -> bool {
        self.expr.is_integer(self.env.intdim())
    }

    /// Whether every nonzero coefficient is on a real variable.
    pub fn is_real(&self) -> bool {
        self.expr.is_real(self.env.intdim())
    }

    /// Whether every coefficient, the constant included, is a scalar.
    pub fn is_linear(&self) -> bool {
        self.expr.is_linear()
    }

    /// Whether every variable coefficient is a scalar.
    pub fn is_quasilinear(&self) -> bool {
        self.expr.is_quasilinear()
    }

    /// Drop zero terms and turn singleton intervals into scalars.
    pub fn minimize(&mut self) {
        self.expr.minimize();
    }

    /// The same expression over a larger environment.
    ///
    /// # Errors
    /// Fails with `UnknownVariable` if `env` lacks one of the variables, or
    /// `IncompatibleEnvironment` if a variable changes type.
    pub fn extend_environment(&self, env: &Environment) -> Result<LinExpr> {
        let expr = match embedding(&self.env, env)? {
            Some(dc) => self.expr.add_dimensions(&dc),
            None => self.expr.clone(),
        };
        Ok(LinExpr {
            env: env.clone(),
            expr,
        })
    }
}

impl fmt::Display for LinExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env = &self.env;
        self.expr.fmt_with(f, |d| match env.var_of_dim(d) {
            Some(v) => v.to_string(),
            None => format!("x{}", d),
        })
    }
}
