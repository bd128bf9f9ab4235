#![crate_name = "numdom"]
#![crate_type = "lib"]
#![warn(missing_docs)]

//! A library of numerical abstract domains.
//!
//! An abstract value over-approximates a set of program states by numerical constraints on a set
//! of named variables. The variables live in an [`Environment`]; expressions ([`LinExpr`],
//! [`TreeExpr`]) and constraints ([`Lincons`], [`Tcons`]) are built over environments; an
//! [`AbstractValue`] pairs an environment with an element of some domain and exposes the lattice
//! operations (meet, join, widening, inclusion) and transfer functions (assignment, substitution,
//! projection) a static analyzer needs.
//!
//! Domains are pluggable through the [`DomainBackend`] trait. A backend works on dimension
//! indices only, and is bound to a [`Manager`] that carries options and collects the exceptions
//! the backend reports. This crate ships three backends in [`numerical`]: boxes, octagons and
//! convex polyhedra.
//!
//! ```
//! use numdom::{AbstractValue, Environment, Manager, Var};
//! use numdom::num::Interval;
//! use numdom::numerical::BoxDomain;
//!
//! let man = Manager::new(BoxDomain::double());
//! let env = Environment::new(&[Var::new("x"), Var::new("y")], &[Var::new("z")]).unwrap();
//! let v = AbstractValue::of_box(&man, &env, &[(Var::new("x"), Interval::of_doubles(-2.5, 2.5))])
//!     .unwrap();
//! assert!(!v.is_bottom());
//! assert!(!v.is_top());
//! assert!(AbstractValue::bottom(&man, &env).is_bottom());
//! ```
//!
//! [`Environment`]: ./environment/struct.Environment.html
//! [`LinExpr`]: ./expr/linexpr/struct.LinExpr.html
//! [`TreeExpr`]: ./expr/texpr/struct.TreeExpr.html
//! [`Lincons`]: ./constraint/struct.Lincons.html
//! [`Tcons`]: ./constraint/struct.Tcons.html
//! [`AbstractValue`]: ./abstract_value/struct.AbstractValue.html
//! [`DomainBackend`]: ./trait.DomainBackend.html
//! [`Manager`]: ./manager/struct.Manager.html
//! [`numerical`]: ./numerical/index.html

pub mod abstract_value;
pub mod constraint;
pub mod environment;
pub mod error;
pub mod expr;
pub mod manager;
pub mod num;
pub mod numerical;
pub mod var;

pub use crate::abstract_value::AbstractValue;
pub use crate::constraint::{ConsType, Lincons, Lincons0, LinconsArray, Tcons, Tcons0, TconsArray};
pub use crate::environment::{DimChange, DimPerm, Dimension, EnvOrdering, Environment};
pub use crate::error::{Error, Result};
pub use crate::expr::{LinExpr, LinExpr0, RDir, RType, TexprOp, Tree, TreeExpr};
pub use crate::manager::{Exc, FunId, FunOpt, Manager, OpContext};
pub use crate::var::{Dim, Var, DIM_MAX};

use crate::num::{Coeff, Interval, ScalarKind};
use std::fmt::Debug;

/// The operations a numerical domain must provide.
///
/// Backends see values over plain dimensions: the first `intdim` dimensions are integers and the
/// remaining `realdim` are reals. Every operation receives the [`OpContext`] of the running
/// operation, through which it reports inexact results and exceptional conditions. No operation
/// may return a value that excludes a concrete state of the exact result.
///
/// Default implementations build the transfer functions from the core lattice operations; a
/// backend overrides them when it can do better.
///
/// [`OpContext`]: ./manager/struct.OpContext.html
pub trait DomainBackend {
    /// The backend's abstract elements.
    type Value: Clone + Debug;

    /// Name of the backend.
    fn library(&self) -> &str;

    /// Version of the backend.
    fn version(&self) -> &str;

    /// The kind of the bounds this backend computes.
    fn scalar_kind(&self) -> ScalarKind;

    /// The element including every point of the space.
    fn top(&self, ctx: &mut OpContext, dim: Dimension) -> Self::Value;

    /// The element including no point.
    fn bottom(&self, ctx: &mut OpContext, dim: Dimension) -> Self::Value;

    /// The element bounding each dimension `d` by `itvs[d]`.
    ///
    /// # Panics
    /// Panics if `itvs.len()` is not the size of `dim`.
    fn of_box(&self, ctx: &mut OpContext, dim: Dimension, itvs: &[Interval]) -> Self::Value;

    /// The space of an element.
    fn dimension(&self, v: &Self::Value) -> Dimension;

    /// Whether the element is empty. Backends over exact numbers decide this exactly.
    fn is_bottom(&self, ctx: &mut OpContext, v: &Self::Value) -> bool;

    /// Whether the element is the whole space.
    fn is_top(&self, ctx: &mut OpContext, v: &Self::Value) -> bool;

    /// Whether `a` is included in `b`. Never `true` unless the inclusion holds.
    fn is_leq(&self, ctx: &mut OpContext, a: &Self::Value, b: &Self::Value) -> bool;

    /// Whether `a` and `b` denote the same set.
    fn is_eq(&self, ctx: &mut OpContext, a: &Self::Value, b: &Self::Value) -> bool {
        self.is_leq(ctx, a, b) && self.is_leq(ctx, b, a)
    }

    /// Whether `d` is unconstrained in `v`.
    fn is_dimension_unconstrained(&self, ctx: &mut OpContext, v: &Self::Value, d: Dim) -> bool {
        let f = self.forget(ctx, v, &[d], false);
        self.is_leq(ctx, &f, v)
    }

    /// Whether every point of `v` has dimension `d` within `itv`.
    fn sat_interval(&self, ctx: &mut OpContext, v: &Self::Value, d: Dim, itv: &Interval) -> bool {
        let b = self.bound_dimension(ctx, v, d);
        b.is_bottom() || b.convert(ScalarKind::Mpq).is_leq(&itv.convert(ScalarKind::Mpq))
    }

    /// Whether every point of `v` satisfies `c`.
    fn sat_lincons(&self, ctx: &mut OpContext, v: &Self::Value, c: &Lincons0) -> bool {
        if self.is_bottom(ctx, v) {
            return true;
        }
        let b = self.bound_linexpr(ctx, v, &c.expr);
        bound_satisfies(&b, c.typ)
    }

    /// Whether every point of `v` satisfies `c`.
    fn sat_tcons(&self, ctx: &mut OpContext, v: &Self::Value, c: &Tcons0) -> bool {
        if self.is_bottom(ctx, v) {
            return true;
        }
        let b = self.bound_texpr(ctx, v, &c.tree);
        bound_satisfies(&b, c.typ)
    }

    /// An enclosure of dimension `d` over `v`.
    fn bound_dimension(&self, ctx: &mut OpContext, v: &Self::Value, d: Dim) -> Interval;

    /// An enclosure of `e` over `v`.
    fn bound_linexpr(&self, ctx: &mut OpContext, v: &Self::Value, e: &LinExpr0) -> Interval {
        let kind = self.scalar_kind();
        if self.is_bottom(ctx, v) {
            return Interval::bottom(kind);
        }
        e.eval(&self.to_box(ctx, v), kind)
    }

    /// An enclosure of `t` over `v`.
    fn bound_texpr(&self, ctx: &mut OpContext, v: &Self::Value, t: &Tree) -> Interval {
        let kind = self.scalar_kind();
        if self.is_bottom(ctx, v) {
            return Interval::bottom(kind);
        }
        let b = self.to_box(ctx, v);
        let direct = t.eval(&b, kind);
        let lin = t.linearize(&b, kind);
        direct.meet(&self.bound_linexpr(ctx, v, &lin))
    }

    /// The bounds of every dimension of `v`; all empty when `v` is bottom.
    fn to_box(&self, ctx: &mut OpContext, v: &Self::Value) -> Vec<Interval>;

    /// A conjunction of linear constraints enclosing `v`.
    fn to_lincons(&self, ctx: &mut OpContext, v: &Self::Value) -> Vec<Lincons0>;

    /// Greatest lower bound, or an over-approximation of it.
    fn meet(&self, ctx: &mut OpContext, a: &Self::Value, b: &Self::Value) -> Self::Value;

    /// The points of `v` satisfying every constraint of `cs`, over-approximated.
    fn meet_lincons(&self, ctx: &mut OpContext, v: &Self::Value, cs: &[Lincons0]) -> Self::Value;

    /// The points of `v` satisfying every constraint of `cs`, over-approximated. By default the
    /// constraints are linearized over the bounds of `v`.
    fn meet_tcons(&self, ctx: &mut OpContext, v: &Self::Value, cs: &[Tcons0]) -> Self::Value {
        let kind = self.scalar_kind();
        let b = self.to_box(ctx, v);
        let lin: Vec<Lincons0> = cs
            .iter()
            .map(|c| {
                let e = c.tree.linearize(&b, kind);
                Lincons0 {
                    typ: c.typ,
                    expr: e,
                    modulus: c.modulus.clone(),
                }
            })
            .collect();
        if cs.iter().any(|c| c.tree.to_linexpr0().is_none()) {
            ctx.inexact();
        }
        self.meet_lincons(ctx, v, &lin)
    }

    /// Least upper bound, or an over-approximation of it.
    fn join(&self, ctx: &mut OpContext, a: &Self::Value, b: &Self::Value) -> Self::Value;

    /// An upper bound of `a` and `b` such that iterating it along an ascending chain stabilizes.
    fn widening(&self, ctx: &mut OpContext, a: &Self::Value, b: &Self::Value) -> Self::Value;

    /// Widening that keeps every threshold constraint satisfied by both arguments.
    fn widening_threshold(
        &self,
        ctx: &mut OpContext,
        a: &Self::Value,
        b: &Self::Value,
        thresholds: &[Lincons0],
    ) -> Self::Value {
        let w = self.widening(ctx, a, b);
        let kept: Vec<Lincons0> = thresholds
            .iter()
            .filter(|c| self.sat_lincons(ctx, a, c) && self.sat_lincons(ctx, b, c))
            .cloned()
            .collect();
        self.meet_lincons(ctx, &w, &kept)
    }

    /// Insert unconstrained dimensions, or dimensions equal to zero if `project`.
    fn add_dimensions(
        &self,
        ctx: &mut OpContext,
        v: &Self::Value,
        dc: &DimChange,
        project: bool,
    ) -> Self::Value;

    /// Project out dimensions.
    fn remove_dimensions(&self, ctx: &mut OpContext, v: &Self::Value, dc: &DimChange)
        -> Self::Value;

    /// Rename dimensions: dimension `i` moves to `perm[i]`.
    fn permute_dimensions(&self, ctx: &mut OpContext, v: &Self::Value, perm: &DimPerm)
        -> Self::Value;

    /// Lose all information about `dims`, or set them to zero if `project`.
    fn forget(&self, ctx: &mut OpContext, v: &Self::Value, dims: &[Dim], project: bool)
        -> Self::Value;

    /// Simultaneous assignment `dims[k] := exprs[k]`, evaluated on `v`.
    ///
    /// By default, fresh dimensions `t_k` are appended, constrained by `t_k = exprs[k]`, the
    /// assigned dimensions are forgotten and swapped with the fresh ones, and the fresh dimensions
    /// are removed.
    ///
    /// # Panics
    /// Panics if `dims` and `exprs` have different lengths.
    fn assign_linexpr_array(
        &self,
        ctx: &mut OpContext,
        v: &Self::Value,
        dims: &[Dim],
        exprs: &[LinExpr0],
    ) -> Self::Value {
        if dims.len() != exprs.len() {
            panic!("Mismatched lengths in DomainBackend::assign_linexpr_array");
        }
        let (size, add, remove) = fresh_dims(self.dimension(v), dims.len());
        let w = self.add_dimensions(ctx, v, &add, false);
        let defs = definitions(size, exprs);
        let w = self.meet_lincons(ctx, &w, &defs);
        let w = self.forget(ctx, &w, dims, false);
        let w = self.permute_dimensions(ctx, &w, &swap_fresh(size, dims));
        self.remove_dimensions(ctx, &w, &remove)
    }

    /// Simultaneous substitution `dims[k] := exprs[k]`: the points whose image by the assignment
    /// lies in `v`.
    ///
    /// # Panics
    /// Panics if `dims` and `exprs` have different lengths.
    fn substitute_linexpr_array(
        &self,
        ctx: &mut OpContext,
        v: &Self::Value,
        dims: &[Dim],
        exprs: &[LinExpr0],
    ) -> Self::Value {
        if dims.len() != exprs.len() {
            panic!("Mismatched lengths in DomainBackend::substitute_linexpr_array");
        }
        let (size, add, remove) = fresh_dims(self.dimension(v), dims.len());
        let w = self.add_dimensions(ctx, v, &add, false);
        let w = self.permute_dimensions(ctx, &w, &swap_fresh(size, dims));
        let defs = definitions(size, exprs);
        let w = self.meet_lincons(ctx, &w, &defs);
        self.remove_dimensions(ctx, &w, &remove)
    }

    /// Simultaneous assignment of tree expressions, linearized over the bounds of `v`.
    fn assign_texpr_array(
        &self,
        ctx: &mut OpContext,
        v: &Self::Value,
        dims: &[Dim],
        trees: &[Tree],
    ) -> Self::Value {
        let exprs = self.linearize_all(ctx, v, trees);
        self.assign_linexpr_array(ctx, v, dims, &exprs)
    }

    /// Simultaneous substitution of tree expressions, linearized over the bounds of `v`.
    fn substitute_texpr_array(
        &self,
        ctx: &mut OpContext,
        v: &Self::Value,
        dims: &[Dim],
        trees: &[Tree],
    ) -> Self::Value {
        let exprs = self.linearize_all(ctx, v, trees);
        self.substitute_linexpr_array(ctx, v, dims, &exprs)
    }

    /// Linearize trees over the bounds of `v`, marking the operation inexact when a tree is not
    /// exactly affine.
    fn linearize_all(&self, ctx: &mut OpContext, v: &Self::Value, trees: &[Tree]) -> Vec<LinExpr0> {
        let kind = self.scalar_kind();
        let b = self.to_box(ctx, v);
        trees
            .iter()
            .map(|t| match t.to_linexpr0() {
                Some(e) => e,
                None => {
                    ctx.inexact();
                    t.linearize(&b, kind)
                }
            })
            .collect()
    }
}

// Whether an enclosure `b` of an expression proves `expr typ 0`.
fn bound_satisfies(b: &Interval, typ: ConsType) -> bool {
    if b.is_bottom() {
        return true;
    }
    match typ {
        ConsType::Eq | ConsType::EqMod => b.is_zero(),
        ConsType::SupEq => b.inf().sign() >= 0,
        ConsType::Sup => b.inf().sign() > 0,
        ConsType::DisEq => !b.contains_zero(),
    }
}

// The changes appending `n` real dimensions to a space and removing them again.
fn fresh_dims(dim: Dimension, n: usize) -> (usize, DimChange, DimChange) {
    let size = dim.size();
    let add = DimChange::new(vec![size as Dim; n], 0, n);
    let remove = DimChange::new((size..size + n).map(|d| d as Dim).collect(), 0, n);
    (size, add, remove)
}

// The permutation exchanging each `dims[k]` with the fresh dimension `size + k`.
fn swap_fresh(size: usize, dims: &[Dim]) -> DimPerm {
    let mut perm = DimPerm::identity(size + dims.len());
    for (k, d) in dims.iter().enumerate() {
        perm.swap(*d, (size + k) as Dim);
    }
    perm
}

// The constraints `t_k - exprs[k] = 0` with `t_k = size + k`.
fn definitions(size: usize, exprs: &[LinExpr0]) -> Vec<Lincons0> {
    exprs
        .iter()
        .enumerate()
        .map(|(k, e)| {
            let mut c = e.neg();
            if c.is_dense() {
                c = LinExpr0::from_terms(c.iter().map(|(d, x)| (d, x.clone())), c.cst().clone());
            }
            c.set_coeff((size + k) as Dim, Coeff::mpq(1, 1));
            Lincons0::new(ConsType::Eq, c)
        })
        .collect()
}

/// Join a set of abstract values.
///
/// # Arguments
/// * `man` - The manager of every value.
/// * `env` - The environment of the result. Values over smaller environments are embedded in it.
/// * `es` - The values to join.
///
/// # Errors
/// Fails if one of the values cannot be embedded in `env`.
///
/// # Examples
/// ```
/// # use numdom::*;
/// # use numdom::num::Interval;
/// # use numdom::numerical::BoxDomain;
/// let man = Manager::new(BoxDomain::double());
/// let env = Environment::new(&[], &[Var::new("x")]).unwrap();
/// let x = Var::new("x");
/// let a = AbstractValue::of_box(&man, &env, &[(x.clone(), Interval::of_doubles(0., 1.))]).unwrap();
/// let b = AbstractValue::of_box(&man, &env, &[(x.clone(), Interval::of_doubles(3., 4.))]).unwrap();
/// let j = join_all(&man, &env, vec![a, b].iter()).unwrap();
/// assert_eq!(j.bound_variable(&x).unwrap(), Interval::of_doubles(0., 4.));
/// ```
pub fn join_all<'a, B: DomainBackend + 'a, I>(
    man: &Manager<B>,
    env: &Environment,
    es: I,
) -> Result<AbstractValue<B>>
where
    I: IntoIterator<Item = &'a AbstractValue<B>>,
{
    es.into_iter()
        .try_fold(AbstractValue::bottom(man, env), |acc, x| acc.join(x))
}

/// Meet a set of abstract values.
///
/// # Arguments
/// * `man` - The manager of every value.
/// * `env` - The environment of the result. Values over smaller environments are embedded in it.
/// * `es` - The values to meet.
///
/// # Errors
/// Fails if one of the values cannot be embedded in `env`.
///
/// # Examples
/// ```
/// # use numdom::*;
/// # use numdom::num::Interval;
/// # use numdom::numerical::BoxDomain;
/// let man = Manager::new(BoxDomain::double());
/// let env = Environment::new(&[], &[Var::new("x")]).unwrap();
/// let x = Var::new("x");
/// let a = AbstractValue::of_box(&man, &env, &[(x.clone(), Interval::of_doubles(0., 2.))]).unwrap();
/// let b = AbstractValue::of_box(&man, &env, &[(x.clone(), Interval::of_doubles(1., 4.))]).unwrap();
/// let m = meet_all(&man, &env, vec![a, b].iter()).unwrap();
/// assert_eq!(m.bound_variable(&x).unwrap(), Interval::of_doubles(1., 2.));
/// ```
pub fn meet_all<'a, B: DomainBackend + 'a, I>(
    man: &Manager<B>,
    env: &Environment,
    es: I,
) -> Result<AbstractValue<B>>
where
    I: IntoIterator<Item = &'a AbstractValue<B>>,
{
    es.into_iter()
        .try_fold(AbstractValue::top(man, env), |acc, x| acc.meet(x))
}
