//! Abstract values over named variables.
//!
//! An [`AbstractValue`] pairs an [`Environment`] with a value of some [`DomainBackend`] and the
//! [`Manager`] it was built with. Operations never mutate their arguments: each one returns a new
//! value. Binary operations on values over different environments first embed both operands into
//! the least common environment. Every operation dispatches to the backend exactly once, so the
//! manager's flags and exception log describe the last operation performed.
//!
//! [`AbstractValue`]: ./struct.AbstractValue.html
//! [`Environment`]: ../environment/struct.Environment.html
//! [`DomainBackend`]: ../trait.DomainBackend.html
//! [`Manager`]: ../manager/struct.Manager.html

use crate::constraint::{Lincons, LinconsArray, Tcons, Tcons0, TconsArray};
use crate::environment::{DimChange, Dimension, Environment};
use crate::error::{Error, Result};
use crate::expr::{LinExpr, LinExpr0, Tree, TreeExpr};
use crate::manager::{FunId, Manager, OpContext};
use crate::num::Interval;
use crate::var::{Dim, Var};
use crate::DomainBackend;
use std::borrow::Cow;
use std::fmt;

/// An element of a numerical domain over an environment.
pub struct AbstractValue<B: DomainBackend> {
    man: Manager<B>,
    env: Environment,
    value: B::Value,
}

impl<B: DomainBackend> Clone for AbstractValue<B> {
    fn clone(&self) -> Self {
        AbstractValue {
            man: self.man.clone(),
            env: self.env.clone(),
            value: self.value.clone(),
        }
    }
}

impl<B: DomainBackend> fmt::Debug for AbstractValue<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbstractValue")
            .field("man", &self.man)
            .field("env", &self.env)
            .field("value", &self.value)
            .finish()
    }
}

/// Embed `v` with `dc` if it is given.
fn embed<'a, B: DomainBackend>(
    b: &B,
    ctx: &mut OpContext,
    v: &'a B::Value,
    dc: &Option<DimChange>,
) -> Cow<'a, B::Value> {
    match dc {
        Some(dc) => Cow::Owned(b.add_dimensions(ctx, v, dc, false)),
        None => Cow::Borrowed(v),
    }
}

/// The dimensions of `vars`, which must be pairwise distinct.
fn distinct_dims(env: &Environment, vars: &[Var]) -> Result<Vec<Dim>> {
    let mut dims = Vec::with_capacity(vars.len());
    for v in vars {
        let d = env.dim_of(v)?;
        if dims.contains(&d) {
            return Err(Error::DuplicateVariable(v.clone()));
        }
        dims.push(d);
    }
    Ok(dims)
}

impl<B: DomainBackend> AbstractValue<B> {
    fn wrap(&self, env: Environment, value: B::Value) -> AbstractValue<B> {
        AbstractValue {
            man: self.man.clone(),
            env,
            value,
        }
    }

    fn check_manager(&self, other: &AbstractValue<B>, op: &str) {
        if !self.man.same(&other.man) {
            panic!("Mismatched managers in AbstractValue::{}", op);
        }
    }

    /// The least common environment of `self` and `env`, with the change embedding `self`.
    fn unify(&self, env: &Environment) -> Result<(Environment, Option<DimChange>)> {
        let (lce, dc, _) = self.env.lce_with_changes(env)?;
        Ok((lce, dc))
    }

    fn binary<F>(&self, other: &AbstractValue<B>, funid: FunId, f: F) -> Result<AbstractValue<B>>
    where
        F: FnOnce(&B, &mut OpContext, &B::Value, &B::Value) -> B::Value,
    {
        let (env, c1, c2) = self.env.lce_with_changes(&other.env)?;
        let value = self.man.run(funid, |b, ctx| {
            let x = embed(b, ctx, &self.value, &c1);
            let y = embed(b, ctx, &other.value, &c2);
            f(b, ctx, &x, &y)
        });
        Ok(self.wrap(env, value))
    }

    fn compare<F>(&self, other: &AbstractValue<B>, funid: FunId, f: F) -> Result<bool>
    where
        F: FnOnce(&B, &mut OpContext, &B::Value, &B::Value) -> bool,
    {
        let (_, c1, c2) = self.env.lce_with_changes(&other.env)?;
        Ok(self.man.run(funid, |b, ctx| {
            let x = embed(b, ctx, &self.value, &c1);
            let y = embed(b, ctx, &other.value, &c2);
            f(b, ctx, &x, &y)
        }))
    }

    /// The universe over `env`.
    pub fn top(man: &Manager<B>, env: &Environment) -> AbstractValue<B> {
        let value = man.run(FunId::Top, |b, ctx| b.top(ctx, env.dimension()));
        AbstractValue {
            man: man.clone(),
            env: env.clone(),
            value,
        }
    }

    /// The empty value over `env`.
    pub fn bottom(man: &Manager<B>, env: &Environment) -> AbstractValue<B> {
        let value = man.run(FunId::Bottom, |b, ctx| b.bottom(ctx, env.dimension()));
        AbstractValue {
            man: man.clone(),
            env: env.clone(),
            value,
        }
    }

    /// The box constraining each listed variable to its interval. Variables that are not listed
    /// are unconstrained.
    ///
    /// # Arguments
    /// * `man` - The manager of the result.
    /// * `env` - The environment of the result.
    /// * `bounds` - Pairs of a variable and its interval.
    ///
    /// # Errors
    /// Fails with `UnknownVariable` if a variable is not in `env`.
    ///
    /// # Examples
    /// ```
    /// # use numdom::{AbstractValue, Environment, Manager, Var};
    /// # use numdom::num::Interval;
    /// # use numdom::numerical::BoxDomain;
    /// let man = Manager::new(BoxDomain::mpq());
    /// let env = Environment::new(&[], &[Var::new("x")]).unwrap();
    /// let v = AbstractValue::of_box(&man, &env, &[(Var::new("x"), Interval::of_rationals(0, 1, 1, 2))])
    ///     .unwrap();
    /// assert_eq!(v.bound_variable(&Var::new("x")).unwrap(), Interval::of_rationals(0, 1, 1, 2));
    /// ```
    pub fn of_box(
        man: &Manager<B>,
        env: &Environment,
        bounds: &[(Var, Interval)],
    ) -> Result<AbstractValue<B>> {
        let kind = man.backend().scalar_kind();
        let mut itvs = vec![Interval::top(kind); env.len()];
        for (v, itv) in bounds {
            let d = env.dim_of(v)? as usize;
            itvs[d] = itvs[d].meet(&itv.convert(kind));
        }
        let value = man.run(FunId::OfBox, |b, ctx| b.of_box(ctx, env.dimension(), &itvs));
        Ok(AbstractValue {
            man: man.clone(),
            env: env.clone(),
            value,
        })
    }

    /// The value satisfying every constraint of `cs`, over the environment of `cs`.
    pub fn from_lincons_array(man: &Manager<B>, cs: &LinconsArray) -> AbstractValue<B> {
        let env = cs.env();
        let value = man.run(FunId::MeetLinconsArray, |b, ctx| {
            let top = b.top(ctx, env.dimension());
            b.meet_lincons(ctx, &top, cs.as_cons0())
        });
        AbstractValue {
            man: man.clone(),
            env: env.clone(),
            value,
        }
    }

    /// The value satisfying every constraint of `cs`, over the environment of `cs`.
    pub fn from_tcons_array(man: &Manager<B>, cs: &TconsArray) -> AbstractValue<B> {
        let env = cs.env();
        let value = man.run(FunId::MeetTconsArray, |b, ctx| {
            let top = b.top(ctx, env.dimension());
            b.meet_tcons(ctx, &top, cs.as_cons0())
        });
        AbstractValue {
            man: man.clone(),
            env: env.clone(),
            value,
        }
    }

    /// The manager this value was built with.
    pub fn manager(&self) -> &Manager<B> {
        &self.man
    }

    /// The environment of this value.
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// The backend value.
    pub fn value(&self) -> &B::Value {
        &self.value
    }

    /// The number of integer and real dimensions.
    pub fn dimension(&self) -> Dimension {
        self.man.backend().dimension(&self.value)
    }

    /// Whether the value is empty.
    pub fn is_bottom(&self) -> bool {
        self.man.run(FunId::IsBottom, |b, ctx| b.is_bottom(ctx, &self.value))
    }

    /// Whether the value is the universe.
    pub fn is_top(&self) -> bool {
        self.man.run(FunId::IsTop, |b, ctx| b.is_top(ctx, &self.value))
    }

    /// Inclusion. A `true` answer is always correct.
    ///
    /// # Errors
    /// Fails if the environments cannot be unified.
    ///
    /// # Panics
    /// Panics if the values come from different managers.
    pub fn is_leq(&self, other: &AbstractValue<B>) -> Result<bool> {
        self.check_manager(other, "is_leq");
        self.compare(other, FunId::IsLeq, |b, ctx, x, y| b.is_leq(ctx, x, y))
    }

    /// Equality.
    ///
    /// # Errors
    /// Fails if the environments cannot be unified.
    ///
    /// # Panics
    /// Panics if the values come from different managers.
    pub fn is_eq(&self, other: &AbstractValue<B>) -> Result<bool> {
        self.check_manager(other, "is_eq");
        self.compare(other, FunId::IsEq, |b, ctx, x, y| b.is_eq(ctx, x, y))
    }

    /// Whether `v` is unconstrained.
    pub fn is_variable_unconstrained(&self, v: &Var) -> Result<bool> {
        let d = self.env.dim_of(v)?;
        Ok(self.man.run(FunId::IsDimensionUnconstrained, |b, ctx| {
            b.is_dimension_unconstrained(ctx, &self.value, d)
        }))
    }

    /// Whether `v` always lies in `itv`.
    pub fn sat_interval(&self, v: &Var, itv: &Interval) -> Result<bool> {
        let d = self.env.dim_of(v)?;
        Ok(self.man.run(FunId::SatInterval, |b, ctx| {
            b.sat_interval(ctx, &self.value, d, itv)
        }))
    }

    /// Whether every point satisfies `c`. The constraint may range over more variables than the
    /// value, which are then unconstrained.
    pub fn sat_lincons(&self, c: &Lincons) -> Result<bool> {
        let (env, dc) = self.unify(c.env())?;
        let c = c.extend_environment(&env)?;
        Ok(self.man.run(FunId::SatLincons, |b, ctx| {
            let v = embed(b, ctx, &self.value, &dc);
            b.sat_lincons(ctx, &v, c.inner())
        }))
    }

    /// Whether every point satisfies `c`.
    pub fn sat_tcons(&self, c: &Tcons) -> Result<bool> {
        let (env, dc) = self.unify(c.env())?;
        let c = c.extend_environment(&env)?;
        Ok(self.man.run(FunId::SatTcons, |b, ctx| {
            let v = embed(b, ctx, &self.value, &dc);
            b.sat_tcons(ctx, &v, c.inner())
        }))
    }

    /// An enclosure of the values of `v`.
    ///
    /// # Errors
    /// Fails with `UnknownVariable` if `v` is not in the environment.
    pub fn bound_variable(&self, v: &Var) -> Result<Interval> {
        let d = self.env.dim_of(v)?;
        Ok(self.man.run(FunId::BoundDimension, |b, ctx| {
            b.bound_dimension(ctx, &self.value, d)
        }))
    }

    /// An enclosure of the values of `e`.
    pub fn bound_linexpr(&self, e: &LinExpr) -> Result<Interval> {
        let (env, dc) = self.unify(e.env())?;
        let e = e.extend_environment(&env)?;
        Ok(self.man.run(FunId::BoundLinexpr, |b, ctx| {
            let v = embed(b, ctx, &self.value, &dc);
            b.bound_linexpr(ctx, &v, e.expr())
        }))
    }

    /// An enclosure of the values of `e`.
    pub fn bound_texpr(&self, e: &TreeExpr) -> Result<Interval> {
        let (env, dc) = self.unify(e.env())?;
        let e = e.extend_environment(&env)?;
        Ok(self.man.run(FunId::BoundTexpr, |b, ctx| {
            let v = embed(b, ctx, &self.value, &dc);
            b.bound_texpr(ctx, &v, e.root())
        }))
    }

    /// The bounds of every variable, in dimension order.
    pub fn to_box(&self) -> Vec<(Var, Interval)> {
        let itvs = self.man.run(FunId::ToBox, |b, ctx| b.to_box(ctx, &self.value));
        self.env.vars().cloned().zip(itvs).collect()
    }

    /// A conjunction of linear constraints enclosing the value.
    pub fn to_lincons_array(&self) -> LinconsArray {
        let cs = self
            .man
            .run(FunId::ToLinconsArray, |b, ctx| b.to_lincons(ctx, &self.value));
        LinconsArray::from_cons0(&self.env, cs)
    }

    /// A conjunction of tree constraints enclosing the value.
    pub fn to_tcons_array(&self) -> TconsArray {
        let cs = self
            .man
            .run(FunId::ToTconsArray, |b, ctx| b.to_lincons(ctx, &self.value));
        let items = cs
            .into_iter()
            .map(|c| Tcons0 {
                typ: c.typ,
                tree: Tree::from_linexpr0(&c.expr),
                modulus: c.modulus,
            })
            .collect();
        TconsArray::from_cons0(&self.env, items)
    }

    /// Greatest lower bound.
    ///
    /// # Panics
    /// Panics if the values come from different managers.
    pub fn meet(&self, other: &AbstractValue<B>) -> Result<AbstractValue<B>> {
        self.check_manager(other, "meet");
        self.binary(other, FunId::Meet, |b, ctx, x, y| b.meet(ctx, x, y))
    }

    /// Least upper bound, or an over-approximation of it when the backend cannot represent it.
    /// The manager's exactness flag tells which.
    ///
    /// # Panics
    /// Panics if the values come from different managers.
    pub fn join(&self, other: &AbstractValue<B>) -> Result<AbstractValue<B>> {
        self.check_manager(other, "join");
        self.binary(other, FunId::Join, |b, ctx, x, y| b.join(ctx, x, y))
    }

    fn fold_array<F>(
        man: &Manager<B>,
        env: &Environment,
        values: &[AbstractValue<B>],
        funid: FunId,
        unit: fn(&B, &mut OpContext, Dimension) -> B::Value,
        f: F,
    ) -> Result<AbstractValue<B>>
    where
        F: Fn(&B, &mut OpContext, &B::Value, &B::Value) -> B::Value,
    {
        let mut env = env.clone();
        for v in values {
            if !man.same(&v.man) {
                panic!("Mismatched managers in AbstractValue::{}", funid);
            }
            env = env.lce(&v.env)?;
        }
        let changes: Vec<Option<DimChange>> = values
            .iter()
            .map(|v| v.env.dimchange(&env).filter(|c| !c.is_empty()))
            .collect();
        let value = man.run(funid, |b, ctx| {
            let mut acc = unit(b, ctx, env.dimension());
            for (v, dc) in values.iter().zip(changes.iter()) {
                let x = embed(b, ctx, &v.value, dc);
                acc = f(b, ctx, &acc, &x);
            }
            acc
        });
        Ok(AbstractValue {
            man: man.clone(),
            env,
            value,
        })
    }

    /// The meet of all `values`, over the least common environment of `env` and theirs. The meet
    /// of no values is the universe over `env`.
    pub fn meet_array(
        man: &Manager<B>,
        env: &Environment,
        values: &[AbstractValue<B>],
    ) -> Result<AbstractValue<B>> {
        AbstractValue::fold_array(man, env, values, FunId::MeetArray, B::top, |b, ctx, x, y| {
            b.meet(ctx, x, y)
        })
    }

    /// The join of all `values`, over the least common environment of `env` and theirs. The join
    /// of no values is the empty value over `env`.
    pub fn join_array(
        man: &Manager<B>,
        env: &Environment,
        values: &[AbstractValue<B>],
    ) -> Result<AbstractValue<B>> {
        AbstractValue::fold_array(man, env, values, FunId::JoinArray, B::bottom, |b, ctx, x, y| {
            b.join(ctx, x, y)
        })
    }

    /// Add the constraints of `cs`.
    ///
    /// # Errors
    /// Fails if the environment of `cs` cannot be unified with that of the value.
    pub fn meet_lincons_array(&self, cs: &LinconsArray) -> Result<AbstractValue<B>> {
        let (env, dc) = self.unify(cs.env())?;
        let cs = cs.extend_environment(&env)?;
        let value = self.man.run(FunId::MeetLinconsArray, |b, ctx| {
            let v = embed(b, ctx, &self.value, &dc);
            b.meet_lincons(ctx, &v, cs.as_cons0())
        });
        Ok(self.wrap(env, value))
    }

    /// Add the constraints of `cs`, linearized over the bounds of the value.
    pub fn meet_tcons_array(&self, cs: &TconsArray) -> Result<AbstractValue<B>> {
        let (env, dc) = self.unify(cs.env())?;
        let cs = cs.extend_environment(&env)?;
        let value = self.man.run(FunId::MeetTconsArray, |b, ctx| {
            let v = embed(b, ctx, &self.value, &dc);
            b.meet_tcons(ctx, &v, cs.as_cons0())
        });
        Ok(self.wrap(env, value))
    }

    /// Widening of `self` by `other`, which should include `self`.
    ///
    /// The result includes both arguments, and iterating `x = x.widening(f(x))` along an
    /// ascending chain reaches a fixpoint in finitely many steps. The operator is neither
    /// monotone nor idempotent.
    ///
    /// # Panics
    /// Panics if the values come from different managers.
    pub fn widening(&self, other: &AbstractValue<B>) -> Result<AbstractValue<B>> {
        self.check_manager(other, "widening");
        self.binary(other, FunId::Widening, |b, ctx, x, y| b.widening(ctx, x, y))
    }

    /// Widening that keeps the constraints of `thresholds` satisfied by both arguments.
    pub fn widening_threshold(
        &self,
        other: &AbstractValue<B>,
        thresholds: &LinconsArray,
    ) -> Result<AbstractValue<B>> {
        self.check_manager(other, "widening_threshold");
        let (env, c1, c2) = self.env.lce_with_changes(&other.env)?;
        let env = env.lce(thresholds.env())?;
        let c1 = self.env.dimchange(&env).filter(|c| !c.is_empty()).or(c1);
        let c2 = other.env.dimchange(&env).filter(|c| !c.is_empty()).or(c2);
        let ts = thresholds.extend_environment(&env)?;
        let value = self.man.run(FunId::Widening, |b, ctx| {
            let x = embed(b, ctx, &self.value, &c1);
            let y = embed(b, ctx, &other.value, &c2);
            b.widening_threshold(ctx, &x, &y, ts.as_cons0())
        });
        Ok(self.wrap(env, value))
    }

    /// The environment covering the value and `envs`, the change embedding the value into it, and
    /// the dimensions of `vars` in it.
    fn prepare<'e, I>(&self, vars: &[Var], envs: I) -> Result<(Environment, Option<DimChange>, Vec<Dim>)>
    where
        I: IntoIterator<Item = &'e Environment>,
    {
        let mut env = self.env.clone();
        for e in envs {
            env = env.lce(e)?;
        }
        let dc = self.env.dimchange(&env).filter(|c| !c.is_empty());
        let dims = distinct_dims(&env, vars)?;
        Ok((env, dc, dims))
    }

    /// Assign `e` to `v`.
    pub fn assign(&self, v: &Var, e: &LinExpr) -> Result<AbstractValue<B>> {
        self.assign_array(std::slice::from_ref(v), std::slice::from_ref(e))
    }

    /// Assign `exprs[i]` to `vars[i]` for all `i` at once: every right-hand side is evaluated
    /// in the value before any assignment takes place.
    ///
    /// # Errors
    /// Fails with `ArityMismatch` if the slices differ in length, `DuplicateVariable` if a
    /// variable is assigned twice, or if an environment cannot be unified.
    ///
    /// # Examples
    /// ```
    /// # use numdom::*;
    /// # use numdom::num::{Coeff, Interval};
    /// # use numdom::numerical::BoxDomain;
    /// let man = Manager::new(BoxDomain::mpq());
    /// let (x, y) = (Var::new("x"), Var::new("y"));
    /// let env = Environment::new(&[], &[x.clone(), y.clone()]).unwrap();
    /// let v = AbstractValue::of_box(&man, &env, &[
    ///     (x.clone(), Interval::of_rationals(1, 1, 1, 1)),
    ///     (y.clone(), Interval::of_rationals(2, 1, 2, 1)),
    /// ]).unwrap();
    /// let ex = LinExpr::from_terms(&env, &[(x.clone(), Coeff::mpq(1, 1))], Coeff::mpq(0, 1)).unwrap();
    /// let ey = LinExpr::from_terms(&env, &[(y.clone(), Coeff::mpq(1, 1))], Coeff::mpq(0, 1)).unwrap();
    /// let swapped = v.assign_array(&[x.clone(), y.clone()], &[ey, ex]).unwrap();
    /// assert_eq!(swapped.bound_variable(&x).unwrap(), Interval::of_rationals(2, 1, 2, 1));
    /// assert_eq!(swapped.bound_variable(&y).unwrap(), Interval::of_rationals(1, 1, 1, 1));
    /// ```
    pub fn assign_array(&self, vars: &[Var], exprs: &[LinExpr]) -> Result<AbstractValue<B>> {
        if vars.len() != exprs.len() {
            return Err(Error::ArityMismatch(vars.len(), exprs.len()));
        }
        let (env, dc, dims) = self.prepare(vars, exprs.iter().map(|e| e.env()))?;
        let es = lin_exprs(&env, exprs)?;
        let value = self.man.run(FunId::AssignLinexprArray, |b, ctx| {
            let v = embed(b, ctx, &self.value, &dc);
            b.assign_linexpr_array(ctx, &v, &dims, &es)
        });
        Ok(self.wrap(env, value))
    }

    /// Assign the tree expression `e` to `v`.
    pub fn assign_texpr(&self, v: &Var, e: &TreeExpr) -> Result<AbstractValue<B>> {
        self.assign_texpr_array(std::slice::from_ref(v), std::slice::from_ref(e))
    }

    /// Simultaneous assignment of tree expressions.
    pub fn assign_texpr_array(&self, vars: &[Var], exprs: &[TreeExpr]) -> Result<AbstractValue<B>> {
        if vars.len() != exprs.len() {
            return Err(Error::ArityMismatch(vars.len(), exprs.len()));
        }
        let (env, dc, dims) = self.prepare(vars, exprs.iter().map(|e| e.env()))?;
        let ts = trees(&env, exprs)?;
        let value = self.man.run(FunId::AssignTexprArray, |b, ctx| {
            let v = embed(b, ctx, &self.value, &dc);
            b.assign_texpr_array(ctx, &v, &dims, &ts)
        });
        Ok(self.wrap(env, value))
    }

    /// Substitute `e` for `v`: the states whose image by the assignment `v := e` lies in the
    /// value.
    pub fn substitute(&self, v: &Var, e: &LinExpr) -> Result<AbstractValue<B>> {
        self.substitute_array(std::slice::from_ref(v), std::slice::from_ref(e))
    }

    /// Simultaneous substitution, the inverse image of [`assign_array`].
    ///
    /// [`assign_array`]: #method.assign_array
    pub fn substitute_array(&self, vars: &[Var], exprs: &[LinExpr]) -> Result<AbstractValue<B>> {
        if vars.len() != exprs.len() {
            return Err(Error::ArityMismatch(vars.len(), exprs.len()));
        }
        let (env, dc, dims) = self.prepare(vars, exprs.iter().map(|e| e.env()))?;
        let es = lin_exprs(&env, exprs)?;
        let value = self.man.run(FunId::SubstituteLinexprArray, |b, ctx| {
            let v = embed(b, ctx, &self.value, &dc);
            b.substitute_linexpr_array(ctx, &v, &dims, &es)
        });
        Ok(self.wrap(env, value))
    }

    /// Substitute the tree expression `e` for `v`.
    pub fn substitute_texpr(&self, v: &Var, e: &TreeExpr) -> Result<AbstractValue<B>> {
        self.substitute_texpr_array(std::slice::from_ref(v), std::slice::from_ref(e))
    }

    /// Simultaneous substitution of tree expressions.
    pub fn substitute_texpr_array(
        &self,
        vars: &[Var],
        exprs: &[TreeExpr],
    ) -> Result<AbstractValue<B>> {
        if vars.len() != exprs.len() {
            return Err(Error::ArityMismatch(vars.len(), exprs.len()));
        }
        let (env, dc, dims) = self.prepare(vars, exprs.iter().map(|e| e.env()))?;
        let ts = trees(&env, exprs)?;
        let value = self.man.run(FunId::SubstituteTexprArray, |b, ctx| {
            let v = embed(b, ctx, &self.value, &dc);
            b.substitute_texpr_array(ctx, &v, &dims, &ts)
        });
        Ok(self.wrap(env, value))
    }

    /// Existentially quantify `vars`.
    pub fn forget(&self, vars: &[Var]) -> Result<AbstractValue<B>> {
        self.forget_array(vars, false)
    }

    /// Existentially quantify `vars`, then set them to zero if `project` holds.
    ///
    /// # Errors
    /// Fails with `UnknownVariable` if a variable is not in the environment.
    pub fn forget_array(&self, vars: &[Var], project: bool) -> Result<AbstractValue<B>> {
        let mut dims = vars
            .iter()
            .map(|v| self.env.dim_of(v))
            .collect::<Result<Vec<Dim>>>()?;
        dims.sort_unstable();
        dims.dedup();
        let value = self.man.run(FunId::ForgetArray, |b, ctx| {
            b.forget(ctx, &self.value, &dims, project)
        });
        Ok(self.wrap(self.env.clone(), value))
    }

    /// Move the value to `env`. Variables of `env` not in the value are unconstrained. Variables
    /// of the value not in `env` are projected out.
    ///
    /// # Arguments
    /// * `env` - The new environment.
    /// * `project` - Whether constrained variables may be dropped. Without it, dropping a
    ///   constrained variable is an error.
    ///
    /// # Errors
    /// Fails with `IncompatibleEnvironment` if a variable changes type, or
    /// `ConstrainedVariable` if a constrained variable would be dropped without `project`.
    pub fn change_environment(&self, env: &Environment, project: bool) -> Result<AbstractValue<B>> {
        let changes = self.env.dimchange2(env)?;
        let union = self.env.lce(env)?;
        let value = self.man.run(FunId::ChangeEnvironment, |b, ctx| {
            let v = embed(b, ctx, &self.value, &changes.add);
            match &changes.remove {
                Some(rm) => {
                    if !project {
                        for d in rm.dims.iter() {
                            if !b.is_dimension_unconstrained(ctx, &v, *d) {
                                let var = union.var_of_dim(*d).cloned();
                                return Err(var);
                            }
                        }
                    }
                    Ok(b.remove_dimensions(ctx, &v, rm))
                }
                None => Ok(v.into_owned()),
            }
        });
        match value {
            Ok(value) => Ok(self.wrap(env.clone(), value)),
            Err(Some(v)) => Err(Error::ConstrainedVariable(v)),
            Err(None) => panic!("Dimension without a variable in AbstractValue::change_environment"),
        }
    }

    /// Rename `old[i]` into `new[i]` for every `i`.
    pub fn rename_array(&self, old: &[Var], new: &[Var]) -> Result<AbstractValue<B>> {
        let (env, perm) = self.env.rename(old, new)?;
        let value = self.man.run(FunId::RenameArray, |b, ctx| {
            b.permute_dimensions(ctx, &self.value, &perm)
        });
        Ok(self.wrap(env, value))
    }

    /// Drop the unconstrained variables from the environment.
    pub fn minimize_environment(&self) -> AbstractValue<B> {
        let (env, value) = self.man.run(FunId::ChangeEnvironment, |b, ctx| {
            let free: Vec<Dim> = (0..self.env.len() as Dim)
                .filter(|d| b.is_dimension_unconstrained(ctx, &self.value, *d))
                .collect();
            if free.is_empty() || b.is_bottom(ctx, &self.value) {
                return (self.env.clone(), self.value.clone());
            }
            let vars: Vec<Var> = free
                .iter()
                .filter_map(|d| self.env.var_of_dim(*d).cloned())
                .collect();
            let intdim = free.iter().filter(|d| self.env.is_int(**d)).count();
            let dc = DimChange::new(free.clone(), intdim, free.len() - intdim);
            match self.env.remove(&vars) {
                Ok(env) => (env, b.remove_dimensions(ctx, &self.value, &dc)),
                Err(_) => (self.env.clone(), self.value.clone()),
            }
        });
        self.wrap(env, value)
    }
}

fn lin_exprs(env: &Environment, exprs: &[LinExpr]) -> Result<Vec<LinExpr0>> {
    exprs
        .iter()
        .map(|e| e.extend_environment(env).map(|e| e.expr().clone()))
        .collect()
}

fn trees(env: &Environment, exprs: &[TreeExpr]) -> Result<Vec<Tree>> {
    exprs
        .iter()
        .map(|e| e.extend_environment(env).map(|e| e.root().clone()))
        .collect()
}

impl<B: DomainBackend> PartialEq for AbstractValue<B> {
    fn eq(&self, other: &Self) -> bool {
        self.man.same(&other.man) && self.is_eq(other).unwrap_or(false)
    }
}

impl<B: DomainBackend> fmt::Display for AbstractValue<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_lincons_array())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::constraint::ConsType;
    use crate::manager::Exc;
    use crate::num::Coeff;
    use crate::numerical::{BoxDomain, OctagonDomain, PolyhedraDomain};

    fn xyz() -> Environment {
        Environment::new(&[Var::new("x"), Var::new("y")], &[Var::new("z")]).unwrap()
    }

    fn q(n: i64) -> Coeff {
        Coeff::mpq(n, 1)
    }

    fn itv(a: i64, b: i64) -> Interval {
        Interval::of_rationals(a, 1, b, 1)
    }

    // coeffs . vars + cst >= 0
    fn ge(env: &Environment, terms: &[(&str, i64)], cst: i64) -> Lincons {
        let terms: Vec<(Var, Coeff)> = terms.iter().map(|(v, k)| (Var::new(v), q(*k))).collect();
        Lincons::new(ConsType::SupEq, &LinExpr::from_terms(env, &terms, q(cst)).unwrap())
    }

    #[test]
    fn lattice_identities() {
        let man = Manager::new(BoxDomain::mpq());
        let env = xyz();
        let v = AbstractValue::of_box(&man, &env, &[(Var::new("x"), itv(-2, 2))]).unwrap();
        let top = AbstractValue::top(&man, &env);
        let bot = AbstractValue::bottom(&man, &env);
        assert!(v.is_leq(&top).unwrap());
        assert!(bot.is_leq(&v).unwrap());
        assert!(v.meet(&bot).unwrap().is_bottom());
        assert!(v.join(&top).unwrap().is_top());
        assert_eq!(v.join(&v).unwrap(), v);
    }

    #[test]
    fn unknown_variable_is_rejected() {
        let man = Manager::new(BoxDomain::double());
        let env = xyz();
        let r = AbstractValue::of_box(&man, &env, &[(Var::new("w"), Interval::of_doubles(0., 1.))]);
        assert_eq!(r.err(), Some(Error::UnknownVariable(Var::new("w"))));
        let v = AbstractValue::top(&man, &env);
        assert!(v.bound_variable(&Var::new("w")).is_err());
    }

    #[test]
    fn binary_ops_unify_environments() {
        let man = Manager::new(OctagonDomain::new());
        let ex = Environment::new(&[], &[Var::new("x")]).unwrap();
        let ey = Environment::new(&[], &[Var::new("y")]).unwrap();
        let a = AbstractValue::of_box(&man, &ex, &[(Var::new("x"), itv(0, 1))]).unwrap();
        let b = AbstractValue::of_box(&man, &ey, &[(Var::new("y"), itv(2, 3))]).unwrap();
        let m = a.meet(&b).unwrap();
        assert_eq!(m.environment().len(), 2);
        assert_eq!(m.bound_variable(&Var::new("x")).unwrap(), itv(0, 1));
        assert_eq!(m.bound_variable(&Var::new("y")).unwrap(), itv(2, 3));
    }

    #[test]
    #[should_panic]
    fn mixing_managers_panics() {
        let env = xyz();
        let a = AbstractValue::top(&Manager::new(BoxDomain::mpq()), &env);
        let b = AbstractValue::top(&Manager::new(BoxDomain::mpq()), &env);
        let _ = a.meet(&b);
    }

    #[test]
    fn parallel_assignment_is_simultaneous() {
        let man = Manager::new(PolyhedraDomain::loose());
        let env = Environment::new(&[], &[Var::new("x"), Var::new("y")]).unwrap();
        let (x, y) = (Var::new("x"), Var::new("y"));
        let v = AbstractValue::of_box(&man, &env, &[(x.clone(), itv(1, 1)), (y.clone(), itv(5, 5))])
            .unwrap();
        let ex = LinExpr::from_terms(&env, &[(x.clone(), q(1))], q(0)).unwrap();
        let ey = LinExpr::from_terms(&env, &[(y.clone(), q(1))], q(0)).unwrap();
        let w = v.assign_array(&[x.clone(), y.clone()], &[ey.clone(), ex.clone()]).unwrap();
        assert_eq!(w.bound_variable(&x).unwrap(), itv(5, 5));
        assert_eq!(w.bound_variable(&y).unwrap(), itv(1, 1));
        assert_eq!(
            v.assign_array(&[x.clone(), x.clone()], &[ey, ex]).err(),
            Some(Error::DuplicateVariable(x.clone()))
        );
        assert_eq!(
            v.assign_array(&[x], &[]).err(),
            Some(Error::ArityMismatch(1, 0))
        );
    }

    #[test]
    fn substitution_is_the_inverse_image() {
        let man = Manager::new(OctagonDomain::new());
        let env = Environment::new(&[], &[Var::new("x")]).unwrap();
        let x = Var::new("x");
        let v = AbstractValue::of_box(&man, &env, &[(x.clone(), itv(2, 4))]).unwrap();
        // x := x + 1 lands in [2, 4] exactly when x is in [1, 3]
        let e = LinExpr::from_terms(&env, &[(x.clone(), q(1))], q(1)).unwrap();
        let s = v.substitute(&x, &e).unwrap();
        assert_eq!(s.bound_variable(&x).unwrap(), itv(1, 3));
        let a = v.assign(&x, &e).unwrap();
        assert_eq!(a.bound_variable(&x).unwrap(), itv(3, 5));
    }

    #[test]
    fn relational_constraints_survive_forget() {
        let man = Manager::new(PolyhedraDomain::loose());
        let env = xyz();
        let cs = LinconsArray::from_vec(
            &env,
            &[
                ge(&env, &[("x", -1), ("z", 1)], 0),
                ge(&env, &[("z", -1), ("y", 1)], 0),
                ge(&env, &[("x", 1)], 0),
            ],
        )
        .unwrap();
        let v = AbstractValue::from_lincons_array(&man, &cs);
        let f = v.forget(&[Var::new("z")]).unwrap();
        let le = ge(&env, &[("x", -1), ("y", 1)], 0);
        assert!(f.sat_lincons(&le).unwrap());
        assert!(f.is_variable_unconstrained(&Var::new("z")).unwrap());
        assert!(!f.is_variable_unconstrained(&Var::new("y")).unwrap());
    }

    #[test]
    fn environment_changes() {
        let man = Manager::new(BoxDomain::mpq());
        let env = xyz();
        let v = AbstractValue::of_box(&man, &env, &[(Var::new("x"), itv(0, 1))]).unwrap();
        let small = Environment::new(&[Var::new("x")], &[]).unwrap();
        let w = v.change_environment(&small, false).unwrap();
        assert_eq!(w.environment(), &small);
        assert_eq!(w.bound_variable(&Var::new("x")).unwrap(), itv(0, 1));

        let other = Environment::new(&[Var::new("y")], &[Var::new("w")]).unwrap();
        assert_eq!(
            v.change_environment(&other, false).err(),
            Some(Error::ConstrainedVariable(Var::new("x")))
        );
        let p = v.change_environment(&other, true).unwrap();
        assert!(p.is_top());

        let m = v.minimize_environment();
        assert_eq!(m.environment(), &small);

        let r = v.rename_array(&[Var::new("x")], &[Var::new("a")]).unwrap();
        assert_eq!(r.bound_variable(&Var::new("a")).unwrap(), itv(0, 1));
    }

    #[test]
    fn constraints_round_trip() {
        let man = Manager::new(OctagonDomain::new());
        let env = xyz();
        let cs = LinconsArray::from_vec(
            &env,
            &[ge(&env, &[("x", 1), ("y", -1)], 2), ge(&env, &[("y", 1)], 3)],
        )
        .unwrap();
        let v = AbstractValue::from_lincons_array(&man, &cs);
        let back = AbstractValue::from_lincons_array(&man, &v.to_lincons_array());
        assert_eq!(back, v);
        let tback = AbstractValue::from_tcons_array(&man, &v.to_tcons_array());
        assert!(v.is_leq(&tback).unwrap());
    }

    #[test]
    fn arrays_and_thresholds() {
        let man = Manager::new(BoxDomain::mpq());
        let env = Environment::new(&[], &[Var::new("x")]).unwrap();
        let x = Var::new("x");
        let a = AbstractValue::of_box(&man, &env, &[(x.clone(), itv(0, 1))]).unwrap();
        let b = AbstractValue::of_box(&man, &env, &[(x.clone(), itv(0, 2))]).unwrap();
        let j = AbstractValue::join_array(&man, &env, &[a.clone(), b.clone()]).unwrap();
        assert_eq!(j, b);
        let m = AbstractValue::meet_array(&man, &env, &[a.clone(), b.clone()]).unwrap();
        assert_eq!(m, a);
        assert!(AbstractValue::join_array(&man, &env, &[]).unwrap().is_bottom());

        let w = a.widening(&b).unwrap();
        assert!(w.bound_variable(&x).unwrap().sup().is_infty());
        let t = LinconsArray::from_vec(&env, &[ge(&env, &[("x", -1)], 10)]).unwrap();
        let wt = a.widening_threshold(&b, &t).unwrap();
        assert_eq!(wt.bound_variable(&x).unwrap(), itv(0, 10));
    }

    #[test]
    fn flags_follow_the_last_operation() {
        let man = Manager::new(BoxDomain::mpq());
        let env = Environment::new(&[], &[Var::new("x")]).unwrap();
        let x = Var::new("x");
        let a = AbstractValue::of_box(&man, &env, &[(x.clone(), itv(0, 1))]).unwrap();
        let b = AbstractValue::of_box(&man, &env, &[(x.clone(), itv(3, 4))]).unwrap();
        let _ = a.join(&b).unwrap();
        assert!(!man.flag_exact());
        let _ = a.meet(&b).unwrap();
        assert!(man.flag_exact());
        assert_eq!(man.exn(), Exc::None);
    }
}
