//! Constraints: an expression compared with zero.
//!
//! Like expressions, constraints come at two levels. [`Lincons0`] and [`Tcons0`] refer to
//! dimensions and are what backends read and produce. [`Lincons`] and [`Tcons`] carry the
//! [`Environment`] naming those dimensions. Arrays share a single environment.
//!
//! [`Lincons0`]: ./struct.Lincons0.html
//! [`Tcons0`]: ./struct.Tcons0.html
//! [`Lincons`]: ./struct.Lincons.html
//! [`Tcons`]: ./struct.Tcons.html
//! [`Environment`]: ../environment/struct.Environment.html

use crate::environment::{DimChange, DimPerm, Environment};
use crate::error::Result;
use crate::expr::embedding;
use crate::expr::linexpr::{LinExpr, LinExpr0};
use crate::expr::texpr::{Tree, TreeExpr};
use crate::num::{Coeff, Interval, Scalar};
use crate::var::{Dim, Var};
use std::fmt;

/// The comparison of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsType {
    /// `e = 0`.
    Eq,
    /// `e >= 0`.
    SupEq,
    /// `e > 0`.
    Sup,
    /// `e = 0 mod k`.
    EqMod,
    /// `e != 0`.
    DisEq,
}

impl fmt::Display for ConsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConsType::Eq => "==",
            ConsType::SupEq => ">=",
            ConsType::Sup => ">",
            ConsType::EqMod => "%=",
            ConsType::DisEq => "!=",
        };
        f.write_str(s)
    }
}

// Whether a constant `c` can never satisfy `c typ 0`.
fn constant_unsat(c: &Interval, typ: ConsType, modulus: Option<&Scalar>) -> bool {
    if c.is_bottom() {
        return true;
    }
    match typ {
        ConsType::Eq => !c.contains_zero(),
        ConsType::EqMod => match modulus {
            Some(k) if !k.is_zero() => false,
            _ => !c.contains_zero(),
        },
        ConsType::SupEq => c.sup().sign() < 0,
        ConsType::Sup => c.sup().sign() <= 0,
        ConsType::DisEq => c.is_zero(),
    }
}

fn write_cons(
    f: &mut fmt::Formatter<'_>,
    typ: ConsType,
    modulus: Option<&Scalar>,
) -> fmt::Result {
    match modulus {
        Some(k) => write!(f, " {} {}", typ, k),
        None => write!(f, " {} 0", typ),
    }
}

/// A linear constraint over dimensions.
#[derive(Debug, Clone)]
pub struct Lincons0 {
    /// The comparison.
    pub typ: ConsType,
    /// The compared expression.
    pub expr: LinExpr0,
    /// The modulus of an `EqMod` constraint.
    pub modulus: Option<Scalar>,
}

impl Lincons0 {
    /// The constraint `expr typ 0`.
    pub fn new(typ: ConsType, expr: LinExpr0) -> Lincons0 {
        Lincons0 {
            typ,
            expr,
            modulus: None,
        }
    }

    /// The constraint `expr = 0 mod k`.
    pub fn with_modulus(expr: LinExpr0, k: Scalar) -> Lincons0 {
        Lincons0 {
            typ: ConsType::EqMod,
            expr,
            modulus: Some(k),
        }
    }

    /// The constraint `-1.0 >= 0`.
    pub fn unsat() -> Lincons0 {
        let mut e = LinExpr0::sparse();
        e.set_cst(Coeff::double(-1.0));
        Lincons0::new(ConsType::SupEq, e)
    }

    /// Syntactic unsatisfiability: the expression is constant and fails the comparison.
    pub fn is_unsat(&self) -> bool {
        self.expr.is_constant()
            && constant_unsat(&self.expr.cst().to_interval(), self.typ, self.modulus.as_ref())
    }

    /// Syntactic validity: the expression is constant and always passes the comparison.
    pub fn is_tautology(&self) -> bool {
        if !self.expr.is_constant() {
            return false;
        }
        let c = self.expr.cst().to_interval();
        match self.typ {
            ConsType::Eq => c.is_zero(),
            ConsType::SupEq => c.inf().sign() >= 0,
            ConsType::Sup => c.inf().sign() > 0,
            ConsType::DisEq => !c.contains_zero(),
            ConsType::EqMod => c.is_zero(),
        }
    }

    /// Re-index after adding dimensions.
    pub fn add_dimensions(&self, dc: &DimChange) -> Lincons0 {
        Lincons0 {
            typ: self.typ,
            expr: self.expr.add_dimensions(dc),
            modulus: self.modulus.clone(),
        }
    }

    /// Re-index through a permutation.
    pub fn permute(&self, perm: &DimPerm) -> Lincons0 {
        Lincons0 {
            typ: self.typ,
            expr: self.expr.permute(perm),
            modulus: self.modulus.clone(),
        }
    }

    /// Print using `name` for dimensions.
    pub fn fmt_with<F: Fn(Dim) -> String>(
        &self,
        f: &mut fmt::Formatter<'_>,
        name: F,
    ) -> fmt::Result {
        self.expr.fmt_with(f, name)?;
        write_cons(f, self.typ, self.modulus.as_ref())
    }
}

impl fmt::Display for Lincons0 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with(f, |d| format!("x{}", d))
    }
}

/// A tree constraint over dimensions.
#[derive(Debug, Clone)]
pub struct Tcons0 {
    /// The comparison.
    pub typ: ConsType,
    /// The compared expression.
    pub tree: Tree,
    /// The modulus of an `EqMod` constraint.
    pub modulus: Option<Scalar>,
}

impl Tcons0 {
    /// The constraint `tree typ 0`.
    pub fn new(typ: ConsType, tree: Tree) -> Tcons0 {
        Tcons0 {
            typ,
            tree,
            modulus: None,
        }
    }

    /// Syntactic unsatisfiability: the tree is a constant that fails the comparison.
    pub fn is_unsat(&self) -> bool {
        match &self.tree {
            Tree::Cst(c) => constant_unsat(&c.to_interval(), self.typ, self.modulus.as_ref()),
            _ => false,
        }
    }

    /// Re-index after adding dimensions.
    pub fn add_dimensions(&self, dc: &DimChange) -> Tcons0 {
        Tcons0 {
            typ: self.typ,
            tree: self.tree.add_dimensions(dc),
            modulus: self.modulus.clone(),
        }
    }

    /// Re-index through a permutation.
    pub fn permute(&self, perm: &DimPerm) -> Tcons0 {
        Tcons0 {
            typ: self.typ,
            tree: self.tree.permute(perm),
            modulus: self.modulus.clone(),
        }
    }

    /// Print using `name` for dimensions.
    pub fn fmt_with<F: Fn(Dim) -> String + Copy>(
        &self,
        f: &mut fmt::Formatter<'_>,
        name: F,
    ) -> fmt::Result {
        self.tree.fmt_with(f, name)?;
        write_cons(f, self.typ, self.modulus.as_ref())
    }
}

impl From<&Lincons0> for Tcons0 {
    fn from(c: &Lincons0) -> Tcons0 {
        Tcons0 {
            typ: c.typ,
            tree: Tree::from_linexpr0(&c.expr),
            modulus: c.modulus.clone(),
        }
    }
}

fn var_name(env: &Environment, d: Dim) -> String {
    match env.var_of_dim(d) {
        Some(v) => v.to_string(),
        None => format!("x{}", d),
    }
}

/// A linear constraint over the variables of an environment.
///
/// # Examples
/// ```
/// # use numdom::{ConsType, Environment, LinExpr, Lincons, Var};
/// # use numdom::num::Coeff;
/// let e = Environment::new(&[Var::new("x"), Var::new("y")], &[Var::new("z")]).unwrap();
/// let mut l = LinExpr::sparse(&e);
/// l.set_coeff(&Var::new("x"), Coeff::double(3.0)).unwrap();
/// l.set_coeff(&Var::new("z"), Coeff::double(-9.0)).unwrap();
/// l.set_cst(Coeff::double(8.0));
/// let c = Lincons::new(ConsType::SupEq, &l);
/// assert_eq!(c.to_string(), "3.0·x - 9.0·z + 8.0 >= 0");
/// assert!(!c.is_unsat());
/// assert!(Lincons::unsat(&e).is_unsat());
/// ```
#[derive(Debug, Clone)]
pub struct Lincons {
    env: Environment,
    inner: Lincons0,
}

impl Lincons {
    /// The constraint `expr typ 0`. The expression is copied; its environment is shared.
    pub fn new(typ: ConsType, expr: &LinExpr) -> Lincons {
        Lincons {
            env: expr.env().clone(),
            inner: Lincons0::new(typ, expr.expr().clone()),
        }
    }

    /// The constraint `expr = 0 mod k`.
    pub fn with_modulus(expr: &LinExpr, k: Scalar) -> Lincons {
        Lincons {
            env: expr.env().clone(),
            inner: Lincons0::with_modulus(expr.expr().clone(), k),
        }
    }

    /// Pair a dimension-level constraint with an environment.
    ///
    /// # Panics
    /// Panics if the constraint mentions a dimension outside `env`.
    pub fn from_cons0(env: &Environment, inner: Lincons0) -> Lincons {
        if inner.expr.support_size() > env.len() {
            panic!("Dimension too high in Lincons::from_cons0");
        }
        Lincons {
            env: env.clone(),
            inner,
        }
    }

    /// The unsatisfiable constraint `-1.0 >= 0` over `env`.
    pub fn unsat(env: &Environment) -> Lincons {
        Lincons {
            env: env.clone(),
            inner: Lincons0::unsat(),
        }
    }

    /// The environment.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// The dimension-level constraint.
    pub fn inner(&self) -> &Lincons0 {
        &self.inner
    }

    /// The comparison.
    pub fn typ(&self) -> ConsType {
        self.inner.typ
    }

    /// Replace the comparison.
    pub fn set_typ(&mut self, typ: ConsType) {
        self.inner.typ = typ;
    }

    /// The modulus of an `EqMod` constraint.
    pub fn modulus(&self) -> Option<&Scalar> {
        self.inner.modulus.as_ref()
    }

    /// Replace the modulus.
    pub fn set_modulus(&mut self, k: Option<Scalar>) {
        self.inner.modulus = k;
    }

    /// The constant of the expression.
    pub fn cst(&self) -> &Coeff {
        self.inner.expr.cst()
    }

    /// Replace the constant of the expression.
    pub fn set_cst(&mut self, c: Coeff) {
        self.inner.expr.set_cst(c);
    }

    /// The coefficient of `v`, zero when not materialized.
    ///
    /// # Errors
    /// Fails with `UnknownVariable` if `v` is not in the environment.
    pub fn coeff(&self, v: &Var) -> Result<Coeff> {
        self.linexpr().coeff(v)
    }

    /// Set the coefficient of `v`.
    ///
    /// # Errors
    /// Fails with `UnknownVariable` if `v` is not in the environment.
    pub fn set_coeff(&mut self, v: &Var, c: Coeff) -> Result<()> {
        let d = self.env.dim_of(v)?;
        self.inner.expr.set_coeff(d, c);
        Ok(())
    }

    /// A copy of the compared expression.
    pub fn linexpr(&self) -> LinExpr {
        LinExpr::from_expr0(&self.env, self.inner.expr.clone())
    }

    /// Syntactic unsatisfiability.
    pub fn is_unsat(&self) -> bool {
        self.inner.is_unsat()
    }

    /// The same constraint over a larger environment.
    ///
    /// # Errors
    /// Fails with `UnknownVariable` if `env` lacks one of the variables, or
    /// `IncompatibleEnvironment` if a variable changes type.
    pub fn extend_environment(&self, env: &Environment) -> Result<Lincons> {
        let inner = match embedding(&self.env, env)? {
            Some(dc) => self.inner.add_dimensions(&dc),
            None => self.inner.clone(),
        };
        Ok(Lincons {
            env: env.clone(),
            inner,
        })
    }
}

impl fmt::Display for Lincons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt_with(f, |d| var_name(&self.env, d))
    }
}

/// A tree constraint over the variables of an environment.
#[derive(Debug, Clone)]
pub struct Tcons {
    env: Environment,
    inner: Tcons0,
}

impl Tcons {
    /// The constraint `tree typ 0`, with an optional modulus for `EqMod`.
    pub fn make(tree: &TreeExpr, typ: ConsType, modulus: Option<Scalar>) -> Tcons {
        Tcons {
            env: tree.env().clone(),
            inner: Tcons0 {
                typ,
                tree: tree.root().clone(),
                modulus,
            },
        }
    }

    /// Pair a dimension-level constraint with an environment.
    ///
    /// # Panics
    /// Panics if the constraint mentions a dimension outside `env`.
    pub fn from_cons0(env: &Environment, inner: Tcons0) -> Tcons {
        if inner.tree.support_size() > env.len() {
            panic!("Dimension too high in Tcons::from_cons0");
        }
        Tcons {
            env: env.clone(),
            inner,
        }
    }

    /// The unsatisfiable constraint `-1.0 >= 0` over `env`.
    pub fn unsat(env: &Environment) -> Tcons {
        Tcons::from(&Lincons::unsat(env))
    }

    /// The environment.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// The dimension-level constraint.
    pub fn inner(&self) -> &Tcons0 {
        &self.inner
    }

    /// The comparison.
    pub fn typ(&self) -> ConsType {
        self.inner.typ
    }

    /// Replace the comparison.
    pub fn set_typ(&mut self, typ: ConsType) {
        self.inner.typ = typ;
    }

    /// The modulus of an `EqMod` constraint.
    pub fn modulus(&self) -> Option<&Scalar> {
        self.inner.modulus.as_ref()
    }

    /// A copy of the compared expression.
    pub fn texpr(&self) -> TreeExpr {
        TreeExpr::new(&self.env, self.inner.tree.clone())
    }

    /// Syntactic unsatisfiability.
    pub fn is_unsat(&self) -> bool {
        self.inner.is_unsat()
    }

    /// The same constraint over a larger environment.
    ///
    /// # Errors
    /// Fails with `UnknownVariable` if `env` lacks one of the variables, or
    /// `IncompatibleEnvironment` if a variable changes type.
    pub fn extend_environment(&self, env: &Environment) -> Result<Tcons> {
        let inner = match embedding(&self.env, env)? {
            Some(dc) => self.inner.add_dimensions(&dc),
            None => self.inner.clone(),
        };
        Ok(Tcons {
            env: env.clone(),
            inner,
        })
    }
}

impl From<&Lincons> for Tcons {
    fn from(c: &Lincons) -> Tcons {
        Tcons {
            env: c.env.clone(),
            inner: Tcons0::from(&c.inner),
        }
    }
}

impl fmt::Display for Tcons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env = &self.env;
        self.inner.fmt_with(f, |d| var_name(env, d))
    }
}

/// A conjunction of linear constraints over one environment.
#[derive(Debug, Clone)]
pub struct LinconsArray {
    env: Environment,
    items: Vec<Lincons0>,
}

impl LinconsArray {
    /// The empty conjunction over `env`.
    pub fn new(env: &Environment) -> LinconsArray {
        LinconsArray {
            env: env.clone(),
            items: Vec::new(),
        }
    }

    /// A conjunction of constraints, each moved to `env`.
    ///
    /// # Errors
    /// Fails if one of the constraints cannot be embedded in `env`.
    pub fn from_vec(env: &Environment, cons: &[Lincons]) -> Result<LinconsArray> {
        let mut a = LinconsArray::new(env);
        for c in cons {
            a.push(c)?;
        }
        Ok(a)
    }

    /// Pair dimension-level constraints with an environment.
    pub fn from_cons0(env: &Environment, items: Vec<Lincons0>) -> LinconsArray {
        LinconsArray {
            env: env.clone(),
            items,
        }
    }

    /// Append a constraint, re-embedding it if it was built over a sub-environment.
    ///
    /// # Errors
    /// Fails with `UnknownVariable` or `IncompatibleEnvironment` if the constraint does not fit.
    pub fn push(&mut self, c: &Lincons) -> Result<()> {
        let c = c.extend_environment(&self.env)?;
        self.items.push(c.inner);
        Ok(())
    }

    /// The environment.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Number of constraints.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there is no constraint.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The `i`-th constraint.
    pub fn get(&self, i: usize) -> Option<Lincons> {
        self.items.get(i).map(|c| Lincons {
            env: self.env.clone(),
            inner: c.clone(),
        })
    }

    /// The constraints.
    pub fn iter(&self) -> impl Iterator<Item = Lincons> + '_ {
        self.items.iter().map(move |c| Lincons {
            env: self.env.clone(),
            inner: c.clone(),
        })
    }

    /// The dimension-level constraints.
    pub fn as_cons0(&self) -> &[Lincons0] {
        &self.items
    }

    /// The same conjunction over a larger environment.
    ///
    /// # Errors
    /// Fails if `env` does not contain this environment.
    pub fn extend_environment(&self, env: &Environment) -> Result<LinconsArray> {
        let items = match embedding(&self.env, env)? {
            Some(dc) => self.items.iter().map(|c| c.add_dimensions(&dc)).collect(),
            None => self.items.clone(),
        };
        Ok(LinconsArray {
            env: env.clone(),
            items,
        })
    }
}

impl fmt::Display for LinconsArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, c) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(" , ")?;
            }
            c.fmt_with(f, |d| var_name(&self.env, d))?;
        }
        f.write_str("]")
    }
}

/// A conjunction of tree constraints over one environment.
#[derive(Debug, Clone)]
pub struct TconsArray {
    env: Environment,
    items: Vec<Tcons0>,
}

impl TconsArray {
    /// The empty conjunction over `env`.
    pub fn new(env: &Environment) -> TconsArray {
        TconsArray {
            env: env.clone(),
            items: Vec::new(),
        }
    }

    /// A conjunction of constraints, each moved to `env`.
    ///
    /// # Errors
    /// Fails if one of the constraints cannot be embedded in `env`.
    pub fn from_vec(env: &Environment, cons: &[Tcons]) -> Result<TconsArray> {
        let mut a = TconsArray::new(env);
        for c in cons {
            a.push(c)?;
        }
        Ok(a)
    }

    /// Pair dimension-level constraints with an environment.
    pub fn from_cons0(env: &Environment, items: Vec<Tcons0>) -> TconsArray {
        TconsArray {
            env: env.clone(),
            items,
        }
    }

    /// Append a constraint, re-embedding it if it was built over a sub-environment.
    ///
    /// # Errors
    /// Fails with `UnknownVariable` or `IncompatibleEnvironment` if the constraint does not fit.
    pub fn push(&mut self, c: &Tcons) -> Result<()> {
        let c = c.extend_environment(&self.env)?;
        self.items.push(c.inner);
        Ok(())
    }

    /// The environment.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Number of constraints.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there is no constraint.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The `i`-th constraint.
    pub fn get(&self, i: usize) -> Option<Tcons> {
        self.items.get(i).map(|c| Tcons {
            env: self.env.clone(),
            inner: c.clone(),
        })
    }

    /// The constraints.
    pub fn iter(&self) -> impl Iterator<Item = Tcons> + '_ {
        self.items.iter().map(move |c| Tcons {
            env: self.env.clone(),
            inner: c.clone(),
        })
    }

    /// The dimension-level constraints.
    pub fn as_cons0(&self) -> &[Tcons0] {
        &self.items
    }

    /// The same conjunction over a larger environment.
    ///
    /// # Errors
    /// Fails if `env` does not contain this environment.
    pub fn extend_environment(&self, env: &Environment) -> Result<TconsArray> {
        let items = match embedding(&self.env, env)? {
            Some(dc) => self.items.iter().map(|c| c.add_dimensions(&dc)).collect(),
            None => self.items.clone(),
        };
        Ok(TconsArray {
            env: env.clone(),
            items,
        })
    }
}

impl From<&LinconsArray> for TconsArray {
    fn from(a: &LinconsArray) -> TconsArray {
        TconsArray {
            env: a.env.clone(),
            items: a.items.iter().map(Tcons0::from).collect(),
        }
    }
}

impl fmt::Display for TconsArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env = &self.env;
        f.write_str("[")?;
        for (i, c) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(" , ")?;
            }
            c.fmt_with(f, |d| var_name(env, d))?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::var::vars;

    fn env() -> Environment {
        Environment::new(&vars(&["x", "y"]), &vars(&["z"])).unwrap()
    }

    fn sample(e: &Environment) -> LinExpr {
        let mut l = LinExpr::sparse(e);
        l.set_coeff(&Var::new("x"), Coeff::double(3.0)).unwrap();
        l.set_coeff(&Var::new("z"), Coeff::double(-9.0)).unwrap();
        l.set_cst(Coeff::double(8.0));
        l
    }

    #[test]
    fn display() {
        let e = env();
        let c = Lincons::new(ConsType::SupEq, &sample(&e));
        assert_eq!(c.to_string(), "3.0·x - 9.0·z + 8.0 >= 0");
        assert_eq!(Lincons::unsat(&e).to_string(), "-1.0 >= 0");
        let z = Lincons::new(ConsType::DisEq, &LinExpr::sparse(&e));
        assert_eq!(z.to_string(), "0.0 != 0");
        let m = Lincons::with_modulus(&sample(&e), Scalar::mpq(2, 1));
        assert_eq!(m.to_string(), "3.0·x - 9.0·z + 8.0 %= 2");
    }

    #[test]
    fn unsat() {
        let e = env();
        assert!(!Lincons::new(ConsType::SupEq, &sample(&e)).is_unsat());
        assert!(Lincons::unsat(&e).is_unsat());
        assert!(Lincons::new(ConsType::DisEq, &LinExpr::sparse(&e)).is_unsat());
        assert!(!Lincons::new(ConsType::SupEq, &LinExpr::sparse(&e)).is_unsat());
        assert!(Lincons::new(ConsType::Sup, &LinExpr::sparse(&e)).is_unsat());
        let mut c = Lincons::new(ConsType::Eq, &LinExpr::sparse(&e));
        c.set_cst(Coeff::from(Interval::of_doubles(1.0, 2.0)));
        assert!(c.is_unsat());
    }

    #[test]
    fn accessors() {
        let e = env();
        let mut c = Lincons::new(ConsType::SupEq, &LinExpr::sparse(&e));
        assert_eq!(c.typ().to_string(), ">=");
        assert_eq!(c.cst(), &Coeff::double(0.0));
        assert_eq!(c.coeff(&Var::new("x")).unwrap(), Coeff::double(0.0));
        c.set_typ(ConsType::DisEq);
        assert_eq!(c.to_string(), "0.0 != 0");
        c.set_typ(ConsType::SupEq);
        c.set_cst(Coeff::double(9.0));
        assert_eq!(c.to_string(), "9.0 >= 0");
        let mut c = Lincons::new(ConsType::SupEq, &LinExpr::sparse(&e));
        c.set_coeff(&Var::new("z"), Coeff::double(-9.0)).unwrap();
        assert_eq!(c.to_string(), "-9.0·z + 0.0 >= 0");
        assert!(c.set_coeff(&Var::new("w"), Coeff::double(1.0)).is_err());
    }

    #[test]
    fn tree_constraints() {
        let e = Environment::new(&vars(&["x0", "y"]), &vars(&["z"])).unwrap();
        let mut l = LinExpr::sparse(&e);
        l.set_coeff(&Var::new("x0"), Coeff::double(3.0)).unwrap();
        l.set_coeff(&Var::new("z"), Coeff::double(-9.0)).unwrap();
        l.set_cst(Coeff::double(8.0));
        let c = Tcons::from(&Lincons::new(ConsType::SupEq, &l));
        assert_eq!(c.to_string(), "8.0 + 3.0 · x0 - 9.0 · z >= 0");
        assert_eq!(Tcons::unsat(&e).to_string(), "-1.0 >= 0");
        assert!(Tcons::unsat(&e).is_unsat());
        let z = Tcons::from(&Lincons::new(ConsType::DisEq, &LinExpr::sparse(&e)));
        assert_eq!(z.to_string(), "0.0 != 0");
        assert!(!c.is_unsat());
    }

    #[test]
    fn arrays_reembed() {
        let e = env();
        let small = Environment::new(&vars(&["x"]), &[]).unwrap();
        let mut l = LinExpr::sparse(&small);
        l.set_coeff(&Var::new("x"), Coeff::double(1.0)).unwrap();
        let mut a = LinconsArray::new(&e);
        a.push(&Lincons::new(ConsType::SupEq, &l)).unwrap();
        a.push(&Lincons::new(ConsType::SupEq, &sample(&e))).unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(
            a.to_string(),
            "[1.0·x + 0.0 >= 0 , 3.0·x - 9.0·z + 8.0 >= 0]"
        );
        let t = TconsArray::from(&a);
        assert_eq!(t.to_string(), "[0.0 + 1.0 · x >= 0 , 8.0 + 3.0 · x - 9.0 · z >= 0]");
        let other = Environment::new(&[], &vars(&["x"])).unwrap();
        let mut b = LinconsArray::new(&other);
        assert!(b.push(&Lincons::new(ConsType::SupEq, &l)).is_err());
    }
}
