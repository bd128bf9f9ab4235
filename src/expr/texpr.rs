//! Tree expressions: arbitrary arithmetic over constants and dimensions, with the rounding of
//! every operation made explicit.
//!
//! Each operator node carries a result type ([`RType`]) and a rounding direction ([`RDir`]). A
//! node of type `Real` is exact. Any other type rounds the exact result of the node to integers
//! or to the given floating point format, so that the tree can model machine arithmetic soundly.
//!
//! [`RType`]: ./enum.RType.html
//! [`RDir`]: ./enum.RDir.html

use crate::environment::{DimChange, DimPerm, Environment};
use crate::error::Result;
use crate::expr::embedding;
use crate::expr::linexpr::{LinExpr, LinExpr0};
use crate::num::{Coeff, Interval, Round, Scalar, ScalarKind};
use crate::var::{Dim, Var};
use log::trace;
use std::collections::BTreeMap;
use std::fmt;

/// Operators of tree expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TexprOp {
    /// Binary `+`.
    Add,
    /// Binary `-`.
    Sub,
    /// Binary `·`.
    Mul,
    /// Binary `/`.
    Div,
    /// Binary `%`, the truncated remainder.
    Mod,
    /// Binary `^`.
    Pow,
    /// Unary `-`.
    Neg,
    /// Unary rounding to the node's result type.
    Cast,
    /// Unary square root.
    Sqrt,
}

impl TexprOp {
    /// Whether the operator takes one argument.
    pub fn is_unary(self) -> bool {
        matches!(self, TexprOp::Neg | TexprOp::Cast | TexprOp::Sqrt)
    }

    /// Whether the operator takes two arguments.
    pub fn is_binary(self) -> bool {
        !self.is_unary()
    }

    fn precedence(self) -> u8 {
        match self {
            TexprOp::Add | TexprOp::Sub => 1,
            TexprOp::Mul | TexprOp::Div | TexprOp::Mod => 2,
            TexprOp::Pow => 3,
            TexprOp::Neg => 4,
            TexprOp::Cast | TexprOp::Sqrt => 5,
        }
    }
}

impl fmt::Display for TexprOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TexprOp::Add => "+",
            TexprOp::Sub | TexprOp::Neg => "-",
            TexprOp::Mul => "·",
            TexprOp::Div => "/",
            TexprOp::Mod => "%",
            TexprOp::Pow => "^",
            TexprOp::Cast => "cast",
            TexprOp::Sqrt => "sqrt",
        };
        f.write_str(s)
    }
}

/// The type an operator node rounds its result to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RType {
    /// Exact real arithmetic.
    Real,
    /// Integers.
    Int,
    /// IEEE 754 single precision.
    Single,
    /// IEEE 754 double precision.
    Double,
    /// 80-bit extended precision.
    Extended,
    /// 128-bit quadruple precision.
    Quad,
}

impl RType {
    /// Mantissa precision in bits of a floating point result type.
    pub fn precision(&self) -> Option<u32> {
        match self {
            RType::Real | RType::Int => None,
            RType::Single => Some(24),
            RType::Double => Some(53),
            RType::Extended => Some(64),
            RType::Quad => Some(113),
        }
    }

    /// Largest binary exponent of a finite value of a floating point result type.
    pub fn max_exponent(&self) -> Option<u32> {
        match self {
            RType::Real | RType::Int => None,
            RType::Single => Some(127),
            RType::Double => Some(1023),
            RType::Extended | RType::Quad => Some(16383),
        }
    }
}

/// The direction a node rounds in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RDir {
    /// To nearest.
    Nearest,
    /// Toward zero.
    Zero,
    /// Toward `+∞`.
    Up,
    /// Toward `-∞`.
    Down,
    /// Any direction, chosen anew at each evaluation.
    Rnd,
    /// Any direction, unknown but fixed.
    Any,
}

/// A tree expression over dimensions.
#[derive(Debug, Clone)]
pub enum Tree {
    /// A constant.
    Cst(Coeff),
    /// A dimension.
    Dim(Dim),
    /// A unary operator node.
    Unary {
        /// The operator, one of `Neg`, `Cast` and `Sqrt`.
        op: TexprOp,
        /// Result type.
        rtype: RType,
        /// Rounding direction.
        rdir: RDir,
        /// The argument.
        arg: Box<Tree>,
    },
    /// A binary operator node.
    Binary {
        /// The operator.
        op: TexprOp,
        /// Result type.
        rtype: RType,
        /// Rounding direction.
        rdir: RDir,
        /// Left operand.
        lhs: Box<Tree>,
        /// Right operand.
        rhs: Box<Tree>,
    },
}

// An affine form with interval coefficients, used while linearizing.
#[derive(Debug, Clone)]
struct Affine {
    cst: Interval,
    terms: BTreeMap<Dim, Interval>,
}

impl Affine {
    fn constant(cst: Interval) -> Affine {
        Affine {
            cst,
            terms: BTreeMap::new(),
        }
    }

    fn is_constant(&self) -> bool {
        self.terms.values().all(|c| c.is_zero())
    }

    fn add(mut self, other: Affine) -> Affine {
        self.cst = self.cst.add(&other.cst);
        for (d, c) in other.terms {
            let sum = match self.terms.get(&d) {
                Some(a) => a.add(&c),
                None => c,
            };
            self.terms.insert(d, sum);
        }
        self
    }

    fn neg(self) -> Affine {
        Affine {
            cst: self.cst.neg(),
            terms: self.terms.into_iter().map(|(d, c)| (d, c.neg())).collect(),
        }
    }

    fn mul(self, k: &Interval) -> Affine {
        Affine {
            cst: self.cst.mul(k),
            terms: self.terms.into_iter().map(|(d, c)| (d, c.mul(k))).collect(),
        }
    }

    fn eval(&self, bounds: &[Interval], kind: ScalarKind) -> Interval {
        let mut acc = self.cst.clone();
        for (d, c) in self.terms.iter() {
            acc = acc.add(&c.mul(&bounds[*d as usize].convert(kind)));
        }
        acc
    }

    fn into_linexpr(self) -> LinExpr0 {
        LinExpr0::from_terms(
            self.terms
                .into_iter()
                .map(|(d, c)| (d, Coeff::Interval(c).reduce())),
            Coeff::Interval(self.cst).reduce(),
        )
    }
}

impl Tree {
    /// A constant leaf.
    pub fn cst(c: Coeff) -> Tree {
        Tree::Cst(c)
    }

    /// A dimension leaf.
    pub fn dim(d: Dim) -> Tree {
        Tree::Dim(d)
    }

    /// A unary node.
    ///
    /// # Panics
    /// Panics if `op` is binary.
    pub fn unary(op: TexprOp, arg: Tree, rtype: RType, rdir: RDir) -> Tree {
        if !op.is_unary() {
            panic!("Binary operator {:?} given one argument", op);
        }
        Tree::Unary {
            op,
            rtype,
            rdir,
            arg: Box::new(arg),
        }
    }

    /// A binary node.
    ///
    /// # Panics
    /// Panics if `op` is unary.
    pub fn binary(op: TexprOp, lhs: Tree, rhs: Tree, rtype: RType, rdir: RDir) -> Tree {
        if !op.is_binary() {
            panic!("Unary operator {:?} given two arguments", op);
        }
        Tree::Binary {
            op,
            rtype,
            rdir,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// The tree `((cst + c_0 · x_0) + c_1 · x_1) + ...` over the materialized terms of `e`,
    /// built from exact real nodes.
    pub fn from_linexpr0(e: &LinExpr0) -> Tree {
        let mut t = Tree::Cst(e.cst().clone());
        for (d, c) in e.iter() {
            let term = Tree::binary(
                TexprOp::Mul,
                Tree::Cst(c.clone()),
                Tree::Dim(d),
                RType::Real,
                RDir::Nearest,
            );
            t = Tree::binary(TexprOp::Add, t, term, RType::Real, RDir::Nearest);
        }
        t
    }

    /// Whether the tree mentions `d`.
    pub fn has_dim(&self, d: Dim) -> bool {
        match self {
            Tree::Cst(_) => false,
            Tree::Dim(e) => *e == d,
            Tree::Unary { arg, .. } => arg.has_dim(d),
            Tree::Binary { lhs, rhs, .. } => lhs.has_dim(d) || rhs.has_dim(d),
        }
    }

    /// Number of operator levels; leaves have depth 0.
    pub fn depth(&self) -> usize {
        match self {
            Tree::Cst(_) | Tree::Dim(_) => 0,
            Tree::Unary { arg, .. } => 1 + arg.depth(),
            Tree::Binary { lhs, rhs, .. } => 1 + lhs.depth().max(rhs.depth()),
        }
    }

    /// Number of operator nodes.
    pub fn size(&self) -> usize {
        match self {
            Tree::Cst(_) | Tree::Dim(_) => 0,
            Tree::Unary { arg, .. } => 1 + arg.size(),
            Tree::Binary { lhs, rhs, .. } => 1 + lhs.size() + rhs.size(),
        }
    }

    /// The largest dimension mentioned plus one.
    pub fn support_size(&self) -> usize {
        match self {
            Tree::Cst(_) => 0,
            Tree::Dim(d) => *d as usize + 1,
            Tree::Unary { arg, .. } => arg.support_size(),
            Tree::Binary { lhs, rhs, .. } => lhs.support_size().max(rhs.support_size()),
        }
    }

    /// Whether the tree is a single constant that is a non-degenerate interval.
    pub fn is_interval_cst(&self) -> bool {
        match self {
            Tree::Cst(Coeff::Interval(i)) => !i.is_point(),
            _ => false,
        }
    }

    /// Whether every constant of the tree is a scalar.
    pub fn is_scalar(&self) -> bool {
        match self {
            Tree::Cst(c) => c.is_scalar(),
            Tree::Dim(_) => true,
            Tree::Unary { arg, .. } => arg.is_scalar(),
            Tree::Binary { lhs, rhs, .. } => lhs.is_scalar() && rhs.is_scalar(),
        }
    }

    /// Replace every occurrence of `d` by its own copy of `replacement`.
    pub fn substitute(&self, d: Dim, replacement: &Tree) -> Tree {
        match self {
            Tree::Dim(e) if *e == d => replacement.clone(),
            Tree::Cst(_) | Tree::Dim(_) => self.clone(),
            Tree::Unary {
                op,
                rtype,
                rdir,
                arg,
            } => Tree::Unary {
                op: *op,
                rtype: *rtype,
                rdir: *rdir,
                arg: Box::new(arg.substitute(d, replacement)),
            },
            Tree::Binary {
                op,
                rtype,
                rdir,
                lhs,
                rhs,
            } => Tree::Binary {
                op: *op,
                rtype: *rtype,
                rdir: *rdir,
                lhs: Box::new(lhs.substitute(d, replacement)),
                rhs: Box::new(rhs.substitute(d, replacement)),
            },
        }
    }

    /// Rename every dimension through `f`.
    pub fn map_dims<F: Fn(Dim) -> Dim + Copy>(&self, f: F) -> Tree {
        match self {
            Tree::Cst(_) => self.clone(),
            Tree::Dim(d) => Tree::Dim(f(*d)),
            Tree::Unary {
                op,
                rtype,
                rdir,
                arg,
            } => Tree::Unary {
                op: *op,
                rtype: *rtype,
                rdir: *rdir,
                arg: Box::new(arg.map_dims(f)),
            },
            Tree::Binary {
                op,
                rtype,
                rdir,
                lhs,
                rhs,
            } => Tree::Binary {
                op: *op,
                rtype: *rtype,
                rdir: *rdir,
                lhs: Box::new(lhs.map_dims(f)),
                rhs: Box::new(rhs.map_dims(f)),
            },
        }
    }

    /// Re-index after adding dimensions.
    pub fn add_dimensions(&self, dc: &DimChange) -> Tree {
        let map = dc.add_map(self.support_size());
        self.map_dims(|d| map[d as usize])
    }

    /// Re-index through a permutation.
    pub fn permute(&self, perm: &DimPerm) -> Tree {
        self.map_dims(|d| perm.apply(d))
    }

    /// Sound interval enclosure of the tree when each dimension `d` ranges over `bounds[d]`.
    /// Every node's rounding is applied to its exact interval result.
    ///
    /// # Panics
    /// Panics if the tree mentions a dimension beyond `bounds`.
    pub fn eval(&self, bounds: &[Interval], kind: ScalarKind) -> Interval {
        match self {
            Tree::Cst(c) => c.to_interval_of(kind),
            Tree::Dim(d) => bounds[*d as usize].convert(kind),
            Tree::Unary {
                op,
                rtype,
                rdir,
                arg,
            } => {
                let a = arg.eval(bounds, kind);
                let exact = match op {
                    TexprOp::Neg => a.neg(),
                    TexprOp::Sqrt => a.sqrt(),
                    _ => a,
                };
                exact.round(*rtype, *rdir)
            }
            Tree::Binary {
                op,
                rtype,
                rdir,
                lhs,
                rhs,
            } => {
                let a = lhs.eval(bounds, kind);
                let b = rhs.eval(bounds, kind);
                let exact = match op {
                    TexprOp::Add => a.add(&b),
                    TexprOp::Sub => a.sub(&b),
                    TexprOp::Mul => a.mul(&b),
                    TexprOp::Div => a.div(&b),
                    TexprOp::Mod => a.modulo(&b),
                    _ => a.pow(&b),
                };
                exact.round(*rtype, *rdir)
            }
        }
    }

    fn affine(&self, bounds: &[Interval], kind: ScalarKind) -> Affine {
        let opaque = || Affine::constant(self.eval(bounds, kind));
        match self {
            Tree::Cst(c) => Affine::constant(c.to_interval_of(kind)),
            Tree::Dim(d) => {
                let mut terms = BTreeMap::new();
                terms.insert(*d, Interval::point(Scalar::from_i64(kind, 1, Round::Nearest)));
                Affine {
                    cst: Interval::point(Scalar::zero(kind)),
                    terms,
                }
            }
            Tree::Unary { rtype, .. } | Tree::Binary { rtype, .. } if *rtype != RType::Real => {
                opaque()
            }
            Tree::Unary { op, arg, .. } => match op {
                TexprOp::Neg => arg.affine(bounds, kind).neg(),
                TexprOp::Cast => arg.affine(bounds, kind),
                _ => opaque(),
            },
            Tree::Binary { op, lhs, rhs, .. } => match op {
                TexprOp::Add => lhs.affine(bounds, kind).add(rhs.affine(bounds, kind)),
                TexprOp::Sub => lhs.affine(bounds, kind).add(rhs.affine(bounds, kind).neg()),
                TexprOp::Mul => {
                    let a = lhs.affine(bounds, kind);
                    let b = rhs.affine(bounds, kind);
                    if a.is_constant() {
                        b.mul(&a.cst)
                    } else if b.is_constant() {
                        a.mul(&b.cst)
                    } else {
                        // Keep the left factor symbolic and bound the right one.
                        let k = b.eval(bounds, kind);
                        a.mul(&k)
                    }
                }
                TexprOp::Div => {
                    let b = rhs.eval(bounds, kind);
                    if b.is_bottom() || b.contains_zero() {
                        return opaque();
                    }
                    let one = Interval::point(Scalar::from_i64(kind, 1, Round::Nearest));
                    lhs.affine(bounds, kind).mul(&one.div(&b))
                }
                _ => opaque(),
            },
        }
    }

    /// Over-approximate the tree by a quasilinear expression: every coefficient is a scalar and
    /// only the constant may be an interval. Nonlinear subterms and rounded nodes are replaced by
    /// their interval enclosure over `bounds`.
    pub fn linearize(&self, bounds: &[Interval], kind: ScalarKind) -> LinExpr0 {
        let e = self.affine(bounds, kind).into_linexpr();
        let q = e.quasilinearize(bounds, kind);
        trace!("Linearized {} into {}", self, q);
        q
    }

    /// The tree as a linear expression, if it is built only from exact additions, subtractions,
    /// negations, casts to reals, and products or quotients by constants.
    pub fn to_linexpr0(&self) -> Option<LinExpr0> {
        self.exact_affine().map(|a| a.into_linexpr())
    }

    fn exact_affine(&self) -> Option<Affine> {
        match self {
            Tree::Cst(c) => Some(Affine::constant(c.to_interval())),
            Tree::Dim(d) => {
                let mut terms = BTreeMap::new();
                terms.insert(*d, Interval::of_rationals(1, 1, 1, 1));
                Some(Affine {
                    cst: Interval::of_rationals(0, 1, 0, 1),
                    terms,
                })
            }
            Tree::Unary { rtype, .. } | Tree::Binary { rtype, .. } if *rtype != RType::Real => {
                None
            }
            Tree::Unary { op, arg, .. } => match op {
                TexprOp::Neg => arg.exact_affine().map(Affine::neg),
                TexprOp::Cast => arg.exact_affine(),
                _ => None,
            },
            Tree::Binary { op, lhs, rhs, .. } => {
                let a = lhs.exact_affine()?;
                let b = rhs.exact_affine()?;
                let (a, b) = unify(a, b);
                match op {
                    TexprOp::Add => Some(a.add(b)),
                    TexprOp::Sub => Some(a.add(b.neg())),
                    TexprOp::Mul if a.is_constant() => Some(b.mul(&a.cst)),
                    TexprOp::Mul if b.is_constant() => Some(a.mul(&b.cst)),
                    TexprOp::Div if b.is_constant() && !b.cst.contains_zero() => {
                        let one = Interval::point(Scalar::from_i64(b.cst.kind(), 1, Round::Nearest));
                        Some(a.mul(&one.div(&b.cst)))
                    }
                    _ => None,
                }
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Tree::Cst(_) | Tree::Dim(_) => TexprOp::Neg.precedence(),
            Tree::Unary { op, .. } | Tree::Binary { op, .. } => op.precedence(),
        }
    }

    fn render<F: Fn(Dim) -> String + Copy>(&self, name: F) -> String {
        let wrap = |t: &Tree, paren: bool| {
            if paren {
                format!("({})", t.render(name))
            } else {
                t.render(name)
            }
        };
        match self {
            Tree::Cst(c) => c.to_string(),
            Tree::Dim(d) => name(*d),
            Tree::Unary { op, arg, .. } => {
                format!("{} {}", op, wrap(arg, arg.precedence() < op.precedence()))
            }
            Tree::Binary { op, lhs, rhs, .. } => format!(
                "{} {} {}",
                wrap(lhs, lhs.precedence() < op.precedence()),
                op,
                wrap(rhs, rhs.precedence() <= op.precedence())
            ),
        }
    }

    /// Print using `name` for dimensions.
    pub fn fmt_with<F>(&self, f: &mut fmt::Formatter<'_>, name: F) -> fmt::Result
    where
        F: Fn(Dim) -> String + Copy,
    {
        f.write_str(&self.render(name).replace("+ -", "- "))
    }
}

// Bring two exact affine forms to a common scalar kind, preferring exact rationals.
fn unify(a: Affine, b: Affine) -> (Affine, Affine) {
    let ka = a.cst.kind();
    let kb = b.cst.kind();
    if ka == kb {
        return (a, b);
    }
    let to = |x: Affine, k: ScalarKind| Affine {
        cst: x.cst.convert(k),
        terms: x.terms.into_iter().map(|(d, c)| (d, c.convert(k))).collect(),
    };
    let target = if ka == ScalarKind::Mpq || kb == ScalarKind::Mpq {
        ScalarKind::Mpq
    } else {
        ka
    };
    (to(a, target), to(b, target))
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with(f, |d| format!("x{}", d))
    }
}

/// A tree expression over the variables of an environment.
///
/// # Examples
/// ```
/// # use numdom::{Environment, LinExpr, TreeExpr, Var};
/// # use numdom::num::Coeff;
/// let e = Environment::new(&[Var::new("x"), Var::new("y")], &[Var::new("z")]).unwrap();
/// let mut l = LinExpr::sparse(&e);
/// l.set_coeff(&Var::new("x"), Coeff::mpq(1, 1)).unwrap();
/// l.set_cst(Coeff::mpq(3, 1));
/// let t = TreeExpr::from_linexpr(&l);
/// assert_eq!(t.to_string(), "3 + 1 · x");
/// ```
#[derive(Debug, Clone)]
pub struct TreeExpr {
    env: Environment,
    root: Tree,
}

impl TreeExpr {
    /// Pair a dimension-level tree with an environment.
    ///
    /// # Panics
    /// Panics if the tree mentions a dimension outside `env`.
    pub fn new(env: &Environment, root: Tree) -> TreeExpr {
        if root.support_size() > env.len() {
            panic!("Dimension too high in TreeExpr::new");
        }
        TreeExpr {
            env: env.clone(),
            root,
        }
    }

    /// The tree of a linear expression.
    pub fn from_linexpr(e: &LinExpr) -> TreeExpr {
        TreeExpr {
            env: e.env().clone(),
            root: Tree::from_linexpr0(e.expr()),
        }
    }

    /// A constant over `env`.
    pub fn cst(env: &Environment, c: Coeff) -> TreeExpr {
        TreeExpr {
            env: env.clone(),
            root: Tree::Cst(c),
        }
    }

    /// The variable `v` of `env`.
    ///
    /// # Errors
    /// Fails with `UnknownVariable` if `v` is not in `env`.
    pub fn var(env: &Environment, v: &Var) -> Result<TreeExpr> {
        Ok(TreeExpr {
            env: env.clone(),
            root: Tree::Dim(env.dim_of(v)?),
        })
    }

    /// A unary node.
    ///
    /// # Panics
    /// Panics if `op` is binary.
    pub fn unary(op: TexprOp, arg: &TreeExpr, rtype: RType, rdir: RDir) -> TreeExpr {
        TreeExpr {
            env: arg.env.clone(),
            root: Tree::unary(op, arg.root.clone(), rtype, rdir),
        }
    }

    /// A binary node. The operands are first moved to the union of their environments.
    ///
    /// # Errors
    /// Fails with `IncompatibleEnvironment` if a variable has different types in the operands.
    ///
    /// # Panics
    /// Panics if `op` is unary.
    pub fn binary(
        op: TexprOp,
        lhs: &TreeExpr,
        rhs: &TreeExpr,
        rtype: RType,
        rdir: RDir,
    ) -> Result<TreeExpr> {
        let env = lhs.env.lce(&rhs.env)?;
        let l = lhs.extend_environment(&env)?;
        let r = rhs.extend_environment(&env)?;
        Ok(TreeExpr {
            env,
            root: Tree::binary(op, l.root, r.root, rtype, rdir),
        })
    }

    /// Exact real sum.
    pub fn add(&self, other: &TreeExpr) -> Result<TreeExpr> {
        TreeExpr::binary(TexprOp::Add, self, other, RType::Real, RDir::Nearest)
    }

    /// Exact real difference.
    pub fn sub(&self, other: &TreeExpr) -> Result<TreeExpr> {
        TreeExpr::binary(TexprOp::Sub, self, other, RType::Real, RDir::Nearest)
    }

    /// Exact real product.
    pub fn mul(&self, other: &TreeExpr) -> Result<TreeExpr> {
        TreeExpr::binary(TexprOp::Mul, self, other, RType::Real, RDir::Nearest)
    }

    /// Exact real quotient.
    pub fn div(&self, other: &TreeExpr) -> Result<TreeExpr> {
        TreeExpr::binary(TexprOp::Div, self, other, RType::Real, RDir::Nearest)
    }

    /// Exact real negation.
    pub fn neg(&self) -> TreeExpr {
        TreeExpr::unary(TexprOp::Neg, self, RType::Real, RDir::Nearest)
    }

    /// The environment.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// The dimension-level tree.
    pub fn root(&self) -> &Tree {
        &self.root
    }

    /// Whether the tree mentions `v`.
    pub fn has_var(&self, v: &Var) -> bool {
        match self.env.dim_of(v) {
            Ok(d) => self.root.has_dim(d),
            Err(_) => false,
        }
    }

    /// Number of operator levels.
    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    /// Number of operator nodes.
    pub fn size(&self) -> usize {
        self.root.size()
    }

    /// Whether the tree is a single non-degenerate interval constant.
    pub fn is_interval_cst(&self) -> bool {
        self.root.is_interval_cst()
    }

    /// Whether every constant of the tree is a scalar.
    pub fn is_scalar(&self) -> bool {
        self.root.is_scalar()
    }

    /// Replace every occurrence of `v` by a fresh copy of `replacement`. When the two expressions
    /// live in different environments the result lives in their union.
    ///
    /// # Errors
    /// Fails with `UnknownVariable` if `v` is not in the environment, or
    /// `IncompatibleEnvironment` if the environments cannot be joined.
    ///
    /// # Examples
    /// ```
    /// # use numdom::{Environment, TreeExpr, Var};
    /// # use numdom::num::Coeff;
    /// let e = Environment::new(&[Var::new("x")], &[]).unwrap();
    /// let x = TreeExpr::var(&e, &Var::new("x")).unwrap();
    /// let t = TreeExpr::cst(&e, Coeff::mpq(3, 1)).add(&x).unwrap();
    /// let r = x.sub(&TreeExpr::cst(&e, Coeff::mpq(1, 1))).unwrap();
    /// assert_eq!(t.substitute(&Var::new("x"), &r).unwrap().to_string(), "3 + (x - 1)");
    /// ```
    pub fn substitute(&self, v: &Var, replacement: &TreeExpr) -> Result<TreeExpr> {
        self.env.dim_of(v)?;
        let env = self.env.lce(&replacement.env)?;
        let this = self.extend_environment(&env)?;
        let repl = replacement.extend_environment(&env)?;
        let d = env.dim_of(v)?;
        Ok(TreeExpr {
            root: this.root.substitute(d, &repl.root),
            env,
        })
    }

    /// The same tree over a larger environment.
    ///
    /// # Errors
    /// Fails with `UnknownVariable` if `env` lacks one of the variables, or
    /// `IncompatibleEnvironment` if a variable changes type.
    pub fn extend_environment(&self, env: &Environment) -> Result<TreeExpr> {
        let root = match embedding(&self.env, env)? {
            Some(dc) => self.root.add_dimensions(&dc),
            None => self.root.clone(),
        };
        Ok(TreeExpr {
            env: env.clone(),
            root,
        })
    }

    /// The tree as a linear expression, if it is exactly affine.
    pub fn to_linexpr(&self) -> Option<LinExpr> {
        self.root
            .to_linexpr0()
            .map(|e| LinExpr::from_expr0(&self.env, e))
    }
}

impl fmt::Display for TreeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env = &self.env;
        self.root.fmt_with(f, |d| match env.var_of_dim(d) {
            Some(v) => v.to_string(),
            None => format!("x{}", d),
        })
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

    #[test]
    fn from_linexpr_display() {
        let e = env();
        let l = LinExpr::sparse(&e);
        assert_eq!(TreeExpr::from_linexpr(&l).to_string(), "0.0");
        let d = LinExpr::dense(&e);
        assert_eq!(
            TreeExpr::from_linexpr(&d).to_string(),
            "0.0 + 0.0 · x + 0.0 · y + 0.0 · z"
        );
        let mut l = LinExpr::sparse(&e);
        l.set_coeff(&Var::new("x"), Coeff::double(-1.0)).unwrap();
        l.set_coeff(&Var::new("z"), Coeff::double(-9.0)).unwrap();
        l.set_cst(Coeff::double(8.0));
        assert_eq!(
            TreeExpr::from_linexpr(&l).to_string(),
            "8.0 - 1.0 · x - 9.0 · z"
        );
    }

    fn affine(e: &Environment, c: i64, k: i64) -> TreeExpr {
        let mut l = LinExpr::sparse(e);
        l.set_coeff(&Var::new("x"), Coeff::mpq(k, 1)).unwrap();
        l.set_cst(Coeff::mpq(c, 1));
        TreeExpr::from_linexpr(&l)
    }

    #[test]
    fn substitute_linear_trees() {
        let e = env();
        let t0 = affine(&e, 3, 1);
        assert_eq!(t0.to_string(), "3 + 1 · x");
        let t1 = affine(&e, -1, 1);
        assert_eq!(t1.to_string(), "-1 + 1 · x");
        let s = t0.substitute(&Var::new("x"), &t1).unwrap();
        assert_eq!(s.to_string(), "3 + 1 · (-1 + 1 · x)");
        assert_eq!(affine(&e, 2, 1).to_string(), "2 + 1 · x");
    }

    #[test]
    fn substitute_copies_each_use() {
        let e = env();
        let x = TreeExpr::var(&e, &Var::new("x")).unwrap();
        let t = x.mul(&x).unwrap();
        let r = x.add(&TreeExpr::cst(&e, Coeff::mpq(1, 1))).unwrap();
        let s = t.substitute(&Var::new("x"), &r).unwrap();
        assert_eq!(s.to_string(), "(x + 1) · (x + 1)");
        assert_eq!(s.size(), 3);
        assert_eq!(s.depth(), 2);
        assert!(t.substitute(&Var::new("w"), &r).is_err());
    }

    #[test]
    fn precedence_printing() {
        let e = env();
        let x = TreeExpr::var(&e, &Var::new("x")).unwrap();
        let y = TreeExpr::var(&e, &Var::new("y")).unwrap();
        let z = TreeExpr::var(&e, &Var::new("z")).unwrap();
        let t = x.sub(&y.sub(&z).unwrap()).unwrap();
        assert_eq!(t.to_string(), "x - (y - z)");
        let t = x.sub(&y).unwrap().sub(&z).unwrap();
        assert_eq!(t.to_string(), "x - y - z");
        let t = x.add(&y).unwrap().mul(&z).unwrap();
        assert_eq!(t.to_string(), "(x + y) · z");
        let t = TreeExpr::unary(TexprOp::Sqrt, &x.add(&y).unwrap(), RType::Real, RDir::Nearest);
        assert_eq!(t.to_string(), "sqrt (x + y)");
        assert_eq!(x.neg().to_string(), "- x");
    }

    #[test]
    fn evaluation_rounds() {
        let e = env();
        let x = TreeExpr::var(&e, &Var::new("x")).unwrap();
        let half = TreeExpr::cst(&e, Coeff::double(0.5));
        let t = TreeExpr::binary(TexprOp::Mul, &x, &half, RType::Int, RDir::Down).unwrap();
        let bounds = vec![
            Interval::of_doubles(1.0, 3.0),
            Interval::top(ScalarKind::Double),
            Interval::top(ScalarKind::Double),
        ];
        assert_eq!(
            t.root().eval(&bounds, ScalarKind::Double),
            Interval::of_doubles(0.0, 1.0)
        );
    }

    #[test]
    fn linearization_is_sound() {
        let e = env();
        let x = TreeExpr::var(&e, &Var::new("x")).unwrap();
        let y = TreeExpr::var(&e, &Var::new("y")).unwrap();
        let t = x.mul(&y).unwrap().add(&x).unwrap();
        let bounds = vec![
            Interval::of_doubles(0.0, 2.0),
            Interval::of_doubles(1.0, 3.0),
            Interval::top(ScalarKind::Double),
        ];
        let l = t.root().linearize(&bounds, ScalarKind::Double);
        assert!(l.is_quasilinear());
        let exact = t.root().eval(&bounds, ScalarKind::Double);
        assert!(exact <= l.eval(&bounds, ScalarKind::Double));
        assert!(l.coeff(1).map(|c| c.is_zero()).unwrap_or(true));
    }

    #[test]
    fn to_linexpr_recognises_affine_trees() {
        let e = env();
        let x = TreeExpr::var(&e, &Var::new("x")).unwrap();
        let two = TreeExpr::cst(&e, Coeff::mpq(2, 1));
        let t = two.mul(&x).unwrap().sub(&two).unwrap();
        let l = t.to_linexpr().unwrap();
        assert_eq!(l.to_string(), "2·x - 2");
        assert!(x.mul(&x).unwrap().to_linexpr().is_none());
    }

    #[test]
    #[should_panic(expected = "given two arguments")]
    fn arity_is_checked() {
        let _ = Tree::binary(
            TexprOp::Neg,
            Tree::dim(0),
            Tree::dim(1),
            RType::Real,
            RDir::Nearest,
        );
    }
}
