//! Property tests of the lattice laws, run against every bundled backend.
//!
//! Values are boxes over two real variables `x` and `y`, optionally cut by a relational
//! constraint `x - y <= k`, which the box backend over-approximates.

use numdom::num::{Coeff, Interval};
use numdom::numerical::{BoxDomain, OctagonDomain, PolyhedraDomain};
use numdom::{
    AbstractValue, ConsType, DomainBackend, Environment, LinExpr, Lincons, LinconsArray, Manager,
    Var,
};
use proptest::prelude::*;

type Bound = Option<(i64, i64)>;

/// Bounds on x and y, and an optional bound on x - y.
type Shape = (Bound, Bound, Option<i64>);

fn env() -> Environment {
    Environment::new(&[], &[Var::new("x"), Var::new("y")]).unwrap()
}

fn q(n: i64) -> Coeff {
    Coeff::mpq(n, 1)
}

fn expr(env: &Environment, terms: &[(&str, i64)], cst: i64) -> LinExpr {
    let terms: Vec<(Var, Coeff)> = terms.iter().map(|(v, k)| (Var::new(v), q(*k))).collect();
    LinExpr::from_terms(env, &terms, q(cst)).unwrap()
}

fn bound() -> impl Strategy<Value = Bound> {
    prop::option::of((-10i64..10, 0i64..10).prop_map(|(lo, w)| (lo, lo + w)))
}

fn shape() -> impl Strategy<Value = Shape> {
    (bound(), bound(), prop::option::of(-5i64..5))
}

fn build<B: DomainBackend>(man: &Manager<B>, s: &Shape) -> AbstractValue<B> {
    let env = env();
    let mut bounds = Vec::new();
    for (name, b) in [("x", s.0), ("y", s.1)].iter() {
        if let Some((lo, hi)) = b {
            bounds.push((Var::new(name), Interval::of_rationals(*lo, 1, *hi, 1)));
        }
    }
    let v = AbstractValue::of_box(man, &env, &bounds).unwrap();
    match s.2 {
        Some(k) => {
            // k - x + y >= 0
            let c = Lincons::new(ConsType::SupEq, &expr(&env, &[("x", -1), ("y", 1)], k));
            v.meet_lincons_array(&LinconsArray::from_vec(&env, &[c]).unwrap())
                .unwrap()
        }
        None => v,
    }
}

fn check_laws<B: DomainBackend>(man: &Manager<B>, a: &Shape, b: &Shape) -> Result<(), TestCaseError> {
    let env = env();
    let x = build(man, a);
    let y = build(man, b);
    let top = AbstractValue::top(man, &env);
    let bot = AbstractValue::bottom(man, &env);

    prop_assert!(x.meet(&bot).unwrap().is_bottom());
    prop_assert!(x.join(&top).unwrap().is_top());
    prop_assert!(x.is_leq(&top).unwrap());
    prop_assert!(bot.is_leq(&x).unwrap());

    prop_assert!(x.meet(&y).unwrap().is_eq(&y.meet(&x).unwrap()).unwrap());
    prop_assert!(x.join(&y).unwrap().is_eq(&y.join(&x).unwrap()).unwrap());
    prop_assert!(x.join(&x).unwrap().is_eq(&x).unwrap());
    prop_assert!(x.meet(&x).unwrap().is_eq(&x).unwrap());

    let j = x.join(&y).unwrap();
    prop_assert!(x.is_leq(&j).unwrap());
    prop_assert!(y.is_leq(&j).unwrap());
    let m = x.meet(&y).unwrap();
    prop_assert!(m.is_leq(&x).unwrap());
    prop_assert!(m.is_leq(&y).unwrap());

    let w = x.widening(&j).unwrap();
    prop_assert!(x.is_leq(&w).unwrap());
    prop_assert!(j.is_leq(&w).unwrap());
    Ok(())
}

fn check_forget<B: DomainBackend>(man: &Manager<B>, a: &Shape) -> Result<(), TestCaseError> {
    let x = build(man, a);
    let f = x.forget(&[Var::new("x")]).unwrap();
    prop_assert!(x.is_leq(&f).unwrap());
    prop_assert!(f.is_variable_unconstrained(&Var::new("x")).unwrap());
    Ok(())
}

/// Iterate `x, y := x + 1, y + 1` from the origin with widening, and return the first stable
/// iterate if one is reached within `limit` steps.
fn widening_steps<B: DomainBackend>(man: &Manager<B>, limit: usize) -> Option<AbstractValue<B>> {
    let env = env();
    let (x, y) = (Var::new("x"), Var::new("y"));
    let origin = Interval::of_rationals(0, 1, 0, 1);
    let mut cur = AbstractValue::of_box(
        man,
        &env,
        &[(x.clone(), origin.clone()), (y.clone(), origin)],
    )
    .unwrap();
    let step = [expr(&env, &[("x", 1)], 1), expr(&env, &[("y", 1)], 1)];
    for _ in 0..limit {
        let next = cur.join(&cur.assign_array(&[x.clone(), y.clone()], &step).unwrap()).unwrap();
        let w = cur.widening(&next).unwrap();
        if w.is_leq(&cur).unwrap() {
            return Some(cur);
        }
        cur = w;
    }
    None
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn box_double_laws(a in shape(), b in shape()) {
        check_laws(&Manager::new(BoxDomain::double()), &a, &b)?;
    }

    #[test]
    fn box_mpq_laws(a in shape(), b in shape()) {
        check_laws(&Manager::new(BoxDomain::mpq()), &a, &b)?;
    }

    #[test]
    fn box_mpfr_laws(a in shape(), b in shape()) {
        check_laws(&Manager::new(BoxDomain::mpfr(64)), &a, &b)?;
    }

    #[test]
    fn octagon_laws(a in shape(), b in shape()) {
        check_laws(&Manager::new(OctagonDomain::new()), &a, &b)?;
    }

    #[test]
    fn polyhedra_laws(a in shape(), b in shape()) {
        check_laws(&Manager::new(PolyhedraDomain::loose()), &a, &b)?;
        check_laws(&Manager::new(PolyhedraDomain::strict()), &a, &b)?;
    }

    #[test]
    fn forget_gives_an_unconstrained_variable(a in shape()) {
        check_forget(&Manager::new(BoxDomain::mpq()), &a)?;
        check_forget(&Manager::new(OctagonDomain::new()), &a)?;
        check_forget(&Manager::new(PolyhedraDomain::loose()), &a)?;
    }
}

#[test]
fn widening_terminates_on_boxes() {
    assert!(widening_steps(&Manager::new(BoxDomain::double()), 10).is_some());
    assert!(widening_steps(&Manager::new(BoxDomain::mpq()), 10).is_some());
    assert!(widening_steps(&Manager::new(BoxDomain::mpfr(53)), 10).is_some());
}

#[test]
fn widening_terminates_on_relational_domains() {
    let env = env();
    let diff = Lincons::new(ConsType::Eq, &expr(&env, &[("x", 1), ("y", -1)], 0));

    let oct = widening_steps(&Manager::new(OctagonDomain::new()), 10).unwrap();
    assert!(oct.sat_lincons(&diff).unwrap());
    assert!(!oct.bound_variable(&Var::new("x")).unwrap().is_bounded());

    for man in [PolyhedraDomain::loose(), PolyhedraDomain::strict()].iter() {
        let poly = widening_steps(&Manager::new(*man), 10).unwrap();
        assert!(poly.sat_lincons(&diff).unwrap());
        assert!(!poly.bound_variable(&Var::new("x")).unwrap().is_bounded());
    }
}
