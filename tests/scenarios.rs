//! End-to-end scenarios over the public API.

use log::{debug, LevelFilter};
use numdom::num::{Coeff, Interval, Mpq};
use numdom::numerical::{BoxDomain, OctagonDomain, PolyhedraDomain};
use numdom::{
    AbstractValue, ConsType, DomainBackend, Environment, LinExpr, Lincons, LinconsArray, Manager,
    TreeExpr, Var,
};
use simplelog::{Config, TestLogger};

fn init_logging() {
    let _ = TestLogger::init(LevelFilter::Debug, Config::default());
}

fn xyz() -> Environment {
    Environment::new(&[Var::new("x"), Var::new("y")], &[Var::new("z")]).unwrap()
}

fn check_box_scenario<B: DomainBackend>(man: &Manager<B>) {
    let env = xyz();
    let v1 = AbstractValue::of_box(man, &env, &[(Var::new("x"), Interval::of_doubles(-2.5, 2.5))])
        .unwrap();
    debug!("{} over {}: {}", man.library(), env, v1);
    assert!(!v1.is_bottom());
    assert!(!v1.is_top());
    assert!(AbstractValue::bottom(man, &env).is_bottom());
    assert!(AbstractValue::top(man, &env).is_top());
}

#[test]
fn box_over_mixed_environment() {
    init_logging();
    check_box_scenario(&Manager::new(BoxDomain::double()));
    check_box_scenario(&Manager::new(BoxDomain::mpq()));
    check_box_scenario(&Manager::new(BoxDomain::mpfr(100)));
    check_box_scenario(&Manager::new(OctagonDomain::new()));
    check_box_scenario(&Manager::new(PolyhedraDomain::loose()));
}

#[test]
fn meet_of_touching_intervals() {
    init_logging();
    let b1 = Interval::of_doubles(-2.5, 0.0);
    let b2 = Interval::of_doubles(0.0, 2.5);
    assert_eq!(b1.meet(&b2), Interval::of_doubles(0.0, 0.0));

    let man = Manager::new(BoxDomain::double());
    let env = Environment::new(&[], &[Var::new("x")]).unwrap();
    let x = Var::new("x");
    let v1 = AbstractValue::of_box(&man, &env, &[(x.clone(), b1)]).unwrap();
    let v2 = AbstractValue::of_box(&man, &env, &[(x.clone(), b2)]).unwrap();
    let m = v1.meet(&v2).unwrap();
    assert_eq!(m.bound_variable(&x).unwrap(), Interval::of_doubles(0.0, 0.0));
}

#[test]
fn forget_drops_the_variable() {
    init_logging();
    let man = Manager::new(BoxDomain::mpq());
    let env = Environment::new(&[], &[Var::new("x"), Var::new("y")]).unwrap();
    let v = AbstractValue::of_box(
        &man,
        &env,
        &[
            (Var::new("x"), Interval::of_rationals(-3, 1, 2, 1)),
            (Var::new("y"), Interval::of_rationals(-2, 1, 2, 1)),
        ],
    )
    .unwrap();
    let f = v.forget(&[Var::new("y")]).unwrap();
    let cs = f.to_lincons_array();
    assert_eq!(cs.to_string(), "[1·x + 3 >= 0 , -1·x + 2 >= 0]");
    let x_only = AbstractValue::of_box(
        &man,
        &env,
        &[(Var::new("x"), Interval::of_rationals(-3, 1, 2, 1))],
    )
    .unwrap();
    assert_eq!(f, x_only);
}

#[test]
fn substitution_keeps_the_tree_shape() {
    init_logging();
    let env = Environment::new(&[Var::new("x")], &[]).unwrap();
    let x = TreeExpr::var(&env, &Var::new("x")).unwrap();
    let t = TreeExpr::cst(&env, Coeff::mpq(3, 1)).add(&x).unwrap();
    let r = x.sub(&TreeExpr::cst(&env, Coeff::mpq(1, 1))).unwrap();
    let s = t.substitute(&Var::new("x"), &r).unwrap();
    assert_eq!(s.to_string(), "3 + (x - 1)");
    assert_eq!(t.to_string(), "3 + x");
}

#[test]
fn constraints_round_trip_on_boxes() {
    init_logging();
    let man = Manager::new(BoxDomain::mpq());
    let env = xyz();
    let v = AbstractValue::of_box(
        &man,
        &env,
        &[
            (Var::new("x"), Interval::of_rationals(-3, 1, 7, 1)),
            (Var::new("z"), Interval::of_rationals(1, 2, 1, 2)),
        ],
    )
    .unwrap();
    let back = AbstractValue::from_lincons_array(&man, &v.to_lincons_array());
    assert!(back.is_leq(&v).unwrap());
    assert!(v.is_leq(&back).unwrap());
}

#[test]
fn environment_add_remove_is_identity() {
    init_logging();
    let e = xyz();
    assert_eq!(e.add(&[], &[]).unwrap().remove(&[]).unwrap(), e);
    let w = Var::new("w");
    assert_eq!(e.add(&[], &[w.clone()]).unwrap().remove(&[w]).unwrap(), e);
}

#[test]
fn loop_analysis_with_polyhedra() {
    init_logging();
    // i = 0; j = 10; while i <= j { i += 2; j -= 1 }
    let man = Manager::new(PolyhedraDomain::loose());
    let (i, j) = (Var::new("i"), Var::new("j"));
    let env = Environment::new(&[], &[i.clone(), j.clone()]).unwrap();
    let q = |n| Coeff::mpq(n, 1);
    let guard = LinconsArray::from_vec(
        &env,
        &[Lincons::new(
            ConsType::SupEq,
            &LinExpr::from_terms(&env, &[(i.clone(), q(-1)), (j.clone(), q(1))], q(0)).unwrap(),
        )],
    )
    .unwrap();
    let step = [
        LinExpr::from_terms(&env, &[(i.clone(), q(1))], q(2)).unwrap(),
        LinExpr::from_terms(&env, &[(j.clone(), q(1))], q(-1)).unwrap(),
    ];
    let init = AbstractValue::of_box(
        &man,
        &env,
        &[
            (i.clone(), Interval::of_rationals(0, 1, 0, 1)),
            (j.clone(), Interval::of_rationals(10, 1, 10, 1)),
        ],
    )
    .unwrap();
    let mut head = init.clone();
    let mut iterations = 0;
    loop {
        iterations += 1;
        assert!(iterations < 10);
        let body = head.meet_lincons_array(&guard).unwrap();
        let next = init
            .join(&body.assign_array(&[i.clone(), j.clone()], &step).unwrap())
            .unwrap();
        let w = head.widening(&next).unwrap();
        if w.is_leq(&head).unwrap() {
            break;
        }
        head = w;
    }
    debug!("loop head: {}", head);
    // i + 2j = 20 holds at the loop head.
    let inv = Lincons::new(
        ConsType::Eq,
        &LinExpr::from_terms(&env, &[(i.clone(), q(1)), (j.clone(), q(2))], q(-20)).unwrap(),
    );
    assert!(head.sat_lincons(&inv).unwrap());
    let bi = head.bound_variable(&i).unwrap();
    assert_eq!(bi.inf().to_mpq(), Mpq::zero());
    assert!(bi.sup().is_infty());
}
