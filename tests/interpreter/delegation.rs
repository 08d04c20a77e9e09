//! yield* delegation to generators, host iterators and iterator-like objects

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{create_test_runtime, define, done, finished, next, spawn, yielded};
use genrun::ast::{BinaryOp, Expression as E, GeneratorFunction, Statement as S};
use genrun::value::JsObject;
use genrun::{GeneratorState, IterResult, JsError, JsValue, NativeIterator};

fn thrown(err: JsError) -> JsValue {
    match err {
        JsError::ThrownValue { value } => value,
        other => panic!("expected thrown value, got {:?}", other),
    }
}

#[test]
fn test_return_while_delegating_runs_inner_finally() {
    let mut interp = create_test_runtime();
    // function* g() { try { yield 42 } finally { yield 43; return 13 } }
    define(
        &mut interp,
        &GeneratorFunction::new(
            "g",
            &[],
            vec![S::try_finally(
                vec![S::expr(E::yield_(E::number(42.0)))],
                vec![
                    S::expr(E::yield_(E::number(43.0))),
                    S::return_(E::number(13.0)),
                ],
            )],
        ),
    );
    // function* h() { yield 1; return yield* g() }
    let h = GeneratorFunction::new(
        "h",
        &[],
        vec![
            S::expr(E::yield_(E::number(1.0))),
            S::return_(E::yield_star(E::call(E::ident("g"), vec![]))),
        ],
    );
    let gen_h = spawn(&mut interp, &h, vec![]);

    assert_eq!(next(&mut interp, &gen_h), yielded(1));
    assert_eq!(next(&mut interp, &gen_h), yielded(42));
    assert_eq!(gen_h.return_(&mut interp, JsValue::from(666)).unwrap(), yielded(43));
    assert_eq!(next(&mut interp, &gen_h), done(13));
    assert_eq!(next(&mut interp, &gen_h), finished());
}

#[test]
fn test_yield_star_value_is_yielded_again() {
    let mut interp = create_test_runtime();
    // function* h() { try { yield 42 } finally { yield 43; return 13 } }
    define(
        &mut interp,
        &GeneratorFunction::new(
            "h",
            &[],
            vec![S::try_finally(
                vec![S::expr(E::yield_(E::number(42.0)))],
                vec![
                    S::expr(E::yield_(E::number(43.0))),
                    S::return_(E::number(13.0)),
                ],
            )],
        ),
    );
    // function* g() { yield 1; yield yield* h() }
    let g = GeneratorFunction::new(
        "g",
        &[],
        vec![
            S::expr(E::yield_(E::number(1.0))),
            S::expr(E::yield_(E::yield_star(E::call(E::ident("h"), vec![])))),
        ],
    );
    let gen_g = spawn(&mut interp, &g, vec![]);

    assert_eq!(next(&mut interp, &gen_g), yielded(1));
    assert_eq!(next(&mut interp, &gen_g), yielded(42));
    assert_eq!(next(&mut interp, &gen_g), yielded(43));
    assert_eq!(next(&mut interp, &gen_g), yielded(13));
    assert_eq!(next(&mut interp, &gen_g), finished());
}

#[test]
fn test_yield_star_evaluates_to_inner_return_value() {
    let mut interp = create_test_runtime();
    define(
        &mut interp,
        &GeneratorFunction::new(
            "inner",
            &[],
            vec![
                S::expr(E::yield_(E::number(1.0))),
                S::return_(E::string("r")),
            ],
        ),
    );
    // let v = yield* inner(); yield v
    let outer = GeneratorFunction::anonymous(
        &[],
        vec![
            S::let_("v", E::yield_star(E::call(E::ident("inner"), vec![]))),
            S::expr(E::yield_(E::ident("v"))),
        ],
    );
    let g = spawn(&mut interp, &outer, vec![]);

    assert_eq!(next(&mut interp, &g), yielded(1));
    assert_eq!(next(&mut interp, &g), yielded("r"));
    assert_eq!(next(&mut interp, &g), finished());
}

#[test]
fn test_next_values_are_forwarded() {
    let mut interp = create_test_runtime();
    // function* inner() { let x = yield 1; yield x }
    define(
        &mut interp,
        &GeneratorFunction::new(
            "inner",
            &[],
            vec![
                S::let_("x", E::yield_(E::number(1.0))),
                S::expr(E::yield_(E::ident("x"))),
            ],
        ),
    );
    let outer = GeneratorFunction::anonymous(
        &[],
        vec![S::expr(E::yield_star(E::call(E::ident("inner"), vec![])))],
    );
    let g = spawn(&mut interp, &outer, vec![]);

    assert_eq!(next(&mut interp, &g), yielded(1));
    assert!(g.with_frame(|frame| frame.is_delegating()).unwrap_or(false));
    assert_eq!(g.state(), GeneratorState::SuspendedYield);
    assert_eq!(g.next(&mut interp, JsValue::from(5)).unwrap(), yielded(5));
    assert_eq!(next(&mut interp, &g), finished());
}

#[test]
fn test_throw_is_forwarded_to_inner_catch() {
    let mut interp = create_test_runtime();
    // function* inner() { try { yield 1 } catch (e) { yield "inner caught " + e } }
    define(
        &mut interp,
        &GeneratorFunction::new(
            "inner",
            &[],
            vec![S::try_catch(
                vec![S::expr(E::yield_(E::number(1.0)))],
                Some("e"),
                vec![S::expr(E::yield_(E::binary(
                    BinaryOp::Add,
                    E::string("inner caught "),
                    E::ident("e"),
                )))],
            )],
        ),
    );
    let outer = GeneratorFunction::anonymous(
        &[],
        vec![S::expr(E::yield_star(E::call(E::ident("inner"), vec![])))],
    );
    let g = spawn(&mut interp, &outer, vec![]);

    assert_eq!(next(&mut interp, &g), yielded(1));
    assert_eq!(g.throw(&mut interp, JsValue::from("t")).unwrap(), yielded("inner caught t"));
}

#[test]
fn test_inner_error_is_thrown_at_delegation_site() {
    let mut interp = create_test_runtime();
    define(
        &mut interp,
        &GeneratorFunction::new(
            "inner",
            &[],
            vec![
                S::expr(E::yield_(E::number(1.0))),
                S::throw(E::string("bad")),
            ],
        ),
    );
    // try { yield* inner() } catch (e) { yield "outer caught " + e }
    let outer = GeneratorFunction::anonymous(
        &[],
        vec![S::try_catch(
            vec![S::expr(E::yield_star(E::call(E::ident("inner"), vec![])))],
            Some("e"),
            vec![S::expr(E::yield_(E::binary(
                BinaryOp::Add,
                E::string("outer caught "),
                E::ident("e"),
            )))],
        )],
    );
    let g = spawn(&mut interp, &outer, vec![]);

    assert_eq!(next(&mut interp, &g), yielded(1));
    assert_eq!(next(&mut interp, &g), yielded("outer caught bad"));
}

#[test]
fn test_inner_return_after_cleanup_yield_resumes_outer() {
    let mut interp = create_test_runtime();
    // function* inner() { try { yield 1 } finally { yield "cleanup" } }
    define(
        &mut interp,
        &GeneratorFunction::new(
            "inner",
            &[],
            vec![S::try_finally(
                vec![S::expr(E::yield_(E::number(1.0)))],
                vec![S::expr(E::yield_(E::string("cleanup")))],
            )],
        ),
    );
    // let v = yield* inner(); yield "after " + v
    let outer = GeneratorFunction::anonymous(
        &[],
        vec![
            S::let_("v", E::yield_star(E::call(E::ident("inner"), vec![]))),
            S::expr(E::yield_(E::binary(
                BinaryOp::Add,
                E::string("after "),
                E::ident("v"),
            ))),
        ],
    );
    let g = spawn(&mut interp, &outer, vec![]);

    assert_eq!(next(&mut interp, &g), yielded(1));
    assert_eq!(g.return_(&mut interp, JsValue::from(7)).unwrap(), yielded("cleanup"));
    // The follow-up next() is forwarded; the inner finishes its return, which
    // reaches the outer as the value of the yield* expression
    assert_eq!(next(&mut interp, &g), yielded("after 7"));
}

#[test]
fn test_return_closes_inner_and_runs_outer_finally() {
    let mut interp = create_test_runtime();
    interp.set_global("cleaned", JsValue::from(false));
    define(
        &mut interp,
        &GeneratorFunction::new(
            "inner",
            &[],
            vec![
                S::expr(E::yield_(E::number(1.0))),
                S::expr(E::yield_(E::number(2.0))),
            ],
        ),
    );
    // try { yield* inner() } finally { cleaned = true }
    let outer = GeneratorFunction::anonymous(
        &[],
        vec![S::try_finally(
            vec![S::expr(E::yield_star(E::call(E::ident("inner"), vec![])))],
            vec![S::expr(E::assign("cleaned", E::boolean(true)))],
        )],
    );
    let g = spawn(&mut interp, &outer, vec![]);

    assert_eq!(next(&mut interp, &g), yielded(1));
    assert_eq!(g.return_(&mut interp, JsValue::from(9)).unwrap(), done(9));
    assert_eq!(interp.get_global("cleaned"), Some(JsValue::from(true)));
}

#[test]
fn test_nested_delegation_chain() {
    let mut interp = create_test_runtime();
    define(
        &mut interp,
        &GeneratorFunction::new("a", &[], vec![S::expr(E::yield_(E::number(1.0)))]),
    );
    define(
        &mut interp,
        &GeneratorFunction::new(
            "b",
            &[],
            vec![
                S::expr(E::yield_star(E::call(E::ident("a"), vec![]))),
                S::expr(E::yield_(E::number(2.0))),
            ],
        ),
    );
    let c = GeneratorFunction::new(
        "c",
        &[],
        vec![
            S::expr(E::yield_star(E::call(E::ident("b"), vec![]))),
            S::expr(E::yield_(E::number(3.0))),
        ],
    );
    let g = spawn(&mut interp, &c, vec![]);

    let values = interp.drain(&g).unwrap();
    assert_eq!(values, vec![JsValue::from(1), JsValue::from(2), JsValue::from(3)]);
}

#[test]
fn test_delegate_to_host_iterator() {
    let mut interp = create_test_runtime();
    let it = NativeIterator::from_values(vec![JsValue::from("x"), JsValue::from("y")]);
    // function* (it) { yield* it; yield "after" }
    let func = GeneratorFunction::anonymous(
        &["it"],
        vec![
            S::expr(E::yield_star(E::ident("it"))),
            S::expr(E::yield_(E::string("after"))),
        ],
    );
    let g = spawn(&mut interp, &func, vec![it.into_value()]);

    let values = interp.drain(&g).unwrap();
    assert_eq!(
        values,
        vec![JsValue::from("x"), JsValue::from("y"), JsValue::from("after")]
    );
}

#[test]
fn test_return_to_iterator_without_return_method() {
    let mut interp = create_test_runtime();
    let it = NativeIterator::from_values(vec![JsValue::from(1), JsValue::from(2)]);
    let func = GeneratorFunction::anonymous(
        &["it"],
        vec![
            S::expr(E::yield_star(E::ident("it"))),
            S::expr(E::yield_(E::string("unreachable"))),
        ],
    );
    let g = spawn(&mut interp, &func, vec![it.into_value()]);

    assert_eq!(next(&mut interp, &g), yielded(1));
    assert_eq!(g.return_(&mut interp, JsValue::from(5)).unwrap(), done(5));
}

#[test]
fn test_return_forwarded_to_iterator_return_method() {
    let mut interp = create_test_runtime();
    let received = Rc::new(RefCell::new(None));
    let sink = received.clone();
    let it = NativeIterator::from_values(vec![JsValue::from(1)]).with_return(move |_, value| {
        *sink.borrow_mut() = Some(value);
        Ok(IterResult::done(JsValue::from("closed")))
    });
    let func = GeneratorFunction::anonymous(&["it"], vec![S::expr(E::yield_star(E::ident("it")))]);
    let g = spawn(&mut interp, &func, vec![it.into_value()]);

    next(&mut interp, &g);
    assert_eq!(g.return_(&mut interp, JsValue::from(4)).unwrap(), done("closed"));
    assert_eq!(*received.borrow(), Some(JsValue::from(4)));
}

#[test]
fn test_throw_to_iterator_without_throw_closes_it() {
    let mut interp = create_test_runtime();
    let closed = Rc::new(Cell::new(false));
    let flag = closed.clone();
    let it = NativeIterator::from_values(vec![JsValue::from(1), JsValue::from(2)]).with_return(
        move |_, _| {
            flag.set(true);
            Ok(IterResult::done(JsValue::Undefined))
        },
    );
    // try { yield* it } catch (e) { yield e.name }
    let func = GeneratorFunction::anonymous(
        &["it"],
        vec![S::try_catch(
            vec![S::expr(E::yield_star(E::ident("it")))],
            Some("e"),
            vec![S::expr(E::yield_(E::member(E::ident("e"), "name")))],
        )],
    );
    let g = spawn(&mut interp, &func, vec![it.into_value()]);

    assert_eq!(next(&mut interp, &g), yielded(1));
    assert_eq!(g.throw(&mut interp, JsValue::from("x")).unwrap(), yielded("TypeError"));
    assert!(closed.get());
}

#[test]
fn test_uncaught_missing_throw_is_type_error() {
    let mut interp = create_test_runtime();
    let it = NativeIterator::from_values(vec![JsValue::from(1)]);
    let func = GeneratorFunction::anonymous(&["it"], vec![S::expr(E::yield_star(E::ident("it")))]);
    let g = spawn(&mut interp, &func, vec![it.into_value()]);

    next(&mut interp, &g);
    let err = g.throw(&mut interp, JsValue::from("x")).unwrap_err();
    assert!(err.is_type_error());
    assert_eq!(g.state(), GeneratorState::Completed);
}

#[test]
fn test_throw_forwarded_to_iterator_throw_method() {
    let mut interp = create_test_runtime();
    let it = NativeIterator::from_values(vec![JsValue::from(1)])
        .with_throw(|_, value| Ok(IterResult::yielded(value)));
    let func = GeneratorFunction::anonymous(&["it"], vec![S::expr(E::yield_star(E::ident("it")))]);
    let g = spawn(&mut interp, &func, vec![it.into_value()]);

    next(&mut interp, &g);
    assert_eq!(g.throw(&mut interp, JsValue::from("echo")).unwrap(), yielded("echo"));
}

#[test]
fn test_delegate_to_non_iterable_is_type_error() {
    let mut interp = create_test_runtime();
    // try { yield* 5 } catch (e) { yield e.name }
    let func = GeneratorFunction::anonymous(
        &[],
        vec![S::try_catch(
            vec![S::expr(E::yield_star(E::number(5.0)))],
            Some("e"),
            vec![S::expr(E::yield_(E::member(E::ident("e"), "name")))],
        )],
    );
    let g = spawn(&mut interp, &func, vec![]);
    assert_eq!(next(&mut interp, &g), yielded("TypeError"));
}

#[test]
fn test_delegate_to_object_with_next_method() {
    let mut interp = create_test_runtime();
    let count = Rc::new(Cell::new(0));
    let counter = count.clone();
    let next_fn = interp.create_native_function("next", 0, move |interp, _| {
        counter.set(counter.get() + 1);
        let n = counter.get();
        Ok(IterResult {
            value: JsValue::from(n),
            done: n > 2,
        }
        .to_object(interp))
    });
    let mut obj = JsObject::ordinary();
    obj.set_property(interp.intern("next"), next_fn);

    let func = GeneratorFunction::anonymous(
        &["it"],
        vec![S::return_(E::yield_star(E::ident("it")))],
    );
    let g = spawn(&mut interp, &func, vec![JsValue::object(obj)]);

    assert_eq!(next(&mut interp, &g), yielded(1));
    assert_eq!(next(&mut interp, &g), yielded(2));
    assert_eq!(next(&mut interp, &g), done(3));
    assert_eq!(count.get(), 3);
}

#[test]
fn test_iterator_result_must_be_object() {
    let mut interp = create_test_runtime();
    let next_fn = interp.create_native_function("next", 0, |_, _| Ok(JsValue::from(1)));
    let mut obj = JsObject::ordinary();
    obj.set_property(interp.intern("next"), next_fn);

    let func = GeneratorFunction::anonymous(&["it"], vec![S::expr(E::yield_star(E::ident("it")))]);
    let g = spawn(&mut interp, &func, vec![JsValue::object(obj)]);

    let err = g.next(&mut interp, JsValue::Undefined).unwrap_err();
    assert_eq!(
        thrown(err).error_kind(),
        Some(genrun::ErrorKind::TypeError)
    );
}
