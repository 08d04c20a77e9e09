//! Basic generator execution: yields, parameters, locals, loops and host calls

use std::cell::Cell;
use std::rc::Rc;

use super::{create_test_runtime, done, finished, next, spawn, yielded};
use genrun::ast::{BinaryOp, Expression as E, GeneratorFunction, Statement as S};
use genrun::JsValue;

/// function* foo() { yield 2; yield 3; yield 4 }
fn foo() -> GeneratorFunction {
    GeneratorFunction::new(
        "foo",
        &[],
        vec![
            S::expr(E::yield_(E::number(2.0))),
            S::expr(E::yield_(E::number(3.0))),
            S::expr(E::yield_(E::number(4.0))),
        ],
    )
}

#[test]
fn test_yields_in_order_then_done() {
    let mut interp = create_test_runtime();
    let g = spawn(&mut interp, &foo(), vec![]);

    assert_eq!(next(&mut interp, &g), yielded(2));
    assert_eq!(next(&mut interp, &g), yielded(3));
    assert_eq!(next(&mut interp, &g), yielded(4));
    assert_eq!(next(&mut interp, &g), finished());
    // A fifth call repeats the completed result
    assert_eq!(next(&mut interp, &g), finished());
}

#[test]
fn test_each_instantiation_is_independent() {
    let mut interp = create_test_runtime();
    let func = interp.define_generator(&foo()).unwrap();
    let a = interp.instantiate(&func, vec![]).unwrap();
    let b = interp.instantiate(&func, vec![]).unwrap();

    assert_eq!(next(&mut interp, &a), yielded(2));
    assert_eq!(next(&mut interp, &a), yielded(3));
    assert_eq!(next(&mut interp, &b), yielded(2));
}

#[test]
fn test_parameters_are_bound() {
    let mut interp = create_test_runtime();
    // function* (a, b) { yield a + b; yield a * b; yield c === undefined }
    let func = GeneratorFunction::anonymous(
        &["a", "b", "c"],
        vec![
            S::expr(E::yield_(E::binary(BinaryOp::Add, E::ident("a"), E::ident("b")))),
            S::expr(E::yield_(E::binary(BinaryOp::Mul, E::ident("a"), E::ident("b")))),
            S::expr(E::yield_(E::binary(
                BinaryOp::StrictEq,
                E::ident("c"),
                E::undefined(),
            ))),
        ],
    );
    let g = spawn(&mut interp, &func, vec![JsValue::from(3), JsValue::from(4)]);

    assert_eq!(next(&mut interp, &g), yielded(7));
    assert_eq!(next(&mut interp, &g), yielded(12));
    assert_eq!(next(&mut interp, &g), yielded(true));
}

#[test]
fn test_next_value_becomes_yield_result() {
    let mut interp = create_test_runtime();
    // function* () { let x = yield 1; yield x + 1 }
    let func = GeneratorFunction::anonymous(
        &[],
        vec![
            S::let_("x", E::yield_(E::number(1.0))),
            S::expr(E::yield_(E::binary(BinaryOp::Add, E::ident("x"), E::number(1.0)))),
        ],
    );
    let g = spawn(&mut interp, &func, vec![]);

    // The argument of the first next() is not observable
    assert_eq!(g.next(&mut interp, JsValue::from(99)).unwrap(), yielded(1));
    assert_eq!(g.next(&mut interp, JsValue::from(10)).unwrap(), yielded(11));
    assert_eq!(next(&mut interp, &g), finished());
}

#[test]
fn test_return_value_reported_once() {
    let mut interp = create_test_runtime();
    let func = GeneratorFunction::anonymous(
        &[],
        vec![
            S::expr(E::yield_(E::number(1.0))),
            S::return_(E::string("done")),
        ],
    );
    let g = spawn(&mut interp, &func, vec![]);

    assert_eq!(next(&mut interp, &g), yielded(1));
    assert_eq!(next(&mut interp, &g), done("done"));
    assert_eq!(next(&mut interp, &g), finished());
}

#[test]
fn test_locals_survive_suspension_in_loop() {
    let mut interp = create_test_runtime();
    // let i = 0; while (i < 3) { yield i; i = i + 1 }
    let func = GeneratorFunction::anonymous(
        &[],
        vec![
            S::let_("i", E::number(0.0)),
            S::while_(
                E::binary(BinaryOp::Lt, E::ident("i"), E::number(3.0)),
                vec![
                    S::expr(E::yield_(E::ident("i"))),
                    S::expr(E::assign(
                        "i",
                        E::binary(BinaryOp::Add, E::ident("i"), E::number(1.0)),
                    )),
                ],
            ),
        ],
    );
    let g = spawn(&mut interp, &func, vec![]);

    let values = interp.drain(&g).unwrap();
    assert_eq!(values, vec![JsValue::from(0), JsValue::from(1), JsValue::from(2)]);
}

#[test]
fn test_block_scoped_let_shadows_outer() {
    let mut interp = create_test_runtime();
    // let x = "outer"; { let x = "inner"; yield x } yield x
    let func = GeneratorFunction::anonymous(
        &[],
        vec![
            S::let_("x", E::string("outer")),
            S::Block(vec![
                S::let_("x", E::string("inner")),
                S::expr(E::yield_(E::ident("x"))),
            ]),
            S::expr(E::yield_(E::ident("x"))),
        ],
    );
    let g = spawn(&mut interp, &func, vec![]);

    assert_eq!(next(&mut interp, &g), yielded("inner"));
    assert_eq!(next(&mut interp, &g), yielded("outer"));
}

#[test]
fn test_if_else_and_string_concat() {
    let mut interp = create_test_runtime();
    // function* (n) { if (n > 1) { yield "big " + n } else { yield "small" } }
    let func = GeneratorFunction::anonymous(
        &["n"],
        vec![S::if_else(
            E::binary(BinaryOp::Gt, E::ident("n"), E::number(1.0)),
            vec![S::expr(E::yield_(E::binary(
                BinaryOp::Add,
                E::string("big "),
                E::ident("n"),
            )))],
            Some(vec![S::expr(E::yield_(E::string("small")))]),
        )],
    );

    let g = spawn(&mut interp, &func, vec![JsValue::from(5)]);
    assert_eq!(next(&mut interp, &g), yielded("big 5"));

    let g = spawn(&mut interp, &func, vec![JsValue::from(0)]);
    assert_eq!(next(&mut interp, &g), yielded("small"));
}

#[test]
fn test_object_literal_and_member_access() {
    let mut interp = create_test_runtime();
    // let o = { a: 1, b: "x" }; yield o.b; yield o.missing
    let func = GeneratorFunction::anonymous(
        &[],
        vec![
            S::let_(
                "o",
                E::object(vec![("a", E::number(1.0)), ("b", E::string("x"))]),
            ),
            S::expr(E::yield_(E::member(E::ident("o"), "b"))),
            S::expr(E::yield_(E::member(E::ident("o"), "missing"))),
        ],
    );
    let g = spawn(&mut interp, &func, vec![]);

    assert_eq!(next(&mut interp, &g), yielded("x"));
    assert_eq!(next(&mut interp, &g), yielded(JsValue::Undefined));
}

#[test]
fn test_globals_are_read_and_written() {
    let mut interp = create_test_runtime();
    interp.set_global("total", JsValue::from(10));
    // total = total + (yield "ready")
    let func = GeneratorFunction::anonymous(
        &[],
        vec![S::expr(E::assign(
            "total",
            E::binary(BinaryOp::Add, E::ident("total"), E::yield_(E::string("ready"))),
        ))],
    );
    let g = spawn(&mut interp, &func, vec![]);

    assert_eq!(next(&mut interp, &g), yielded("ready"));
    assert_eq!(g.next(&mut interp, JsValue::from(5)).unwrap(), finished());
    assert_eq!(interp.get_global("total"), Some(JsValue::from(15)));
}

#[test]
fn test_native_functions_are_callable() {
    let mut interp = create_test_runtime();
    interp.register_native("double", 1, |_, args| {
        let n = args.first().map(JsValue::to_number).unwrap_or(f64::NAN);
        Ok(JsValue::Number(n * 2.0))
    });
    let func = GeneratorFunction::anonymous(
        &[],
        vec![S::expr(E::yield_(E::call(
            E::ident("double"),
            vec![E::number(21.0)],
        )))],
    );
    let g = spawn(&mut interp, &func, vec![]);

    assert_eq!(next(&mut interp, &g), yielded(42));
}

#[test]
fn test_instantiation_runs_no_body_code() {
    let mut interp = create_test_runtime();
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    interp.register_native("touch", 0, move |_, _| {
        counter.set(counter.get() + 1);
        Ok(JsValue::Undefined)
    });
    let func = GeneratorFunction::anonymous(
        &[],
        vec![
            S::expr(E::call(E::ident("touch"), vec![])),
            S::expr(E::yield_empty()),
        ],
    );
    let g = spawn(&mut interp, &func, vec![]);
    assert_eq!(calls.get(), 0);

    assert_eq!(next(&mut interp, &g), yielded(JsValue::Undefined));
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_body_drives_another_generator() {
    let mut interp = create_test_runtime();
    // function* inner() { yield "a"; yield "b" }
    super::define(
        &mut interp,
        &GeneratorFunction::new(
            "inner",
            &[],
            vec![
                S::expr(E::yield_(E::string("a"))),
                S::expr(E::yield_(E::string("b"))),
            ],
        ),
    );
    // let it = inner(); it.next(); yield it.next().value; yield it.next().done
    let func = GeneratorFunction::anonymous(
        &[],
        vec![
            S::let_("it", E::call(E::ident("inner"), vec![])),
            S::expr(E::method(E::ident("it"), "next", vec![])),
            S::expr(E::yield_(E::member(
                E::method(E::ident("it"), "next", vec![]),
                "value",
            ))),
            S::expr(E::yield_(E::member(
                E::method(E::ident("it"), "next", vec![]),
                "done",
            ))),
        ],
    );
    let g = spawn(&mut interp, &func, vec![]);

    assert_eq!(next(&mut interp, &g), yielded("b"));
    assert_eq!(next(&mut interp, &g), yielded(true));
}
