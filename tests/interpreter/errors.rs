//! Runtime and compile-time errors raised by generator bodies

use super::{create_test_runtime, done, next, spawn, yielded};
use genrun::ast::{Expression as E, GeneratorFunction, Statement as S};
use genrun::{ErrorKind, JsError, JsValue};

fn thrown(err: JsError) -> JsValue {
    match err {
        JsError::ThrownValue { value } => value,
        other => panic!("expected thrown value, got {:?}", other),
    }
}

fn single(statement: S) -> GeneratorFunction {
    GeneratorFunction::anonymous(&[], vec![statement])
}

#[test]
fn test_uncaught_throw_reports_value() {
    let mut interp = create_test_runtime();
    let g = spawn(&mut interp, &single(S::throw(E::string("boom"))), vec![]);

    let err = g.next(&mut interp, JsValue::Undefined).unwrap_err();
    assert_eq!(err.to_string(), "Uncaught boom");
    assert_eq!(thrown(err), JsValue::from("boom"));
}

#[test]
fn test_thrown_object_reaches_catch() {
    let mut interp = create_test_runtime();
    // try { throw { code: 7 } } catch (e) { return e.code }
    let func = single(S::try_catch(
        vec![S::throw(E::object(vec![("code", E::number(7.0))]))],
        Some("e"),
        vec![S::return_(E::member(E::ident("e"), "code"))],
    ));
    let g = spawn(&mut interp, &func, vec![]);
    assert_eq!(next(&mut interp, &g), done(7));
}

#[test]
fn test_unknown_global_is_reference_error() {
    let mut interp = create_test_runtime();
    let g = spawn(&mut interp, &single(S::expr(E::yield_(E::ident("missing")))), vec![]);

    let value = thrown(g.next(&mut interp, JsValue::Undefined).unwrap_err());
    assert_eq!(value.error_kind(), Some(ErrorKind::ReferenceError));
    assert_eq!(
        value.get_property("message"),
        JsValue::from("missing is not defined")
    );
}

#[test]
fn test_reference_error_is_catchable() {
    let mut interp = create_test_runtime();
    // try { yield missing } catch (e) { yield e.name }
    let func = single(S::try_catch(
        vec![S::expr(E::yield_(E::ident("missing")))],
        Some("e"),
        vec![S::expr(E::yield_(E::member(E::ident("e"), "name")))],
    ));
    let g = spawn(&mut interp, &func, vec![]);
    assert_eq!(next(&mut interp, &g), yielded("ReferenceError"));
}

#[test]
fn test_error_constructors() {
    let mut interp = create_test_runtime();
    // throw TypeError("bad input")
    let func = single(S::throw(E::call(
        E::ident("TypeError"),
        vec![E::string("bad input")],
    )));
    let g = spawn(&mut interp, &func, vec![]);

    let err = g.next(&mut interp, JsValue::Undefined).unwrap_err();
    assert!(err.is_type_error());
    let value = thrown(err);
    assert_eq!(value.get_property("name"), JsValue::from("TypeError"));
    assert_eq!(value.get_property("message"), JsValue::from("bad input"));
}

#[test]
fn test_calling_non_function_is_type_error() {
    let mut interp = create_test_runtime();
    interp.set_global("notfn", JsValue::from(5));
    let func = single(S::expr(E::call(E::ident("notfn"), vec![])));
    let g = spawn(&mut interp, &func, vec![]);

    assert!(g.next(&mut interp, JsValue::Undefined).unwrap_err().is_type_error());
}

#[test]
fn test_property_of_undefined_is_type_error() {
    let mut interp = create_test_runtime();
    let func = single(S::expr(E::yield_(E::member(E::undefined(), "x"))));
    let g = spawn(&mut interp, &func, vec![]);

    assert!(g.next(&mut interp, JsValue::Undefined).unwrap_err().is_type_error());
}

#[test]
fn test_native_error_propagates_as_catchable() {
    let mut interp = create_test_runtime();
    interp.register_native("fail", 0, |_, _| Err(JsError::range_error("out of range")));
    // try { fail() } catch (e) { yield e.message }
    let func = single(S::try_catch(
        vec![S::expr(E::call(E::ident("fail"), vec![]))],
        Some("e"),
        vec![S::expr(E::yield_(E::member(E::ident("e"), "message")))],
    ));
    let g = spawn(&mut interp, &func, vec![]);
    assert_eq!(next(&mut interp, &g), yielded("out of range"));
}

#[test]
fn test_break_outside_loop_is_syntax_error() {
    let mut interp = create_test_runtime();
    let err = interp.define_generator(&single(S::Break)).unwrap_err();
    assert!(matches!(err, JsError::SyntaxError { .. }));

    let err = interp.define_generator(&single(S::Continue)).unwrap_err();
    assert!(matches!(err, JsError::SyntaxError { .. }));
}

#[test]
fn test_try_without_clauses_is_syntax_error() {
    use genrun::ast::TryStatement;

    let mut interp = create_test_runtime();
    let func = single(S::Try(TryStatement {
        block: vec![],
        handler: None,
        finalizer: None,
    }));
    let err = interp.define_generator(&func).unwrap_err();
    assert_eq!(err.to_string(), "SyntaxError: Missing catch or finally after try");
}

#[test]
fn test_failed_definition_binds_nothing() {
    let mut interp = create_test_runtime();
    let func = GeneratorFunction::new("broken", &[], vec![S::Break]);
    assert!(interp.define_generator(&func).is_err());
    assert!(interp.get_global("broken").is_none());
}
