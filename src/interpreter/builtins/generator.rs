//! Generator built-in methods

use super::error::not_a_function;
use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::generator::Generator;
use crate::interpreter::iterator::IteratorRef;
use crate::value::{CheapClone, IterResult, JsValue};

/// First argument, or `undefined` when called without arguments
fn first_arg(args: &[JsValue]) -> JsValue {
    args.first().map(CheapClone::cheap_clone).unwrap_or_default()
}

/// Dispatch `generator.method(args)` from body code
pub fn call_generator_method(
    interp: &mut Interpreter,
    generator: &Generator,
    method: &str,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    match method {
        "next" => generator_next(interp, generator, args),
        "return" => generator_return(interp, generator, args),
        "throw" => generator_throw(interp, generator, args),
        _ => Err(not_a_function("generator", method)),
    }
}

/// Generator.prototype.next(value)
pub fn generator_next(
    interp: &mut Interpreter,
    generator: &Generator,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let result = generator.next(interp, first_arg(args))?;
    Ok(result.to_object(interp))
}

/// Generator.prototype.return(value)
pub fn generator_return(
    interp: &mut Interpreter,
    generator: &Generator,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let result = generator.return_(interp, first_arg(args))?;
    Ok(result.to_object(interp))
}

/// Generator.prototype.throw(exception)
pub fn generator_throw(
    interp: &mut Interpreter,
    generator: &Generator,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let result = generator.throw(interp, first_arg(args))?;
    Ok(result.to_object(interp))
}

/// Dispatch `iterator.method(args)` on a host iterator.
/// Methods the iterator lacks are TypeErrors, as reading them yields `undefined`.
pub fn call_iterator_method(
    interp: &mut Interpreter,
    iterator: &IteratorRef,
    method: &str,
    args: &[JsValue],
) -> Result<JsValue, JsError> {
    let value = first_arg(args);
    let answer: Option<Result<IterResult, JsError>> = match method {
        "next" => Some(iterator.next(interp, value)),
        "return" => iterator.return_(interp, value),
        "throw" => iterator.throw(interp, value),
        _ => None,
    };
    let result = answer.ok_or_else(|| not_a_function("iterator", method))??;
    Ok(result.to_object(interp))
}
