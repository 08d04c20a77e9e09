//! Error constructor built-in functions
//!
//! Bodies raise errors with `throw TypeError("message")`; there is no `new`,
//! so the constructors are plain functions returning error objects.

use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::value::{ErrorKind, JsValue, create_error_object};

const ERROR_KINDS: [ErrorKind; 5] = [
    ErrorKind::Error,
    ErrorKind::TypeError,
    ErrorKind::RangeError,
    ErrorKind::ReferenceError,
    ErrorKind::SyntaxError,
];

/// Register `Error` and the derived error constructors as globals
pub fn init_error_constructors(interp: &mut Interpreter) {
    for kind in ERROR_KINDS {
        interp.register_native(kind.name(), 1, move |_, args| {
            Ok(error_constructor(kind, args))
        });
    }
}

/// Build an error object; a missing or undefined message becomes the empty string
fn error_constructor(kind: ErrorKind, args: &[JsValue]) -> JsValue {
    let message = match args.first() {
        None | Some(JsValue::Undefined) => String::new(),
        Some(message) => message.to_js_string().to_string(),
    };
    create_error_object(kind, &message)
}

/// Error raised when body code calls a method the receiver does not have
pub fn not_a_function(receiver: &str, method: &str) -> JsError {
    JsError::type_error(format!("{}.{} is not a function", receiver, method))
}
