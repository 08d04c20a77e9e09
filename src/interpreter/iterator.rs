//! Iterator protocol
//!
//! `yield*` delegates to anything implementing [`IteratorProtocol`]. Only
//! `next` is mandatory; an iterator advertises `return` and `throw` by
//! answering `Some` from the corresponding method.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use super::Interpreter;
use crate::error::JsError;
use crate::value::{CheapClone, ExoticObject, IterResult, JsObject, JsValue};

/// An iterator a generator can delegate to
pub trait IteratorProtocol {
    /// Advance the iterator, passing `value` in
    fn next(&self, interp: &mut Interpreter, value: JsValue) -> Result<IterResult, JsError>;

    /// Ask the iterator to finish early. `None` when the iterator has no `return` method.
    fn return_(
        &self,
        _interp: &mut Interpreter,
        _value: JsValue,
    ) -> Option<Result<IterResult, JsError>> {
        None
    }

    /// Raise `value` inside the iterator. `None` when the iterator has no `throw` method.
    fn throw(
        &self,
        _interp: &mut Interpreter,
        _value: JsValue,
    ) -> Option<Result<IterResult, JsError>> {
        None
    }
}

/// Shared handle to an iterator
#[derive(Clone)]
pub struct IteratorRef(Rc<dyn IteratorProtocol>);

impl CheapClone for IteratorRef {}

impl IteratorRef {
    pub fn new(iterator: impl IteratorProtocol + 'static) -> Self {
        IteratorRef(Rc::new(iterator))
    }

    /// Get the iterator behind a value, as `yield*` does with its operand.
    ///
    /// Generators, host iterators and objects with a callable `next`
    /// property are iterable; anything else is a TypeError.
    pub fn from_value(value: &JsValue) -> Result<Self, JsError> {
        if let JsValue::Object(obj) = value {
            match &obj.borrow().exotic {
                ExoticObject::Generator(generator) => {
                    return Ok(IteratorRef::new(generator.cheap_clone()));
                }
                ExoticObject::Iterator(iterator) => return Ok(iterator.cheap_clone()),
                _ => {}
            }
            if value.get_property("next").is_callable() {
                return Ok(IteratorRef::new(ObjectIterator {
                    object: value.cheap_clone(),
                }));
            }
        }
        Err(JsError::type_error(format!(
            "{} is not iterable",
            value.to_js_string()
        )))
    }

    /// Wrap the iterator into an object value
    pub fn into_value(self) -> JsValue {
        JsValue::object(JsObject::new(ExoticObject::Iterator(self)))
    }

    pub fn next(&self, interp: &mut Interpreter, value: JsValue) -> Result<IterResult, JsError> {
        self.0.next(interp, value)
    }

    pub fn return_(
        &self,
        interp: &mut Interpreter,
        value: JsValue,
    ) -> Option<Result<IterResult, JsError>> {
        self.0.return_(interp, value)
    }

    pub fn throw(
        &self,
        interp: &mut Interpreter,
        value: JsValue,
    ) -> Option<Result<IterResult, JsError>> {
        self.0.throw(interp, value)
    }
}

impl fmt::Debug for IteratorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[object Iterator]")
    }
}

/// Closure type backing [`NativeIterator`] methods
pub type IteratorFn = Box<dyn Fn(&mut Interpreter, JsValue) -> Result<IterResult, JsError>>;

/// A host iterator built from Rust closures
pub struct NativeIterator {
    next: IteratorFn,
    return_: Option<IteratorFn>,
    throw: Option<IteratorFn>,
}

impl NativeIterator {
    /// An iterator with only a `next` method
    pub fn new(
        next: impl Fn(&mut Interpreter, JsValue) -> Result<IterResult, JsError> + 'static,
    ) -> Self {
        Self {
            next: Box::new(next),
            return_: None,
            throw: None,
        }
    }

    /// Iterate over `values`, then report done with `undefined`
    pub fn from_values(values: Vec<JsValue>) -> Self {
        let remaining = RefCell::new(VecDeque::from(values));
        Self::new(move |_, _| {
            Ok(match remaining.borrow_mut().pop_front() {
                Some(value) => IterResult::yielded(value),
                None => IterResult::done(JsValue::Undefined),
            })
        })
    }

    pub fn with_return(
        mut self,
        return_: impl Fn(&mut Interpreter, JsValue) -> Result<IterResult, JsError> + 'static,
    ) -> Self {
        self.return_ = Some(Box::new(return_));
        self
    }

    pub fn with_throw(
        mut self,
        throw: impl Fn(&mut Interpreter, JsValue) -> Result<IterResult, JsError> + 'static,
    ) -> Self {
        self.throw = Some(Box::new(throw));
        self
    }

    /// Share the iterator and wrap it into an object value
    pub fn into_value(self) -> JsValue {
        IteratorRef::new(self).into_value()
    }
}

impl IteratorProtocol for NativeIterator {
    fn next(&self, interp: &mut Interpreter, value: JsValue) -> Result<IterResult, JsError> {
        (self.next)(interp, value)
    }

    fn return_(
        &self,
        interp: &mut Interpreter,
        value: JsValue,
    ) -> Option<Result<IterResult, JsError>> {
        self.return_.as_ref().map(|f| f(interp, value))
    }

    fn throw(
        &self,
        interp: &mut Interpreter,
        value: JsValue,
    ) -> Option<Result<IterResult, JsError>> {
        self.throw.as_ref().map(|f| f(interp, value))
    }
}

/// An ordinary object whose `next`/`return`/`throw` properties are functions
struct ObjectIterator {
    object: JsValue,
}

impl ObjectIterator {
    fn invoke(
        &self,
        interp: &mut Interpreter,
        method: &str,
        value: JsValue,
    ) -> Option<Result<IterResult, JsError>> {
        let func = self.object.get_property(method);
        if func.is_null_or_undefined() {
            return None;
        }
        Some(
            interp
                .call_function(&func, &[value])
                .and_then(|result| IterResult::from_value(&result)),
        )
    }
}

impl IteratorProtocol for ObjectIterator {
    fn next(&self, interp: &mut Interpreter, value: JsValue) -> Result<IterResult, JsError> {
        self.invoke(interp, "next", value)
            .unwrap_or_else(|| Err(JsError::type_error("next is not a function")))
    }

    fn return_(
        &self,
        interp: &mut Interpreter,
        value: JsValue,
    ) -> Option<Result<IterResult, JsError>> {
        self.invoke(interp, "return", value)
    }

    fn throw(
        &self,
        interp: &mut Interpreter,
        value: JsValue,
    ) -> Option<Result<IterResult, JsError>> {
        self.invoke(interp, "throw", value)
    }
}
