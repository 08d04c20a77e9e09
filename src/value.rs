//! Runtime value representation
//!
//! The core JsValue type and the small object model generator bodies operate on.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::compiler::BytecodeChunk;
use crate::error::JsError;
use crate::interpreter::Interpreter;
use crate::interpreter::generator::Generator;
use crate::interpreter::iterator::IteratorRef;

/// Trait for types that have cheap (O(1), reference-counted) clones.
///
/// This trait makes it explicit when a clone is cheap (just incrementing a reference count)
/// vs when it might be expensive (copying data). Types implementing this trait should have
/// O(1) clone operations, typically because they use `Rc` or similar reference counting.
///
/// Regular `.clone()` should still work but requires a comment explaining why the clone
/// is necessary when the type doesn't implement `CheapClone`.
pub trait CheapClone: Clone {
    /// Create a cheap (reference-counted) clone of this value.
    fn cheap_clone(&self) -> Self {
        self.clone()
    }
}

impl<T: ?Sized> CheapClone for Rc<T> {}

/// A JavaScript value
#[derive(Clone, Default)]
pub enum JsValue {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Object(JsObjectRef),
}

/// Shared handle to a heap object
pub type JsObjectRef = Rc<RefCell<JsObject>>;

// Cloning a value clones at most one Rc
impl CheapClone for JsValue {}

impl JsValue {
    /// Wrap an object into a value
    pub fn object(obj: JsObject) -> Self {
        JsValue::Object(Rc::new(RefCell::new(obj)))
    }

    /// Create an empty ordinary object
    pub fn new_object() -> Self {
        Self::object(JsObject::ordinary())
    }

    /// Check if this value is null or undefined
    pub fn is_null_or_undefined(&self) -> bool {
        matches!(self, JsValue::Null | JsValue::Undefined)
    }

    /// Check if this value can be called
    pub fn is_callable(&self) -> bool {
        match self {
            JsValue::Object(obj) => matches!(
                obj.borrow().exotic,
                ExoticObject::NativeFunction(_) | ExoticObject::GeneratorFunction(_)
            ),
            _ => false,
        }
    }

    /// Get the typeof result for this value
    pub fn type_of(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null => "object", // Historical quirk
            JsValue::Boolean(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::String(_) => "string",
            JsValue::Object(_) => {
                if self.is_callable() {
                    "function"
                } else {
                    "object"
                }
            }
        }
    }

    /// Convert to boolean (ToBoolean)
    pub fn to_boolean(&self) -> bool {
        match self {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Boolean(b) => *b,
            JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
            JsValue::String(s) => !s.is_empty(),
            JsValue::Object(_) => true,
        }
    }

    /// Convert to number (ToNumber)
    pub fn to_number(&self) -> f64 {
        match self {
            JsValue::Undefined => f64::NAN,
            JsValue::Null => 0.0,
            JsValue::Boolean(true) => 1.0,
            JsValue::Boolean(false) => 0.0,
            JsValue::Number(n) => *n,
            JsValue::String(s) => {
                let trimmed = s.as_str().trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().unwrap_or(f64::NAN)
                }
            }
            // Would need ToPrimitive then ToNumber
            JsValue::Object(_) => f64::NAN,
        }
    }

    /// Convert to string (ToString)
    pub fn to_js_string(&self) -> JsString {
        match self {
            JsValue::Undefined => JsString::from("undefined"),
            JsValue::Null => JsString::from("null"),
            JsValue::Boolean(true) => JsString::from("true"),
            JsValue::Boolean(false) => JsString::from("false"),
            JsValue::Number(n) => {
                if n.is_nan() {
                    JsString::from("NaN")
                } else if n.is_infinite() {
                    if *n > 0.0 {
                        JsString::from("Infinity")
                    } else {
                        JsString::from("-Infinity")
                    }
                } else if *n == 0.0 {
                    JsString::from("0")
                } else {
                    JsString::from(n.to_string())
                }
            }
            JsValue::String(s) => s.cheap_clone(),
            JsValue::Object(obj) => {
                let obj = obj.borrow();
                match &obj.exotic {
                    ExoticObject::Error(kind) => {
                        let message = obj
                            .get_property("message")
                            .map(|m| m.to_js_string())
                            .unwrap_or_else(|| JsString::from(""));
                        if message.is_empty() {
                            JsString::from(kind.name())
                        } else {
                            JsString::from(format!("{}: {}", kind.name(), message))
                        }
                    }
                    ExoticObject::Generator(_) => JsString::from("[object Generator]"),
                    ExoticObject::NativeFunction(_) | ExoticObject::GeneratorFunction(_) => {
                        JsString::from("function")
                    }
                    _ => JsString::from("[object Object]"),
                }
            }
        }
    }

    /// Strict equality (===)
    pub fn strict_equals(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Undefined, JsValue::Undefined) => true,
            (JsValue::Null, JsValue::Null) => true,
            (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
            // NaN !== NaN falls out of IEEE comparison
            (JsValue::Number(a), JsValue::Number(b)) => a == b,
            (JsValue::String(a), JsValue::String(b)) => a == b,
            (JsValue::Object(a), JsValue::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Read a property of an object value, `undefined` for anything else
    pub fn get_property(&self, key: &str) -> JsValue {
        match self {
            JsValue::Object(obj) => obj.borrow().get_property(key).unwrap_or_default(),
            _ => JsValue::Undefined,
        }
    }

    /// The generator behind this value, if it is a generator object
    pub fn as_generator(&self) -> Option<Generator> {
        match self {
            JsValue::Object(obj) => match &obj.borrow().exotic {
                ExoticObject::Generator(generator) => Some(generator.cheap_clone()),
                _ => None,
            },
            _ => None,
        }
    }

    /// The error kind if this value is an error object
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            JsValue::Object(obj) => match &obj.borrow().exotic {
                ExoticObject::Error(kind) => Some(*kind),
                _ => None,
            },
            _ => None,
        }
    }

    /// Convert to a JSON value. Functions, generators and iterators become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            JsValue::Undefined | JsValue::Null => serde_json::Value::Null,
            JsValue::Boolean(b) => serde_json::Value::Bool(*b),
            JsValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
                    serde_json::Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            }
            JsValue::String(s) => serde_json::Value::String(s.to_string()),
            JsValue::Object(obj) => {
                let obj = obj.borrow();
                match obj.exotic {
                    ExoticObject::Ordinary | ExoticObject::Error(_) => {
                        let mut map = serde_json::Map::new();
                        for (key, value) in &obj.properties {
                            if !matches!(value, JsValue::Undefined) {
                                map.insert(key.to_string(), value.to_json());
                            }
                        }
                        serde_json::Value::Object(map)
                    }
                    _ => serde_json::Value::Null,
                }
            }
        }
    }

    /// Convert from a JSON value. Arrays are not part of the value model and are rejected.
    pub fn from_json(json: &serde_json::Value) -> Result<JsValue, JsError> {
        Ok(match json {
            serde_json::Value::Null => JsValue::Null,
            serde_json::Value::Bool(b) => JsValue::Boolean(*b),
            serde_json::Value::Number(n) => JsValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => JsValue::String(JsString::from(s.as_str())),
            serde_json::Value::Array(_) => {
                return Err(JsError::type_error("JSON arrays cannot be converted to values"));
            }
            serde_json::Value::Object(map) => {
                let mut obj = JsObject::ordinary();
                for (key, value) in map {
                    obj.set_property(JsString::from(key.as_str()), JsValue::from_json(value)?);
                }
                JsValue::object(obj)
            }
        })
    }
}

impl fmt::Debug for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Null => write!(f, "null"),
            JsValue::Boolean(b) => write!(f, "{}", b),
            JsValue::Number(n) => write!(f, "{}", n),
            JsValue::String(s) => write!(f, "\"{}\"", s.as_str()),
            JsValue::Object(obj) => match obj.try_borrow() {
                Ok(obj) => write!(f, "{:?}", obj.exotic),
                Err(_) => write!(f, "[object <borrowed>]"),
            },
        }
    }
}

impl fmt::Display for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_js_string())
    }
}

impl PartialEq for JsValue {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

// Conversions from Rust types

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<i32> for JsValue {
    fn from(n: i32) -> Self {
        JsValue::Number(n as f64)
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::String(JsString::from(s))
    }
}

impl From<String> for JsValue {
    fn from(s: String) -> Self {
        JsValue::String(JsString::from(s))
    }
}

impl From<JsString> for JsValue {
    fn from(s: JsString) -> Self {
        JsValue::String(s)
    }
}

impl From<Generator> for JsValue {
    fn from(generator: Generator) -> Self {
        JsValue::object(JsObject::new(ExoticObject::Generator(generator)))
    }
}

/// Reference-counted string for efficient string handling
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct JsString(Rc<str>);

// JsString wraps Rc<str>, so clone is cheap (just reference count increment)
impl CheapClone for JsString {}

impl JsString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl AsRef<str> for JsString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for JsString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for JsString {
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for JsString {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        JsString(s.into())
    }
}

impl From<String> for JsString {
    fn from(s: String) -> Self {
        JsString(s.into())
    }
}

impl fmt::Debug for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Add<&JsString> for JsString {
    type Output = JsString;

    fn add(self, other: &JsString) -> JsString {
        let mut s = String::from(&*self.0);
        s.push_str(&other.0);
        JsString::from(s)
    }
}

/// A heap object: an exotic payload plus ordered own properties
pub struct JsObject {
    pub exotic: ExoticObject,
    pub properties: IndexMap<JsString, JsValue>,
}

impl JsObject {
    pub fn new(exotic: ExoticObject) -> Self {
        Self {
            exotic,
            properties: IndexMap::new(),
        }
    }

    pub fn ordinary() -> Self {
        Self::new(ExoticObject::Ordinary)
    }

    pub fn get_property(&self, key: &str) -> Option<JsValue> {
        self.properties.get(key).cloned()
    }

    pub fn set_property(&mut self, key: JsString, value: JsValue) {
        self.properties.insert(key, value);
    }
}

/// Internal payload distinguishing object kinds
pub enum ExoticObject {
    Ordinary,
    /// Error object; `name` and `message` live in the properties
    Error(ErrorKind),
    NativeFunction(NativeFunction),
    GeneratorFunction(GeneratorFunctionData),
    Generator(Generator),
    /// Host-provided iterator
    Iterator(IteratorRef),
}

impl fmt::Debug for ExoticObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExoticObject::Ordinary => write!(f, "{{...}}"),
            ExoticObject::Error(kind) => write!(f, "[{}]", kind.name()),
            ExoticObject::NativeFunction(func) => write!(f, "[Function: {}]", func.name),
            ExoticObject::GeneratorFunction(func) => {
                write!(f, "[GeneratorFunction: {}]", func.name().unwrap_or("anonymous"))
            }
            ExoticObject::Generator(generator) => write!(f, "{:?}", generator),
            ExoticObject::Iterator(_) => write!(f, "[object Iterator]"),
        }
    }
}

/// Kinds of error objects the runtime creates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Error,
    TypeError,
    RangeError,
    ReferenceError,
    SyntaxError,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::SyntaxError => "SyntaxError",
        }
    }
}

/// Signature of host functions callable from generator bodies
pub type NativeFn = Rc<dyn Fn(&mut Interpreter, &[JsValue]) -> Result<JsValue, JsError>>;

/// Native Rust function
#[derive(Clone)]
pub struct NativeFunction {
    pub name: JsString,
    pub arity: usize,
    pub func: NativeFn,
}

/// A compiled generator function; calling it creates a generator object
#[derive(Clone)]
pub struct GeneratorFunctionData {
    pub chunk: Rc<BytecodeChunk>,
}

impl GeneratorFunctionData {
    pub fn name(&self) -> Option<&str> {
        self.chunk
            .function_info
            .as_ref()
            .and_then(|info| info.name.as_ref())
            .map(JsString::as_str)
    }
}

/// Create an error object value
pub fn create_error_object(kind: ErrorKind, message: &str) -> JsValue {
    let mut obj = JsObject::new(ExoticObject::Error(kind));
    obj.set_property(JsString::from("name"), JsValue::from(kind.name()));
    obj.set_property(JsString::from("message"), JsValue::from(message));
    JsValue::object(obj)
}

/// The `{ value, done }` record every resumption produces
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IterResult {
    pub value: JsValue,
    pub done: bool,
}

impl IterResult {
    /// Result of a suspension: `{ value, done: false }`
    pub fn yielded(value: JsValue) -> Self {
        Self { value, done: false }
    }

    /// Result of completion: `{ value, done: true }`
    pub fn done(value: JsValue) -> Self {
        Self { value, done: true }
    }

    /// Build the ordinary object `{ value, done }`
    pub fn to_object(&self, interp: &mut Interpreter) -> JsValue {
        let mut obj = JsObject::ordinary();
        obj.set_property(interp.intern("value"), self.value.clone());
        obj.set_property(interp.intern("done"), JsValue::Boolean(self.done));
        JsValue::object(obj)
    }

    /// Read `value` and `done` from an iterator result object.
    /// Missing properties read as `undefined`, `done` goes through ToBoolean.
    pub fn from_value(value: &JsValue) -> Result<Self, JsError> {
        match value {
            JsValue::Object(_) => Ok(Self {
                value: value.get_property("value"),
                done: value.get_property("done").to_boolean(),
            }),
            other => Err(JsError::type_error(format!(
                "Iterator result {} is not an object",
                other.to_js_string()
            ))),
        }
    }
}
