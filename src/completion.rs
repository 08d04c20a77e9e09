//! Completion records
//!
//! Every resumption of a generator delivers exactly one of these at the
//! paused point, and every run of a body ends with one.

use std::fmt;

use crate::value::JsValue;

/// Outcome of evaluating a statement or resuming a suspended body
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Execution continues with this value
    Normal(JsValue),
    /// Abrupt return; runs enclosing finally blocks on its way out
    Return(JsValue),
    /// Abrupt throw; runs enclosing catch and finally blocks on its way out
    Throw(JsValue),
}

impl Completion {
    pub fn is_abrupt(&self) -> bool {
        !matches!(self, Completion::Normal(_))
    }

    pub fn value(&self) -> &JsValue {
        match self {
            Completion::Normal(v) | Completion::Return(v) | Completion::Throw(v) => v,
        }
    }

    pub fn into_value(self) -> JsValue {
        match self {
            Completion::Normal(v) | Completion::Return(v) | Completion::Throw(v) => v,
        }
    }

    /// Name of the resumption method that delivers this completion
    pub fn method_name(&self) -> &'static str {
        match self {
            Completion::Normal(_) => "next",
            Completion::Return(_) => "return",
            Completion::Throw(_) => "throw",
        }
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Normal(v) => write!(f, "normal({:?})", v),
            Completion::Return(v) => write!(f, "return({:?})", v),
            Completion::Throw(v) => write!(f, "throw({:?})", v),
        }
    }
}
