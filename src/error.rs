//! Error types for the generator runtime

use thiserror::Error;

use crate::value::{ErrorKind, JsValue, create_error_object};

/// Main error type for the runtime
#[derive(Debug, Error)]
pub enum JsError {
    #[error("SyntaxError: {message}")]
    SyntaxError { message: String },

    #[error("TypeError: {message}")]
    TypeError { message: String },

    #[error("ReferenceError: {name} is not defined")]
    ReferenceError { name: String },

    #[error("RangeError: {message}")]
    RangeError { message: String },

    /// A value thrown by body code that no handler intercepted
    #[error("Uncaught {value}")]
    ThrownValue { value: JsValue },

    /// Instruction budget exhausted; body code cannot catch this
    #[error("Execution exceeded the limit of {limit} instructions")]
    StepLimitExceeded { limit: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl JsError {
    pub fn syntax_error(message: impl Into<String>) -> Self {
        JsError::SyntaxError {
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        JsError::TypeError {
            message: message.into(),
        }
    }

    pub fn reference_error(name: impl Into<String>) -> Self {
        JsError::ReferenceError { name: name.into() }
    }

    pub fn range_error(message: impl Into<String>) -> Self {
        JsError::RangeError {
            message: message.into(),
        }
    }

    /// Resumption of a generator that is currently executing
    pub fn generator_running() -> Self {
        JsError::type_error("Generator is already running")
    }

    /// `throw()` forwarded by `yield*` to an iterator without a `throw` method
    pub fn delegate_missing_throw() -> Self {
        JsError::type_error("The iterator does not provide a 'throw' method")
    }

    /// Create an internal error for unexpected runtime states
    pub fn internal_error(message: impl Into<String>) -> Self {
        JsError::Internal(message.into())
    }

    /// Wrap a thrown value
    pub fn thrown(value: JsValue) -> Self {
        JsError::ThrownValue { value }
    }

    /// Whether body code may intercept this error with `catch`/`finally`
    pub fn is_catchable(&self) -> bool {
        !matches!(
            self,
            JsError::StepLimitExceeded { .. } | JsError::Internal(_)
        )
    }

    /// True for a TypeError raised by the runtime, and for a thrown TypeError object
    pub fn is_type_error(&self) -> bool {
        match self {
            JsError::TypeError { .. } => true,
            JsError::ThrownValue { value } => value.error_kind() == Some(ErrorKind::TypeError),
            _ => false,
        }
    }

    /// The value body code observes when it catches this error
    pub fn to_value(&self) -> JsValue {
        match self {
            JsError::ThrownValue { value } => value.clone(),
            JsError::TypeError { message } => create_error_object(ErrorKind::TypeError, message),
            JsError::RangeError { message } => create_error_object(ErrorKind::RangeError, message),
            JsError::SyntaxError { message } => {
                create_error_object(ErrorKind::SyntaxError, message)
            }
            JsError::ReferenceError { name } => create_error_object(
                ErrorKind::ReferenceError,
                &format!("{} is not defined", name),
            ),
            JsError::StepLimitExceeded { .. } | JsError::Internal(_) => {
                create_error_object(ErrorKind::Error, &self.to_string())
            }
        }
    }

    /// Consume the error, producing the thrown value
    pub fn into_value(self) -> JsValue {
        match self {
            JsError::ThrownValue { value } => value,
            other => other.to_value(),
        }
    }
}
