//! Generator state machine for an embeddable JavaScript-like runtime
//!
//! Generator bodies are built as an AST, compiled to register bytecode and
//! run by a VM that can suspend at `yield`, delegate through `yield*`, and
//! unwind `return`/`throw` completions through `try/finally`.
//!
//! # Example
//!
//! ```
//! use genrun::ast::{Expression, GeneratorFunction, Statement};
//! use genrun::{Interpreter, IterResult, JsValue};
//!
//! let mut interp = Interpreter::new();
//! let foo = interp
//!     .define_generator(&GeneratorFunction::new("foo", &[], vec![
//!         Statement::expr(Expression::yield_(Expression::number(2.0))),
//!         Statement::expr(Expression::yield_(Expression::number(3.0))),
//!     ]))
//!     .unwrap();
//!
//! let generator = interp.instantiate(&foo, vec![]).unwrap();
//! let first = generator.next(&mut interp, JsValue::Undefined).unwrap();
//! assert_eq!(first, IterResult::yielded(JsValue::Number(2.0)));
//! assert_eq!(interp.drain(&generator).unwrap(), vec![JsValue::Number(3.0)]);
//! ```

pub mod ast;
pub mod completion;
pub mod compiler;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod string_dict;
pub mod value;

pub use completion::Completion;
pub use config::RuntimeConfig;
pub use error::JsError;
pub use interpreter::Interpreter;
pub use interpreter::generator::{Generator, GeneratorState};
pub use interpreter::iterator::{IteratorProtocol, IteratorRef, NativeIterator};
pub use value::CheapClone;
pub use value::ErrorKind;
pub use value::IterResult;
pub use value::JsString;
pub use value::JsValue;
