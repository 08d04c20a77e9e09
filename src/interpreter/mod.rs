//! Interpreter: the host surface generator bodies run against
//!
//! The interpreter owns globals, the string dictionary and the resource
//! limits. It defines generator functions, instantiates them and dispatches
//! the calls and method calls that bodies make.

// Builtin function implementations (split into separate files)
pub mod builtins;

pub mod bytecode_vm;
pub mod frame;
pub mod generator;
pub mod iterator;

use std::rc::Rc;

use log::trace;
use rustc_hash::FxHashMap;

use crate::ast::GeneratorFunction;
use crate::compiler::Compiler;
use crate::config::RuntimeConfig;
use crate::error::JsError;
use crate::string_dict::StringDict;
use crate::value::{
    CheapClone, ExoticObject, GeneratorFunctionData, JsObject, JsString, JsValue, NativeFunction,
};
use generator::Generator;

/// Main interpreter state
pub struct Interpreter {
    /// Global bindings
    globals: FxHashMap<JsString, JsValue>,

    /// String dictionary for interning common strings
    string_dict: StringDict,

    /// Active limits
    config: RuntimeConfig,

    /// Instructions executed since the outermost resumption began
    steps: u64,

    /// Generator resumptions currently on the host stack
    resume_depth: usize,
}

impl Interpreter {
    /// Create a new interpreter with default limits
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a new interpreter with the given limits
    pub fn with_config(config: RuntimeConfig) -> Self {
        let mut interp = Self {
            globals: FxHashMap::default(),
            string_dict: StringDict::with_common_strings(),
            config,
            steps: 0,
            resume_depth: 0,
        };
        builtins::init_error_constructors(&mut interp);
        interp
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Set the instruction budget per outermost resumption. 0 disables the limit.
    pub fn set_max_steps(&mut self, max_steps: u64) {
        self.config.max_steps = max_steps;
    }

    /// Set how many resumptions may be nested on the host stack
    pub fn set_max_resume_depth(&mut self, depth: usize) {
        self.config.max_resume_depth = depth;
    }

    /// Instructions executed by the current (or most recent) outermost resumption
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Intern a string in the dictionary, returning a shared JsString.
    ///
    /// Use this for frequently-used strings to avoid duplicate allocations.
    #[inline]
    pub fn intern(&mut self, s: &str) -> JsString {
        self.string_dict.get_or_insert(s)
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Globals
    // ═══════════════════════════════════════════════════════════════════════════════

    pub fn set_global(&mut self, name: &str, value: JsValue) {
        let name = self.intern(name);
        self.globals.insert(name, value);
    }

    pub fn get_global(&self, name: &str) -> Option<JsValue> {
        self.globals.get(name).cloned()
    }

    /// Create a native function value without binding it
    pub fn create_native_function(
        &mut self,
        name: &str,
        arity: usize,
        func: impl Fn(&mut Interpreter, &[JsValue]) -> Result<JsValue, JsError> + 'static,
    ) -> JsValue {
        let name = self.intern(name);
        JsValue::object(JsObject::new(ExoticObject::NativeFunction(NativeFunction {
            name,
            arity,
            func: Rc::new(func),
        })))
    }

    /// Bind a native function to a global name and return it
    pub fn register_native(
        &mut self,
        name: &str,
        arity: usize,
        func: impl Fn(&mut Interpreter, &[JsValue]) -> Result<JsValue, JsError> + 'static,
    ) -> JsValue {
        let func = self.create_native_function(name, arity, func);
        self.set_global(name, func.cheap_clone());
        func
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Generator functions
    // ═══════════════════════════════════════════════════════════════════════════════

    /// Compile a generator function. A named function is also bound as a global,
    /// so bodies can refer to each other by name.
    pub fn define_generator(&mut self, func: &GeneratorFunction) -> Result<JsValue, JsError> {
        let chunk = Compiler::compile_generator(func)?;
        trace!(target: "genrun::vm", "compiled generator function\n{}", chunk);

        let value = JsValue::object(JsObject::new(ExoticObject::GeneratorFunction(
            GeneratorFunctionData { chunk },
        )));
        if let Some(name) = &func.name {
            self.set_global(name.as_str(), value.cheap_clone());
        }
        Ok(value)
    }

    /// Create a generator object from a generator function value. No body code runs.
    pub fn instantiate(&mut self, func: &JsValue, args: Vec<JsValue>) -> Result<Generator, JsError> {
        let chunk = match func {
            JsValue::Object(obj) => match &obj.borrow().exotic {
                ExoticObject::GeneratorFunction(data) => Some(data.chunk.cheap_clone()),
                _ => None,
            },
            _ => None,
        };
        let chunk = chunk.ok_or_else(|| {
            JsError::type_error(format!("{} is not a generator function", func.to_js_string()))
        })?;
        Ok(Generator::new(chunk, args))
    }

    /// Resume `generator` with `next()` until it completes, collecting the yielded values
    pub fn drain(&mut self, generator: &Generator) -> Result<Vec<JsValue>, JsError> {
        let mut values = Vec::new();
        loop {
            let result = generator.next(self, JsValue::Undefined)?;
            if result.done {
                return Ok(values);
            }
            values.push(result.value);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Calls
    // ═══════════════════════════════════════════════════════════════════════════════

    /// Call a function value. Calling a generator function creates a generator object.
    pub fn call_function(&mut self, callee: &JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
        enum Callable {
            Native(NativeFunction),
            Generator(GeneratorFunctionData),
        }

        let callable = match callee {
            JsValue::Object(obj) => match &obj.borrow().exotic {
                // Rc clone of the closure
                ExoticObject::NativeFunction(f) => Some(Callable::Native(f.clone())),
                ExoticObject::GeneratorFunction(data) => Some(Callable::Generator(data.clone())),
                _ => None,
            },
            _ => None,
        };

        match callable {
            Some(Callable::Native(f)) => (f.func)(self, args),
            Some(Callable::Generator(data)) => {
                Ok(JsValue::from(Generator::new(data.chunk, args.to_vec())))
            }
            None => Err(JsError::type_error(format!(
                "{} is not a function",
                callee.to_js_string()
            ))),
        }
    }

    /// Call `receiver.method(args)`
    pub fn call_method(
        &mut self,
        receiver: &JsValue,
        method: &str,
        args: &[JsValue],
    ) -> Result<JsValue, JsError> {
        let JsValue::Object(obj) = receiver else {
            return Err(JsError::type_error(format!(
                "Cannot read properties of {} (reading '{}')",
                receiver.to_js_string(),
                method
            )));
        };

        let exotic_target = match &obj.borrow().exotic {
            ExoticObject::Generator(generator) => Some(Ok(generator.cheap_clone())),
            ExoticObject::Iterator(iterator) => Some(Err(iterator.cheap_clone())),
            _ => None,
        };

        match exotic_target {
            Some(Ok(generator)) => builtins::call_generator_method(self, &generator, method, args),
            Some(Err(iterator)) => builtins::call_iterator_method(self, &iterator, method, args),
            None => {
                let func = receiver.get_property(method);
                if !func.is_callable() {
                    return Err(JsError::type_error(format!("{} is not a function", method)));
                }
                self.call_function(&func, args)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Limits
    // ═══════════════════════════════════════════════════════════════════════════════

    /// Count one executed instruction against the step budget
    #[inline]
    pub fn tick(&mut self) -> Result<(), JsError> {
        self.steps += 1;
        let limit = self.config.max_steps;
        if limit > 0 && self.steps > limit {
            return Err(JsError::StepLimitExceeded { limit });
        }
        Ok(())
    }

    /// Record a generator resumption entering the host stack
    pub fn enter_resume(&mut self) -> Result<(), JsError> {
        if self.resume_depth >= self.config.max_resume_depth {
            return Err(JsError::range_error("Maximum call stack size exceeded"));
        }
        if self.resume_depth == 0 {
            self.steps = 0;
        }
        self.resume_depth += 1;
        Ok(())
    }

    pub fn exit_resume(&mut self) {
        self.resume_depth = self.resume_depth.saturating_sub(1);
    }

    /// Generator resumptions currently active
    pub fn resume_depth(&self) -> usize {
        self.resume_depth
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // JSON
    // ═══════════════════════════════════════════════════════════════════════════════

    /// Parse JSON text into a value
    pub fn create_value_from_json(&mut self, text: &str) -> Result<JsValue, JsError> {
        let json: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| JsError::syntax_error(format!("Invalid JSON: {}", e)))?;
        JsValue::from_json(&json)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
