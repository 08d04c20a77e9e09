//! Bytecode Virtual Machine
//!
//! This module implements the bytecode interpreter that executes generator bodies.
//! A VM instance lives for one resumption: it is built from a suspended frame
//! (or from a fresh chunk), runs until the body yields, delegates or completes,
//! and packs its state back into a new frame when it suspends.

use log::trace;
use std::rc::Rc;

use super::Interpreter;
use super::frame::{PendingCompletion, ResumePoint, SuspendedFrame, TryHandler};
use super::iterator::IteratorRef;
use crate::completion::Completion;
use crate::compiler::{BytecodeChunk, Constant, ConstantIndex, Op, Register};
use crate::error::JsError;
use crate::value::{CheapClone, JsString, JsValue};

/// Result of VM execution
pub enum VmResult {
    /// Body yielded a value
    Yield {
        value: JsValue,
        frame: SuspendedFrame,
    },
    /// Body reached `yield*` and wants the caller to drive `target`
    Delegate {
        target: IteratorRef,
        frame: SuspendedFrame,
    },
    /// Body finished with `Return` or an uncaught `Throw`
    Complete(Completion),
    /// Error body code cannot intercept
    Error(JsError),
}

/// Result of executing a single opcode
enum OpResult {
    /// Continue to next instruction
    Continue,
    /// Suspend with a value
    Yield {
        value: JsValue,
        resume_register: Register,
    },
    /// Suspend into delegation
    Delegate {
        target: IteratorRef,
        resume_register: Register,
    },
    /// Leave the body
    Halt(Completion),
}

/// The bytecode virtual machine
pub struct BytecodeVM {
    /// Current instruction pointer
    pub ip: usize,
    /// Current bytecode chunk being executed
    pub chunk: Rc<BytecodeChunk>,
    /// Register file
    pub registers: Vec<JsValue>,
    /// Exception handler stack
    pub try_stack: Vec<TryHandler>,
    /// Completions held by running finally bodies
    completions: Vec<PendingCompletion>,
    /// Current exception value (for catch blocks)
    exception_value: Option<JsValue>,
}

impl BytecodeVM {
    /// Create a VM at the start of `chunk`, binding `args` to the parameter registers
    pub fn new(chunk: Rc<BytecodeChunk>, args: Vec<JsValue>) -> Self {
        let param_count = chunk
            .function_info
            .as_ref()
            .map_or(0, |info| info.param_count);
        let mut registers = vec![JsValue::Undefined; chunk.register_count.max(1) as usize];
        for (slot, arg) in registers.iter_mut().zip(args).take(param_count) {
            *slot = arg;
        }

        Self {
            ip: 0,
            chunk,
            registers,
            try_stack: Vec::new(),
            completions: Vec::new(),
            exception_value: None,
        }
    }

    /// Run a body from its first instruction
    pub fn start(chunk: Rc<BytecodeChunk>, args: Vec<JsValue>, interp: &mut Interpreter) -> VmResult {
        Self::new(chunk, args).run(interp)
    }

    /// Continue a suspended body, delivering `completion` at its paused point
    pub fn resume(frame: SuspendedFrame, completion: Completion, interp: &mut Interpreter) -> VmResult {
        let point = frame.resume_point;
        let mut vm = Self {
            ip: point.ip,
            chunk: frame.chunk,
            registers: frame.lexical_state,
            try_stack: frame.handlers,
            completions: frame.completions,
            exception_value: frame.exception,
        };
        trace!(target: "genrun::vm", "resume at {:04} with {}", point.ip, completion);

        let first = match completion {
            Completion::Normal(value) => {
                vm.set_reg(point.register, value);
                OpResult::Continue
            }
            Completion::Return(value) => vm.execute_return(value),
            Completion::Throw(value) => vm.dispatch_throw(value),
        };
        match first {
            OpResult::Halt(completion) => VmResult::Complete(completion),
            _ => vm.run(interp),
        }
    }

    /// Get register value
    #[inline]
    fn get_reg(&self, r: Register) -> &JsValue {
        self.registers
            .get(r as usize)
            .unwrap_or(&JsValue::Undefined)
    }

    /// Set register value
    fn set_reg(&mut self, r: Register, value: JsValue) {
        if let Some(slot) = self.registers.get_mut(r as usize) {
            *slot = value;
        }
    }

    /// Fetch the next instruction and advance IP
    fn fetch(&mut self) -> Option<Op> {
        let op = self.chunk.get(self.ip)?.clone();
        self.ip += 1;
        Some(op)
    }

    /// Get a string constant from the pool
    fn get_string_constant(&self, idx: ConstantIndex) -> Result<JsString, JsError> {
        match self.chunk.get_constant(idx) {
            Some(Constant::String(s)) => Ok(s.cheap_clone()),
            _ => Err(JsError::internal_error("Expected string constant")),
        }
    }

    /// Collect call arguments out of consecutive registers
    fn collect_args(&self, args_start: Register, argc: u8) -> Vec<JsValue> {
        (0..argc)
            .map(|i| self.get_reg(args_start.saturating_add(i)).cheap_clone())
            .collect()
    }

    /// Execute bytecode until suspension or completion
    fn run(mut self, interp: &mut Interpreter) -> VmResult {
        loop {
            if let Err(e) = interp.tick() {
                return VmResult::Error(e);
            }

            let Some(op) = self.fetch() else {
                // Chunks end with ReturnUndefined; running past it is a compiler bug
                return VmResult::Error(JsError::internal_error("Instruction pointer out of range"));
            };

            let result = match self.execute_op(interp, op) {
                Ok(result) => result,
                Err(e) if e.is_catchable() => self.dispatch_throw(e.into_value()),
                Err(e) => return VmResult::Error(e),
            };

            match result {
                OpResult::Continue => continue,
                OpResult::Yield {
                    value,
                    resume_register,
                } => {
                    let frame = self.suspend(resume_register);
                    return VmResult::Yield { value, frame };
                }
                OpResult::Delegate {
                    target,
                    resume_register,
                } => {
                    // The generator records the target in the frame once the inner iterator yields
                    let frame = self.suspend(resume_register);
                    return VmResult::Delegate { target, frame };
                }
                OpResult::Halt(completion) => return VmResult::Complete(completion),
            }
        }
    }

    /// Pack the VM state into a frame resuming at the current instruction
    fn suspend(&mut self, register: Register) -> SuspendedFrame {
        trace!(
            target: "genrun::vm",
            "suspend at {:04} ({} handlers, {} pending completions)",
            self.ip,
            self.try_stack.len(),
            self.completions.len()
        );
        SuspendedFrame {
            chunk: self.chunk.cheap_clone(),
            resume_point: ResumePoint {
                ip: self.ip,
                register,
            },
            lexical_state: std::mem::take(&mut self.registers),
            handlers: std::mem::take(&mut self.try_stack),
            completions: std::mem::take(&mut self.completions),
            exception: self.exception_value.take(),
            delegation_target: None,
        }
    }

    /// Execute a single opcode
    fn execute_op(&mut self, interp: &mut Interpreter, op: Op) -> Result<OpResult, JsError> {
        match op {
            // ═══════════════════════════════════════════════════════════════════════════
            // Constants & Register Operations
            // ═══════════════════════════════════════════════════════════════════════════
            Op::LoadConst { dst, idx } => {
                let value = match self.chunk.get_constant(idx) {
                    Some(Constant::String(s)) => JsValue::String(s.cheap_clone()),
                    Some(Constant::Number(n)) => JsValue::Number(*n),
                    None => return Err(JsError::internal_error("Invalid constant index")),
                };
                self.set_reg(dst, value);
            }

            Op::LoadUndefined { dst } => self.set_reg(dst, JsValue::Undefined),

            Op::LoadNull { dst } => self.set_reg(dst, JsValue::Null),

            Op::LoadBool { dst, value } => self.set_reg(dst, JsValue::Boolean(value)),

            Op::LoadInt { dst, value } => self.set_reg(dst, JsValue::Number(value as f64)),

            Op::Move { dst, src } => {
                let value = self.get_reg(src).cheap_clone();
                self.set_reg(dst, value);
            }

            // ═══════════════════════════════════════════════════════════════════════════
            // Arithmetic & Comparison
            // ═══════════════════════════════════════════════════════════════════════════
            Op::Add { dst, left, right } => {
                let left = self.get_reg(left);
                let right = self.get_reg(right);
                let result = if matches!(left, JsValue::String(_))
                    || matches!(right, JsValue::String(_))
                {
                    JsValue::String(left.to_js_string() + &right.to_js_string())
                } else {
                    JsValue::Number(left.to_number() + right.to_number())
                };
                self.set_reg(dst, result);
            }

            Op::Sub { dst, left, right } => {
                let result = self.get_reg(left).to_number() - self.get_reg(right).to_number();
                self.set_reg(dst, JsValue::Number(result));
            }

            Op::Mul { dst, left, right } => {
                let result = self.get_reg(left).to_number() * self.get_reg(right).to_number();
                self.set_reg(dst, JsValue::Number(result));
            }

            Op::StrictEq { dst, left, right } => {
                let result = self.get_reg(left).strict_equals(self.get_reg(right));
                self.set_reg(dst, JsValue::Boolean(result));
            }

            Op::StrictNotEq { dst, left, right } => {
                let result = !self.get_reg(left).strict_equals(self.get_reg(right));
                self.set_reg(dst, JsValue::Boolean(result));
            }

            Op::Lt { dst, left, right } => {
                let result = self.compare(left, right, |o| o.is_lt());
                self.set_reg(dst, JsValue::Boolean(result));
            }

            Op::LtEq { dst, left, right } => {
                let result = self.compare(left, right, |o| o.is_le());
                self.set_reg(dst, JsValue::Boolean(result));
            }

            Op::Gt { dst, left, right } => {
                let result = self.compare(left, right, |o| o.is_gt());
                self.set_reg(dst, JsValue::Boolean(result));
            }

            Op::GtEq { dst, left, right } => {
                let result = self.compare(left, right, |o| o.is_ge());
                self.set_reg(dst, JsValue::Boolean(result));
            }

            Op::Not { dst, src } => {
                let result = !self.get_reg(src).to_boolean();
                self.set_reg(dst, JsValue::Boolean(result));
            }

            Op::Neg { dst, src } => {
                let result = -self.get_reg(src).to_number();
                self.set_reg(dst, JsValue::Number(result));
            }

            // ═══════════════════════════════════════════════════════════════════════════
            // Control Flow
            // ═══════════════════════════════════════════════════════════════════════════
            Op::Jump { target } => self.ip = target as usize,

            Op::JumpIfTrue { cond, target } => {
                if self.get_reg(cond).to_boolean() {
                    self.ip = target as usize;
                }
            }

            Op::JumpIfFalse { cond, target } => {
                if !self.get_reg(cond).to_boolean() {
                    self.ip = target as usize;
                }
            }

            Op::Break {
                target,
                try_depth,
                finally_depth,
            } => return Ok(self.execute_break(target, try_depth, finally_depth)),

            // ═══════════════════════════════════════════════════════════════════════════
            // Variable Access
            // ═══════════════════════════════════════════════════════════════════════════
            Op::GetGlobal { dst, name } => {
                let name = self.get_string_constant(name)?;
                let value = interp
                    .get_global(name.as_str())
                    .ok_or_else(|| JsError::reference_error(name.as_str()))?;
                self.set_reg(dst, value);
            }

            Op::SetGlobal { name, src } => {
                let name = self.get_string_constant(name)?;
                interp.set_global(name.as_str(), self.get_reg(src).cheap_clone());
            }

            // ═══════════════════════════════════════════════════════════════════════════
            // Object Operations
            // ═══════════════════════════════════════════════════════════════════════════
            Op::CreateObject { dst } => self.set_reg(dst, JsValue::new_object()),

            Op::GetPropertyConst { dst, obj, key } => {
                let key = self.get_string_constant(key)?;
                let target = self.get_reg(obj);
                if target.is_null_or_undefined() {
                    return Err(JsError::type_error(format!(
                        "Cannot read properties of {} (reading '{}')",
                        target.to_js_string(),
                        key
                    )));
                }
                let value = target.get_property(key.as_str());
                self.set_reg(dst, value);
            }

            Op::SetPropertyConst { obj, key, value } => {
                let key = self.get_string_constant(key)?;
                let value = self.get_reg(value).cheap_clone();
                match self.get_reg(obj) {
                    JsValue::Object(target) => target.borrow_mut().set_property(key, value),
                    other => {
                        return Err(JsError::type_error(format!(
                            "Cannot set property '{}' on {}",
                            key,
                            other.to_js_string()
                        )));
                    }
                }
            }

            // ═══════════════════════════════════════════════════════════════════════════
            // Calls
            // ═══════════════════════════════════════════════════════════════════════════
            Op::Call {
                dst,
                callee,
                args_start,
                argc,
            } => {
                let callee = self.get_reg(callee).cheap_clone();
                let args = self.collect_args(args_start, argc);
                let result = interp.call_function(&callee, &args)?;
                self.set_reg(dst, result);
            }

            Op::CallMethod {
                dst,
                obj,
                method,
                args_start,
                argc,
            } => {
                let method = self.get_string_constant(method)?;
                let receiver = self.get_reg(obj).cheap_clone();
                let args = self.collect_args(args_start, argc);
                let result = interp.call_method(&receiver, method.as_str(), &args)?;
                self.set_reg(dst, result);
            }

            Op::Return { value } => {
                let value = self.get_reg(value).cheap_clone();
                return Ok(self.execute_return(value));
            }

            Op::ReturnUndefined => return Ok(self.execute_return(JsValue::Undefined)),

            // ═══════════════════════════════════════════════════════════════════════════
            // Exception Handling
            // ═══════════════════════════════════════════════════════════════════════════
            Op::Throw { value } => {
                let value = self.get_reg(value).cheap_clone();
                return Ok(self.dispatch_throw(value));
            }

            Op::PushTry {
                catch_target,
                finally_target,
            } => {
                self.try_stack.push(TryHandler {
                    catch_ip: catch_target as usize,
                    finally_ip: finally_target as usize,
                    completion_depth: self.completions.len(),
                });
            }

            Op::PopTry => {
                self.try_stack.pop();
            }

            Op::EnterFinally { target } => {
                self.completions.push(PendingCompletion::Normal);
                self.ip = target as usize;
            }

            Op::FinallyEnd => {
                return match self.completions.pop() {
                    Some(PendingCompletion::Normal) => Ok(OpResult::Continue),
                    Some(PendingCompletion::Return(value)) => Ok(self.execute_return(value)),
                    Some(PendingCompletion::Throw(value)) => Ok(self.dispatch_throw(value)),
                    Some(PendingCompletion::Break {
                        target,
                        try_depth,
                        finally_depth,
                    }) => Ok(self.execute_break(target, try_depth, finally_depth)),
                    None => Err(JsError::internal_error(
                        "End of finally block without a pending completion",
                    )),
                };
            }

            Op::GetException { dst } => {
                let exception = self.exception_value.take().unwrap_or_default();
                self.set_reg(dst, exception);
            }

            // ═══════════════════════════════════════════════════════════════════════════
            // Generator
            // ═══════════════════════════════════════════════════════════════════════════
            Op::Yield { dst, value } => {
                return Ok(OpResult::Yield {
                    value: self.get_reg(value).cheap_clone(),
                    resume_register: dst,
                });
            }

            Op::YieldStar { dst, iterable } => {
                let target = IteratorRef::from_value(self.get_reg(iterable))?;
                return Ok(OpResult::Delegate {
                    target,
                    resume_register: dst,
                });
            }
        }
        Ok(OpResult::Continue)
    }

    /// Relational comparison: strings compare by code units, everything else as numbers.
    /// Any comparison involving NaN is false.
    fn compare(
        &self,
        left: Register,
        right: Register,
        test: impl Fn(std::cmp::Ordering) -> bool,
    ) -> bool {
        match (self.get_reg(left), self.get_reg(right)) {
            (JsValue::String(a), JsValue::String(b)) => test(a.as_str().cmp(b.as_str())),
            (a, b) => a
                .to_number()
                .partial_cmp(&b.to_number())
                .is_some_and(test),
        }
    }

    /// Find an exception handler for `exception`, or leave the body with it
    fn dispatch_throw(&mut self, exception: JsValue) -> OpResult {
        while let Some(handler) = self.try_stack.pop() {
            // Anything a finally body inside the protected region was holding is superseded
            self.completions.truncate(handler.completion_depth);

            if handler.catch_ip > 0 {
                // If there's also a finally, keep a handler for it while the catch body runs
                if handler.has_finally() {
                    self.try_stack.push(TryHandler {
                        catch_ip: 0,
                        ..handler
                    });
                }
                self.exception_value = Some(exception);
                self.ip = handler.catch_ip;
                return OpResult::Continue;
            }
            if handler.has_finally() {
                self.completions.push(PendingCompletion::Throw(exception));
                self.ip = handler.finally_ip;
                return OpResult::Continue;
            }
        }
        self.completions.clear();
        OpResult::Halt(Completion::Throw(exception))
    }

    /// Execute a return, running any pending finally blocks first
    fn execute_return(&mut self, value: JsValue) -> OpResult {
        if let Some(idx) = self.try_stack.iter().rposition(TryHandler::has_finally) {
            if let Some(handler) = self.try_stack.get(idx).copied() {
                self.enter_finally(idx, handler, PendingCompletion::Return(value));
                return OpResult::Continue;
            }
        }
        self.try_stack.clear();
        self.completions.clear();
        OpResult::Halt(Completion::Return(value))
    }

    /// Execute a break or continue, running finally blocks above the loop first
    fn execute_break(&mut self, target: u32, try_depth: u8, finally_depth: u8) -> OpResult {
        let loop_depth = try_depth as usize;
        let innermost = self
            .try_stack
            .iter()
            .rposition(TryHandler::has_finally)
            .filter(|&idx| idx >= loop_depth);

        if let Some(idx) = innermost {
            if let Some(handler) = self.try_stack.get(idx).copied() {
                let pending = PendingCompletion::Break {
                    target,
                    try_depth,
                    finally_depth,
                };
                self.enter_finally(idx, handler, pending);
                return OpResult::Continue;
            }
        }

        // No finally in the way: drop handlers and finally bodies inside the loop
        self.try_stack.truncate(loop_depth);
        self.completions.truncate(finally_depth as usize);
        self.ip = target as usize;
        OpResult::Continue
    }

    /// Jump into the finally block of the handler at `idx`, holding `pending`
    fn enter_finally(&mut self, idx: usize, handler: TryHandler, pending: PendingCompletion) {
        self.try_stack.truncate(idx);
        self.completions.truncate(handler.completion_depth);
        self.completions.push(pending);
        self.ip = handler.finally_ip;
    }
}
