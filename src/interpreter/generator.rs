//! Generator objects
//!
//! A generator owns its paused body. The state and the payload it needs live
//! in a single slot enum: while the body runs the slot holds `Executing` and the
//! frame belongs to the VM, so a reentrant resumption cannot reach it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use super::Interpreter;
use super::bytecode_vm::{BytecodeVM, VmResult};
use super::frame::SuspendedFrame;
use super::iterator::{IteratorProtocol, IteratorRef};
use crate::completion::Completion;
use crate::compiler::BytecodeChunk;
use crate::error::JsError;
use crate::value::{CheapClone, IterResult, JsString, JsValue};

/// Observable generator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    /// Created, body not entered yet
    SuspendedStart,
    /// Paused at a `yield` (or inside `yield*`)
    SuspendedYield,
    /// Body is running on the host stack
    Executing,
    /// Body finished; every further operation is pure
    Completed,
}

impl GeneratorState {
    pub fn as_str(self) -> &'static str {
        match self {
            GeneratorState::SuspendedStart => "suspendedStart",
            GeneratorState::SuspendedYield => "suspendedYield",
            GeneratorState::Executing => "executing",
            GeneratorState::Completed => "completed",
        }
    }
}

impl fmt::Display for GeneratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State together with the data that state owns
enum GeneratorSlot {
    SuspendedStart {
        chunk: Rc<BytecodeChunk>,
        args: Vec<JsValue>,
    },
    SuspendedYield(SuspendedFrame),
    Executing,
    Completed,
}

impl GeneratorSlot {
    fn state(&self) -> GeneratorState {
        match self {
            GeneratorSlot::SuspendedStart { .. } => GeneratorState::SuspendedStart,
            GeneratorSlot::SuspendedYield(_) => GeneratorState::SuspendedYield,
            GeneratorSlot::Executing => GeneratorState::Executing,
            GeneratorSlot::Completed => GeneratorState::Completed,
        }
    }
}

struct GeneratorData {
    name: Option<JsString>,
    slot: GeneratorSlot,
}

/// Shared handle to a generator object
#[derive(Clone)]
pub struct Generator(Rc<RefCell<GeneratorData>>);

impl CheapClone for Generator {}

impl Generator {
    /// Create a generator in `suspendedStart`; no body code runs
    pub fn new(chunk: Rc<BytecodeChunk>, args: Vec<JsValue>) -> Self {
        let name = chunk
            .function_info
            .as_ref()
            .and_then(|info| info.name.as_ref())
            .map(CheapClone::cheap_clone);
        Generator(Rc::new(RefCell::new(GeneratorData {
            name,
            slot: GeneratorSlot::SuspendedStart { chunk, args },
        })))
    }

    pub fn state(&self) -> GeneratorState {
        self.0
            .try_borrow()
            .map_or(GeneratorState::Executing, |data| data.slot.state())
    }

    /// Name of the generator function this generator was created from
    pub fn name(&self) -> Option<JsString> {
        self.0
            .try_borrow()
            .ok()
            .and_then(|data| data.name.as_ref().map(CheapClone::cheap_clone))
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Generator) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Inspect the suspended frame, if the generator is paused at a `yield`
    pub fn with_frame<R>(&self, f: impl FnOnce(&SuspendedFrame) -> R) -> Option<R> {
        let data = self.0.try_borrow().ok()?;
        match &data.slot {
            GeneratorSlot::SuspendedYield(frame) => Some(f(frame)),
            _ => None,
        }
    }

    pub fn next(&self, interp: &mut Interpreter, value: JsValue) -> Result<IterResult, JsError> {
        self.resume(interp, Completion::Normal(value))
    }

    pub fn return_(&self, interp: &mut Interpreter, value: JsValue) -> Result<IterResult, JsError> {
        self.resume(interp, Completion::Return(value))
    }

    pub fn throw(&self, interp: &mut Interpreter, value: JsValue) -> Result<IterResult, JsError> {
        self.resume(interp, Completion::Throw(value))
    }

    /// Deliver `completion` to the generator: `next`, `return` and `throw` in one entry point
    pub fn resume(
        &self,
        interp: &mut Interpreter,
        completion: Completion,
    ) -> Result<IterResult, JsError> {
        match self.state() {
            GeneratorState::Executing => return Err(JsError::generator_running()),
            GeneratorState::Completed => return completed_result(completion),
            GeneratorState::SuspendedStart | GeneratorState::SuspendedYield => {}
        }

        interp.enter_resume()?;
        let slot = self.replace_slot(GeneratorSlot::Executing);
        debug!(
            target: "genrun::generator",
            "{}: {} from {}",
            self.display_name(),
            completion,
            slot.state()
        );
        let result = self.drive(interp, slot, completion);
        interp.exit_resume();
        result
    }

    fn replace_slot(&self, slot: GeneratorSlot) -> GeneratorSlot {
        std::mem::replace(&mut self.0.borrow_mut().slot, slot)
    }

    fn display_name(&self) -> JsString {
        self.name().unwrap_or_else(|| JsString::from("<anonymous>"))
    }

    /// Run the body until it suspends or completes, handling delegation steps
    fn drive(
        &self,
        interp: &mut Interpreter,
        slot: GeneratorSlot,
        completion: Completion,
    ) -> Result<IterResult, JsError> {
        let mut outcome = match slot {
            GeneratorSlot::SuspendedStart { chunk, args } => match completion {
                // The value passed to the first next() is not observable
                Completion::Normal(_) => BytecodeVM::start(chunk, args, interp),
                // Return/Throw before the body started: complete without running it
                abrupt => VmResult::Complete(abrupt),
            },
            GeneratorSlot::SuspendedYield(mut frame) => match frame.delegation_target.take() {
                Some(target) => self.delegate(interp, frame, target, completion),
                None => BytecodeVM::resume(frame, completion, interp),
            },
            GeneratorSlot::Executing | GeneratorSlot::Completed => {
                return Err(JsError::internal_error("Generator resumed from a non-suspended state"));
            }
        };

        loop {
            outcome = match outcome {
                VmResult::Yield { value, frame } => {
                    self.replace_slot(GeneratorSlot::SuspendedYield(frame));
                    debug!(target: "genrun::generator", "{}: yielded {:?}", self.display_name(), value);
                    return Ok(IterResult::yielded(value));
                }
                VmResult::Delegate { target, frame } => {
                    self.delegate(interp, frame, target, Completion::Normal(JsValue::Undefined))
                }
                VmResult::Complete(completion) => {
                    self.replace_slot(GeneratorSlot::Completed);
                    debug!(target: "genrun::generator", "{}: completed with {}", self.display_name(), completion);
                    return match completion {
                        Completion::Throw(value) => Err(JsError::thrown(value)),
                        Completion::Normal(value) | Completion::Return(value) => {
                            Ok(IterResult::done(value))
                        }
                    };
                }
                VmResult::Error(error) => {
                    self.replace_slot(GeneratorSlot::Completed);
                    debug!(target: "genrun::generator", "{}: aborted: {}", self.display_name(), error);
                    return Err(error);
                }
            };
        }
    }

    /// Forward one resumption to the `yield*` target and turn its answer into
    /// either another suspension or a completion delivered at the `yield*` site
    fn delegate(
        &self,
        interp: &mut Interpreter,
        mut frame: SuspendedFrame,
        target: IteratorRef,
        received: Completion,
    ) -> VmResult {
        // What the inner iterator answered, and whether the event was a return
        let (answer, forwarded_return) = match received {
            Completion::Normal(value) => (target.next(interp, value), false),
            Completion::Throw(exception) => match target.throw(interp, exception) {
                Some(answer) => (answer, false),
                None => {
                    // Close the inner iterator; errors from closing are discarded
                    if let Some(Err(error)) = target.return_(interp, JsValue::Undefined) {
                        if !error.is_catchable() {
                            return VmResult::Error(error);
                        }
                    }
                    let error = JsError::delegate_missing_throw();
                    return BytecodeVM::resume(frame, Completion::Throw(error.into_value()), interp);
                }
            },
            Completion::Return(value) => match target.return_(interp, value.cheap_clone()) {
                Some(answer) => (answer, true),
                None => return BytecodeVM::resume(frame, Completion::Return(value), interp),
            },
        };

        let injected = match answer {
            Ok(result) if !result.done => {
                // Inner suspended: the outer suspends with the same value
                frame.delegation_target = Some(target);
                return VmResult::Yield {
                    value: result.value,
                    frame,
                };
            }
            Ok(result) if forwarded_return => Completion::Return(result.value),
            Ok(result) => Completion::Normal(result.value),
            Err(error) if error.is_catchable() => Completion::Throw(error.into_value()),
            Err(error) => return VmResult::Error(error),
        };
        BytecodeVM::resume(frame, injected, interp)
    }
}

/// Result of any operation on a completed generator
fn completed_result(completion: Completion) -> Result<IterResult, JsError> {
    match completion {
        Completion::Normal(_) => Ok(IterResult::done(JsValue::Undefined)),
        Completion::Return(value) => Ok(IterResult::done(value)),
        Completion::Throw(value) => Err(JsError::thrown(value)),
    }
}

impl IteratorProtocol for Generator {
    fn next(&self, interp: &mut Interpreter, value: JsValue) -> Result<IterResult, JsError> {
        Generator::next(self, interp, value)
    }

    fn return_(
        &self,
        interp: &mut Interpreter,
        value: JsValue,
    ) -> Option<Result<IterResult, JsError>> {
        Some(Generator::return_(self, interp, value))
    }

    fn throw(
        &self,
        interp: &mut Interpreter,
        value: JsValue,
    ) -> Option<Result<IterResult, JsError>> {
        Some(Generator::throw(self, interp, value))
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Generator {} <{}>]", self.display_name(), self.state())
    }
}
