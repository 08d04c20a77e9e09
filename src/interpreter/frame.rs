//! Suspended frames
//!
//! A frame is the complete paused state of a generator body. The VM consumes
//! a frame when it resumes and produces a new one at the next suspension.

use std::rc::Rc;

use super::iterator::IteratorRef;
use crate::compiler::{BytecodeChunk, JumpTarget, Register};
use crate::value::JsValue;

/// Where execution continues, and which register receives the resumption value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumePoint {
    pub ip: usize,
    pub register: Register,
}

/// An enclosing `try` block that has not been exited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TryHandler {
    /// Catch block offset (0 if none)
    pub catch_ip: usize,
    /// Finally block offset (0 if none)
    pub finally_ip: usize,
    /// Pending completions below this handler; a dispatch truncates back to it
    pub completion_depth: usize,
}

impl TryHandler {
    pub fn has_finally(&self) -> bool {
        self.finally_ip != 0
    }
}

/// What a running finally body resumes when it reaches its end
#[derive(Debug, Clone, PartialEq)]
pub enum PendingCompletion {
    /// Entered by falling off the end of the try or catch block
    Normal,
    Return(JsValue),
    Throw(JsValue),
    /// Leaving a loop to `target`; handlers down to `try_depth` still need unwinding
    Break {
        target: JumpTarget,
        try_depth: u8,
        finally_depth: u8,
    },
}

/// A generator body paused at a `yield` or inside `yield*`
#[derive(Debug)]
pub struct SuspendedFrame {
    pub chunk: Rc<BytecodeChunk>,
    pub resume_point: ResumePoint,
    /// The register file: parameters, `let` bindings and temporaries
    pub lexical_state: Vec<JsValue>,
    /// Handler stack, outermost first
    pub handlers: Vec<TryHandler>,
    /// One entry per finally body currently running, outermost first
    pub completions: Vec<PendingCompletion>,
    /// Exception being handled by the current catch block
    pub exception: Option<JsValue>,
    /// Inner iterator while suspended inside `yield*`
    pub delegation_target: Option<IteratorRef>,
}

impl SuspendedFrame {
    /// Finally blocks that an abrupt completion would run, innermost first
    pub fn pending_finalizers(&self) -> impl Iterator<Item = &TryHandler> {
        self.handlers.iter().rev().filter(|h| h.has_finally())
    }

    pub fn is_delegating(&self) -> bool {
        self.delegation_target.is_some()
    }
}
