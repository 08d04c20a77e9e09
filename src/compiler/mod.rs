//! Bytecode compiler for generator bodies
//!
//! This module compiles the body AST to bytecode for execution by the bytecode VM.
//! Every register lives in the suspended frame, so locals survive a `yield`
//! without any capture analysis.

mod builder;
mod bytecode;
mod compile_expr;
mod compile_stmt;

pub use builder::{BytecodeBuilder, JumpPlaceholder, RegisterAllocator};
pub use bytecode::{
    BytecodeChunk, Constant, ConstantIndex, FunctionInfo, JumpTarget, Op, Register,
};

use crate::ast::GeneratorFunction;
use crate::error::JsError;
use crate::value::{CheapClone, JsString};
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Compiler state for converting a generator body to bytecode
pub struct Compiler {
    /// Current bytecode builder
    builder: BytecodeBuilder,

    /// Loop context stack for break/continue
    loop_stack: Vec<LoopContext>,

    /// Lexical scopes, innermost last; each maps a binding to its register
    scopes: Vec<FxHashMap<JsString, Register>>,

    /// Number of try handlers active at runtime at the current position
    try_depth: u8,

    /// Number of finally bodies enclosing the current position
    finally_depth: u8,
}

/// Context for a loop (for break/continue handling)
struct LoopContext {
    /// Jump placeholders for break statements
    break_jumps: Vec<JumpPlaceholder>,
    /// Target instruction for continue
    continue_target: usize,
    /// Handler depth at the loop statement
    try_depth: u8,
    /// Finally depth at the loop statement
    finally_depth: u8,
}

impl Compiler {
    fn new(info: FunctionInfo) -> Self {
        Self {
            builder: BytecodeBuilder::for_function(info),
            loop_stack: Vec::new(),
            scopes: Vec::new(),
            try_depth: 0,
            finally_depth: 0,
        }
    }

    /// Compile a generator function body to bytecode.
    ///
    /// Parameters occupy registers `0..params.len()`.
    pub fn compile_generator(func: &GeneratorFunction) -> Result<Rc<BytecodeChunk>, JsError> {
        let mut compiler = Compiler::new(FunctionInfo {
            name: func.name.as_ref().map(CheapClone::cheap_clone),
            param_count: func.params.len(),
        });

        compiler.enter_scope();
        for param in &func.params {
            let reg = compiler.builder.alloc_register()?;
            compiler.declare(param.cheap_clone(), reg);
        }
        compiler.compile_statements(&func.body)?;
        compiler.exit_scope();

        // Falling off the end returns undefined
        compiler.builder.emit(Op::ReturnUndefined);
        Ok(Rc::new(compiler.builder.finish()))
    }

    /// Compile a sequence of statements
    fn compile_statements(&mut self, statements: &[crate::ast::Statement]) -> Result<(), JsError> {
        for stmt in statements {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    fn enter_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
        self.builder.registers().save();
    }

    /// Leave a scope; its binding registers become reusable
    fn exit_scope(&mut self) {
        self.scopes.pop();
        self.builder.registers().restore();
    }

    fn declare(&mut self, name: JsString, reg: Register) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, reg);
        }
    }

    /// Resolve a local binding, innermost scope first
    fn lookup(&self, name: &JsString) -> Option<Register> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    /// Push a loop context whose continue target is `continue_target`
    fn push_loop(&mut self, continue_target: usize) {
        self.loop_stack.push(LoopContext {
            break_jumps: Vec::new(),
            continue_target,
            try_depth: self.try_depth,
            finally_depth: self.finally_depth,
        });
    }

    /// Pop a loop context and patch break jumps
    fn pop_loop(&mut self) {
        if let Some(ctx) = self.loop_stack.pop() {
            // Patch all break jumps to current position
            for jump in ctx.break_jumps {
                self.builder.patch_jump(jump);
            }
        }
    }

    /// Emit the jump for a `break` or `continue`.
    ///
    /// A plain jump suffices when no handler or finally body lies between
    /// here and the loop; otherwise `Break` unwinds through them at runtime.
    fn emit_loop_exit(&mut self, ctx_try: u8, ctx_finally: u8) -> JumpPlaceholder {
        if ctx_try == self.try_depth && ctx_finally == self.finally_depth {
            self.builder.emit_jump()
        } else {
            self.builder.emit_break(ctx_try, ctx_finally)
        }
    }

    /// Add a break jump for the innermost loop
    fn add_break_jump(&mut self) -> Result<(), JsError> {
        let (ctx_try, ctx_finally) = self
            .loop_stack
            .last()
            .map(|ctx| (ctx.try_depth, ctx.finally_depth))
            .ok_or_else(|| JsError::syntax_error("Illegal break statement"))?;

        let jump = self.emit_loop_exit(ctx_try, ctx_finally);
        if let Some(ctx) = self.loop_stack.last_mut() {
            ctx.break_jumps.push(jump);
        }
        Ok(())
    }

    /// Add a continue jump for the innermost loop
    fn add_continue_jump(&mut self) -> Result<(), JsError> {
        let (target, ctx_try, ctx_finally) = self
            .loop_stack
            .last()
            .map(|ctx| (ctx.continue_target, ctx.try_depth, ctx.finally_depth))
            .ok_or_else(|| {
                JsError::syntax_error("Illegal continue statement: no surrounding iteration statement")
            })?;

        let jump = self.emit_loop_exit(ctx_try, ctx_finally);
        self.builder.patch_jump_to(jump, target as JumpTarget);
        Ok(())
    }
}
