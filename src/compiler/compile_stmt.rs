//! Statement compilation
//!
//! Compiles AST statements to bytecode instructions.

use super::Compiler;
use super::bytecode::{JumpTarget, Op};
use crate::ast::{IfStatement, Statement, TryStatement, WhileStatement};
use crate::error::JsError;
use crate::value::CheapClone;

impl Compiler {
    /// Compile a statement
    pub fn compile_statement(&mut self, stmt: &Statement) -> Result<(), JsError> {
        match stmt {
            Statement::Expression(expression) => {
                let dst = self.builder.alloc_register()?;
                self.compile_expression(expression, dst)?;
                // Discard the result
                self.builder.free_register(dst);
                Ok(())
            }

            Statement::Let { name, init } => {
                // The binding is not visible to its own initializer
                let reg = self.builder.alloc_register()?;
                match init {
                    Some(init) => self.compile_expression(init, reg)?,
                    None => {
                        self.builder.emit(Op::LoadUndefined { dst: reg });
                    }
                }
                self.declare(name.cheap_clone(), reg);
                Ok(())
            }

            Statement::Block(body) => self.compile_block(body),

            Statement::If(if_stmt) => self.compile_if(if_stmt),

            Statement::While(while_stmt) => self.compile_while(while_stmt),

            Statement::Break => self.add_break_jump(),

            Statement::Continue => self.add_continue_jump(),

            Statement::Return(argument) => {
                if let Some(argument) = argument {
                    let reg = self.builder.alloc_register()?;
                    self.compile_expression(argument, reg)?;
                    self.builder.emit(Op::Return { value: reg });
                    self.builder.free_register(reg);
                } else {
                    self.builder.emit(Op::ReturnUndefined);
                }
                Ok(())
            }

            Statement::Throw(argument) => {
                let reg = self.builder.alloc_register()?;
                self.compile_expression(argument, reg)?;
                self.builder.emit(Op::Throw { value: reg });
                self.builder.free_register(reg);
                Ok(())
            }

            Statement::Try(try_stmt) => self.compile_try(try_stmt),
        }
    }

    /// Compile a block with its own lexical scope
    fn compile_block(&mut self, body: &[Statement]) -> Result<(), JsError> {
        self.enter_scope();
        let result = self.compile_statements(body);
        self.exit_scope();
        result
    }

    /// Compile an if statement
    fn compile_if(&mut self, if_stmt: &IfStatement) -> Result<(), JsError> {
        // Compile test
        let test_reg = self.builder.alloc_register()?;
        self.compile_expression(&if_stmt.test, test_reg)?;

        // Jump to else/end if test is falsy
        let jump_to_else = self.builder.emit_jump_if_false(test_reg);
        self.builder.free_register(test_reg);

        self.compile_block(&if_stmt.consequent)?;

        if let Some(alternate) = &if_stmt.alternate {
            // Jump over else block
            let jump_to_end = self.builder.emit_jump();
            self.builder.patch_jump(jump_to_else);
            self.compile_block(alternate)?;
            self.builder.patch_jump(jump_to_end);
        } else {
            self.builder.patch_jump(jump_to_else);
        }

        Ok(())
    }

    /// Compile a while statement
    fn compile_while(&mut self, while_stmt: &WhileStatement) -> Result<(), JsError> {
        // Loop start (for continue)
        let loop_start = self.builder.current_offset();
        self.push_loop(loop_start);

        // Compile test
        let test_reg = self.builder.alloc_register()?;
        self.compile_expression(&while_stmt.test, test_reg)?;

        // Jump to end if test is falsy
        let jump_to_end = self.builder.emit_jump_if_false(test_reg);
        self.builder.free_register(test_reg);

        self.compile_block(&while_stmt.body)?;

        // Jump back to start
        self.builder.emit_jump_to(loop_start);
        self.builder.patch_jump(jump_to_end);

        // Pop loop context (patches break jumps)
        self.pop_loop();

        Ok(())
    }

    /// Compile a try statement
    ///
    /// Layout, with `PushTry` holding the catch and finally offsets:
    ///
    /// ```text
    ///     PushTry
    ///     <block>  PopTry  EnterFinally | Jump end
    /// catch:
    ///     GetException  <handler>  [PopTry  EnterFinally]
    /// finally:
    ///     <finalizer>  FinallyEnd
    /// end:
    /// ```
    ///
    /// When a finally exists, the VM keeps a finally-only handler installed
    /// while the catch body runs, so the catch body is one handler deeper.
    fn compile_try(&mut self, try_stmt: &TryStatement) -> Result<(), JsError> {
        if try_stmt.handler.is_none() && try_stmt.finalizer.is_none() {
            return Err(JsError::syntax_error("Missing catch or finally after try"));
        }
        let has_finally = try_stmt.finalizer.is_some();

        // Emit PushTry - targets will be patched
        let push_try_idx = self.builder.emit(Op::PushTry {
            catch_target: 0,
            finally_target: 0,
        });

        self.try_depth += 1;
        self.compile_block(&try_stmt.block)?;
        self.try_depth -= 1;

        // Pop try handler after successful completion
        self.builder.emit(Op::PopTry);
        let jump_after_try = if has_finally {
            self.builder.emit_enter_finally()
        } else {
            self.builder.emit_jump()
        };

        // Catch handler
        let catch_start = self.builder.current_offset();
        let jump_after_catch = if let Some(handler) = &try_stmt.handler {
            if has_finally {
                self.try_depth += 1;
            }

            self.enter_scope();
            let exc_reg = self.builder.alloc_register()?;
            self.builder.emit(Op::GetException { dst: exc_reg });
            if let Some(param) = &handler.param {
                self.declare(param.cheap_clone(), exc_reg);
            }
            let result = self.compile_statements(&handler.body);
            self.exit_scope();
            result?;

            if has_finally {
                self.try_depth -= 1;
                self.builder.emit(Op::PopTry);
                Some(self.builder.emit_enter_finally())
            } else {
                Some(self.builder.emit_jump())
            }
        } else {
            None
        };

        // Finally handler
        let finally_start = self.builder.current_offset();
        if let Some(finalizer) = &try_stmt.finalizer {
            self.finally_depth += 1;
            self.compile_block(finalizer)?;
            self.finally_depth -= 1;
            self.builder.emit(Op::FinallyEnd);
        }

        // End of try-catch-finally
        let end_offset = self.builder.current_offset();
        let after = if has_finally { finally_start } else { end_offset } as JumpTarget;
        self.builder.patch_jump_to(jump_after_try, after);
        if let Some(jump) = jump_after_catch {
            self.builder.patch_jump_to(jump, after);
        }

        // Patch PushTry targets
        self.builder.patch_try_targets(
            push_try_idx,
            if try_stmt.handler.is_some() {
                catch_start as JumpTarget
            } else {
                0
            },
            if has_finally {
                finally_start as JumpTarget
            } else {
                0
            },
        );

        Ok(())
    }
}
