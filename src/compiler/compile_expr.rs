//! Expression compilation
//!
//! Compiles AST expressions to bytecode instructions.

use super::Compiler;
use super::bytecode::{Op, Register};
use crate::ast::{BinaryOp, Expression, Literal, UnaryOp};
use crate::error::JsError;
use crate::value::{CheapClone, JsString};

impl Compiler {
    /// Compile an expression, placing result in the specified destination register
    pub fn compile_expression(&mut self, expr: &Expression, dst: Register) -> Result<(), JsError> {
        match expr {
            Expression::Literal(lit) => self.compile_literal(lit, dst),

            Expression::Identifier(name) => {
                if let Some(src) = self.lookup(name) {
                    if src != dst {
                        self.builder.emit(Op::Move { dst, src });
                    }
                } else {
                    let name_idx = self.builder.add_string(name.cheap_clone())?;
                    self.builder.emit(Op::GetGlobal {
                        dst,
                        name: name_idx,
                    });
                }
                Ok(())
            }

            Expression::Assign { name, value } => self.compile_assignment(name, value, dst),

            Expression::Binary {
                operator,
                left,
                right,
            } => self.compile_binary_expression(*operator, left, right, dst),

            Expression::Unary { operator, argument } => {
                let src = self.builder.alloc_register()?;
                self.compile_expression(argument, src)?;
                match operator {
                    UnaryOp::Not => self.builder.emit(Op::Not { dst, src }),
                    UnaryOp::Neg => self.builder.emit(Op::Neg { dst, src }),
                };
                self.builder.free_register(src);
                Ok(())
            }

            Expression::Object(properties) => self.compile_object_expression(properties, dst),

            Expression::Member { object, property } => {
                let obj = self.builder.alloc_register()?;
                self.compile_expression(object, obj)?;
                let key = self.builder.add_string(property.cheap_clone())?;
                self.builder.emit(Op::GetPropertyConst { dst, obj, key });
                self.builder.free_register(obj);
                Ok(())
            }

            Expression::Call { callee, arguments } => {
                self.builder.registers().save();
                let callee_reg = self.builder.alloc_register()?;
                self.compile_expression(callee, callee_reg)?;
                let (args_start, argc) = self.compile_arguments(arguments)?;
                self.builder.emit(Op::Call {
                    dst,
                    callee: callee_reg,
                    args_start,
                    argc,
                });
                self.builder.registers().restore();
                Ok(())
            }

            Expression::MethodCall {
                object,
                method,
                arguments,
            } => {
                self.builder.registers().save();
                let obj_reg = self.builder.alloc_register()?;
                self.compile_expression(object, obj_reg)?;
                let method_idx = self.builder.add_string(method.cheap_clone())?;
                let (args_start, argc) = self.compile_arguments(arguments)?;
                self.builder.emit(Op::CallMethod {
                    dst,
                    obj: obj_reg,
                    method: method_idx,
                    args_start,
                    argc,
                });
                self.builder.registers().restore();
                Ok(())
            }

            Expression::Yield(argument) => {
                let value_reg = self.builder.alloc_register()?;
                match argument {
                    Some(arg) => self.compile_expression(arg, value_reg)?,
                    None => {
                        self.builder.emit(Op::LoadUndefined { dst: value_reg });
                    }
                }
                self.builder.emit(Op::Yield {
                    dst,
                    value: value_reg,
                });
                self.builder.free_register(value_reg);
                Ok(())
            }

            Expression::YieldStar(argument) => {
                let iterable = self.builder.alloc_register()?;
                self.compile_expression(argument, iterable)?;
                self.builder.emit(Op::YieldStar { dst, iterable });
                self.builder.free_register(iterable);
                Ok(())
            }
        }
    }

    /// Compile a literal value
    fn compile_literal(&mut self, value: &Literal, dst: Register) -> Result<(), JsError> {
        match value {
            Literal::Null => {
                self.builder.emit(Op::LoadNull { dst });
            }
            Literal::Undefined => {
                self.builder.emit(Op::LoadUndefined { dst });
            }
            Literal::Boolean(b) => {
                self.builder.emit(Op::LoadBool { dst, value: *b });
            }
            Literal::Number(n) => {
                self.builder.emit_load_number(dst, *n)?;
            }
            Literal::String(s) => {
                self.builder.emit_load_string(dst, s.cheap_clone())?;
            }
        }
        Ok(())
    }

    /// Compile `name = value`; the expression evaluates to `value`
    fn compile_assignment(
        &mut self,
        name: &JsString,
        value: &Expression,
        dst: Register,
    ) -> Result<(), JsError> {
        self.compile_expression(value, dst)?;
        if let Some(local) = self.lookup(name) {
            if local != dst {
                self.builder.emit(Op::Move { dst: local, src: dst });
            }
        } else {
            let name_idx = self.builder.add_string(name.cheap_clone())?;
            self.builder.emit(Op::SetGlobal {
                name: name_idx,
                src: dst,
            });
        }
        Ok(())
    }

    fn compile_binary_expression(
        &mut self,
        operator: BinaryOp,
        left: &Expression,
        right: &Expression,
        dst: Register,
    ) -> Result<(), JsError> {
        // Compile left operand
        let left_reg = self.builder.alloc_register()?;
        self.compile_expression(left, left_reg)?;

        // Compile right operand
        let right_reg = self.builder.alloc_register()?;
        self.compile_expression(right, right_reg)?;

        let (left, right) = (left_reg, right_reg);
        let op = match operator {
            BinaryOp::Add => Op::Add { dst, left, right },
            BinaryOp::Sub => Op::Sub { dst, left, right },
            BinaryOp::Mul => Op::Mul { dst, left, right },
            BinaryOp::StrictEq => Op::StrictEq { dst, left, right },
            BinaryOp::StrictNotEq => Op::StrictNotEq { dst, left, right },
            BinaryOp::Lt => Op::Lt { dst, left, right },
            BinaryOp::LtEq => Op::LtEq { dst, left, right },
            BinaryOp::Gt => Op::Gt { dst, left, right },
            BinaryOp::GtEq => Op::GtEq { dst, left, right },
        };
        self.builder.emit(op);

        self.builder.free_register(right_reg);
        self.builder.free_register(left_reg);
        Ok(())
    }

    /// Compile an object literal; properties are set in source order
    fn compile_object_expression(
        &mut self,
        properties: &[(JsString, Expression)],
        dst: Register,
    ) -> Result<(), JsError> {
        // Build into a temporary so `dst` is only written once the object is complete
        let obj = self.builder.alloc_register()?;
        self.builder.emit(Op::CreateObject { dst: obj });
        for (key, value) in properties {
            let value_reg = self.builder.alloc_register()?;
            self.compile_expression(value, value_reg)?;
            let key = self.builder.add_string(key.cheap_clone())?;
            self.builder.emit(Op::SetPropertyConst {
                obj,
                key,
                value: value_reg,
            });
            self.builder.free_register(value_reg);
        }
        self.builder.emit(Op::Move { dst, src: obj });
        self.builder.free_register(obj);
        Ok(())
    }

    /// Compile arguments for a call into consecutive registers
    fn compile_arguments(&mut self, args: &[Expression]) -> Result<(Register, u8), JsError> {
        let argc = u8::try_from(args.len())
            .map_err(|_| JsError::syntax_error("Too many arguments"))?;

        if argc == 0 {
            return Ok((0, 0));
        }

        let args_start = self.builder.reserve_registers(argc)?;
        for (i, arg) in (0u8..).zip(args) {
            self.compile_expression(arg, args_start + i)?;
        }

        Ok((args_start, argc))
    }
}
