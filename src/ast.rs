//! Abstract syntax tree for generator bodies
//!
//! There is no parser: hosts build bodies with the constructors below and hand
//! them to [`Interpreter::define_generator`](crate::Interpreter::define_generator).
//!
//! ```
//! use genrun::ast::{Expression, GeneratorFunction, Statement};
//!
//! // function* foo() { yield 2; yield 3; yield 4 }
//! let foo = GeneratorFunction::new("foo", &[], vec![
//!     Statement::expr(Expression::yield_(Expression::number(2.0))),
//!     Statement::expr(Expression::yield_(Expression::number(3.0))),
//!     Statement::expr(Expression::yield_(Expression::number(4.0))),
//! ]);
//! assert_eq!(foo.body.len(), 3);
//! ```

use crate::value::JsString;

/// A `function*` declaration
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorFunction {
    pub name: Option<JsString>,
    pub params: Vec<JsString>,
    pub body: Vec<Statement>,
}

impl GeneratorFunction {
    pub fn new(name: &str, params: &[&str], body: Vec<Statement>) -> Self {
        Self {
            name: Some(JsString::from(name)),
            params: params.iter().map(|p| JsString::from(*p)).collect(),
            body,
        }
    }

    /// A `function*` expression without a name
    pub fn anonymous(params: &[&str], body: Vec<Statement>) -> Self {
        Self {
            name: None,
            params: params.iter().map(|p| JsString::from(*p)).collect(),
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Expression(Expression),
    /// `let name = init;`
    Let {
        name: JsString,
        init: Option<Expression>,
    },
    Block(Vec<Statement>),
    If(IfStatement),
    While(WhileStatement),
    Break,
    Continue,
    Return(Option<Expression>),
    Throw(Expression),
    Try(TryStatement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub test: Expression,
    pub consequent: Vec<Statement>,
    pub alternate: Option<Vec<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    pub test: Expression,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryStatement {
    pub block: Vec<Statement>,
    pub handler: Option<CatchClause>,
    pub finalizer: Option<Vec<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub param: Option<JsString>,
    pub body: Vec<Statement>,
}

impl Statement {
    pub fn expr(expression: Expression) -> Self {
        Statement::Expression(expression)
    }

    pub fn let_(name: &str, init: Expression) -> Self {
        Statement::Let {
            name: JsString::from(name),
            init: Some(init),
        }
    }

    pub fn return_(argument: Expression) -> Self {
        Statement::Return(Some(argument))
    }

    pub fn throw(argument: Expression) -> Self {
        Statement::Throw(argument)
    }

    pub fn if_else(
        test: Expression,
        consequent: Vec<Statement>,
        alternate: Option<Vec<Statement>>,
    ) -> Self {
        Statement::If(IfStatement {
            test,
            consequent,
            alternate,
        })
    }

    pub fn while_(test: Expression, body: Vec<Statement>) -> Self {
        Statement::While(WhileStatement { test, body })
    }

    /// `try { block } finally { finalizer }`
    pub fn try_finally(block: Vec<Statement>, finalizer: Vec<Statement>) -> Self {
        Statement::Try(TryStatement {
            block,
            handler: None,
            finalizer: Some(finalizer),
        })
    }

    /// `try { block } catch (param) { body }`
    pub fn try_catch(block: Vec<Statement>, param: Option<&str>, body: Vec<Statement>) -> Self {
        Statement::Try(TryStatement {
            block,
            handler: Some(CatchClause {
                param: param.map(JsString::from),
                body,
            }),
            finalizer: None,
        })
    }

    /// `try { block } catch (param) { body } finally { finalizer }`
    pub fn try_catch_finally(
        block: Vec<Statement>,
        param: Option<&str>,
        body: Vec<Statement>,
        finalizer: Vec<Statement>,
    ) -> Self {
        Statement::Try(TryStatement {
            block,
            handler: Some(CatchClause {
                param: param.map(JsString::from),
                body,
            }),
            finalizer: Some(finalizer),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    Identifier(JsString),
    /// `name = value`, evaluates to `value`
    Assign {
        name: JsString,
        value: Box<Expression>,
    },
    Binary {
        operator: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Unary {
        operator: UnaryOp,
        argument: Box<Expression>,
    },
    /// `{ key: value, ... }`
    Object(Vec<(JsString, Expression)>),
    /// `object.property`
    Member {
        object: Box<Expression>,
        property: JsString,
    },
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
    /// `object.method(arguments)`
    MethodCall {
        object: Box<Expression>,
        method: JsString,
        arguments: Vec<Expression>,
    },
    /// `yield argument`
    Yield(Option<Box<Expression>>),
    /// `yield* argument`
    YieldStar(Box<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

impl Expression {
    pub fn undefined() -> Self {
        Expression::Literal(Literal::Undefined)
    }

    pub fn null() -> Self {
        Expression::Literal(Literal::Null)
    }

    pub fn boolean(value: bool) -> Self {
        Expression::Literal(Literal::Boolean(value))
    }

    pub fn number(value: f64) -> Self {
        Expression::Literal(Literal::Number(value))
    }

    pub fn string(value: &str) -> Self {
        Expression::Literal(Literal::String(JsString::from(value)))
    }

    pub fn ident(name: &str) -> Self {
        Expression::Identifier(JsString::from(name))
    }

    pub fn assign(name: &str, value: Expression) -> Self {
        Expression::Assign {
            name: JsString::from(name),
            value: Box::new(value),
        }
    }

    pub fn binary(operator: BinaryOp, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(argument: Expression) -> Self {
        Expression::Unary {
            operator: UnaryOp::Not,
            argument: Box::new(argument),
        }
    }

    pub fn neg(argument: Expression) -> Self {
        Expression::Unary {
            operator: UnaryOp::Neg,
            argument: Box::new(argument),
        }
    }

    pub fn object(properties: Vec<(&str, Expression)>) -> Self {
        Expression::Object(
            properties
                .into_iter()
                .map(|(key, value)| (JsString::from(key), value))
                .collect(),
        )
    }

    pub fn member(object: Expression, property: &str) -> Self {
        Expression::Member {
            object: Box::new(object),
            property: JsString::from(property),
        }
    }

    pub fn call(callee: Expression, arguments: Vec<Expression>) -> Self {
        Expression::Call {
            callee: Box::new(callee),
            arguments,
        }
    }

    pub fn method(object: Expression, method: &str, arguments: Vec<Expression>) -> Self {
        Expression::MethodCall {
            object: Box::new(object),
            method: JsString::from(method),
            arguments,
        }
    }

    pub fn yield_(argument: Expression) -> Self {
        Expression::Yield(Some(Box::new(argument)))
    }

    /// Bare `yield`, yielding `undefined`
    pub fn yield_empty() -> Self {
        Expression::Yield(None)
    }

    pub fn yield_star(argument: Expression) -> Self {
        Expression::YieldStar(Box::new(argument))
    }
}
