//! Formula evaluator
//!
//! Tree walk over a parsed expression against one row's component
//! bindings. Referencing an absent component fails the whole expression
//! with `MissingComponent`; substituting 0 here would mask data-quality
//! holes in the source tables. Division by a zero denominator fails with
//! `DivisionByZero` rather than producing an infinity.

use super::parser::{parse_expr, BinOp, Expr, ParseError};
use crate::types::{Component, ComponentBindings};
use serde::Serialize;
use thiserror::Error;

/// A row-and-formula scoped failure. One failed cell never aborts the
/// surrounding batch; it is recorded and the next cell proceeds.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", content = "detail")]
pub enum EvalFailure {
    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),

    #[error("component {0} has no value in this row")]
    MissingComponent(Component),

    #[error("division by zero")]
    DivisionByZero,

    #[error("malformed formula: {0}")]
    Malformed(String),
}

impl EvalFailure {
    /// Excel-style marker for exports and grids.
    pub fn code(&self) -> &'static str {
        match self {
            EvalFailure::UnknownIdentifier(_) => "#NAME?",
            EvalFailure::MissingComponent(_) => "#N/A",
            EvalFailure::DivisionByZero => "#DIV/0!",
            EvalFailure::Malformed(_) => "#ERROR!",
        }
    }
}

impl From<ParseError> for EvalFailure {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::UnknownIdentifier { name } => EvalFailure::UnknownIdentifier(name),
            other => EvalFailure::Malformed(other.to_string()),
        }
    }
}

/// Evaluate a parsed expression against one row's bindings. Pure: touches
/// no shared state, so rows can be evaluated concurrently by the caller.
pub fn evaluate_ast(expr: &Expr, bindings: &ComponentBindings) -> Result<f64, EvalFailure> {
    match expr {
        Expr::Literal(n) => Ok(*n),

        Expr::Component(component) => bindings
            .get(*component)
            .ok_or(EvalFailure::MissingComponent(*component)),

        Expr::Neg(inner) => Ok(-evaluate_ast(inner, bindings)?),

        Expr::Binary { op, left, right } => {
            let left = evaluate_ast(left, bindings)?;
            let right = evaluate_ast(right, bindings)?;
            match op {
                BinOp::Add => Ok(left + right),
                BinOp::Sub => Ok(left - right),
                BinOp::Mul => Ok(left * right),
                BinOp::Div => {
                    if right == 0.0 {
                        Err(EvalFailure::DivisionByZero)
                    } else {
                        Ok(left / right)
                    }
                }
            }
        }
    }
}

/// Parse-and-evaluate convenience for one-off expressions. Parse problems
/// surface as cell failures (`UnknownIdentifier` / `Malformed`); registry
/// formulas are parsed once at insert and skip this path.
pub fn evaluate(expr: &str, bindings: &ComponentBindings) -> Result<f64, EvalFailure> {
    let ast = parse_expr(expr)?;
    evaluate_ast(&ast, bindings)
}
