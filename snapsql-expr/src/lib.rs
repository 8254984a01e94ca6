//! # snapsql-expr
//!
//! The CEL-like expression language embedded in `/*= */` and `/*@ */`
//! directives: a hand-rolled lexer and precedence-climbing parser, a
//! schema-aware type-checker, a tree-walking evaluator, and a process-wide
//! cache so that repeated expression text across a large statement is only
//! parsed once.

#![deny(missing_docs)]
#![deny(unused_imports)]

mod ast;
mod cache;
mod error;
mod eval;
mod parser;
mod token;
mod typecheck;

pub use self::{
    ast::{BinOp, Expr, Literal, UnOp},
    cache::{clear as clear_cache, parse_cached},
    error::{ExpressionCompileError, ExpressionEvalError},
    eval::eval,
    parser::parse,
    typecheck::{check, Scope},
};
