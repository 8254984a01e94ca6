//! # snapsql-runtime
//!
//! Evaluates a compiled [`snapsql_ast::Ir`] against a parameter map: a
//! stack-machine VM materializes SQL text and bind arguments, a validator
//! enforces required parameters up front, and a dangerous-query guard runs
//! before anything reaches a database. The `Queryer`/`Catalog`/`Clock`
//! traits are the only seam to an actual driver — this crate never links
//! one in.

#![deny(missing_docs)]
#![deny(unused_imports)]

mod collaborators;
mod error;
mod exec;
mod guard;
mod postprocess;
mod validate;
mod vm;

pub use self::{
    collaborators::{Catalog, Clock, Column, ExecOutcome, ExecutionContext, Queryer, Table},
    error::{MissingParam, MissingRequiredParametersError, RuntimeError},
    exec::{execute, ExecutionOutcome},
    postprocess::{convert_placeholders, RuntimeOptions},
    validate::validate,
    vm::run as run_vm,
};
