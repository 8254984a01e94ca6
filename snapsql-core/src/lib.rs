//! # snapsql-core
//!
//! Shared primitives used by every stage of the SnapSQL pipeline: the
//! target-dialect tag, source positions, and the closed set of runtime
//! values a template may bind as a prepared-statement argument.

#![deny(missing_docs)]
#![deny(unused_imports)]

mod dialect;
mod diagnostics;
mod position;
mod value;

pub use self::{
    dialect::{Dialect, DialectParseError},
    diagnostics::{Collector, Diagnostic, Severity},
    position::Position,
    value::{ParamType, Value},
};
