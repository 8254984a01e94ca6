//! # snapsql-compiler
//!
//! Lowers a directive-annotated token stream into the linear instruction
//! program persisted in the IR, then optimizes it: coalescing adjacent
//! static emissions, resolving dialect-specific system directives, and
//! computing the structural/parameter variable split used for per-shape
//! caching.

#![deny(missing_docs)]
#![deny(unused_imports)]

mod emit;
mod error;
mod optimize;

pub use self::{
    emit::emit,
    error::{EmitError, OptimizeError},
    optimize::optimize,
};
