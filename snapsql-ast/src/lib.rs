//! # snapsql-ast
//!
//! The data model shared by every stage downstream of the tokenizer: clause
//! and statement trees, table references, the dependency graph, the
//! instruction set, and the persisted intermediate representation.

#![deny(missing_docs)]
#![deny(unused_imports)]

mod clause;
mod graph;
mod instruction;
mod ir;
mod param;
mod statement;
mod table;

pub use self::{
    clause::{Clause, ClauseKind},
    graph::{DependencyGraph, DependencyNode, GraphError, NodeId, NodeKind},
    instruction::Instruction,
    ir::{DependencyMetadata, ExpressionTableEntry, Ir, IrMetadata, SourceInfo, SCHEMA_URL},
    param::{ImplicitParameter, ParameterEntry, ParameterSchema},
    statement::{CteDefinition, Statement, StatementKind, WithClause},
    table::{DerivedSourceType, DerivedTableInfo, TableOrigin, TableReference},
};
