use snapsql_core::Position;
use snapsql_lexer::Token;

use crate::clause::Clause;

/// Which kind of statement a [`Statement`] is.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StatementKind {
    /// `SELECT ...`
    Select,
    /// `INSERT INTO ...`
    InsertInto,
    /// `UPDATE ...`
    Update,
    /// `DELETE FROM ...`
    DeleteFrom,
}

/// One `name AS (...)` entry inside a `WITH` clause.
///
/// The body is kept as a raw token span on first split and only re-parsed
/// into `parsed` once the reference resolver walks it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CteDefinition {
    /// The CTE's name, as referenced by consumers.
    pub name: String,
    /// The raw tokens of the parenthesized body, excluding the parens.
    pub raw_tokens: Vec<Token>,
    /// The re-parsed inner statement, populated by the reference resolver.
    pub parsed_statement: Option<Box<Statement>>,
    /// Where `name` starts.
    pub pos: Position,
}

/// A `WITH cte1 AS (...), cte2 AS (...)` prefix.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WithClause {
    /// The CTEs, in definition order.
    pub ctes: Vec<CteDefinition>,
}

/// A single SQL statement and its clauses.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Statement {
    /// Which statement variant this is.
    pub kind: StatementKind,
    /// The optional `WITH` prefix.
    pub with: Option<WithClause>,
    /// Clauses in source order.
    pub clauses: Vec<Clause>,
}

impl Statement {
    /// Builds a statement with no `WITH` prefix.
    pub fn new(kind: StatementKind, clauses: Vec<Clause>) -> Self {
        Self { kind, with: None, clauses }
    }

    /// Returns the clause of the given kind, if present exactly once
    /// (callers rely on the validator having already rejected duplicates).
    pub fn clause(&self, kind: crate::clause::ClauseKind) -> Option<&Clause> {
        self.clauses.iter().find(|c| c.kind == kind)
    }
}
