use snapsql_core::{Diagnostic, Position};
use snapsql_ast::{ClauseKind, GraphError, StatementKind};

/// An error raised while splitting, validating, resolving, or parsing the
/// directives of a template.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// The clause is not allowed for this statement kind.
    #[error("{clause} is not valid in a {statement:?} statement")]
    InvalidClauseForStatement {
        /// Which statement kind rejected the clause.
        statement: StatementKind,
        /// The offending clause.
        clause: ClauseKind,
        /// Where the clause starts.
        pos: Position,
    },
    /// The same clause kind appeared twice.
    #[error("duplicate {0} clause")]
    DuplicateClause(ClauseKind, Position),
    /// A clause appeared after one that must come later in canonical order.
    #[error("{clause} at {pos} must come before {before_clause} at {before_pos}")]
    ClauseOrderViolation {
        /// The out-of-order clause.
        clause: ClauseKind,
        /// Its position.
        pos: Position,
        /// The earlier-ranked clause it must precede.
        before_clause: ClauseKind,
        /// That clause's position.
        before_pos: Position,
    },
    /// A clause required by this statement kind is absent.
    #[error("{statement:?} statement is missing its required {clause} clause")]
    RequiredClauseMissing {
        /// Which statement kind.
        statement: StatementKind,
        /// The missing clause.
        clause: ClauseKind,
    },
    /// A directive's nesting is unbalanced (stray `elif`/`else`/`end`, or an
    /// `if`/`for` never closed).
    #[error("unbalanced directive at {0}")]
    UnbalancedDirective(Position),
    /// The annotation text did not match any known directive form.
    #[error("unrecognized directive {0:?} at {1}")]
    UnrecognizedDirective(String, Position),
    /// The statement tree has no valid statement keyword at its start.
    #[error("expected a statement keyword at {0}")]
    ExpectedStatementKeyword(Position),
    /// A dependency-graph node referenced by name could not be resolved.
    #[error("{0} not found")]
    NodeNotFound(String),
    /// The dependency graph contains a cycle.
    #[error(transparent)]
    CircularDependency(#[from] GraphError),
}

impl ParseError {
    /// The position this error occurred at, for diagnostic rendering.
    pub fn position(&self) -> Position {
        match self {
            Self::InvalidClauseForStatement { pos, .. } => *pos,
            Self::DuplicateClause(_, pos) => *pos,
            Self::ClauseOrderViolation { pos, .. } => *pos,
            Self::RequiredClauseMissing { .. } => Position::START,
            Self::UnbalancedDirective(pos) => *pos,
            Self::UnrecognizedDirective(_, pos) => *pos,
            Self::ExpectedStatementKeyword(pos) => *pos,
            Self::NodeNotFound(_) => Position::START,
            Self::CircularDependency(_) => Position::START,
        }
    }

    /// Converts this error into a [`Diagnostic`] for accumulation by a
    /// [`snapsql_core::Collector`].
    pub fn to_diagnostic(&self) -> Diagnostic {
        let kind = match self {
            Self::InvalidClauseForStatement { .. } => "invalid_clause_for_statement",
            Self::DuplicateClause(..) => "duplicate_clause",
            Self::ClauseOrderViolation { .. } => "clause_order_violation",
            Self::RequiredClauseMissing { .. } => "required_clause_missing",
            Self::UnbalancedDirective(_) => "unbalanced_directive",
            Self::UnrecognizedDirective(..) => "unrecognized_directive",
            Self::ExpectedStatementKeyword(_) => "expected_statement_keyword",
            Self::NodeNotFound(_) => "node_not_found",
            Self::CircularDependency(_) => "circular_dependency",
        };
        let mut diagnostic = Diagnostic::error(kind, self.to_string(), self.position());
        if let Self::ClauseOrderViolation { before_clause, .. } = self {
            diagnostic = diagnostic
                .with_suggestion(format!("move this clause before {before_clause}"));
        }
        if let Self::CircularDependency(GraphError::CircularDependency { path }) = self {
            for node in path {
                diagnostic = diagnostic.with_related(node.to_string());
            }
        }
        diagnostic
    }
}
