use snapsql_core::{ParamType, Position};
use snapsql_expr::ExpressionCompileError;
use thiserror::Error;

/// A failure while lowering a directive-annotated token stream into
/// instructions.
#[derive(Debug, Error)]
pub enum EmitError {
    /// An expression embedded in a directive failed to parse or
    /// type-check.
    #[error(transparent)]
    Expression(#[from] ExpressionCompileError),
    /// An `IF`/`ELSE_IF` condition did not type-check to `bool`.
    #[error("`{expr}` at {pos}: condition must be bool, found {ty}")]
    ConditionNotBoolean {
        /// The condition's source text.
        expr: String,
        /// Its inferred type.
        ty: ParamType,
        /// Source position.
        pos: Position,
    },
    /// A `FOR` collection expression did not type-check to an array.
    #[error("`{expr}` at {pos}: loop collection must be an array, found {ty}")]
    CollectionNotArray {
        /// The collection's source text.
        expr: String,
        /// Its inferred type.
        ty: ParamType,
        /// Source position.
        pos: Position,
    },
    /// An `EMIT_EVAL`/`EMIT_PARAM` value is not representable as a scalar
    /// bind parameter.
    #[error("`{expr}` at {pos}: {ty} cannot be bound as a scalar parameter")]
    NotBindableScalar {
        /// The expression's source text.
        expr: String,
        /// Its inferred type.
        ty: ParamType,
        /// Source position.
        pos: Position,
    },
    /// `/*# const NAME */` referenced a name absent from the parameter
    /// schema.
    #[error("`/*# const {name} */` at {pos}: not declared in the parameter schema")]
    UndeclaredConst {
        /// The constant's name.
        name: String,
        /// Source position.
        pos: Position,
    },
}

/// A failure while optimizing an already-emitted instruction stream.
#[derive(Debug, Error)]
pub enum OptimizeError {
    /// A structural expression referenced by `IF`/`FOR`/`const` could not
    /// be re-parsed while computing dependency metadata — unreachable in
    /// practice since the emitter already parsed it once, but surfaced
    /// rather than panicking if the expression table is ever hand-built.
    #[error("structural expression `{0}` does not parse")]
    UnparsableStructuralExpression(String),
}
