use snapsql_core::ParamType;
use snapsql_expr::ExpressionEvalError;
use thiserror::Error;

/// One declared-but-absent required parameter, as reported by
/// [`MissingRequiredParametersError`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MissingParam {
    /// The parameter's name.
    pub name: String,
    /// Its declared type.
    pub declared_type: ParamType,
}

/// Every non-optional, non-implicit parameter absent from the input map,
/// in sorted (name) order (§4.10). Aggregated rather than reported one at
/// a time.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("missing required parameters: {}", self.names())]
pub struct MissingRequiredParametersError {
    /// The missing parameters, sorted by name.
    pub missing: Vec<MissingParam>,
}

impl MissingRequiredParametersError {
    fn names(&self) -> String {
        self.missing.iter().map(|p| p.name.as_str()).collect::<Vec<_>>().join(", ")
    }
}

/// A failure surfaced by the runtime VM, the parameter validator, or the
/// dangerous-query guard (§4.9–§4.11).
///
/// Runtime errors are never accumulated: the first one aborts evaluation
/// and propagates immediately (§7).
#[derive(Debug, Error)]
pub enum RuntimeError<E: std::error::Error + 'static> {
    /// A required parameter was absent from the input map.
    #[error(transparent)]
    MissingRequiredParameters(#[from] MissingRequiredParametersError),
    /// An expression failed to evaluate (unbound variable, bad operand,
    /// division by zero, …).
    #[error(transparent)]
    Expression(#[from] ExpressionEvalError),
    /// The generated SQL was an `UPDATE`/`DELETE` without a `WHERE` clause
    /// and `execute_dangerous_query` was not set.
    #[error("refusing to execute without a WHERE clause: {sql}")]
    DangerousQuery {
        /// The generated SQL that was rejected.
        sql: String,
    },
    /// The collaborator's query/exec call failed.
    #[error("query execution failed: {0}")]
    QueryExecution(#[source] E),
    /// The execution context's deadline elapsed before dispatch.
    #[error("execution cancelled")]
    Cancelled,
}
