use snapsql_core::{Diagnostic, ParamType};
use thiserror::Error;

/// A failure while lexing, parsing, or type-checking an expression.
#[derive(Debug, Error)]
pub enum ExpressionCompileError {
    /// The lexer rejected the source text.
    #[error("in `{expr}`: {reason}")]
    Lex {
        /// The offending expression text.
        expr: String,
        /// The lexer's message.
        reason: String,
    },
    /// The token stream does not form a valid expression.
    #[error("in `{expr}`: {reason}")]
    Syntax {
        /// The offending expression text.
        expr: String,
        /// What was expected and what was found.
        reason: String,
    },
    /// A variable was referenced that is neither a declared parameter, an
    /// implicit parameter, nor a loop variable in scope.
    #[error("in `{expr}`: undeclared variable `{name}`")]
    UndeclaredVariable {
        /// The offending expression text.
        expr: String,
        /// The undeclared name.
        name: String,
    },
    /// An operator was applied to operand types it does not accept.
    #[error("in `{expr}`: `{op}` does not accept {lhs}{}", rhs.as_ref().map(|t| format!(" and {t}")).unwrap_or_default())]
    TypeMismatch {
        /// The offending expression text.
        expr: String,
        /// The operator or position (e.g. `if condition`, `+`).
        op: String,
        /// The left (or only) operand's type.
        lhs: ParamType,
        /// The right operand's type, when the operator is binary.
        rhs: Option<ParamType>,
    },
    /// A field or index was accessed on a value that does not have one.
    #[error("in `{expr}`: `{base}` has no member `{member}`")]
    NoSuchMember {
        /// The offending expression text.
        expr: String,
        /// The base value's type.
        base: ParamType,
        /// The member that was looked up.
        member: String,
    },
    /// A built-in function was called with the wrong arity or operand types.
    #[error("in `{expr}`: bad call to `{name}`: {reason}")]
    BadCall {
        /// The offending expression text.
        expr: String,
        /// The function name.
        name: String,
        /// What was wrong.
        reason: String,
    },
}

impl ExpressionCompileError {
    /// Converts this error into a [`Diagnostic`]; the caller supplies the
    /// source [`snapsql_core::Position`] of the directive that embeds the
    /// expression, since the expression's own lexer/parser do not track
    /// positions within the (typically short) expression text.
    pub fn to_diagnostic(&self, pos: snapsql_core::Position) -> Diagnostic {
        Diagnostic::error("expression", self.to_string(), pos)
    }
}

/// A failure while evaluating an already type-checked expression at
/// runtime. Distinct from [`ExpressionCompileError`] because it can only
/// arise from values the type-checker could not see (e.g. a `Json` value
/// whose shape is unknown until runtime).
#[derive(Debug, Error)]
pub enum ExpressionEvalError {
    /// A variable referenced by the compiled expression was not supplied in
    /// the evaluation environment.
    #[error("variable `{0}` was not bound")]
    UnboundVariable(String),
    /// An operator was applied to runtime values it does not accept.
    #[error("`{op}` does not accept the supplied operand(s)")]
    InvalidOperand {
        /// The operator.
        op: String,
    },
    /// A field or index was accessed on a value that does not support it.
    #[error("cannot index into a {0} value")]
    NotIndexable(&'static str),
    /// A built-in function received the wrong number or type of arguments.
    #[error("bad call to `{name}`: {reason}")]
    BadCall {
        /// The function name.
        name: String,
        /// What was wrong.
        reason: String,
    },
    /// Re-parsing an expression table entry at runtime failed — unreachable
    /// in practice since the emitter already parsed it once at compile
    /// time, but surfaced rather than panicking.
    #[error("structural expression does not parse: {0}")]
    Reparse(String),
}
