use snapsql_core::Diagnostic;
use thiserror::Error;

/// The stage-specific failure that stopped a [`crate::compile`] pass.
#[derive(Debug, Error)]
pub enum CompileErrorKind {
    /// The template source could not be tokenized.
    #[error(transparent)]
    Tokenize(#[from] snapsql_lexer::TokenizeError),
    /// Clause splitting, validation, or reference resolution failed in a
    /// way that makes continuing unsafe (a malformed statement or a
    /// dependency cycle).
    #[error(transparent)]
    Parse(#[from] snapsql_parser::ParseError),
    /// Lowering the directive overlay into instructions failed.
    #[error(transparent)]
    Emit(#[from] snapsql_compiler::EmitError),
    /// Computing dependency metadata over the emitted instructions failed.
    #[error(transparent)]
    Optimize(#[from] snapsql_compiler::OptimizeError),
    /// The clause validator or reference resolver recorded at least one
    /// error-severity diagnostic (e.g. a required clause missing, clauses
    /// out of canonical order); `to_diagnostic` reproduces the first one.
    #[error("{}", .0.message)]
    Validation(Diagnostic),
}

impl From<Diagnostic> for CompileErrorKind {
    fn from(diagnostic: Diagnostic) -> Self {
        Self::Validation(diagnostic)
    }
}

/// The first fatal error a compile pass hit, together with every
/// diagnostic (errors and warnings alike) the pipeline had already
/// accumulated before it gave up.
///
/// Non-fatal findings on a *successful* compile are reported separately,
/// through [`crate::CompileOutcome::warnings`]; this type only exists on
/// the failure path.
#[derive(Debug, Error)]
#[error("{fatal}")]
pub struct CompileError {
    /// The error that stopped the pipeline.
    pub fatal: CompileErrorKind,
    /// Every diagnostic recorded before `fatal` was hit, `fatal` itself
    /// included when it has a diagnostic form.
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileError {
    pub(crate) fn new(fatal: impl Into<CompileErrorKind>, diagnostics: &snapsql_core::Collector) -> Self {
        Self { fatal: fatal.into(), diagnostics: diagnostics.diagnostics().to_vec() }
    }
}
