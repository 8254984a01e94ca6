//! # snapsql
//!
//! The public entry point of the SnapSQL template compiler: tokenizes a
//! template, runs the clause validator and reference resolver, lowers its
//! directive overlay into the linear instruction program, optimizes it,
//! and assembles the persisted IR. A thin `execute` wrapper hands a
//! compiled IR to [`snapsql_runtime::execute`] against a caller-supplied
//! [`snapsql_runtime::Queryer`].
//!
//! Parsing a template's own parameter schema out of Markdown front matter
//! or a `.snap.sql` header is outside this crate: callers supply the
//! schema already extracted, and `compile` only ever sees SQL template
//! text plus that schema.

#![deny(missing_docs)]
#![deny(unused_imports)]

mod error;

pub use self::error::{CompileError, CompileErrorKind};

use sha2::{Digest, Sha256};

use snapsql_ast::{ImplicitParameter, Ir, IrMetadata, ParameterSchema, SourceInfo, SCHEMA_URL};
use snapsql_core::{Collector, Dialect, Diagnostic};
use snapsql_expr::Scope;
use snapsql_lexer::Lexer;
use snapsql_runtime::Clock;

/// The template text plus the parameter schema it was declared against.
/// Assembled by the caller from whatever file format embeds them; this
/// crate never reads that format itself.
#[derive(Clone, Debug)]
pub struct TemplateInput {
    /// The function name this template is registered under.
    pub function_name: String,
    /// An optional human-readable description, carried into the IR as-is.
    pub description: Option<String>,
    /// The SQL template source, directives and all.
    pub source: String,
    /// The originating file path, if any, carried into the IR for
    /// diagnostics and cache bookkeeping.
    pub file: Option<String>,
    /// The caller-declared parameter schema.
    pub parameters: ParameterSchema,
    /// Parameters supplied by runtime context rather than the caller.
    pub implicit_parameters: Vec<ImplicitParameter>,
}

/// A successfully compiled template: the IR plus any non-fatal findings
/// the validator or resolver turned up along the way.
#[derive(Debug)]
pub struct CompileOutcome {
    /// The compiled, persistable IR.
    pub ir: Ir,
    diagnostics: Collector,
}

impl CompileOutcome {
    /// Non-fatal diagnostics recorded while compiling. A successful
    /// compile can still carry warnings (e.g. from a future validator
    /// rule); none exist yet in this pipeline, but callers should not
    /// assume the list is always empty.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.warnings()
    }
}

/// Tokenizes, validates, resolves, lowers, and optimizes `input`, producing
/// a persistable [`Ir`].
///
/// `dialect` lets the optimizer resolve dialect-specific system directives
/// at compile time; pass `None` to leave that resolution to the runtime.
/// `clock` stamps `metadata.generated_at`.
///
/// Returns the first fatal error the pipeline hit, wrapped together with
/// every diagnostic accumulated up to that point (§7). A clean compile
/// still exposes any non-fatal diagnostics through
/// [`CompileOutcome::warnings`].
pub fn compile(input: &TemplateInput, dialect: Option<Dialect>, clock: &dyn Clock) -> Result<CompileOutcome, CompileError> {
    let _span = tracing::debug_span!("compile", function = %input.function_name).entered();
    let mut collector = Collector::default();

    let tokens = Lexer::new(&input.source)
        .tokenize()
        .map_err(|e| CompileError::new(e, &collector))?;

    let (_statement, _resolved) = snapsql_parser::parse(tokens.clone(), &mut collector).map_err(|e| {
        collector.push(e.to_diagnostic());
        CompileError::new(e, &collector)
    })?;

    // `parse` only raises `Err` for the class of failure that makes
    // further analysis unsafe; ordinary clause violations (duplicate
    // clause, bad order, a required clause missing) are recorded as
    // error-severity diagnostics instead, so they must be checked
    // explicitly before treating the template as compilable.
    if let Some(first_error) = collector.errors().next().cloned() {
        return Err(CompileError::new(first_error, &collector));
    }

    let events = snapsql_parser::parse_directives(&tokens).map_err(|e| {
        collector.push(e.to_diagnostic());
        CompileError::new(e, &collector)
    })?;

    let scope = Scope::new(&input.parameters, &input.implicit_parameters);
    let (instructions, expr_table, const_names) =
        snapsql_compiler::emit(&events, &scope).map_err(|e| CompileError::new(e, &collector))?;

    let (instructions, dependencies) = snapsql_compiler::optimize(instructions, &expr_table, &const_names, dialect)
        .map_err(|e| CompileError::new(e, &collector))?;

    let ir = Ir {
        source: SourceInfo { file: input.file.clone(), content: input.source.clone(), hash: source_hash(&input.source) },
        function_name: input.function_name.clone(),
        description: input.description.clone(),
        parameters: input.parameters.entries.clone(),
        implicit_parameters: input.implicit_parameters.clone(),
        cel_expressions: expr_table,
        instructions,
        dependencies,
        metadata: IrMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: clock.now().to_rfc3339(),
            generator: "snapsql".to_string(),
            schema_url: SCHEMA_URL.to_string(),
        },
    };

    Ok(CompileOutcome { ir, diagnostics: collector })
}

/// Lowercase hex SHA-256 of `source`, embedded in [`SourceInfo::hash`] and
/// used by callers to invalidate a cached IR when the template changes.
fn source_hash(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Serializes `ir` to its canonical JSON form (§3's Intermediate Format).
pub fn to_json(ir: &Ir) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(ir)
}

/// Parses an IR previously produced by [`to_json`] (or an equivalent
/// generator conforming to the same schema).
pub fn from_json(json: &str) -> Result<Ir, serde_json::Error> {
    serde_json::from_str(json)
}

/// Re-validates parameters, evaluates `ir` to SQL text and bind arguments,
/// runs the dangerous-query guard, and dispatches to `queryer` — a thin
/// pass-through to [`snapsql_runtime::execute`] so callers that only need
/// `compile`+`execute` don't have to depend on `snapsql-runtime` directly.
pub fn execute<Q: snapsql_runtime::Queryer>(
    ir: &Ir,
    params: &std::collections::HashMap<String, snapsql_core::Value>,
    dialect: Dialect,
    options: &snapsql_runtime::RuntimeOptions,
    queryer: &Q,
) -> Result<snapsql_runtime::ExecutionOutcome<Q::Row>, snapsql_runtime::RuntimeError<Q::Error>> {
    snapsql_runtime::execute(ir, params, dialect, options, queryer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapsql_ast::ParameterEntry;
    use snapsql_core::ParamType;

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> chrono::DateTime<chrono::Utc> {
            chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&chrono::Utc)
        }
    }

    fn input(source: &str, parameters: Vec<ParameterEntry>) -> TemplateInput {
        TemplateInput {
            function_name: "get_user".to_string(),
            description: None,
            source: source.to_string(),
            file: None,
            parameters: ParameterSchema { entries: parameters },
            implicit_parameters: vec![],
        }
    }

    #[test]
    fn compiles_a_static_select() {
        let out = compile(&input("SELECT id FROM users", vec![]), None, &FixedClock).unwrap();
        assert_eq!(out.ir.function_name, "get_user");
        assert_eq!(out.ir.metadata.generated_at, "2024-01-01T00:00:00+00:00");
        assert_eq!(out.warnings().count(), 0);
        assert!(!out.ir.source.hash.is_empty());
    }

    #[test]
    fn compiles_a_conditional_where_clause() {
        let source = "SELECT id FROM users WHERE /*# if active */active = /*= active */true/*# end */";
        let params = vec![ParameterEntry { name: "active".to_string(), ty: ParamType::Bool, description: None, optional: false, default: None }];
        let out = compile(&input(source, params), None, &FixedClock).unwrap();
        assert!(out.ir.instructions.iter().any(|i| matches!(i, snapsql_ast::Instruction::If { .. })));
    }

    #[test]
    fn rejects_clauses_out_of_canonical_order() {
        let err = compile(&input("SELECT id FROM users LIMIT 10 WHERE x = 1", vec![]), None, &FixedClock).unwrap_err();
        assert!(matches!(err.fatal, CompileErrorKind::Validation(_)));
        assert!(err.diagnostics.iter().any(|d| d.kind == "clause_order_violation"));
    }

    #[test]
    fn rejects_a_statement_with_no_leading_keyword() {
        let err = compile(&input("42", vec![]), None, &FixedClock).unwrap_err();
        assert!(matches!(err.fatal, CompileErrorKind::Parse(_)));
    }

    #[test]
    fn round_trips_through_json() {
        let out = compile(&input("SELECT id FROM users", vec![]), None, &FixedClock).unwrap();
        let json = to_json(&out.ir).unwrap();
        let ir = from_json(&json).unwrap();
        assert_eq!(ir, out.ir);
    }

    #[test]
    fn source_hash_changes_with_content() {
        let a = compile(&input("SELECT 1", vec![]), None, &FixedClock).unwrap();
        let b = compile(&input("SELECT 2", vec![]), None, &FixedClock).unwrap();
        assert_ne!(a.ir.source.hash, b.ir.source.hash);
    }
}
