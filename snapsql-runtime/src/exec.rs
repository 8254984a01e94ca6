use std::collections::HashMap;

use snapsql_ast::{Ir, ParameterSchema};
use snapsql_core::{Dialect, Value};

use crate::collaborators::{ExecOutcome, ExecutionContext, Queryer};
use crate::error::RuntimeError;
use crate::guard;
use crate::postprocess::RuntimeOptions;
use crate::validate;
use crate::vm;

/// The shape a materialized SQL string turned out to be, decided by a
/// lexical classifier (§4.9): a write without `RETURNING` dispatches to
/// [`Queryer::exec`]; everything else dispatches to [`Queryer::query`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Dispatch {
    Query,
    Exec,
}

fn classify(sql: &str) -> Dispatch {
    let verb = sql.trim_start().split(|c: char| c.is_whitespace()).next().unwrap_or("");
    let is_write = verb.eq_ignore_ascii_case("update") || verb.eq_ignore_ascii_case("delete") || verb.eq_ignore_ascii_case("insert");
    if is_write && !contains_keyword(sql, "RETURNING") {
        Dispatch::Exec
    } else {
        Dispatch::Query
    }
}

fn contains_keyword(sql: &str, keyword: &str) -> bool {
    let upper = sql.to_ascii_uppercase();
    upper.split(|c: char| !c.is_ascii_alphanumeric() && c != '_').any(|word| word == keyword)
}

/// What executing a compiled template against a collaborator produced.
#[derive(Debug)]
pub enum ExecutionOutcome<Row> {
    /// A read statement's rows.
    Rows(Vec<Row>),
    /// A write statement's affected-row count / generated key.
    Write(ExecOutcome),
    /// An `EXPLAIN`-prefixed re-issue's rows. Concatenating them into a
    /// single plan string is left to the caller: the shape of a driver's
    /// row type is outside this crate's interface, which only defines the
    /// collaborator seam (§1).
    Explain(Vec<Row>),
}

/// Validates parameters (C10), evaluates `ir` into SQL text and bind
/// arguments (C9), enforces the dangerous-query guard (C11), and
/// dispatches the result to `queryer`.
pub fn execute<Q: Queryer>(
    ir: &Ir,
    params: &HashMap<String, Value>,
    dialect: Dialect,
    options: &RuntimeOptions,
    queryer: &Q,
) -> Result<ExecutionOutcome<Q::Row>, RuntimeError<Q::Error>> {
    let schema = ParameterSchema { entries: ir.parameters.clone() };
    validate::validate(&schema, &ir.implicit_parameters, params)?;

    let (sql, args) = vm::run(&ir.instructions, &ir.cel_expressions, params, dialect, options)?;

    guard::check(&sql, options.execute_dangerous_query).map_err(|sql| RuntimeError::DangerousQuery { sql })?;

    let ctx = if options.timeout_ms > 0 {
        ExecutionContext::with_timeout(std::time::Duration::from_millis(options.timeout_ms))
    } else {
        ExecutionContext::unbounded()
    };

    if options.explain {
        let prefix = dialect.explain_prefix(options.explain_analyze);
        let explain_sql = format!("{prefix} {sql}");
        let rows = queryer.query(&ctx, &explain_sql, &args).map_err(RuntimeError::QueryExecution)?;
        return Ok(ExecutionOutcome::Explain(rows));
    }

    match classify(&sql) {
        Dispatch::Exec => {
            let outcome = queryer.exec(&ctx, &sql, &args).map_err(RuntimeError::QueryExecution)?;
            Ok(ExecutionOutcome::Write(outcome))
        }
        Dispatch::Query => {
            let rows = queryer.query(&ctx, &sql, &args).map_err(RuntimeError::QueryExecution)?;
            Ok(ExecutionOutcome::Rows(rows))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapsql_core::ParamType;
    use std::cell::RefCell;
    use std::convert::Infallible;

    #[derive(Default)]
    struct FakeQueryer {
        queries: RefCell<Vec<(String, Vec<Value>)>>,
        execs: RefCell<Vec<(String, Vec<Value>)>>,
    }

    impl Queryer for FakeQueryer {
        type Row = Vec<Value>;
        type Error = Infallible;

        fn query(&self, _ctx: &ExecutionContext, sql: &str, args: &[Value]) -> Result<Vec<Self::Row>, Self::Error> {
            self.queries.borrow_mut().push((sql.to_string(), args.to_vec()));
            Ok(vec![])
        }

        fn exec(&self, _ctx: &ExecutionContext, sql: &str, args: &[Value]) -> Result<ExecOutcome, Self::Error> {
            self.execs.borrow_mut().push((sql.to_string(), args.to_vec()));
            Ok(ExecOutcome { rows_affected: 1, last_insert_id: None })
        }
    }

    fn bare_ir(instructions: Vec<snapsql_ast::Instruction>, params: Vec<snapsql_ast::ParameterEntry>) -> Ir {
        Ir {
            source: snapsql_ast::SourceInfo { file: None, content: String::new(), hash: String::new() },
            function_name: "test".to_string(),
            description: None,
            parameters: params,
            implicit_parameters: vec![],
            cel_expressions: vec![],
            instructions,
            dependencies: Default::default(),
            metadata: snapsql_ast::IrMetadata {
                version: "0.0.0".to_string(),
                generated_at: "1970-01-01T00:00:00Z".to_string(),
                generator: "test".to_string(),
                schema_url: snapsql_ast::SCHEMA_URL.to_string(),
            },
        }
    }

    #[test]
    fn select_dispatches_to_query() {
        let ir = bare_ir(
            vec![snapsql_ast::Instruction::EmitStatic { value: "SELECT 1".to_string(), pos: Default::default() }],
            vec![],
        );
        let queryer = FakeQueryer::default();
        let outcome = execute(&ir, &HashMap::new(), Dialect::Sqlite, &RuntimeOptions::default(), &queryer).unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Rows(_)));
        assert_eq!(queryer.queries.borrow().len(), 1);
    }

    #[test]
    fn update_with_where_dispatches_to_exec() {
        let ir = bare_ir(
            vec![snapsql_ast::Instruction::EmitStatic { value: "UPDATE t SET x = 1 WHERE id = 1".to_string(), pos: Default::default() }],
            vec![],
        );
        let queryer = FakeQueryer::default();
        let outcome = execute(&ir, &HashMap::new(), Dialect::Sqlite, &RuntimeOptions::default(), &queryer).unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Write(_)));
        assert_eq!(queryer.execs.borrow().len(), 1);
    }

    #[test]
    fn update_without_where_is_rejected_by_the_guard() {
        let ir = bare_ir(
            vec![snapsql_ast::Instruction::EmitStatic { value: "UPDATE t SET x = 1".to_string(), pos: Default::default() }],
            vec![],
        );
        let queryer = FakeQueryer::default();
        let err = execute(&ir, &HashMap::new(), Dialect::Sqlite, &RuntimeOptions::default(), &queryer).unwrap_err();
        assert!(matches!(err, RuntimeError::DangerousQuery { .. }));
        assert!(queryer.execs.borrow().is_empty());
    }

    #[test]
    fn missing_required_parameter_is_rejected_before_the_vm_runs() {
        let ir = bare_ir(
            vec![snapsql_ast::Instruction::EmitParam { name: "id".to_string(), pos: Default::default() }],
            vec![snapsql_ast::ParameterEntry { name: "id".to_string(), ty: ParamType::Int, description: None, optional: false, default: None }],
        );
        let queryer = FakeQueryer::default();
        let err = execute(&ir, &HashMap::new(), Dialect::Sqlite, &RuntimeOptions::default(), &queryer).unwrap_err();
        assert!(matches!(err, RuntimeError::MissingRequiredParameters(_)));
    }

    #[test]
    fn explain_reissues_sql_with_dialect_prefix() {
        let ir = bare_ir(
            vec![snapsql_ast::Instruction::EmitStatic { value: "SELECT 1".to_string(), pos: Default::default() }],
            vec![],
        );
        let queryer = FakeQueryer::default();
        let options = RuntimeOptions { explain: true, ..Default::default() };
        let outcome = execute(&ir, &HashMap::new(), Dialect::Sqlite, &options, &queryer).unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Explain(_)));
        assert_eq!(queryer.queries.borrow()[0].0, "EXPLAIN QUERY PLAN SELECT 1");
    }
}
