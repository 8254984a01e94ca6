use std::collections::HashMap;

use snapsql::{compile, execute, TemplateInput};
use snapsql_ast::ParameterEntry;
use snapsql_core::{Dialect, ParamType, Value};
use snapsql_runtime::{ExecOutcome, ExecutionContext, ExecutionOutcome, Queryer, RuntimeOptions};

struct FixedClock;

impl snapsql_runtime::Clock for FixedClock {
    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&chrono::Utc)
    }
}

#[derive(Default)]
struct RecordingQueryer {
    queries: std::cell::RefCell<Vec<(String, Vec<Value>)>>,
}

impl Queryer for RecordingQueryer {
    type Row = Vec<Value>;
    type Error = std::convert::Infallible;

    fn query(&self, _ctx: &ExecutionContext, sql: &str, args: &[Value]) -> Result<Vec<Self::Row>, Self::Error> {
        self.queries.borrow_mut().push((sql.to_string(), args.to_vec()));
        Ok(vec![])
    }

    fn exec(&self, _ctx: &ExecutionContext, sql: &str, args: &[Value]) -> Result<ExecOutcome, Self::Error> {
        self.queries.borrow_mut().push((sql.to_string(), args.to_vec()));
        Ok(ExecOutcome { rows_affected: 1, last_insert_id: None })
    }
}

fn param(name: &str, ty: ParamType, optional: bool) -> ParameterEntry {
    ParameterEntry { name: name.to_string(), ty, description: None, optional, default: None }
}

/// S1 — a simple predicate binds one argument and, on PostgreSQL, numbers
/// its placeholder.
#[test]
fn simple_select_with_predicate() {
    let input = TemplateInput {
        function_name: "get_user".to_string(),
        description: None,
        source: "SELECT id, name FROM users WHERE id = /*= user_id */0".to_string(),
        file: None,
        parameters: snapsql_ast::ParameterSchema { entries: vec![param("user_id", ParamType::Int, false)] },
        implicit_parameters: vec![],
    };
    let ir = compile(&input, None, &FixedClock).unwrap().ir;

    let queryer = RecordingQueryer::default();
    let params = HashMap::from([("user_id".to_string(), Value::Int(42))]);
    let outcome = execute(&ir, &params, Dialect::PostgreSql, &RuntimeOptions::default(), &queryer).unwrap();
    assert!(matches!(outcome, ExecutionOutcome::Rows(_)));
    let (sql, args) = &queryer.queries.borrow()[0];
    assert_eq!(sql, "SELECT id, name FROM users WHERE id = $1");
    assert_eq!(args, &vec![Value::Int(42)]);
}

/// S2 — a conditionally-included column disappears along with its comma
/// when the guarding flag is false.
#[test]
fn conditional_column() {
    let input = TemplateInput {
        function_name: "get_user".to_string(),
        description: None,
        source: "SELECT id/*# if include_email */, email/*# end */ FROM users".to_string(),
        file: None,
        parameters: snapsql_ast::ParameterSchema { entries: vec![param("include_email", ParamType::Bool, false)] },
        implicit_parameters: vec![],
    };
    let ir = compile(&input, None, &FixedClock).unwrap().ir;

    let queryer = RecordingQueryer::default();
    let with_email = HashMap::from([("include_email".to_string(), Value::Bool(true))]);
    execute(&ir, &with_email, Dialect::PostgreSql, &RuntimeOptions::default(), &queryer).unwrap();
    assert_eq!(queryer.queries.borrow()[0].0, "SELECT id, email FROM users");

    let without_email = HashMap::from([("include_email".to_string(), Value::Bool(false))]);
    execute(&ir, &without_email, Dialect::PostgreSql, &RuntimeOptions::default(), &queryer).unwrap();
    assert_eq!(queryer.queries.borrow()[1].0, "SELECT id FROM users");
}

/// S3 — two sibling conditional predicates, each behind its own orphan
/// connector, elide independently: both present keeps `WHERE ... AND ...`,
/// one present keeps a bare `WHERE`, neither present drops it entirely.
#[test]
fn orphan_connector_elision() {
    let input = TemplateInput {
        function_name: "search".to_string(),
        description: None,
        source: "SELECT * FROM t WHERE /*# if has_a */a=/*= a */0 /*# end */ AND /*# if has_b */b=/*= b */0 /*# end */"
            .to_string(),
        file: None,
        parameters: snapsql_ast::ParameterSchema {
            entries: vec![
                param("has_a", ParamType::Bool, false),
                param("has_b", ParamType::Bool, false),
                param("a", ParamType::Int, true),
                param("b", ParamType::Int, true),
            ],
        },
        implicit_parameters: vec![],
    };
    let ir = compile(&input, None, &FixedClock).unwrap().ir;

    let queryer = RecordingQueryer::default();
    let both = HashMap::from([
        ("has_a".to_string(), Value::Bool(true)),
        ("has_b".to_string(), Value::Bool(true)),
        ("a".to_string(), Value::Int(1)),
        ("b".to_string(), Value::Int(2)),
    ]);
    execute(&ir, &both, Dialect::PostgreSql, &RuntimeOptions::default(), &queryer).unwrap();
    assert_eq!(queryer.queries.borrow()[0].0, "SELECT * FROM t WHERE a=$1 AND b=$2");
    assert_eq!(queryer.queries.borrow()[0].1, vec![Value::Int(1), Value::Int(2)]);

    let only_a = HashMap::from([
        ("has_a".to_string(), Value::Bool(true)),
        ("has_b".to_string(), Value::Bool(false)),
        ("a".to_string(), Value::Int(1)),
    ]);
    execute(&ir, &only_a, Dialect::PostgreSql, &RuntimeOptions::default(), &queryer).unwrap();
    assert_eq!(queryer.queries.borrow()[1].0, "SELECT * FROM t WHERE a=$1");

    let neither = HashMap::from([("has_a".to_string(), Value::Bool(false)), ("has_b".to_string(), Value::Bool(false))]);
    execute(&ir, &neither, Dialect::PostgreSql, &RuntimeOptions::default(), &queryer).unwrap();
    assert_eq!(queryer.queries.borrow()[2].0, "SELECT * FROM t");
}

/// S4 — a loop binds its element once per iteration and numbers one
/// placeholder per element.
#[test]
fn loop_binds_one_placeholder_per_element() {
    let input = TemplateInput {
        function_name: "select_fields".to_string(),
        description: None,
        source: "SELECT /*# for f : fields */ /*= f */x , /*# end */ 1 FROM t".to_string(),
        file: None,
        parameters: snapsql_ast::ParameterSchema {
            entries: vec![param("fields", ParamType::Array(Box::new(ParamType::String)), false)],
        },
        implicit_parameters: vec![],
    };
    let ir = compile(&input, None, &FixedClock).unwrap().ir;

    let queryer = RecordingQueryer::default();
    let params = HashMap::from([(
        "fields".to_string(),
        Value::Array(vec![Value::String("id".to_string()), Value::String("name".to_string())]),
    )]);
    execute(&ir, &params, Dialect::PostgreSql, &RuntimeOptions::default(), &queryer).unwrap();
    let (sql, args) = &queryer.queries.borrow()[0];
    assert_eq!(sql, "SELECT $1 , $2 , 1 FROM t");
    assert_eq!(args, &vec![Value::String("id".to_string()), Value::String("name".to_string())]);
}

/// S5 — an explicit system-limit marker inlines its value as a literal,
/// binding no argument.
#[test]
fn cte_with_system_limit() {
    let input = TemplateInput {
        function_name: "list_ids".to_string(),
        description: None,
        source: "WITH c AS (SELECT id FROM u) SELECT id FROM c /*@ limit */".to_string(),
        file: None,
        parameters: snapsql_ast::ParameterSchema { entries: vec![] },
        implicit_parameters: vec![],
    };
    let ir = compile(&input, None, &FixedClock).unwrap().ir;

    let queryer = RecordingQueryer::default();
    let options = RuntimeOptions { limit: Some(10), ..Default::default() };
    execute(&ir, &HashMap::new(), Dialect::Sqlite, &options, &queryer).unwrap();
    let (sql, args) = &queryer.queries.borrow()[0];
    assert_eq!(sql, "WITH c AS (SELECT id FROM u) SELECT id FROM c LIMIT 10");
    assert!(args.is_empty());
}

/// S6 — a DELETE with no WHERE is refused unless the override flag is set.
#[test]
fn dangerous_query_guard() {
    let input = TemplateInput {
        function_name: "purge_users".to_string(),
        description: None,
        source: "DELETE FROM users".to_string(),
        file: None,
        parameters: snapsql_ast::ParameterSchema { entries: vec![] },
        implicit_parameters: vec![],
    };
    let ir = compile(&input, None, &FixedClock).unwrap().ir;
    let queryer = RecordingQueryer::default();

    let refused = execute(&ir, &HashMap::new(), Dialect::PostgreSql, &RuntimeOptions::default(), &queryer);
    assert!(matches!(refused, Err(snapsql_runtime::RuntimeError::DangerousQuery { .. })));
    assert!(queryer.queries.borrow().is_empty());

    let allowed = RuntimeOptions { execute_dangerous_query: true, ..Default::default() };
    let outcome = execute(&ir, &HashMap::new(), Dialect::PostgreSql, &allowed, &queryer).unwrap();
    assert!(matches!(outcome, ExecutionOutcome::Write(_)));
    assert_eq!(queryer.queries.borrow()[0].0, "DELETE FROM users");
}
