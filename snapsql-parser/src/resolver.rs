use snapsql_ast::{
    ClauseKind, DependencyGraph, DerivedSourceType, DerivedTableInfo, NodeId, NodeKind, Statement,
    StatementKind, TableOrigin, TableReference,
};
use snapsql_core::Collector;
use snapsql_lexer::{Keyword, Token, TokenKind};

use crate::{error::ParseError, splitter::split_statement, validator::validate};

/// The result of resolving one statement's CTE/subquery dependencies: the
/// statement tree with CTE bodies re-parsed in place, the table references
/// visible in its `FROM`, and the dependency graph rooted at its main node.
pub struct Resolved {
    /// The statement, with every CTE's `parsed_statement` populated.
    pub statement: Statement,
    /// Table/CTE/subquery references found in the statement's `FROM`.
    pub tables: Vec<TableReference>,
    /// The dependency graph: one node per CTE/derived subquery plus `main`.
    pub graph: DependencyGraph,
    /// The statement's own node in `graph`.
    pub main_id: NodeId,
}

fn is_whitespace_or_comment(t: &Token) -> bool {
    t.is_whitespace() || t.is_comment()
}

fn significant(tokens: &[Token]) -> Vec<Token> {
    tokens.iter().filter(|t| !is_whitespace_or_comment(t)).cloned().collect()
}

fn ident_text(t: &Token) -> Option<String> {
    match &t.kind {
        TokenKind::Ident(i) => Some(i.value.clone()),
        _ => None,
    }
}

fn is_join_keyword(k: Keyword) -> bool {
    matches!(k, Keyword::Inner | Keyword::Left | Keyword::Right | Keyword::Full | Keyword::Cross | Keyword::Join)
}

/// Extracts the table/subquery references from a `FROM` clause's token
/// slice, classifying joins and inline subqueries; CTE vs. base-table
/// classification happens afterward once the enclosing scope's CTE names
/// are known.
fn extract_table_refs(clause_tokens: &[Token]) -> Vec<TableReference> {
    let sig = significant(clause_tokens);
    let mut refs = vec![];
    let mut i = 0;
    // Skip the leading FROM keyword.
    if matches!(sig.first().map(|t| &t.kind), Some(TokenKind::Keyword(Keyword::From))) {
        i = 1;
    }
    let mut pending_join: Option<String> = None;
    let mut first_seen = false;

    while i < sig.len() {
        match &sig[i].kind {
            TokenKind::Comma => {
                pending_join = None;
                i += 1;
            }
            TokenKind::Keyword(k) if is_join_keyword(*k) => {
                let mut words = vec![k.as_str().to_string()];
                i += 1;
                while let Some(TokenKind::Keyword(k2)) = sig.get(i).map(|t| &t.kind) {
                    if is_join_keyword(*k2) || matches!(k2, Keyword::Outer) {
                        words.push(k2.as_str().to_string());
                        i += 1;
                    } else {
                        break;
                    }
                }
                pending_join = Some(words.join(" "));
            }
            TokenKind::Keyword(Keyword::On) => {
                // Skip the join condition up to the next comma/join keyword.
                i += 1;
                let mut depth = 0i32;
                while i < sig.len() {
                    match &sig[i].kind {
                        TokenKind::LeftParen => depth += 1,
                        TokenKind::RightParen => depth -= 1,
                        TokenKind::Comma if depth == 0 => break,
                        TokenKind::Keyword(k) if depth == 0 && is_join_keyword(*k) => break,
                        _ => {}
                    }
                    i += 1;
                }
            }
            TokenKind::LeftParen => {
                let pos = sig[i].pos;
                let mut depth = 1;
                let body_start = i + 1;
                let mut j = body_start;
                while j < sig.len() && depth > 0 {
                    match sig[j].kind {
                        TokenKind::LeftParen => depth += 1,
                        TokenKind::RightParen => depth -= 1,
                        _ => {}
                    }
                    if depth > 0 {
                        j += 1;
                    }
                }
                let inner = sig[body_start..j].to_vec();
                i = j + 1;
                let mut alias = None;
                if matches!(sig.get(i).map(|t| &t.kind), Some(TokenKind::Keyword(Keyword::As))) {
                    i += 1;
                }
                if let Some(name) = sig.get(i).and_then(ident_text) {
                    alias = Some(name);
                    i += 1;
                }
                let origin = if !first_seen && pending_join.is_none() {
                    TableOrigin::Main
                } else {
                    TableOrigin::JoinTarget
                };
                first_seen = true;
                refs.push(TableReference {
                    alias_name: alias,
                    real_name: String::new(),
                    schema: None,
                    join_type: pending_join.take(),
                    origin: if matches!(origin, TableOrigin::Main) { TableOrigin::DerivedSubquery } else { origin },
                    derived: Some(Box::new(reparse_subquery(inner))),
                    pos,
                });
            }
            TokenKind::Ident(ident) => {
                let pos = sig[i].pos;
                let mut real_name = ident.value.clone();
                i += 1;
                let mut schema = None;
                if matches!(sig.get(i).map(|t| &t.kind), Some(TokenKind::Period)) {
                    if let Some(next) = sig.get(i + 1).and_then(ident_text) {
                        schema = Some(real_name.clone());
                        real_name = next;
                        i += 2;
                    }
                }
                if matches!(sig.get(i).map(|t| &t.kind), Some(TokenKind::Keyword(Keyword::As))) {
                    i += 1;
                }
                let alias = match sig.get(i).and_then(ident_text) {
                    Some(a) => {
                        i += 1;
                        Some(a)
                    }
                    None => None,
                };
                let origin = if !first_seen && pending_join.is_none() {
                    TableOrigin::Main
                } else {
                    TableOrigin::JoinTarget
                };
                first_seen = true;
                refs.push(TableReference {
                    alias_name: alias,
                    real_name,
                    schema,
                    join_type: pending_join.take(),
                    origin,
                    derived: None,
                    pos,
                });
            }
            _ => i += 1,
        }
    }
    refs
}

fn reparse_subquery(tokens: Vec<Token>) -> Statement {
    // A malformed inline subquery degrades to an empty SELECT rather than
    // aborting the whole compile; the validator reports the real problem
    // when this statement is itself validated.
    split_statement(tokens).unwrap_or(Statement::new(StatementKind::Select, vec![]))
}

fn select_fields(statement: &Statement) -> Vec<String> {
    let Some(select) = statement.clause(ClauseKind::Select) else { return vec![] };
    let sig = significant(&select.tokens);
    let mut fields = vec![];
    let mut i = 1; // skip SELECT
    while i < sig.len() {
        // Take the trailing identifier of each comma-separated projection
        // as its field name (covers `col`, `t.col`, and `expr AS col`).
        let mut last_ident = None;
        let mut depth = 0i32;
        while i < sig.len() {
            match &sig[i].kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => depth -= 1,
                TokenKind::Comma if depth == 0 => break,
                TokenKind::Ident(ident) => last_ident = Some(ident.value.clone()),
                TokenKind::Asterisk => last_ident = Some("*".to_string()),
                _ => {}
            }
            i += 1;
        }
        if let Some(name) = last_ident {
            fields.push(name);
        }
        i += 1; // skip comma
    }
    fields
}

fn referenced_table_names(tables: &[TableReference]) -> Vec<String> {
    tables.iter().map(|t| t.real_name.clone()).filter(|n| !n.is_empty()).collect()
}

fn resolve_statement(
    mut statement: Statement,
    graph: &mut DependencyGraph,
    collector: &mut Collector,
) -> (NodeId, Vec<TableReference>) {
    let is_main = graph.node_ids().next().is_none();
    let node_id = if is_main {
        graph.add_node("main", NodeKind::Main, None)
    } else {
        graph.add_node("<anonymous>", NodeKind::DerivedSubquery, None)
    };

    let mut cte_names = vec![];
    if let Some(with) = statement.with.as_mut() {
        for cte in &mut with.ctes {
            let child = match split_statement(cte.raw_tokens.clone()) {
                Ok(stmt) => stmt,
                Err(err) => {
                    collector.push(err.to_diagnostic());
                    continue;
                }
            };
            let _ = validate(&child, collector);
            let (cte_id, _) = resolve_statement(child.clone(), graph, collector);
            if let Some(node) = graph.node(cte_id).cloned() {
                let info = DerivedTableInfo {
                    name: cte.name.clone(),
                    source_type: DerivedSourceType::Cte,
                    select_fields: select_fields(&child),
                    referenced_tables: node.info.as_ref().map(|i| i.referenced_tables.clone()).unwrap_or_default(),
                };
                graph.set_info(cte_id, cte.name.clone(), NodeKind::Cte, info);
            }
            let _ = graph.add_edge(node_id, cte_id);
            cte.parsed_statement = Some(Box::new(child));
            cte_names.push(cte.name.clone());
        }
    }

    let mut tables = vec![];
    if let Some(from) = statement.clause(ClauseKind::From).cloned() {
        tables = extract_table_refs(&from.tokens);
        for table in &mut tables {
            if cte_names.iter().any(|n| n == &table.real_name) {
                table.origin = TableOrigin::Cte;
            }
            if let Some(inner) = table.derived.take() {
                let (sub_id, _) = resolve_statement(*inner.clone(), graph, collector);
                let info = DerivedTableInfo {
                    name: table.alias_name.clone().unwrap_or_default(),
                    source_type: DerivedSourceType::Subquery,
                    select_fields: select_fields(&inner),
                    referenced_tables: vec![],
                };
                graph.set_info(sub_id, table.alias_name.clone().unwrap_or_default(), NodeKind::DerivedSubquery, info);
                let _ = graph.add_edge(node_id, sub_id);
                table.derived = Some(inner);
            }
        }
    }

    if let Some(node) = graph.node(node_id).cloned() {
        if node.info.is_none() && !is_main {
            let info = DerivedTableInfo {
                name: node.name.clone(),
                source_type: DerivedSourceType::Subquery,
                select_fields: select_fields(&statement),
                referenced_tables: referenced_table_names(&tables),
            };
            graph.set_info(node_id, node.name.clone(), node.kind, info);
        }
    }

    (node_id, tables)
}

/// Re-parses every CTE and inline subquery, classifies `FROM` entries, and
/// builds the dependency graph, performing cycle detection and computing a
/// topological order.
pub fn resolve(statement: Statement, collector: &mut Collector) -> Result<Resolved, ParseError> {
    let mut graph = DependencyGraph::new();
    let (main_id, tables) = resolve_statement(statement.clone(), &mut graph, collector);
    graph.topological_order()?;
    Ok(Resolved { statement, tables, graph, main_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapsql_lexer::Lexer;

    fn resolve_sql(sql: &str) -> Resolved {
        let tokens = Lexer::new(sql).tokenize().unwrap();
        let stmt = split_statement(tokens).unwrap();
        let mut collector = Collector::default();
        resolve(stmt, &mut collector).unwrap()
    }

    #[test]
    fn classifies_base_table() {
        let r = resolve_sql("SELECT id FROM users");
        assert_eq!(r.tables.len(), 1);
        assert_eq!(r.tables[0].real_name, "users");
        assert_eq!(r.tables[0].origin, TableOrigin::Main);
    }

    #[test]
    fn classifies_cte_reference() {
        let r = resolve_sql("WITH c AS (SELECT id FROM u) SELECT id FROM c");
        assert_eq!(r.tables[0].origin, TableOrigin::Cte);
        assert_eq!(r.graph.node_ids().count(), 2);
    }

    #[test]
    fn classifies_derived_subquery() {
        let r = resolve_sql("SELECT id FROM (SELECT id FROM u) AS sub");
        assert_eq!(r.tables[0].origin, TableOrigin::DerivedSubquery);
        assert_eq!(r.tables[0].alias_name.as_deref(), Some("sub"));
    }

    #[test]
    fn join_target_is_classified_separately_from_main() {
        let r = resolve_sql("SELECT a.id FROM a INNER JOIN b ON a.id = b.a_id");
        assert_eq!(r.tables.len(), 2);
        assert_eq!(r.tables[0].origin, TableOrigin::Main);
        assert_eq!(r.tables[1].origin, TableOrigin::JoinTarget);
        assert_eq!(r.tables[1].join_type.as_deref(), Some("INNER"));
    }
}
