use snapsql_ast::{ClauseKind, Statement, StatementKind};
use snapsql_core::Collector;

use crate::error::ParseError;

fn canonical_order(kind: StatementKind) -> &'static [ClauseKind] {
    use ClauseKind::*;
    match kind {
        StatementKind::Select => &[
            With, Select, From, Where, GroupBy, Having, OrderBy, Limit, Offset, Returning, For,
        ],
        StatementKind::InsertInto => &[
            With, InsertInto, Select, From, Where, GroupBy, Having, OrderBy, Limit, Offset,
            Returning, OnConflict, Values,
        ],
        StatementKind::Update => &[With, Update, Set, Where, Returning],
        StatementKind::DeleteFrom => &[With, DeleteFrom, Where, Returning],
    }
}

fn required_clauses(statement: &Statement) -> &'static [ClauseKind] {
    use ClauseKind::*;
    match statement.kind {
        StatementKind::Select => &[Select, From],
        StatementKind::InsertInto => {
            if statement.clause(Values).is_some() {
                &[InsertInto, Values]
            } else {
                &[InsertInto, Select, From]
            }
        }
        StatementKind::Update => &[Update, Set],
        StatementKind::DeleteFrom => &[DeleteFrom],
    }
}

fn rank(order: &[ClauseKind], kind: ClauseKind) -> Option<usize> {
    order.iter().position(|&k| k == kind)
}

/// Runs the three clause checks (presence, uniqueness, order) against a
/// statement, appending every finding to `collector` instead of stopping at
/// the first failure.
///
/// Returns `Err` only for the class of failure that makes further analysis
/// unsafe (a clause kind accepted nowhere in the canonical order); ordinary
/// violations are reported through `collector` and this returns `Ok`.
pub fn validate(statement: &Statement, collector: &mut Collector) -> Result<(), ParseError> {
    let order = canonical_order(statement.kind);

    // Presence: every clause kind must appear somewhere in this statement's
    // canonical order.
    for clause in &statement.clauses {
        if rank(order, clause.kind).is_none() {
            let err = ParseError::InvalidClauseForStatement {
                statement: statement.kind,
                clause: clause.kind,
                pos: clause.start,
            };
            collector.push(err.to_diagnostic());
        }
    }

    // Uniqueness.
    let mut seen = std::collections::HashSet::new();
    for clause in &statement.clauses {
        if !seen.insert(clause.kind) {
            let err = ParseError::DuplicateClause(clause.kind, clause.start);
            collector.push(err.to_diagnostic());
        }
    }

    // Order: clauses must appear in non-decreasing rank.
    let mut highest_seen: Option<(usize, ClauseKind, snapsql_core::Position)> = None;
    for clause in &statement.clauses {
        let Some(this_rank) = rank(order, clause.kind) else { continue };
        if let Some((seen_rank, seen_kind, seen_pos)) = highest_seen {
            if this_rank < seen_rank {
                let err = ParseError::ClauseOrderViolation {
                    clause: clause.kind,
                    pos: clause.start,
                    before_clause: seen_kind,
                    before_pos: seen_pos,
                };
                collector.push(err.to_diagnostic());
                continue;
            }
        }
        highest_seen = Some((this_rank, clause.kind, clause.start));
    }

    // Required clauses.
    for &required in required_clauses(statement) {
        if statement.clause(required).is_none() {
            let err = ParseError::RequiredClauseMissing { statement: statement.kind, clause: required };
            collector.push(err.to_diagnostic());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::splitter::split_statement;
    use snapsql_lexer::Lexer;

    fn validate_sql(sql: &str) -> Collector {
        let tokens = Lexer::new(sql).tokenize().unwrap();
        let stmt = split_statement(tokens).unwrap();
        let mut collector = Collector::default();
        validate(&stmt, &mut collector).unwrap();
        collector
    }

    #[test]
    fn canonical_order_has_no_violations() {
        let c = validate_sql("SELECT id FROM t WHERE x = 1 ORDER BY id LIMIT 10");
        assert!(c.is_ok());
    }

    #[test]
    fn swapped_clauses_report_order_violation() {
        let c = validate_sql("SELECT id FROM t LIMIT 10 WHERE x = 1");
        assert_eq!(c.errors().count(), 1);
        assert_eq!(c.diagnostics()[0].kind, "clause_order_violation");
    }

    #[test]
    fn missing_from_is_required_clause_missing() {
        // a hand-built statement without FROM; split_statement itself
        // requires a FROM-less SELECT to still parse structurally.
        let tokens = Lexer::new("SELECT 1").tokenize().unwrap();
        let stmt = split_statement(tokens).unwrap();
        let mut c = Collector::default();
        validate(&stmt, &mut c).unwrap();
        assert_eq!(c.errors().count(), 1);
        assert_eq!(c.diagnostics()[0].kind, "required_clause_missing");
    }

    #[test]
    fn duplicate_where_is_reported() {
        let c = validate_sql("SELECT id FROM t WHERE x = 1 WHERE y = 2");
        assert!(c.errors().any(|d| d.kind == "duplicate_clause"));
    }
}
