use snapsql_ast::{Clause, ClauseKind, CteDefinition, Statement, StatementKind, WithClause};
use snapsql_lexer::{Keyword, Token, TokenKind};

use crate::error::ParseError;

/// Finds the index of the next non-whitespace, non-comment token at or
/// after `from`.
fn next_significant(tokens: &[Token], from: usize) -> Option<usize> {
    (from..tokens.len()).find(|&i| !tokens[i].is_whitespace() && !tokens[i].is_comment())
}

fn keyword_at(tokens: &[Token], idx: usize) -> Option<Keyword> {
    match tokens.get(idx).map(|t| &t.kind) {
        Some(TokenKind::Keyword(k)) => Some(*k),
        _ => None,
    }
}

/// Scans top-level tokens (tracking parenthesis depth so subqueries are not
/// cut) and records where each clause starts.
fn clause_starts(tokens: &[Token]) -> Vec<(usize, ClauseKind)> {
    let mut starts = vec![];
    let mut depth = 0i32;
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i].kind {
            TokenKind::LeftParen => depth += 1,
            TokenKind::RightParen => depth -= 1,
            _ => {}
        }
        if depth == 0 {
            if let Some(kw) = keyword_at(tokens, i) {
                let next = next_significant(tokens, i + 1);
                let two_word = |second: Keyword| next.and_then(|n| keyword_at(tokens, n)) == Some(second);
                let kind = match kw {
                    Keyword::With => Some(ClauseKind::With),
                    Keyword::Select => Some(ClauseKind::Select),
                    Keyword::From if !two_word(Keyword::From) => Some(ClauseKind::From),
                    Keyword::Where => Some(ClauseKind::Where),
                    Keyword::Group if two_word(Keyword::By) => Some(ClauseKind::GroupBy),
                    Keyword::Having => Some(ClauseKind::Having),
                    Keyword::Order if two_word(Keyword::By) => Some(ClauseKind::OrderBy),
                    Keyword::Limit => Some(ClauseKind::Limit),
                    Keyword::Offset => Some(ClauseKind::Offset),
                    Keyword::Insert if two_word(Keyword::Into) => Some(ClauseKind::InsertInto),
                    Keyword::Values => Some(ClauseKind::Values),
                    Keyword::Update => Some(ClauseKind::Update),
                    Keyword::Set => Some(ClauseKind::Set),
                    Keyword::Delete if two_word(Keyword::From) => Some(ClauseKind::DeleteFrom),
                    Keyword::Returning => Some(ClauseKind::Returning),
                    Keyword::On if two_word(Keyword::Conflict) => Some(ClauseKind::OnConflict),
                    Keyword::For => Some(ClauseKind::For),
                    _ => None,
                };
                if let Some(kind) = kind {
                    starts.push((i, kind));
                }
            }
        }
        i += 1;
    }
    starts
}

/// Splits a `WITH cte1 AS (...), cte2 AS (...)` token span into its CTE
/// definitions, capturing each body as a raw token slice.
fn parse_with_clause(tokens: &[Token]) -> WithClause {
    let mut ctes = vec![];
    let mut i = 1; // skip the WITH keyword
    loop {
        let Some(name_idx) = next_significant(tokens, i) else { break };
        let name = match &tokens[name_idx].kind {
            TokenKind::Ident(ident) => ident.value.clone(),
            _ => break,
        };
        let pos = tokens[name_idx].pos;
        let mut j = name_idx + 1;
        if keyword_at(tokens, next_significant(tokens, j).unwrap_or(j)) == Some(Keyword::As) {
            j = next_significant(tokens, j).unwrap() + 1;
        }
        let Some(open) = next_significant(tokens, j) else { break };
        if !matches!(tokens[open].kind, TokenKind::LeftParen) {
            break;
        }
        let mut depth = 1;
        let mut k = open + 1;
        let body_start = k;
        while k < tokens.len() && depth > 0 {
            match tokens[k].kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => depth -= 1,
                _ => {}
            }
            if depth > 0 {
                k += 1;
            }
        }
        let raw_tokens = tokens[body_start..k].to_vec();
        ctes.push(CteDefinition { name, raw_tokens, parsed_statement: None, pos });
        i = k + 1;
        match next_significant(tokens, i) {
            Some(c) if matches!(tokens[c].kind, TokenKind::Comma) => i = c + 1,
            _ => break,
        }
    }
    WithClause { ctes }
}

fn statement_kind_after_with(tokens: &[Token]) -> Result<StatementKind, ParseError> {
    let idx = next_significant(tokens, 0)
        .ok_or(ParseError::ExpectedStatementKeyword(snapsql_core::Position::START))?;
    match keyword_at(tokens, idx) {
        Some(Keyword::Select) => Ok(StatementKind::Select),
        Some(Keyword::Insert) => Ok(StatementKind::InsertInto),
        Some(Keyword::Update) => Ok(StatementKind::Update),
        Some(Keyword::Delete) => Ok(StatementKind::DeleteFrom),
        _ => Err(ParseError::ExpectedStatementKeyword(tokens[idx].pos)),
    }
}

/// Splits a token stream into a [`Statement`] with its clauses.
///
/// The first significant keyword (after an optional `WITH` prefix)
/// determines the statement variant.
pub fn split_statement(tokens: Vec<Token>) -> Result<Statement, ParseError> {
    let first = next_significant(&tokens, 0)
        .ok_or(ParseError::ExpectedStatementKeyword(snapsql_core::Position::START))?;

    let (with, body_start) = if keyword_at(&tokens, first) == Some(Keyword::With) {
        let with_end = clause_starts(&tokens)
            .into_iter()
            .find(|&(i, kind)| i != first && kind != ClauseKind::With)
            .map(|(i, _)| i)
            .unwrap_or(tokens.len());
        (Some(parse_with_clause(&tokens[first..with_end])), with_end)
    } else {
        (None, 0)
    };

    let kind = statement_kind_after_with(&tokens[body_start..])?;

    let mut starts: Vec<(usize, ClauseKind)> = clause_starts(&tokens)
        .into_iter()
        .filter(|&(i, kind)| i >= body_start && kind != ClauseKind::With)
        .collect();
    starts.sort_by_key(|&(i, _)| i);

    let mut clauses = vec![];
    for (pos, &(start, kind)) in starts.iter().enumerate() {
        let end = starts.get(pos + 1).map(|&(e, _)| e).unwrap_or(tokens.len());
        clauses.push(Clause::new(kind, tokens[start..end].to_vec()));
    }

    let mut statement = Statement::new(kind, clauses);
    statement.with = with;
    Ok(statement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapsql_lexer::Lexer;

    fn split(sql: &str) -> Statement {
        let tokens = Lexer::new(sql).tokenize().unwrap();
        split_statement(tokens).unwrap()
    }

    #[test]
    fn splits_select_where() {
        let stmt = split("SELECT id, name FROM users WHERE id = 1");
        assert_eq!(stmt.kind, StatementKind::Select);
        let kinds: Vec<_> = stmt.clauses.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ClauseKind::Select, ClauseKind::From, ClauseKind::Where]);
    }

    #[test]
    fn subquery_parens_do_not_split_outer_clause() {
        let stmt = split("SELECT id FROM (SELECT id FROM t WHERE x = 1) AS sub");
        let kinds: Vec<_> = stmt.clauses.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ClauseKind::Select, ClauseKind::From]);
    }

    #[test]
    fn parses_with_clause_ctes() {
        let stmt = split("WITH c AS (SELECT id FROM u) SELECT id FROM c");
        let with = stmt.with.as_ref().unwrap();
        assert_eq!(with.ctes.len(), 1);
        assert_eq!(with.ctes[0].name, "c");
    }

    #[test]
    fn delete_from_is_one_clause() {
        let stmt = split("DELETE FROM users WHERE id = 1");
        assert_eq!(stmt.kind, StatementKind::DeleteFrom);
        let kinds: Vec<_> = stmt.clauses.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ClauseKind::DeleteFrom, ClauseKind::Where]);
    }
}
