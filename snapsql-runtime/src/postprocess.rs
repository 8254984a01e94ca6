use snapsql_core::{Dialect, Value};

/// Runtime options threaded through VM evaluation and post-processing
/// (§4.9).
#[derive(Clone, Debug, Default)]
pub struct RuntimeOptions {
    /// Re-issue the generated SQL with the dialect's `EXPLAIN` prefix.
    pub explain: bool,
    /// Use the `ANALYZE` variant of `EXPLAIN` where the dialect supports it.
    pub explain_analyze: bool,
    /// Appended as `LIMIT` if the template doesn't already specify one.
    pub limit: Option<i64>,
    /// Appended as `OFFSET` if the template doesn't already specify one.
    pub offset: Option<i64>,
    /// Disables the dangerous-query guard (§4.11).
    pub execute_dangerous_query: bool,
    /// Deadline, in milliseconds, for the collaborator call. `0` means no
    /// deadline.
    pub timeout_ms: u64,
}

/// Runs the post-processing passes of §4.9, in order: `LIMIT`/`OFFSET`
/// auto-append, placeholder conversion, readability spacing, then a
/// trailing-whitespace trim. A region that elides its own trailing literal
/// text has nothing after it to collapse against at emission time, so a
/// stray trailing space can only be cleaned up once the whole statement is
/// assembled.
pub fn finalize(sql: String, args: Vec<Value>, dialect: Dialect, options: &RuntimeOptions) -> (String, Vec<Value>) {
    let (sql, args) = append_limit_offset(sql, args, dialect, options);
    let sql = convert_placeholders(&sql, dialect);
    let sql = add_readability_spacing(&sql);
    (sql.trim_end().to_string(), args)
}

fn append_limit_offset(mut sql: String, args: Vec<Value>, _dialect: Dialect, options: &RuntimeOptions) -> (String, Vec<Value>) {
    if !is_select(&sql) {
        return (sql, args);
    }
    if let Some(limit) = options.limit {
        if !contains_clause_keyword(&sql, "LIMIT") {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
    }
    if let Some(offset) = options.offset {
        if !contains_clause_keyword(&sql, "OFFSET") {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
    }
    (sql, args)
}

fn is_select(sql: &str) -> bool {
    sql.trim_start().split(|c: char| c.is_whitespace()).next().unwrap_or("").eq_ignore_ascii_case("select")
}

fn contains_clause_keyword(sql: &str, keyword: &str) -> bool {
    let upper = sql.to_ascii_uppercase();
    upper.split(|c: char| !c.is_ascii_alphanumeric() && c != '_').any(|word| word == keyword)
}

/// Rewrites `?` to `$1..$n` in source order for PostgreSQL-family
/// dialects, skipping `?` found inside single- or double-quoted strings.
/// Idempotent: a second pass finds no bare `?` left to rewrite (property
/// 7, §8).
pub fn convert_placeholders(sql: &str, dialect: Dialect) -> String {
    if !dialect.uses_numbered_placeholders() {
        return sql.to_string();
    }
    let mut out = String::with_capacity(sql.len() + 8);
    let mut quote: Option<char> = None;
    let mut next = 1;
    for ch in sql.chars() {
        match quote {
            Some(q) => {
                out.push(ch);
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    out.push(ch);
                }
                '?' => {
                    out.push('$');
                    out.push_str(&next.to_string());
                    next += 1;
                }
                _ => out.push(ch),
            },
        }
    }
    out
}

/// Inserts a single space after any placeholder (`?` or `$n`) immediately
/// followed by an identifier character, so e.g. `?x` reads as `? x`.
fn add_readability_spacing(sql: &str) -> String {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        let mut end = i;
        if ch == '?' {
            out.push(ch);
            end = i + 1;
        } else if ch == '$' && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit()) {
            out.push(ch);
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_ascii_digit() {
                out.push(chars[j]);
                j += 1;
            }
            end = j;
        } else {
            out.push(ch);
            i += 1;
            continue;
        }
        if let Some(&next) = chars.get(end) {
            if next.is_alphanumeric() || next == '_' {
                out.push(' ');
            }
        }
        i = end;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_placeholders_for_postgres() {
        assert_eq!(convert_placeholders("WHERE a = ? AND b = ?", Dialect::PostgreSql), "WHERE a = $1 AND b = $2");
    }

    #[test]
    fn leaves_placeholders_inside_strings_alone() {
        assert_eq!(convert_placeholders("WHERE note = '?' AND id = ?", Dialect::PostgreSql), "WHERE note = '?' AND id = $1");
    }

    #[test]
    fn conversion_is_idempotent_for_non_numbered_dialects() {
        let once = convert_placeholders("WHERE id = ?", Dialect::Sqlite);
        let twice = convert_placeholders(&once, Dialect::Sqlite);
        assert_eq!(once, twice);
    }

    #[test]
    fn conversion_of_already_numbered_sql_finds_no_bare_placeholders() {
        let once = convert_placeholders("WHERE a = ? AND b = ?", Dialect::PostgreSql);
        let twice = convert_placeholders(&once, Dialect::PostgreSql);
        assert_eq!(once, twice);
    }

    #[test]
    fn appends_limit_when_absent() {
        let options = RuntimeOptions { limit: Some(10), ..Default::default() };
        let (sql, args) = append_limit_offset("SELECT * FROM t".to_string(), vec![], Dialect::Sqlite, &options);
        assert_eq!(sql, "SELECT * FROM t LIMIT 10");
        assert!(args.is_empty());
    }

    #[test]
    fn does_not_append_limit_when_template_already_has_one() {
        let options = RuntimeOptions { limit: Some(10), ..Default::default() };
        let (sql, args) = append_limit_offset("SELECT * FROM t LIMIT 5".to_string(), vec![], Dialect::Sqlite, &options);
        assert_eq!(sql, "SELECT * FROM t LIMIT 5");
        assert!(args.is_empty());
    }

    #[test]
    fn spacing_separates_placeholder_from_trailing_identifier() {
        assert_eq!(add_readability_spacing("?x"), "? x");
        assert_eq!(add_readability_spacing("$1x"), "$1 x");
        assert_eq!(add_readability_spacing("? ,"), "? ,");
    }
}
