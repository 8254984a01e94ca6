/// Rejects `UPDATE`/`DELETE` statements that lack a `WHERE` clause unless
/// `allow_dangerous` is set (§4.11).
///
/// This is a lexical check, not a reparse: it normalizes whitespace and
/// case and scans for the bare keyword `WHERE` outside quoted string
/// literals. Any occurrence of `WHERE`, however it got there, disables the
/// guard — the goal is to catch the common case of a forgotten predicate,
/// not to fully re-validate the statement.
pub fn check(sql: &str, allow_dangerous: bool) -> Result<(), String> {
    if allow_dangerous {
        return Ok(());
    }
    let first_word = leading_keyword(sql);
    let is_dangerous_verb = first_word.eq_ignore_ascii_case("update") || first_word.eq_ignore_ascii_case("delete");
    if !is_dangerous_verb {
        return Ok(());
    }
    if contains_where_outside_strings(sql) {
        return Ok(());
    }
    tracing::warn!(verb = first_word, "rejecting dangerous query with no WHERE clause");
    Err(sql.to_string())
}

fn leading_keyword(sql: &str) -> &str {
    sql.trim_start().split(|c: char| c.is_whitespace()).next().unwrap_or("")
}

fn contains_where_outside_strings(sql: &str) -> bool {
    let bytes = sql.as_bytes();
    let mut i = 0;
    let mut quote: Option<u8> = None;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                }
            }
            None => {
                if b == b'\'' || b == b'"' {
                    quote = Some(b);
                } else if (b | 0x20) == b'w' && sql[i..].len() >= 5 && sql[i..i + 5].eq_ignore_ascii_case("where") {
                    let before_ok = i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
                    let after = bytes.get(i + 5).copied();
                    let after_ok = after.map(|c| !c.is_ascii_alphanumeric()).unwrap_or(true);
                    if before_ok && after_ok {
                        return true;
                    }
                }
            }
        }
        i += 1;
    }
    false
}
