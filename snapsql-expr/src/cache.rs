use std::collections::HashMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::ast::Expr;
use crate::error::ExpressionCompileError;
use crate::parser::parse;

static CACHE: Lazy<RwLock<HashMap<String, Expr>>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Parses `source`, reusing a cached AST when the same expression text has
/// already been parsed elsewhere in the process. The IR emitter calls this
/// once per distinct expression table entry, but the same template text can
/// recur across many directives in a large statement.
pub fn parse_cached(source: &str) -> Result<Expr, ExpressionCompileError> {
    if let Some(expr) = CACHE.read().expect("expression cache lock poisoned").get(source) {
        tracing::trace!(expr = source, "expression cache hit");
        return Ok(expr.clone());
    }
    tracing::trace!(expr = source, "expression cache miss");
    let expr = parse(source)?;
    CACHE.write().expect("expression cache lock poisoned").insert(source.to_string(), expr.clone());
    Ok(expr)
}

/// Empties the cache. Exposed for tests and for long-running hosts that
/// recompile many distinct templates over their lifetime and want to bound
/// the cache's memory footprint.
pub fn clear() {
    CACHE.write().expect("expression cache lock poisoned").clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_identical_source() {
        clear();
        let a = parse_cached("1 + 1").unwrap();
        let b = parse_cached("1 + 1").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn clear_forces_reparse() {
        clear();
        parse_cached("2 + 2").unwrap();
        clear();
        assert!(CACHE.read().unwrap().is_empty());
    }
}
