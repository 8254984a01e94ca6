//! # snapsql-parser
//!
//! Turns a token stream into a validated, dependency-resolved statement
//! tree with its directive overlay: clause splitting, clause validation,
//! CTE/subquery reference resolution, and annotation-directive parsing.

#![deny(missing_docs)]
#![deny(unused_imports)]

mod directive;
mod error;
mod resolver;
mod splitter;
mod validator;

pub use self::{
    directive::{parse_directives, DirectiveEvent},
    error::ParseError,
    resolver::{resolve, Resolved},
    splitter::split_statement,
    validator::validate,
};

use snapsql_ast::Statement;
use snapsql_core::Collector;
use snapsql_lexer::Token;

/// Runs the clause splitter, validator, and reference resolver over a
/// tokenized template, in that order, accumulating findings in `collector`.
///
/// Returns the resolved statement even when `collector` holds errors, so
/// callers that want to keep going (e.g. to also run the type-checker and
/// surface its errors in the same pass) may do so; the facade's top-level
/// compile entry is responsible for treating a non-empty error list as
/// fatal.
pub fn parse(tokens: Vec<Token>, collector: &mut Collector) -> Result<(Statement, resolver::Resolved), ParseError> {
    let statement = split_statement(tokens)?;
    validate(&statement, collector)?;
    let resolved = resolve(statement.clone(), collector)?;
    tracing::debug!(
        clauses = statement.clauses.len(),
        diagnostics = collector.diagnostics().len(),
        "parsed statement"
    );
    Ok((statement, resolved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapsql_lexer::Lexer;

    #[test]
    fn end_to_end_parse_produces_resolved_statement() {
        let tokens = Lexer::new("WITH c AS (SELECT id FROM u) SELECT id FROM c WHERE id = 1")
            .tokenize()
            .unwrap();
        let mut collector = Collector::default();
        let (statement, resolved) = parse(tokens, &mut collector).unwrap();
        assert!(collector.is_ok());
        assert_eq!(statement.clauses.len(), 2);
        assert_eq!(resolved.graph.node_ids().count(), 2);
    }
}
