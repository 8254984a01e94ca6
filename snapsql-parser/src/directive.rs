use snapsql_core::Position;
use snapsql_lexer::{Token, TokenKind};

use crate::error::ParseError;

/// One event produced by walking a token stream through the directive
/// parser: either an ordinary token, or a directive/system-directive this
/// crate has classified and validated for nesting.
#[derive(Clone, Debug, PartialEq)]
pub enum DirectiveEvent {
    /// A token that is not part of any annotation.
    Token(Token),
    /// `/*= expr */dummy` — the dummy token is dropped from the event
    /// stream; its position is kept for diagnostics.
    VariableEmit {
        /// The expression text.
        expr: String,
        /// Where the annotation starts.
        pos: Position,
    },
    /// `/*# if expr */` or `/*# elif expr */` acting as the first branch.
    If {
        /// The condition expression text.
        expr: String,
        /// Where the annotation starts.
        pos: Position,
    },
    /// `/*# elif expr */`.
    ElseIf {
        /// The condition expression text.
        expr: String,
        /// Where the annotation starts.
        pos: Position,
    },
    /// `/*# else */`.
    Else {
        /// Where the annotation starts.
        pos: Position,
    },
    /// `/*# end */` closing an `if`/`elif`/`else` region.
    EndIf {
        /// Where the annotation starts.
        pos: Position,
    },
    /// `/*# for name : expr */`.
    ForStart {
        /// The loop variable name.
        var: String,
        /// The collection expression text.
        expr: String,
        /// Where the annotation starts.
        pos: Position,
    },
    /// `/*# end */` closing a `for` region.
    ForEnd {
        /// The loop variable name, from the matching `ForStart`.
        var: String,
        /// Where the annotation starts.
        pos: Position,
    },
    /// `/*# const NAME */`.
    Const {
        /// The structural variable's name.
        name: String,
        /// Where the annotation starts.
        pos: Position,
    },
    /// `/*@ limit */`.
    SystemLimit {
        /// Where the annotation starts.
        pos: Position,
    },
    /// `/*@ offset */`.
    SystemOffset {
        /// Where the annotation starts.
        pos: Position,
    },
    /// `/*@ explain */`.
    SystemExplain {
        /// Where the annotation starts.
        pos: Position,
    },
}

enum Frame {
    If,
    For(String),
}

/// Transforms an annotation-bearing token stream into a directive-overlay
/// event stream, validating that `if`/`elif`/`else`/`end` and `for`/`end`
/// regions are properly nested.
pub fn parse_directives(tokens: &[Token]) -> Result<Vec<DirectiveEvent>, ParseError> {
    let mut events = vec![];
    let mut stack: Vec<Frame> = vec![];
    let mut skip_next_as_dummy = false;

    for token in tokens {
        if skip_next_as_dummy {
            skip_next_as_dummy = false;
            continue;
        }
        match &token.kind {
            TokenKind::Variable(expr) => {
                events.push(DirectiveEvent::VariableEmit { expr: expr.clone(), pos: token.pos });
                skip_next_as_dummy = true;
            }
            TokenKind::Directive(text) => {
                events.push(parse_directive_text(text, token.pos, &mut stack)?);
            }
            TokenKind::SystemDirective(text) => {
                events.push(parse_system_directive_text(text, token.pos)?);
            }
            _ => events.push(DirectiveEvent::Token(token.clone())),
        }
    }

    if !stack.is_empty() {
        return Err(ParseError::UnbalancedDirective(tokens.last().map(|t| t.pos).unwrap_or(Position::START)));
    }
    Ok(events)
}

fn parse_directive_text(
    text: &str,
    pos: Position,
    stack: &mut Vec<Frame>,
) -> Result<DirectiveEvent, ParseError> {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix("if ").or_else(|| (text == "if").then_some("")) {
        stack.push(Frame::If);
        return Ok(DirectiveEvent::If { expr: rest.trim().to_string(), pos });
    }
    if let Some(rest) = text.strip_prefix("elif ") {
        match stack.last() {
            Some(Frame::If) => Ok(DirectiveEvent::ElseIf { expr: rest.trim().to_string(), pos }),
            _ => Err(ParseError::UnbalancedDirective(pos)),
        }
    } else if text == "else" {
        match stack.last() {
            Some(Frame::If) => Ok(DirectiveEvent::Else { pos }),
            _ => Err(ParseError::UnbalancedDirective(pos)),
        }
    } else if text == "end" {
        match stack.pop() {
            Some(Frame::If) => Ok(DirectiveEvent::EndIf { pos }),
            Some(Frame::For(var)) => Ok(DirectiveEvent::ForEnd { var, pos }),
            None => Err(ParseError::UnbalancedDirective(pos)),
        }
    } else if let Some(rest) = text.strip_prefix("for ") {
        let (var, expr) = rest
            .split_once(':')
            .ok_or_else(|| ParseError::UnrecognizedDirective(text.to_string(), pos))?;
        let var = var.trim().to_string();
        stack.push(Frame::For(var.clone()));
        Ok(DirectiveEvent::ForStart { var, expr: expr.trim().to_string(), pos })
    } else if let Some(rest) = text.strip_prefix("const ") {
        Ok(DirectiveEvent::Const { name: rest.trim().to_string(), pos })
    } else {
        Err(ParseError::UnrecognizedDirective(text.to_string(), pos))
    }
}

fn parse_system_directive_text(text: &str, pos: Position) -> Result<DirectiveEvent, ParseError> {
    match text.trim() {
        "limit" => Ok(DirectiveEvent::SystemLimit { pos }),
        "offset" => Ok(DirectiveEvent::SystemOffset { pos }),
        "explain" => Ok(DirectiveEvent::SystemExplain { pos }),
        other => Err(ParseError::UnrecognizedDirective(other.to_string(), pos)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapsql_lexer::Lexer;

    fn events(sql: &str) -> Vec<DirectiveEvent> {
        let tokens = Lexer::new(sql).tokenize().unwrap();
        parse_directives(&tokens).unwrap()
    }

    #[test]
    fn variable_emit_drops_dummy_token() {
        let evs = events("/*= user_id */0");
        assert_eq!(evs.len(), 1);
        assert!(matches!(&evs[0], DirectiveEvent::VariableEmit { expr, .. } if expr == "user_id"));
    }

    #[test]
    fn if_elif_else_end_balances() {
        let evs = events("/*# if a */x/*# elif b */y/*# else */z/*# end */");
        let kinds: Vec<_> = evs
            .iter()
            .filter(|e| !matches!(e, DirectiveEvent::Token(t) if t.is_whitespace()))
            .map(std::mem::discriminant)
            .collect();
        assert_eq!(kinds.len(), 7); // If, x, ElseIf, y, Else, z, EndIf
    }

    #[test]
    fn stray_elif_is_unbalanced() {
        let tokens = Lexer::new("/*# elif a */").tokenize().unwrap();
        assert!(matches!(parse_directives(&tokens), Err(ParseError::UnbalancedDirective(_))));
    }

    #[test]
    fn unterminated_if_is_unbalanced() {
        let tokens = Lexer::new("/*# if a */x").tokenize().unwrap();
        assert!(matches!(parse_directives(&tokens), Err(ParseError::UnbalancedDirective(_))));
    }

    #[test]
    fn for_loop_tracks_variable_name() {
        let evs = events("/*# for f : fields */ /*= f */x /*# end */");
        assert!(matches!(&evs[0], DirectiveEvent::ForStart { var, .. } if var == "f"));
        assert!(matches!(evs.last().unwrap(), DirectiveEvent::ForEnd { var, .. } if var == "f"));
    }
}
