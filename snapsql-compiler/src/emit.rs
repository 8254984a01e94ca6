use snapsql_ast::{ExpressionTableEntry, Instruction};
use snapsql_core::ParamType;
use snapsql_expr::{check, parse_cached, Expr, Scope};
use snapsql_lexer::{Keyword, Token, TokenKind};
use snapsql_parser::DirectiveEvent;

use crate::error::EmitError;

/// The expression table under construction during emission: each unique
/// expression text is compiled and stored at most once (§4.6), and
/// `IF`/`ELSE_IF`/`LOOP_START`/`EMIT_EVAL` instructions carry its index.
#[derive(Default)]
struct ExprTable {
    entries: Vec<ExpressionTableEntry>,
}

impl ExprTable {
    fn intern(&mut self, text: &str, declared_type: ParamType) -> usize {
        if let Some(idx) = self.entries.iter().position(|e| e.expression_text == text) {
            return idx;
        }
        self.entries.push(ExpressionTableEntry { expression_text: text.to_string(), declared_type });
        self.entries.len() - 1
    }
}

enum FrameKind {
    If,
    For,
}

struct Frame {
    kind: FrameKind,
    /// True when the literal run immediately preceding this frame's open
    /// was classified as an orphan connector and wrapped in
    /// `EmitUnlessBoundary`; on close, a `Boundary` instruction follows.
    connector_guarded: bool,
}

/// Lowers a directive-overlay event stream (the output of
/// [`snapsql_parser::parse_directives`]) into a linear instruction list and
/// an expression table, in source order.
///
/// `scope` supplies the declared/implicit parameter types visible at the
/// top level; `FOR` regions extend it with their loop variable for the
/// duration of the region.
pub fn emit(events: &[DirectiveEvent], scope: &Scope) -> Result<(Vec<Instruction>, Vec<ExpressionTableEntry>, Vec<String>), EmitError> {
    let mut lowering = Lowering {
        instructions: vec![],
        exprs: ExprTable::default(),
        const_names: vec![],
        buffer: vec![],
        frames: vec![],
        scopes: vec![scope.clone()],
    };
    for event in events {
        lowering.step(event)?;
    }
    lowering.flush_literal(false);
    tracing::debug!(
        events = events.len(),
        instructions = lowering.instructions.len(),
        expressions = lowering.exprs.entries.len(),
        "emitted instruction stream"
    );
    Ok((lowering.instructions, lowering.exprs.entries, lowering.const_names))
}

struct Lowering {
    instructions: Vec<Instruction>,
    exprs: ExprTable,
    const_names: Vec<String>,
    buffer: Vec<Token>,
    frames: Vec<Frame>,
    scopes: Vec<Scope>,
}

impl Lowering {
    fn scope(&self) -> &Scope {
        self.scopes.last().expect("base scope always present")
    }

    fn step(&mut self, event: &DirectiveEvent) -> Result<(), EmitError> {
        match event {
            DirectiveEvent::Token(tok) => {
                self.buffer.push(tok.clone());
                Ok(())
            }
            DirectiveEvent::VariableEmit { expr, pos } => {
                self.flush_literal(false);
                self.emit_variable(expr, *pos)
            }
            DirectiveEvent::If { expr, pos } => {
                let candidate = self.frames.is_empty();
                let guarded = self.flush_literal(candidate);
                let idx = self.compile_condition(expr, *pos)?;
                self.instructions.push(Instruction::If { expr_index: idx, pos: *pos });
                self.frames.push(Frame { kind: FrameKind::If, connector_guarded: guarded });
                Ok(())
            }
            DirectiveEvent::ElseIf { expr, pos } => {
                self.flush_literal(false);
                let idx = self.compile_condition(expr, *pos)?;
                self.instructions.push(Instruction::ElseIf { expr_index: idx, pos: *pos });
                Ok(())
            }
            DirectiveEvent::Else { pos } => {
                self.flush_literal(false);
                self.instructions.push(Instruction::Else { pos: *pos });
                Ok(())
            }
            DirectiveEvent::EndIf { pos } => {
                self.flush_literal(false);
                self.instructions.push(Instruction::End { pos: *pos });
                let frame = self.frames.pop().expect("balanced by snapsql_parser");
                if frame.connector_guarded {
                    self.instructions.push(Instruction::Boundary { pos: *pos });
                }
                Ok(())
            }
            DirectiveEvent::ForStart { var, expr, pos } => {
                let candidate = self.frames.is_empty();
                let guarded = self.flush_literal(candidate);
                let parsed = parse_cached(expr).map_err(EmitError::from)?;
                let ty = check(&parsed, self.scope(), expr).map_err(EmitError::from)?;
                let elem_ty = match &ty {
                    ParamType::Array(inner) => (**inner).clone(),
                    other => {
                        return Err(EmitError::CollectionNotArray { expr: expr.clone(), ty: other.clone(), pos: *pos })
                    }
                };
                let idx = self.exprs.intern(expr, ty);
                self.instructions.push(Instruction::LoopStart { var_name: var.clone(), expr_index: idx, pos: *pos });
                self.scopes.push(self.scope().with_loop_var(var, elem_ty));
                self.frames.push(Frame { kind: FrameKind::For, connector_guarded: guarded });
                Ok(())
            }
            DirectiveEvent::ForEnd { var, pos } => {
                self.flush_literal(false);
                self.instructions.push(Instruction::LoopEnd { var_name: var.clone(), pos: *pos });
                let frame = self.frames.pop().expect("balanced by snapsql_parser");
                debug_assert!(matches!(frame.kind, FrameKind::For));
                self.scopes.pop();
                if frame.connector_guarded {
                    self.instructions.push(Instruction::Boundary { pos: *pos });
                }
                Ok(())
            }
            DirectiveEvent::Const { name, pos } => {
                self.flush_literal(false);
                check(&Expr::Ident(name.clone()), self.scope(), name)
                    .map_err(|_| EmitError::UndeclaredConst { name: name.clone(), pos: *pos })?;
                self.instructions.push(Instruction::Nop { pos: *pos });
                self.const_names.push(name.clone());
                Ok(())
            }
            DirectiveEvent::SystemLimit { pos } => {
                self.flush_literal(false);
                self.instructions.push(Instruction::IfSystemLimit { pos: *pos });
                self.instructions.push(Instruction::EmitSystemLimit { pos: *pos });
                self.instructions.push(Instruction::End { pos: *pos });
                Ok(())
            }
            DirectiveEvent::SystemOffset { pos } => {
                self.flush_literal(false);
                self.instructions.push(Instruction::IfSystemOffset { pos: *pos });
                self.instructions.push(Instruction::EmitSystemOffset { pos: *pos });
                self.instructions.push(Instruction::End { pos: *pos });
                Ok(())
            }
            DirectiveEvent::SystemExplain { pos } => {
                self.flush_literal(false);
                self.instructions.push(Instruction::EmitSystemValue { key: "explain".to_string(), pos: *pos });
                Ok(())
            }
        }
    }

    fn compile_condition(&mut self, expr: &str, pos: snapsql_core::Position) -> Result<usize, EmitError> {
        let parsed = parse_cached(expr).map_err(EmitError::from)?;
        let ty = check(&parsed, self.scope(), expr).map_err(EmitError::from)?;
        if ty != ParamType::Bool {
            return Err(EmitError::ConditionNotBoolean { expr: expr.to_string(), ty, pos });
        }
        Ok(self.exprs.intern(expr, ty))
    }

    fn emit_variable(&mut self, expr: &str, pos: snapsql_core::Position) -> Result<(), EmitError> {
        let parsed = parse_cached(expr).map_err(EmitError::from)?;
        let ty = check(&parsed, self.scope(), expr).map_err(EmitError::from)?;
        if !ty.is_bindable_scalar() {
            return Err(EmitError::NotBindableScalar { expr: expr.to_string(), ty, pos });
        }
        if let Expr::Ident(name) = &parsed {
            self.instructions.push(Instruction::EmitParam { name: name.clone(), pos });
        } else {
            let idx = self.exprs.intern(expr, ty);
            self.instructions.push(Instruction::EmitEval { expr_index: idx, pos });
        }
        Ok(())
    }

    /// Flushes the pending literal token buffer as a single instruction.
    /// Returns `true` if it was classified as an orphan connector (`AND`,
    /// `OR`, a bare comma, or a clause-opening `WHERE`) and wrapped as
    /// `EmitUnlessBoundary` rather than `EmitStatic`; `candidate` gates
    /// this classification to buffers sitting directly against a
    /// top-level conditional/loop region boundary.
    fn flush_literal(&mut self, candidate: bool) -> bool {
        if self.buffer.is_empty() {
            return false;
        }
        if candidate {
            if let Some(split_at) = trailing_connector_start(&self.buffer) {
                let connector_run = self.buffer.split_off(split_at);
                let prefix = std::mem::take(&mut self.buffer);
                self.push_static(&prefix);
                self.push_unless_boundary(&connector_run);
                return true;
            }
        }
        let buffer = std::mem::take(&mut self.buffer);
        self.push_static(&buffer);
        false
    }

    fn push_static(&mut self, tokens: &[Token]) {
        if tokens.is_empty() {
            return;
        }
        let pos = tokens[0].pos;
        let value = render_tokens(tokens);
        self.instructions.push(Instruction::EmitStatic { value, pos });
    }

    fn push_unless_boundary(&mut self, tokens: &[Token]) {
        let pos = tokens[0].pos;
        let value = render_tokens(tokens);
        self.instructions.push(Instruction::EmitUnlessBoundary { value, pos });
    }
}

fn render_tokens(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.kind.to_string()).collect()
}

/// If the trailing significant token of `buffer` is an orphan-connector
/// keyword/punctuation (`AND`, `OR`, `WHERE`, `,`), returns the start of its
/// connector run: that token plus any whitespace/comments immediately
/// before *and* after it. Pulling the leading whitespace in with it (rather
/// than leaving it on the static prefix) keeps the prefix free of a
/// trailing space that would otherwise survive even when the connector
/// itself is later dropped for having no content to introduce.
fn trailing_connector_start(buffer: &[Token]) -> Option<usize> {
    let mut significant_positions = buffer.iter().enumerate().filter(|(_, t)| !t.is_whitespace() && !t.is_comment());
    let (last_idx, last_tok) = significant_positions.next_back()?;
    let is_connector =
        last_tok.is_keyword(Keyword::And) || last_tok.is_keyword(Keyword::Or) || last_tok.is_keyword(Keyword::Where) || matches!(last_tok.kind, TokenKind::Comma);
    if !is_connector {
        return None;
    }
    let mut start = last_idx;
    while start > 0 && (buffer[start - 1].is_whitespace() || buffer[start - 1].is_comment()) {
        start -= 1;
    }
    Some(start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapsql_ast::{ParameterEntry, ParameterSchema};
    use snapsql_core::Value;
    use snapsql_lexer::Lexer;
    use snapsql_parser::parse_directives;

    fn lower(sql: &str, params: &[(&str, ParamType)]) -> Vec<Instruction> {
        let tokens = Lexer::new(sql).tokenize().unwrap();
        let events = parse_directives(&tokens).unwrap();
        let schema = ParameterSchema {
            entries: params
                .iter()
                .map(|(name, ty)| ParameterEntry {
                    name: name.to_string(),
                    ty: ty.clone(),
                    description: None,
                    optional: true,
                    default: Some(Value::Null),
                })
                .collect(),
        };
        let scope = Scope::new(&schema, &[]);
        emit(&events, &scope).unwrap().0
    }

    #[test]
    fn bare_identifier_variable_uses_emit_param() {
        let instrs = lower("/*= user_id */0", &[("user_id", ParamType::Int)]);
        assert!(matches!(&instrs[0], Instruction::EmitParam { name, .. } if name == "user_id"));
    }

    #[test]
    fn conditional_column_lowers_to_if_end() {
        let instrs = lower(
            "SELECT id/*# if include_email */, email/*# end */ FROM users",
            &[("include_email", ParamType::Bool)],
        );
        assert!(instrs.iter().any(|i| matches!(i, Instruction::If { .. })));
        assert!(instrs.iter().any(|i| matches!(i, Instruction::End { .. })));
        assert!(!instrs.iter().any(|i| matches!(i, Instruction::EmitUnlessBoundary { .. })));
    }

    #[test]
    fn orphan_and_between_conditions_is_boundary_guarded() {
        let instrs = lower(
            "SELECT * FROM t WHERE /*# if a */a=1/*# end */ AND /*# if b */b=2/*# end */",
            &[("a", ParamType::Bool), ("b", ParamType::Bool)],
        );
        let connector_texts: Vec<&str> = instrs
            .iter()
            .filter_map(|i| match i {
                Instruction::EmitUnlessBoundary { value, .. } => Some(value.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(connector_texts, vec![" WHERE ", " AND "]);
        assert_eq!(instrs.iter().filter(|i| matches!(i, Instruction::Boundary { .. })).count(), 2);
    }

    #[test]
    fn loop_binds_element_type_and_shadows() {
        let instrs = lower(
            "SELECT /*# for f : fields */ /*= f */x , /*# end */ 1 FROM t",
            &[("fields", ParamType::Array(Box::new(ParamType::String)))],
        );
        assert!(matches!(&instrs[0], Instruction::EmitStatic { .. }));
        assert!(instrs.iter().any(|i| matches!(i, Instruction::LoopStart { var_name, .. } if var_name == "f")));
        assert!(instrs.iter().any(|i| matches!(i, Instruction::EmitParam { name, .. } if name == "f")));
    }

    #[test]
    fn non_boolean_condition_is_rejected() {
        let tokens = Lexer::new("/*# if n */x/*# end */").tokenize().unwrap();
        let events = parse_directives(&tokens).unwrap();
        let schema = ParameterSchema {
            entries: vec![ParameterEntry { name: "n".to_string(), ty: ParamType::Int, description: None, optional: false, default: None }],
        };
        let scope = Scope::new(&schema, &[]);
        assert!(matches!(emit(&events, &scope), Err(EmitError::ConditionNotBoolean { .. })));
    }

    #[test]
    fn system_limit_lowers_to_guarded_emit() {
        let instrs = lower("SELECT 1 /*@ limit */", &[]);
        assert!(matches!(instrs[instrs.len() - 3], Instruction::IfSystemLimit { .. }));
        assert!(matches!(instrs[instrs.len() - 2], Instruction::EmitSystemLimit { .. }));
        assert!(matches!(instrs[instrs.len() - 1], Instruction::End { .. }));
    }
}
