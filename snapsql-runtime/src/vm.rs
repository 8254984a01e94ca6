use std::collections::HashMap;

use snapsql_ast::{ExpressionTableEntry, Instruction};
use snapsql_core::{Dialect, Value};
use snapsql_expr::{eval, parse_cached, ExpressionEvalError};

use crate::postprocess::{finalize, RuntimeOptions};

/// A pushed `IF`/`ELSE_IF`/`ELSE` (or system-guard) frame.
struct CondFrame {
    /// Whether the body currently executing under this frame emits.
    active: bool,
    /// Whether some branch of this frame has already been taken, so later
    /// `ELSE_IF`/`ELSE` bodies in the same chain stay inactive.
    matched: bool,
}

/// A pushed `FOR` loop's iteration state.
struct LoopFrame {
    var_name: String,
    /// The value `var_name` was bound to before this loop started, if any,
    /// restored once the loop finishes.
    saved: Option<Value>,
    items: Vec<Value>,
    index: usize,
    /// The instruction immediately after `LOOP_START`, jumped back to for
    /// each subsequent element.
    start_pc: usize,
}

/// Executes `instructions` against `params`, producing materialized SQL
/// text and an ordered bind-argument vector (§4.9).
///
/// A single pass over the instruction stream with a program counter, a
/// condition stack, a loop stack, and a deferred-connector queue gated by
/// `had_content_since_boundary`. `dialect` and `options` additionally
/// drive system directives (`LIMIT`/`OFFSET`/`EXPLAIN`) and the
/// post-processing passes that follow the main pass.
pub fn run(
    instructions: &[Instruction],
    expr_table: &[ExpressionTableEntry],
    params: &HashMap<String, Value>,
    dialect: Dialect,
    options: &RuntimeOptions,
) -> Result<(String, Vec<Value>), ExpressionEvalError> {
    let _span = tracing::debug_span!("vm_run", instructions = instructions.len(), dialect = %dialect).entered();
    let mut vm = Vm {
        vars: params.clone(),
        dialect,
        cond_stack: vec![],
        loop_stack: vec![],
        pending: vec![],
        had_content: false,
        sql: String::new(),
        args: vec![],
    };
    let mut pc = 0;
    while pc < instructions.len() {
        pc = vm.step(pc, instructions, expr_table, options)?;
    }
    tracing::trace!(sql = %vm.sql, args = vm.args.len(), "vm run complete");
    Ok(finalize(vm.sql, vm.args, dialect, options))
}

struct Vm {
    vars: HashMap<String, Value>,
    dialect: Dialect,
    cond_stack: Vec<CondFrame>,
    loop_stack: Vec<LoopFrame>,
    pending: Vec<String>,
    had_content: bool,
    sql: String,
    args: Vec<Value>,
}

impl Vm {
    /// True when every frame on the condition stack is active. Emission
    /// instructions are no-ops whenever this is false.
    fn is_active(&self) -> bool {
        self.cond_stack.iter().all(|f| f.active)
    }

    /// True when every frame *enclosing* the top one is active — used by
    /// `ELSE_IF`/`ELSE` to decide whether their own frame may activate.
    fn ancestors_active(&self) -> bool {
        let len = self.cond_stack.len();
        len == 0 || self.cond_stack[..len - 1].iter().all(|f| f.active)
    }

    /// Resolves an expression table entry's text to a value: a direct
    /// parameter-map lookup by text equality first, the compiled
    /// expression evaluator otherwise (§4.9's fast path).
    fn resolve(&self, text: &str) -> Result<Value, ExpressionEvalError> {
        if let Some(value) = self.vars.get(text) {
            return Ok(value.clone());
        }
        let parsed = parse_cached(text).map_err(|e| ExpressionEvalError::Reparse(e.to_string()))?;
        eval(&parsed, &self.vars)
    }

    /// Appends `text` to `sql`, dropping its leading whitespace if `sql`
    /// already ends in whitespace. Static runs either side of a
    /// conditional/loop region boundary are lowered independently and each
    /// keeps whatever whitespace borders the region in its own source text,
    /// so the run that actually lands second at a given boundary — which
    /// one that is depends on which regions were active — is the one that
    /// needs trimming here.
    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.sql.ends_with(char::is_whitespace) {
            let trimmed = text.trim_start_matches(char::is_whitespace);
            if !trimmed.is_empty() {
                self.sql.push_str(trimmed);
            }
        } else {
            self.sql.push_str(text);
        }
    }

    fn flush_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for text in pending {
            self.push_text(&text);
        }
    }

    fn emit(&mut self, text: &str) {
        self.flush_pending();
        self.had_content = true;
        self.push_text(text);
    }

    fn step(
        &mut self,
        pc: usize,
        instructions: &[Instruction],
        expr_table: &[ExpressionTableEntry],
        options: &RuntimeOptions,
    ) -> Result<usize, ExpressionEvalError> {
        tracing::trace!(pc, instruction = ?instructions[pc], "dispatch");
        match &instructions[pc] {
            Instruction::EmitStatic { value, .. } => {
                if self.is_active() {
                    self.emit(value);
                }
                Ok(pc + 1)
            }
            Instruction::EmitParam { name, .. } => {
                if self.is_active() {
                    let value = self.vars.get(name).cloned().ok_or_else(|| ExpressionEvalError::UnboundVariable(name.clone()))?;
                    self.emit("?");
                    self.args.push(value);
                }
                Ok(pc + 1)
            }
            Instruction::EmitEval { expr_index, .. } => {
                if self.is_active() {
                    let value = self.resolve(&expr_table[*expr_index].expression_text)?;
                    self.emit("?");
                    self.args.push(value);
                }
                Ok(pc + 1)
            }
            Instruction::EmitUnlessBoundary { value, .. } => {
                if self.is_active() {
                    self.pending.push(value.clone());
                    // Tracks content emitted *since this connector was queued*,
                    // not since the last boundary overall — otherwise
                    // unrelated static text earlier in the statement would
                    // keep an orphan connector alive.
                    self.had_content = false;
                }
                Ok(pc + 1)
            }
            Instruction::Boundary { .. } => {
                if self.is_active() {
                    if self.had_content {
                        self.flush_pending();
                    } else {
                        self.pending.clear();
                    }
                    self.had_content = false;
                }
                Ok(pc + 1)
            }
            Instruction::If { expr_index, .. } => {
                let parent_active = self.is_active();
                let active = parent_active && self.resolve(&expr_table[*expr_index].expression_text)?.is_truthy();
                self.cond_stack.push(CondFrame { active, matched: active });
                Ok(pc + 1)
            }
            Instruction::ElseIf { expr_index, .. } => {
                let ancestors_active = self.ancestors_active();
                let already_matched = self.cond_stack.last().expect("balanced by the emitter").matched;
                let active = if ancestors_active && !already_matched {
                    self.resolve(&expr_table[*expr_index].expression_text)?.is_truthy()
                } else {
                    false
                };
                let top = self.cond_stack.last_mut().expect("balanced by the emitter");
                top.active = active;
                top.matched |= active;
                Ok(pc + 1)
            }
            Instruction::Else { .. } => {
                let ancestors_active = self.ancestors_active();
                let top = self.cond_stack.last_mut().expect("balanced by the emitter");
                let active = ancestors_active && !top.matched;
                top.active = active;
                top.matched |= active;
                Ok(pc + 1)
            }
            Instruction::End { .. } => {
                self.cond_stack.pop().expect("balanced by the emitter");
                Ok(pc + 1)
            }
            Instruction::LoopStart { var_name, expr_index, .. } => {
                if !self.is_active() {
                    let end = matching_loop_end(instructions, pc).expect("balanced by the emitter");
                    return Ok(end + 1);
                }
                let collection = self.resolve(&expr_table[*expr_index].expression_text)?;
                let items = match collection {
                    Value::Array(items) => items,
                    other => return Err(ExpressionEvalError::NotIndexable(other.type_name())),
                };
                if items.is_empty() {
                    let end = matching_loop_end(instructions, pc).expect("balanced by the emitter");
                    return Ok(end + 1);
                }
                let saved = self.vars.insert(var_name.clone(), items[0].clone());
                self.loop_stack.push(LoopFrame { var_name: var_name.clone(), saved, items, index: 0, start_pc: pc + 1 });
                Ok(pc + 1)
            }
            Instruction::LoopEnd { var_name, .. } => {
                let mut frame = self.loop_stack.pop().expect("LoopStart always pushes a frame before a reached LoopEnd");
                debug_assert_eq!(&frame.var_name, var_name);
                frame.index += 1;
                if frame.index < frame.items.len() {
                    let next_value = frame.items[frame.index].clone();
                    self.vars.insert(frame.var_name.clone(), next_value);
                    let start_pc = frame.start_pc;
                    self.loop_stack.push(frame);
                    Ok(start_pc)
                } else {
                    match frame.saved {
                        Some(previous) => {
                            self.vars.insert(frame.var_name, previous);
                        }
                        None => {
                            self.vars.remove(&frame.var_name);
                        }
                    }
                    Ok(pc + 1)
                }
            }
            Instruction::IfSystemLimit { .. } => {
                let active = self.is_active() && options.limit.is_some();
                self.cond_stack.push(CondFrame { active, matched: active });
                Ok(pc + 1)
            }
            Instruction::IfSystemOffset { .. } => {
                let active = self.is_active() && options.offset.is_some();
                self.cond_stack.push(CondFrame { active, matched: active });
                Ok(pc + 1)
            }
            Instruction::EmitSystemLimit { .. } => {
                if self.is_active() {
                    if let Some(limit) = options.limit {
                        // Inlined, not bound.
                        self.emit(&format!(" LIMIT {limit}"));
                    }
                }
                Ok(pc + 1)
            }
            Instruction::EmitSystemOffset { .. } => {
                if self.is_active() {
                    if let Some(offset) = options.offset {
                        self.emit(&format!(" OFFSET {offset}"));
                    }
                }
                Ok(pc + 1)
            }
            Instruction::EmitSystemValue { key, .. } => {
                if self.is_active() && key == "explain" && options.explain {
                    let prefix = self.dialect.explain_prefix(options.explain_analyze).to_string();
                    self.emit(&prefix);
                    self.emit(" ");
                }
                Ok(pc + 1)
            }
            Instruction::Nop { .. } => Ok(pc + 1),
        }
    }
}

/// Scans forward from `start` (a `LOOP_START`) for its matching
/// `LOOP_END`, counting nested loop depth so interior loops don't
/// mismatch.
fn matching_loop_end(instructions: &[Instruction], start: usize) -> Option<usize> {
    let mut depth = 0;
    for (i, instr) in instructions.iter().enumerate().skip(start) {
        match instr {
            Instruction::LoopStart { .. } => depth += 1,
            Instruction::LoopEnd { .. } => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
