use std::collections::BTreeSet;

use snapsql_ast::{DependencyMetadata, ExpressionTableEntry, Instruction};
use snapsql_core::Dialect;
use snapsql_expr::{parse_cached, Expr};

use crate::error::OptimizeError;

/// Runs the instruction-stream optimizations of §4.8 and computes the
/// dependency metadata persisted alongside the IR: coalesces adjacent
/// static emissions, resolves the dialect-specific shape of system
/// directives where possible, and separates structural from
/// parameter-only variables for the cache key template.
///
/// This pass must be semantics-preserving: evaluating the returned
/// instructions against any parameter map produces byte-identical SQL and
/// argument vectors to evaluating `instructions` directly.
pub fn optimize(
    instructions: Vec<Instruction>,
    expr_table: &[ExpressionTableEntry],
    const_names: &[String],
    dialect: Option<Dialect>,
) -> Result<(Vec<Instruction>, DependencyMetadata), OptimizeError> {
    let before = instructions.len();
    let instructions = coalesce_static(instructions);
    let instructions = resolve_system_ops(instructions, dialect);
    let dependencies = compute_dependencies(&instructions, expr_table, const_names)?;
    tracing::debug!(
        before,
        after = instructions.len(),
        structural_vars = dependencies.structural_vars.len(),
        "optimized instruction stream"
    );
    Ok((instructions, dependencies))
}

/// Merges runs of adjacent `EmitStatic` instructions into one, keeping the
/// position of the first. Every other instruction is a control-flow or
/// bind point the VM must still dispatch individually, so only `EmitStatic`
/// runs are ever adjacent-mergeable.
fn coalesce_static(instructions: Vec<Instruction>) -> Vec<Instruction> {
    let mut out: Vec<Instruction> = Vec::with_capacity(instructions.len());
    for instr in instructions {
        match (out.last_mut(), &instr) {
            (Some(Instruction::EmitStatic { value, .. }), Instruction::EmitStatic { value: next, .. }) => {
                value.push_str(next);
            }
            _ => out.push(instr),
        }
    }
    out
}

/// Resolves `EMIT_SYSTEM_LIMIT`/`EMIT_SYSTEM_OFFSET` into dialect-specific
/// form when the dialect is known at compile time.
///
/// For the three dialects this workspace supports, `LIMIT ?`/`OFFSET ?`
/// syntax is identical, so there is nothing to rewrite today; this hook
/// exists so a dialect with different pagination syntax (e.g. a `FETCH
/// FIRST n ROWS ONLY` style) can be added here without touching the VM's
/// dispatch loop. When `dialect` is `None`, the VM resolves the syntax
/// itself at evaluation time from its own dialect input.
fn resolve_system_ops(instructions: Vec<Instruction>, _dialect: Option<Dialect>) -> Vec<Instruction> {
    instructions
}

fn collect_idents(expr: &Expr, out: &mut BTreeSet<String>) {
    match expr {
        Expr::Ident(name) => {
            out.insert(name.clone());
        }
        Expr::Literal(_) => {}
        Expr::Field(base, _) => collect_idents(base, out),
        Expr::Index(base, index) => {
            collect_idents(base, out);
            collect_idents(index, out);
        }
        Expr::Unary(_, inner) => collect_idents(inner, out),
        Expr::Binary(_, lhs, rhs) => {
            collect_idents(lhs, out);
            collect_idents(rhs, out);
        }
        Expr::Ternary(cond, then, else_) => {
            collect_idents(cond, out);
            collect_idents(then, out);
            collect_idents(else_, out);
        }
        Expr::Call(_, args) => {
            for arg in args {
                collect_idents(arg, out);
            }
        }
    }
}

/// Computes `all_vars`/`structural_vars`/`parameter_vars`/`cache_key_template`
/// (§3's Intermediate Format, "structural variables" in the Glossary).
///
/// A variable is structural if it is referenced by an `IF`/`ELSE_IF`
/// condition, a `FOR` collection, or a `/*# const */` declaration;
/// everything else referenced by an `EMIT_PARAM`/`EMIT_EVAL` is a
/// parameter variable. The cache key template is `"static"` when no
/// structural variables exist, otherwise a deterministic string over their
/// sorted names.
fn compute_dependencies(
    instructions: &[Instruction],
    expr_table: &[ExpressionTableEntry],
    const_names: &[String],
) -> Result<DependencyMetadata, OptimizeError> {
    let mut all_vars = BTreeSet::new();
    let mut structural_vars: BTreeSet<String> = const_names.iter().cloned().collect();

    for instr in instructions {
        match instr {
            Instruction::EmitParam { name, .. } => {
                all_vars.insert(name.clone());
            }
            Instruction::EmitEval { expr_index, .. } => {
                let entry = &expr_table[*expr_index];
                let parsed = parse_cached(&entry.expression_text)
                    .map_err(|_| OptimizeError::UnparsableStructuralExpression(entry.expression_text.clone()))?;
                collect_idents(&parsed, &mut all_vars);
            }
            Instruction::If { expr_index, .. } | Instruction::ElseIf { expr_index, .. } | Instruction::LoopStart { expr_index, .. } => {
                let entry = &expr_table[*expr_index];
                let parsed = parse_cached(&entry.expression_text)
                    .map_err(|_| OptimizeError::UnparsableStructuralExpression(entry.expression_text.clone()))?;
                let mut idents = BTreeSet::new();
                collect_idents(&parsed, &mut idents);
                all_vars.extend(idents.iter().cloned());
                structural_vars.extend(idents);
            }
            _ => {}
        }
    }

    let parameter_vars: BTreeSet<String> = all_vars.difference(&structural_vars).cloned().collect();
    let cache_key_template = if structural_vars.is_empty() {
        "static".to_string()
    } else {
        let joined: Vec<&str> = structural_vars.iter().map(String::as_str).collect();
        format!("shape:{}", joined.join("|"))
    };

    Ok(DependencyMetadata {
        all_vars: all_vars.into_iter().collect(),
        structural_vars: structural_vars.into_iter().collect(),
        parameter_vars: parameter_vars.into_iter().collect(),
        cache_key_template,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapsql_core::Position;

    fn static_at(value: &str) -> Instruction {
        Instruction::EmitStatic { value: value.to_string(), pos: Position::START }
    }

    #[test]
    fn coalesces_adjacent_static_runs() {
        let instrs = vec![static_at("SELECT "), static_at("id "), static_at("FROM t")];
        let merged = coalesce_static(instrs);
        assert_eq!(merged, vec![static_at("SELECT id FROM t")]);
    }

    #[test]
    fn does_not_merge_across_other_instructions() {
        let instrs = vec![
            static_at("WHERE id = "),
            Instruction::EmitParam { name: "id".to_string(), pos: Position::START },
            static_at(" LIMIT 1"),
        ];
        assert_eq!(coalesce_static(instrs).len(), 3);
    }

    #[test]
    fn no_structural_vars_yields_static_cache_key() {
        let instrs = vec![Instruction::EmitParam { name: "id".to_string(), pos: Position::START }];
        let deps = compute_dependencies(&instrs, &[], &[]).unwrap();
        assert_eq!(deps.cache_key_template, "static");
        assert_eq!(deps.parameter_vars, vec!["id".to_string()]);
        assert!(deps.structural_vars.is_empty());
    }

    #[test]
    fn condition_variable_is_structural_not_parameter() {
        let expr_table = vec![ExpressionTableEntry {
            expression_text: "include_email".to_string(),
            declared_type: snapsql_core::ParamType::Bool,
        }];
        let instrs = vec![Instruction::If { expr_index: 0, pos: Position::START }];
        let deps = compute_dependencies(&instrs, &expr_table, &[]).unwrap();
        assert_eq!(deps.structural_vars, vec!["include_email".to_string()]);
        assert!(deps.parameter_vars.is_empty());
        assert_eq!(deps.cache_key_template, "shape:include_email");
    }
}
