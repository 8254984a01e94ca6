use std::collections::HashMap;

use snapsql_ast::{ImplicitParameter, ParameterSchema};
use snapsql_core::ParamType;

use crate::ast::{BinOp, Expr, Literal, UnOp};
use crate::error::ExpressionCompileError;

/// The variable bindings visible while type-checking an expression: the
/// declared parameter schema, implicit parameters, and any loop variables
/// introduced by enclosing `FOR` directives. Loop variables shadow
/// parameters of the same name.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    vars: HashMap<String, ParamType>,
}

impl Scope {
    /// Builds the base scope from a template's declared and implicit
    /// parameters.
    pub fn new(params: &ParameterSchema, implicit: &[ImplicitParameter]) -> Self {
        let mut vars = HashMap::new();
        for entry in &params.entries {
            vars.insert(entry.name.clone(), entry.ty.clone());
        }
        for param in implicit {
            vars.insert(param.name.clone(), param.ty.clone());
        }
        Self { vars }
    }

    /// Returns a child scope with `name` bound to `ty`, shadowing any
    /// outer binding of the same name; used when entering a `FOR` body.
    pub fn with_loop_var(&self, name: &str, ty: ParamType) -> Self {
        let mut vars = self.vars.clone();
        vars.insert(name.to_string(), ty);
        Self { vars }
    }

    fn lookup(&self, name: &str) -> Option<&ParamType> {
        self.vars.get(name)
    }
}

/// Type-checks `expr` against `scope`, returning its inferred type.
///
/// `source` is the original expression text, reproduced in error messages;
/// callers parse once per directive and pass the same string in for both
/// [`crate::parser::parse`] and this call.
pub fn check(expr: &Expr, scope: &Scope, source: &str) -> Result<ParamType, ExpressionCompileError> {
    match expr {
        Expr::Ident(name) => scope.lookup(name).cloned().ok_or_else(|| ExpressionCompileError::UndeclaredVariable {
            expr: source.to_string(),
            name: name.clone(),
        }),
        Expr::Literal(lit) => Ok(literal_type(lit)),
        Expr::Field(base, field) => {
            let base_ty = check(base, scope, source)?;
            match &base_ty {
                ParamType::Object(fields) => fields.get(field).cloned().ok_or_else(|| ExpressionCompileError::NoSuchMember {
                    expr: source.to_string(),
                    base: base_ty.clone(),
                    member: field.clone(),
                }),
                ParamType::Json => Ok(ParamType::Json),
                _ => Err(ExpressionCompileError::NoSuchMember {
                    expr: source.to_string(),
                    base: base_ty,
                    member: field.clone(),
                }),
            }
        }
        Expr::Index(base, index) => {
            let base_ty = check(base, scope, source)?;
            let index_ty = check(index, scope, source)?;
            if !matches!(index_ty, ParamType::Int | ParamType::Json) {
                return Err(ExpressionCompileError::TypeMismatch {
                    expr: source.to_string(),
                    op: "[]".to_string(),
                    lhs: index_ty,
                    rhs: None,
                });
            }
            match &base_ty {
                ParamType::Array(inner) => Ok((**inner).clone()),
                ParamType::Json => Ok(ParamType::Json),
                _ => Err(ExpressionCompileError::NoSuchMember {
                    expr: source.to_string(),
                    base: base_ty,
                    member: "[]".to_string(),
                }),
            }
        }
        Expr::Unary(UnOp::Not, inner) => {
            let ty = check(inner, scope, source)?;
            require_bool(&ty, "!", source)?;
            Ok(ParamType::Bool)
        }
        Expr::Unary(UnOp::Neg, inner) => {
            let ty = check(inner, scope, source)?;
            require_numeric(&ty, "-", source)?;
            Ok(ty)
        }
        Expr::Binary(BinOp::And, lhs, rhs) | Expr::Binary(BinOp::Or, lhs, rhs) => {
            let op = if matches!(expr, Expr::Binary(BinOp::And, ..)) { "&&" } else { "||" };
            let lty = check(lhs, scope, source)?;
            let rty = check(rhs, scope, source)?;
            require_bool(&lty, op, source)?;
            require_bool(&rty, op, source)?;
            Ok(ParamType::Bool)
        }
        Expr::Binary(op @ (BinOp::Eq | BinOp::Ne), lhs, rhs) => {
            let lty = check(lhs, scope, source)?;
            let rty = check(rhs, scope, source)?;
            if lty != rty && !matches!(lty, ParamType::Json) && !matches!(rty, ParamType::Json) {
                return Err(ExpressionCompileError::TypeMismatch {
                    expr: source.to_string(),
                    op: if matches!(op, BinOp::Eq) { "==" } else { "!=" }.to_string(),
                    lhs: lty,
                    rhs: Some(rty),
                });
            }
            Ok(ParamType::Bool)
        }
        Expr::Binary(op @ (BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge), lhs, rhs) => {
            let lty = check(lhs, scope, source)?;
            let rty = check(rhs, scope, source)?;
            let sym = comparison_symbol(*op);
            require_numeric(&lty, sym, source)?;
            require_numeric(&rty, sym, source)?;
            Ok(ParamType::Bool)
        }
        Expr::Binary(BinOp::Add, lhs, rhs) => {
            let lty = check(lhs, scope, source)?;
            let rty = check(rhs, scope, source)?;
            if lty == ParamType::String && rty == ParamType::String {
                return Ok(ParamType::String);
            }
            arithmetic_result(&lty, &rty, "+", source)
        }
        Expr::Binary(op @ (BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem), lhs, rhs) => {
            let lty = check(lhs, scope, source)?;
            let rty = check(rhs, scope, source)?;
            let sym = arithmetic_symbol(*op);
            arithmetic_result(&lty, &rty, sym, source)
        }
        Expr::Ternary(cond, then, else_) => {
            let cty = check(cond, scope, source)?;
            require_bool(&cty, "?:", source)?;
            let tty = check(then, scope, source)?;
            let ety = check(else_, scope, source)?;
            if tty == ety || matches!(tty, ParamType::Json) {
                Ok(tty)
            } else if matches!(ety, ParamType::Json) {
                Ok(ety)
            } else {
                Err(ExpressionCompileError::TypeMismatch {
                    expr: source.to_string(),
                    op: "?:".to_string(),
                    lhs: tty,
                    rhs: Some(ety),
                })
            }
        }
        Expr::Call(name, args) => check_call(name, args, scope, source),
    }
}

fn literal_type(lit: &Literal) -> ParamType {
    match lit {
        Literal::Number(n) if n.fract() == 0.0 => ParamType::Int,
        Literal::Number(_) => ParamType::Float,
        Literal::Str(_) => ParamType::String,
        Literal::Bool(_) => ParamType::Bool,
        Literal::Null => ParamType::Json,
    }
}

fn require_bool(ty: &ParamType, op: &str, source: &str) -> Result<(), ExpressionCompileError> {
    if matches!(ty, ParamType::Bool) {
        Ok(())
    } else {
        Err(ExpressionCompileError::TypeMismatch {
            expr: source.to_string(),
            op: op.to_string(),
            lhs: ty.clone(),
            rhs: None,
        })
    }
}

fn require_numeric(ty: &ParamType, op: &str, source: &str) -> Result<(), ExpressionCompileError> {
    if matches!(ty, ParamType::Int | ParamType::Float) {
        Ok(())
    } else {
        Err(ExpressionCompileError::TypeMismatch {
            expr: source.to_string(),
            op: op.to_string(),
            lhs: ty.clone(),
            rhs: None,
        })
    }
}

fn arithmetic_result(lhs: &ParamType, rhs: &ParamType, op: &str, source: &str) -> Result<ParamType, ExpressionCompileError> {
    require_numeric(lhs, op, source)?;
    require_numeric(rhs, op, source)?;
    if *lhs == ParamType::Float || *rhs == ParamType::Float {
        Ok(ParamType::Float)
    } else {
        Ok(ParamType::Int)
    }
}

fn comparison_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
        _ => unreachable!(),
    }
}

fn arithmetic_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Rem => "%",
        _ => unreachable!(),
    }
}

fn check_call(name: &str, args: &[Expr], scope: &Scope, source: &str) -> Result<ParamType, ExpressionCompileError> {
    match name {
        "len" => {
            if args.len() != 1 {
                return Err(ExpressionCompileError::BadCall {
                    expr: source.to_string(),
                    name: name.to_string(),
                    reason: "expects exactly one argument".to_string(),
                });
            }
            let ty = check(&args[0], scope, source)?;
            match ty {
                ParamType::Array(_) | ParamType::String | ParamType::Json => Ok(ParamType::Int),
                other => Err(ExpressionCompileError::BadCall {
                    expr: source.to_string(),
                    name: name.to_string(),
                    reason: format!("cannot take the length of a {other}"),
                }),
            }
        }
        "has" => {
            if args.len() != 2 {
                return Err(ExpressionCompileError::BadCall {
                    expr: source.to_string(),
                    name: name.to_string(),
                    reason: "expects exactly two arguments (value, field name)".to_string(),
                });
            }
            check(&args[0], scope, source)?;
            let field_ty = check(&args[1], scope, source)?;
            if field_ty != ParamType::String {
                return Err(ExpressionCompileError::BadCall {
                    expr: source.to_string(),
                    name: name.to_string(),
                    reason: "the field name argument must be a string".to_string(),
                });
            }
            Ok(ParamType::Bool)
        }
        "default" => {
            if args.len() != 2 {
                return Err(ExpressionCompileError::BadCall {
                    expr: source.to_string(),
                    name: name.to_string(),
                    reason: "expects exactly two arguments (value, fallback)".to_string(),
                });
            }
            let primary = check(&args[0], scope, source)?;
            let fallback = check(&args[1], scope, source)?;
            if primary == fallback || matches!(primary, ParamType::Json) {
                Ok(fallback)
            } else if matches!(fallback, ParamType::Json) {
                Ok(primary)
            } else {
                Err(ExpressionCompileError::TypeMismatch {
                    expr: source.to_string(),
                    op: "default".to_string(),
                    lhs: primary,
                    rhs: Some(fallback),
                })
            }
        }
        other => Err(ExpressionCompileError::BadCall {
            expr: source.to_string(),
            name: other.to_string(),
            reason: "unknown function".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapsql_ast::ParameterEntry;

    fn schema() -> ParameterSchema {
        ParameterSchema {
            entries: vec![
                ParameterEntry {
                    name: "limit".to_string(),
                    ty: ParamType::Int,
                    description: None,
                    optional: false,
                    default: None,
                },
                ParameterEntry {
                    name: "name".to_string(),
                    ty: ParamType::String,
                    description: None,
                    optional: true,
                    default: None,
                },
            ],
        }
    }

    #[test]
    fn looks_up_declared_parameter_type() {
        let scope = Scope::new(&schema(), &[]);
        let expr = crate::parser::parse("limit > 0").unwrap();
        assert_eq!(check(&expr, &scope, "limit > 0").unwrap(), ParamType::Bool);
    }

    #[test]
    fn undeclared_variable_is_rejected() {
        let scope = Scope::new(&schema(), &[]);
        let expr = crate::parser::parse("missing").unwrap();
        assert!(matches!(
            check(&expr, &scope, "missing"),
            Err(ExpressionCompileError::UndeclaredVariable { .. })
        ));
    }

    #[test]
    fn if_condition_must_be_boolean() {
        let scope = Scope::new(&schema(), &[]);
        let expr = crate::parser::parse("limit").unwrap();
        assert!(matches!(
            check(&expr, &scope, "limit"),
            Err(ExpressionCompileError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn loop_variable_shadows_parameter() {
        let outer = Scope::new(&schema(), &[]);
        let inner = outer.with_loop_var("name", ParamType::Int);
        let expr = crate::parser::parse("name + 1").unwrap();
        assert_eq!(check(&expr, &inner, "name + 1").unwrap(), ParamType::Int);
    }

    #[test]
    fn mixed_int_float_arithmetic_promotes_to_float() {
        let scope = Scope::new(&schema(), &[]);
        let expr = crate::parser::parse("limit + 1.5").unwrap();
        assert_eq!(check(&expr, &scope, "limit + 1.5").unwrap(), ParamType::Float);
    }
}
