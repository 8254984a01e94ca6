use std::collections::HashMap;

use snapsql_core::Value;

use crate::ast::{BinOp, Expr, Literal, UnOp};
use crate::error::ExpressionEvalError;

/// Evaluates `expr` against a flat variable environment, producing a
/// runtime [`Value`]. The environment is expected to already carry the
/// currently active loop variable bindings (the VM overlays and restores
/// them around each iteration); this function does no scoping of its own.
pub fn eval(expr: &Expr, vars: &HashMap<String, Value>) -> Result<Value, ExpressionEvalError> {
    match expr {
        Expr::Ident(name) => vars.get(name).cloned().ok_or_else(|| ExpressionEvalError::UnboundVariable(name.clone())),
        Expr::Literal(lit) => Ok(literal_value(lit)),
        Expr::Field(base, field) => match eval(base, vars)? {
            Value::Object(fields) => Ok(fields.get(field).cloned().unwrap_or(Value::Null)),
            other => Err(ExpressionEvalError::NotIndexable(other.type_name())),
        },
        Expr::Index(base, index) => {
            let base_val = eval(base, vars)?;
            let index_val = eval(index, vars)?;
            match (base_val, index_val) {
                (Value::Array(items), Value::Int(i)) => {
                    let idx = usize::try_from(i).map_err(|_| ExpressionEvalError::InvalidOperand { op: "[]".to_string() })?;
                    Ok(items.get(idx).cloned().unwrap_or(Value::Null))
                }
                (Value::Object(fields), Value::String(key)) => Ok(fields.get(&key).cloned().unwrap_or(Value::Null)),
                (other, _) => Err(ExpressionEvalError::NotIndexable(other.type_name())),
            }
        }
        Expr::Unary(UnOp::Not, inner) => Ok(Value::Bool(!eval(inner, vars)?.is_truthy())),
        Expr::Unary(UnOp::Neg, inner) => match eval(inner, vars)? {
            Value::Int(n) => Ok(Value::Int(-n)),
            Value::Float(n) => Ok(Value::Float(-n)),
            _ => Err(ExpressionEvalError::InvalidOperand { op: "-".to_string() }),
        },
        Expr::Binary(BinOp::And, lhs, rhs) => {
            let l = eval(lhs, vars)?;
            if !l.is_truthy() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(eval(rhs, vars)?.is_truthy()))
        }
        Expr::Binary(BinOp::Or, lhs, rhs) => {
            let l = eval(lhs, vars)?;
            if l.is_truthy() {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(eval(rhs, vars)?.is_truthy()))
        }
        Expr::Binary(BinOp::Eq, lhs, rhs) => Ok(Value::Bool(eval(lhs, vars)? == eval(rhs, vars)?)),
        Expr::Binary(BinOp::Ne, lhs, rhs) => Ok(Value::Bool(eval(lhs, vars)? != eval(rhs, vars)?)),
        Expr::Binary(op @ (BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge), lhs, rhs) => {
            let l = as_f64(&eval(lhs, vars)?, *op)?;
            let r = as_f64(&eval(rhs, vars)?, *op)?;
            Ok(Value::Bool(match op {
                BinOp::Lt => l < r,
                BinOp::Le => l <= r,
                BinOp::Gt => l > r,
                BinOp::Ge => l >= r,
                _ => unreachable!(),
            }))
        }
        Expr::Binary(BinOp::Add, lhs, rhs) => {
            let l = eval(lhs, vars)?;
            let r = eval(rhs, vars)?;
            match (&l, &r) {
                (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
                _ => numeric_binop(&l, &r, BinOp::Add),
            }
        }
        Expr::Binary(op @ (BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem), lhs, rhs) => {
            let l = eval(lhs, vars)?;
            let r = eval(rhs, vars)?;
            numeric_binop(&l, &r, *op)
        }
        Expr::Ternary(cond, then, else_) => {
            if eval(cond, vars)?.is_truthy() {
                eval(then, vars)
            } else {
                eval(else_, vars)
            }
        }
        Expr::Call(name, args) => eval_call(name, args, vars),
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Number(n) if n.fract() == 0.0 => Value::Int(*n as i64),
        Literal::Number(n) => Value::Float(*n),
        Literal::Str(s) => Value::String(s.clone()),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
    }
}

fn as_f64(value: &Value, op: BinOp) -> Result<f64, ExpressionEvalError> {
    match value {
        Value::Int(n) => Ok(*n as f64),
        Value::Float(n) => Ok(*n),
        _ => Err(ExpressionEvalError::InvalidOperand { op: format!("{op:?}") }),
    }
}

fn numeric_binop(lhs: &Value, rhs: &Value, op: BinOp) -> Result<Value, ExpressionEvalError> {
    if let (Value::Int(a), Value::Int(b)) = (lhs, rhs) {
        return Ok(Value::Int(match op {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => a.checked_div(*b).ok_or(ExpressionEvalError::InvalidOperand { op: "/".to_string() })?,
            BinOp::Rem => a.checked_rem(*b).ok_or(ExpressionEvalError::InvalidOperand { op: "%".to_string() })?,
            _ => unreachable!(),
        }));
    }
    let a = as_f64(lhs, op)?;
    let b = as_f64(rhs, op)?;
    Ok(Value::Float(match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => a / b,
        BinOp::Rem => a % b,
        _ => unreachable!(),
    }))
}

fn eval_call(name: &str, args: &[Expr], vars: &HashMap<String, Value>) -> Result<Value, ExpressionEvalError> {
    match name {
        "len" => match eval(&args[0], vars)? {
            Value::Array(items) => Ok(Value::Int(items.len() as i64)),
            Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
            Value::Object(fields) => Ok(Value::Int(fields.len() as i64)),
            other => Err(ExpressionEvalError::NotIndexable(other.type_name())),
        },
        "has" => {
            let base = eval(&args[0], vars)?;
            let field = match eval(&args[1], vars)? {
                Value::String(s) => s,
                _ => {
                    return Err(ExpressionEvalError::BadCall {
                        name: "has".to_string(),
                        reason: "field name must be a string".to_string(),
                    })
                }
            };
            match base {
                Value::Object(fields) => Ok(Value::Bool(fields.contains_key(&field))),
                other => Err(ExpressionEvalError::NotIndexable(other.type_name())),
            }
        }
        "default" => {
            let primary = eval(&args[0], vars)?;
            if matches!(primary, Value::Null) {
                eval(&args[1], vars)
            } else {
                Ok(primary)
            }
        }
        other => Err(ExpressionEvalError::BadCall {
            name: other.to_string(),
            reason: "unknown function".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn env(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn evaluates_arithmetic() {
        let expr = parse("1 + 2 * 3").unwrap();
        assert_eq!(eval(&expr, &HashMap::new()).unwrap(), Value::Int(7));
    }

    #[test]
    fn short_circuits_and() {
        let expr = parse("false && missing").unwrap();
        assert_eq!(eval(&expr, &HashMap::new()).unwrap(), Value::Bool(false));
    }

    #[test]
    fn ternary_picks_branch() {
        let vars = env(&[("limit", Value::Int(5))]);
        let expr = parse("limit > 0 ? \"pos\" : \"nonpos\"").unwrap();
        assert_eq!(eval(&expr, &vars).unwrap(), Value::String("pos".to_string()));
    }

    #[test]
    fn default_falls_back_on_null() {
        let vars = env(&[("name", Value::Null)]);
        let expr = parse("default(name, \"anon\")").unwrap();
        assert_eq!(eval(&expr, &vars).unwrap(), Value::String("anon".to_string()));
    }

    #[test]
    fn len_counts_array_elements() {
        let vars = env(&[("tags", Value::Array(vec![Value::Int(1), Value::Int(2)]))]);
        let expr = parse("len(tags)").unwrap();
        assert_eq!(eval(&expr, &vars).unwrap(), Value::Int(2));
    }

    #[test]
    fn division_by_zero_is_an_eval_error() {
        let expr = parse("1 / 0").unwrap();
        assert!(eval(&expr, &HashMap::new()).is_err());
    }
}
