use core::fmt;
use std::collections::BTreeMap;

/// The closed set of parameter/expression types declared in a parameter
/// schema. `Array`/`Object` recurse into a further declared type.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case", tag = "kind"))]
pub enum ParamType {
    /// UTF-8 text.
    String,
    /// Signed integer.
    Int,
    /// Floating point number.
    Float,
    /// Boolean.
    Bool,
    /// Calendar date without time.
    Date,
    /// Time without date.
    Time,
    /// Combined date and time.
    DateTime,
    /// Arbitrary JSON value.
    Json,
    /// Binary blob.
    Binary,
    /// Homogeneous array of `T`.
    Array(Box<ParamType>),
    /// Structurally-typed object with named fields.
    Object(BTreeMap<String, ParamType>),
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Bool => f.write_str("bool"),
            Self::Date => f.write_str("date"),
            Self::Time => f.write_str("time"),
            Self::DateTime => f.write_str("datetime"),
            Self::Json => f.write_str("json"),
            Self::Binary => f.write_str("binary"),
            Self::Array(inner) => write!(f, "array<{}>", inner),
            Self::Object(fields) => {
                f.write_str("object{")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}:{}", name, ty)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl ParamType {
    /// True for the scalar types that `EMIT_EVAL`/`EMIT_PARAM` may bind
    /// directly as a prepared-statement argument.
    pub fn is_bindable_scalar(&self) -> bool {
        matches!(
            self,
            Self::Int
                | Self::Float
                | Self::String
                | Self::Bool
                | Self::Date
                | Self::Time
                | Self::DateTime
                | Self::Json
                | Self::Binary
        )
    }
}

/// A runtime-typed value flowing through the VM: a parameter binding, a
/// loop variable, or the result of evaluating an expression.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case", tag = "kind", content = "value"))]
pub enum Value {
    /// Absence of a value (an optional parameter that was not supplied).
    Null,
    /// UTF-8 text.
    String(String),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Homogeneous array of values.
    Array(Vec<Value>),
    /// A structurally-typed object.
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// The declared type this value is shaped as, when it can be inferred
    /// without schema context (arrays/objects report the shape of their
    /// first/only element; callers with schema context should prefer the
    /// declared `ParamType` instead).
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::String(_) => "string",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Truthiness used by the boolean (`&&`, `||`, `!`) expression
    /// operators and `IF`/`ELSE_IF` conditions.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::String(s) => !s.is_empty(),
            Self::Int(n) => *n != 0,
            Self::Float(n) => *n != 0.0,
            Self::Array(a) => !a.is_empty(),
            Self::Object(o) => !o.is_empty(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::String(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{}", n),
            Self::Float(n) => write!(f, "{}", n),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Self::Object(fields) => {
                f.write_str("{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}:{}", name, value)?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_type_display() {
        let ty = ParamType::Array(Box::new(ParamType::String));
        assert_eq!(ty.to_string(), "array<string>");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(Value::Int(1).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Array(vec![]).is_truthy());
    }

    #[test]
    fn bindable_scalars() {
        assert!(ParamType::Int.is_bindable_scalar());
        assert!(!ParamType::Array(Box::new(ParamType::Int)).is_bindable_scalar());
    }
}
