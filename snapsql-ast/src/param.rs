use snapsql_core::{ParamType, Value};

/// One entry of a [`ParameterSchema`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub struct ParameterEntry {
    /// The parameter's name, as referenced from expressions.
    pub name: String,
    /// Its declared type.
    pub ty: ParamType,
    /// An optional human-readable description.
    pub description: Option<String>,
    /// True if callers may omit this parameter.
    pub optional: bool,
    /// The value substituted when `optional` and omitted.
    pub default: Option<Value>,
}

/// The ordered, caller-declared parameter schema of a template.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterSchema {
    /// Entries in declaration order.
    pub entries: Vec<ParameterEntry>,
}

impl ParameterSchema {
    /// Looks up a declared parameter by name.
    pub fn get(&self, name: &str) -> Option<&ParameterEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Non-optional entries, in declaration order.
    pub fn required(&self) -> impl Iterator<Item = &ParameterEntry> {
        self.entries.iter().filter(|e| !e.optional)
    }
}

/// A parameter supplied by runtime context rather than by the caller (e.g.
/// the authenticated user ID); excluded from required-parameter checks.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub struct ImplicitParameter {
    /// The parameter's name.
    pub name: String,
    /// Its declared type.
    pub ty: ParamType,
}
