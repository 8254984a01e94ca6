use snapsql_core::ParamType;

use crate::{
    instruction::Instruction,
    param::{ImplicitParameter, ParameterEntry},
};

/// The schema URL embedded in every emitted [`IrMetadata`].
pub const SCHEMA_URL: &str = "https://snapsql.dev/schema/ir/v1";

/// One entry of the expression table: the raw expression text and its
/// checked type, referenced by index from `EmitEval`/`If`/`ElseIf`/
/// `LoopStart` instructions.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub struct ExpressionTableEntry {
    /// The expression's source text, exactly as written.
    pub expression_text: String,
    /// The type assigned to it by the type-checker.
    pub declared_type: ParamType,
}

/// Provenance of the compiled template's source text.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub struct SourceInfo {
    /// The originating file path, if compiled from a file.
    pub file: Option<String>,
    /// The full template source text.
    pub content: String,
    /// Lowercase hex SHA-256 of `content`, used for cache invalidation.
    pub hash: String,
}

/// Structural/parameter variable bookkeeping and the per-shape cache key.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub struct DependencyMetadata {
    /// Every variable referenced anywhere in the template.
    pub all_vars: Vec<String>,
    /// Variables that can alter the generated SQL shape (drive `IF`/`FOR`,
    /// or appear in a `const` declaration).
    pub structural_vars: Vec<String>,
    /// Variables that only ever bind as parameter values.
    pub parameter_vars: Vec<String>,
    /// `"static"` when there are no structural variables, else a
    /// deterministic string over their canonical forms.
    pub cache_key_template: String,
}

/// IR provenance and schema metadata.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub struct IrMetadata {
    /// This crate's version, embedded at compile time.
    pub version: String,
    /// RFC3339 timestamp of when the IR was generated.
    pub generated_at: String,
    /// The name of the tool that generated this IR.
    pub generator: String,
    /// The IR schema this file conforms to.
    pub schema_url: String,
}

/// The persisted, portable compilation artifact: everything the runtime
/// needs to materialize SQL text and bound arguments, independent of the
/// source language the template was authored in.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub struct Ir {
    /// Source provenance.
    pub source: SourceInfo,
    /// The template's declared function name.
    pub function_name: String,
    /// An optional human-readable description.
    pub description: Option<String>,
    /// The caller-declared parameter schema.
    pub parameters: Vec<ParameterEntry>,
    /// Parameters supplied by runtime context, not by the caller.
    pub implicit_parameters: Vec<ImplicitParameter>,
    /// Every compiled expression, referenced by index.
    pub cel_expressions: Vec<ExpressionTableEntry>,
    /// The linear instruction program.
    pub instructions: Vec<Instruction>,
    /// Structural/parameter variable bookkeeping.
    pub dependencies: DependencyMetadata,
    /// Provenance and schema metadata.
    pub metadata: IrMetadata,
}
