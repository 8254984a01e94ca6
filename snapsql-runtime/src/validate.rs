use std::collections::HashMap;

use snapsql_ast::{ImplicitParameter, ParameterSchema};
use snapsql_core::Value;

use crate::error::{MissingParam, MissingRequiredParametersError};

/// Verifies that every non-optional, non-implicit parameter declared in
/// `schema` is present in `params` (§4.10). Implicit parameters are
/// supplied by the caller's runtime context rather than the input map and
/// are excluded from this check.
///
/// Types are not deeply validated here; a type mismatch surfaces later
/// from the expression evaluator when the value is actually used.
pub fn validate(
    schema: &ParameterSchema,
    implicit: &[ImplicitParameter],
    params: &HashMap<String, Value>,
) -> Result<(), MissingRequiredParametersError> {
    let mut missing: Vec<MissingParam> = schema
        .required()
        .filter(|entry| !implicit.iter().any(|i| i.name == entry.name))
        .filter(|entry| !params.contains_key(&entry.name))
        .map(|entry| MissingParam { name: entry.name.clone(), declared_type: entry.ty.clone() })
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    missing.sort_by(|a, b| a.name.cmp(&b.name));
    Err(MissingRequiredParametersError { missing })
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapsql_ast::ParameterEntry;
    use snapsql_core::ParamType;

    fn schema(entries: Vec<ParameterEntry>) -> ParameterSchema {
        ParameterSchema { entries }
    }

    #[test]
    fn passes_when_all_required_present() {
        let schema = schema(vec![ParameterEntry {
            name: "id".to_string(),
            ty: ParamType::Int,
            description: None,
            optional: false,
            default: None,
        }]);
        let mut params = HashMap::new();
        params.insert("id".to_string(), Value::Int(1));
        assert!(validate(&schema, &[], &params).is_ok());
    }

    #[test]
    fn reports_missing_required_sorted_by_name() {
        let schema = schema(vec![
            ParameterEntry { name: "user_id".to_string(), ty: ParamType::Int, description: None, optional: false, default: None },
            ParameterEntry { name: "active".to_string(), ty: ParamType::Bool, description: None, optional: false, default: None },
        ]);
        let err = validate(&schema, &[], &HashMap::new()).unwrap_err();
        let names: Vec<&str> = err.missing.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["active", "user_id"]);
    }

    #[test]
    fn optional_parameters_are_never_required() {
        let schema = schema(vec![ParameterEntry {
            name: "limit".to_string(),
            ty: ParamType::Int,
            description: None,
            optional: true,
            default: Some(Value::Int(10)),
        }]);
        assert!(validate(&schema, &[], &HashMap::new()).is_ok());
    }

    #[test]
    fn implicit_parameters_are_excluded() {
        let schema = schema(vec![ParameterEntry {
            name: "tenant_id".to_string(),
            ty: ParamType::Int,
            description: None,
            optional: false,
            default: None,
        }]);
        let implicit = vec![ImplicitParameter { name: "tenant_id".to_string(), ty: ParamType::Int }];
        assert!(validate(&schema, &implicit, &HashMap::new()).is_ok());
    }
}
