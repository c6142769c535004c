//! Schema validation for proposed tool calls.
//!
//! Pure and deterministic: the same request against the same descriptor
//! always yields the same outcome, and nothing here touches the outside
//! world. Success produces a normalized argument map containing exactly the
//! declared parameters; optional parameters absent from the request are
//! filled from their declared defaults.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::thread::ToolCallRequest;
use crate::tools::{ToolDescriptor, ToolRegistry};

/// Why a proposed tool call was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("tool '{tool}': arguments must be a JSON object")]
    ArgumentsNotObject { tool: String },

    #[error("tool '{tool}': missing required parameter '{param}'")]
    MissingParameter { tool: String, param: String },

    #[error("tool '{tool}': parameter '{param}' expected {expected}, got {got}")]
    TypeMismatch {
        tool: String,
        param: String,
        expected: &'static str,
        got: String,
    },

    #[error("tool '{tool}': unknown parameter '{param}'")]
    UnknownParameter { tool: String, param: String },
}

impl SchemaError {
    /// Machine-readable category for the synthetic tool-error message
    pub fn error_type(&self) -> &'static str {
        match self {
            SchemaError::UnknownTool(_) => "unknown_tool",
            SchemaError::ArgumentsNotObject { .. } => "invalid_arguments",
            SchemaError::MissingParameter { .. } => "missing_parameter",
            SchemaError::TypeMismatch { .. } => "type_mismatch",
            SchemaError::UnknownParameter { .. } => "unknown_parameter",
        }
    }

    /// Feedback sentence handed back to the model so it can correct the call
    pub fn feedback(&self) -> String {
        format!(
            "You attempted to call a tool but provided an invalid input schema: {}. \
             Please retry with a correct tool call. Make sure all required parameters \
             are provided and match the expected types.",
            self
        )
    }
}

fn json_type_name(value: &Value) -> String {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
    .to_string()
}

/// Validate a call against its descriptor, producing a normalized argument
/// map on success.
pub fn validate_against(
    request: &ToolCallRequest,
    descriptor: &ToolDescriptor,
) -> Result<Map<String, Value>, SchemaError> {
    let tool = descriptor.name.clone();

    let supplied = match &request.arguments {
        Value::Object(map) => map.clone(),
        // Providers occasionally emit null for a call with no arguments
        Value::Null => Map::new(),
        _ => return Err(SchemaError::ArgumentsNotObject { tool }),
    };

    // Reject extras first so the model learns the exact parameter surface
    for key in supplied.keys() {
        if descriptor.param(key).is_none() {
            return Err(SchemaError::UnknownParameter {
                tool,
                param: key.clone(),
            });
        }
    }

    let mut normalized = Map::new();
    for spec in &descriptor.parameters {
        match supplied.get(&spec.name) {
            Some(value) => {
                if !spec.kind.accepts(value) {
                    return Err(SchemaError::TypeMismatch {
                        tool,
                        param: spec.name.clone(),
                        expected: spec.kind.as_str(),
                        got: json_type_name(value),
                    });
                }
                normalized.insert(spec.name.clone(), value.clone());
            }
            None if spec.required => {
                return Err(SchemaError::MissingParameter {
                    tool,
                    param: spec.name.clone(),
                });
            }
            None => {
                if let Some(default) = &spec.default {
                    normalized.insert(spec.name.clone(), default.clone());
                }
            }
        }
    }

    Ok(normalized)
}

/// Validate a call by looking the tool up in the registry
pub fn validate_call(
    request: &ToolCallRequest,
    registry: &ToolRegistry,
) -> Result<Map<String, Value>, SchemaError> {
    let descriptor = registry
        .descriptor(&request.name)
        .ok_or_else(|| SchemaError::UnknownTool(request.name.clone()))?;
    validate_against(request, descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::tools::standard_registry;
    use serde_json::json;

    fn registry() -> ToolRegistry {
        standard_registry(&Config::default())
    }

    fn call(name: &str, args: Value) -> ToolCallRequest {
        ToolCallRequest::new("call-1", name, args)
    }

    #[test]
    fn valid_call_normalizes_to_declared_params() {
        let request = call(
            "calculator",
            json!({"first_num": 5, "second_num": 3, "operation": "add"}),
        );
        let args = validate_call(&request, &registry()).unwrap();
        assert_eq!(args.len(), 3);
        assert_eq!(args["operation"], json!("add"));
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let request = call(
            "calculator",
            json!({"first_num": 5, "second_num": "three", "operation": "add"}),
        );
        let err = validate_call(&request, &registry()).unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { ref param, .. } if param == "second_num"));
        assert_eq!(err.error_type(), "type_mismatch");
    }

    #[test]
    fn missing_required_parameter_is_rejected() {
        let request = call("calculator", json!({"first_num": 5, "operation": "add"}));
        let err = validate_call(&request, &registry()).unwrap_err();
        assert!(matches!(err, SchemaError::MissingParameter { ref param, .. } if param == "second_num"));
    }

    #[test]
    fn unknown_parameter_is_rejected() {
        let request = call(
            "calculator",
            json!({"first_num": 5, "second_num": 3, "operation": "add", "precision": 2}),
        );
        let err = validate_call(&request, &registry()).unwrap_err();
        assert_eq!(err.error_type(), "unknown_parameter");
    }

    #[test]
    fn unknown_tool_is_rejected() {
        let request = call("teleport", json!({}));
        let err = validate_call(&request, &registry()).unwrap_err();
        assert_eq!(err, SchemaError::UnknownTool("teleport".to_string()));
    }

    #[test]
    fn optional_parameters_fill_from_defaults() {
        let request = call("web_search", json!({"query": "rust"}));
        let args = validate_call(&request, &registry()).unwrap();
        assert_eq!(args["max_results"], json!(5));
    }

    #[test]
    fn null_arguments_treated_as_empty_object() {
        let request = call("get_current_time", Value::Null);
        let args = validate_call(&request, &registry()).unwrap();
        assert_eq!(args["timezone"], json!("UTC"));
    }

    #[test]
    fn deterministic_for_identical_input() {
        let request = call(
            "unit_converter",
            json!({"value": 1.5, "from_unit": "mile", "to_unit": "meter"}),
        );
        let reg = registry();
        let first = validate_call(&request, &reg).unwrap();
        let second = validate_call(&request, &reg).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn integer_param_accepts_whole_float() {
        let request = call("web_search", json!({"query": "rust", "max_results": 3.0}));
        let args = validate_call(&request, &registry()).unwrap();
        assert_eq!(args["max_results"], json!(3.0));
    }
}
