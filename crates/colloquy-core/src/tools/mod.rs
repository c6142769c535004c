//! Tool system for Colloquy
//!
//! Tools are the actions the model can request. Each tool has:
//! - A name and description for the LLM
//! - An ordered, typed parameter list (rendered as a JSON schema)
//! - An execute method
//! - A requires-approval flag

pub mod calculator;
pub mod datetime;
pub mod file_ops;
pub mod unit_converter;
pub mod weather;
pub mod web_search;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::config::Config;
use crate::error::ToolError;

/// Boxed future type for object-safe async trait methods
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// JSON type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl ParamKind {
    /// JSON schema type name
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Number => "number",
            ParamKind::Integer => "integer",
            ParamKind::Boolean => "boolean",
            ParamKind::Array => "array",
            ParamKind::Object => "object",
        }
    }

    /// Whether a raw JSON value is compatible with this kind.
    ///
    /// Integers accept whole-valued floats since several providers emit
    /// `5.0` for integer parameters.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Number => value.is_number(),
            ParamKind::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            ParamKind::Boolean => value.is_boolean(),
            ParamKind::Array => value.is_array(),
            ParamKind::Object => value.is_object(),
        }
    }
}

/// One named, typed tool parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub description: String,
    pub required: bool,
    /// Filled in during normalization when the model omits the parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamSpec {
    /// A required parameter
    pub fn required(name: impl Into<String>, kind: ParamKind, desc: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: desc.into(),
            required: true,
            default: None,
        }
    }

    /// An optional parameter with a default value
    pub fn optional(
        name: impl Into<String>,
        kind: ParamKind,
        desc: impl Into<String>,
        default: Value,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            description: desc.into(),
            required: false,
            default: Some(default),
        }
    }
}

/// Output from a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Whether the tool succeeded
    pub success: bool,
    /// The output content (structured JSON payload)
    pub content: Value,
    /// Machine-readable error category when success is false
    pub error_type: Option<String>,
    /// Human-readable error message when success is false
    pub error: Option<String>,
}

impl ToolOutput {
    pub fn success(content: impl Into<Value>) -> Self {
        Self {
            success: true,
            content: content.into(),
            error_type: None,
            error: None,
        }
    }

    pub fn error(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            content: Value::Null,
            error_type: Some(error_type.into()),
            error: Some(message.into()),
        }
    }
}

/// Immutable tool metadata handed to the model and the validator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// Ordered parameter list; order is preserved in the generated schema
    pub parameters: Vec<ParamSpec>,
    pub requires_approval: bool,
}

impl ToolDescriptor {
    /// Render the parameter list as a JSON schema object for the LLM
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in &self.parameters {
            properties.insert(
                param.name.clone(),
                json!({
                    "type": param.kind.as_str(),
                    "description": param.description,
                }),
            );
            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Look up a parameter spec by name
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Core trait for all tools
pub trait Tool: Send + Sync {
    /// Tool name (used by the LLM to invoke)
    fn name(&self) -> &str;

    /// Description of what the tool does
    fn description(&self) -> &str;

    /// Ordered, typed parameter list
    fn parameters(&self) -> Vec<ParamSpec>;

    /// Execute the tool with a validated, normalized argument map
    fn execute(&self, args: Map<String, Value>) -> BoxFuture<'_, Result<ToolOutput, ToolError>>;

    /// Whether this tool defaults to requiring human approval
    fn requires_approval(&self) -> bool {
        false
    }
}

/// Registry of available tools
///
/// Descriptors are computed once at registration: a tool's approval flag is
/// the OR of its own default and membership in the configured
/// `tools_requiring_approval` set (with `human_in_loop = false` clearing all
/// flags).
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    descriptors: HashMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, deriving its descriptor from the given config
    pub fn register(&mut self, tool: Arc<dyn Tool>, config: &crate::config::OrchestrationConfig) {
        let name = tool.name().to_string();
        let requires_approval = config.human_in_loop
            && (tool.requires_approval() || config.tools_requiring_approval.contains(&name));
        let descriptor = ToolDescriptor {
            name: name.clone(),
            description: tool.description().to_string(),
            parameters: tool.parameters(),
            requires_approval,
        };
        self.descriptors.insert(name.clone(), descriptor);
        self.tools.insert(name, tool);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Get a tool's descriptor by name
    pub fn descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        self.descriptors.get(name)
    }

    /// All descriptors, sorted by name for a stable prompt order
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let mut all: Vec<ToolDescriptor> = self.descriptors.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Build the standard tool registry from configuration
pub fn standard_registry(config: &Config) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    let orch = &config.orchestration;
    registry.register(Arc::new(calculator::Calculator), orch);
    registry.register(Arc::new(unit_converter::UnitConverter), orch);
    registry.register(Arc::new(datetime::CurrentTime), orch);
    registry.register(Arc::new(datetime::DateCalculator), orch);
    registry.register(
        Arc::new(file_ops::FileOperations::new(config.user_files_dir())),
        orch,
    );
    registry.register(
        Arc::new(weather::Weather::new(config.keys.openweather_key())),
        orch,
    );
    registry.register(
        Arc::new(web_search::WebSearch::new(config.keys.tavily_key())),
        orch,
    );
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrchestrationConfig;

    #[test]
    fn approval_flag_follows_config_list() {
        let config = Config::default();
        let registry = standard_registry(&config);

        assert!(registry.descriptor("web_search").unwrap().requires_approval);
        assert!(
            registry
                .descriptor("file_operations")
                .unwrap()
                .requires_approval
        );
        assert!(!registry.descriptor("calculator").unwrap().requires_approval);
    }

    #[test]
    fn human_in_loop_off_clears_all_flags() {
        let mut config = Config::default();
        config.orchestration.human_in_loop = false;
        let registry = standard_registry(&config);

        for descriptor in registry.descriptors() {
            assert!(!descriptor.requires_approval, "{}", descriptor.name);
        }
    }

    #[test]
    fn schema_lists_required_parameters_in_order() {
        let config = OrchestrationConfig::default();
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(calculator::Calculator), &config);

        let schema = registry.descriptor("calculator").unwrap().json_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, vec!["first_num", "second_num", "operation"]);
        assert_eq!(schema["properties"]["operation"]["type"], "string");
    }

    #[test]
    fn integer_kind_accepts_whole_floats() {
        assert!(ParamKind::Integer.accepts(&json!(5)));
        assert!(ParamKind::Integer.accepts(&json!(5.0)));
        assert!(!ParamKind::Integer.accepts(&json!(5.5)));
        assert!(!ParamKind::Integer.accepts(&json!("5")));
    }
}
