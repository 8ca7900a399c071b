//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what let the model reach outside the transcript: rephrase a
//! question, search the document store, drive the car simulation. Each tool
//! declares a typed parameter list; the registry validates it at startup and
//! coerces model-supplied arguments against it on every call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use crate::error::ToolError;
use crate::message::{ToolCall, ToolCallResult, ToolErrorKind};
use crate::provider::ToolDefinition;

/// Scalar type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParameterKind {
    /// The JSON Schema type name.
    pub fn json_type(&self) -> &'static str {
        match self {
            ParameterKind::String => "string",
            ParameterKind::Integer => "integer",
            ParameterKind::Number => "number",
            ParameterKind::Boolean => "boolean",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            ParameterKind::String => value.is_string(),
            ParameterKind::Integer => value.is_i64() || value.is_u64(),
            ParameterKind::Number => value.is_number(),
            ParameterKind::Boolean => value.is_boolean(),
        }
    }

    /// Coerce a model-supplied value into this kind.
    fn coerce(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (ParameterKind::String, Value::String(_)) => Some(value.clone()),
            (ParameterKind::String, Value::Number(n)) => Some(Value::String(n.to_string())),
            (ParameterKind::String, Value::Bool(b)) => Some(Value::String(b.to_string())),

            (ParameterKind::Integer, Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    Some(Value::from(i))
                } else {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                        .map(|f| Value::from(f as i64))
                }
            }
            (ParameterKind::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),

            (ParameterKind::Number, Value::Number(_)) => Some(value.clone()),
            (ParameterKind::Number, Value::String(s)) => s.trim().parse::<f64>().ok().map(Value::from),

            (ParameterKind::Boolean, Value::Bool(_)) => Some(value.clone()),
            (ParameterKind::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },

            _ => None,
        }
    }
}

/// One declared parameter of a tool. A parameter without a default is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub kind: ParameterKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ToolParameter {
    pub fn required(name: impl Into<String>, kind: ParameterKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            default: None,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        kind: ParameterKind,
        description: impl Into<String>,
        default: impl Into<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            default: Some(default.into()),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Arguments after coercion: every declared parameter is present with the declared type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments(Map<String, Value>);

impl ToolArguments {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn str(&self, name: &str) -> Result<&str, ToolError> {
        self.0
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments(format!("'{name}' must be a string")))
    }

    pub fn i64(&self, name: &str) -> Result<i64, ToolError> {
        self.0
            .get(name)
            .and_then(Value::as_i64)
            .ok_or_else(|| ToolError::InvalidArguments(format!("'{name}' must be an integer")))
    }

    pub fn f64(&self, name: &str) -> Result<f64, ToolError> {
        self.0
            .get(name)
            .and_then(Value::as_f64)
            .ok_or_else(|| ToolError::InvalidArguments(format!("'{name}' must be a number")))
    }

    pub fn bool(&self, name: &str) -> Result<bool, ToolError> {
        self.0
            .get(name)
            .and_then(Value::as_bool)
            .ok_or_else(|| ToolError::InvalidArguments(format!("'{name}' must be a boolean")))
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Coerce raw model arguments against a parameter list.
///
/// Fills defaults, converts stringly-typed scalars, and rejects unknown or
/// missing keys.
pub fn coerce_arguments(parameters: &[ToolParameter], raw: &Value) -> Result<ToolArguments, ToolError> {
    let empty = Map::new();
    let object = match raw {
        Value::Object(map) => map,
        Value::Null => &empty,
        Value::String(text) => {
            return Err(ToolError::InvalidArguments(format!(
                "arguments are not valid JSON: {text}"
            )));
        }
        other => {
            return Err(ToolError::InvalidArguments(format!(
                "arguments must be a JSON object, got {other}"
            )));
        }
    };

    if let Some(unknown) = object.keys().find(|k| !parameters.iter().any(|p| &p.name == *k)) {
        return Err(ToolError::InvalidArguments(format!("unknown argument '{unknown}'")));
    }

    let mut coerced = Map::new();
    for param in parameters {
        let value = match object.get(&param.name) {
            Some(v) if !v.is_null() => param.kind.coerce(v).ok_or_else(|| {
                ToolError::InvalidArguments(format!(
                    "'{}' expects {}, got {}",
                    param.name,
                    param.kind.json_type(),
                    v
                ))
            })?,
            _ => match &param.default {
                Some(default) => default.clone(),
                None => {
                    return Err(ToolError::InvalidArguments(format!(
                        "missing required argument '{}'",
                        param.name
                    )));
                }
            },
        };
        coerced.insert(param.name.clone(), value);
    }
    Ok(ToolArguments(coerced))
}

/// The core Tool trait.
///
/// Each tool implements this trait and is registered once in the
/// [`ToolRegistry`] at startup.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "search_internal_knowledge").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// Declared parameters, in the order they are presented to the model.
    fn parameters(&self) -> Vec<ToolParameter>;

    /// Execute the tool with coerced arguments.
    async fn execute(&self, arguments: ToolArguments) -> std::result::Result<Value, ToolError>;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> Value {
        let params = self.parameters();
        let mut properties = Map::new();
        for p in &params {
            let mut prop = Map::new();
            prop.insert("type".into(), Value::String(p.kind.json_type().into()));
            prop.insert("description".into(), Value::String(p.description.clone()));
            if let Some(default) = &p.default {
                prop.insert("default".into(), default.clone());
            }
            properties.insert(p.name.clone(), Value::Object(prop));
        }
        let required: Vec<Value> = params
            .iter()
            .filter(|p| p.is_required())
            .map(|p| Value::String(p.name.clone()))
            .collect();
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

fn valid_tool_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Check a tool's declared schema. Called on registration.
pub fn validate_tool(tool: &dyn Tool) -> Result<(), ToolError> {
    let name = tool.name();
    let invalid = |reason: String| ToolError::InvalidSchema {
        tool_name: name.to_string(),
        reason,
    };

    if !valid_tool_name(name) {
        return Err(invalid("name must match [A-Za-z0-9_-]{1,64}".into()));
    }
    if tool.description().trim().is_empty() {
        return Err(invalid("description is empty".into()));
    }

    let mut seen = HashSet::new();
    for param in tool.parameters() {
        if param.name.trim().is_empty() {
            return Err(invalid("parameter with empty name".into()));
        }
        if !seen.insert(param.name.clone()) {
            return Err(invalid(format!("duplicate parameter '{}'", param.name)));
        }
        if let Some(default) = &param.default {
            if !param.kind.matches(default) {
                return Err(invalid(format!(
                    "default for '{}' is {}, expected {}",
                    param.name,
                    default,
                    param.kind.json_type()
                )));
            }
        }
    }
    Ok(())
}

impl From<&ToolError> for ToolErrorKind {
    fn from(err: &ToolError) -> Self {
        match err {
            ToolError::NotFound(_) => ToolErrorKind::ToolNotFound,
            ToolError::InvalidArguments(_) => ToolErrorKind::InvalidArguments,
            _ => ToolErrorKind::ToolExecutionFailed,
        }
    }
}

/// A registry of available tools, in registration order.
///
/// The agent loop uses this to:
/// 1. Get tool definitions to send to the LLM
/// 2. Look up and execute tools when the LLM requests them
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool after validating its schema.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<(), ToolError> {
        validate_tool(tool.as_ref())?;
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(ToolError::Duplicate(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, tool: impl Tool + 'static) -> Result<Self, ToolError> {
        self.register(Box::new(tool))?;
        Ok(self)
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&i| self.tools[i].as_ref())
    }

    /// Get all tool definitions (for sending to the LLM).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// List all registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke a tool by name with raw keyword arguments.
    pub async fn invoke(&self, name: &str, arguments: &Value) -> Result<Value, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        let args = coerce_arguments(&tool.parameters(), arguments)?;
        tool.execute(args).await
    }

    /// Execute one tool call and capture the outcome; never fails.
    pub async fn call(&self, call: ToolCall) -> ToolCallResult {
        match self.invoke(&call.name, &call.arguments).await {
            Ok(value) => ToolCallResult::success(call, value),
            Err(err) => {
                let kind = ToolErrorKind::from(&err);
                ToolCallResult::failure(call, kind, err.to_string())
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
