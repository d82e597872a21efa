//! MCP tool interface
//!
//! Tool inputs are declared as JSON Schema fragments through the builder
//! types here and enforced with the `jsonschema` crate before any handler
//! body runs: a schema violation is a client error that must never reach the
//! record store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use frontdesk_core::GatewayError;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// A tool as advertised to protocol clients.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: InputSchema,
}

/// JSON Schema object describing a tool's arguments.
#[derive(Debug, Clone, Serialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    kind: &'static str,
    properties: BTreeMap<String, PropertySchema>,
    required: Vec<String>,
}

impl InputSchema {
    pub fn object() -> Self {
        Self {
            kind: "object",
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    pub fn property(mut self, name: &str, schema: PropertySchema, required: bool) -> Self {
        self.properties.insert(name.to_string(), schema);
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    /// Enforce this schema against a set of arguments.
    pub fn validate(&self, arguments: &Value) -> Result<(), ToolError> {
        let schema = serde_json::to_value(self)
            .map_err(|e| ToolError::internal(format!("schema serialization: {e}")))?;
        let compiled = jsonschema::JSONSchema::compile(&schema)
            .map_err(|e| ToolError::internal(format!("schema compilation: {e}")))?;

        if let Err(violations) = compiled.validate(arguments) {
            let detail = violations
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ToolError::invalid_params(detail));
        }
        Ok(())
    }
}

/// One property in an input schema.
#[derive(Debug, Clone, Serialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    kind: &'static str,
    description: String,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    enum_values: Option<Vec<String>>,
}

impl PropertySchema {
    pub fn string(description: impl Into<String>) -> Self {
        Self {
            kind: "string",
            description: description.into(),
            enum_values: None,
        }
    }

    pub fn integer(description: impl Into<String>) -> Self {
        Self {
            kind: "integer",
            description: description.into(),
            enum_values: None,
        }
    }

    pub fn enum_type(description: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            kind: "string",
            description: description.into(),
            enum_values: Some(values),
        }
    }
}

/// Content block in a tool result.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

/// Structured tool result.
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutput {
    pub content: Vec<ContentBlock>,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Render a JSON payload as pretty text content.
    pub fn json(value: Value) -> Self {
        let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
        Self::text(text)
    }

    /// The concatenated text of all content blocks, for assertions and logs.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Why a tool invocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    /// Arguments failed schema or semantic validation; never retried.
    InvalidParams,
    /// No such tool.
    NotFound,
    /// The record store or token exchange rejected the call.
    External,
    /// The handler exceeded its execution budget.
    Timeout,
    Internal,
}

/// Tool execution error. Always converted to a structured error payload at
/// the protocol boundary; never allowed to take down a session.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::InvalidParams,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::NotFound,
            message: message.into(),
        }
    }

    pub fn external(message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::External,
            message: message.into(),
        }
    }

    pub fn timeout(tool: &str, secs: u64) -> Self {
        Self {
            kind: ToolErrorKind::Timeout,
            message: format!("tool {tool} timed out after {secs}s"),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::Internal,
            message: message.into(),
        }
    }
}

impl From<GatewayError> for ToolError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Auth(msg) => Self::external(format!("CRM authentication failed: {msg}")),
            GatewayError::Http(msg) => Self::external(format!("CRM unreachable: {msg}")),
            GatewayError::Api(msg) => Self::external(msg),
            GatewayError::InvalidResponse(msg) => Self::internal(msg),
        }
    }
}

/// A named, schema-validated operation exposed to protocol clients.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn schema(&self) -> ToolSchema;

    /// Validate arguments against the declared schema. Runs before
    /// `execute`; implementations rarely override this.
    fn validate(&self, arguments: &Value) -> Result<(), ToolError> {
        self.schema().input_schema.validate(arguments)
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError>;

    /// Execution budget; the registry enforces it.
    fn timeout_secs(&self) -> u64 {
        30
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> InputSchema {
        InputSchema::object()
            .property("phone", PropertySchema::string("Phone number"), true)
            .property("limit", PropertySchema::integer("Max results"), false)
    }

    #[test]
    fn missing_required_field_is_invalid_params() {
        let err = schema().validate(&json!({})).unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::InvalidParams);
        assert!(err.message.contains("phone"));
    }

    #[test]
    fn wrong_type_is_invalid_params() {
        let err = schema().validate(&json!({"phone": 42})).unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::InvalidParams);
    }

    #[test]
    fn valid_arguments_pass() {
        schema()
            .validate(&json!({"phone": "555-123-4567", "limit": 5}))
            .unwrap();
    }

    #[test]
    fn schema_serializes_in_wire_shape() {
        let value = serde_json::to_value(schema()).unwrap();
        assert_eq!(value["type"], "object");
        assert_eq!(value["properties"]["phone"]["type"], "string");
        assert_eq!(value["required"], json!(["phone"]));
    }

    #[test]
    fn gateway_errors_map_to_external() {
        let err: ToolError = GatewayError::Api("bad field".into()).into();
        assert_eq!(err.kind, ToolErrorKind::External);
        assert_eq!(err.message, "bad field");
    }
}
