//! Account tool

use std::sync::Arc;

use async_trait::async_trait;
use frontdesk_core::RecordGateway;
use serde_json::{json, Value};

use crate::mcp::{InputSchema, PropertySchema, Tool, ToolError, ToolOutput, ToolSchema};

/// Create an account record.
pub struct CreateAccountTool {
    gateway: Arc<dyn RecordGateway>,
}

impl CreateAccountTool {
    pub fn new(gateway: Arc<dyn RecordGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for CreateAccountTool {
    fn name(&self) -> &str {
        "create_account"
    }

    fn description(&self) -> &str {
        "Create a new account (household or business) by name."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: InputSchema::object()
                .property("name", PropertySchema::string("Account name"), true)
                .property("phone", PropertySchema::string("Main phone number"), false)
                .property("website", PropertySchema::string("Website URL"), false),
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput, ToolError> {
        let name = input
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::invalid_params("name is required"))?;

        let mut fields = json!({ "Name": name });
        if let Some(phone) = input.get("phone").and_then(|v| v.as_str()) {
            fields["Phone"] = json!(phone);
        }
        if let Some(website) = input.get("website").and_then(|v| v.as_str()) {
            fields["Website"] = json!(website);
        }

        let id = self.gateway.create("Account", fields).await?;
        tracing::info!(account_id = %id, "account created");

        Ok(ToolOutput::json(json!({
            "success": true,
            "account_id": id,
        })))
    }
}
