//! Contact tools
//!
//! Phone search runs the candidate expansion from `frontdesk_core::phone`
//! through an escaped LIKE union, because the CRM has no normalized phone
//! index to query directly.

use std::sync::Arc;

use async_trait::async_trait;
use frontdesk_core::{phone, RecordGateway};
use frontdesk_crm::QueryBuilder;
use serde_json::{json, Value};

use crate::mcp::{InputSchema, PropertySchema, Tool, ToolError, ToolOutput, ToolSchema};

const MAX_SEARCH_RESULTS: u32 = 20;
const CONTACT_PHONE_FIELDS: &[&str] = &["Phone", "MobilePhone", "HomePhone"];

/// Find contacts whose stored phone matches any candidate representation.
pub struct SearchContactByPhoneTool {
    gateway: Arc<dyn RecordGateway>,
}

impl SearchContactByPhoneTool {
    pub fn new(gateway: Arc<dyn RecordGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for SearchContactByPhoneTool {
    fn name(&self) -> &str {
        "search_contact_by_phone"
    }

    fn description(&self) -> &str {
        "Search for existing contacts by phone number. Matches any common \
         formatting of the number, so the caller's phone can be given as spoken."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: InputSchema::object().property(
                "phone",
                PropertySchema::string("Phone number in any format"),
                true,
            ),
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput, ToolError> {
        let raw = input
            .get("phone")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::invalid_params("phone is required"))?;

        let candidates = phone::candidates(raw);
        let statement = QueryBuilder::new("Contact")
            .select(["Id", "FirstName", "LastName", "Phone", "MobilePhone", "Email"])
            .like_any(CONTACT_PHONE_FIELDS, &candidates)
            .limit(MAX_SEARCH_RESULTS)
            .build();

        let records = self.gateway.query(&statement).await?;
        tracing::debug!(phone = raw, matches = records.len(), "contact search");

        Ok(ToolOutput::json(json!({
            "count": records.len(),
            "contacts": records,
        })))
    }
}

/// Create a contact record.
pub struct CreateContactTool {
    gateway: Arc<dyn RecordGateway>,
}

impl CreateContactTool {
    pub fn new(gateway: Arc<dyn RecordGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for CreateContactTool {
    fn name(&self) -> &str {
        "create_contact"
    }

    fn description(&self) -> &str {
        "Create a new contact with name and phone number."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: InputSchema::object()
                .property("last_name", PropertySchema::string("Contact's last name"), true)
                .property("phone", PropertySchema::string("Contact's phone number"), true)
                .property("first_name", PropertySchema::string("Contact's first name"), false)
                .property("email", PropertySchema::string("Contact's email address"), false),
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput, ToolError> {
        let last_name = input
            .get("last_name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::invalid_params("last_name is required"))?;
        let phone = input
            .get("phone")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::invalid_params("phone is required"))?;

        let mut fields = json!({
            "LastName": last_name,
            "Phone": phone,
        });
        if let Some(first_name) = input.get("first_name").and_then(|v| v.as_str()) {
            fields["FirstName"] = json!(first_name);
        }
        if let Some(email) = input.get("email").and_then(|v| v.as_str()) {
            fields["Email"] = json!(email);
        }

        let id = self.gateway.create("Contact", fields).await?;
        tracing::info!(contact_id = %id, "contact created");

        Ok(ToolOutput::json(json!({
            "success": true,
            "contact_id": id,
        })))
    }
}

/// Append a conversation summary to a contact's description.
pub struct UpdateContactSummaryTool {
    gateway: Arc<dyn RecordGateway>,
}

impl UpdateContactSummaryTool {
    pub fn new(gateway: Arc<dyn RecordGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for UpdateContactSummaryTool {
    fn name(&self) -> &str {
        "update_contact_with_summary"
    }

    fn description(&self) -> &str {
        "Store a summary of the conversation on an existing contact record."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: InputSchema::object()
                .property("contact_id", PropertySchema::string("Id of the contact to update"), true)
                .property("summary", PropertySchema::string("Conversation summary text"), true),
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput, ToolError> {
        let contact_id = input
            .get("contact_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::invalid_params("contact_id is required"))?;
        let summary = input
            .get("summary")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::invalid_params("summary is required"))?;

        self.gateway
            .update("Contact", contact_id, json!({ "Description": summary }))
            .await?;
        tracing::info!(contact_id, "contact summary stored");

        Ok(ToolOutput::json(json!({
            "success": true,
            "contact_id": contact_id,
        })))
    }
}
