//! Lead tools
//!
//! Same phone-candidate search as contacts, restricted to unconverted leads.
//! Creation applies the configured defaults (company, status) instead of
//! inferring behavior from which optional fields happen to be present.

use std::sync::Arc;

use async_trait::async_trait;
use frontdesk_config::CrmDefaults;
use frontdesk_core::{phone, RecordGateway};
use frontdesk_crm::QueryBuilder;
use serde_json::{json, Value};

use crate::mcp::{InputSchema, PropertySchema, Tool, ToolError, ToolOutput, ToolSchema};

const MAX_SEARCH_RESULTS: u32 = 20;
const LEAD_PHONE_FIELDS: &[&str] = &["Phone", "MobilePhone"];

/// Find unconverted leads whose stored phone matches any candidate form.
pub struct SearchLeadByPhoneTool {
    gateway: Arc<dyn RecordGateway>,
}

impl SearchLeadByPhoneTool {
    pub fn new(gateway: Arc<dyn RecordGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for SearchLeadByPhoneTool {
    fn name(&self) -> &str {
        "search_lead_by_phone"
    }

    fn description(&self) -> &str {
        "Search for existing leads by phone number. Matches any common \
         formatting of the number and skips leads already converted."
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
        let statement = QueryBuilder::new("Lead")
            .select(["Id", "FirstName", "LastName", "Phone", "MobilePhone", "Company", "Status"])
            .like_any(LEAD_PHONE_FIELDS, &candidates)
            .eq_bool("IsConverted", false)
            .limit(MAX_SEARCH_RESULTS)
            .build();

        let records = self.gateway.query(&statement).await?;
        tracing::debug!(phone = raw, matches = records.len(), "lead search");

        Ok(ToolOutput::json(json!({
            "count": records.len(),
            "leads": records,
        })))
    }
}

/// Create a lead record with configured defaults.
pub struct CreateLeadTool {
    gateway: Arc<dyn RecordGateway>,
    defaults: CrmDefaults,
}

impl CreateLeadTool {
    pub fn new(gateway: Arc<dyn RecordGateway>, defaults: CrmDefaults) -> Self {
        Self { gateway, defaults }
    }
}

#[async_trait]
impl Tool for CreateLeadTool {
    fn name(&self) -> &str {
        "create_lead"
    }

    fn description(&self) -> &str {
        "Create a new lead. Company and status fall back to the configured \
         defaults for individual callers."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: InputSchema::object()
                .property("last_name", PropertySchema::string("Lead's last name"), true)
                .property("phone", PropertySchema::string("Lead's phone number"), true)
                .property("first_name", PropertySchema::string("Lead's first name"), false)
                .property("email", PropertySchema::string("Lead's email address"), false)
                .property(
                    "company",
                    PropertySchema::string("Company name; defaults to the individual-caller sentinel"),
                    false,
                )
                .property("status", PropertySchema::string("Initial lead status"), false),
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

        let company = input
            .get("company")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.defaults.lead_company);
        let status = input
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.defaults.lead_status);

        let mut fields = json!({
            "LastName": last_name,
            "Phone": phone,
            "Company": company,
            "Status": status,
        });
        if let Some(first_name) = input.get("first_name").and_then(|v| v.as_str()) {
            fields["FirstName"] = json!(first_name);
        }
        if let Some(email) = input.get("email").and_then(|v| v.as_str()) {
            fields["Email"] = json!(email);
        }

        let id = self.gateway.create("Lead", fields).await?;
        tracing::info!(lead_id = %id, "lead created");

        Ok(ToolOutput::json(json!({
            "success": true,
            "lead_id": id,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontdesk_core::StubRecordGateway;

    #[tokio::test]
    async fn search_excludes_converted_leads() {
        let stub = Arc::new(StubRecordGateway::new());
        let tool = SearchLeadByPhoneTool::new(stub.clone());

        tool.execute(json!({"phone": "555-123-4567"})).await.unwrap();

        let statement = &stub.queries()[0];
        assert!(statement.contains("FROM Lead"));
        assert!(statement.contains("IsConverted = false"));
        assert!(statement.contains("Phone LIKE '%5551234567%'"));
    }

    #[tokio::test]
    async fn create_applies_configured_defaults() {
        let stub = Arc::new(StubRecordGateway::new());
        let tool = CreateLeadTool::new(stub.clone(), CrmDefaults::default());

        tool.execute(json!({"last_name": "Okafor", "phone": "555-123-4567"}))
            .await
            .unwrap();

        let (object, fields) = stub.creates()[0].clone();
        assert_eq!(object, "Lead");
        assert_eq!(fields["Company"], "Individual");
        assert_eq!(fields["Status"], "Open - Not Contacted");
    }

    #[tokio::test]
    async fn explicit_company_and_status_win_over_defaults() {
        let stub = Arc::new(StubRecordGateway::new());
        let tool = CreateLeadTool::new(stub.clone(), CrmDefaults::default());

        tool.execute(json!({
            "last_name": "Okafor",
            "phone": "555-123-4567",
            "company": "Okafor Consulting",
            "status": "Working - Contacted",
        }))
        .await
        .unwrap();

        let fields = stub.creates()[0].1.clone();
        assert_eq!(fields["Company"], "Okafor Consulting");
        assert_eq!(fields["Status"], "Working - Contacted");
    }

    #[test]
    fn missing_phone_fails_validation_without_a_call() {
        let stub = Arc::new(StubRecordGateway::new());
        let tool = CreateLeadTool::new(stub.clone(), CrmDefaults::default());

        let err = tool.validate(&json!({"last_name": "Okafor"})).unwrap_err();
        assert_eq!(err.kind, crate::mcp::ToolErrorKind::InvalidParams);
        assert_eq!(stub.call_count(), 0);
    }
}
