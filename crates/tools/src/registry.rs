//! Tool registry
//!
//! Registration, discovery, and execution. Execution always validates the
//! arguments first and runs the handler under its own timeout so one stuck
//! CRM call cannot wedge a session.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use frontdesk_config::{CrmDefaults, SchedulingConfig};
use frontdesk_core::RecordGateway;
use serde_json::Value;

use crate::mcp::{Tool, ToolError, ToolOutput, ToolSchema};

/// Tool executor trait
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute a tool by name
    async fn execute(&self, name: &str, arguments: Value) -> Result<ToolOutput, ToolError>;

    /// List available tools
    fn list_tools(&self) -> Vec<ToolSchema>;

    /// Get tool schema by name
    fn get_tool(&self, name: &str) -> Option<ToolSchema>;
}

/// Tool registry
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn execute(&self, name: &str, arguments: Value) -> Result<ToolOutput, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::not_found(format!("Tool not found: {name}")))?;

        // Schema validation precedes the handler; a failure here is a client
        // error and no external call has been made yet.
        tool.validate(&arguments)?;

        let timeout_secs = tool.timeout_secs();
        tracing::trace!(tool = name, timeout_secs, "executing tool");

        match tokio::time::timeout(Duration::from_secs(timeout_secs), tool.execute(arguments)).await
        {
            Ok(result) => result,
            Err(_elapsed) => Err(ToolError::timeout(name, timeout_secs)),
        }
    }

    fn list_tools(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    fn get_tool(&self, name: &str) -> Option<ToolSchema> {
        self.tools.get(name).map(|t| t.schema())
    }
}

/// Build the standard registry: all eight CRM tools wired to one gateway.
pub fn standard_registry(
    gateway: Arc<dyn RecordGateway>,
    scheduling: SchedulingConfig,
    defaults: CrmDefaults,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(crate::contacts::SearchContactByPhoneTool::new(gateway.clone()));
    registry.register(crate::contacts::CreateContactTool::new(gateway.clone()));
    registry.register(crate::contacts::UpdateContactSummaryTool::new(gateway.clone()));
    registry.register(crate::leads::SearchLeadByPhoneTool::new(gateway.clone()));
    registry.register(crate::leads::CreateLeadTool::new(gateway.clone(), defaults));
    registry.register(crate::appointments::CreateAppointmentTool::new(
        gateway.clone(),
        scheduling.clone(),
    ));
    registry.register(crate::appointments::GetAvailableSlotsTool::new(
        gateway.clone(),
        scheduling,
    ));
    registry.register(crate::accounts::CreateAccountTool::new(gateway));

    tracing::info!(tool_count = registry.len(), "tool registry ready");
    registry
}
