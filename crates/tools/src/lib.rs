//! CRM tools for the frontdesk gateway
//!
//! Implements the MCP-compatible tool interface: a `Tool` trait with JSON
//! Schema input validation, a registry that executes by name under a timeout,
//! and the eight CRM operations (contact/lead search and creation,
//! appointment booking, availability, accounts).

pub mod accounts;
pub mod appointments;
pub mod contacts;
pub mod leads;
pub mod mcp;
pub mod registry;

pub use mcp::{
    ContentBlock, InputSchema, PropertySchema, Tool, ToolError, ToolErrorKind, ToolOutput,
    ToolSchema,
};
pub use registry::{standard_registry, ToolExecutor, ToolRegistry};

pub use accounts::CreateAccountTool;
pub use appointments::{CreateAppointmentTool, GetAvailableSlotsTool};
pub use contacts::{CreateContactTool, SearchContactByPhoneTool, UpdateContactSummaryTool};
pub use leads::{CreateLeadTool, SearchLeadByPhoneTool};
