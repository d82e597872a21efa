//! Record store boundary
//!
//! The external CRM is reached exclusively through [`RecordGateway`]: a query,
//! a create, and an update. Tool handlers compose against this trait so the
//! whole tool surface can run against the in-memory stub in tests and local
//! development.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// One record returned from a query: a field-name → value map.
pub type Record = serde_json::Map<String, Value>;

/// Failures at the record-store boundary.
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    /// The token exchange rejected our credentials or the token expired.
    /// A retryable setup failure, never fatal to the process.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Transport-level failure reaching the store.
    #[error("request failed: {0}")]
    Http(String),

    /// The store accepted the request and rejected its content; the upstream
    /// message is passed through for diagnostics.
    #[error("rejected by record store: {0}")]
    Api(String),

    /// The store answered with a body we could not interpret.
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Whether retrying the invocation with a fresh connection may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::Http(_))
    }
}

/// Minimal capability interface to the external CRM.
#[async_trait]
pub trait RecordGateway: Send + Sync {
    /// Run a query statement and return the matching records.
    async fn query(&self, statement: &str) -> Result<Vec<Record>, GatewayError>;

    /// Create a record of `object_type`; returns the new record id.
    async fn create(&self, object_type: &str, fields: Value) -> Result<String, GatewayError>;

    /// Update fields on an existing record.
    async fn update(
        &self,
        object_type: &str,
        id: &str,
        fields: Value,
    ) -> Result<(), GatewayError>;
}

/// In-memory gateway for tests and local development.
///
/// Records every call, serves canned query results, and can be armed to fail
/// so error paths are exercisable without a live CRM.
#[derive(Default)]
pub struct StubRecordGateway {
    queries: Mutex<Vec<String>>,
    creates: Mutex<Vec<(String, Value)>>,
    updates: Mutex<Vec<(String, String, Value)>>,
    canned_records: Mutex<Vec<Record>>,
    fail_with: Mutex<Option<GatewayError>>,
    next_id: AtomicU64,
}

impl StubRecordGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve these records from every subsequent `query`.
    pub fn with_records(records: Vec<Record>) -> Self {
        let stub = Self::new();
        *stub.canned_records.lock().unwrap() = records;
        stub
    }

    /// Fail every subsequent call with a clone of `error`.
    pub fn failing(error: GatewayError) -> Self {
        let stub = Self::new();
        *stub.fail_with.lock().unwrap() = Some(error);
        stub
    }

    /// Total calls that reached the gateway, across all three operations.
    pub fn call_count(&self) -> usize {
        self.queries.lock().unwrap().len()
            + self.creates.lock().unwrap().len()
            + self.updates.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn creates(&self) -> Vec<(String, Value)> {
        self.creates.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<(String, String, Value)> {
        self.updates.lock().unwrap().clone()
    }

    fn armed_failure(&self) -> Option<GatewayError> {
        self.fail_with.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordGateway for StubRecordGateway {
    async fn query(&self, statement: &str) -> Result<Vec<Record>, GatewayError> {
        self.queries.lock().unwrap().push(statement.to_string());
        if let Some(err) = self.armed_failure() {
            return Err(err);
        }
        tracing::debug!(statement, "stub gateway: query");
        Ok(self.canned_records.lock().unwrap().clone())
    }

    async fn create(&self, object_type: &str, fields: Value) -> Result<String, GatewayError> {
        self.creates
            .lock()
            .unwrap()
            .push((object_type.to_string(), fields));
        if let Some(err) = self.armed_failure() {
            return Err(err);
        }
        let id = format!("STUB{:015}", self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(object_type, id, "stub gateway: create");
        Ok(id)
    }

    async fn update(
        &self,
        object_type: &str,
        id: &str,
        fields: Value,
    ) -> Result<(), GatewayError> {
        self.updates
            .lock()
            .unwrap()
            .push((object_type.to_string(), id.to_string(), fields));
        if let Some(err) = self.armed_failure() {
            return Err(err);
        }
        tracing::debug!(object_type, id, "stub gateway: update");
        Ok(())
    }
}
