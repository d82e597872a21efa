//! Salesforce record gateway
//!
//! Implements [`frontdesk_core::RecordGateway`] against the Salesforce REST
//! API. Each invocation authenticates with the OAuth 2.0 JWT bearer flow (a
//! short-lived signed assertion; no refresh tokens) and then issues plain
//! query/create/update calls. Query statements are built through the escaped
//! [`soql::QueryBuilder`], never by interpolating untrusted strings.

pub mod auth;
pub mod client;
pub mod soql;

pub use auth::{AccessToken, TokenExchange};
pub use client::SalesforceClient;
pub use soql::QueryBuilder;
