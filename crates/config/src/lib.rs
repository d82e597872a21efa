//! Configuration management for the frontdesk gateway
//!
//! Settings load in layers: `config/default.toml`, then an optional
//! per-environment file (`config/production.toml`), then environment
//! variables under the `FRONTDESK__` prefix (`FRONTDESK__SERVER__PORT=9090`).
//! Every field has an explicit documented default; nothing is inferred from
//! field presence at use sites.

pub mod settings;

pub use settings::{
    load_settings, AuthConfig, CrmDefaults, RuntimeEnvironment, SalesforceConfig,
    SchedulingConfig, ServerConfig, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
