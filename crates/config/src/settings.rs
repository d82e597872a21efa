//! Main settings module

use config::{Config, Environment, File};
use frontdesk_core::BusinessHours;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Relaxed validation, warnings only
    #[default]
    Development,
    Staging,
    /// All validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// HTTP listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Salesforce connection + credentials
    #[serde(default)]
    pub salesforce: SalesforceConfig,

    /// Business hours and appointment slotting
    #[serde(default)]
    pub scheduling: SchedulingConfig,

    /// Defaults applied to created CRM records
    #[serde(default)]
    pub crm_defaults: CrmDefaults,
}

impl Settings {
    /// Validate settings against the runtime environment.
    ///
    /// Development tolerates a missing Salesforce credential set (the server
    /// falls back to the stub gateway); strict environments refuse to start.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduling.open_hour >= self.scheduling.close_hour {
            return Err(ConfigError::InvalidValue {
                field: "scheduling.open_hour".into(),
                message: format!(
                    "open hour {} must precede close hour {}",
                    self.scheduling.open_hour, self.scheduling.close_hour
                ),
            });
        }
        if self.scheduling.slot_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scheduling.slot_minutes".into(),
                message: "slot length must be positive".into(),
            });
        }

        if self.environment.is_strict() {
            if !self.salesforce.is_configured() {
                return Err(ConfigError::MissingField(
                    "salesforce.client_id / salesforce.username / salesforce.private_key_path"
                        .into(),
                ));
            }
            if self.server.auth.enabled && self.server.auth.api_key.is_none() {
                return Err(ConfigError::MissingField("server.auth.api_key".into()));
            }
        }
        Ok(())
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins; empty list falls back to localhost only
    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Maximum concurrent protocol sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Idle seconds before a session is swept
    #[serde(default = "default_session_timeout")]
    pub session_timeout_secs: u64,

    #[serde(default)]
    pub auth: AuthConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_true() -> bool {
    true
}
fn default_max_sessions() -> usize {
    256
}
fn default_session_timeout() -> u64 {
    1800
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            cors_enabled: true,
            max_sessions: default_max_sessions(),
            session_timeout_secs: default_session_timeout(),
            auth: AuthConfig::default(),
        }
    }
}

/// API key authentication for the protocol surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Disabled by default; the server warns once when off
    #[serde(default)]
    pub enabled: bool,

    /// Expected bearer key (`FRONTDESK__SERVER__AUTH__API_KEY=...`)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Path prefixes that bypass authentication
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
}

fn default_public_paths() -> Vec<String> {
    vec!["/health".to_string(), "/ready".to_string()]
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            public_paths: default_public_paths(),
        }
    }
}

/// Salesforce connection configuration
///
/// Authentication is the OAuth 2.0 JWT bearer flow: a short-lived RS256
/// assertion signed with `private_key_path`, exchanged at `login_url` for a
/// bearer token scoped to the integration user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesforceConfig {
    #[serde(default = "default_login_url")]
    pub login_url: String,

    /// Connected-app consumer key (JWT issuer)
    #[serde(default)]
    pub client_id: String,

    /// Integration user login (JWT subject)
    #[serde(default)]
    pub username: String,

    /// Assertion audience; defaults to the login URL when empty
    #[serde(default)]
    pub audience: String,

    /// PEM-encoded RSA private key for assertion signing
    #[serde(default = "default_private_key_path")]
    pub private_key_path: String,

    /// REST API version segment
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Assertion validity window in seconds
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
}

fn default_login_url() -> String {
    "https://login.salesforce.com".to_string()
}
fn default_private_key_path() -> String {
    "secrets/salesforce.pem".to_string()
}
fn default_api_version() -> String {
    "v59.0".to_string()
}
fn default_token_ttl() -> u64 {
    180
}

impl Default for SalesforceConfig {
    fn default() -> Self {
        Self {
            login_url: default_login_url(),
            client_id: String::new(),
            username: String::new(),
            audience: String::new(),
            private_key_path: default_private_key_path(),
            api_version: default_api_version(),
            token_ttl_secs: default_token_ttl(),
        }
    }
}

impl SalesforceConfig {
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.username.is_empty()
    }

    /// Audience for the signed assertion.
    pub fn effective_audience(&self) -> &str {
        if self.audience.is_empty() {
            &self.login_url
        } else {
            &self.audience
        }
    }
}

/// Business hours and appointment slotting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingConfig {
    #[serde(default = "default_open_hour")]
    pub open_hour: u32,

    #[serde(default = "default_close_hour")]
    pub close_hour: u32,

    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: u32,

    /// Label for the business civil-time frame. Stored timestamps are read
    /// as this frame without DST conversion; see the availability module.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Salesforce activity object appointments are written to
    #[serde(default = "default_appointment_object")]
    pub appointment_object: String,

    #[serde(default = "default_slot_minutes")]
    pub default_duration_minutes: u32,
}

fn default_open_hour() -> u32 {
    9
}
fn default_close_hour() -> u32 {
    22
}
fn default_slot_minutes() -> u32 {
    30
}
fn default_timezone() -> String {
    "America/New_York".to_string()
}
fn default_appointment_object() -> String {
    "Event".to_string()
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            open_hour: default_open_hour(),
            close_hour: default_close_hour(),
            slot_minutes: default_slot_minutes(),
            timezone: default_timezone(),
            appointment_object: default_appointment_object(),
            default_duration_minutes: default_slot_minutes(),
        }
    }
}

impl SchedulingConfig {
    pub fn business_hours(&self) -> BusinessHours {
        BusinessHours {
            open_hour: self.open_hour,
            close_hour: self.close_hour,
            slot_minutes: self.slot_minutes,
        }
    }
}

/// Defaults applied to created CRM records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmDefaults {
    /// Company recorded on a lead when the caller gives none
    #[serde(default = "default_lead_company")]
    pub lead_company: String,

    /// Initial status for created leads
    #[serde(default = "default_lead_status")]
    pub lead_status: String,
}

fn default_lead_company() -> String {
    "Individual".to_string()
}
fn default_lead_status() -> String {
    "Open - Not Contacted".to_string()
}

impl Default for CrmDefaults {
    fn default() -> Self {
        Self {
            lead_company: default_lead_company(),
            lead_status: default_lead_status(),
        }
    }
}

/// Load settings from layered sources.
///
/// `env` selects an overlay file (`config/{env}.toml`); both files are
/// optional so a bare checkout starts with pure defaults. Environment
/// variables win over files.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder()
        .add_source(File::with_name("config/default").required(false));

    if let Some(env) = env {
        let overlay = format!("config/{env}");
        if !Path::new(&format!("{overlay}.toml")).exists() {
            tracing::warn!(overlay, "environment overlay not found, using defaults");
        }
        builder = builder.add_source(File::with_name(&overlay).required(false));
    }

    let config = builder
        .add_source(
            Environment::with_prefix("FRONTDESK")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    let settings: Settings = config.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.scheduling.open_hour, 9);
        assert_eq!(settings.scheduling.close_hour, 22);
        assert_eq!(settings.scheduling.slot_minutes, 30);
        assert_eq!(settings.crm_defaults.lead_company, "Individual");
        assert_eq!(settings.crm_defaults.lead_status, "Open - Not Contacted");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn business_hours_view_matches_scheduling() {
        let hours = SchedulingConfig::default().business_hours();
        assert!(hours.is_valid());
        assert_eq!(hours.open_hour, 9);
        assert_eq!(hours.close_hour, 22);
    }

    #[test]
    fn inverted_hours_are_rejected() {
        let mut settings = Settings::default();
        settings.scheduling.open_hour = 22;
        settings.scheduling.close_hour = 9;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn production_requires_credentials() {
        let mut settings = Settings::default();
        settings.environment = RuntimeEnvironment::Production;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::MissingField(_))
        ));

        settings.salesforce.client_id = "3MVG9...".into();
        settings.salesforce.username = "svc@frontdesk.example".into();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn audience_falls_back_to_login_url() {
        let mut sf = SalesforceConfig::default();
        assert_eq!(sf.effective_audience(), "https://login.salesforce.com");
        sf.audience = "https://test.salesforce.com".into();
        assert_eq!(sf.effective_audience(), "https://test.salesforce.com");
    }
}
