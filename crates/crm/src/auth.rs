//! OAuth 2.0 JWT bearer token exchange
//!
//! Salesforce connected apps accept an RS256-signed assertion naming the
//! consumer key (issuer), the integration user (subject), and the login host
//! (audience), with a short expiry. The exchange yields a bearer token plus
//! the instance URL to direct REST calls at. No refresh tokens: a token is
//! acquired per connection and an expired one is simply exchanged again.

use chrono::Utc;
use frontdesk_config::SalesforceConfig;
use frontdesk_core::GatewayError;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_PATH: &str = "/services/oauth2/token";

#[derive(Debug, Serialize)]
struct AssertionClaims {
    iss: String,
    sub: String,
    aud: String,
    exp: i64,
}

/// A bearer token and the org instance it is valid against.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub instance_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: String,
    error_description: Option<String>,
}

/// Signs assertions and exchanges them for access tokens.
pub struct TokenExchange {
    http: reqwest::Client,
    config: SalesforceConfig,
    key: EncodingKey,
}

impl std::fmt::Debug for TokenExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenExchange")
            .field("http", &self.http)
            .field("config", &self.config)
            .field("key", &"<EncodingKey>")
            .finish()
    }
}

impl TokenExchange {
    /// Load the signing key named by the configuration.
    pub fn from_config(config: SalesforceConfig) -> Result<Self, GatewayError> {
        let pem = std::fs::read(&config.private_key_path).map_err(|e| {
            GatewayError::Auth(format!(
                "cannot read signing key {}: {e}",
                config.private_key_path
            ))
        })?;
        let key = EncodingKey::from_rsa_pem(&pem)
            .map_err(|e| GatewayError::Auth(format!("invalid RSA signing key: {e}")))?;

        Ok(Self {
            http: reqwest::Client::new(),
            config,
            key,
        })
    }

    /// Build and sign the assertion for one exchange.
    fn assertion(&self) -> Result<String, GatewayError> {
        let claims = AssertionClaims {
            iss: self.config.client_id.clone(),
            sub: self.config.username.clone(),
            aud: self.config.effective_audience().to_string(),
            exp: Utc::now().timestamp() + self.config.token_ttl_secs as i64,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| GatewayError::Auth(format!("assertion signing failed: {e}")))
    }

    /// Exchange a fresh assertion for a bearer token.
    ///
    /// Rejection (revoked app, clock skew past the expiry window, bad user)
    /// surfaces as `GatewayError::Auth`, which callers treat as a retryable
    /// setup failure rather than a process fault.
    pub async fn bearer_token(&self) -> Result<AccessToken, GatewayError> {
        let assertion = self.assertion()?;
        let url = format!("{}{}", self.config.login_url.trim_end_matches('/'), TOKEN_PATH);

        let response = self
            .http
            .post(&url)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| GatewayError::Http(format!("token endpoint unreachable: {e}")))?;

        let status = response.status();
        if status.is_success() {
            let token: AccessToken = response
                .json()
                .await
                .map_err(|e| GatewayError::InvalidResponse(format!("token body: {e}")))?;
            tracing::debug!(instance = %token.instance_url, "bearer token acquired");
            return Ok(token);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<TokenErrorBody>(&body)
            .map(|e| {
                format!(
                    "{}: {}",
                    e.error,
                    e.error_description.unwrap_or_default()
                )
            })
            .unwrap_or(body);
        tracing::warn!(%status, %detail, "token exchange rejected");
        Err(GatewayError::Auth(detail))
    }

    pub fn config(&self) -> &SalesforceConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_file_is_an_auth_error() {
        let config = SalesforceConfig {
            private_key_path: "/nonexistent/frontdesk-test.pem".into(),
            ..SalesforceConfig::default()
        };
        let err = TokenExchange::from_config(config).unwrap_err();
        assert!(matches!(err, GatewayError::Auth(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn grant_type_is_the_jwt_bearer_urn() {
        // The exchange must use the bearer grant, not a password flow.
        assert_eq!(GRANT_TYPE, "urn:ietf:params:oauth:grant-type:jwt-bearer");
    }
}
