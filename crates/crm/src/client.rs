//! Salesforce REST client

use async_trait::async_trait;
use frontdesk_config::SalesforceConfig;
use frontdesk_core::{GatewayError, Record, RecordGateway};
use serde::Deserialize;
use serde_json::Value;

use crate::auth::{AccessToken, TokenExchange};

#[derive(Debug, Deserialize)]
struct QueryResponse {
    records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    id: Option<String>,
    success: bool,
    #[serde(default)]
    errors: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
}

/// Record gateway over the Salesforce REST API.
///
/// Stateless between calls: each operation exchanges a fresh assertion for a
/// bearer token and issues one REST request. Connection pooling lives inside
/// the shared `reqwest::Client`; no token caching is attempted, matching the
/// short assertion validity window.
pub struct SalesforceClient {
    exchange: TokenExchange,
    http: reqwest::Client,
    api_version: String,
}

impl SalesforceClient {
    pub fn from_config(config: SalesforceConfig) -> Result<Self, GatewayError> {
        let api_version = config.api_version.clone();
        Ok(Self {
            exchange: TokenExchange::from_config(config)?,
            http: reqwest::Client::new(),
            api_version,
        })
    }

    async fn token(&self) -> Result<AccessToken, GatewayError> {
        self.exchange.bearer_token().await
    }

    fn data_url(&self, token: &AccessToken, path: &str) -> String {
        format!(
            "{}/services/data/{}/{path}",
            token.instance_url.trim_end_matches('/'),
            self.api_version
        )
    }

    /// Map a non-success REST response to the gateway taxonomy.
    async fn rejection(response: reqwest::Response) -> GatewayError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return GatewayError::Auth(format!("bearer token rejected: {body}"));
        }

        // Salesforce error bodies are arrays of {message, errorCode}.
        let detail = serde_json::from_str::<Vec<ApiErrorBody>>(&body)
            .ok()
            .and_then(|errors| {
                let joined = errors
                    .iter()
                    .map(|e| match &e.error_code {
                        Some(code) => format!("{code}: {}", e.message),
                        None => e.message.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join("; ");
                (!joined.is_empty()).then_some(joined)
            })
            .unwrap_or_else(|| format!("HTTP {status}: {body}"));

        GatewayError::Api(detail)
    }
}

#[async_trait]
impl RecordGateway for SalesforceClient {
    async fn query(&self, statement: &str) -> Result<Vec<Record>, GatewayError> {
        let token = self.token().await?;
        let url = self.data_url(&token, "query");

        tracing::debug!(statement, "salesforce query");
        let response = self
            .http
            .get(&url)
            .bearer_auth(&token.access_token)
            .query(&[("q", statement)])
            .send()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(format!("query body: {e}")))?;

        // The per-record "attributes" envelope is REST plumbing, not data.
        Ok(parsed
            .records
            .into_iter()
            .map(|mut record| {
                record.remove("attributes");
                record
            })
            .collect())
    }

    async fn create(&self, object_type: &str, fields: Value) -> Result<String, GatewayError> {
        let token = self.token().await?;
        let url = self.data_url(&token, &format!("sobjects/{object_type}"));

        tracing::debug!(object_type, "salesforce create");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&token.access_token)
            .json(&fields)
            .send()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let parsed: CreateResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(format!("create body: {e}")))?;

        if !parsed.success {
            return Err(GatewayError::Api(format!(
                "create reported failure: {:?}",
                parsed.errors
            )));
        }
        parsed
            .id
            .ok_or_else(|| GatewayError::InvalidResponse("create succeeded without an id".into()))
    }

    async fn update(
        &self,
        object_type: &str,
        id: &str,
        fields: Value,
    ) -> Result<(), GatewayError> {
        let token = self.token().await?;
        let url = self.data_url(&token, &format!("sobjects/{object_type}/{id}"));

        tracing::debug!(object_type, id, "salesforce update");
        let response = self
            .http
            .patch(&url)
            .bearer_auth(&token.access_token)
            .json(&fields)
            .send()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        Ok(())
    }
}
