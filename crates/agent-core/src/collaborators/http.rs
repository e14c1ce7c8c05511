//! HTTP implementations of the backend collaborators
//!
//! - token: `GET <token_url>?identity=<identity>` answering `{ "token": "..." }`
//! - access: `POST <verify_url>` with `{ "key": "..." }`, any non-2xx is a denial
//! - call log: `POST <call_log_url>` with the JSON record, fire-and-forget

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use url::Url;

use super::{AccessGrant, AccessVerifier, CallLogSink, TokenProvider};
use crate::call_log::CallLogRecord;
use crate::config::{parse_endpoint, AgentConfig};
use crate::error::{AgentError, AgentResult};

fn build_client(config: &AgentConfig) -> AgentResult<Client> {
    Ok(Client::builder().timeout(config.http_timeout()).build()?)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Fetches identity tokens from the token endpoint
#[derive(Debug, Clone)]
pub struct HttpTokenProvider {
    client: Client,
    url: Url,
}

impl HttpTokenProvider {
    pub fn new(config: &AgentConfig) -> AgentResult<Self> {
        Ok(Self {
            client: build_client(config)?,
            url: parse_endpoint("token_url", &config.token_url)?,
        })
    }
}

#[async_trait]
impl TokenProvider for HttpTokenProvider {
    async fn fetch_token(&self, identity: &str) -> AgentResult<String> {
        let start = Instant::now();
        let response = self
            .client
            .get(self.url.clone())
            .query(&[("identity", identity)])
            .send()
            .await
            .map_err(|e| AgentError::TokenFetchFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::TokenFetchFailed {
                reason: format!("token endpoint returned HTTP {}", status.as_u16()),
            });
        }

        let body: TokenResponse = response.json().await.map_err(|e| AgentError::TokenFetchFailed {
            reason: format!("malformed token response: {}", e),
        })?;
        if body.token.is_empty() {
            return Err(AgentError::TokenFetchFailed {
                reason: "token endpoint returned an empty token".to_string(),
            });
        }
        debug!(
            identity,
            elapsed = start.elapsed().as_millis() as u64,
            "identity token fetched"
        );
        Ok(body.token)
    }
}

/// Verifies access keys against the verification endpoint
#[derive(Debug, Clone)]
pub struct HttpAccessVerifier {
    client: Client,
    url: Url,
}

impl HttpAccessVerifier {
    pub fn new(config: &AgentConfig) -> AgentResult<Self> {
        let verify_url = config
            .verify_url
            .as_deref()
            .ok_or_else(|| AgentError::config("verify_url is required for outbound sessions"))?;
        Ok(Self {
            client: build_client(config)?,
            url: parse_endpoint("verify_url", verify_url)?,
        })
    }
}

#[async_trait]
impl AccessVerifier for HttpAccessVerifier {
    async fn verify(&self, key: &str) -> AgentResult<AccessGrant> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&json!({ "key": key }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::access_denied(format!(
                "verification returned HTTP {}",
                status.as_u16()
            )));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(AccessGrant::default());
        }
        match serde_json::from_str(&body) {
            Ok(grant) => Ok(grant),
            Err(e) => {
                warn!("Unreadable verification body, granting without org id: {}", e);
                Ok(AccessGrant::default())
            }
        }
    }
}

/// Posts call-log records to the logging endpoint
#[derive(Debug, Clone)]
pub struct HttpCallLogSink {
    client: Client,
    url: Url,
}

impl HttpCallLogSink {
    pub fn new(config: &AgentConfig) -> AgentResult<Self> {
        Ok(Self {
            client: build_client(config)?,
            url: parse_endpoint("call_log_url", &config.call_log_url)?,
        })
    }
}

#[async_trait]
impl CallLogSink for HttpCallLogSink {
    async fn submit(&self, record: &CallLogRecord) -> AgentResult<()> {
        let start = Instant::now();
        let response = self.client.post(self.url.clone()).json(record).send().await?;
        let status = response.status();
        info!(
            to = %record.to,
            status = %record.status,
            http_status = status.as_u16(),
            elapsed = start.elapsed().as_millis() as u64,
            "call log submitted"
        );
        if !status.is_success() {
            return Err(AgentError::CallLogRejected {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
