//! Backend collaborators
//!
//! The identity-token issuer, the access-verification endpoint and the call-log
//! endpoint live outside this crate. The coordinator talks to them only through
//! the traits below; [`http`] provides the production implementations.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::call_log::CallLogRecord;
use crate::error::AgentResult;

pub use http::{HttpAccessVerifier, HttpCallLogSink, HttpTokenProvider};

/// Successful access-key verification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    /// Organisation the key belongs to; overrides the launch context when present
    #[serde(default)]
    pub org_id: Option<String>,
}

/// Issues signed identity tokens for the telephony client
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn fetch_token(&self, identity: &str) -> AgentResult<String>;
}

/// Validates outbound access keys.
///
/// Any refusal, non-success response or transport failure is an error; the
/// access gate maps every error to a denied session.
#[async_trait]
pub trait AccessVerifier: Send + Sync {
    async fn verify(&self, key: &str) -> AgentResult<AccessGrant>;
}

/// Receives the audit record of every terminated call
#[async_trait]
pub trait CallLogSink: Send + Sync {
    async fn submit(&self, record: &CallLogRecord) -> AgentResult<()>;
}
