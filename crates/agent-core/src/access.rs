//! Access gate for outbound sessions
//!
//! Evaluated exactly once, before any audio or device work. Every failure mode
//! (missing key, refusal, transport error) collapses into [`AccessDecision::Denied`].

use std::sync::Arc;

use tracing::{info, warn};

use crate::collaborators::AccessVerifier;

/// Result of evaluating the launch access key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Key accepted; `org_id` overrides the launch context when present
    Authorized { org_id: Option<String> },
    Denied { reason: String },
}

impl AccessDecision {
    pub fn is_authorized(&self) -> bool {
        matches!(self, AccessDecision::Authorized { .. })
    }
}

pub struct AccessGate {
    verifier: Arc<dyn AccessVerifier>,
}

impl AccessGate {
    pub fn new(verifier: Arc<dyn AccessVerifier>) -> Self {
        Self { verifier }
    }

    /// Validate `key` against the verification collaborator.
    ///
    /// An absent or blank key is denied without contacting the collaborator.
    pub async fn evaluate(&self, key: Option<&str>) -> AccessDecision {
        let key = match key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => key,
            None => {
                warn!("No access key supplied, denying session");
                return AccessDecision::Denied {
                    reason: "missing access key".to_string(),
                };
            }
        };

        match self.verifier.verify(key).await {
            Ok(grant) => {
                info!(org_id = ?grant.org_id, "Access key verified");
                AccessDecision::Authorized {
                    org_id: grant.org_id,
                }
            }
            Err(e) => {
                warn!("Access verification failed: {}", e);
                AccessDecision::Denied {
                    reason: e.to_string(),
                }
            }
        }
    }
}
