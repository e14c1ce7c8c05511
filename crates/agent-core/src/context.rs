//! Context resolver
//!
//! Reads the session's launch parameters once, synchronously, at startup. There
//! is no error path here: missing parameters stay `None` and are validated by the
//! component that needs them (the access gate for the key, session bootstrap for
//! the destination number).
//!
//! Recognised parameters: `accessKey`, `to`, `customerId`, `orgId` and the
//! display-mode flag `mode` (`inbound` | `outbound`). Without an explicit mode a
//! session is outbound when a destination is present and inbound otherwise.

use serde::{Deserialize, Serialize};
use url::Url;

/// Which half of the softphone this session runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Registers for signaling and waits for incoming calls
    Inbound,
    /// Verifies an access key and dials a single destination
    Outbound,
}

impl SessionMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "inbound" => Some(SessionMode::Inbound),
            "outbound" => Some(SessionMode::Outbound),
            _ => None,
        }
    }
}

/// Launch parameters of one agent session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchContext {
    pub access_key: Option<String>,
    pub to: Option<String>,
    pub customer_id: Option<String>,
    pub org_id: Option<String>,
    pub mode: Option<SessionMode>,
}

impl LaunchContext {
    /// Resolve from the query string of the page URL
    pub fn from_url(url: &Url) -> Self {
        Self::from_pairs(url.query_pairs())
    }

    /// Resolve from a raw query string, with or without the leading `?`
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()))
    }

    /// Resolve from key/value pairs. Unknown keys are ignored, blank values count as absent.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut ctx = LaunchContext::default();
        for (key, value) in pairs {
            let value = value.as_ref().trim();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "accessKey" => ctx.access_key = Some(value.to_string()),
                "to" => ctx.to = Some(value.to_string()),
                "customerId" => ctx.customer_id = Some(value.to_string()),
                "orgId" => ctx.org_id = Some(value.to_string()),
                "mode" => ctx.mode = SessionMode::parse(value),
                _ => {}
            }
        }
        ctx
    }

    /// Effective session mode
    pub fn session_mode(&self) -> SessionMode {
        match self.mode {
            Some(mode) => mode,
            None if self.to.is_some() => SessionMode::Outbound,
            None => SessionMode::Inbound,
        }
    }
}
