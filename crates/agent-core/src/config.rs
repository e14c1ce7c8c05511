//! Agent configuration
//!
//! Collaborator endpoints and behavioural knobs for one agent deployment.
//! Configuration can be built in code with the `with_*` setters or loaded from a
//! TOML file:
//!
//! ```toml
//! token_url = "https://voice.example.com/getVoiceToken"
//! verify_url = "https://voice.example.com/verifyAccessKey"
//! call_log_url = "https://voice.example.com/createCallLog"
//! identity = "agent"
//! tick_interval_ms = 1000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AgentError, AgentResult};
use crate::telephony::ClientOptions;

fn default_identity() -> String {
    "agent".to_string()
}

fn default_true() -> bool {
    true
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_reject_reason() -> String {
    "Agent rejected".to_string()
}

/// Configuration of an agent session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Identity-token endpoint, queried with `?identity=<identity>`
    pub token_url: String,

    /// Access-key verification endpoint (outbound sessions only)
    #[serde(default)]
    pub verify_url: Option<String>,

    /// Call-log endpoint receiving one record per call
    pub call_log_url: String,

    /// Agent identity the token is scoped to
    #[serde(default = "default_identity")]
    pub identity: String,

    /// Ask the SDK for a distinct ringing state
    #[serde(default = "default_true")]
    pub enable_ringing_state: bool,

    /// Ask the host to confirm before closing during a call
    #[serde(default = "default_true")]
    pub close_protection: bool,

    /// Duration timer period in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Timeout applied to every collaborator request
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Reason recorded when the operator rejects a call
    #[serde(default = "default_reject_reason")]
    pub reject_reason: String,
}

impl AgentConfig {
    /// Create a configuration with the required endpoints and default behaviour
    pub fn new(token_url: impl Into<String>, call_log_url: impl Into<String>) -> Self {
        Self {
            token_url: token_url.into(),
            verify_url: None,
            call_log_url: call_log_url.into(),
            identity: default_identity(),
            enable_ringing_state: true,
            close_protection: true,
            tick_interval_ms: default_tick_interval_ms(),
            http_timeout_secs: default_http_timeout_secs(),
            reject_reason: default_reject_reason(),
        }
    }

    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> AgentResult<Self> {
        let config: AgentConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> AgentResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn with_verify_url(mut self, url: impl Into<String>) -> Self {
        self.verify_url = Some(url.into());
        self
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    pub fn with_ringing_state(mut self, enabled: bool) -> Self {
        self.enable_ringing_state = enabled;
        self
    }

    pub fn with_close_protection(mut self, enabled: bool) -> Self {
        self.close_protection = enabled;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_reject_reason(mut self, reason: impl Into<String>) -> Self {
        self.reject_reason = reason.into();
        self
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Options handed to the telephony SDK at construction
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            enable_ringing_state: self.enable_ringing_state,
            close_protection: self.close_protection,
        }
    }

    /// Check endpoints and timing values
    pub fn validate(&self) -> AgentResult<()> {
        parse_endpoint("token_url", &self.token_url)?;
        parse_endpoint("call_log_url", &self.call_log_url)?;
        if let Some(verify_url) = &self.verify_url {
            parse_endpoint("verify_url", verify_url)?;
        }
        if self.identity.trim().is_empty() {
            return Err(AgentError::config("identity must not be empty"));
        }
        if self.tick_interval_ms == 0 {
            return Err(AgentError::config("tick_interval_ms must be greater than zero"));
        }
        if self.http_timeout_secs == 0 {
            return Err(AgentError::config("http_timeout_secs must be greater than zero"));
        }
        Ok(())
    }
}

/// Parse an endpoint URL, naming the offending field on failure
pub(crate) fn parse_endpoint(field: &str, value: &str) -> AgentResult<Url> {
    if value.trim().is_empty() {
        return Err(AgentError::config(format!("{} must not be empty", field)));
    }
    Url::parse(value).map_err(|e| AgentError::config(format!("{} is not a valid URL: {}", field, e)))
}
