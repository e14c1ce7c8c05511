//! Error types for the softphone agent
//!
//! Errors are grouped the way the coordinator reacts to them:
//!
//! - **Permission errors** (`MicrophoneUnavailable`) - recoverable through an
//!   explicit operator retry, never retried automatically
//! - **Authorization errors** (`AccessDenied`) - fatal to the session
//! - **Bootstrap errors** (`TokenFetchFailed`, `RegistrationFailed`, `Telephony`) -
//!   fatal to the session, the operator has to restart
//! - **Logging errors** (`Http`, `CallLogRejected`) - swallowed after a diagnostic log
//!
//! None of these cross the session boundary as structured values for the operator;
//! the coordinator turns them into a [`SessionStatus`](crate::session::SessionStatus).
//! Embedding code still receives them from [`AgentHandle`](crate::client::AgentHandle)
//! commands so it can tell "not permitted right now" apart from success.

use thiserror::Error;

use crate::call::CallState;

/// Result type for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors that can occur while running an agent session
#[derive(Debug, Error)]
pub enum AgentError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The access key was missing or refused by the verification collaborator
    #[error("Access denied: {reason}")]
    AccessDenied { reason: String },

    /// Microphone permission was denied or the capability is absent
    #[error("Microphone unavailable: {reason}")]
    MicrophoneUnavailable { reason: String },

    /// The output audio sink could not be constructed
    #[error("Audio output unavailable: {reason}")]
    AudioOutputUnavailable { reason: String },

    /// Identity token could not be fetched
    #[error("Token fetch failed: {reason}")]
    TokenFetchFailed { reason: String },

    /// Signaling registration failed
    #[error("Registration failed: {reason}")]
    RegistrationFailed { reason: String },

    /// The telephony SDK refused a command
    #[error("Telephony error: {message}")]
    Telephony { message: String },

    /// The call-log collaborator answered with a non-success status
    #[error("Call log rejected with HTTP status {status}")]
    CallLogRejected { status: u16 },

    /// Operator action is not permitted in the current call state
    #[error("Action '{action}' not permitted in state {state:?}")]
    InvalidState { action: String, state: Option<CallState> },

    /// The session has ended and no longer accepts commands
    #[error("Session closed")]
    SessionClosed,

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration could not be parsed
    #[error("Invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error while reading configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an access denied error
    pub fn access_denied(reason: impl Into<String>) -> Self {
        Self::AccessDenied {
            reason: reason.into(),
        }
    }

    /// Create a microphone error
    pub fn microphone(reason: impl Into<String>) -> Self {
        Self::MicrophoneUnavailable {
            reason: reason.into(),
        }
    }

    /// Create a telephony error
    pub fn telephony(message: impl Into<String>) -> Self {
        Self::Telephony {
            message: message.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(action: impl Into<String>, state: Option<CallState>) -> Self {
        Self::InvalidState {
            action: action.into(),
            state,
        }
    }

    /// Whether the operator may recover from this error without restarting the session
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AgentError::MicrophoneUnavailable { .. }
                | AgentError::AudioOutputUnavailable { .. }
                | AgentError::InvalidState { .. }
        )
    }
}
