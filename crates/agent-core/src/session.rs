//! Session state owned by the coordinator

use std::fmt;

use serde::Serialize;

use crate::call::{CallId, CallState};
use crate::context::{LaunchContext, SessionMode};

/// Outcome of the access gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationState {
    Unchecked,
    Authorized,
    Denied,
}

/// Operator-facing status line.
///
/// This is the only error surface exposed to the operator: every failure is
/// reduced to one of these short strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionStatus {
    Initializing,
    Unauthorized,
    MicrophoneBlocked,
    InitFailed,
    Ready,
    Calling { to: String },
    Ringing,
    IncomingCall { from: String },
    Connected,
    CallEnded,
    Rejected,
    CallFailed { reason: String },
    DeviceError { message: String },
    Closed,
}

impl SessionStatus {
    /// Statuses after which the session accepts no further work
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Unauthorized | SessionStatus::InitFailed | SessionStatus::Closed
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Initializing => write!(f, "Initializing…"),
            SessionStatus::Unauthorized => write!(f, "Unauthorized"),
            SessionStatus::MicrophoneBlocked => write!(f, "Microphone access blocked"),
            SessionStatus::InitFailed => write!(f, "Init failed"),
            SessionStatus::Ready => write!(f, "Ready for inbound calls"),
            SessionStatus::Calling { to } => write!(f, "Calling {}…", to),
            SessionStatus::Ringing => write!(f, "Ringing…"),
            SessionStatus::IncomingCall { from } => write!(f, "Incoming call from {}", from),
            SessionStatus::Connected => write!(f, "Connected"),
            SessionStatus::CallEnded => write!(f, "Call ended"),
            SessionStatus::Rejected => write!(f, "Rejected"),
            SessionStatus::CallFailed { reason } => write!(f, "Call failed: {}", reason),
            SessionStatus::DeviceError { message } => write!(f, "Device error: {}", message),
            SessionStatus::Closed => write!(f, "Session closed"),
        }
    }
}

/// One agent's softphone lifetime
#[derive(Debug, Clone)]
pub struct Session {
    pub mode: SessionMode,
    pub org_id: Option<String>,
    pub customer_id: Option<String>,
    /// Raw destination from the launch context; normalized at dial time
    pub destination: Option<String>,
    pub authorization: AuthorizationState,
    pub audio_ready: bool,
    pub status: SessionStatus,
    pub muted: bool,
}

impl Session {
    pub fn from_context(ctx: &LaunchContext) -> Self {
        Self {
            mode: ctx.session_mode(),
            org_id: ctx.org_id.clone(),
            customer_id: ctx.customer_id.clone(),
            destination: ctx.to.clone(),
            authorization: AuthorizationState::Unchecked,
            audio_ready: false,
            status: SessionStatus::Initializing,
            muted: false,
        }
    }
}

/// Point-in-time view of the session, published after every handled event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub mode: SessionMode,
    pub authorization: AuthorizationState,
    pub audio_ready: bool,
    pub status: SessionStatus,
    pub org_id: Option<String>,
    pub call_id: Option<CallId>,
    pub call_state: CallState,
    pub muted: bool,
}

impl SessionSnapshot {
    pub(crate) fn capture(session: &Session, call: Option<(CallId, CallState)>) -> Self {
        Self {
            mode: session.mode,
            authorization: session.authorization,
            audio_ready: session.audio_ready,
            status: session.status.clone(),
            org_id: session.org_id.clone(),
            call_id: call.map(|(id, _)| id),
            call_state: call.map(|(_, state)| state).unwrap_or(CallState::Idle),
            muted: session.muted,
        }
    }
}
