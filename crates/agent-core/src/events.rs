//! Event plumbing for the agent session
//!
//! Two directions of traffic go through this module:
//!
//! - **Inbound to the coordinator**: SDK callbacks, operator commands and timer
//!   ticks are all turned into [`SessionEvent`]s and pushed onto one unbounded
//!   queue. The coordinator drains that queue one event at a time, so no two
//!   handlers ever run concurrently and check-and-set patterns need no locking.
//! - **Outbound to observers**: the coordinator publishes [`AgentEvent`]s on a
//!   broadcast channel for whatever renders the operator UI.
//!
//! The SDK adapter never sees the queue directly. It receives a
//! [`DeviceEventSender`] when the telephony client is constructed and a
//! [`CallEventSender`] per call when the coordinator subscribes to it; the latter
//! stamps every signal with the coordinator's [`CallId`].

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::call::{CallId, CallState};
use crate::call_log::CallLogRecord;
use crate::error::AgentResult;
use crate::session::SessionStatus;
use crate::telephony::CallHandle;

/// Device-level events reported by the telephony client
pub enum DeviceEvent {
    /// Signaling registration completed
    Registered,
    /// Device-level failure not tied to a call
    Error { message: String },
    /// A new inbound call was signaled
    Incoming(Arc<dyn CallHandle>),
}

impl fmt::Debug for DeviceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceEvent::Registered => f.write_str("Registered"),
            DeviceEvent::Error { message } => {
                f.debug_struct("Error").field("message", message).finish()
            }
            DeviceEvent::Incoming(handle) => f
                .debug_tuple("Incoming")
                .field(&handle.remote_number())
                .finish(),
        }
    }
}

/// Per-call signals reported by the telephony client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallSignal {
    /// Remote side is ringing
    Ringing,
    /// Remote side answered (outbound calls)
    Accepted,
    /// Call disconnected
    Disconnected,
    /// SDK error for this call
    Error { message: String },
}

/// Commands issued by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorAction {
    Accept,
    Reject,
    HangUp,
    SetMuted(bool),
    RetryAudio,
    /// Close the session; refused while a call is in progress
    Shutdown,
}

impl OperatorAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorAction::Accept => "accept",
            OperatorAction::Reject => "reject",
            OperatorAction::HangUp => "hang_up",
            OperatorAction::SetMuted(_) => "set_muted",
            OperatorAction::RetryAudio => "retry_audio",
            OperatorAction::Shutdown => "shutdown",
        }
    }
}

/// Everything the coordinator reacts to, in arrival order
pub(crate) enum SessionEvent {
    Device(DeviceEvent),
    Call {
        call_id: CallId,
        signal: CallSignal,
    },
    Operator {
        action: OperatorAction,
        reply: oneshot::Sender<AgentResult<()>>,
    },
    TimerTick {
        call_id: CallId,
    },
}

pub(crate) type SessionEventSender = mpsc::UnboundedSender<SessionEvent>;
pub(crate) type SessionEventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// Handed to the telephony client at construction time.
///
/// Every method returns `false` once the session has shut down.
#[derive(Clone)]
pub struct DeviceEventSender {
    tx: SessionEventSender,
}

impl DeviceEventSender {
    pub(crate) fn new(tx: SessionEventSender) -> Self {
        Self { tx }
    }

    pub fn registered(&self) -> bool {
        self.send(DeviceEvent::Registered)
    }

    pub fn error(&self, message: impl Into<String>) -> bool {
        self.send(DeviceEvent::Error {
            message: message.into(),
        })
    }

    pub fn incoming(&self, call: Arc<dyn CallHandle>) -> bool {
        self.send(DeviceEvent::Incoming(call))
    }

    pub fn send(&self, event: DeviceEvent) -> bool {
        self.tx.send(SessionEvent::Device(event)).is_ok()
    }
}

/// Handed to a call handle when the coordinator subscribes to it
#[derive(Clone)]
pub struct CallEventSender {
    call_id: CallId,
    tx: SessionEventSender,
}

impl CallEventSender {
    pub(crate) fn new(call_id: CallId, tx: SessionEventSender) -> Self {
        Self { call_id, tx }
    }

    pub fn call_id(&self) -> CallId {
        self.call_id
    }

    pub fn ringing(&self) -> bool {
        self.send(CallSignal::Ringing)
    }

    pub fn accepted(&self) -> bool {
        self.send(CallSignal::Accepted)
    }

    pub fn disconnected(&self) -> bool {
        self.send(CallSignal::Disconnected)
    }

    pub fn error(&self, message: impl Into<String>) -> bool {
        self.send(CallSignal::Error {
            message: message.into(),
        })
    }

    pub fn send(&self, signal: CallSignal) -> bool {
        self.tx
            .send(SessionEvent::Call {
                call_id: self.call_id,
                signal,
            })
            .is_ok()
    }
}

/// Information about a call state change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallStatusInfo {
    /// Call that changed state
    pub call_id: CallId,
    /// State before the transition
    pub previous_state: CallState,
    /// State after the transition
    pub new_state: CallState,
    /// When the transition happened
    pub timestamp: DateTime<Utc>,
}

/// Events published to observers of the session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Operator-facing status line changed
    StatusChanged { status: SessionStatus },
    /// An inbound call is waiting for the operator
    IncomingCall { call_id: CallId, from: String },
    /// Call lifecycle transition
    CallStateChanged(CallStatusInfo),
    /// One duration timer tick
    DurationTick { call_id: CallId, elapsed_seconds: u64 },
    /// Mute toggled on the active call
    MuteChanged { call_id: CallId, muted: bool },
    /// The audit record for a call was handed to the call-log collaborator
    CallLogged(CallLogRecord),
}
