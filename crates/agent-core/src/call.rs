//! Call entity and lifecycle vocabulary
//!
//! A [`Call`] is one signaling exchange: one ring-to-termination cycle. It owns
//! every flag the lifecycle needs (accept timestamp, end timestamp, terminal
//! status, logged flag) so there is a single source of truth per call and the
//! exactly-once logging guard can be tested on its own.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::telephony::CallHandle;

/// Unique identifier the coordinator assigns to every call
pub type CallId = uuid::Uuid;

/// Direction of a call relative to the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallDirection {
    /// The remote party called the agent
    Inbound,
    /// The agent dialed the remote party
    Outbound,
}

impl CallDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallDirection::Inbound => "inbound",
            CallDirection::Outbound => "outbound",
        }
    }
}

impl fmt::Display for CallDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of the current call slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallState {
    /// No call object exists
    Idle,
    /// Incoming call signaled, waiting for the operator
    RingingIn,
    /// Outbound connect issued, waiting for the remote answer
    DialingOut,
    /// Call accepted or answered, duration timer running
    Active,
    /// Terminal; the call is logged and released right after entering this state
    Ended,
}

impl CallState {
    /// Whether a call in this state has not terminated yet
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            CallState::RingingIn | CallState::DialingOut | CallState::Active
        )
    }
}

/// How a call terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalStatus {
    /// Normal disconnect or operator hang-up
    Ended,
    /// SDK reported an error
    Failed,
    /// Operator rejected the incoming call
    Rejected,
}

impl TerminalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalStatus::Ended => "ended",
            TerminalStatus::Failed => "failed",
            TerminalStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One signaling exchange tracked by the coordinator
pub struct Call {
    id: CallId,
    direction: CallDirection,
    remote_number: String,
    state: CallState,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    terminal_status: Option<TerminalStatus>,
    failure_reason: Option<String>,
    logged: bool,
    handle: Arc<dyn CallHandle>,
}

impl Call {
    /// Create a fresh call. The logged flag always starts cleared.
    pub fn new(
        direction: CallDirection,
        remote_number: impl Into<String>,
        handle: Arc<dyn CallHandle>,
    ) -> Self {
        Self {
            id: CallId::new_v4(),
            direction,
            remote_number: remote_number.into(),
            state: CallState::Idle,
            started_at: None,
            ended_at: None,
            terminal_status: None,
            failure_reason: None,
            logged: false,
            handle,
        }
    }

    pub fn id(&self) -> CallId {
        self.id
    }

    pub fn direction(&self) -> CallDirection {
        self.direction
    }

    /// Remote party: the caller for inbound calls, the dialed number for outbound calls
    pub fn remote_number(&self) -> &str {
        &self.remote_number
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: CallState) {
        self.state = state;
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn terminal_status(&self) -> Option<TerminalStatus> {
        self.terminal_status
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn handle(&self) -> &Arc<dyn CallHandle> {
        &self.handle
    }

    /// Record the accept timestamp. Only the first call has an effect.
    pub fn mark_started(&mut self, now: DateTime<Utc>) {
        if self.started_at.is_none() && self.ended_at.is_none() {
            self.started_at = Some(now);
        }
    }

    /// Record the first terminal event.
    ///
    /// Returns `false` when the call already terminated; the earlier outcome is kept.
    pub fn mark_ended(
        &mut self,
        now: DateTime<Utc>,
        status: TerminalStatus,
        reason: Option<String>,
    ) -> bool {
        if self.terminal_status.is_some() {
            return false;
        }
        self.ended_at = Some(now);
        self.terminal_status = Some(status);
        self.failure_reason = reason;
        true
    }

    /// Whole seconds between accept and termination, 0 if the call never connected
    pub fn duration_seconds(&self) -> u64 {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => (end - start).num_seconds().max(0) as u64,
            _ => 0,
        }
    }

    /// Seconds elapsed since accept, as sampled by the duration timer
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u64 {
        match self.started_at {
            Some(start) => (now - start).num_seconds().max(0) as u64,
            None => 0,
        }
    }

    pub fn is_logged(&self) -> bool {
        self.logged
    }

    /// Check-and-set the logged flag.
    ///
    /// Returns `true` exactly once per call; every later attempt returns `false`.
    pub fn try_mark_logged(&mut self) -> bool {
        if self.logged {
            return false;
        }
        self.logged = true;
        true
    }
}

impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("id", &self.id)
            .field("direction", &self.direction)
            .field("remote_number", &self.remote_number)
            .field("state", &self.state)
            .field("started_at", &self.started_at)
            .field("ended_at", &self.ended_at)
            .field("terminal_status", &self.terminal_status)
            .field("logged", &self.logged)
            .finish_non_exhaustive()
    }
}
