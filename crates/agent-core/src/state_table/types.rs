use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::call::{Call, CallDirection, CallState, TerminalStatus};
use crate::session::SessionStatus;

/// Key for looking up transitions in the table
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct StateKey {
    pub role: Role,
    pub state: CallState,
    pub event: EventKind,
}

/// Which calls a transition applies to
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Role {
    Inbound,
    Outbound,
    /// Applies to both directions
    Both,
}

impl From<CallDirection> for Role {
    fn from(direction: CallDirection) -> Self {
        match direction {
            CallDirection::Inbound => Role::Inbound,
            CallDirection::Outbound => Role::Outbound,
        }
    }
}

/// Lifecycle input with its payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    // SDK and bootstrap events
    Incoming { from: String },
    Dial { to: String },
    RemoteRinging,
    RemoteAnswered,
    RemoteDisconnect,
    SignalError { message: String },

    // Operator events
    Accept,
    Reject,
    HangUp,
    SetMuted { muted: bool },

    // Internal follow-up once the terminated call's record is out
    LogDispatched,
}

impl CallEvent {
    /// Payload-free kind used as the table key
    pub fn kind(&self) -> EventKind {
        match self {
            CallEvent::Incoming { .. } => EventKind::Incoming,
            CallEvent::Dial { .. } => EventKind::Dial,
            CallEvent::RemoteRinging => EventKind::RemoteRinging,
            CallEvent::RemoteAnswered => EventKind::RemoteAnswered,
            CallEvent::RemoteDisconnect => EventKind::RemoteDisconnect,
            CallEvent::SignalError { .. } => EventKind::SignalError,
            CallEvent::Accept => EventKind::Accept,
            CallEvent::Reject => EventKind::Reject,
            CallEvent::HangUp => EventKind::HangUp,
            CallEvent::SetMuted { .. } => EventKind::SetMuted,
            CallEvent::LogDispatched => EventKind::LogDispatched,
        }
    }

    /// Operator events without a matching transition are reported back as errors;
    /// everything else is ignored.
    pub fn is_operator(&self) -> bool {
        self.kind().is_operator()
    }
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    Incoming,
    Dial,
    RemoteRinging,
    RemoteAnswered,
    RemoteDisconnect,
    SignalError,
    Accept,
    Reject,
    HangUp,
    SetMuted,
    LogDispatched,
}

impl EventKind {
    pub fn is_operator(&self) -> bool {
        matches!(
            self,
            EventKind::Accept | EventKind::Reject | EventKind::HangUp | EventKind::SetMuted
        )
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            EventKind::Incoming => "Incoming",
            EventKind::Dial => "Dial",
            EventKind::RemoteRinging => "RemoteRinging",
            EventKind::RemoteAnswered => "RemoteAnswered",
            EventKind::RemoteDisconnect => "RemoteDisconnect",
            EventKind::SignalError => "SignalError",
            EventKind::Accept => "Accept",
            EventKind::Reject => "Reject",
            EventKind::HangUp => "HangUp",
            EventKind::SetMuted => "SetMuted",
            EventKind::LogDispatched => "LogDispatched",
        }
    }
}

/// Side effects executed in order when a transition fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Publish the incoming-call notification
    AnnounceIncoming,
    /// Answer the call at the SDK; failure aborts the transition
    SendAccept,
    /// Reject at the SDK; failure is only logged
    SendReject,
    /// Disconnect at the SDK; failure is only logged
    SendDisconnect,
    /// Forward the mute toggle; failure aborts the transition
    ApplyMute,
    /// Record the accept timestamp
    RecordStart,
    /// Record the end timestamp and terminal status (first terminal event wins)
    RecordEnd(TerminalStatus),
    StartTimer,
    StopTimer,
    /// Dispatch the call-log record (guarded by the call's logged flag)
    EmitCallLog,
    /// Discard the call object and reset call-scoped session state
    ReleaseCall,
    /// Destroy the telephony client and close the session
    TeardownSession,
}

/// Status line shown after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusTemplate {
    IncomingCall,
    Calling,
    Ringing,
    Connected,
    CallEnded,
    Rejected,
    CallFailed,
}

impl StatusTemplate {
    pub fn render(&self, call: &Call) -> SessionStatus {
        match self {
            StatusTemplate::IncomingCall => SessionStatus::IncomingCall {
                from: call.remote_number().to_string(),
            },
            StatusTemplate::Calling => SessionStatus::Calling {
                to: call.remote_number().to_string(),
            },
            StatusTemplate::Ringing => SessionStatus::Ringing,
            StatusTemplate::Connected => SessionStatus::Connected,
            StatusTemplate::CallEnded => SessionStatus::CallEnded,
            StatusTemplate::Rejected => SessionStatus::Rejected,
            StatusTemplate::CallFailed => SessionStatus::CallFailed {
                reason: call.failure_reason().unwrap_or("unknown error").to_string(),
            },
        }
    }
}

/// Transition definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Actions to execute
    pub actions: Vec<Action>,

    /// Next state (if changing)
    pub next_state: Option<CallState>,

    /// Status line to show afterwards (if changing)
    pub status: Option<StatusTemplate>,
}

impl Transition {
    pub fn has_action(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }

    pub fn records_end(&self) -> bool {
        self.actions.iter().any(|a| matches!(a, Action::RecordEnd(_)))
    }
}

/// The lifecycle transition table
#[derive(Debug, Default)]
pub struct TransitionTable {
    transitions: HashMap<StateKey, Transition>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self {
            transitions: HashMap::new(),
        }
    }

    pub fn insert(&mut self, key: StateKey, transition: Transition) {
        self.transitions.insert(key, transition);
    }

    /// Look up the transition for a call of `role`; role-specific rows take
    /// precedence over [`Role::Both`] rows.
    pub fn get(&self, role: Role, state: CallState, event: EventKind) -> Option<&Transition> {
        self.transitions
            .get(&StateKey { role, state, event })
            .or_else(|| {
                self.transitions.get(&StateKey {
                    role: Role::Both,
                    state,
                    event,
                })
            })
    }

    pub fn has_transition(&self, role: Role, state: CallState, event: EventKind) -> bool {
        self.get(role, state, event).is_some()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// States that appear as a source or a target of some transition
    pub fn collect_used_states(&self) -> HashSet<CallState> {
        let mut states = HashSet::new();
        for (key, transition) in &self.transitions {
            states.insert(key.state);
            if let Some(next) = transition.next_state {
                states.insert(next);
            }
        }
        states
    }

    /// Check the lifecycle invariants the coordinator relies on
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let used = self.collect_used_states();

        for role in [Role::Inbound, Role::Outbound] {
            for state in used.iter().filter(|s| s.is_live()) {
                // only states this role can actually reach
                let reachable = self.transitions.iter().any(|(k, t)| {
                    (k.role == role || k.role == Role::Both) && t.next_state == Some(*state)
                });
                if reachable && !self.has_transition(role, *state, EventKind::SignalError) {
                    errors.push(format!("{:?} state {:?} has no SignalError exit", role, state));
                }
            }

            match self.get(role, CallState::Ended, EventKind::LogDispatched) {
                Some(t) if t.next_state == Some(CallState::Idle) && t.has_action(Action::ReleaseCall) => {}
                _ => errors.push(format!("{:?} calls are never released from Ended", role)),
            }

            for event in [EventKind::RemoteDisconnect, EventKind::SignalError] {
                if self.has_transition(role, CallState::Ended, event) {
                    errors.push(format!(
                        "{:?} Ended must ignore {} so the first terminal event wins",
                        role,
                        event.type_name()
                    ));
                }
            }
        }

        for (key, transition) in &self.transitions {
            let entering_ended =
                transition.next_state == Some(CallState::Ended) && key.state != CallState::Ended;
            if entering_ended && !(transition.records_end() && transition.has_action(Action::EmitCallLog)) {
                errors.push(format!("{:?} must record the end and emit the call log", key));
            }
            if !entering_ended && (transition.records_end() || transition.has_action(Action::EmitCallLog)) {
                errors.push(format!("{:?} ends a call without entering Ended", key));
            }
            // the end timestamp is taken before the SDK round-trip
            let end_at = transition.actions.iter().position(|a| matches!(a, Action::RecordEnd(_)));
            let sdk_at = transition
                .actions
                .iter()
                .position(|a| matches!(a, Action::SendReject | Action::SendDisconnect));
            if let (Some(end_at), Some(sdk_at)) = (end_at, sdk_at) {
                if sdk_at < end_at {
                    errors.push(format!("{:?} records the end after the SDK command", key));
                }
            }
            if transition.has_action(Action::StartTimer) && transition.next_state != Some(CallState::Active) {
                errors.push(format!("{:?} starts the timer outside Active", key));
            }
            let leaves_active =
                key.state == CallState::Active && transition.next_state.map_or(false, |s| s != CallState::Active);
            if leaves_active && !transition.has_action(Action::StopTimer) {
                errors.push(format!("{:?} leaves Active without stopping the timer", key));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
