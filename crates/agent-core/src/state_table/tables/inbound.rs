use crate::call::{CallState, TerminalStatus};
use crate::state_table::{Action, EventKind, Role, StatusTemplate, Transition, TransitionTableBuilder};

/// Add the transitions of calls the agent receives
pub fn add_inbound_transitions(builder: &mut TransitionTableBuilder) {
    // Idle -> RingingIn: SDK reported an incoming call
    builder.add_transition(
        Role::Inbound,
        CallState::Idle,
        EventKind::Incoming,
        Transition {
            actions: vec![Action::AnnounceIncoming],
            next_state: Some(CallState::RingingIn),
            status: Some(StatusTemplate::IncomingCall),
        },
    );

    // RingingIn -> Active: operator accepts
    builder.add_transition(
        Role::Inbound,
        CallState::RingingIn,
        EventKind::Accept,
        Transition {
            actions: vec![Action::SendAccept, Action::RecordStart, Action::StartTimer],
            next_state: Some(CallState::Active),
            status: Some(StatusTemplate::Connected),
        },
    );

    // RingingIn -> Ended: operator rejects, never connected
    builder.add_transition(
        Role::Inbound,
        CallState::RingingIn,
        EventKind::Reject,
        Transition {
            actions: vec![
                Action::RecordEnd(TerminalStatus::Rejected),
                Action::SendReject,
                Action::EmitCallLog,
            ],
            next_state: Some(CallState::Ended),
            status: Some(StatusTemplate::Rejected),
        },
    );

    // RingingIn -> Ended: caller hung up before the operator acted
    builder.add_transition(
        Role::Inbound,
        CallState::RingingIn,
        EventKind::RemoteDisconnect,
        Transition {
            actions: vec![Action::RecordEnd(TerminalStatus::Ended), Action::EmitCallLog],
            next_state: Some(CallState::Ended),
            status: Some(StatusTemplate::CallEnded),
        },
    );

    // Active -> Ended: remote disconnect
    builder.add_transition(
        Role::Inbound,
        CallState::Active,
        EventKind::RemoteDisconnect,
        Transition {
            actions: vec![
                Action::StopTimer,
                Action::RecordEnd(TerminalStatus::Ended),
                Action::EmitCallLog,
            ],
            next_state: Some(CallState::Ended),
            status: Some(StatusTemplate::CallEnded),
        },
    );

    // Ended -> Idle: session stays up for the next call, last status stays visible
    builder.add_transition(
        Role::Inbound,
        CallState::Ended,
        EventKind::LogDispatched,
        Transition {
            actions: vec![Action::ReleaseCall],
            next_state: Some(CallState::Idle),
            status: None,
        },
    );
}
