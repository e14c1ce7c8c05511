use crate::call::{CallState, TerminalStatus};
use crate::state_table::{Action, EventKind, Role, StatusTemplate, Transition, TransitionTableBuilder};

/// Add the transitions of calls the agent places
pub fn add_outbound_transitions(builder: &mut TransitionTableBuilder) {
    // Idle -> DialingOut: connect issued during bootstrap
    builder.add_transition(
        Role::Outbound,
        CallState::Idle,
        EventKind::Dial,
        Transition {
            actions: vec![],
            next_state: Some(CallState::DialingOut),
            status: Some(StatusTemplate::Calling),
        },
    );

    // DialingOut: remote is ringing
    builder.add_transition(
        Role::Outbound,
        CallState::DialingOut,
        EventKind::RemoteRinging,
        Transition {
            actions: vec![],
            next_state: None,
            status: Some(StatusTemplate::Ringing),
        },
    );

    // DialingOut -> Active: remote answered
    builder.add_transition(
        Role::Outbound,
        CallState::DialingOut,
        EventKind::RemoteAnswered,
        Transition {
            actions: vec![Action::RecordStart, Action::StartTimer],
            next_state: Some(CallState::Active),
            status: Some(StatusTemplate::Connected),
        },
    );

    // DialingOut -> Ended: remote declined or went away before answering
    builder.add_transition(
        Role::Outbound,
        CallState::DialingOut,
        EventKind::RemoteDisconnect,
        Transition {
            actions: vec![Action::RecordEnd(TerminalStatus::Ended), Action::EmitCallLog],
            next_state: Some(CallState::Ended),
            status: Some(StatusTemplate::CallEnded),
        },
    );

    // DialingOut -> Ended: operator cancels
    builder.add_transition(
        Role::Outbound,
        CallState::DialingOut,
        EventKind::HangUp,
        Transition {
            actions: vec![
                Action::RecordEnd(TerminalStatus::Ended),
                Action::SendDisconnect,
                Action::EmitCallLog,
            ],
            next_state: Some(CallState::Ended),
            status: Some(StatusTemplate::CallEnded),
        },
    );

    // Active -> Ended: remote disconnect
    builder.add_transition(
        Role::Outbound,
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

    // Active -> Ended: operator hangs up
    builder.add_transition(
        Role::Outbound,
        CallState::Active,
        EventKind::HangUp,
        Transition {
            actions: vec![
                Action::StopTimer,
                Action::RecordEnd(TerminalStatus::Ended),
                Action::SendDisconnect,
                Action::EmitCallLog,
            ],
            next_state: Some(CallState::Ended),
            status: Some(StatusTemplate::CallEnded),
        },
    );

    // Active: mute toggle, no lifecycle change
    builder.add_transition(
        Role::Outbound,
        CallState::Active,
        EventKind::SetMuted,
        Transition {
            actions: vec![Action::ApplyMute],
            next_state: None,
            status: None,
        },
    );

    // Ended -> Idle: the outbound session ends with its call
    builder.add_transition(
        Role::Outbound,
        CallState::Ended,
        EventKind::LogDispatched,
        Transition {
            actions: vec![Action::ReleaseCall, Action::TeardownSession],
            next_state: Some(CallState::Idle),
            status: None,
        },
    );
}
