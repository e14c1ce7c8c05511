use crate::call::{CallState, TerminalStatus};
use crate::state_table::{Action, EventKind, Role, StatusTemplate, TransitionTableBuilder};

/// Add transitions shared by both directions.
///
/// An SDK error terminates any live call. `Ended` has no error or disconnect
/// rows, so whichever terminal event arrives second is ignored.
pub fn add_common_transitions(builder: &mut TransitionTableBuilder) {
    for state in [CallState::RingingIn, CallState::DialingOut, CallState::Active] {
        builder.add(
            Role::Both,
            state,
            EventKind::SignalError,
            vec![
                Action::StopTimer,
                Action::RecordEnd(TerminalStatus::Failed),
                Action::EmitCallLog,
            ],
            Some(CallState::Ended),
            Some(StatusTemplate::CallFailed),
        );
    }
}
