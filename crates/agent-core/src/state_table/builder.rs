use crate::call::CallState;

use super::types::{Action, EventKind, Role, StateKey, StatusTemplate, Transition, TransitionTable};

/// Incrementally assembles a [`TransitionTable`]
#[derive(Debug, Default)]
pub struct TransitionTableBuilder {
    table: TransitionTable,
}

impl TransitionTableBuilder {
    pub fn new() -> Self {
        Self {
            table: TransitionTable::new(),
        }
    }

    pub fn add_transition(
        &mut self,
        role: Role,
        state: CallState,
        event: EventKind,
        transition: Transition,
    ) -> &mut Self {
        self.table.insert(StateKey { role, state, event }, transition);
        self
    }

    /// Shorthand for rows that change state and status
    pub fn add(
        &mut self,
        role: Role,
        state: CallState,
        event: EventKind,
        actions: Vec<Action>,
        next_state: Option<CallState>,
        status: Option<StatusTemplate>,
    ) -> &mut Self {
        self.add_transition(
            role,
            state,
            event,
            Transition {
                actions,
                next_state,
                status,
            },
        )
    }

    pub fn build(self) -> TransitionTable {
        self.table
    }
}
