//! Call lifecycle transition table
//!
//! The lifecycle is data: every `(role, state, event)` maps to the actions to
//! run, the next state and the status line to show. The coordinator looks a
//! transition up and executes it; an event with no row is ignored (SDK events)
//! or refused (operator commands). The first-terminal-event-wins rule follows
//! from `Ended` having no disconnect or error rows, and [`TransitionTable::validate`]
//! checks that and the other lifecycle invariants mechanically.

pub mod builder;
pub mod tables;
pub mod types;

pub use builder::TransitionTableBuilder;
pub use types::*;

use std::sync::Arc;

use lazy_static::lazy_static;

lazy_static! {
    /// The lifecycle table shared by every session
    pub static ref LIFECYCLE_TABLE: Arc<TransitionTable> = Arc::new(build_lifecycle_table());
}

/// Build the complete lifecycle table
pub fn build_lifecycle_table() -> TransitionTable {
    let mut builder = TransitionTableBuilder::new();
    tables::add_inbound_transitions(&mut builder);
    tables::add_outbound_transitions(&mut builder);
    tables::add_common_transitions(&mut builder);
    let table = builder.build();

    if let Err(errors) = table.validate() {
        tracing::error!("Lifecycle table validation failed: {:?}", errors);
    } else {
        tracing::debug!("Lifecycle table built with {} transitions", table.transition_count());
    }
    table
}
