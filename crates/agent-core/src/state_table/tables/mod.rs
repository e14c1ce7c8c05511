mod common;
mod inbound;
mod outbound;

pub use common::add_common_transitions;
pub use inbound::add_inbound_transitions;
pub use outbound::add_outbound_transitions;
