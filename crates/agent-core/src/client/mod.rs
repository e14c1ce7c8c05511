//! Session coordination
//!
//! [`AgentBuilder`] assembles a [`SessionCoordinator`] together with an
//! [`AgentHandle`]. The coordinator is spawned by the embedding code and runs
//! the whole session; the handle is the operator's side of it.

mod bootstrap;
mod builder;
mod coordinator;
mod handle;
mod lifecycle;


pub use builder::AgentBuilder;
pub use coordinator::SessionCoordinator;
pub use handle::AgentHandle;
