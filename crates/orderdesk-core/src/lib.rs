//! Order lifecycle core for the OrderDesk dashboard.
//!
//! Orders move through a fixed set of statuses under the control of the
//! transition engine in [`state`]. Each status change is one atomic field
//! write; the refunds, customer notifications, fulfillment-issue bookkeeping
//! and group-session cascades it triggers run afterwards in [`handlers`] and
//! never undo it. [`engine::OrderDesk`] keeps the live order set cached and
//! [`projection`] derives the kanban board from it.

pub mod builder;
pub mod checklist;
pub mod directory;
pub mod engine;
pub mod handlers;
pub mod orders;
pub mod projection;
pub mod state;

#[cfg(test)]
mod test_support;

pub use builder::{BuilderError, DeskBuilder, DeskFactories};
pub use engine::{event_bus::EventBus, CommittedTransition, DeskError, OrderDesk};
pub use state::{NextAction, OrderStateError, SuggestedTransition, TransitionContext};
