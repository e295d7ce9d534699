//! Handlers for work that follows a committed order change.
//!
//! Refunds, customer notifications, fulfillment-issue bookkeeping and the
//! group-session cascade all live in [`side_effects`].

pub mod side_effects;

pub use side_effects::{DispatchReport, SideEffectDispatcher, SideEffectError};
