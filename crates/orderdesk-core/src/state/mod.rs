//! Order status management.
//!
//! `transition` holds the per-status table of writes, side effects and
//! next actions; `order` validates requests against it and commits them.

pub mod order;
pub mod transition;

pub use order::{OrderStateError, OrderStateMachine, Transition, TransitionContext};
pub use transition::{
	next_action, rule_for, suggest_transition, NextAction, SideEffect, SuggestedTransition,
	TransitionRule, DELETION_EFFECTS,
};
