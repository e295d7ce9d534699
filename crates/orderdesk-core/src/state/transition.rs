//! Transition table.
//!
//! What a status change writes and which side effects follow it is decided
//! here, per target status, instead of in scattered conditionals. The table
//! of suggested next actions for the board lives here too.

use crate::checklist::{all_checked, count_checked, unchecked_items};
use once_cell::sync::Lazy;
use orderdesk_types::{Order, OrderStatus, UnavailableLine};
use serde::Serialize;
use std::collections::HashMap;

/// Best-effort action run after a status write (or a deletion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
	/// Cancel the group session the order belongs to.
	CancelGroupSession,
	NotifyCancelled,
	/// Refund unavailable items of a card-paid order.
	RefundUnavailable,
	NotifyAcceptedWithUnavailable,
	/// Bump the business fulfillment-issue counter.
	RecordFulfillmentIssue,
	NotifyReady,
}

/// Effects of moving an order into one status.
#[derive(Debug, Clone)]
pub struct TransitionRule {
	/// Remove courier id, name, phone and claim time.
	pub clears_courier: bool,
	/// Record who served the order and when.
	pub stamps_server: bool,
	/// A non-blank cancellation reason must be supplied.
	pub requires_reason: bool,
	/// Unavailable items may be supplied and are recorded on the order.
	pub records_unavailable_items: bool,
	/// Side effects, in the order they run.
	pub side_effects: &'static [SideEffect],
}

/// A status change that only writes the status fields.
const PLAIN: TransitionRule = TransitionRule {
	clears_courier: false,
	stamps_server: false,
	requires_reason: false,
	records_unavailable_items: false,
	side_effects: &[],
};

static RULES: Lazy<HashMap<OrderStatus, TransitionRule>> = Lazy::new(|| {
	let mut m = HashMap::new();
	m.insert(
		OrderStatus::Pending,
		TransitionRule {
			clears_courier: true,
			..PLAIN
		},
	);
	m.insert(
		OrderStatus::Accepted,
		TransitionRule {
			records_unavailable_items: true,
			side_effects: &[
				SideEffect::RefundUnavailable,
				SideEffect::NotifyAcceptedWithUnavailable,
				SideEffect::RecordFulfillmentIssue,
			],
			..PLAIN
		},
	);
	m.insert(
		OrderStatus::Preparing,
		TransitionRule {
			clears_courier: true,
			..PLAIN
		},
	);
	m.insert(
		OrderStatus::Ready,
		TransitionRule {
			clears_courier: true,
			side_effects: &[SideEffect::NotifyReady],
			..PLAIN
		},
	);
	m.insert(OrderStatus::OnTheWay, PLAIN);
	m.insert(
		OrderStatus::Served,
		TransitionRule {
			stamps_server: true,
			..PLAIN
		},
	);
	m.insert(
		OrderStatus::Delivered,
		TransitionRule {
			stamps_server: true,
			..PLAIN
		},
	);
	m.insert(OrderStatus::Completed, PLAIN);
	m.insert(
		OrderStatus::Cancelled,
		TransitionRule {
			requires_reason: true,
			side_effects: &[SideEffect::CancelGroupSession, SideEffect::NotifyCancelled],
			..PLAIN
		},
	);
	m
});

/// Side effects of an admin deletion.
pub const DELETION_EFFECTS: &[SideEffect] = &[SideEffect::CancelGroupSession];

/// Returns the rule for moving into `status`.
pub fn rule_for(status: OrderStatus) -> &'static TransitionRule {
	RULES.get(&status).unwrap_or(&PLAIN)
}

/// One-click progression offered for an order on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
	Accept,
	/// Accept and record the unticked items as unavailable.
	AcceptWithShortages,
	StartPreparing,
	MarkReady,
	/// Dine-in orders are handed over at the table; recorded as delivered.
	MarkServed,
}

impl NextAction {
	pub fn target(&self) -> OrderStatus {
		match self {
			NextAction::Accept | NextAction::AcceptWithShortages => OrderStatus::Accepted,
			NextAction::StartPreparing => OrderStatus::Preparing,
			NextAction::MarkReady => OrderStatus::Ready,
			NextAction::MarkServed => OrderStatus::Delivered,
		}
	}

	pub fn requires_unavailable_items(&self) -> bool {
		matches!(self, NextAction::AcceptWithShortages)
	}
}

/// The next action for `order`, if the board offers one.
pub fn next_action(order: &Order) -> Option<NextAction> {
	match order.status {
		OrderStatus::Pending => {
			if count_checked(order) == 0 {
				None
			} else if all_checked(order, order.items.len()) {
				Some(NextAction::Accept)
			} else {
				Some(NextAction::AcceptWithShortages)
			}
		},
		OrderStatus::Accepted => Some(NextAction::StartPreparing),
		OrderStatus::Preparing => Some(NextAction::MarkReady),
		OrderStatus::Ready if order.is_dine_in() => Some(NextAction::MarkServed),
		_ => None,
	}
}

/// A next action resolved into a concrete transition request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedTransition {
	pub action: NextAction,
	pub target: OrderStatus,
	/// Items to pass as unavailable; empty unless the action needs them.
	pub unavailable_items: Vec<UnavailableLine>,
}

/// Resolves [`next_action`] with the inputs its transition needs.
pub fn suggest_transition(order: &Order) -> Option<SuggestedTransition> {
	let action = next_action(order)?;
	let unavailable_items = if action.requires_unavailable_items() {
		unchecked_items(order)
	} else {
		Vec::new()
	};
	Some(SuggestedTransition {
		action,
		target: action.target(),
		unavailable_items,
	})
}
