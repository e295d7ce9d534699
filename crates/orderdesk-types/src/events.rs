//! Events published on the desk event bus.
//!
//! Every transition and every side-effect outcome becomes a [`DeskEvent`].
//! Operator-facing surfaces turn events into short-lived notices via
//! [`DeskEvent::notice`]; each side effect has its own wording so a failed
//! refund never reads like a failed notification.

use crate::{truncate_id, NotificationKind, OrderStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Main event type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum DeskEvent {
	/// Changes to order documents made through the desk.
	Order(OrderEvent),
	/// Outcomes of best-effort side effects.
	SideEffect(SideEffectEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum OrderEvent {
	/// The status write for a transition committed.
	StatusChanged {
		order_id: String,
		from: OrderStatus,
		to: OrderStatus,
	},
	/// A checklist entry was flipped.
	ChecklistToggled {
		order_id: String,
		index: usize,
		checked: bool,
	},
	/// The order document was removed by an admin.
	Deleted { order_id: String },
	/// The live order set was refreshed from the store.
	OrdersRefreshed { count: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SideEffectEvent {
	RefundIssued {
		order_id: String,
		amount: Decimal,
	},
	/// The refund needs to be handled by hand; the order stays accepted.
	RefundFailed {
		order_id: String,
		amount: Decimal,
		error: String,
	},
	NotificationSent {
		order_id: String,
		kind: NotificationKind,
	},
	NotificationFailed {
		order_id: String,
		kind: NotificationKind,
		error: String,
	},
	SessionCancelled {
		order_id: String,
		session_id: String,
	},
	SessionCascadeFailed {
		order_id: String,
		session_id: String,
		error: String,
	},
	FulfillmentIssueRecorded {
		order_id: String,
		business_id: String,
	},
	FulfillmentIssueFailed {
		order_id: String,
		business_id: String,
		error: String,
	},
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
	Info,
	Success,
	Warning,
	Error,
}

/// Short operator-facing message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notice {
	pub level: NoticeLevel,
	pub message: String,
}

impl Notice {
	fn new(level: NoticeLevel, message: String) -> Self {
		Self { level, message }
	}
}

impl DeskEvent {
	/// Returns the notice an operator should see for this event.
	///
	/// Session-cascade outcomes and cache refreshes produce none.
	pub fn notice(&self) -> Option<Notice> {
		match self {
			DeskEvent::Order(event) => match event {
				OrderEvent::StatusChanged { order_id, to, .. } => Some(Notice::new(
					NoticeLevel::Success,
					format!("Order {} is now {}", truncate_id(order_id), to),
				)),
				OrderEvent::Deleted { order_id } => Some(Notice::new(
					NoticeLevel::Success,
					format!("Order {} deleted", truncate_id(order_id)),
				)),
				OrderEvent::ChecklistToggled { .. } | OrderEvent::OrdersRefreshed { .. } => None,
			},
			DeskEvent::SideEffect(event) => match event {
				SideEffectEvent::RefundIssued { amount, .. } => Some(Notice::new(
					NoticeLevel::Success,
					format!("Refunded {} for unavailable items", amount),
				)),
				SideEffectEvent::RefundFailed {
					order_id, amount, ..
				} => Some(Notice::new(
					NoticeLevel::Warning,
					format!(
						"Refund of {} for order {} failed, process it manually",
						amount,
						truncate_id(order_id)
					),
				)),
				SideEffectEvent::NotificationFailed { kind, .. } => Some(Notice::new(
					NoticeLevel::Error,
					format!("Customer notification ({}) could not be sent", kind),
				)),
				SideEffectEvent::FulfillmentIssueFailed { .. } => Some(Notice::new(
					NoticeLevel::Error,
					"Could not record the fulfillment issue for this business".to_string(),
				)),
				SideEffectEvent::NotificationSent { .. }
				| SideEffectEvent::FulfillmentIssueRecorded { .. }
				| SideEffectEvent::SessionCancelled { .. }
				| SideEffectEvent::SessionCascadeFailed { .. } => None,
			},
		}
	}
}
