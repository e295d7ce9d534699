//! Customer notification payloads.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Notification types the order core sends.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
	OrderCancelled,
	OrderAcceptedWithUnavailable,
	OrderReady,
}

impl NotificationKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			NotificationKind::OrderCancelled => "order_cancelled",
			NotificationKind::OrderAcceptedWithUnavailable => "order_accepted_with_unavailable",
			NotificationKind::OrderReady => "order_ready",
		}
	}
}

impl fmt::Display for NotificationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Type-specific part of a notification, tagged by `type` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum NotificationPayload {
	OrderCancelled {
		reason: String,
	},
	OrderAcceptedWithUnavailable {
		/// Names of the items that could not be supplied.
		unavailable_items: Vec<String>,
		/// Zero when no refund was issued.
		refund_amount: Decimal,
	},
	OrderReady {
		has_table_service: bool,
		is_dine_in: bool,
	},
}

impl NotificationPayload {
	pub fn kind(&self) -> NotificationKind {
		match self {
			NotificationPayload::OrderCancelled { .. } => NotificationKind::OrderCancelled,
			NotificationPayload::OrderAcceptedWithUnavailable { .. } => {
				NotificationKind::OrderAcceptedWithUnavailable
			},
			NotificationPayload::OrderReady { .. } => NotificationKind::OrderReady,
		}
	}
}

/// A push notification addressed to one customer device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
	pub order_id: String,
	pub recipient_token: String,
	pub business_name: String,
	#[serde(flatten)]
	pub payload: NotificationPayload,
}

/// Sender answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationReceipt {
	pub delivered: bool,
}
