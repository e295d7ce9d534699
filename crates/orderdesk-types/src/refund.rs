//! Partial refund requests and receipts.

use crate::UnavailableItem;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Request sent to the refund gateway for items that could not be supplied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
	pub order_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payment_intent_id: Option<String>,
	pub unavailable_items: Vec<UnavailableItem>,
	/// Sum of price times quantity over `unavailable_items`.
	pub amount: Decimal,
}

impl RefundRequest {
	/// Builds a request whose amount is computed from exactly `items`.
	pub fn new(
		order_id: impl Into<String>,
		payment_intent_id: Option<String>,
		items: Vec<UnavailableItem>,
	) -> Self {
		let amount = refund_total(&items);
		Self {
			order_id: order_id.into(),
			payment_intent_id,
			unavailable_items: items,
			amount,
		}
	}
}

/// Gateway answer to a refund request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RefundReceipt {
	pub refunded: bool,
	#[serde(default)]
	pub refund_amount: Decimal,
}

/// Sum of `price * quantity` over the given items.
pub fn refund_total(items: &[UnavailableItem]) -> Decimal {
	items
		.iter()
		.map(|item| item.price * Decimal::from(item.quantity))
		.sum()
}
