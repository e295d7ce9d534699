//! Order document types.
//!
//! The order is stored as a single document whose fields are written
//! individually (see [`crate::update`]). Field names on the wire are
//! camelCase so that nested paths such as `statusHistory.ready` or
//! `checkedItems.2` address the same keys the document carries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A customer purchase tracked through a fixed lifecycle of statuses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	/// Opaque document id.
	pub id: String,
	/// Human-readable order number. Derived from the id when absent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub order_number: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub business_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub business_name: Option<String>,
	/// Absent for guest orders.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_phone: Option<String>,
	/// Line items in the order they were placed. Checklist keys index this list.
	#[serde(default)]
	pub items: Vec<LineItem>,
	#[serde(default)]
	pub subtotal: Decimal,
	#[serde(default)]
	pub delivery_fee: Decimal,
	#[serde(default)]
	pub total: Decimal,
	#[serde(default = "default_currency")]
	pub currency: String,
	/// How the order is handed to the customer.
	#[serde(rename = "type", default)]
	pub fulfillment: FulfillmentType,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub table_number: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub waiter_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub group_session_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub participant_count: Option<u32>,
	pub status: OrderStatus,
	/// First-entered (or most recently re-entered) time of every status the
	/// order has been in. Keys are never removed.
	#[serde(default)]
	pub status_history: BTreeMap<OrderStatus, DateTime<Utc>>,
	#[serde(default)]
	pub payment_method: PaymentMethod,
	#[serde(default)]
	pub payment_status: PaymentStatus,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payment_intent_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub courier_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub courier_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub courier_phone: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub claimed_at: Option<DateTime<Utc>>,
	/// Sparse availability checklist keyed by line-item index.
	#[serde(default)]
	pub checked_items: BTreeMap<usize, bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cancellation_reason: Option<String>,
	/// Items the operator marked out of stock when accepting.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub unavailable_items: Option<Vec<UnavailableItem>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub served_by_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub served_by_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub served_at: Option<DateTime<Utc>>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

fn default_currency() -> String {
	"EUR".to_string()
}

impl Order {
	/// Creates a pending order with no items, stamped `created_at`.
	///
	/// Used by ordering surfaces and tests; the desk itself never creates orders.
	pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
		let mut status_history = BTreeMap::new();
		status_history.insert(OrderStatus::Pending, created_at);
		Self {
			id: id.into(),
			order_number: None,
			business_id: None,
			business_name: None,
			customer_id: None,
			customer_name: None,
			customer_phone: None,
			items: Vec::new(),
			subtotal: Decimal::ZERO,
			delivery_fee: Decimal::ZERO,
			total: Decimal::ZERO,
			currency: default_currency(),
			fulfillment: FulfillmentType::default(),
			table_number: None,
			waiter_name: None,
			group_session_id: None,
			participant_count: None,
			status: OrderStatus::Pending,
			status_history,
			payment_method: PaymentMethod::default(),
			payment_status: PaymentStatus::default(),
			payment_intent_id: None,
			courier_id: None,
			courier_name: None,
			courier_phone: None,
			claimed_at: None,
			checked_items: BTreeMap::new(),
			cancellation_reason: None,
			unavailable_items: None,
			served_by_name: None,
			served_by_id: None,
			served_at: None,
			created_at,
			updated_at: created_at,
		}
	}

	/// Human-readable number: the stored one, or the last six characters of
	/// the id upper-cased.
	pub fn display_number(&self) -> String {
		if let Some(number) = self.order_number.as_deref().filter(|n| !n.is_empty()) {
			return number.to_string();
		}
		let chars: Vec<char> = self.id.chars().collect();
		let start = chars.len().saturating_sub(6);
		chars[start..].iter().collect::<String>().to_uppercase()
	}

	pub fn is_dine_in(&self) -> bool {
		self.fulfillment == FulfillmentType::DineIn
	}

	/// True while any courier field is present on the document.
	pub fn has_courier(&self) -> bool {
		self.courier_id.is_some()
			|| self.courier_name.is_some()
			|| self.courier_phone.is_some()
			|| self.claimed_at.is_some()
	}

	/// Card payments that have been captured can be partially refunded.
	pub fn is_refundable(&self) -> bool {
		self.payment_method == PaymentMethod::Card && self.payment_status == PaymentStatus::Paid
	}
}

/// A single line of an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
	#[serde(default)]
	pub product_id: String,
	pub name: String,
	pub quantity: u32,
	/// Unit price before modifier deltas.
	pub price: Decimal,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub note: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub selected_options: Vec<SelectedOption>,
}

impl LineItem {
	/// Unit price plus modifier deltas, times quantity.
	pub fn line_total(&self) -> Decimal {
		let deltas: Decimal = self.selected_options.iter().map(|o| o.price_delta).sum();
		(self.price + deltas) * Decimal::from(self.quantity)
	}
}

/// A modifier option chosen for a line item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SelectedOption {
	pub name: String,
	#[serde(default)]
	pub price_delta: Decimal,
}

/// How an order reaches the customer.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FulfillmentType {
	#[default]
	#[serde(rename = "pickup")]
	Pickup,
	#[serde(rename = "delivery")]
	Delivery,
	#[serde(rename = "dine-in")]
	DineIn,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
	Card,
	#[default]
	Cash,
	#[serde(other)]
	Other,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
	Paid,
	#[default]
	#[serde(other)]
	Unpaid,
}

/// Lifecycle status of an order.
///
/// Variants are declared in typical progression order. `Served` is kept for
/// records written before dine-in orders were collapsed into `Delivered`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
	Pending,
	Accepted,
	Preparing,
	Ready,
	OnTheWay,
	Served,
	Delivered,
	Completed,
	Cancelled,
}

impl OrderStatus {
	/// Every status, in progression order.
	pub const ALL: [OrderStatus; 9] = [
		OrderStatus::Pending,
		OrderStatus::Accepted,
		OrderStatus::Preparing,
		OrderStatus::Ready,
		OrderStatus::OnTheWay,
		OrderStatus::Served,
		OrderStatus::Delivered,
		OrderStatus::Completed,
		OrderStatus::Cancelled,
	];

	/// Stored string value, also used as the `statusHistory` key.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "pending",
			OrderStatus::Accepted => "accepted",
			OrderStatus::Preparing => "preparing",
			OrderStatus::Ready => "ready",
			OrderStatus::OnTheWay => "onTheWay",
			OrderStatus::Served => "served",
			OrderStatus::Delivered => "delivered",
			OrderStatus::Completed => "completed",
			OrderStatus::Cancelled => "cancelled",
		}
	}

	/// `served` and `delivered` both mean the customer has the food.
	pub fn is_fulfilled(&self) -> bool {
		matches!(self, OrderStatus::Served | OrderStatus::Delivered)
	}

	/// No further progression is expected from these statuses.
	pub fn is_terminal(&self) -> bool {
		self.is_fulfilled() || matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Returned when a string is not one of the fixed status values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
	type Err = UnknownStatus;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		OrderStatus::ALL
			.into_iter()
			.find(|status| status.as_str() == s)
			.ok_or_else(|| UnknownStatus(s.to_string()))
	}
}

/// An item the operator could not supply, as supplied by the caller of an
/// accept-with-shortages transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnavailableLine {
	/// Zero-based index into the order's line items.
	pub index: usize,
	pub name: String,
	pub quantity: u32,
	/// Unit price.
	pub price: Decimal,
}

/// An unavailable item as recorded on the order document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnavailableItem {
	/// One-based position of the item in the order.
	pub position_number: u32,
	pub product_name: String,
	pub quantity: u32,
	pub price: Decimal,
}

impl From<&UnavailableLine> for UnavailableItem {
	fn from(line: &UnavailableLine) -> Self {
		Self {
			position_number: line.index as u32 + 1,
			product_name: line.name.clone(),
			quantity: line.quantity,
			price: line.price,
		}
	}
}

/// The admin performing an action, recorded as the server of an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdminIdentity {
	pub id: String,
	pub name: String,
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;
	use serde_json::json;

	#[test]
	fn test_status_wire_names() {
		for status in OrderStatus::ALL {
			let encoded = serde_json::to_value(status).unwrap();
			assert_eq!(encoded, json!(status.as_str()));
			assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
		}
		assert_eq!(
			"shipped".parse::<OrderStatus>(),
			Err(UnknownStatus("shipped".to_string()))
		);
	}

	#[test]
	fn test_document_decodes_sparse_maps() {
		let doc = json!({
			"id": "ord-1",
			"status": "ready",
			"type": "dine-in",
			"items": [
				{"productId": "p1", "name": "Soup", "quantity": 2, "price": "4.50"}
			],
			"total": 9,
			"statusHistory": {"pending": "2026-01-01T10:00:00Z", "ready": "2026-01-01T10:20:00Z"},
			"checkedItems": {"0": true},
			"paymentMethod": "crypto",
			"createdAt": "2026-01-01T10:00:00Z",
			"updatedAt": "2026-01-01T10:20:00Z"
		});

		let order: Order = serde_json::from_value(doc).unwrap();
		assert_eq!(order.status, OrderStatus::Ready);
		assert!(order.is_dine_in());
		assert_eq!(order.items[0].price, dec!(4.50));
		assert_eq!(order.total, dec!(9));
		assert_eq!(order.checked_items.get(&0), Some(&true));
		assert!(order.status_history.contains_key(&OrderStatus::Ready));
		assert_eq!(order.payment_method, PaymentMethod::Other);
		assert_eq!(order.payment_status, PaymentStatus::Unpaid);
		assert_eq!(order.currency, "EUR");
	}

	#[test]
	fn test_display_number_falls_back_to_id() {
		let mut order = Order::new("abcdef123456", Utc::now());
		assert_eq!(order.display_number(), "123456");

		order.order_number = Some("A-17".to_string());
		assert_eq!(order.display_number(), "A-17");

		let short = Order::new("x1", Utc::now());
		assert_eq!(short.display_number(), "X1");
	}

	#[test]
	fn test_unavailable_item_position_is_one_based() {
		let line = UnavailableLine {
			index: 1,
			name: "X".to_string(),
			quantity: 1,
			price: dec!(5),
		};
		let item = UnavailableItem::from(&line);
		assert_eq!(item.position_number, 2);
		assert_eq!(item.product_name, "X");
	}

	#[test]
	fn test_line_total_includes_modifiers() {
		let item = LineItem {
			product_id: "p".to_string(),
			name: "Burger".to_string(),
			quantity: 2,
			price: dec!(8.00),
			note: None,
			selected_options: vec![SelectedOption {
				name: "Cheese".to_string(),
				price_delta: dec!(1.25),
			}],
		};
		assert_eq!(item.line_total(), dec!(18.50));
	}
}
