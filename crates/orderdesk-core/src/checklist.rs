//! Kitchen availability checklist.
//!
//! Each line item of an order can be ticked as available. The ticks live on
//! the order under `checkedItems.<index>` and are written one key at a time.
//! The pure helpers below derive what the next action for a pending order
//! should be.

use crate::orders::{OrderStore, OrderStoreError};
use orderdesk_types::{truncate_id, FieldWrite, Order, UnavailableLine};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChecklistError {
	#[error("Order not found: {0}")]
	NotFound(String),
	#[error("Item index {index} out of range for an order with {len} items")]
	InvalidItemIndex { index: usize, len: usize },
	#[error("Storage error: {0}")]
	Storage(String),
}

impl From<OrderStoreError> for ChecklistError {
	fn from(err: OrderStoreError) -> Self {
		match err {
			OrderStoreError::NotFound(id) => ChecklistError::NotFound(id),
			OrderStoreError::Storage(e) => ChecklistError::Storage(e),
		}
	}
}

pub struct ChecklistTracker {
	store: Arc<OrderStore>,
}

impl ChecklistTracker {
	pub fn new(store: Arc<OrderStore>) -> Self {
		Self { store }
	}

	/// Flips the tick of item `index` and returns the new value.
	pub async fn toggle(&self, order_id: &str, index: usize) -> Result<bool, ChecklistError> {
		let order = self.store.get_order(order_id).await?;
		check_index(&order, index)?;
		let checked = !is_checked(&order, index);
		self.write(order_id, index, checked).await?;
		Ok(checked)
	}

	/// Sets the tick of item `index`.
	pub async fn set(&self, order_id: &str, index: usize, checked: bool) -> Result<(), ChecklistError> {
		let order = self.store.get_order(order_id).await?;
		check_index(&order, index)?;
		self.write(order_id, index, checked).await
	}

	async fn write(&self, order_id: &str, index: usize, checked: bool) -> Result<(), ChecklistError> {
		self.store
			.update_order_fields(
				order_id,
				&[FieldWrite::set(format!("checkedItems.{}", index), checked)],
			)
			.await?;
		tracing::debug!(order_id = %truncate_id(order_id), index, checked, "Checklist updated");
		Ok(())
	}
}

fn check_index(order: &Order, index: usize) -> Result<(), ChecklistError> {
	if index >= order.items.len() {
		return Err(ChecklistError::InvalidItemIndex {
			index,
			len: order.items.len(),
		});
	}
	Ok(())
}

fn is_checked(order: &Order, index: usize) -> bool {
	order.checked_items.get(&index).copied().unwrap_or(false)
}

/// Number of line items ticked as available. Stray keys beyond the item
/// list are ignored.
pub fn count_checked(order: &Order) -> usize {
	(0..order.items.len())
		.filter(|index| is_checked(order, *index))
		.count()
}

/// True when every one of `total_items` items is ticked. An empty order is
/// never fully checked.
pub fn all_checked(order: &Order, total_items: usize) -> bool {
	total_items > 0 && (0..total_items).all(|index| is_checked(order, index))
}

/// Items not ticked, with their index and original quantity and price.
pub fn unchecked_items(order: &Order) -> Vec<UnavailableLine> {
	order
		.items
		.iter()
		.enumerate()
		.filter(|(index, _)| !is_checked(order, *index))
		.map(|(index, item)| UnavailableLine {
			index,
			name: item.name.clone(),
			quantity: item.quantity,
			price: item.price,
		})
		.collect()
}

/// Coarse checklist progress of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecklistState {
	/// Nothing ticked yet.
	None,
	Partial,
	All,
}

pub fn checklist_state(order: &Order) -> ChecklistState {
	let checked = count_checked(order);
	if checked == 0 {
		ChecklistState::None
	} else if all_checked(order, order.items.len()) {
		ChecklistState::All
	} else {
		ChecklistState::Partial
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use orderdesk_storage::{implementations::memory::MemoryStorage, StorageService};
	use orderdesk_types::LineItem;
	use rust_decimal::Decimal;
	use rust_decimal_macros::dec;

	fn item(name: &str, quantity: u32, price: Decimal) -> LineItem {
		LineItem {
			product_id: format!("p-{}", name),
			name: name.to_string(),
			quantity,
			price,
			note: None,
			selected_options: Vec::new(),
		}
	}

	fn order_with_items(n: usize) -> Order {
		let mut order = Order::new("order-1", Utc::now());
		order.items = (0..n)
			.map(|i| item(&format!("item{}", i), 1, dec!(2)))
			.collect();
		order
	}

	#[test]
	fn test_all_checked_is_false_for_empty_orders() {
		let order = order_with_items(0);
		assert!(!all_checked(&order, 0));
		assert_eq!(checklist_state(&order), ChecklistState::None);
	}

	#[test]
	fn test_all_checked_requires_every_index() {
		let mut order = order_with_items(2);
		order.checked_items.insert(0, true);
		assert!(!all_checked(&order, 2));
		order.checked_items.insert(1, false);
		assert!(!all_checked(&order, 2));
		order.checked_items.insert(1, true);
		assert!(all_checked(&order, 2));
		assert_eq!(checklist_state(&order), ChecklistState::All);
	}

	#[test]
	fn test_count_ignores_stray_keys() {
		let mut order = order_with_items(2);
		order.checked_items.insert(0, true);
		order.checked_items.insert(7, true);
		assert_eq!(count_checked(&order), 1);
		assert!(count_checked(&order) <= order.items.len());
		assert_eq!(checklist_state(&order), ChecklistState::Partial);
	}

	#[test]
	fn test_unchecked_items_carry_index_and_price() {
		let mut order = order_with_items(0);
		order.items = vec![
			item("Bread", 1, dec!(2.00)),
			item("Milk", 2, dec!(1.10)),
			item("Eggs", 1, dec!(3.00)),
		];
		order.checked_items.insert(0, true);
		order.checked_items.insert(2, false);

		let lines = unchecked_items(&order);
		assert_eq!(lines.len(), 2);
		assert_eq!(lines[0].index, 1);
		assert_eq!(lines[0].name, "Milk");
		assert_eq!(lines[0].quantity, 2);
		assert_eq!(lines[0].price, dec!(1.10));
		assert_eq!(lines[1].index, 2);
	}

	#[tokio::test]
	async fn test_toggle_flips_single_key() {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let store = Arc::new(OrderStore::new(storage));
		let mut order = order_with_items(3);
		order.checked_items.insert(2, true);
		store.store_order(&order).await.unwrap();
		let tracker = ChecklistTracker::new(store.clone());

		assert!(tracker.toggle("order-1", 0).await.unwrap());
		assert!(!tracker.toggle("order-1", 2).await.unwrap());
		tracker.set("order-1", 1, true).await.unwrap();

		let stored = store.get_order("order-1").await.unwrap();
		assert_eq!(stored.checked_items.get(&0), Some(&true));
		assert_eq!(stored.checked_items.get(&1), Some(&true));
		assert_eq!(stored.checked_items.get(&2), Some(&false));
	}

	#[tokio::test]
	async fn test_toggle_rejects_out_of_range_index() {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let store = Arc::new(OrderStore::new(storage));
		store.store_order(&order_with_items(2)).await.unwrap();
		let tracker = ChecklistTracker::new(store.clone());

		assert!(matches!(
			tracker.toggle("order-1", 2).await,
			Err(ChecklistError::InvalidItemIndex { index: 2, len: 2 })
		));
		assert!(store.get_order("order-1").await.unwrap().checked_items.is_empty());
		assert!(matches!(
			tracker.toggle("ghost", 0).await,
			Err(ChecklistError::NotFound(_))
		));
	}
}
