//! Order status transitions.
//!
//! A transition is validated against the order snapshot, turned into one
//! list of field writes by [`OrderStateMachine::plan_writes`], and committed
//! with a single atomic update. Nothing is written when validation fails.

use super::transition::rule_for;
use crate::orders::{OrderStore, OrderStoreError};
use chrono::{DateTime, Utc};
use orderdesk_types::{
	truncate_id, AdminIdentity, FieldWrite, Order, OrderStatus, UnavailableItem, UnavailableLine,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

const COURIER_FIELDS: [&str; 4] = ["courierId", "courierName", "courierPhone", "claimedAt"];

#[derive(Debug, Error)]
pub enum OrderStateError {
	#[error("A cancellation reason is required to cancel an order")]
	MissingReason,
	#[error("Order not found: {0}")]
	NotFound(String),
	#[error("Invalid transition request: {0}")]
	InvalidContext(String),
	#[error("Update failed: {0}")]
	UpdateFailed(String),
}

impl From<OrderStoreError> for OrderStateError {
	fn from(err: OrderStoreError) -> Self {
		match err {
			OrderStoreError::NotFound(id) => OrderStateError::NotFound(id),
			OrderStoreError::Storage(e) => OrderStateError::UpdateFailed(e),
		}
	}
}

/// Caller-supplied inputs of a transition.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionContext {
	/// Required when cancelling.
	#[serde(default)]
	pub cancellation_reason: Option<String>,
	/// Items that cannot be supplied; only allowed when accepting.
	#[serde(default)]
	pub unavailable_items: Vec<UnavailableLine>,
	/// Admin performing the change, recorded when serving.
	#[serde(default)]
	pub actor: Option<AdminIdentity>,
}

impl TransitionContext {
	pub fn cancel(reason: impl Into<String>) -> Self {
		Self {
			cancellation_reason: Some(reason.into()),
			..Self::default()
		}
	}

	pub fn accept_with_shortages(items: Vec<UnavailableLine>) -> Self {
		Self {
			unavailable_items: items,
			..Self::default()
		}
	}

	pub fn with_actor(mut self, actor: AdminIdentity) -> Self {
		self.actor = Some(actor);
		self
	}

	fn reason(&self) -> Option<&str> {
		self.cancellation_reason
			.as_deref()
			.map(str::trim)
			.filter(|reason| !reason.is_empty())
	}
}

/// A committed status change, carrying the snapshot side effects read from.
#[derive(Debug, Clone)]
pub struct Transition {
	pub order_id: String,
	pub from: OrderStatus,
	pub to: OrderStatus,
	pub at: DateTime<Utc>,
	/// The order as it was when the transition was requested.
	pub snapshot: Order,
	pub context: TransitionContext,
	/// Unavailable items as recorded on the order.
	pub unavailable_items: Vec<UnavailableItem>,
}

impl Transition {
	/// Re-applying the current status refreshes timestamps only.
	pub fn is_same_status(&self) -> bool {
		self.from == self.to
	}

	/// Reason given for a cancellation, if any.
	pub fn cancellation_reason(&self) -> Option<&str> {
		self.context.reason()
	}
}

/// Validates and commits status changes.
pub struct OrderStateMachine {
	store: Arc<OrderStore>,
	/// Recorded as the server when no admin identity is known.
	fallback_admin_label: String,
}

impl OrderStateMachine {
	pub fn new(store: Arc<OrderStore>, fallback_admin_label: impl Into<String>) -> Self {
		Self {
			store,
			fallback_admin_label: fallback_admin_label.into(),
		}
	}

	/// Reads the order fresh and moves it to `target`.
	pub async fn request_transition(
		&self,
		order_id: &str,
		target: OrderStatus,
		context: TransitionContext,
	) -> Result<Transition, OrderStateError> {
		let snapshot = self.store.get_order(order_id).await?;
		self.apply_transition(snapshot, target, context).await
	}

	/// Moves the order described by `snapshot` to `target`.
	#[instrument(skip_all, fields(order_id = %truncate_id(&snapshot.id), from = %snapshot.status, to = %target))]
	pub async fn apply_transition(
		&self,
		snapshot: Order,
		target: OrderStatus,
		context: TransitionContext,
	) -> Result<Transition, OrderStateError> {
		let at = Utc::now();
		let writes = self.plan_writes(&snapshot, target, &context, at)?;

		self.store
			.update_order_fields(&snapshot.id, &writes)
			.await
			.map_err(|e| {
				tracing::error!(error = %e, "Status write failed");
				OrderStateError::from(e)
			})?;
		tracing::info!("Status updated");

		let unavailable_items = recorded_unavailable_items(target, &context);
		Ok(Transition {
			order_id: snapshot.id.clone(),
			from: snapshot.status,
			to: target,
			at,
			snapshot,
			context,
			unavailable_items,
		})
	}

	/// Builds the field writes for moving `snapshot` to `target` at `at`.
	///
	/// Pure: validation failures are returned before anything is written.
	pub fn plan_writes(
		&self,
		snapshot: &Order,
		target: OrderStatus,
		context: &TransitionContext,
		at: DateTime<Utc>,
	) -> Result<Vec<FieldWrite>, OrderStateError> {
		let rule = rule_for(target);

		// Re-cancelling an already cancelled order without a reason is
		// accepted as a plain refresh.
		let reason = context.reason();
		if rule.requires_reason && reason.is_none() && snapshot.status != target {
			return Err(OrderStateError::MissingReason);
		}
		validate_unavailable_items(snapshot, target, &context.unavailable_items)?;

		let mut writes = vec![
			FieldWrite::set("status", target.as_str()),
			FieldWrite::timestamp(format!("statusHistory.{}", target.as_str()), at),
			FieldWrite::timestamp("updatedAt", at),
		];

		if rule.clears_courier {
			writes.extend(COURIER_FIELDS.iter().map(|field| FieldWrite::delete(*field)));
		}

		if rule.stamps_server {
			match &context.actor {
				Some(actor) => {
					writes.push(FieldWrite::set("servedByName", actor.name.as_str()));
					writes.push(FieldWrite::set("servedById", actor.id.as_str()));
				},
				None => {
					writes.push(FieldWrite::set(
						"servedByName",
						self.fallback_admin_label.as_str(),
					));
					writes.push(FieldWrite::delete("servedById"));
				},
			}
			writes.push(FieldWrite::timestamp("servedAt", at));
		}

		if rule.requires_reason {
			if let Some(reason) = reason {
				writes.push(FieldWrite::set("cancellationReason", reason));
			}
		}

		if rule.records_unavailable_items && !context.unavailable_items.is_empty() {
			let items = recorded_unavailable_items(target, context);
			let value = serde_json::to_value(&items)
				.map_err(|e| OrderStateError::InvalidContext(e.to_string()))?;
			writes.push(FieldWrite::set("unavailableItems", value));
		}

		Ok(writes)
	}
}

fn validate_unavailable_items(
	snapshot: &Order,
	target: OrderStatus,
	items: &[UnavailableLine],
) -> Result<(), OrderStateError> {
	if items.is_empty() {
		return Ok(());
	}
	if !rule_for(target).records_unavailable_items {
		return Err(OrderStateError::InvalidContext(format!(
			"unavailable items can only be recorded when accepting, not when moving to {}",
			target
		)));
	}

	let mut seen = HashSet::new();
	for line in items {
		if line.index >= snapshot.items.len() {
			return Err(OrderStateError::InvalidContext(format!(
				"unavailable item index {} is out of range for an order with {} items",
				line.index,
				snapshot.items.len()
			)));
		}
		if !seen.insert(line.index) {
			return Err(OrderStateError::InvalidContext(format!(
				"unavailable item index {} listed twice",
				line.index
			)));
		}
	}
	Ok(())
}

fn recorded_unavailable_items(
	target: OrderStatus,
	context: &TransitionContext,
) -> Vec<UnavailableItem> {
	if !rule_for(target).records_unavailable_items {
		return Vec::new();
	}
	context
		.unavailable_items
		.iter()
		.map(UnavailableItem::from)
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use orderdesk_storage::{implementations::memory::MemoryStorage, StorageService};
	use orderdesk_types::{find_write, Collection, FieldOp, LineItem};
	use rust_decimal_macros::dec;
	use serde_json::json;

	fn line_item(name: &str, quantity: u32, price: rust_decimal::Decimal) -> LineItem {
		LineItem {
			product_id: name.to_lowercase(),
			name: name.to_string(),
			quantity,
			price,
			note: None,
			selected_options: Vec::new(),
		}
	}

	fn sample_order(status: OrderStatus) -> Order {
		let mut order = Order::new("order-123456", Utc::now());
		order.status = status;
		order.items = vec![
			line_item("Bread", 1, dec!(2.00)),
			line_item("Milk", 2, dec!(1.10)),
			line_item("Eggs", 1, dec!(3.00)),
		];
		order
	}

	async fn machine_with(order: &Order) -> (Arc<StorageService>, OrderStateMachine) {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let store = Arc::new(OrderStore::new(storage.clone()));
		store.store_order(order).await.unwrap();
		(storage, OrderStateMachine::new(store, "Admin"))
	}

	fn machine() -> OrderStateMachine {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		OrderStateMachine::new(Arc::new(OrderStore::new(storage)), "Admin")
	}

	#[test]
	fn test_writes_always_cover_status_fields() {
		let machine = machine();
		let order = sample_order(OrderStatus::Accepted);
		let at = Utc::now();
		let writes = machine
			.plan_writes(&order, OrderStatus::Preparing, &TransitionContext::default(), at)
			.unwrap();

		assert_eq!(
			find_write(&writes, "status").map(|w| &w.op),
			Some(&FieldOp::Set(json!("preparing")))
		);
		assert!(find_write(&writes, "statusHistory.preparing").is_some());
		assert!(find_write(&writes, "updatedAt").is_some());
		for field in COURIER_FIELDS {
			assert_eq!(
				find_write(&writes, field).map(|w| &w.op),
				Some(&FieldOp::Delete)
			);
		}
	}

	#[test]
	fn test_cancel_without_reason_is_rejected() {
		let machine = machine();
		let order = sample_order(OrderStatus::Preparing);
		for reason in [None, Some("   ".to_string())] {
			let context = TransitionContext {
				cancellation_reason: reason,
				..TransitionContext::default()
			};
			assert!(matches!(
				machine.plan_writes(&order, OrderStatus::Cancelled, &context, Utc::now()),
				Err(OrderStateError::MissingReason)
			));
		}
	}

	#[test]
	fn test_serving_falls_back_to_admin_label() {
		let machine = machine();
		let order = sample_order(OrderStatus::Ready);
		let writes = machine
			.plan_writes(&order, OrderStatus::Delivered, &TransitionContext::default(), Utc::now())
			.unwrap();
		assert_eq!(
			find_write(&writes, "servedByName").map(|w| &w.op),
			Some(&FieldOp::Set(json!("Admin")))
		);
		assert_eq!(
			find_write(&writes, "servedById").map(|w| &w.op),
			Some(&FieldOp::Delete)
		);
		assert!(find_write(&writes, "servedAt").is_some());
		assert!(find_write(&writes, "courierId").is_none());

		let context = TransitionContext::default().with_actor(AdminIdentity {
			id: "admin-7".to_string(),
			name: "Rosa".to_string(),
		});
		let writes = machine
			.plan_writes(&order, OrderStatus::Served, &context, Utc::now())
			.unwrap();
		assert_eq!(
			find_write(&writes, "servedById").map(|w| &w.op),
			Some(&FieldOp::Set(json!("admin-7")))
		);
	}

	#[test]
	fn test_unavailable_items_only_when_accepting() {
		let machine = machine();
		let order = sample_order(OrderStatus::Pending);
		let lines = vec![UnavailableLine {
			index: 1,
			name: "Milk".to_string(),
			quantity: 2,
			price: dec!(1.10),
		}];

		let context = TransitionContext::accept_with_shortages(lines.clone());
		assert!(matches!(
			machine.plan_writes(&order, OrderStatus::Ready, &context, Utc::now()),
			Err(OrderStateError::InvalidContext(_))
		));

		let writes = machine
			.plan_writes(&order, OrderStatus::Accepted, &context, Utc::now())
			.unwrap();
		let FieldOp::Set(value) = &find_write(&writes, "unavailableItems").unwrap().op else {
			panic!("unavailableItems must be set");
		};
		assert_eq!(value[0]["positionNumber"], json!(2));
		assert_eq!(value[0]["productName"], json!("Milk"));

		let mut out_of_range = lines;
		out_of_range[0].index = 3;
		assert!(machine
			.plan_writes(
				&order,
				OrderStatus::Accepted,
				&TransitionContext::accept_with_shortages(out_of_range),
				Utc::now()
			)
			.is_err());
	}

	#[tokio::test]
	async fn test_cancel_without_reason_makes_no_write() {
		let order = sample_order(OrderStatus::Accepted);
		let (storage, machine) = machine_with(&order).await;
		let mut changes = storage.subscribe();

		let result = machine
			.request_transition(&order.id, OrderStatus::Cancelled, TransitionContext::default())
			.await;
		assert!(matches!(result, Err(OrderStateError::MissingReason)));
		assert!(changes.try_recv().is_err());

		let stored: Order = storage
			.retrieve(Collection::Orders, &order.id)
			.await
			.unwrap();
		assert_eq!(stored, order);
	}

	#[tokio::test]
	async fn test_failed_write_is_update_failed_and_leaves_order_intact() {
		let (backend, reject_writes) = crate::test_support::FlakyStorage::new();
		let storage = Arc::new(StorageService::new(Box::new(backend)));
		let store = Arc::new(OrderStore::new(storage.clone()));
		let mut order = sample_order(OrderStatus::OnTheWay);
		order.courier_id = Some("c1".to_string());
		store.store_order(&order).await.unwrap();
		let machine = OrderStateMachine::new(store, "Admin");

		reject_writes.store(true, std::sync::atomic::Ordering::SeqCst);
		let mut changes = storage.subscribe();
		let result = machine
			.request_transition(&order.id, OrderStatus::Ready, TransitionContext::default())
			.await;

		assert!(matches!(result, Err(OrderStateError::UpdateFailed(_))));
		assert!(changes.try_recv().is_err());
		let stored: Order = storage
			.retrieve(Collection::Orders, &order.id)
			.await
			.unwrap();
		assert_eq!(stored, order);
	}

	#[tokio::test]
	async fn test_history_only_grows() {
		let order = sample_order(OrderStatus::Pending);
		let (storage, machine) = machine_with(&order).await;

		let path = [
			OrderStatus::Accepted,
			OrderStatus::Preparing,
			OrderStatus::Ready,
			OrderStatus::Preparing,
			OrderStatus::OnTheWay,
			OrderStatus::Delivered,
		];
		let mut previous_keys: Vec<OrderStatus> = vec![OrderStatus::Pending];
		for target in path {
			machine
				.request_transition(&order.id, target, TransitionContext::default())
				.await
				.unwrap();
			let stored: Order = storage
				.retrieve(Collection::Orders, &order.id)
				.await
				.unwrap();
			for key in &previous_keys {
				assert!(stored.status_history.contains_key(key), "{} lost", key);
			}
			assert!(stored.status_history.contains_key(&target));
			previous_keys = stored.status_history.keys().copied().collect();
		}
		assert_eq!(previous_keys.len(), 6);
	}

	#[tokio::test]
	async fn test_courier_cleared_when_moving_back() {
		let mut order = sample_order(OrderStatus::OnTheWay);
		order.courier_id = Some("c1".to_string());
		order.courier_name = Some("Ana".to_string());
		order.courier_phone = Some("+351".to_string());
		order.claimed_at = Some(Utc::now());

		for target in [OrderStatus::Pending, OrderStatus::Preparing, OrderStatus::Ready] {
			let (storage, machine) = machine_with(&order).await;
			machine
				.request_transition(&order.id, target, TransitionContext::default())
				.await
				.unwrap();

			let raw: serde_json::Value = storage
				.retrieve(Collection::Orders, &order.id)
				.await
				.unwrap();
			for field in COURIER_FIELDS {
				assert!(raw.get(field).is_none(), "{} still present", field);
			}
		}
	}

	#[tokio::test]
	async fn test_same_status_is_idempotent() {
		let order = sample_order(OrderStatus::Preparing);
		let (storage, machine) = machine_with(&order).await;

		let first = machine
			.request_transition(&order.id, OrderStatus::Preparing, TransitionContext::default())
			.await
			.unwrap();
		let after_first: Order = storage
			.retrieve(Collection::Orders, &order.id)
			.await
			.unwrap();
		let second = machine
			.request_transition(&order.id, OrderStatus::Preparing, TransitionContext::default())
			.await
			.unwrap();
		let after_second: Order = storage
			.retrieve(Collection::Orders, &order.id)
			.await
			.unwrap();

		assert!(first.is_same_status() && second.is_same_status());
		assert_eq!(after_first.status, after_second.status);
		assert_eq!(
			after_first.status_history.keys().collect::<Vec<_>>(),
			after_second.status_history.keys().collect::<Vec<_>>()
		);
		assert_eq!(after_first.items, after_second.items);
		assert_eq!(after_first.checked_items, after_second.checked_items);
	}

	#[tokio::test]
	async fn test_unknown_order_is_not_found() {
		let (_, machine) = machine_with(&sample_order(OrderStatus::Pending)).await;
		assert!(matches!(
			machine
				.request_transition("ghost", OrderStatus::Accepted, TransitionContext::default())
				.await,
			Err(OrderStateError::NotFound(_))
		));
	}

	#[tokio::test]
	async fn test_cancellation_records_reason() {
		let order = sample_order(OrderStatus::Accepted);
		let (storage, machine) = machine_with(&order).await;

		let transition = machine
			.request_transition(
				&order.id,
				OrderStatus::Cancelled,
				TransitionContext::cancel("Kitchen closed"),
			)
			.await
			.unwrap();
		assert_eq!(transition.from, OrderStatus::Accepted);
		assert_eq!(transition.cancellation_reason(), Some("Kitchen closed"));

		let stored: Order = storage
			.retrieve(Collection::Orders, &order.id)
			.await
			.unwrap();
		assert_eq!(stored.status, OrderStatus::Cancelled);
		assert_eq!(stored.cancellation_reason.as_deref(), Some("Kitchen closed"));
	}
}
