//! Order store adapter.
//!
//! Thin typed layer over the document store for the `orders` collection:
//! point reads, targeted field writes, deletion and a live query over a
//! creation-time window.

use chrono::{DateTime, Utc};
use orderdesk_storage::{StorageError, StorageService};
use orderdesk_types::{truncate_id, Collection, FieldWrite, Order};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

#[derive(Debug, Error)]
pub enum OrderStoreError {
	#[error("Order not found: {0}")]
	NotFound(String),
	#[error("Storage error: {0}")]
	Storage(String),
}

impl OrderStoreError {
	fn from_storage(order_id: &str, err: StorageError) -> Self {
		match err {
			StorageError::NotFound => OrderStoreError::NotFound(order_id.to_string()),
			other => OrderStoreError::Storage(other.to_string()),
		}
	}
}

pub struct OrderStore {
	storage: Arc<StorageService>,
}

impl OrderStore {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	pub async fn get_order(&self, order_id: &str) -> Result<Order, OrderStoreError> {
		self.storage
			.retrieve(Collection::Orders, order_id)
			.await
			.map_err(|e| OrderStoreError::from_storage(order_id, e))
	}

	/// Applies `writes` to the order as one atomic update.
	pub async fn update_order_fields(
		&self,
		order_id: &str,
		writes: &[FieldWrite],
	) -> Result<(), OrderStoreError> {
		self.storage
			.update_fields(Collection::Orders, order_id, writes)
			.await
			.map_err(|e| OrderStoreError::from_storage(order_id, e))
	}

	/// Hard-deletes the order. Deleting an unknown order is `NotFound`.
	pub async fn delete_order(&self, order_id: &str) -> Result<(), OrderStoreError> {
		self.storage
			.remove(Collection::Orders, order_id)
			.await
			.map_err(|e| OrderStoreError::from_storage(order_id, e))
	}

	/// Writes a whole order. Orders are created by ordering surfaces; the
	/// desk only uses this for seeding.
	pub async fn store_order(&self, order: &Order) -> Result<(), OrderStoreError> {
		self.storage
			.store(Collection::Orders, &order.id, order)
			.await
			.map_err(|e| OrderStoreError::from_storage(&order.id, e))
	}

	/// Orders created at or after `since`, newest first.
	pub async fn query_since(&self, since: DateTime<Utc>) -> Result<Vec<Order>, OrderStoreError> {
		query_window(&self.storage, since).await
	}

	/// Starts a live query over orders created at or after `since`.
	///
	/// The change feed is subscribed before the first query runs, so no
	/// change between the snapshot and the first wait is lost.
	pub fn subscribe_orders(&self, since: DateTime<Utc>) -> OrderSubscription {
		OrderSubscription {
			storage: self.storage.clone(),
			since,
			changes: self.storage.subscribe(),
			primed: false,
		}
	}
}

async fn query_window(
	storage: &StorageService,
	since: DateTime<Utc>,
) -> Result<Vec<Order>, OrderStoreError> {
	let mut orders: Vec<Order> = storage
		.list(Collection::Orders)
		.await
		.map_err(|e| OrderStoreError::Storage(e.to_string()))?;
	orders.retain(|order| order.created_at >= since);
	orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
	Ok(orders)
}

/// Live query handle returned by [`OrderStore::subscribe_orders`].
pub struct OrderSubscription {
	storage: Arc<StorageService>,
	since: DateTime<Utc>,
	changes: broadcast::Receiver<orderdesk_storage::DocumentChange>,
	primed: bool,
}

impl OrderSubscription {
	/// Yields the full result set: immediately on the first call, then each
	/// time an order document changes. Bursts of changes are coalesced into
	/// one re-query. Returns `None` once the store is gone.
	pub async fn next(&mut self) -> Option<Result<Vec<Order>, OrderStoreError>> {
		if self.primed {
			self.wait_for_order_change().await?;
		}
		self.primed = true;
		Some(query_window(&self.storage, self.since).await)
	}

	async fn wait_for_order_change(&mut self) -> Option<()> {
		loop {
			match self.changes.recv().await {
				Ok(change) if change.collection == Collection::Orders => {
					tracing::trace!(order_id = %truncate_id(&change.id), kind = ?change.kind, "Order changed");
					break;
				},
				Ok(_) => continue,
				Err(RecvError::Lagged(skipped)) => {
					tracing::debug!(skipped, "Order subscription lagged, re-querying");
					break;
				},
				Err(RecvError::Closed) => return None,
			}
		}

		// Drain whatever else is already queued.
		loop {
			match self.changes.try_recv() {
				Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
				Err(TryRecvError::Empty) => return Some(()),
				Err(TryRecvError::Closed) => return None,
			}
		}
	}
}
