//! Read models and small mutations on documents the desk does not own.

use chrono::{DateTime, Utc};
use orderdesk_storage::{StorageError, StorageService};
use orderdesk_types::{Business, Collection, Customer, FieldWrite, GroupSessionStatus};
use std::sync::Arc;
use thiserror::Error;

/// Reason recorded on a group session cancelled because its order was.
pub const SESSION_REASON_ORDER_CANCELLED: &str = "order_cancelled";
/// Reason recorded on a group session cancelled because its order was deleted.
pub const SESSION_REASON_ORDER_DELETED: &str = "order_deleted";

#[derive(Debug, Error)]
pub enum DirectoryError {
	#[error("{collection} document not found: {id}")]
	NotFound { collection: &'static str, id: String },
	#[error("Storage error: {0}")]
	Storage(String),
}

fn map_err(collection: Collection, id: &str) -> impl FnOnce(StorageError) -> DirectoryError + '_ {
	move |err| match err {
		StorageError::NotFound => DirectoryError::NotFound {
			collection: collection.as_str(),
			id: id.to_string(),
		},
		other => DirectoryError::Storage(other.to_string()),
	}
}

pub struct BusinessDirectory {
	storage: Arc<StorageService>,
}

impl BusinessDirectory {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	pub async fn get_business(&self, business_id: &str) -> Result<Business, DirectoryError> {
		self.storage
			.retrieve(Collection::Businesses, business_id)
			.await
			.map_err(map_err(Collection::Businesses, business_id))
	}

	/// Adds `by` to the fulfillment-issue counter and stamps the last issue
	/// time, in one atomic update.
	pub async fn increment_fulfillment_issues(
		&self,
		business_id: &str,
		by: i64,
		at: DateTime<Utc>,
	) -> Result<(), DirectoryError> {
		self.storage
			.update_fields(
				Collection::Businesses,
				business_id,
				&[
					FieldWrite::increment("fulfillmentIssues", by),
					FieldWrite::timestamp("lastFulfillmentIssueAt", at),
				],
			)
			.await
			.map_err(map_err(Collection::Businesses, business_id))
	}
}

pub struct CustomerDirectory {
	storage: Arc<StorageService>,
}

impl CustomerDirectory {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// The customer's push token. An unknown customer has none.
	pub async fn push_token(&self, customer_id: &str) -> Result<Option<String>, DirectoryError> {
		match self
			.storage
			.retrieve::<Customer>(Collection::Users, customer_id)
			.await
		{
			Ok(customer) => Ok(customer.push_token.filter(|token| !token.is_empty())),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(DirectoryError::Storage(e.to_string())),
		}
	}
}

pub struct GroupSessions {
	storage: Arc<StorageService>,
}

impl GroupSessions {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Marks the session cancelled with `reason`, closing it at `at`.
	pub async fn cancel(
		&self,
		session_id: &str,
		reason: &str,
		at: DateTime<Utc>,
	) -> Result<(), DirectoryError> {
		let status = serde_json::to_value(GroupSessionStatus::Cancelled)
			.map_err(|e| DirectoryError::Storage(e.to_string()))?;
		self.storage
			.update_fields(
				Collection::GroupSessions,
				session_id,
				&[
					FieldWrite::set("status", status),
					FieldWrite::timestamp("closedAt", at),
					FieldWrite::set("cancellationReason", reason),
				],
			)
			.await
			.map_err(map_err(Collection::GroupSessions, session_id))
	}
}
