//! Customer push notifications.
//!
//! The order core hands a [`NotificationRequest`] to the [`NotificationService`],
//! which forwards it to the configured transport. Transports are pluggable
//! and chosen by name from configuration.

use async_trait::async_trait;
use orderdesk_types::{
	truncate_id, ConfigSchema, ImplementationRegistry, NotificationReceipt, NotificationRequest,
};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod log;
}

#[derive(Debug, Error)]
pub enum NotificationError {
	/// The transport could not be reached.
	#[error("Network error: {0}")]
	Network(String),
	/// The transport answered with an error.
	#[error("Rejected: {0}")]
	Rejected(String),
	/// The transport accepted the request but reported it undelivered.
	#[error("Notification was not delivered")]
	NotDelivered,
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Interface every notification transport implements.
#[async_trait]
pub trait NotificationInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Sends one notification.
	async fn send(&self, request: &NotificationRequest)
		-> Result<NotificationReceipt, NotificationError>;
}

pub type NotificationFactory =
	fn(&toml::Value) -> Result<Box<dyn NotificationInterface>, NotificationError>;

pub trait NotificationRegistry: ImplementationRegistry<Factory = NotificationFactory> {}

/// Returns `(name, factory)` for every notification transport.
pub fn get_all_implementations() -> Vec<(&'static str, NotificationFactory)> {
	use implementations::{http, log};

	vec![
		(http::Registry::NAME, http::Registry::factory()),
		(log::Registry::NAME, log::Registry::factory()),
	]
}

/// Sends notifications through the primary transport.
pub struct NotificationService {
	implementation: Box<dyn NotificationInterface>,
}

impl NotificationService {
	pub fn new(implementation: Box<dyn NotificationInterface>) -> Self {
		Self { implementation }
	}

	/// Sends `request`. A receipt with `delivered = false` is reported as
	/// [`NotificationError::NotDelivered`].
	pub async fn send(
		&self,
		request: &NotificationRequest,
	) -> Result<NotificationReceipt, NotificationError> {
		let receipt = self.implementation.send(request).await?;
		if !receipt.delivered {
			return Err(NotificationError::NotDelivered);
		}
		tracing::debug!(
			order_id = %truncate_id(&request.order_id),
			kind = %request.payload.kind(),
			"Notification delivered"
		);
		Ok(receipt)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use orderdesk_types::{NotificationPayload, Schema};

	struct FixedSender {
		delivered: bool,
	}

	struct EmptySchema;

	impl ConfigSchema for EmptySchema {
		fn validate(&self, config: &toml::Value) -> Result<(), orderdesk_types::ValidationError> {
			Schema::new(vec![], vec![]).validate(config)
		}
	}

	#[async_trait]
	impl NotificationInterface for FixedSender {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(EmptySchema)
		}

		async fn send(
			&self,
			_request: &NotificationRequest,
		) -> Result<NotificationReceipt, NotificationError> {
			Ok(NotificationReceipt {
				delivered: self.delivered,
			})
		}
	}

	fn request() -> NotificationRequest {
		NotificationRequest {
			order_id: "order-1".to_string(),
			recipient_token: "tok".to_string(),
			business_name: "Deli".to_string(),
			payload: NotificationPayload::OrderCancelled {
				reason: "closed".to_string(),
			},
		}
	}

	#[tokio::test]
	async fn test_undelivered_receipt_is_an_error() {
		let service = NotificationService::new(Box::new(FixedSender { delivered: false }));
		assert!(matches!(
			service.send(&request()).await,
			Err(NotificationError::NotDelivered)
		));

		let service = NotificationService::new(Box::new(FixedSender { delivered: true }));
		assert!(service.send(&request()).await.unwrap().delivered);
	}

	#[test]
	fn test_registry_names() {
		let names: Vec<_> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["http", "log"]);
	}
}
