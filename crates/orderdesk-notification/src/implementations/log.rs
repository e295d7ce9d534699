//! Notification transport that only logs.
//!
//! Used in development and for desks without a push gateway. Every request
//! is reported as delivered.

use crate::{NotificationError, NotificationFactory, NotificationInterface, NotificationRegistry};
use async_trait::async_trait;
use orderdesk_types::{
	truncate_id, ConfigSchema, ImplementationRegistry, NotificationReceipt, NotificationRequest,
	Schema, ValidationError,
};

pub struct LogNotifier;

#[async_trait]
impl NotificationInterface for LogNotifier {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LogNotifierSchema)
	}

	async fn send(
		&self,
		request: &NotificationRequest,
	) -> Result<NotificationReceipt, NotificationError> {
		tracing::info!(
			order_id = %truncate_id(&request.order_id),
			kind = %request.payload.kind(),
			business = %request.business_name,
			"Notification (log only)"
		);
		Ok(NotificationReceipt { delivered: true })
	}
}

pub struct LogNotifierSchema;

impl ConfigSchema for LogNotifierSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

pub fn create_notifier(
	config: &toml::Value,
) -> Result<Box<dyn NotificationInterface>, NotificationError> {
	LogNotifierSchema
		.validate(config)
		.map_err(|e| NotificationError::Configuration(e.to_string()))?;
	Ok(Box::new(LogNotifier))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "log";
	type Factory = NotificationFactory;

	fn factory() -> Self::Factory {
		create_notifier
	}
}

impl NotificationRegistry for Registry {}
