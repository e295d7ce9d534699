//! HTTP notification transport.
//!
//! POSTs the request as JSON to a push gateway and expects a
//! `{"delivered": bool}` body back.

use crate::{NotificationError, NotificationFactory, NotificationInterface, NotificationRegistry};
use async_trait::async_trait;
use orderdesk_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, NotificationReceipt,
	NotificationRequest, Schema, ValidationError,
};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

pub struct HttpNotifier {
	client: reqwest::Client,
	endpoint: String,
}

impl HttpNotifier {
	pub fn new(endpoint: String, timeout: Duration) -> Result<Self, NotificationError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| NotificationError::Configuration(e.to_string()))?;
		Ok(Self { client, endpoint })
	}
}

#[async_trait]
impl NotificationInterface for HttpNotifier {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpNotifierSchema)
	}

	async fn send(
		&self,
		request: &NotificationRequest,
	) -> Result<NotificationReceipt, NotificationError> {
		let response = self
			.client
			.post(&self.endpoint)
			.json(request)
			.send()
			.await
			.map_err(|e| NotificationError::Network(e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			let body = response
				.text()
				.await
				.unwrap_or_else(|_| "unable to read response body".to_string());
			return Err(NotificationError::Rejected(format!("{}: {}", status, body)));
		}

		response
			.json::<NotificationReceipt>()
			.await
			.map_err(|e| NotificationError::Rejected(format!("Malformed receipt: {}", e)))
	}
}

pub struct HttpNotifierSchema;

impl ConfigSchema for HttpNotifierSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("endpoint", FieldType::Url)],
			vec![Field::new(
				"timeout_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(120),
				},
			)],
		);
		schema.validate(config)
	}
}

/// Builds an HTTP notifier.
///
/// Configuration parameters:
/// - `endpoint`: push gateway URL (required)
/// - `timeout_seconds`: request timeout (default: 10)
pub fn create_notifier(
	config: &toml::Value,
) -> Result<Box<dyn NotificationInterface>, NotificationError> {
	HttpNotifierSchema
		.validate(config)
		.map_err(|e| NotificationError::Configuration(e.to_string()))?;

	let endpoint = config
		.get("endpoint")
		.and_then(|v| v.as_str())
		.ok_or_else(|| NotificationError::Configuration("endpoint is required".to_string()))?;
	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|secs| secs as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	Ok(Box::new(HttpNotifier::new(
		endpoint.to_string(),
		Duration::from_secs(timeout),
	)?))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = NotificationFactory;

	fn factory() -> Self::Factory {
		create_notifier
	}
}

impl NotificationRegistry for Registry {}
