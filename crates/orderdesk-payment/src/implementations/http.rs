//! HTTP refund gateway.
//!
//! POSTs the refund request as JSON and expects a
//! `{"refunded": bool, "refundAmount": "<decimal>"}` body back.

use crate::{PaymentError, PaymentFactory, PaymentRegistry, RefundInterface};
use async_trait::async_trait;
use orderdesk_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, RefundReceipt, RefundRequest, Schema,
	ValidationError,
};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

pub struct HttpGateway {
	client: reqwest::Client,
	endpoint: String,
	api_key: Option<String>,
}

impl HttpGateway {
	pub fn new(
		endpoint: String,
		api_key: Option<String>,
		timeout: Duration,
	) -> Result<Self, PaymentError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| PaymentError::Configuration(e.to_string()))?;
		Ok(Self {
			client,
			endpoint,
			api_key,
		})
	}
}

#[async_trait]
impl RefundInterface for HttpGateway {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpGatewaySchema)
	}

	async fn request_partial_refund(
		&self,
		request: &RefundRequest,
	) -> Result<RefundReceipt, PaymentError> {
		let mut builder = self.client.post(&self.endpoint).json(request);
		if let Some(api_key) = &self.api_key {
			builder = builder.bearer_auth(api_key);
		}

		let response = builder
			.send()
			.await
			.map_err(|e| PaymentError::Network(e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			let body = response
				.text()
				.await
				.unwrap_or_else(|_| "unable to read response body".to_string());
			return Err(PaymentError::Gateway(format!("{}: {}", status, body)));
		}

		response
			.json::<RefundReceipt>()
			.await
			.map_err(|e| PaymentError::Gateway(format!("Malformed receipt: {}", e)))
	}
}

pub struct HttpGatewaySchema;

impl ConfigSchema for HttpGatewaySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("endpoint", FieldType::Url)],
			vec![
				Field::new("api_key", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(key) if key.trim().is_empty() => {
							Err("api_key must not be empty".to_string())
						},
						_ => Ok(()),
					}
				}),
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
			],
		);
		schema.validate(config)
	}
}

/// Builds an HTTP refund gateway.
///
/// Configuration parameters:
/// - `endpoint`: refund endpoint URL (required)
/// - `api_key`: bearer token sent with each request (optional)
/// - `timeout_seconds`: request timeout (default: 30)
pub fn create_gateway(config: &toml::Value) -> Result<Box<dyn RefundInterface>, PaymentError> {
	HttpGatewaySchema
		.validate(config)
		.map_err(|e| PaymentError::Configuration(e.to_string()))?;

	let endpoint = config
		.get("endpoint")
		.and_then(|v| v.as_str())
		.ok_or_else(|| PaymentError::Configuration("endpoint is required".to_string()))?;
	let api_key = config
		.get("api_key")
		.and_then(|v| v.as_str())
		.map(str::to_string);
	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|secs| secs as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	Ok(Box::new(HttpGateway::new(
		endpoint.to_string(),
		api_key,
		Duration::from_secs(timeout),
	)?))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = PaymentFactory;

	fn factory() -> Self::Factory {
		create_gateway
	}
}

impl PaymentRegistry for Registry {}
