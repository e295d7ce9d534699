//! Refund gateway that answers locally.
//!
//! Refunds the requested amount when `succeed` is true (the default) and
//! declines otherwise. Useful for demos and for desks that settle refunds
//! outside the system.

use crate::{PaymentError, PaymentFactory, PaymentRegistry, RefundInterface};
use async_trait::async_trait;
use orderdesk_types::{
	truncate_id, ConfigSchema, Field, FieldType, ImplementationRegistry, RefundReceipt,
	RefundRequest, Schema, ValidationError,
};
use rust_decimal::Decimal;

pub struct MockGateway {
	succeed: bool,
}

impl MockGateway {
	pub fn new(succeed: bool) -> Self {
		Self { succeed }
	}
}

#[async_trait]
impl RefundInterface for MockGateway {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MockGatewaySchema)
	}

	async fn request_partial_refund(
		&self,
		request: &RefundRequest,
	) -> Result<RefundReceipt, PaymentError> {
		tracing::debug!(
			order_id = %truncate_id(&request.order_id),
			amount = %request.amount,
			succeed = self.succeed,
			"Mock refund"
		);
		Ok(RefundReceipt {
			refunded: self.succeed,
			refund_amount: if self.succeed {
				request.amount
			} else {
				Decimal::ZERO
			},
		})
	}
}

pub struct MockGatewaySchema;

impl ConfigSchema for MockGatewaySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![Field::new("succeed", FieldType::Boolean)]).validate(config)
	}
}

/// Configuration parameters:
/// - `succeed`: whether refunds are accepted (default: true)
pub fn create_gateway(config: &toml::Value) -> Result<Box<dyn RefundInterface>, PaymentError> {
	MockGatewaySchema
		.validate(config)
		.map_err(|e| PaymentError::Configuration(e.to_string()))?;

	let succeed = config
		.get("succeed")
		.and_then(|v| v.as_bool())
		.unwrap_or(true);
	Ok(Box::new(MockGateway::new(succeed)))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "mock";
	type Factory = PaymentFactory;

	fn factory() -> Self::Factory {
		create_gateway
	}
}

impl PaymentRegistry for Registry {}
