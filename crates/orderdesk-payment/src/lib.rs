//! Partial refunds for card-paid orders.
//!
//! When an order is accepted with items that cannot be supplied, the order
//! core asks the [`PaymentService`] to refund those items. The amount is
//! computed locally from the supplied list; the gateway only executes it.

use async_trait::async_trait;
use orderdesk_types::{
	truncate_id, ConfigSchema, ImplementationRegistry, RefundReceipt, RefundRequest,
};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod mock;
}

#[derive(Debug, Error)]
pub enum PaymentError {
	#[error("Network error: {0}")]
	Network(String),
	/// The gateway answered with an error.
	#[error("Gateway error: {0}")]
	Gateway(String),
	/// The gateway processed the request and refused the refund.
	#[error("Refund declined")]
	Declined,
	#[error("Invalid request: {0}")]
	InvalidRequest(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Interface every refund gateway implements.
#[async_trait]
pub trait RefundInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	async fn request_partial_refund(
		&self,
		request: &RefundRequest,
	) -> Result<RefundReceipt, PaymentError>;
}

pub type PaymentFactory = fn(&toml::Value) -> Result<Box<dyn RefundInterface>, PaymentError>;

pub trait PaymentRegistry: ImplementationRegistry<Factory = PaymentFactory> {}

/// Returns `(name, factory)` for every refund gateway.
pub fn get_all_implementations() -> Vec<(&'static str, PaymentFactory)> {
	use implementations::{http, mock};

	vec![
		(http::Registry::NAME, http::Registry::factory()),
		(mock::Registry::NAME, mock::Registry::factory()),
	]
}

pub struct PaymentService {
	gateway: Box<dyn RefundInterface>,
}

impl PaymentService {
	pub fn new(gateway: Box<dyn RefundInterface>) -> Self {
		Self { gateway }
	}

	/// Requests a refund of `request.amount`.
	///
	/// Empty or zero-value requests are rejected before reaching the gateway,
	/// and a receipt with `refunded = false` becomes [`PaymentError::Declined`].
	pub async fn request_partial_refund(
		&self,
		request: &RefundRequest,
	) -> Result<RefundReceipt, PaymentError> {
		if request.unavailable_items.is_empty() {
			return Err(PaymentError::InvalidRequest(
				"No unavailable items to refund".to_string(),
			));
		}
		if request.amount.is_sign_negative() || request.amount.is_zero() {
			return Err(PaymentError::InvalidRequest(format!(
				"Refund amount must be positive, got {}",
				request.amount
			)));
		}

		let receipt = self.gateway.request_partial_refund(request).await?;
		if !receipt.refunded {
			return Err(PaymentError::Declined);
		}
		tracing::info!(
			order_id = %truncate_id(&request.order_id),
			amount = %request.amount,
			"Partial refund accepted"
		);
		Ok(receipt)
	}
}
