//! Builder for constructing an order desk.
//!
//! Each pluggable component (storage backend, notification transport, refund
//! gateway) is created from its configuration table by a factory looked up
//! by implementation name. Every configured implementation with a known
//! factory is instantiated so configuration mistakes surface at startup;
//! the primary one is kept.

use crate::engine::OrderDesk;
use orderdesk_config::Config;
use orderdesk_notification::{NotificationError, NotificationInterface, NotificationService};
use orderdesk_payment::{PaymentError, PaymentService, RefundInterface};
use orderdesk_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for every component type, keyed by implementation name.
pub struct DeskFactories<SF, NF, PF> {
	pub storage_factories: HashMap<String, SF>,
	pub notification_factories: HashMap<String, NF>,
	pub payment_factories: HashMap<String, PF>,
}

pub struct DeskBuilder {
	config: Config,
}

impl DeskBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Creates the configured implementations and wires them into an
	/// [`OrderDesk`].
	pub fn build<SF, NF, PF>(self, factories: DeskFactories<SF, NF, PF>) -> Result<OrderDesk, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		NF: Fn(&toml::Value) -> Result<Box<dyn NotificationInterface>, NotificationError>,
		PF: Fn(&toml::Value) -> Result<Box<dyn RefundInterface>, PaymentError>,
	{
		let storage_backend = load_primary(
			"storage",
			&self.config.storage.primary,
			&self.config.storage.implementations,
			&factories.storage_factories,
		)?;
		let notifier = load_primary(
			"notification",
			&self.config.notification.primary,
			&self.config.notification.implementations,
			&factories.notification_factories,
		)?;
		let gateway = load_primary(
			"payment",
			&self.config.payment.primary,
			&self.config.payment.implementations,
			&factories.payment_factories,
		)?;

		Ok(OrderDesk::new(
			self.config,
			Arc::new(StorageService::new(storage_backend)),
			Arc::new(NotificationService::new(notifier)),
			Arc::new(PaymentService::new(gateway)),
		))
	}
}

fn load_primary<T, E, F>(
	component: &'static str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
	factories: &HashMap<String, F>,
) -> Result<Box<T>, BuilderError>
where
	T: ?Sized,
	E: Display,
	F: Fn(&toml::Value) -> Result<Box<T>, E>,
{
	let mut loaded = HashMap::new();
	for (name, config) in implementations {
		let Some(factory) = factories.get(name) else {
			tracing::warn!(component, implementation = %name, "No factory registered, skipping");
			continue;
		};
		match factory(config) {
			Ok(implementation) => {
				let is_primary = name == primary;
				tracing::info!(component, implementation = %name, enabled = %is_primary, "Loaded");
				loaded.insert(name.clone(), implementation);
			},
			Err(e) => {
				tracing::error!(
					component,
					implementation = %name,
					error = %e,
					"Failed to create implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create {} implementation '{}': {}",
					component, name, e
				)));
			},
		}
	}

	loaded.remove(primary).ok_or_else(|| {
		BuilderError::MissingComponent(format!(
			"primary {} implementation '{}' is not available",
			component, primary
		))
	})
}
