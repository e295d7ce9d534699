//! Registry of every component implementation the service can build.
//!
//! Implementations are collected once from each component crate; the
//! configuration then picks among them by name.

use orderdesk_config::Config;
use orderdesk_core::{DeskBuilder, DeskFactories, OrderDesk};
use orderdesk_notification::NotificationFactory;
use orderdesk_payment::PaymentFactory;
use orderdesk_storage::StorageFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Global registry for all implementation factories
pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
	pub notification: HashMap<String, NotificationFactory>,
	pub payment: HashMap<String, PaymentFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			storage: HashMap::new(),
			notification: HashMap::new(),
			payment: HashMap::new(),
		}
	}

	pub fn register_storage(&mut self, name: impl Into<String>, factory: StorageFactory) {
		self.storage.insert(name.into(), factory);
	}

	pub fn register_notification(&mut self, name: impl Into<String>, factory: NotificationFactory) {
		self.notification.insert(name.into(), factory);
	}

	pub fn register_payment(&mut self, name: impl Into<String>, factory: PaymentFactory) {
		self.payment.insert(name.into(), factory);
	}
}

impl Default for FactoryRegistry {
	fn default() -> Self {
		Self::new()
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Initialize the global registry with all available implementations
pub fn initialize_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in orderdesk_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.register_storage(name, factory);
		}

		for (name, factory) in orderdesk_notification::get_all_implementations() {
			tracing::debug!("Registering notification implementation: {}", name);
			registry.register_notification(name, factory);
		}

		for (name, factory) in orderdesk_payment::get_all_implementations() {
			tracing::debug!("Registering payment implementation: {}", name);
			registry.register_payment(name, factory);
		}

		registry
	})
}

pub fn get_registry() -> &'static FactoryRegistry {
	initialize_registry()
}

/// Picks the registered factory for every configured implementation,
/// failing on names nothing registered.
macro_rules! build_factories {
	($registry:expr, $config_impls:expr, $registry_field:ident, $type_name:literal) => {{
		let mut factories = HashMap::new();
		for name in $config_impls.keys() {
			if let Some(factory) = $registry.$registry_field.get(name) {
				factories.insert(name.clone(), *factory);
			} else {
				let mut available: Vec<_> = $registry.$registry_field.keys().cloned().collect();
				available.sort();
				return Err(format!(
					"Unknown {} implementation '{}'. Available: [{}]",
					$type_name,
					name,
					available.join(", ")
				)
				.into());
			}
		}
		factories
	}};
}

/// Builds the order desk from the registry and the configuration.
pub fn build_desk_from_config(config: Config) -> Result<OrderDesk, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let storage_factories =
		build_factories!(registry, config.storage.implementations, storage, "storage");
	let notification_factories = build_factories!(
		registry,
		config.notification.implementations,
		notification,
		"notification"
	);
	let payment_factories =
		build_factories!(registry, config.payment.implementations, payment, "payment");

	let factories = DeskFactories {
		storage_factories,
		notification_factories,
		payment_factories,
	};

	Ok(DeskBuilder::new(config).build(factories)?)
}
