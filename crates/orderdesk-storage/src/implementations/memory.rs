//! In-memory storage backend.
//!
//! Keeps every document in a map behind a read-write lock. Nothing survives
//! a restart; used for development and as the store in tests.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use orderdesk_types::{ConfigSchema, ImplementationRegistry, Schema, ValidationError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct MemoryStorage {
	store: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self {
			store: Arc::new(RwLock::new(HashMap::new())),
		}
	}
}

impl Default for MemoryStorage {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let store = self.store.read().await;
		store.get(key).cloned().ok_or(StorageError::NotFound)
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store.insert(key.to_string(), value);
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let store = self.store.read().await;
		Ok(store.contains_key(key))
	}

	async fn list_keys(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
		let prefix = format!("{}:", namespace);
		let store = self.store.read().await;
		Ok(store
			.keys()
			.filter(|key| key.starts_with(&prefix))
			.cloned()
			.collect())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryStorageSchema)
	}
}

/// The memory backend takes no configuration.
pub struct MemoryStorageSchema;

impl ConfigSchema for MemoryStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	MemoryStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;
	Ok(Box::new(MemoryStorage::new()))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_basic_operations() {
		let storage = MemoryStorage::new();

		storage
			.set_bytes("orders:1", b"{}".to_vec())
			.await
			.unwrap();
		assert_eq!(storage.get_bytes("orders:1").await.unwrap(), b"{}".to_vec());
		assert!(storage.exists("orders:1").await.unwrap());

		storage.delete("orders:1").await.unwrap();
		assert!(!storage.exists("orders:1").await.unwrap());
		assert!(matches!(
			storage.get_bytes("orders:1").await,
			Err(StorageError::NotFound)
		));
	}

	#[tokio::test]
	async fn test_list_keys_by_namespace() {
		let storage = MemoryStorage::new();
		storage.set_bytes("orders:1", vec![]).await.unwrap();
		storage.set_bytes("orders:2", vec![]).await.unwrap();
		storage.set_bytes("ordersArchive:3", vec![]).await.unwrap();

		let mut keys = storage.list_keys("orders").await.unwrap();
		keys.sort();
		assert_eq!(keys, vec!["orders:1".to_string(), "orders:2".to_string()]);
	}

	#[test]
	fn test_factory_rejects_non_table_config() {
		assert!(create_storage(&toml::Value::String("x".into())).is_err());
	}
}
