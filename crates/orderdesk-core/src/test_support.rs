//! Storage double whose writes can be switched off.

use async_trait::async_trait;
use orderdesk_storage::implementations::memory::MemoryStorage;
use orderdesk_storage::{StorageError, StorageInterface};
use orderdesk_types::ConfigSchema;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// In-memory backend that rejects every write while its switch is on.
pub(crate) struct FlakyStorage {
	inner: MemoryStorage,
	reject_writes: Arc<AtomicBool>,
}

impl FlakyStorage {
	/// Returns the backend and the switch that turns write failures on.
	pub(crate) fn new() -> (Self, Arc<AtomicBool>) {
		let reject_writes = Arc::new(AtomicBool::new(false));
		let storage = Self {
			inner: MemoryStorage::new(),
			reject_writes: reject_writes.clone(),
		};
		(storage, reject_writes)
	}

	fn check_writable(&self) -> Result<(), StorageError> {
		if self.reject_writes.load(Ordering::SeqCst) {
			return Err(StorageError::Backend("disk full".to_string()));
		}
		Ok(())
	}
}

#[async_trait]
impl StorageInterface for FlakyStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		self.inner.get_bytes(key).await
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		self.check_writable()?;
		self.inner.set_bytes(key, value).await
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		self.check_writable()?;
		self.inner.delete(key).await
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		self.inner.exists(key).await
	}

	async fn list_keys(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
		self.inner.list_keys(namespace).await
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		self.inner.config_schema()
	}
}
