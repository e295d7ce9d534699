//! Document store for the OrderDesk system.
//!
//! Backends only move bytes around. [`StorageService`] layers the document
//! semantics the order core relies on: JSON documents grouped in
//! [`Collection`]s, targeted field writes applied atomically per document,
//! and a change feed that live queries re-evaluate against.

use async_trait::async_trait;
use orderdesk_types::{Collection, ConfigSchema, FieldWrite, ImplementationRegistry};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};

pub mod document;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Capacity of the change feed. Slow subscribers see `Lagged` and re-query.
const CHANGE_FEED_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum StorageError {
	#[error("Not found")]
	NotFound,
	#[error("Serialization error: {0}")]
	Serialization(String),
	#[error("Invalid field path '{path}': {reason}")]
	InvalidPath { path: String, reason: String },
	#[error("Backend error: {0}")]
	Backend(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Low-level interface every storage backend implements.
///
/// Keys have the form `<collection>:<document id>`.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Returns the raw bytes stored under `key`, or [`StorageError::NotFound`].
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores `value` under `key`, replacing any previous value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Removes `key`. Removing an absent key succeeds.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Lists every key in `namespace` (the part before the colon).
	async fn list_keys(&self, namespace: &str) -> Result<Vec<String>, StorageError>;

	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Factory signature every storage implementation provides.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Returns `(name, factory)` for every storage implementation.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// What happened to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
	Written,
	Deleted,
}

/// Entry of the change feed, published after every successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChange {
	pub collection: Collection,
	pub id: String,
	pub kind: ChangeKind,
}

/// Typed document access over a storage backend.
pub struct StorageService {
	backend: Box<dyn StorageInterface>,
	/// Serialises mutations so read-apply-write of field updates is atomic
	/// within this process.
	write_lock: Mutex<()>,
	changes: broadcast::Sender<DocumentChange>,
}

impl StorageService {
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
		Self {
			backend,
			write_lock: Mutex::new(()),
			changes,
		}
	}

	/// Subscribes to the change feed.
	pub fn subscribe(&self) -> broadcast::Receiver<DocumentChange> {
		self.changes.subscribe()
	}

	fn publish(&self, collection: Collection, id: &str, kind: ChangeKind) {
		self.changes
			.send(DocumentChange {
				collection,
				id: id.to_string(),
				kind,
			})
			.ok();
	}

	/// Creates or replaces a whole document.
	pub async fn store<T: Serialize>(
		&self,
		collection: Collection,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		{
			let _guard = self.write_lock.lock().await;
			self.backend.set_bytes(&collection.key(id), bytes).await?;
		}
		self.publish(collection, id, ChangeKind::Written);
		Ok(())
	}

	/// Reads and decodes a document.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		collection: Collection,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&collection.key(id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Applies field writes to an existing document as one atomic change.
	///
	/// Fails with [`StorageError::NotFound`] when the document does not exist
	/// and leaves the document untouched when any write is invalid.
	pub async fn update_fields(
		&self,
		collection: Collection,
		id: &str,
		writes: &[FieldWrite],
	) -> Result<(), StorageError> {
		let key = collection.key(id);
		{
			let _guard = self.write_lock.lock().await;
			let bytes = self.backend.get_bytes(&key).await?;
			let mut doc: serde_json::Value = serde_json::from_slice(&bytes)
				.map_err(|e| StorageError::Serialization(e.to_string()))?;
			document::apply_writes(&mut doc, writes)?;
			let bytes =
				serde_json::to_vec(&doc).map_err(|e| StorageError::Serialization(e.to_string()))?;
			self.backend.set_bytes(&key, bytes).await?;
		}
		self.publish(collection, id, ChangeKind::Written);
		Ok(())
	}

	/// Removes a document. Fails with [`StorageError::NotFound`] when it is
	/// already gone.
	pub async fn remove(&self, collection: Collection, id: &str) -> Result<(), StorageError> {
		let key = collection.key(id);
		{
			let _guard = self.write_lock.lock().await;
			if !self.backend.exists(&key).await? {
				return Err(StorageError::NotFound);
			}
			self.backend.delete(&key).await?;
		}
		self.publish(collection, id, ChangeKind::Deleted);
		Ok(())
	}

	pub async fn exists(&self, collection: Collection, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&collection.key(id)).await
	}

	/// Reads every document of a collection.
	///
	/// Documents that no longer decode as `T` are skipped with a warning so
	/// one malformed record cannot blank a live view.
	pub async fn list<T: DeserializeOwned>(
		&self,
		collection: Collection,
	) -> Result<Vec<T>, StorageError> {
		let keys = self.backend.list_keys(collection.as_str()).await?;
		let mut documents = Vec::with_capacity(keys.len());
		for key in keys {
			let bytes = match self.backend.get_bytes(&key).await {
				Ok(bytes) => bytes,
				// Removed between listing and reading.
				Err(StorageError::NotFound) => continue,
				Err(e) => return Err(e),
			};
			match serde_json::from_slice(&bytes) {
				Ok(doc) => documents.push(doc),
				Err(e) => {
					tracing::warn!(key = %key, error = %e, "Skipping undecodable document");
				},
			}
		}
		Ok(documents)
	}
}
