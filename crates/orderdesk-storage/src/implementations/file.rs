//! File-based storage backend.
//!
//! Each document is a JSON file at `<storage_path>/<collection>/<id>.json`.
//! Writes go to a temporary file that is renamed into place, so a reader
//! never observes a half-written document. The backend takes an exclusive
//! lock on `<storage_path>/.lock` for its lifetime; a second process pointed
//! at the same directory fails to start instead of interleaving writes.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use fs2::FileExt;
use orderdesk_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use std::fs::File;
use std::path::PathBuf;
use tokio::fs;

const DEFAULT_STORAGE_PATH: &str = "./data/orderdesk";
const EXTENSION: &str = "json";

pub struct FileStorage {
	base_path: PathBuf,
	/// Held for the lifetime of the backend.
	_lock: File,
}

impl FileStorage {
	/// Opens (creating if needed) the storage directory and locks it.
	pub fn open(base_path: PathBuf) -> Result<Self, StorageError> {
		std::fs::create_dir_all(&base_path).map_err(|e| StorageError::Backend(e.to_string()))?;
		let lock = File::create(base_path.join(".lock"))
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		lock.try_lock_exclusive().map_err(|e| {
			StorageError::Backend(format!(
				"Storage directory {} is in use: {}",
				base_path.display(),
				e
			))
		})?;
		Ok(Self {
			base_path,
			_lock: lock,
		})
	}

	/// Maps `collection:id` to its file path.
	fn get_file_path(&self, key: &str) -> Result<PathBuf, StorageError> {
		let (namespace, id) = key
			.split_once(':')
			.ok_or_else(|| StorageError::Backend(format!("Malformed key: {}", key)))?;
		if namespace.is_empty() || id.is_empty() {
			return Err(StorageError::Backend(format!("Malformed key: {}", key)));
		}
		let safe_id = id.replace(['/', '\\'], "_");
		Ok(self
			.base_path
			.join(namespace)
			.join(format!("{}.{}", safe_id, EXTENSION)))
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.get_file_path(key)?;
		match fs::read(&path).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.get_file_path(key)?;
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}

		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, value)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.get_file_path(key)?;
		match fs::remove_file(&path).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let path = self.get_file_path(key)?;
		fs::try_exists(&path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}

	async fn list_keys(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
		let dir = self.base_path.join(namespace);
		let mut entries = match fs::read_dir(&dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		let mut keys = Vec::new();
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let path = entry.path();
			if path.extension() != Some(std::ffi::OsStr::new(EXTENSION)) {
				continue;
			}
			match path.file_stem().and_then(|s| s.to_str()) {
				Some(id) => keys.push(format!("{}:{}", namespace, id)),
				None => tracing::debug!("Skipping non UTF-8 file name {:?}", path),
			}
		}
		Ok(keys)
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(vec![], vec![Field::new("storage_path", FieldType::String)]);
		schema.validate(config)
	}
}

/// Builds a file backend.
///
/// Configuration parameters:
/// - `storage_path`: base directory (default: `./data/orderdesk`)
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_STORAGE_PATH);

	Ok(Box::new(FileStorage::open(PathBuf::from(storage_path))?))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[tokio::test]
	async fn test_round_trip_and_listing() {
		let dir = TempDir::new().unwrap();
		let storage = FileStorage::open(dir.path().to_path_buf()).unwrap();

		storage
			.set_bytes("orders:o1", b"{\"a\":1}".to_vec())
			.await
			.unwrap();
		storage.set_bytes("orders:o2", b"{}".to_vec()).await.unwrap();
		storage.set_bytes("users:u1", b"{}".to_vec()).await.unwrap();

		assert_eq!(
			storage.get_bytes("orders:o1").await.unwrap(),
			b"{\"a\":1}".to_vec()
		);
		let mut keys = storage.list_keys("orders").await.unwrap();
		keys.sort();
		assert_eq!(keys, vec!["orders:o1".to_string(), "orders:o2".to_string()]);
		assert!(storage.list_keys("groupSessions").await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_delete_missing_is_ok() {
		let dir = TempDir::new().unwrap();
		let storage = FileStorage::open(dir.path().to_path_buf()).unwrap();

		storage.set_bytes("orders:o1", vec![]).await.unwrap();
		storage.delete("orders:o1").await.unwrap();
		storage.delete("orders:o1").await.unwrap();
		assert!(!storage.exists("orders:o1").await.unwrap());
		assert!(matches!(
			storage.get_bytes("orders:o1").await,
			Err(StorageError::NotFound)
		));
	}

	#[test]
	fn test_directory_lock_is_exclusive() {
		let dir = TempDir::new().unwrap();
		let _first = FileStorage::open(dir.path().to_path_buf()).unwrap();
		assert!(FileStorage::open(dir.path().to_path_buf()).is_err());
	}

	#[test]
	fn test_malformed_key_rejected() {
		let dir = TempDir::new().unwrap();
		let storage = FileStorage::open(dir.path().to_path_buf()).unwrap();
		assert!(storage.get_file_path("no-colon").is_err());
		assert!(storage.get_file_path("orders:").is_err());
	}
}
