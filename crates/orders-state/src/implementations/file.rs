//! File-based state store.
//!
//! Each value lives in its own file under `{storage_path}/{store}/`, so
//! state survives restarts without a sidecar. Store names and keys are
//! hex-encoded into file names, so distinct keys never share a file and no
//! key can name a path outside its store directory.

use crate::{StateError, StateStoreFactory, StateStoreInterface, StateStoreRegistry};
use async_trait::async_trait;
use orders_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tokio::fs;

const DEFAULT_STORAGE_PATH: &str = "./data/state";

/// File-based state store.
pub struct FileStateStore {
	base_path: PathBuf,
}

impl FileStateStore {
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	/// Maps a store and key to a filesystem-safe path.
	fn file_path(&self, store_name: &str, key: &str) -> PathBuf {
		self.base_path
			.join(hex::encode(store_name))
			.join(format!("{}.json", hex::encode(key)))
	}
}

/// Writes `value` to a uniquely named sibling of `path` and renames it into
/// place, so readers never see a partial value and concurrent writers of the
/// same key never share a temporary file.
fn write_atomic(path: &Path, value: &[u8]) -> std::io::Result<()> {
	let parent = path.parent().unwrap_or_else(|| Path::new("."));
	let mut file = tempfile::NamedTempFile::new_in(parent)?;
	file.write_all(value)?;
	file.persist(path).map_err(|e| e.error)?;
	Ok(())
}

fn io_error(err: std::io::Error) -> StateError {
	StateError::Backend(err.to_string())
}

#[async_trait]
impl StateStoreInterface for FileStateStore {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStateSchema)
	}

	async fn save(&self, store_name: &str, key: &str, value: Vec<u8>) -> Result<(), StateError> {
		let path = self.file_path(store_name, key);

		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).await.map_err(io_error)?;
		}

		let target = path.clone();
		tokio::task::spawn_blocking(move || write_atomic(&target, &value))
			.await
			.map_err(|e| StateError::Backend(e.to_string()))?
			.map_err(io_error)?;

		tracing::debug!(path = %path.display(), "Wrote state file");
		Ok(())
	}

	async fn get(&self, store_name: &str, key: &str) -> Result<Vec<u8>, StateError> {
		match fs::read(self.file_path(store_name, key)).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == ErrorKind::NotFound => Err(StateError::NotFound),
			Err(e) => Err(io_error(e)),
		}
	}

	async fn delete(&self, store_name: &str, key: &str) -> Result<(), StateError> {
		match fs::remove_file(self.file_path(store_name, key)).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == ErrorKind::NotFound => Err(StateError::NotFound),
			Err(e) => Err(io_error(e)),
		}
	}
}

/// Configuration schema for FileStateStore.
pub struct FileStateSchema;

impl ConfigSchema for FileStateSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![Field::new("storage_path", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(path) if path.trim().is_empty() => Err("must not be empty".to_string()),
					_ => Ok(()),
				}
			})],
		);
		schema.validate(config)
	}
}

/// Factory function to create a file state store from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Base directory for state files (default: "./data/state")
pub fn create_state_store(config: &toml::Value) -> Result<Box<dyn StateStoreInterface>, StateError> {
	FileStateSchema
		.validate(config)
		.map_err(|e| StateError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_STORAGE_PATH);

	Ok(Box::new(FileStateStore::new(PathBuf::from(storage_path))))
}

/// Registry for the file state store.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StateStoreFactory;

	fn factory() -> Self::Factory {
		create_state_store
	}
}

impl StateStoreRegistry for Registry {}
