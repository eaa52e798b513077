//! In-memory state store.
//!
//! Keeps values in a map for the lifetime of the process. Useful for tests
//! and for running the state façade without a sidecar.

use crate::{StateError, StateStoreFactory, StateStoreInterface, StateStoreRegistry};
use async_trait::async_trait;
use orders_types::{ConfigSchema, ImplementationRegistry, Schema, ValidationError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory state store keyed by `(store_name, key)`.
///
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct MemoryStateStore {
	entries: Arc<RwLock<HashMap<(String, String), Vec<u8>>>>,
}

impl MemoryStateStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of stored entries across all stores.
	pub async fn len(&self) -> usize {
		self.entries.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.entries.read().await.is_empty()
	}
}

#[async_trait]
impl StateStoreInterface for MemoryStateStore {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryStateSchema)
	}

	async fn save(&self, store_name: &str, key: &str, value: Vec<u8>) -> Result<(), StateError> {
		let mut entries = self.entries.write().await;
		entries.insert((store_name.to_string(), key.to_string()), value);
		Ok(())
	}

	async fn get(&self, store_name: &str, key: &str) -> Result<Vec<u8>, StateError> {
		let entries = self.entries.read().await;
		entries
			.get(&(store_name.to_string(), key.to_string()))
			.cloned()
			.ok_or(StateError::NotFound)
	}

	async fn delete(&self, store_name: &str, key: &str) -> Result<(), StateError> {
		let mut entries = self.entries.write().await;
		entries
			.remove(&(store_name.to_string(), key.to_string()))
			.map(|_| ())
			.ok_or(StateError::NotFound)
	}
}

/// Configuration schema for MemoryStateStore.
pub struct MemoryStateSchema;

impl ConfigSchema for MemoryStateSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		// No settings; only the table shape is checked.
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a memory state store from configuration.
///
/// Configuration parameters:
/// - None
pub fn create_state_store(config: &toml::Value) -> Result<Box<dyn StateStoreInterface>, StateError> {
	MemoryStateSchema
		.validate(config)
		.map_err(|e| StateError::Configuration(e.to_string()))?;
	Ok(Box::new(MemoryStateStore::new()))
}

/// Registry for the memory state store.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = StateStoreFactory;

	fn factory() -> Self::Factory {
		create_state_store
	}
}

impl StateStoreRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_basic_operations() {
		let store = MemoryStateStore::new();

		store.save("statestore", "7", b"{\"orderId\":7}".to_vec()).await.unwrap();
		assert_eq!(
			store.get("statestore", "7").await.unwrap(),
			b"{\"orderId\":7}".to_vec()
		);
		assert_eq!(store.len().await, 1);

		store.delete("statestore", "7").await.unwrap();
		assert!(store.is_empty().await);
		assert!(matches!(
			store.get("statestore", "7").await,
			Err(StateError::NotFound)
		));
	}

	#[tokio::test]
	async fn test_overwrite() {
		let store = MemoryStateStore::new();
		store.save("s", "k", b"value1".to_vec()).await.unwrap();
		store.save("s", "k", b"value2".to_vec()).await.unwrap();
		assert_eq!(store.get("s", "k").await.unwrap(), b"value2".to_vec());
		assert_eq!(store.len().await, 1);
	}

	#[tokio::test]
	async fn test_delete_missing_key() {
		let store = MemoryStateStore::new();
		assert!(matches!(
			store.delete("statestore", "never").await,
			Err(StateError::NotFound)
		));
	}

	#[tokio::test]
	async fn test_stores_are_isolated() {
		let store = MemoryStateStore::new();
		store.save("a", "k", b"1".to_vec()).await.unwrap();
		assert!(matches!(store.get("b", "k").await, Err(StateError::NotFound)));
	}

	#[test]
	fn test_factory() {
		let config = toml::Value::Table(toml::map::Map::new());
		assert!(create_state_store(&config).is_ok());
		assert!(create_state_store(&toml::Value::Boolean(true)).is_err());
	}
}
