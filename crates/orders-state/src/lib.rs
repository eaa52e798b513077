//! State store capability for the order façades.
//!
//! This crate defines the key/value interface the state façade writes
//! through, plus the backends that can sit behind it: the sidecar runtime
//! (the production path), an in-memory map, and a directory of files.

use async_trait::async_trait;
use orders_types::{ConfigSchema, ImplementationRegistry};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod dapr;
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during state store operations.
#[derive(Debug, Error)]
pub enum StateError {
	/// The store holds no value for the key.
	#[error("Not found")]
	NotFound,
	/// Failure inside the backend, including an unreachable sidecar.
	#[error("Backend error: {0}")]
	Backend(String),
	/// The implementation table was rejected.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Key/value interface implemented by every state backend.
///
/// Every call names the logical store it targets; backends that host a
/// single store may use the name as a namespace.
#[async_trait]
pub trait StateStoreInterface: Send + Sync {
	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Waits until the backend can serve requests.
	///
	/// In-process backends are ready immediately.
	async fn wait_ready(&self) -> Result<(), StateError> {
		Ok(())
	}

	/// Stores `value` under `key`, replacing any previous value.
	async fn save(&self, store_name: &str, key: &str, value: Vec<u8>) -> Result<(), StateError>;

	/// Retrieves the raw bytes stored under `key`.
	async fn get(&self, store_name: &str, key: &str) -> Result<Vec<u8>, StateError>;

	/// Removes the value stored under `key`.
	async fn delete(&self, store_name: &str, key: &str) -> Result<(), StateError>;
}

/// Type alias for state store factory functions.
pub type StateStoreFactory = fn(&toml::Value) -> Result<Box<dyn StateStoreInterface>, StateError>;

/// Registry trait for state store implementations.
pub trait StateStoreRegistry: ImplementationRegistry<Factory = StateStoreFactory> {}

/// Get all registered state store implementations.
pub fn get_all_implementations() -> Vec<(&'static str, StateStoreFactory)> {
	use implementations::{dapr, file, memory};

	vec![
		(dapr::Registry::NAME, dapr::Registry::factory()),
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// State store bound to one logical store name.
///
/// Wraps a backend and fixes the store every call targets. Values pass
/// through as raw bytes; the façade owns their encoding.
pub struct StateService {
	backend: Box<dyn StateStoreInterface>,
	store_name: String,
}

impl StateService {
	/// Creates a service over `backend` targeting `store_name`.
	///
	/// # Arguments
	///
	/// * `backend` - The state backend every call is forwarded to
	/// * `store_name` - Logical store passed with each call
	pub fn new(backend: Box<dyn StateStoreInterface>, store_name: impl Into<String>) -> Self {
		Self {
			backend,
			store_name: store_name.into(),
		}
	}

	pub fn store_name(&self) -> &str {
		&self.store_name
	}

	/// Waits until the backend can serve requests.
	pub async fn wait_ready(&self) -> Result<(), StateError> {
		self.backend.wait_ready().await
	}

	/// Stores `value` under `key`, replacing any previous value.
	///
	/// # Arguments
	///
	/// * `key` - State key, used verbatim
	/// * `value` - Encoded value to store
	pub async fn save_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StateError> {
		self.backend.save(&self.store_name, key, value).await
	}

	/// Returns the stored bytes unchanged.
	///
	/// Fails with [`StateError::NotFound`] when the store has no value for
	/// `key`.
	pub async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StateError> {
		self.backend.get(&self.store_name, key).await
	}

	/// Removes the value stored under `key`.
	///
	/// Whether deleting an absent key is an error depends on the backend:
	/// in-process backends report [`StateError::NotFound`], the sidecar
	/// acknowledges it.
	pub async fn delete(&self, key: &str) -> Result<(), StateError> {
		self.backend.delete(&self.store_name, key).await
	}
}
