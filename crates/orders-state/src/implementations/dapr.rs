//! Sidecar-backed state store.
//!
//! Forwards every operation to the sidecar's state API; the store named in
//! each call must match a state store component configured in the sidecar.

use crate::{StateError, StateStoreFactory, StateStoreInterface, StateStoreRegistry};
use async_trait::async_trait;
use orders_sidecar::{DaprClient, DaprSchema, SidecarError};
use orders_types::{ConfigSchema, ImplementationRegistry};

/// State store that delegates to the sidecar runtime.
pub struct DaprStateStore {
	client: DaprClient,
}

impl DaprStateStore {
	pub fn new(client: DaprClient) -> Self {
		Self { client }
	}
}

fn backend_error(err: SidecarError) -> StateError {
	StateError::Backend(err.to_string())
}

#[async_trait]
impl StateStoreInterface for DaprStateStore {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(DaprSchema)
	}

	async fn wait_ready(&self) -> Result<(), StateError> {
		self.client
			.wait_for_sidecar(self.client.wait_timeout())
			.await
			.map_err(backend_error)
	}

	async fn save(&self, store_name: &str, key: &str, value: Vec<u8>) -> Result<(), StateError> {
		self.client
			.save_state(store_name, key, &value)
			.await
			.map_err(backend_error)
	}

	async fn get(&self, store_name: &str, key: &str) -> Result<Vec<u8>, StateError> {
		self.client
			.get_state(store_name, key)
			.await
			.map_err(backend_error)?
			.ok_or(StateError::NotFound)
	}

	/// The sidecar acknowledges deletes of absent keys, so this only fails
	/// on transport or component errors.
	async fn delete(&self, store_name: &str, key: &str) -> Result<(), StateError> {
		self.client
			.delete_state(store_name, key)
			.await
			.map_err(backend_error)
	}
}

/// Factory function to create a sidecar state store from configuration.
///
/// Configuration parameters: see `orders_sidecar::DaprConfig::from_toml`.
pub fn create_state_store(config: &toml::Value) -> Result<Box<dyn StateStoreInterface>, StateError> {
	let client = DaprClient::from_toml(config).map_err(|e| StateError::Configuration(e.to_string()))?;
	Ok(Box::new(DaprStateStore::new(client)))
}

/// Registry for the sidecar state store.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "dapr";
	type Factory = StateStoreFactory;

	fn factory() -> Self::Factory {
		create_state_store
	}
}

impl StateStoreRegistry for Registry {}
