//! Sidecar-backed publisher.

use crate::{PubSubError, PublisherFactory, PublisherInterface, PublisherRegistry};
use async_trait::async_trait;
use orders_sidecar::{DaprClient, DaprSchema};
use orders_types::{ConfigSchema, ImplementationRegistry};

/// Publisher that forwards events to the sidecar's publish API.
pub struct DaprPublisher {
	client: DaprClient,
}

impl DaprPublisher {
	pub fn new(client: DaprClient) -> Self {
		Self { client }
	}
}

#[async_trait]
impl PublisherInterface for DaprPublisher {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(DaprSchema)
	}

	async fn wait_ready(&self) -> Result<(), PubSubError> {
		self.client
			.wait_for_sidecar(self.client.wait_timeout())
			.await
			.map_err(|e| PubSubError::Backend(e.to_string()))
	}

	async fn publish(&self, pubsub_name: &str, topic: &str, payload: Vec<u8>) -> Result<(), PubSubError> {
		self.client
			.publish_event(pubsub_name, topic, &payload)
			.await
			.map_err(|e| PubSubError::Backend(e.to_string()))
	}
}

/// Factory function to create a sidecar publisher from configuration.
///
/// Configuration parameters: see `orders_sidecar::DaprConfig::from_toml`.
pub fn create_publisher(config: &toml::Value) -> Result<Box<dyn PublisherInterface>, PubSubError> {
	let client = DaprClient::from_toml(config).map_err(|e| PubSubError::Configuration(e.to_string()))?;
	Ok(Box::new(DaprPublisher::new(client)))
}

/// Registry for the sidecar publisher.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "dapr";
	type Factory = PublisherFactory;

	fn factory() -> Self::Factory {
		create_publisher
	}
}

impl PublisherRegistry for Registry {}
