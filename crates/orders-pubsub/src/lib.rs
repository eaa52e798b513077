//! Event publishing capability for the order façades.
//!
//! The publish façade hands every accepted order to a `PublisherInterface`
//! implementation. The sidecar-backed publisher is the production path; the
//! in-memory publisher records events for tests and local runs.

use async_trait::async_trait;
use orders_types::{ConfigSchema, ImplementationRegistry};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod dapr;
	pub mod memory;
}

/// Errors that can occur while publishing.
#[derive(Debug, Error)]
pub enum PubSubError {
	/// Failure inside the backend, including an unreachable sidecar.
	#[error("Backend error: {0}")]
	Backend(String),
	/// The implementation table was rejected.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Interface implemented by every event publisher.
///
/// Publishing is at-most-once from the caller's side: implementations make a
/// single attempt and report its outcome.
#[async_trait]
pub trait PublisherInterface: Send + Sync {
	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Waits until the backend can accept events.
	///
	/// In-process backends are ready immediately.
	async fn wait_ready(&self) -> Result<(), PubSubError> {
		Ok(())
	}

	/// Publishes `payload` to `topic` on the named pub/sub component.
	async fn publish(&self, pubsub_name: &str, topic: &str, payload: Vec<u8>) -> Result<(), PubSubError>;
}

/// Type alias for publisher factory functions.
pub type PublisherFactory = fn(&toml::Value) -> Result<Box<dyn PublisherInterface>, PubSubError>;

/// Registry trait for publisher implementations.
pub trait PublisherRegistry: ImplementationRegistry<Factory = PublisherFactory> {}

/// Get all registered publisher implementations.
pub fn get_all_implementations() -> Vec<(&'static str, PublisherFactory)> {
	use implementations::{dapr, memory};

	vec![
		(dapr::Registry::NAME, dapr::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Publisher bound to one pub/sub component and topic.
pub struct PublishService {
	backend: Box<dyn PublisherInterface>,
	pubsub_name: String,
	topic: String,
}

impl PublishService {
	/// Creates a service over `backend` publishing to `pubsub_name`/`topic`.
	///
	/// # Arguments
	///
	/// * `backend` - The publisher every event is handed to
	/// * `pubsub_name` - Pub/sub component passed with each event
	/// * `topic` - Topic passed with each event
	pub fn new(
		backend: Box<dyn PublisherInterface>,
		pubsub_name: impl Into<String>,
		topic: impl Into<String>,
	) -> Self {
		Self {
			backend,
			pubsub_name: pubsub_name.into(),
			topic: topic.into(),
		}
	}

	pub fn pubsub_name(&self) -> &str {
		&self.pubsub_name
	}

	pub fn topic(&self) -> &str {
		&self.topic
	}

	/// Waits until the backend can accept events.
	pub async fn wait_ready(&self) -> Result<(), PubSubError> {
		self.backend.wait_ready().await
	}

	/// Publishes an already encoded event in a single attempt.
	pub async fn publish_bytes(&self, payload: Vec<u8>) -> Result<(), PubSubError> {
		self.backend
			.publish(&self.pubsub_name, &self.topic, payload)
			.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::memory::{MemoryPublisher, PublishedEvent};
	use orders_types::Order;

	#[tokio::test]
	async fn test_publish_uses_bound_names() {
		let publisher = MemoryPublisher::new();
		let service = PublishService::new(Box::new(publisher.clone()), "pubsub", "orders");
		assert_eq!(service.pubsub_name(), "pubsub");
		assert_eq!(service.topic(), "orders");

		service
			.publish_bytes(Order::new(42).to_json().unwrap())
			.await
			.unwrap();

		assert_eq!(
			publisher.published().await,
			vec![PublishedEvent {
				pubsub_name: "pubsub".into(),
				topic: "orders".into(),
				payload: br#"{"orderId":42}"#.to_vec(),
			}]
		);
	}

	#[test]
	fn test_all_implementations_registered() {
		let names: Vec<_> = get_all_implementations().into_iter().map(|(n, _)| n).collect();
		assert_eq!(names, vec!["dapr", "memory"]);
	}
}
