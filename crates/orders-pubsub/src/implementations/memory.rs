//! In-memory publisher.
//!
//! Records published events instead of delivering them. Nothing subscribes to
//! these events; they are only observable through
//! [`MemoryPublisher::published`]. The log is bounded: once `capacity`
//! events are held, each new event evicts the oldest.

use crate::{PubSubError, PublisherFactory, PublisherInterface, PublisherRegistry};
use async_trait::async_trait;
use orders_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Events kept when no `capacity` is configured.
pub const DEFAULT_CAPACITY: usize = 1000;

/// One recorded publish call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedEvent {
	pub pubsub_name: String,
	pub topic: String,
	pub payload: Vec<u8>,
}

/// Publisher that keeps the most recent events in memory. Clones share the
/// same log.
#[derive(Clone)]
pub struct MemoryPublisher {
	events: Arc<RwLock<VecDeque<PublishedEvent>>>,
	capacity: usize,
}

impl Default for MemoryPublisher {
	fn default() -> Self {
		Self::with_capacity(DEFAULT_CAPACITY)
	}
}

impl MemoryPublisher {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a publisher that keeps at most `capacity` events.
	///
	/// A capacity of zero is raised to one.
	pub fn with_capacity(capacity: usize) -> Self {
		let capacity = capacity.max(1);
		Self {
			events: Arc::new(RwLock::new(VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)))),
			capacity,
		}
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// Retained events, oldest first.
	pub async fn published(&self) -> Vec<PublishedEvent> {
		self.events.read().await.iter().cloned().collect()
	}
}

#[async_trait]
impl PublisherInterface for MemoryPublisher {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryPublisherSchema)
	}

	async fn publish(&self, pubsub_name: &str, topic: &str, payload: Vec<u8>) -> Result<(), PubSubError> {
		tracing::debug!(pubsub = %pubsub_name, topic = %topic, bytes = payload.len(), "Recorded event");
		let mut events = self.events.write().await;
		if events.len() >= self.capacity {
			events.pop_front();
		}
		events.push_back(PublishedEvent {
			pubsub_name: pubsub_name.to_string(),
			topic: topic.to_string(),
			payload,
		});
		Ok(())
	}
}

/// Configuration schema for MemoryPublisher.
pub struct MemoryPublisherSchema;

impl ConfigSchema for MemoryPublisherSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![Field::new(
				"capacity",
				FieldType::Integer {
					min: Some(1),
					max: Some(1_000_000),
				},
			)],
		);
		schema.validate(config)
	}
}

/// Factory function to create a memory publisher from configuration.
///
/// Configuration parameters:
/// - `capacity`: Number of events retained (default: 1000)
pub fn create_publisher(config: &toml::Value) -> Result<Box<dyn PublisherInterface>, PubSubError> {
	MemoryPublisherSchema
		.validate(config)
		.map_err(|e| PubSubError::Configuration(e.to_string()))?;

	let capacity = config
		.get("capacity")
		.and_then(|v| v.as_integer())
		.map(|v| v as usize)
		.unwrap_or(DEFAULT_CAPACITY);

	Ok(Box::new(MemoryPublisher::with_capacity(capacity)))
}

/// Registry for the memory publisher.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = PublisherFactory;

	fn factory() -> Self::Factory {
		create_publisher
	}
}

impl PublisherRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_events_recorded_in_order() {
		let publisher = MemoryPublisher::new();
		publisher.publish("pubsub", "orders", b"1".to_vec()).await.unwrap();
		publisher.publish("other", "audit", b"2".to_vec()).await.unwrap();

		let events = publisher.published().await;
		assert_eq!(events.len(), 2);
		assert_eq!(events[0].payload, b"1".to_vec());
		assert_eq!(events[1].pubsub_name, "other");
		assert_eq!(events[1].topic, "audit");
	}

	#[tokio::test]
	async fn test_clones_share_log() {
		let publisher = MemoryPublisher::new();
		let clone = publisher.clone();
		clone.publish("pubsub", "orders", b"{}".to_vec()).await.unwrap();
		assert_eq!(publisher.published().await.len(), 1);
	}

	#[tokio::test]
	async fn test_log_is_bounded() {
		let publisher = MemoryPublisher::with_capacity(3);
		for i in 0..10 {
			publisher
				.publish("pubsub", "orders", i.to_string().into_bytes())
				.await
				.unwrap();
		}

		let payloads: Vec<_> = publisher
			.published()
			.await
			.into_iter()
			.map(|e| e.payload)
			.collect();
		assert_eq!(payloads, vec![b"7".to_vec(), b"8".to_vec(), b"9".to_vec()]);
	}

	#[test]
	fn test_zero_capacity_keeps_one() {
		assert_eq!(MemoryPublisher::with_capacity(0).capacity(), 1);
		assert_eq!(MemoryPublisher::new().capacity(), DEFAULT_CAPACITY);
	}

	#[test]
	fn test_factory() {
		let config = toml::Value::Table(toml::map::Map::new());
		assert!(create_publisher(&config).is_ok());

		let config: toml::Value = toml::from_str("capacity = 10").unwrap();
		assert!(create_publisher(&config).is_ok());

		let config: toml::Value = toml::from_str("capacity = 0").unwrap();
		assert!(matches!(
			create_publisher(&config),
			Err(PubSubError::Configuration(_))
		));

		assert!(matches!(
			create_publisher(&toml::Value::String("x".into())),
			Err(PubSubError::Configuration(_))
		));
	}
}
